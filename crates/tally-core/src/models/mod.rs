//! Data models for card extraction.

pub mod config;
pub mod fragment;
pub mod result;
pub mod schema;
