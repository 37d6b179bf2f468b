//! Field extraction: label matching, count extraction, and spatial linking.

pub mod count;
pub mod linker;
pub mod matcher;
pub mod patterns;
mod resolver;

pub use count::{extract_embedded, extract_embedded_after_label, EmbeddedCount};
pub use linker::{BlockerIndex, LinkedCount, SpatialLinker};
pub use matcher::{KeyWords, LabelMatch, LabelMatcher};
pub use resolver::FieldResolver;
