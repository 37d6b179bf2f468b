//! Regex patterns for handwritten count extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Handwritten count next to a printed label: "=12", "= 7", " =3"
    pub static ref COUNT_PATTERN: Regex = Regex::new(
        r"\s*=\s*([0-9]+)"
    ).unwrap();
}
