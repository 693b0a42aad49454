//! Self-validating value objects used by the Book, Rental and User aggregates.
//!
//! Every type validates in its constructor and is immutable afterwards. Human
//! text compares case-insensitively; codes (ISBN, NIF, phone) compare exactly.

#[macro_use]
mod macros;

pub mod book_fields;
pub mod copies;
pub mod isbn;
pub mod person;
pub mod rental_dates;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

pub use book_fields::{Author, BookName, Category, Description, Publisher};
pub use copies::AmountOfCopies;
pub use isbn::{Isbn, IsbnUniqueness};
pub use person::{Biography, Email, Name, Nif, PhoneNumber, UserName};
pub use rental_dates::{RentalEndDate, RentalStartDate};

/// Category of a rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Format,
    Length,
    Range,
    Conflict,
}

/// A business-rule violation raised while building a value object
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationError {
    pub fn format(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, kind: ValidationKind::Format, message: message.into() }
    }

    pub fn length(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, kind: ValidationKind::Length, message: message.into() }
    }

    pub fn range(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, kind: ValidationKind::Range, message: message.into() }
    }

    pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, kind: ValidationKind::Conflict, message: message.into() }
    }
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Lowercased fragments that are never accepted in free text
const XSS_PATTERNS: &[&str] = &[
    "<script",
    "</script",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "onerror=",
    "onload=",
    "onclick=",
    "onmouseover=",
    "<iframe",
    "<object",
    "<embed",
    "expression(",
];

/// Trim and NFC-normalize human text
pub(crate) fn normalize_text(raw: &str) -> String {
    raw.trim().nfc().collect()
}

pub(crate) fn strip_html_tags(raw: &str) -> String {
    HTML_TAG.replace_all(raw, "").into_owned()
}

pub(crate) fn contains_xss(raw: &str) -> bool {
    let lowered: String = raw.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
    XSS_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}

/// Check length in characters (not bytes)
pub(crate) fn check_length(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::length(
            field,
            format!("must be between {} and {} characters (got {})", min, max, len),
        ));
    }
    Ok(())
}
