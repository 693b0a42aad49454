//! ISBN-10 / ISBN-13 identifier with checksum validation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::error::AppResult;

/// Catalog-wide uniqueness lookup used when a new ISBN enters the catalog.
///
/// Injected wherever ISBNs are constructed for new books, so the value type
/// stays testable without a database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IsbnUniqueness: Send + Sync {
    /// Returns true if the canonical `isbn` already belongs to a book
    async fn is_registered(&self, isbn: &str) -> AppResult<bool>;
}

/// Canonical ISBN (digits only, upper-case check character)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

/// Strip hyphens and spaces, uppercase the rest
pub fn canonicalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Weighted sum (10..1) mod 11 == 0, 'X' allowed as the last character
pub fn is_valid_isbn10(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let mut sum = 0u32;
    for (i, b) in bytes.iter().enumerate() {
        let digit = match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'X' if i == 9 => 10,
            _ => return false,
        };
        sum += digit * (10 - i as u32);
    }
    sum % 11 == 0
}

/// Alternating 1/3 weights mod 10 == 0
pub fn is_valid_isbn13(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    if bytes.len() != 13 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let sum: u32 = bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 { digit } else { digit * 3 }
        })
        .sum();
    sum % 10 == 0
}

impl Isbn {
    /// Validate format and checksum only. Used to rehydrate stored books.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let canonical = canonicalize(raw);
        if canonical.is_empty() {
            return Err(ValidationError::format("isbn", "ISBN is required"));
        }

        let valid = match canonical.len() {
            10 => is_valid_isbn10(&canonical),
            13 => is_valid_isbn13(&canonical),
            n => {
                return Err(ValidationError::length(
                    "isbn",
                    format!("ISBN must have 10 or 13 characters (got {})", n),
                ))
            }
        };

        if !valid {
            return Err(ValidationError::format(
                "isbn",
                format!("{} is not a valid ISBN (checksum mismatch)", raw.trim()),
            ));
        }

        Ok(Self(canonical))
    }

    /// Validate a new ISBN and make sure no other book already uses it
    pub async fn new(raw: &str, uniqueness: &dyn IsbnUniqueness) -> AppResult<Self> {
        let isbn = Self::parse(raw)?;
        if uniqueness.is_registered(&isbn.0).await? {
            return Err(ValidationError::conflict(
                "isbn",
                format!("a book with ISBN {} already exists", isbn.0),
            )
            .into());
        }
        Ok(isbn)
    }

    pub async fn value_of(raw: &str, uniqueness: &dyn IsbnUniqueness) -> AppResult<Self> {
        Self::new(raw, uniqueness).await
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Isbn {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(value: Isbn) -> Self {
        value.0
    }
}
