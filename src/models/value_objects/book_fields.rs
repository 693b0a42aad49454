//! Text fields of a catalog entry

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{check_length, contains_xss, normalize_text, strip_html_tags, ValidationError};

static AUTHOR_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{M} .,'\-]+$").expect("valid author regex"));
static CATEGORY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{M}0-9 &,/\-]+$").expect("valid category regex"));
static PUBLISHER_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{M}0-9 .,&'()\-]+$").expect("valid publisher regex"));
static BOOK_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[\p{L}\p{M}0-9 .,:;!?'"()&/#\-]+$"#).expect("valid book name regex"));

fn validate_charset(field: &'static str, value: &str, allowed: &Regex) -> Result<(), ValidationError> {
    if !allowed.is_match(value) {
        return Err(ValidationError::format(field, "contains characters that are not allowed"));
    }
    Ok(())
}

/// Author of a book (2-100 chars, letters and `. , ' -`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Author(String);

impl Author {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize_text(raw);
        check_length("author", &value, 2, 100)?;
        validate_charset("author", &value, &AUTHOR_CHARS)?;
        Ok(Self(value))
    }
}

case_insensitive_eq!(Author);
string_value_object!(Author);

/// Genre or shelf category (2-50 chars)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize_text(raw);
        check_length("category", &value, 2, 50)?;
        validate_charset("category", &value, &CATEGORY_CHARS)?;
        Ok(Self(value))
    }
}

case_insensitive_eq!(Category);
string_value_object!(Category);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Publisher(String);

impl Publisher {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize_text(raw);
        check_length("publisher", &value, 2, 100)?;
        validate_charset("publisher", &value, &PUBLISHER_CHARS)?;
        Ok(Self(value))
    }
}

case_insensitive_eq!(Publisher);
string_value_object!(Publisher);

/// Title of a book (1-200 chars)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookName(String);

impl BookName {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize_text(raw);
        check_length("name", &value, 1, 200)?;
        validate_charset("name", &value, &BOOK_NAME_CHARS)?;
        Ok(Self(value))
    }
}

case_insensitive_eq!(BookName);
string_value_object!(BookName);

/// Free-text summary of a book.
///
/// The raw input is checked against the injection denylist first, then HTML
/// tags are stripped and the remaining text must hold 5-2000 characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Description(String);

impl Description {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        if contains_xss(raw) {
            return Err(ValidationError::format("description", "contains forbidden markup"));
        }
        let value = normalize_text(&strip_html_tags(raw));
        check_length("description", &value, 5, 2000)?;
        Ok(Self(value))
    }
}

case_insensitive_eq!(Description);
string_value_object!(Description);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value_objects::ValidationKind;

    #[test]
    fn test_author() {
        assert_eq!(Author::new("  J.R.R. Tolkien ").unwrap().as_str(), "J.R.R. Tolkien");
        assert!(Author::new("José Saramago").is_ok());
        assert!(Author::new("Anne O'Neil-Smith").is_ok());
        assert_eq!(Author::new("   ").unwrap_err().kind, ValidationKind::Length);
        assert_eq!(Author::new("R2D2").unwrap_err().kind, ValidationKind::Format);
        assert!(Author::new(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_category() {
        assert!(Category::new("Science Fiction").is_ok());
        assert!(Category::new("Arts & Crafts").is_ok());
        assert!(Category::new("Sci-Fi/Fantasy").is_ok());
        assert!(Category::new("x").is_err());
        assert!(Category::new("Horror!").is_err());
    }

    #[test]
    fn test_publisher() {
        assert!(Publisher::new("Penguin Random House").is_ok());
        assert!(Publisher::new("O'Reilly Media (US)").is_ok());
        assert!(Publisher::new("Gallimard <b>").is_err());
    }

    #[test]
    fn test_book_name() {
        assert!(BookName::new("1984").is_ok());
        assert!(BookName::new("Harry Potter & the Philosopher's Stone: Book #1").is_ok());
        assert!(BookName::new("").is_err());
        assert!(BookName::new("Title<script>").is_err());
        assert!(BookName::new(&"b".repeat(200)).is_ok());
        assert!(BookName::new(&"b".repeat(201)).is_err());
    }

    #[test]
    fn test_description_strips_tags() {
        let description = Description::new("<p>A <b>great</b> read.</p>").unwrap();
        assert_eq!(description.as_str(), "A great read.");
    }

    #[test]
    fn test_description_rejects_injection() {
        for raw in [
            "Nice book <script>alert(1)</script>",
            "see javascript:alert(1) here",
            "<img src=x onerror=alert(1)> text",
        ] {
            assert_eq!(Description::new(raw).unwrap_err().kind, ValidationKind::Format);
        }
    }

    #[test]
    fn test_description_length() {
        assert_eq!(Description::new("abcd").unwrap_err().kind, ValidationKind::Length);
        assert!(Description::new("abcde").is_ok());
        assert!(Description::new(&"x".repeat(2000)).is_ok());
        assert!(Description::new(&"x".repeat(2001)).is_err());
        // only tags, nothing left after stripping
        assert!(Description::new("<p></p><br/>").is_err());
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(Author::new("Jane Austen").unwrap(), Author::new("  JANE AUSTEN").unwrap());
        assert_eq!(Category::new("Poetry").unwrap(), Category::new("poetry").unwrap());
        assert_eq!(Publisher::new("Penguin").unwrap(), Publisher::new("PENGUIN").unwrap());
        assert_eq!(BookName::new("Dune").unwrap(), BookName::new("dune ").unwrap());
        assert_eq!(
            Description::new("Spice and sand").unwrap(),
            Description::new("SPICE AND SAND").unwrap()
        );
        assert_ne!(Author::new("Jane Austen").unwrap(), Author::new("Jane Eyre").unwrap());
    }

    #[test]
    fn test_hash_consistent_with_equality() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(Category::new("Poetry").unwrap());
        assert!(set.contains(&Category::new("POETRY").unwrap()));
    }
}
