//! Profile fields of a library member

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{check_length, contains_xss, normalize_text, strip_html_tags, ValidationError};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~\-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~\-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9\-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("valid email regex")
});
/// Portuguese numbering plan: mobile 91/92/93/96, landline 2x, nomadic 30
static PT_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:9[1236][0-9]{7}|2[0-9]{8}|30[0-9]{7})$").expect("valid phone regex"));
static NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{M}' \-]+$").expect("valid name regex"));
static USER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid username regex"));
static BIOGRAPHY_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\p{L}\p{M}0-9\s.,;:!?'"()&/@#\-]*$"#).expect("valid biography regex")
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(ValidationError::format("email", "email is required"));
        }
        check_length("email", value, 3, 254)?;
        let local_len = value.split('@').next().map(str::len).unwrap_or(0);
        if local_len > 64 || !EMAIL.is_match(value) {
            return Err(ValidationError::format("email", format!("{} is not a valid email address", value)));
        }
        Ok(Self(value.to_string()))
    }

    /// Lower-cased form used for lookups
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

case_insensitive_eq!(Email);
string_value_object!(Email);

/// Nine-digit Portuguese phone number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if value.len() != 9 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::format("phone_number", "phone number must have exactly 9 digits"));
        }
        if !PT_PHONE.is_match(&value) {
            return Err(ValidationError::format("phone_number", format!("{} is not a valid phone number", value)));
        }
        Ok(Self(value))
    }
}

string_value_object!(PhoneNumber);

/// Tax identification number (NIF), nine digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nif(String);

impl Nif {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = raw.trim();
        if value.len() != 9 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::format("nif", "NIF must have exactly 9 digits"));
        }
        Ok(Self(value.to_string()))
    }
}

string_value_object!(Nif);

/// Person name: letters, spaces, hyphen and apostrophe, at most 40 chars
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize_text(raw);
        check_length("name", &value, 1, 40)?;
        if !NAME_CHARS.is_match(&value) {
            return Err(ValidationError::format(
                "name",
                "name may only contain letters, spaces, hyphens and apostrophes",
            ));
        }
        Ok(Self(value))
    }
}

case_insensitive_eq!(Name);
string_value_object!(Name);

/// Public handle: starts with a letter, alphanumerics and single underscores
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let value = raw.trim();
        check_length("user_name", value, 2, 30)?;
        if !USER_NAME.is_match(value) {
            return Err(ValidationError::format(
                "user_name",
                "username must start with a letter and contain only letters, digits and underscores",
            ));
        }
        if value.ends_with('_') || value.contains("__") {
            return Err(ValidationError::format(
                "user_name",
                "username cannot end with or repeat underscores",
            ));
        }
        Ok(Self(value.to_string()))
    }
}

case_insensitive_eq!(UserName);
string_value_object!(UserName);

/// Short profile text, possibly empty
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Biography(String);

impl Biography {
    pub const MAX_LEN: usize = 150;

    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        if contains_xss(raw) {
            return Err(ValidationError::format("biography", "contains forbidden markup"));
        }
        let value = normalize_text(&strip_html_tags(raw));
        check_length("biography", &value, 0, Self::MAX_LEN)?;
        if !BIOGRAPHY_CHARS.is_match(&value) {
            return Err(ValidationError::format("biography", "contains characters that are not allowed"));
        }
        Ok(Self(value))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

string_value_object!(Biography);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value_objects::ValidationKind;

    #[test]
    fn test_email() {
        let email = Email::new("  Reader@Library.PT ").unwrap();
        assert_eq!(email.as_str(), "Reader@Library.PT");
        assert_eq!(email.normalized(), "reader@library.pt");
        assert_eq!(email, Email::new("reader@library.pt").unwrap());

        for bad in ["", "plainaddress", "@no-local.pt", "a@b", "two@@signs.pt", "dots..in@local.pt", "a@-dash.pt"] {
            assert!(Email::new(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(PhoneNumber::new("912 345 678").unwrap().as_str(), "912345678");
        assert!(PhoneNumber::new("213456789").is_ok());
        assert!(PhoneNumber::new("300123456").is_ok());
        assert!(PhoneNumber::new("941234567").is_err());
        assert!(PhoneNumber::new("12345678").is_err());
        assert!(PhoneNumber::new("91234567a").is_err());
        assert!(PhoneNumber::new("9123456789").is_err());
    }

    #[test]
    fn test_nif() {
        assert!(Nif::new("123456789").is_ok());
        assert!(Nif::new("12345678").is_err());
        assert!(Nif::new("1234567890").is_err());
        assert!(Nif::new("12345678X").is_err());
    }

    #[test]
    fn test_name() {
        assert!(Name::new("O'Reilly").is_ok());
        assert!(Name::new("Anne-Marie da Silva").is_ok());
        assert!(Name::new("João").is_ok());
        assert_eq!(Name::new("John1").unwrap_err().kind, ValidationKind::Format);
        assert_eq!(Name::new(&"a".repeat(41)).unwrap_err().kind, ValidationKind::Length);
        assert!(Name::new(&"a".repeat(40)).is_ok());
        assert!(Name::new("  ").is_err());
    }

    #[test]
    fn test_user_name() {
        assert!(UserName::new("reader_01").is_ok());
        assert!(UserName::new("ab").is_ok());
        assert!(UserName::new("a").is_err());
        assert!(UserName::new("_reader").is_err());
        assert!(UserName::new("1reader").is_err());
        assert!(UserName::new("reader_").is_err());
        assert!(UserName::new("read__er").is_err());
        assert!(UserName::new("read-er").is_err());
        assert!(UserName::new(&"a".repeat(31)).is_err());
    }

    #[test]
    fn test_biography() {
        assert!(Biography::new("").unwrap().is_empty());
        assert_eq!(Biography::new("<i>Loves</i> sci-fi!").unwrap().as_str(), "Loves sci-fi!");
        assert!(Biography::new("<script>alert(1)</script>").is_err());
        assert!(Biography::new(&"b".repeat(150)).is_ok());
        assert_eq!(Biography::new(&"b".repeat(151)).unwrap_err().kind, ValidationKind::Length);
        assert!(Biography::new("price: 10€ {}").is_err());
    }

    #[test]
    fn test_case_insensitive_equality() {
        assert_eq!(UserName::new("Reader_One").unwrap(), UserName::new("reader_one").unwrap());
        assert_eq!(Name::new("Maria").unwrap(), Name::new("MARIA").unwrap());
        assert_ne!(Nif::new("123456789").unwrap(), Nif::new("987654321").unwrap());
    }
}
