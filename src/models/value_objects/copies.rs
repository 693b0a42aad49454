//! Stock count of a catalog entry

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Number of copies of a book available for rental, in `[0, 1500]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct AmountOfCopies(i32);

impl AmountOfCopies {
    pub const MIN: i32 = 0;
    pub const MAX: i32 = 1500;

    pub fn new(value: i32) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::range(
                "amount_of_copies",
                format!("must be between {} and {} (got {})", Self::MIN, Self::MAX, value),
            ));
        }
        Ok(Self(value))
    }

    pub fn value_of(value: i32) -> Result<Self, ValidationError> {
        Self::new(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i32> for AmountOfCopies {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AmountOfCopies> for i32 {
    fn from(value: AmountOfCopies) -> Self {
        value.0
    }
}

impl std::fmt::Display for AmountOfCopies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::value_objects::ValidationKind;

    #[test]
    fn test_bounds_are_inclusive() {
        assert_eq!(AmountOfCopies::new(0).unwrap().value(), 0);
        assert_eq!(AmountOfCopies::new(1500).unwrap().value(), 1500);
    }

    #[test]
    fn test_out_of_range_fails() {
        for value in [-1, -1500, 1501, i32::MAX, i32::MIN] {
            let err = AmountOfCopies::new(value).unwrap_err();
            assert_eq!(err.kind, ValidationKind::Range);
        }
    }

    #[test]
    fn test_whole_range_round_trips() {
        for value in 0..=1500 {
            assert_eq!(AmountOfCopies::value_of(value).unwrap().value(), value);
        }
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<AmountOfCopies>("12").is_ok());
        assert!(serde_json::from_str::<AmountOfCopies>("2000").is_err());
    }
}
