//! Helpers shared by the string value objects

/// Implements case-insensitive `PartialEq`, `Eq` and `Hash` for a `String` newtype.
macro_rules! case_insensitive_eq {
    ($t:ty) => {
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                self.0.to_lowercase() == other.0.to_lowercase()
            }
        }

        impl Eq for $t {}

        impl std::hash::Hash for $t {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.0.to_lowercase().hash(state);
            }
        }
    };
}

/// Shared plumbing for string value objects: accessors, `Display`, `value_of`
/// and serde through the validating constructor.
macro_rules! string_value_object {
    ($t:ident) => {
        impl $t {
            /// Equivalent to `new`
            pub fn value_of(raw: &str) -> Result<Self, $crate::models::value_objects::ValidationError> {
                Self::new(raw)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $t {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = $crate::models::value_objects::ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(&value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}
