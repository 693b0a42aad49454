//! Typed identifiers for aggregates.
//!
//! `Id<T>` wraps a UUID and carries a zero-sized tag so that a `BookId` can
//! never be passed where a `RentalId` is expected.

use std::{fmt, hash::Hash, marker::PhantomData, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{Decode, Encode, Postgres};
use uuid::Uuid;

use super::value_objects::ValidationError;

/// Entity tag for `Id<T>`
pub trait EntityTag {
    const NAME: &'static str;
}

#[derive(Debug)]
pub enum BookTag {}
#[derive(Debug)]
pub enum RentalTag {}
#[derive(Debug)]
pub enum UserTag {}
#[derive(Debug)]
pub enum RoleTag {}

impl EntityTag for BookTag {
    const NAME: &'static str = "book";
}
impl EntityTag for RentalTag {
    const NAME: &'static str = "rental";
}
impl EntityTag for UserTag {
    const NAME: &'static str = "user";
}
impl EntityTag for RoleTag {
    const NAME: &'static str = "role";
}

pub type BookId = Id<BookTag>;
pub type RentalId = Id<RentalTag>;
pub type UserId = Id<UserTag>;
pub type RoleId = Id<RoleTag>;

pub struct Id<T> {
    value: Uuid,
    _tag: PhantomData<fn() -> T>,
}

/// Parse a UUID string, rejecting empty input and the nil UUID
pub(crate) fn parse_uuid(entity: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::format("id", format!("{} id is required", entity)));
    }
    let uuid = Uuid::parse_str(raw)
        .map_err(|e| ValidationError::format("id", format!("invalid {} id '{}': {}", entity, raw, e)))?;
    if uuid.is_nil() {
        return Err(ValidationError::format("id", format!("{} id cannot be nil", entity)));
    }
    Ok(uuid)
}

impl<T: EntityTag> Id<T> {
    /// Fresh random identifier
    pub fn generate() -> Self {
        Self { value: Uuid::new_v4(), _tag: PhantomData }
    }

    pub fn from_uuid(value: Uuid) -> Result<Self, ValidationError> {
        if value.is_nil() {
            return Err(ValidationError::format("id", format!("{} id cannot be nil", T::NAME)));
        }
        Ok(Self { value, _tag: PhantomData })
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        Ok(Self { value: parse_uuid(T::NAME, raw)?, _tag: PhantomData })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }
}

// Manual impls: derives would put bounds on the tag type.

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: EntityTag> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Id({})", T::NAME, self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<T: EntityTag> FromStr for Id<T> {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(id: Id<T>) -> Self {
        id.value
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.value)
    }
}

impl<'de, T: EntityTag> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// SQLx conversion: stored as a native UUID column
impl<T> sqlx::Type<Postgres> for Id<T> {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Uuid as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r, T: EntityTag> Decode<'r, Postgres> for Id<T> {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let uuid: Uuid = Decode::<Postgres>::decode(value)?;
        Ok(Self::from_uuid(uuid)?)
    }
}

impl<T> Encode<'_, Postgres> for Id<T> {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <Uuid as Encode<Postgres>>::encode_by_ref(&self.value, buf)
    }
}
