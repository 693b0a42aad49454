//! User model, roles and token claims

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ids::{RoleId, UserId};
use super::value_objects::{Biography, Email, Name, Nif, PhoneNumber, UserName, ValidationError};
use crate::error::{AppError, AppResult};

/// Built-in role names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RoleName {
    Admin,
    Librarian,
    Member,
}

impl RoleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Admin => "Admin",
            RoleName::Librarian => "Librarian",
            RoleName::Member => "Member",
        }
    }
}

impl std::fmt::Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RoleName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(RoleName::Admin),
            "librarian" => Ok(RoleName::Librarian),
            "member" => Ok(RoleName::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Role {
    #[schema(value_type = String)]
    pub id: RoleId,
    pub name: String,
}

/// Library member profile. Credentials live with the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: UserId,
    name: Name,
    user_name: UserName,
    email: Email,
    phone_number: PhoneNumber,
    nif: Nif,
    biography: Biography,
    role_id: RoleId,
}

impl User {
    /// Validate every field of `draft`; the role is mandatory
    pub fn create(id: UserId, draft: &NewUser) -> AppResult<Self> {
        let role_id = draft
            .role_id
            .ok_or_else(|| ValidationError::format("role_id", "a role is required"))?;

        Ok(Self {
            id,
            name: Name::new(&draft.name)?,
            user_name: UserName::new(&draft.user_name)?,
            email: Email::new(&draft.email)?,
            phone_number: PhoneNumber::new(&draft.phone_number)?,
            nif: Nif::new(&draft.nif)?,
            biography: Biography::new(draft.biography.as_deref().unwrap_or_default())?,
            role_id,
        })
    }

    pub fn change_email(&mut self, email: &Email) {
        self.email = email.clone();
    }

    pub fn change_biography(&mut self, biography: &Biography) {
        self.biography = biography.clone();
    }

    pub fn change_role_id(&mut self, role_id: RoleId) {
        self.role_id = role_id;
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn user_name(&self) -> &UserName {
        &self.user_name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn phone_number(&self) -> &PhoneNumber {
        &self.phone_number
    }

    pub fn nif(&self) -> &Nif {
        &self.nif
    }

    pub fn biography(&self) -> &Biography {
        &self.biography
    }

    pub fn role_id(&self) -> RoleId {
        self.role_id
    }
}

/// Raw user fields, validated by `User::create`
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub phone_number: String,
    pub nif: String,
    pub biography: Option<String>,
    pub role_id: Option<RoleId>,
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: UserId,
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub phone_number: String,
    pub nif: String,
    pub biography: String,
    pub role_id: RoleId,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: Name::new(&row.name)?,
            user_name: UserName::new(&row.user_name)?,
            email: Email::new(&row.email)?,
            phone_number: PhoneNumber::new(&row.phone_number)?,
            nif: Nif::new(&row.nif)?,
            biography: Biography::new(&row.biography)?,
            role_id: row.role_id,
        })
    }
}

/// Registration request. The password is forwarded to the identity provider.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterUser {
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub nif: String,
    pub biography: Option<String>,
    /// Defaults to Member; only admins may choose another role
    pub role: Option<RoleName>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeEmail {
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeBiography {
    pub biography: String,
}

/// Change role request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRole {
    pub role: RoleName,
}

/// User as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub phone_number: String,
    pub nif: String,
    pub biography: String,
    pub role_id: Uuid,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            name: user.name.to_string(),
            user_name: user.user_name.to_string(),
            email: user.email.to_string(),
            phone_number: user.phone_number.to_string(),
            nif: user.nif.to_string(),
            biography: user.biography.to_string(),
            role_id: *user.role_id.as_uuid(),
        }
    }
}

/// Claims of a bearer token issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// Subject: the local user id
    pub sub: String,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl UserClaims {
    /// Parse and verify a token
    pub fn from_token(
        token: &str,
        key: &jsonwebtoken::DecodingKey,
        validation: &jsonwebtoken::Validation,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let token_data = jsonwebtoken::decode::<Self>(token, key, validation)?;
        Ok(token_data.claims)
    }

    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role.as_str()))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(RoleName::Admin)
    }

    pub fn is_staff(&self) -> bool {
        self.is_admin() || self.has_role(RoleName::Librarian)
    }

    pub fn user_id(&self) -> AppResult<UserId> {
        UserId::parse(&self.sub)
            .map_err(|_| AppError::Authentication("Token subject is not a user id".to_string()))
    }

    // Authorization checks

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian privileges required".to_string()))
        }
    }

    /// Staff may act for anyone; members only for their own email
    pub fn require_email_access(&self, email: &Email) -> Result<(), AppError> {
        if self.is_staff() {
            return Ok(());
        }
        match &self.email {
            Some(own) if own.eq_ignore_ascii_case(email.as_str()) => Ok(()),
            _ => Err(AppError::Authorization("Cannot act on another user's rentals".to_string())),
        }
    }

    /// Staff may read any profile; members only their own
    pub fn require_self_or_staff(&self, user_id: UserId) -> Result<(), AppError> {
        if self.is_staff() || self.sub.eq_ignore_ascii_case(&user_id.to_string()) {
            Ok(())
        } else {
            Err(AppError::Authorization("Insufficient rights to access this user".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewUser {
        NewUser {
            name: "Maria Silva".to_string(),
            user_name: "maria_silva".to_string(),
            email: "maria@example.pt".to_string(),
            phone_number: "912345678".to_string(),
            nif: "123456789".to_string(),
            biography: None,
            role_id: Some(RoleId::generate()),
        }
    }

    fn claims(roles: &[&str], email: &str) -> UserClaims {
        UserClaims {
            sub: UserId::generate().to_string(),
            preferred_username: Some("someone".to_string()),
            email: Some(email.to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_create_user() {
        let user = User::create(UserId::generate(), &draft()).unwrap();
        assert_eq!(user.user_name().as_str(), "maria_silva");
        assert!(user.biography().is_empty());
    }

    #[test]
    fn test_create_requires_role() {
        let mut input = draft();
        input.role_id = None;
        let err = User::create(UserId::generate(), &input).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.field == "role_id"));
    }

    #[test]
    fn test_create_validates_fields() {
        let mut input = draft();
        input.name = "John1".to_string();
        assert!(User::create(UserId::generate(), &input).is_err());

        let mut input = draft();
        input.nif = "12345".to_string();
        assert!(User::create(UserId::generate(), &input).is_err());
    }

    #[test]
    fn test_mutators_replace_values() {
        let mut user = User::create(UserId::generate(), &draft()).unwrap();

        let email = Email::new("new@example.pt").unwrap();
        user.change_email(&email);
        assert_eq!(user.email(), &email);

        let bio = Biography::new("Reads every night.").unwrap();
        user.change_biography(&bio);
        assert_eq!(user.biography().as_str(), "Reads every night.");

        let role = RoleId::generate();
        user.change_role_id(role);
        assert_eq!(user.role_id(), role);
    }

    #[test]
    fn test_claims_roles() {
        let admin = claims(&["admin"], "a@example.pt");
        assert!(admin.is_admin());
        assert!(admin.require_staff().is_ok());

        let librarian = claims(&["Librarian"], "l@example.pt");
        assert!(librarian.require_admin().is_err());
        assert!(librarian.require_staff().is_ok());

        let member = claims(&["Member"], "m@example.pt");
        assert!(member.require_staff().is_err());
    }

    #[test]
    fn test_member_email_access() {
        let member = claims(&["Member"], "Reader@Example.pt");
        assert!(member.require_email_access(&Email::new("reader@example.pt").unwrap()).is_ok());
        assert!(member.require_email_access(&Email::new("other@example.pt").unwrap()).is_err());

        let librarian = claims(&["Librarian"], "l@example.pt");
        assert!(librarian.require_email_access(&Email::new("other@example.pt").unwrap()).is_ok());
    }

    #[test]
    fn test_role_name_parse() {
        assert_eq!("ADMIN".parse::<RoleName>().unwrap(), RoleName::Admin);
        assert!("superuser".parse::<RoleName>().is_err());
    }
}
