//! User registration and profile management

use crate::{
    error::{AppError, AppResult},
    models::{
        ids::UserId,
        user::{NewUser, RegisterUser, Role, RoleName, User},
        value_objects::{Biography, Email},
    },
    repository::Repository,
    services::{
        auth::{AuthService, IdentityAccount},
        email::EmailService,
    },
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    auth: AuthService,
    email: EmailService,
}

impl UsersService {
    pub fn new(repository: Repository, auth: AuthService, email: EmailService) -> Self {
        Self {
            repository,
            auth,
            email,
        }
    }

    /// Create the account at the identity provider, then the local profile.
    ///
    /// The profile is validated before the provider is called. If storing it
    /// still fails, the provider account is removed again.
    pub async fn register(&self, input: RegisterUser) -> AppResult<User> {
        let role_name = input.role.unwrap_or(RoleName::Member);
        let role = self.repository.users.find_role_by_name(role_name).await?;

        let draft = NewUser {
            name: input.name,
            user_name: input.user_name,
            email: input.email,
            phone_number: input.phone_number,
            nif: input.nif,
            biography: input.biography,
            role_id: Some(role.id),
        };
        // Placeholder id, replaced by the provider's subject below
        let candidate = User::create(UserId::generate(), &draft)?;

        if self.repository.users.user_name_exists(candidate.user_name().as_str()).await? {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                candidate.user_name()
            )));
        }
        if self.repository.users.email_exists(candidate.email().as_str(), None).await? {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                candidate.email()
            )));
        }
        if input.password.len() < 8 {
            return Err(AppError::BadRequest("password must be at least 8 characters".to_string()));
        }

        let subject = self
            .auth
            .register_account(&IdentityAccount {
                user_name: candidate.user_name().to_string(),
                email: candidate.email().to_string(),
                name: candidate.name().to_string(),
                password: input.password,
                role: role.name.clone(),
            })
            .await?;

        let user = match User::create(subject, &draft) {
            Ok(user) => user,
            Err(e) => {
                self.auth.discard_account(subject).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store_profile(&user).await {
            self.auth.discard_account(subject).await;
            return Err(e);
        }

        tracing::info!(user_id = %user.id(), user_name = %user.user_name(), role = %role.name, "User registered");
        Ok(user)
    }

    async fn store_profile(&self, user: &User) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        self.repository.users.add(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: UserId) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn role_of(&self, user: &User) -> AppResult<Role> {
        self.repository.users.get_role(user.role_id()).await
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.repository.users.get_all().await
    }

    /// Replace the email here and at the identity provider; both addresses
    /// are notified. A provider failure rolls the local change back.
    pub async fn change_email(&self, id: UserId, raw_email: &str) -> AppResult<User> {
        let email = Email::new(raw_email)?;
        let mut user = self.repository.users.get_by_id(id).await?;
        if user.email() == &email {
            return Ok(user);
        }
        if self.repository.users.email_exists(email.as_str(), Some(id)).await? {
            return Err(AppError::Conflict(format!("Email {} is already registered", email)));
        }

        let old = user.email().to_string();
        user.change_email(&email);

        let mut tx = self.repository.begin().await?;
        self.repository.users.update(&mut tx, &user).await?;
        self.auth.sync_email(id, email.as_str()).await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, "Email changed");
        self.email.email_changed(&old, email.as_str());
        Ok(user)
    }

    pub async fn change_biography(&self, id: UserId, raw_biography: &str) -> AppResult<User> {
        let biography = Biography::new(raw_biography)?;
        let mut user = self.repository.users.get_by_id(id).await?;
        user.change_biography(&biography);

        let mut tx = self.repository.begin().await?;
        self.repository.users.update(&mut tx, &user).await?;
        tx.commit().await?;

        self.email.biography_changed(user.email().as_str());
        Ok(user)
    }

    /// Assign another built-in role, here and at the identity provider
    pub async fn change_role(&self, id: UserId, role_name: RoleName) -> AppResult<User> {
        let role = self.repository.users.find_role_by_name(role_name).await?;
        let mut user = self.repository.users.get_by_id(id).await?;
        user.change_role_id(role.id);

        let mut tx = self.repository.begin().await?;
        self.repository.users.update(&mut tx, &user).await?;
        self.auth.sync_role(id, role_name).await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, role = %role.name, "Role changed");
        Ok(user)
    }
}
