//! Identity provider client and bearer token validation.
//!
//! Credentials never touch this server: logins and registrations are
//! forwarded to an OAuth2 / OpenID Connect provider, and the tokens it
//! issues are verified locally.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::{header::LOCATION, StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        ids::UserId,
        user::{RoleName, UserClaims},
    },
};

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Token set returned by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Account created at the identity provider on registration
#[derive(Debug, Clone)]
pub struct IdentityAccount {
    pub user_name: String,
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange credentials for a token set
    async fn login(&self, username: &str, password: &str) -> AppResult<TokenResponse>;

    /// Create the account and return its subject id
    async fn register(&self, account: &IdentityAccount) -> AppResult<UserId>;

    /// Replace the email carried by the account's tokens
    async fn update_email(&self, subject: UserId, email: &str) -> AppResult<()>;

    /// Replace the account's role
    async fn assign_role(&self, subject: UserId, role: &str) -> AppResult<()>;

    async fn delete_account(&self, subject: UserId) -> AppResult<()>;
}

/// OAuth2 password grant plus an admin endpoint for account creation
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    config: AuthConfig,
}

impl HttpIdentityProvider {
    pub fn new(config: AuthConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn account_url(&self, subject: UserId) -> String {
        format!("{}/{}", self.config.registration_endpoint.trim_end_matches('/'), subject)
    }

    fn admin(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.admin_token.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send an admin request against an existing account
    async fn send_account_change(
        &self,
        subject: UserId,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> AppResult<()> {
        let resp = self
            .admin(request)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("{} request failed: {}", action, e)))?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!("No identity account {}", subject))),
            StatusCode::CONFLICT => Err(AppError::Conflict("Email already in use".to_string())),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(AppError::IdentityProvider(format!("{} ({}): {}", action, status, body)))
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn login(&self, username: &str, password: &str) -> AppResult<TokenResponse> {
        let mut form = vec![
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("username", username),
            ("password", password),
            ("scope", "openid"),
        ];
        if let Some(secret) = self.config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let resp = self
            .client
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("token request failed: {}", e)))?;

        match resp.status() {
            s if s.is_success() => resp
                .json::<TokenResponse>()
                .await
                .map_err(|e| AppError::IdentityProvider(format!("invalid token response: {}", e))),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(AppError::Authentication("Invalid username or password".to_string()))
            }
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(AppError::IdentityProvider(format!("token endpoint ({}): {}", status, body)))
            }
        }
    }

    async fn register(&self, account: &IdentityAccount) -> AppResult<UserId> {
        let body = serde_json::json!({
            "username": account.user_name,
            "email": account.email,
            "firstName": account.name,
            "enabled": true,
            "realmRoles": [account.role],
            "credentials": [{
                "type": "password",
                "value": account.password,
                "temporary": false,
            }],
        });

        let resp = self
            .admin(self.client.post(&self.config.registration_endpoint).json(&body))
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("registration request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::CONFLICT {
            return Err(AppError::Conflict("Username or email already in use".to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!("registration endpoint ({}): {}", status, body)));
        }

        // The new account's id is the last segment of the Location header
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::IdentityProvider("registration response has no Location".to_string()))?;

        subject_from_location(location)
    }

    async fn update_email(&self, subject: UserId, email: &str) -> AppResult<()> {
        let request = self
            .client
            .put(self.account_url(subject))
            .json(&serde_json::json!({ "email": email, "emailVerified": false }));
        self.send_account_change(subject, request, "email update").await
    }

    async fn assign_role(&self, subject: UserId, role: &str) -> AppResult<()> {
        let request = self
            .client
            .put(self.account_url(subject))
            .json(&serde_json::json!({ "realmRoles": [role] }));
        self.send_account_change(subject, request, "role assignment").await
    }

    async fn delete_account(&self, subject: UserId) -> AppResult<()> {
        let request = self.client.delete(self.account_url(subject));
        self.send_account_change(subject, request, "account deletion").await
    }
}

fn subject_from_location(location: &str) -> AppResult<UserId> {
    let subject = location.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    UserId::parse(subject)
        .map_err(|e| AppError::IdentityProvider(format!("unexpected account id '{}': {}", subject, e)))
}

/// Bearer token verification and identity provider access
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(config: &AuthConfig, provider: Arc<dyn IdentityProvider>) -> AppResult<Self> {
        let (decoding_key, mut validation) = match config.jwt_public_key_pem.as_deref() {
            Some(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AppError::Internal(format!("Invalid identity provider key: {}", e)))?,
                Validation::new(Algorithm::RS256),
            ),
            None => (
                DecodingKey::from_secret(config.jwt_secret.as_bytes()),
                Validation::new(Algorithm::HS256),
            ),
        };

        match config.issuer.as_deref() {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        match config.audience.as_deref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            provider,
            decoding_key,
            validation,
        })
    }

    /// Verify signature, expiry and, when configured, issuer and audience
    pub fn validate_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::Authentication("Invalid or expired token".to_string())
        })
    }

    pub async fn login(&self, request: &LoginRequest) -> AppResult<TokenResponse> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::BadRequest("username and password are required".to_string()));
        }
        let tokens = self.provider.login(request.username.trim(), &request.password).await?;
        tracing::info!(username = %request.username.trim(), "User logged in");
        Ok(tokens)
    }

    pub async fn register_account(&self, account: &IdentityAccount) -> AppResult<UserId> {
        self.provider.register(account).await
    }

    /// Tokens issued from now on carry `email`
    pub async fn sync_email(&self, subject: UserId, email: &str) -> AppResult<()> {
        self.provider.update_email(subject, email).await
    }

    /// Tokens issued from now on carry `role`
    pub async fn sync_role(&self, subject: UserId, role: RoleName) -> AppResult<()> {
        self.provider.assign_role(subject, role.as_str()).await
    }

    /// Remove an account whose local profile could not be stored.
    ///
    /// Failures are only logged; the caller is already reporting an error.
    pub async fn discard_account(&self, subject: UserId) {
        match self.provider.delete_account(subject).await {
            Ok(()) => tracing::info!(subject = %subject, "Removed identity account without profile"),
            Err(e) => tracing::warn!(subject = %subject, error = %e, "Orphaned identity account left behind"),
        }
    }
}
