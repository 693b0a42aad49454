//! Business logic services

pub mod auth;
pub mod catalog;
pub mod email;
pub mod rentals;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub rentals: rentals::RentalsService,
    pub users: users::UsersService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let provider = Arc::new(auth::HttpIdentityProvider::new(config.auth.clone())?);
        let auth = auth::AuthService::new(&config.auth, provider)?;
        let email = email::EmailService::new(config.email.clone());

        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            rentals: rentals::RentalsService::new(repository.clone(), config.rentals.clone()),
            users: users::UsersService::new(repository, auth.clone(), email.clone()),
            auth,
            email,
        })
    }
}
