//! Users and roles repository for database operations

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        ids::{RoleId, UserId},
        user::{Role, RoleName, User, UserRow},
    },
};

const USER_COLUMNS: &str = "id, name, user_name, email, phone_number, nif, biography, role_id";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY user_name",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: UserId) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?
            .try_into()
    }

    pub async fn add(&self, tx: &mut Transaction<'_, Postgres>, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, user_name, email, phone_number, nif, biography, role_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id())
        .bind(user.name().as_str())
        .bind(user.user_name().as_str())
        .bind(user.email().as_str())
        .bind(user.phone_number().as_str())
        .bind(user.nif().as_str())
        .bind(user.biography().as_str())
        .bind(user.role_id())
        .execute(&mut **tx)
        .await
        .map_err(unique_violation_to_conflict)?;

        Ok(())
    }

    /// Write the mutable profile fields
    pub async fn update(&self, tx: &mut Transaction<'_, Postgres>, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, biography = $3, role_id = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id())
        .bind(user.email().as_str())
        .bind(user.biography().as_str())
        .bind(user.role_id())
        .execute(&mut **tx)
        .await
        .map_err(unique_violation_to_conflict)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", user.id())));
        }
        Ok(())
    }

    /// Check if a username is taken (case-insensitive)
    pub async fn user_name_exists(&self, user_name: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(user_name) = LOWER($1))")
                .bind(user_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Check if an email is taken, optionally ignoring one user
    pub async fn email_exists(&self, email: &str, exclude_id: Option<UserId>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id != $2))",
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn get_role(&self, id: RoleId) -> AppResult<Role> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role with id {} not found", id)))
    }

    pub async fn find_role_by_name(&self, name: RoleName) -> AppResult<Role> {
        sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE LOWER(name) = LOWER($1)")
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role {} not found", name)))
    }
}

fn unique_violation_to_conflict(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict("Username or email already in use".to_string())
        }
        other => AppError::Database(other),
    }
}
