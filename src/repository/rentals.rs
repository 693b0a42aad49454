//! Rentals repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        ids::{BookId, RentalId},
        rental::{Rental, RentalRow, RentalStatus},
        value_objects::Email,
    },
};

const RENTAL_COLUMNS: &str = "id, start_date, end_date, book_id, status, user_email";

/// Status codes that still hold a copy
const OPEN_STATUSES: [i16; 2] = [RentalStatus::Pending as i16, RentalStatus::Active as i16];

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> AppResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals ORDER BY start_date DESC, id",
            RENTAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Rental::try_from).collect()
    }

    pub async fn get_by_id(&self, id: RentalId) -> AppResult<Rental> {
        sqlx::query_as::<_, RentalRow>(&format!("SELECT {} FROM rentals WHERE id = $1", RENTAL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", id)))?
            .try_into()
    }

    /// Load and lock a rental row until the transaction ends
    pub async fn get_for_update(&self, tx: &mut Transaction<'_, Postgres>, id: RentalId) -> AppResult<Rental> {
        sqlx::query_as::<_, RentalRow>(&format!(
            "SELECT {} FROM rentals WHERE id = $1 FOR UPDATE",
            RENTAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", id)))?
        .try_into()
    }

    pub async fn add(&self, tx: &mut Transaction<'_, Postgres>, rental: &Rental) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rentals (id, start_date, end_date, book_id, status, user_email)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(rental.id())
        .bind(rental.start_date())
        .bind(rental.end_date())
        .bind(rental.book_id())
        .bind(i16::from(rental.status()))
        .bind(rental.user_email().as_str())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn update_status(&self, tx: &mut Transaction<'_, Postgres>, rental: &Rental) -> AppResult<()> {
        let result = sqlx::query("UPDATE rentals SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(rental.id())
            .bind(i16::from(rental.status()))
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Rental with id {} not found", rental.id())));
        }
        Ok(())
    }

    /// Filter by status, by user email (case-insensitive), by both or by neither
    pub async fn filter(&self, status: Option<RentalStatus>, user_email: Option<&Email>) -> AppResult<Vec<Rental>> {
        let rows = sqlx::query_as::<_, RentalRow>(&format!(
            r#"
            SELECT {} FROM rentals
            WHERE ($1::smallint IS NULL OR status = $1)
              AND ($2::text IS NULL OR LOWER(user_email) = $2)
            ORDER BY start_date DESC, id
            "#,
            RENTAL_COLUMNS
        ))
        .bind(status.map(i16::from))
        .bind(user_email.map(Email::normalized))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Rental::try_from).collect()
    }

    /// Count open rentals of `book_id` whose period intersects `[start, end)`
    pub async fn count_overlapping(
        &self,
        book_id: BookId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM rentals
            WHERE book_id = $1 AND status = ANY($2)
              AND start_date < $4 AND $3 < end_date
            "#,
        )
        .bind(book_id)
        .bind(&OPEN_STATUSES[..])
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Same as `count_overlapping`, restricted to one user and read inside
    /// the booking transaction
    pub async fn count_user_overlapping(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        book_id: BookId,
        user_email: &Email,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM rentals
            WHERE book_id = $1 AND status = ANY($2)
              AND LOWER(user_email) = $3
              AND start_date < $5 AND $4 < end_date
            "#,
        )
        .bind(book_id)
        .bind(&OPEN_STATUSES[..])
        .bind(user_email.normalized())
        .bind(start)
        .bind(end)
        .fetch_one(&mut **tx)
        .await?;

        Ok(count)
    }
}
