//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookField, BookRow},
        ids::BookId,
        value_objects::{Isbn, IsbnUniqueness},
    },
};

const BOOK_COLUMNS: &str =
    "id, name, amount_of_copies, author, category, description, isbn, publisher, active";

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List the catalog, soft-deleted books only when asked for
    pub async fn get_all(&self, include_deleted: bool) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE ($1 OR active) ORDER BY name, id",
            BOOK_COLUMNS
        ))
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    /// Get book by ID, deleted or not
    pub async fn get_by_id(&self, id: BookId) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?
            .try_into()
    }

    /// Load and lock a book row until the transaction ends
    pub async fn get_for_update(&self, tx: &mut Transaction<'_, Postgres>, id: BookId) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?
        .try_into()
    }

    pub async fn add(&self, tx: &mut Transaction<'_, Postgres>, book: &Book) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, name, amount_of_copies, author, category, description, isbn, publisher, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(book.id())
        .bind(book.name().as_str())
        .bind(book.amount_of_copies().value())
        .bind(book.author().as_str())
        .bind(book.category().as_str())
        .bind(book.description().as_str())
        .bind(book.isbn().as_str())
        .bind(book.publisher().as_str())
        .bind(book.is_active())
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(format!(
                "A book with ISBN {} already exists",
                book.isbn()
            )),
            other => AppError::Database(other),
        })?;

        Ok(())
    }

    /// Write every mutable column of `book`
    pub async fn update(&self, tx: &mut Transaction<'_, Postgres>, book: &Book) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET name = $2, amount_of_copies = $3, author = $4, category = $5,
                description = $6, publisher = $7, active = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(book.id())
        .bind(book.name().as_str())
        .bind(book.amount_of_copies().value())
        .bind(book.author().as_str())
        .bind(book.category().as_str())
        .bind(book.description().as_str())
        .bind(book.publisher().as_str())
        .bind(book.is_active())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", book.id())));
        }
        Ok(())
    }

    /// Compare-and-swap the stock count.
    ///
    /// Fails with a conflict when the stored count is no longer `expected`.
    pub async fn update_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        book: &Book,
        expected: i32,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books SET amount_of_copies = $2, updated_at = NOW()
            WHERE id = $1 AND amount_of_copies = $3
            "#,
        )
        .bind(book.id())
        .bind(book.amount_of_copies().value())
        .bind(expected)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Stock of book {} changed concurrently",
                book.id()
            )));
        }
        Ok(())
    }

    pub async fn find_by_isbn(&self, isbn: &Isbn) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>(&format!("SELECT {} FROM books WHERE isbn = $1", BOOK_COLUMNS))
            .bind(isbn.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Book::try_from)
            .transpose()
    }

    /// Exact match on `field`, falling back to a case-insensitive match when
    /// nothing matches exactly
    pub async fn find_by(&self, field: BookField, value: &str, include_deleted: bool) -> AppResult<Vec<Book>> {
        let column = field.column();

        let exact = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE {} = $1 AND ($2 OR active) ORDER BY name, id",
            BOOK_COLUMNS, column
        ))
        .bind(value)
        .bind(include_deleted)
        .fetch_all(&self.pool)
        .await?;

        let rows = if exact.is_empty() {
            sqlx::query_as::<_, BookRow>(&format!(
                "SELECT {} FROM books WHERE LOWER({}) = LOWER($1) AND ($2 OR active) ORDER BY name, id",
                BOOK_COLUMNS, column
            ))
            .bind(value)
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await?
        } else {
            exact
        };

        rows.into_iter().map(Book::try_from).collect()
    }

    /// Check if an ISBN (canonical form) is already catalogued, deleted books included
    pub async fn isbn_exists(&self, isbn: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl IsbnUniqueness for BooksRepository {
    async fn is_registered(&self, isbn: &str) -> AppResult<bool> {
        self.isbn_exists(isbn).await
    }
}
