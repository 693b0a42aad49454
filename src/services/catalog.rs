//! Catalog management service

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookAvailability, BookField, BookQuery, CreateBook},
        ids::BookId,
        value_objects::{Isbn, RentalEndDate, RentalStartDate},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books, or look them up by the first filter present in `query`
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let include_deleted = query.include_deleted.unwrap_or(false);

        let books = match query.lookup() {
            None => self.repository.books.get_all(include_deleted).await?,
            Some((BookField::Isbn, value)) => {
                let isbn = Isbn::parse(value)?;
                self.repository
                    .books
                    .find_by_isbn(&isbn)
                    .await?
                    .into_iter()
                    .filter(|book| include_deleted || !book.is_deleted())
                    .collect()
            }
            Some((field, value)) => self.repository.books.find_by(field, value, include_deleted).await?,
        };

        Ok(paginate(books, query.page, query.per_page))
    }

    pub async fn get_book(&self, id: BookId) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Validate and register a new book under a fresh id
    pub async fn create_book(&self, draft: CreateBook) -> AppResult<Book> {
        let book = Book::create(BookId::generate(), &draft, &self.repository.books).await?;

        let mut tx = self.repository.begin().await?;
        self.repository.books.add(&mut tx, &book).await?;
        tx.commit().await?;

        tracing::info!(book_id = %book.id(), isbn = %book.isbn(), "Book added to catalog");
        Ok(book)
    }

    /// Replace the stock count of a book
    pub async fn update_stock(&self, id: BookId, amount_of_copies: i32) -> AppResult<Book> {
        let mut tx = self.repository.begin().await?;
        let mut book = self.repository.books.get_for_update(&mut tx, id).await?;
        let previous = book.amount_of_copies().value();

        book.update_stock(amount_of_copies)?;
        self.repository.books.update_stock(&mut tx, &book, previous).await?;
        tx.commit().await?;

        tracing::info!(book_id = %id, previous, current = amount_of_copies, "Stock updated");
        Ok(book)
    }

    /// Soft delete. Deleting an already deleted book succeeds.
    pub async fn delete_book(&self, id: BookId) -> AppResult<()> {
        let mut tx = self.repository.begin().await?;
        let mut book = self.repository.books.get_for_update(&mut tx, id).await?;

        if !book.is_deleted() {
            book.soft_delete();
            self.repository.books.update(&mut tx, &book).await?;
            tracing::info!(book_id = %id, "Book soft deleted");
        }
        tx.commit().await?;
        Ok(())
    }

    /// Stock and open rentals of a book over a requested window
    pub async fn availability(&self, id: BookId, start_date: &str, end_date: &str) -> AppResult<BookAvailability> {
        let now = Utc::now();
        let start = RentalStartDate::parse(start_date, now)?;
        let end = RentalEndDate::parse(end_date, &start, now)?;

        let book = self.repository.books.get_by_id(id).await?;
        let overlapping = self
            .repository
            .rentals
            .count_overlapping(id, start.value(), end.value())
            .await?;

        Ok(BookAvailability {
            book_id: *id.as_uuid(),
            amount_of_copies: book.amount_of_copies().value(),
            overlapping_rentals: overlapping,
            available: book.has_available_copy(),
        })
    }
}

/// Slice one page out of `items`. No page given means everything.
/// A page past the end, including one whose offset overflows, is empty.
fn paginate<T>(items: Vec<T>, page: Option<i64>, per_page: Option<i64>) -> Vec<T> {
    let Some(per_page) = per_page else {
        return items;
    };
    let per_page = usize::try_from(per_page.max(1)).unwrap_or(usize::MAX);
    let page = usize::try_from(page.unwrap_or(1).max(1)).unwrap_or(usize::MAX);

    match (page - 1).checked_mul(per_page) {
        Some(offset) => items.into_iter().skip(offset).take(per_page).collect(),
        None => Vec::new(),
    }
}
