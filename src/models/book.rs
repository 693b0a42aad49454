//! Book aggregate: catalog entry with stock count and soft-delete flag

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::ids::BookId;
use super::value_objects::{
    AmountOfCopies, Author, BookName, Category, Description, Isbn, IsbnUniqueness, Publisher,
};
use crate::error::{AppError, AppResult};

/// Catalog entry
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    id: BookId,
    name: BookName,
    amount_of_copies: AmountOfCopies,
    author: Author,
    category: Category,
    description: Description,
    isbn: Isbn,
    publisher: Publisher,
    active: bool,
}

impl Book {
    /// Validate every field of `draft` and build an active book.
    ///
    /// Fields are checked in declaration order and the first failure is
    /// returned. The ISBN must not already belong to another book.
    pub async fn create(id: BookId, draft: &CreateBook, uniqueness: &dyn IsbnUniqueness) -> AppResult<Self> {
        let name = BookName::new(&draft.name)?;
        let amount_of_copies = AmountOfCopies::new(draft.amount_of_copies)?;
        let author = Author::new(&draft.author)?;
        let category = Category::new(&draft.category)?;
        let description = Description::new(&draft.description)?;
        let isbn = Isbn::new(&draft.isbn, uniqueness).await?;
        let publisher = Publisher::new(&draft.publisher)?;

        Ok(Self {
            id,
            name,
            amount_of_copies,
            author,
            category,
            description,
            isbn,
            publisher,
            active: true,
        })
    }

    /// Replace the stock count with a caller-computed total
    pub fn update_stock(&mut self, new_count: i32) -> AppResult<()> {
        self.amount_of_copies = AmountOfCopies::new(new_count)?;
        Ok(())
    }

    /// Mark as deleted. There is no way back.
    pub fn soft_delete(&mut self) {
        self.active = false;
    }

    pub fn is_deleted(&self) -> bool {
        !self.active
    }

    /// Active and at least one copy on the shelf
    pub fn has_available_copy(&self) -> bool {
        self.active && !self.amount_of_copies.is_zero()
    }

    pub fn id(&self) -> BookId {
        self.id
    }

    pub fn name(&self) -> &BookName {
        &self.name
    }

    pub fn amount_of_copies(&self) -> AmountOfCopies {
        self.amount_of_copies
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn description(&self) -> &Description {
        &self.description
    }

    pub fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: BookId,
    pub name: String,
    pub amount_of_copies: i32,
    pub author: String,
    pub category: String,
    pub description: String,
    pub isbn: String,
    pub publisher: String,
    pub active: bool,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    /// Rehydrate a stored book. Values are revalidated but the ISBN is not
    /// checked for uniqueness again.
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: row.id,
            name: BookName::new(&row.name)?,
            amount_of_copies: AmountOfCopies::new(row.amount_of_copies)?,
            author: Author::new(&row.author)?,
            category: Category::new(&row.category)?,
            description: Description::new(&row.description)?,
            isbn: Isbn::parse(&row.isbn)?,
            publisher: Publisher::new(&row.publisher)?,
            active: row.active,
        })
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBook {
    pub name: String,
    pub amount_of_copies: i32,
    pub author: String,
    pub category: String,
    pub description: String,
    /// ISBN-10 or ISBN-13, hyphens and spaces allowed
    pub isbn: String,
    pub publisher: String,
}

/// Update stock request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStock {
    /// New total number of copies (0-1500)
    pub amount_of_copies: i32,
}

/// Catalog lookup filters. Only the first filter given is applied.
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
pub struct BookQuery {
    pub isbn: Option<String>,
    pub name: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub publisher: Option<String>,
    pub include_deleted: Option<bool>,
    #[validate(range(min = 1, max = 1_000_000, message = "page must be between 1 and 1000000"))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 200, message = "per_page must be between 1 and 200"))]
    pub per_page: Option<i64>,
}

/// Field used by a catalog lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookField {
    Isbn,
    Name,
    Author,
    Category,
    Publisher,
}

impl BookField {
    pub fn column(&self) -> &'static str {
        match self {
            BookField::Isbn => "isbn",
            BookField::Name => "name",
            BookField::Author => "author",
            BookField::Category => "category",
            BookField::Publisher => "publisher",
        }
    }
}

impl BookQuery {
    /// The lookup requested, if any, in precedence order
    pub fn lookup(&self) -> Option<(BookField, &str)> {
        [
            (BookField::Isbn, &self.isbn),
            (BookField::Name, &self.name),
            (BookField::Author, &self.author),
            (BookField::Category, &self.category),
            (BookField::Publisher, &self.publisher),
        ]
        .into_iter()
        .find_map(|(field, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
    }
}

/// Book as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDto {
    pub id: Uuid,
    pub name: String,
    pub amount_of_copies: i32,
    pub author: String,
    pub category: String,
    pub description: String,
    pub isbn: String,
    pub publisher: String,
    pub active: bool,
}

impl From<&Book> for BookDto {
    fn from(book: &Book) -> Self {
        Self {
            id: *book.id.as_uuid(),
            name: book.name.to_string(),
            amount_of_copies: book.amount_of_copies.value(),
            author: book.author.to_string(),
            category: book.category.to_string(),
            description: book.description.to_string(),
            isbn: book.isbn.to_string(),
            publisher: book.publisher.to_string(),
            active: book.active,
        }
    }
}

/// Availability of a book over a date window
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookAvailability {
    pub book_id: Uuid,
    /// Copies currently on the shelf
    pub amount_of_copies: i32,
    /// Open rentals overlapping the requested window
    pub overlapping_rentals: i64,
    /// Whether a copy can be booked now. Open rentals already hold their
    /// copy out of `amount_of_copies`, so the window does not change it.
    pub available: bool,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::value_objects::isbn::MockIsbnUniqueness;
    use crate::models::value_objects::ValidationKind;

    pub(crate) fn draft(copies: i32) -> CreateBook {
        CreateBook {
            name: "The Name of the Rose".to_string(),
            amount_of_copies: copies,
            author: "Umberto Eco".to_string(),
            category: "Historical Fiction".to_string(),
            description: "A murder mystery set in an Italian abbey.".to_string(),
            isbn: "978-0-15-144647-6".to_string(),
            publisher: "Harcourt".to_string(),
        }
    }

    pub(crate) fn free_registry() -> MockIsbnUniqueness {
        let mut registry = MockIsbnUniqueness::new();
        registry.expect_is_registered().returning(|_| Ok(false));
        registry
    }

    pub(crate) fn book_with_copies(copies: i32) -> Book {
        tokio_test::block_on(Book::create(BookId::generate(), &draft(copies), &free_registry())).unwrap()
    }

    #[test]
    fn test_create_book() {
        let book = book_with_copies(3);
        assert!(book.is_active());
        assert!(!book.is_deleted());
        assert_eq!(book.amount_of_copies().value(), 3);
        assert_eq!(book.isbn().as_str(), "9780151446476");
    }

    #[test]
    fn test_create_reports_first_failing_field() {
        let mut bad = draft(3);
        bad.amount_of_copies = 5000;
        bad.author = "4uthor".to_string();

        let err = tokio_test::block_on(Book::create(BookId::generate(), &bad, &free_registry())).unwrap_err();
        match err {
            AppError::Validation(e) => {
                assert_eq!(e.field, "amount_of_copies");
                assert_eq!(e.kind, ValidationKind::Range);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_create_rejects_duplicate_isbn() {
        let mut registry = MockIsbnUniqueness::new();
        registry.expect_is_registered().returning(|_| Ok(true));

        let err = tokio_test::block_on(Book::create(BookId::generate(), &draft(1), &registry)).unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.kind == ValidationKind::Conflict));
    }

    #[test]
    fn test_update_stock() {
        let mut book = book_with_copies(3);
        book.update_stock(10).unwrap();
        assert_eq!(book.amount_of_copies().value(), 10);

        assert!(book.update_stock(-1).is_err());
        assert!(book.update_stock(1501).is_err());
        assert_eq!(book.amount_of_copies().value(), 10);
    }

    #[test]
    fn test_soft_delete_is_idempotent() {
        let mut book = book_with_copies(2);
        book.soft_delete();
        book.soft_delete();
        assert!(book.is_deleted());
        assert!(!book.has_available_copy());
    }

    #[test]
    fn test_rehydrate_from_row() {
        let row = BookRow {
            id: BookId::generate(),
            name: "Dune".to_string(),
            amount_of_copies: 0,
            author: "Frank Herbert".to_string(),
            category: "Science Fiction".to_string(),
            description: "Spice, sand and politics.".to_string(),
            isbn: "0306406152".to_string(),
            publisher: "Chilton Books".to_string(),
            active: false,
        };
        let book = Book::try_from(row).unwrap();
        assert!(book.is_deleted());
        assert!(!book.has_available_copy());
    }

    #[test]
    fn test_query_lookup_precedence() {
        let query = BookQuery {
            author: Some("Eco".to_string()),
            name: Some("  ".to_string()),
            publisher: Some("Harcourt".to_string()),
            ..Default::default()
        };
        assert_eq!(query.lookup(), Some((BookField::Author, "Eco")));
        assert_eq!(BookQuery::default().lookup(), None);
    }

    #[test]
    fn test_query_rejects_out_of_range_page() {
        let query = BookQuery {
            page: Some(i64::MAX),
            per_page: Some(200),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = BookQuery {
            page: Some(3),
            per_page: Some(200),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }
}
