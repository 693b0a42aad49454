//! Rental aggregate and its lifecycle.
//!
//! ```text
//! Pending --> Active --> Completed
//!    \          |
//!     `---------+-----> Cancelled
//! ```
//!
//! Completed and Cancelled are terminal. Transitions not drawn above are
//! rejected with `AppError::InvalidTransition`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::book::Book;
use super::ids::{BookId, RentalId};
use super::value_objects::{Email, RentalEndDate, RentalStartDate};
use crate::error::{AppError, AppResult};

/// Rental status, stored as 1-4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[repr(i16)]
pub enum RentalStatus {
    Pending = 1,
    Active = 2,
    Completed = 3,
    Cancelled = 4,
}

impl RentalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }

    /// Open rentals hold a copy of the book
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        use RentalStatus::*;
        matches!(
            (self, next),
            (Pending, Pending)
                | (Pending, Active)
                | (Active, Active)
                | (Pending, Cancelled)
                | (Active, Cancelled)
                | (Active, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "Pending",
            RentalStatus::Active => "Active",
            RentalStatus::Completed => "Completed",
            RentalStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RentalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "1" => Ok(RentalStatus::Pending),
            "active" | "2" => Ok(RentalStatus::Active),
            "completed" | "3" => Ok(RentalStatus::Completed),
            "cancelled" | "canceled" | "4" => Ok(RentalStatus::Cancelled),
            _ => Err(format!("Invalid rental status: {}", s)),
        }
    }
}

impl TryFrom<i16> for RentalStatus {
    type Error = AppError;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(RentalStatus::Pending),
            2 => Ok(RentalStatus::Active),
            3 => Ok(RentalStatus::Completed),
            4 => Ok(RentalStatus::Cancelled),
            _ => Err(AppError::Internal(format!("Unknown rental status code {}", v))),
        }
    }
}

impl From<RentalStatus> for i16 {
    fn from(s: RentalStatus) -> Self {
        s as i16
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rental {
    id: RentalId,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    book_id: BookId,
    status: RentalStatus,
    user_email: Email,
}

impl Rental {
    /// Build a rental from already validated dates
    pub fn new(
        id: RentalId,
        start: RentalStartDate,
        end: RentalEndDate,
        book_id: BookId,
        user_email: Email,
        status: RentalStatus,
    ) -> Self {
        Self {
            id,
            start_date: start.value(),
            end_date: end.value(),
            book_id,
            status,
            user_email,
        }
    }

    fn transition(&mut self, next: RentalStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidTransition(format!(
                "Rental {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_as_pending(&mut self) -> AppResult<()> {
        self.transition(RentalStatus::Pending)
    }

    pub fn mark_as_active(&mut self) -> AppResult<()> {
        self.transition(RentalStatus::Active)
    }

    pub fn mark_as_completed(&mut self) -> AppResult<()> {
        self.transition(RentalStatus::Completed)
    }

    pub fn cancel_booking(&mut self) -> AppResult<()> {
        self.transition(RentalStatus::Cancelled)
    }

    pub fn id(&self) -> RentalId {
        self.id
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn status(&self) -> RentalStatus {
        self.status
    }

    pub fn user_email(&self) -> &Email {
        &self.user_email
    }
}

/// Validated booking input
#[derive(Debug, Clone)]
pub struct RentalRequest {
    pub start: RentalStartDate,
    pub end: RentalEndDate,
    pub user_email: Email,
}

impl RentalRequest {
    /// Validate raw dates and email. `now` anchors the past/future checks.
    pub fn new(start_date: &str, end_date: &str, user_email: &str, now: DateTime<Utc>) -> AppResult<Self> {
        let start = RentalStartDate::parse(start_date, now)?;
        let end = RentalEndDate::parse(end_date, &start, now)?;
        let user_email = Email::new(user_email)?;
        Ok(Self { start, end, user_email })
    }
}

/// Book a copy of `book` for the request.
///
/// The rental is created `Active` and the book loses exactly one copy. If
/// the book has no copy left nothing is modified.
pub fn book_rental(book: &mut Book, request: RentalRequest) -> AppResult<Rental> {
    if !book.has_available_copy() {
        return Err(AppError::NotAvailable(format!(
            "Book {} has no available copies",
            book.id()
        )));
    }

    let rental = Rental::new(
        RentalId::generate(),
        request.start,
        request.end,
        book.id(),
        request.user_email,
        RentalStatus::Active,
    );

    // Availability was checked above, so a failure here is unexpected
    let remaining = book.amount_of_copies().value() - 1;
    book.update_stock(remaining).map_err(|e| AppError::business("decrementing stock", e))?;

    Ok(rental)
}

/// Internal row structure for database queries
#[derive(Debug, Clone, FromRow)]
pub struct RentalRow {
    pub id: RentalId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub book_id: BookId,
    pub status: i16,
    pub user_email: String,
}

impl TryFrom<RentalRow> for Rental {
    type Error = AppError;

    /// Stored rentals may lie in the past, so only the span is revalidated
    fn try_from(row: RentalRow) -> Result<Self, Self::Error> {
        RentalEndDate::check_span(row.end_date, row.start_date)?;
        Ok(Rental {
            id: row.id,
            start_date: row.start_date,
            end_date: row.end_date,
            book_id: row.book_id,
            status: RentalStatus::try_from(row.status)?,
            user_email: Email::new(&row.user_email)?,
        })
    }
}

/// Create rental request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRental {
    pub book_id: Uuid,
    /// RFC 3339 timestamp
    pub start_date: String,
    /// RFC 3339 timestamp
    pub end_date: String,
    /// Defaults to the authenticated user's email
    pub user_email: Option<String>,
}

/// Rental filters
#[derive(Debug, Default, Deserialize, Validate, IntoParams, ToSchema)]
pub struct RentalQuery {
    /// Pending, Active, Completed or Cancelled
    pub status: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub user_email: Option<String>,
}

/// Date window for availability lookups
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DateWindow {
    pub start_date: String,
    pub end_date: String,
}

/// Rental as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RentalDto {
    pub id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub book_id: Uuid,
    pub status: RentalStatus,
    pub user_email: String,
}

impl From<&Rental> for RentalDto {
    fn from(rental: &Rental) -> Self {
        Self {
            id: *rental.id.as_uuid(),
            start_date: rental.start_date,
            end_date: rental.end_date,
            book_id: *rental.book_id.as_uuid(),
            status: rental.status,
            user_email: rental.user_email.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::tests::book_with_copies;
    use chrono::Duration;

    fn request() -> RentalRequest {
        let now = Utc::now();
        let start = (now + Duration::hours(1)).to_rfc3339();
        let end = (now + Duration::days(7)).to_rfc3339();
        RentalRequest::new(&start, &end, "reader@library.pt", now).unwrap()
    }

    fn rental_in(status: RentalStatus) -> Rental {
        let now = Utc::now();
        let start = RentalStartDate::new(now, now).unwrap();
        let end = RentalEndDate::new(now + Duration::days(3), &start, now).unwrap();
        Rental::new(
            RentalId::generate(),
            start,
            end,
            BookId::generate(),
            Email::new("reader@library.pt").unwrap(),
            status,
        )
    }

    #[test]
    fn test_booking_last_copy() {
        let mut book = book_with_copies(1);

        let rental = book_rental(&mut book, request()).unwrap();
        assert_eq!(rental.status(), RentalStatus::Active);
        assert_eq!(rental.book_id(), book.id());
        assert_eq!(book.amount_of_copies().value(), 0);

        let err = book_rental(&mut book, request()).unwrap_err();
        assert!(matches!(err, AppError::NotAvailable(_)));
        assert_eq!(book.amount_of_copies().value(), 0);
    }

    #[test]
    fn test_booking_decrements_by_one() {
        let mut book = book_with_copies(3);
        book_rental(&mut book, request()).unwrap();
        assert_eq!(book.amount_of_copies().value(), 2);
    }

    #[test]
    fn test_cancel_does_not_touch_stock() {
        let mut book = book_with_copies(3);
        let mut rental = book_rental(&mut book, request()).unwrap();
        rental.cancel_booking().unwrap();
        assert_eq!(rental.status(), RentalStatus::Cancelled);
        assert_eq!(book.amount_of_copies().value(), 2);
    }

    #[test]
    fn test_deleted_book_cannot_be_rented() {
        let mut book = book_with_copies(5);
        book.soft_delete();
        assert!(matches!(book_rental(&mut book, request()), Err(AppError::NotAvailable(_))));
        assert_eq!(book.amount_of_copies().value(), 5);
    }

    #[test]
    fn test_request_validation() {
        let now = Utc::now();
        let start = (now + Duration::days(1)).to_rfc3339();

        let too_long = (now + Duration::days(40)).to_rfc3339();
        assert!(matches!(
            RentalRequest::new(&start, &too_long, "reader@library.pt", now),
            Err(AppError::Validation(_))
        ));

        let before = now.to_rfc3339();
        assert!(RentalRequest::new(&start, &before, "reader@library.pt", now).is_err());

        let end = (now + Duration::days(2)).to_rfc3339();
        assert!(RentalRequest::new(&start, &end, "not-an-email", now).is_err());
    }

    #[test]
    fn test_transitions() {
        use RentalStatus::*;

        let mut rental = rental_in(Pending);
        rental.mark_as_pending().unwrap();
        rental.mark_as_active().unwrap();
        rental.mark_as_completed().unwrap();
        assert_eq!(rental.status(), Completed);

        let mut rental = rental_in(Pending);
        rental.cancel_booking().unwrap();
        assert_eq!(rental.status(), Cancelled);
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        for terminal in [RentalStatus::Completed, RentalStatus::Cancelled] {
            let mut rental = rental_in(terminal);
            assert!(rental.mark_as_pending().is_err());
            assert!(rental.mark_as_active().is_err());
            assert!(rental.mark_as_completed().is_err());
            assert!(rental.cancel_booking().is_err());
            assert_eq!(rental.status(), terminal);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let mut rental = rental_in(RentalStatus::Pending);
        assert!(matches!(rental.mark_as_completed(), Err(AppError::InvalidTransition(_))));

        let mut rental = rental_in(RentalStatus::Active);
        assert!(rental.mark_as_pending().is_err());
        assert_eq!(rental.status(), RentalStatus::Active);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(i16::from(RentalStatus::Pending), 1);
        assert_eq!(i16::from(RentalStatus::Cancelled), 4);
        assert_eq!(RentalStatus::try_from(3).unwrap(), RentalStatus::Completed);
        assert!(RentalStatus::try_from(9).is_err());
        assert_eq!("active".parse::<RentalStatus>().unwrap(), RentalStatus::Active);
        assert_eq!(serde_json::to_string(&RentalStatus::Active).unwrap(), "\"Active\"");
    }
}
