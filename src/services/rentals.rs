//! Rental lifecycle service

use chrono::Utc;

use crate::{
    config::RentalsConfig,
    error::{AppError, AppResult},
    models::{
        ids::{BookId, RentalId},
        book::Book,
        rental::{self, CreateRental, Rental, RentalQuery, RentalRequest, RentalStatus},
        value_objects::Email,
    },
    repository::Repository,
};

/// Status change requested on an existing rental
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalAction {
    Pending,
    Activate,
    Complete,
    Cancel,
}

impl RentalAction {
    pub fn apply(self, rental: &mut Rental) -> AppResult<()> {
        match self {
            RentalAction::Pending => rental.mark_as_pending(),
            RentalAction::Activate => rental.mark_as_active(),
            RentalAction::Complete => rental.mark_as_completed(),
            RentalAction::Cancel => rental.cancel_booking(),
        }
    }
}

/// True when a change from `before` to `after` gives the copy back
fn releases_copy(before: RentalStatus, after: RentalStatus) -> bool {
    before.is_open() && after.is_terminal()
}

/// Put one copy back on the shelf and return the count it replaced
fn return_copy(book: &mut Book) -> AppResult<i32> {
    let previous = book.amount_of_copies().value();
    book.update_stock(previous + 1).map_err(|e| AppError::business("returning copy to stock", e))?;
    Ok(previous)
}

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
    config: RentalsConfig,
}

impl RentalsService {
    pub fn new(repository: Repository, config: RentalsConfig) -> Self {
        Self { repository, config }
    }

    /// Book a copy for `user_email`.
    ///
    /// The book row stays locked from the availability check until the
    /// rental and the new stock count are committed together.
    pub async fn create_rental(&self, input: &CreateRental, user_email: &str) -> AppResult<Rental> {
        let request = RentalRequest::new(&input.start_date, &input.end_date, user_email, Utc::now())?;
        let book_id = BookId::from_uuid(input.book_id)?;

        let mut tx = self.repository.begin().await?;
        let mut book = self.repository.books.get_for_update(&mut tx, book_id).await?;

        let already_booked = self
            .repository
            .rentals
            .count_user_overlapping(
                &mut tx,
                book_id,
                &request.user_email,
                request.start.value(),
                request.end.value(),
            )
            .await?;
        if already_booked > 0 {
            return Err(AppError::Conflict(format!(
                "{} already has an open rental of book {} in this period",
                request.user_email, book_id
            )));
        }

        let previous = book.amount_of_copies().value();
        let rental = rental::book_rental(&mut book, request)?;

        self.repository.rentals.add(&mut tx, &rental).await?;
        self.repository.books.update_stock(&mut tx, &book, previous).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::business("committing rental", e))?;

        tracing::info!(
            rental_id = %rental.id(),
            book_id = %book_id,
            remaining = book.amount_of_copies().value(),
            "Rental created"
        );
        Ok(rental)
    }

    pub async fn get_rental(&self, id: RentalId) -> AppResult<Rental> {
        self.repository.rentals.get_by_id(id).await
    }

    /// All rentals, or those matching the status and/or email filters
    pub async fn list_rentals(&self, query: &RentalQuery) -> AppResult<Vec<Rental>> {
        let status = query
            .status
            .as_deref()
            .map(str::parse::<RentalStatus>)
            .transpose()
            .map_err(AppError::BadRequest)?;
        let email = query.user_email.as_deref().map(Email::new).transpose()?;

        match (status, email) {
            (None, None) => self.repository.rentals.get_all().await,
            (status, email) => self.repository.rentals.filter(status, email.as_ref()).await,
        }
    }

    /// Apply a guarded status change.
    ///
    /// With `rentals.restock_on_close`, closing an open rental puts one copy
    /// back in the same transaction.
    pub async fn change_status(&self, id: RentalId, action: RentalAction) -> AppResult<Rental> {
        let mut tx = self.repository.begin().await?;
        let mut rental = self.repository.rentals.get_for_update(&mut tx, id).await?;
        let before = rental.status();

        action.apply(&mut rental)?;
        self.repository.rentals.update_status(&mut tx, &rental).await?;

        if self.config.restock_on_close && releases_copy(before, rental.status()) {
            let mut book = self.repository.books.get_for_update(&mut tx, rental.book_id()).await?;
            let previous = return_copy(&mut book)?;
            self.repository.books.update_stock(&mut tx, &book, previous).await?;
            tracing::debug!(book_id = %book.id(), "Copy returned to stock");
        }

        tx.commit()
            .await
            .map_err(|e| AppError::business("committing status change", e))?;

        tracing::info!(rental_id = %id, from = %before, to = %rental.status(), "Rental status changed");
        Ok(rental)
    }
}
