//! Domain models for the library rental server

pub mod book;
pub mod ids;
pub mod rental;
pub mod user;
pub mod value_objects;

// Re-export commonly used types
pub use book::{Book, BookDto};
pub use ids::{BookId, RentalId, RoleId, UserId};
pub use rental::{Rental, RentalDto, RentalStatus};
pub use user::{Role, RoleName, User, UserClaims, UserDto};
