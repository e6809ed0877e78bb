//! Repository implementations for CRUD operations.

pub mod registration_codes;
pub mod repository;
pub mod users;
pub mod vendors;

pub use registration_codes::RegistrationCodes;
pub use repository::Repository;
pub use users::Users;
pub use vendors::Vendors;
