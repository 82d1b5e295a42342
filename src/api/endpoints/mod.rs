//! API endpoint handlers.
//!
//! One module per resource. Handlers validate input, call into `pipeline`
//! or the persistence gateway, and map failures through `ApiError`.

pub mod health;
pub mod privacy;
pub mod reports;
pub mod users;
