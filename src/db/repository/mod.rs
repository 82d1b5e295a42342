pub mod report;
pub mod user;

pub use report::*;
pub use user::*;
