pub mod diabetes;
pub mod document;
pub mod enums;
pub mod medical_report;
pub mod user;

pub use diabetes::*;
pub use document::*;
pub use medical_report::*;
pub use user::*;

use serde::Serialize;

/// One field-level reason a value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
