//! Natural key of a reconciled report: `(owner_id, report_identity)`.
//!
//! The report identity is exactly the stored upload filename. Two different
//! documents uploaded under the same name for the same owner resolve to the
//! same record and the later upload replaces the earlier one. This is a known
//! limitation of filename-keyed reports.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MAX_REPORT_IDENTITY_LEN;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Missing owner id")]
    MissingOwner,

    #[error("Missing stored filename")]
    MissingFilename,

    #[error("Stored filename exceeds {MAX_REPORT_IDENTITY_LEN} bytes")]
    FilenameTooLong,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordIdentity {
    pub owner_id: String,
    pub report_identity: String,
}

/// Compute the record key. Pure; the only failures are missing arguments.
pub fn resolve(owner_id: &str, stored_filename: &str) -> Result<RecordIdentity, IdentityError> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(IdentityError::MissingOwner);
    }
    if stored_filename.trim().is_empty() {
        return Err(IdentityError::MissingFilename);
    }
    if stored_filename.len() > MAX_REPORT_IDENTITY_LEN {
        return Err(IdentityError::FilenameTooLong);
    }

    Ok(RecordIdentity {
        owner_id: owner_id.to_string(),
        report_identity: stored_filename.to_string(),
    })
}

/// Name an upload is stored under: the final path component of the
/// client-supplied filename, trimmed. `None` if nothing usable remains.
pub fn stored_filename(original: &str) -> Option<String> {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
