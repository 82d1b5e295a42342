pub mod policy;
pub mod reconciler;

pub use policy::{FieldRule, MergePolicy};
pub use reconciler::{reconcile, Reconciled};

use thiserror::Error;

use crate::pipeline::identity::RecordIdentity;
use crate::pipeline::schema::{SchemaDomain, SchemaId};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Stored document {stored:?} does not match requested identity {requested:?}")]
    IdentityMismatch {
        stored: RecordIdentity,
        requested: RecordIdentity,
    },

    #[error("Schema {found} cannot produce a {expected} record")]
    SchemaMismatch {
        expected: SchemaDomain,
        found: SchemaId,
    },

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
