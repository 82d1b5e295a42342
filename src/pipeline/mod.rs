pub mod explanation;
pub mod extraction;
pub mod field_path;
pub mod identity;
pub mod ingest; // upload → extract → reconcile → persist
pub mod profile_patch;
pub mod reconcile;
pub mod schema;
