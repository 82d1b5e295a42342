//! Persistence gateway: the storage seam the pipeline and API write through.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::{DiabetesRecord, FieldViolation, ProfileRecord, ReportDocument, StructuredRecord, User};
use crate::pipeline::identity::RecordIdentity;
use crate::pipeline::profile_patch::{self, FieldPatch, PatchError};
use crate::pipeline::schema::{SchemaDomain, SchemaId};

/// Document store with atomic single-document upsert and field-level update.
pub trait PersistenceGateway: Send + Sync {
    fn find_document(
        &self,
        collection: &str,
        identity: &RecordIdentity,
    ) -> Result<Option<Value>, DatabaseError>;

    fn upsert_document(
        &self,
        collection: &str,
        identity: &RecordIdentity,
        schema: SchemaId,
        last_updated: DateTime<Utc>,
        body: &Value,
    ) -> Result<(), DatabaseError>;

    fn list_documents(&self, collection: &str, owner_id: &str) -> Result<Vec<Value>, DatabaseError>;

    fn find_user(&self, id: &Uuid) -> Result<Option<User>, DatabaseError>;

    /// Fails with `Duplicate` when the email is already registered.
    fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    /// Apply `patch` to the stored user and write it back in one transaction.
    /// The patched document must still be a valid `User`; otherwise nothing
    /// is written and `Validation` is returned.
    fn update_user_fields(&self, id: &Uuid, patch: &FieldPatch) -> Result<User, DatabaseError>;
}

/// Collection holding the documents of a schema domain.
pub fn collection_for(domain: SchemaDomain) -> &'static str {
    match domain {
        SchemaDomain::MedicalReport => StructuredRecord::COLLECTION,
        SchemaDomain::Diabetes => DiabetesRecord::COLLECTION,
    }
}

pub fn find_report<R: ProfileRecord>(
    store: &dyn PersistenceGateway,
    identity: &RecordIdentity,
) -> Result<Option<ReportDocument<R>>, DatabaseError> {
    store
        .find_document(R::COLLECTION, identity)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(DatabaseError::from)
}

/// Validate and upsert a reconciled document.
pub fn save_report<R: ProfileRecord>(
    store: &dyn PersistenceGateway,
    document: &ReportDocument<R>,
) -> Result<(), DatabaseError> {
    document.validate().map_err(DatabaseError::Validation)?;
    let body = serde_json::to_value(document)?;
    store.upsert_document(
        R::COLLECTION,
        &document.identity(),
        document.schema,
        document.last_updated,
        &body,
    )
}

/// SQLite-backed gateway. One connection, serialised behind a mutex.
pub struct SqliteGateway {
    conn: Mutex<Connection>,
}

impl SqliteGateway {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

fn patch_violations(err: PatchError) -> Vec<FieldViolation> {
    match err {
        PatchError::Invalid(violations) => violations,
        other => vec![FieldViolation::new("profile", other.to_string())],
    }
}

impl PersistenceGateway for SqliteGateway {
    fn find_document(
        &self,
        collection: &str,
        identity: &RecordIdentity,
    ) -> Result<Option<Value>, DatabaseError> {
        repository::find_report_document(&*self.conn()?, collection, identity)
    }

    fn upsert_document(
        &self,
        collection: &str,
        identity: &RecordIdentity,
        schema: SchemaId,
        last_updated: DateTime<Utc>,
        body: &Value,
    ) -> Result<(), DatabaseError> {
        repository::upsert_report_document(&*self.conn()?, collection, identity, schema, last_updated, body)
    }

    fn list_documents(&self, collection: &str, owner_id: &str) -> Result<Vec<Value>, DatabaseError> {
        repository::list_report_documents(&*self.conn()?, collection, owner_id)
    }

    fn find_user(&self, id: &Uuid) -> Result<Option<User>, DatabaseError> {
        repository::get_user(&*self.conn()?, id)
    }

    fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        repository::insert_user(&*self.conn()?, user)
    }

    fn update_user_fields(&self, id: &Uuid, patch: &FieldPatch) -> Result<User, DatabaseError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let user = repository::get_user(&tx, id)?.ok_or_else(|| DatabaseError::NotFound {
            entity_type: "User".into(),
            id: id.to_string(),
        })?;

        let mut document = serde_json::to_value(&user)?;
        profile_patch::apply(&mut document, patch)
            .map_err(|e| DatabaseError::Validation(patch_violations(e)))?;
        let updated: User = serde_json::from_value(document).map_err(|e| {
            DatabaseError::Validation(vec![FieldViolation::new("profile", e.to_string())])
        })?;

        repository::update_user(&tx, &updated)?;
        tx.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::identity;
    use crate::pipeline::profile_patch::flatten_profile_update;
    use serde_json::json;

    fn sample_user() -> User {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "firstName": "Asha",
            "lastName": "Rao",
            "emailId": "asha@example.com",
            "password": "hash",
            "role": "patient"
        }))
        .unwrap()
    }

    fn sample_report(owner: &str, name: &str) -> ReportDocument<StructuredRecord> {
        ReportDocument {
            owner_id: owner.into(),
            report_identity: name.into(),
            schema: SchemaId::new(SchemaDomain::MedicalReport, 1),
            last_updated: Utc::now(),
            record: StructuredRecord::default(),
        }
    }

    #[test]
    fn save_and_find_typed_report() {
        let store = SqliteGateway::in_memory().unwrap();
        let doc = sample_report("U1", "cbc.pdf");
        save_report(&store, &doc).unwrap();
        let found: Option<ReportDocument<StructuredRecord>> =
            find_report(&store, &identity::resolve("U1", "cbc.pdf").unwrap()).unwrap();
        assert_eq!(found, Some(doc));
    }

    #[test]
    fn invalid_document_is_not_written() {
        let store = SqliteGateway::in_memory().unwrap();
        let mut doc = sample_report("U1", "cbc.pdf");
        doc.schema = SchemaId::new(SchemaDomain::Diabetes, 1);
        let err = save_report(&store, &doc).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert!(store
            .list_documents(collection_for(SchemaDomain::MedicalReport), "U1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn update_user_fields_applies_patch() {
        let store = SqliteGateway::in_memory().unwrap();
        let user = sample_user();
        store.insert_user(&user).unwrap();

        let patch = flatten_profile_update(&json!({
            "accountSettings": {"notifications": {"email": true}, "password": "x"}
        }))
        .unwrap();
        let updated = store.update_user_fields(&user.id, &patch).unwrap();

        assert!(updated.account_settings.notifications.email);
        assert_eq!(updated.password, user.password);
        assert_eq!(store.find_user(&user.id).unwrap(), Some(updated));
    }

    #[test]
    fn update_rejected_by_model_writes_nothing() {
        let store = SqliteGateway::in_memory().unwrap();
        let user = sample_user();
        store.insert_user(&user).unwrap();

        let mut patch = FieldPatch::new();
        patch.insert("gender".into(), json!("robot"));
        let err = store.update_user_fields(&user.id, &patch).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
        assert_eq!(store.find_user(&user.id).unwrap(), Some(user));
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let store = SqliteGateway::in_memory().unwrap();
        let patch = flatten_profile_update(&json!({"personalInfo": {"phone": "1"}})).unwrap();
        let err = store.update_user_fields(&Uuid::new_v4(), &patch).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
