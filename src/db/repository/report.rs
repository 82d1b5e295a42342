use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::db::DatabaseError;
use crate::pipeline::identity::RecordIdentity;
use crate::pipeline::schema::SchemaId;

pub fn find_report_document(
    conn: &Connection,
    collection: &str,
    identity: &RecordIdentity,
) -> Result<Option<Value>, DatabaseError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM report_documents
             WHERE collection = ?1 AND owner_id = ?2 AND report_identity = ?3",
            params![collection, identity.owner_id, identity.report_identity],
            |row| row.get(0),
        )
        .optional()?;

    body.map(|b| serde_json::from_str(&b))
        .transpose()
        .map_err(DatabaseError::from)
}

/// Insert or replace the document for `identity` in one statement.
pub fn upsert_report_document(
    conn: &Connection,
    collection: &str,
    identity: &RecordIdentity,
    schema: SchemaId,
    last_updated: DateTime<Utc>,
    body: &Value,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO report_documents
            (collection, owner_id, report_identity, schema_id, body, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (collection, owner_id, report_identity) DO UPDATE SET
            schema_id = excluded.schema_id,
            body = excluded.body,
            last_updated = excluded.last_updated",
        params![
            collection,
            identity.owner_id,
            identity.report_identity,
            schema.to_string(),
            serde_json::to_string(body)?,
            last_updated.to_rfc3339_opts(SecondsFormat::Millis, true),
        ],
    )?;
    Ok(())
}

/// Every document an owner has in `collection`, newest first.
pub fn list_report_documents(
    conn: &Connection,
    collection: &str,
    owner_id: &str,
) -> Result<Vec<Value>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT body FROM report_documents
         WHERE collection = ?1 AND owner_id = ?2
         ORDER BY last_updated DESC, report_identity ASC",
    )?;

    let rows = stmt.query_map(params![collection, owner_id], |row| row.get::<_, String>(0))?;

    let mut documents = Vec::new();
    for row in rows {
        documents.push(serde_json::from_str(&row?)?);
    }
    Ok(documents)
}

pub fn count_report_documents(conn: &Connection, collection: &str) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM report_documents WHERE collection = ?1",
        params![collection],
        |row| row.get(0),
    )?;
    Ok(count)
}
