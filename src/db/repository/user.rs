use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::User;

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let body = serde_json::to_string(user)?;
    let now = now_string();
    conn.execute(
        "INSERT INTO users (id, email_id, body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![user.id.to_string(), user.email_id, body, now],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            DatabaseError::Duplicate {
                entity_type: "User".into(),
                key: user.email_id.clone(),
            }
        }
        other => DatabaseError::Sqlite(other),
    })?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &Uuid) -> Result<Option<User>, DatabaseError> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| serde_json::from_str(&b))
        .transpose()
        .map_err(DatabaseError::from)
}

/// Overwrite the stored body of an existing user. The email column is not
/// touched; it is fixed at creation.
pub fn update_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE users SET body = ?2, updated_at = ?3 WHERE id = ?1",
        params![user.id.to_string(), serde_json::to_string(user)?, now_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user.id.to_string(),
        });
    }
    Ok(())
}
