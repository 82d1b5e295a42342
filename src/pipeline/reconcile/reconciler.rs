use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::policy::{FieldRule, MergePolicy};
use super::ReconcileError;
use crate::models::{ProfileRecord, ReportDocument};
use crate::pipeline::field_path;
use crate::pipeline::identity::RecordIdentity;
use crate::pipeline::schema::SchemaId;

/// Outcome of one reconciliation, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<R> {
    pub document: ReportDocument<R>,
    pub created: bool,
    /// Mergeable paths whose stored value differs from before.
    pub changed_fields: Vec<&'static str>,
}

/// Merge a freshly extracted record into the stored document for `identity`.
///
/// With no stored document a new one is built from `incoming`. Otherwise
/// every mergeable field is taken from `incoming` according to the record's
/// rule table, the identity fields are kept, and `lastUpdated` is restamped.
/// The stamp never moves backwards: if the clock reads earlier than the stored
/// stamp, the new stamp is one millisecond past it.
pub fn reconcile<R: ProfileRecord>(
    existing: Option<&ReportDocument<R>>,
    incoming: R,
    identity: &RecordIdentity,
    schema: SchemaId,
    now: DateTime<Utc>,
) -> Result<Reconciled<R>, ReconcileError> {
    if schema.domain != R::DOMAIN {
        return Err(ReconcileError::SchemaMismatch {
            expected: R::DOMAIN,
            found: schema,
        });
    }

    let Some(existing) = existing else {
        return Ok(Reconciled {
            document: ReportDocument {
                owner_id: identity.owner_id.clone(),
                report_identity: identity.report_identity.clone(),
                schema,
                last_updated: now,
                record: incoming,
            },
            created: true,
            changed_fields: Vec::new(),
        });
    };

    if existing.identity() != *identity {
        return Err(ReconcileError::IdentityMismatch {
            stored: existing.identity(),
            requested: identity.clone(),
        });
    }

    let stored = serde_json::to_value(&existing.record)?;
    let fresh = serde_json::to_value(&incoming)?;
    let (merged, changed_fields) = merge_values(&stored, &fresh, R::merge_rules());
    let record: R = serde_json::from_value(merged)?;

    let last_updated = if now > existing.last_updated {
        now
    } else {
        existing.last_updated + Duration::milliseconds(1)
    };

    Ok(Reconciled {
        document: ReportDocument {
            owner_id: existing.owner_id.clone(),
            report_identity: existing.report_identity.clone(),
            schema,
            last_updated,
            record,
        },
        created: false,
        changed_fields,
    })
}

/// Apply `rules` to move mergeable fields from `fresh` onto `stored`.
pub(crate) fn merge_values(
    stored: &Value,
    fresh: &Value,
    rules: &[FieldRule],
) -> (Value, Vec<&'static str>) {
    let mut merged = stored.clone();
    let mut changed = Vec::new();

    for rule in rules.iter().filter(|r| r.policy.is_mergeable()) {
        let before = field_path::get(stored, rule.path).cloned();
        let incoming = field_path::get(fresh, rule.path).cloned();

        let after = match rule.policy {
            MergePolicy::Append => append(before.as_ref(), incoming),
            _ => incoming,
        };

        if after == before {
            continue;
        }
        match after {
            Some(value) => {
                field_path::set(&mut merged, rule.path, value);
            }
            None => {
                field_path::remove(&mut merged, rule.path);
            }
        }
        changed.push(rule.path);
    }

    (merged, changed)
}

fn append(stored: Option<&Value>, incoming: Option<Value>) -> Option<Value> {
    let mut items = stored
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let Some(Value::Array(new_items)) = incoming else {
        return stored.cloned();
    };
    for item in new_items {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    Some(Value::Array(items))
}
