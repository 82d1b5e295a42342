//! Profile update flattening.
//!
//! A nested partial payload such as
//! `{"accountSettings": {"notifications": {"email": true}}}` becomes the flat
//! assignment `accountSettings.notifications.email = true`. Only the closed
//! set of roots and fields in [`roots`] is ever walked; anything else in the
//! payload is ignored. Paths covered by an immutable merge rule are dropped.

pub mod roots;

pub use roots::{root_names, FieldKind, FieldSpec, RootSpec, PROFILE_ROOTS};

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::FieldViolation;
use crate::pipeline::field_path;
use crate::pipeline::reconcile::policy::{self, USER_PROFILE_RULES};

const NOT_AVAILABLE: &str = "NA";

/// Dotted path to value, ordered so the result never depends on payload order.
pub type FieldPatch = BTreeMap<String, Value>;

#[derive(Error, Debug, PartialEq)]
pub enum PatchError {
    #[error("Profile update payload must be a JSON object")]
    NotAnObject,

    #[error("Profile update contains invalid values")]
    Invalid(Vec<FieldViolation>),

    #[error("No valid fields to update")]
    NoValidFields,
}

/// Flatten a profile update with the recognised roots and the protected set
/// derived from the account merge rules.
pub fn flatten_profile_update(payload: &Value) -> Result<FieldPatch, PatchError> {
    let protected = policy::protected_fields(USER_PROFILE_RULES);
    flatten(payload, &root_names(), &protected)
}

/// Flatten `payload` into dotted assignments.
///
/// Roots outside `allowed_roots` and keys the root does not declare are
/// skipped. Emitted paths that fall under `protected` are dropped silently.
/// Type errors on declared fields are collected and reported together.
pub fn flatten(
    payload: &Value,
    allowed_roots: &[&str],
    protected: &[&str],
) -> Result<FieldPatch, PatchError> {
    let object = payload.as_object().ok_or(PatchError::NotAnObject)?;

    let mut flattener = Flattener {
        protected,
        patch: FieldPatch::new(),
        violations: Vec::new(),
    };

    for root in PROFILE_ROOTS.iter().filter(|r| allowed_roots.contains(&r.name)) {
        let Some(value) = object.get(root.name) else {
            continue;
        };
        match value {
            Value::Null => {}
            Value::Object(map) => flattener.fields(root.target, root.name, root.fields, map),
            _ => flattener
                .violations
                .push(FieldViolation::new(root.name, "expected an object")),
        }
    }

    if !flattener.violations.is_empty() {
        return Err(PatchError::Invalid(flattener.violations));
    }
    if flattener.patch.is_empty() {
        return Err(PatchError::NoValidFields);
    }
    Ok(flattener.patch)
}

/// Write every assignment of `patch` into `doc`.
pub fn apply(doc: &mut Value, patch: &FieldPatch) -> Result<(), PatchError> {
    let mut violations = Vec::new();
    for (path, value) in patch {
        if !field_path::set(doc, path, value.clone()) {
            violations.push(FieldViolation::new(path.as_str(), "parent field is not an object"));
        }
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(PatchError::Invalid(violations))
    }
}

struct Flattener<'a> {
    protected: &'a [&'a str],
    patch: FieldPatch,
    violations: Vec<FieldViolation>,
}

fn join(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{key}"),
        None => key.to_string(),
    }
}

impl Flattener<'_> {
    /// `target` is the document prefix, `label` the payload path used in
    /// violation messages.
    fn fields(
        &mut self,
        target: Option<&str>,
        label: &str,
        specs: &[FieldSpec],
        payload: &Map<String, Value>,
    ) {
        for spec in specs {
            let Some(value) = payload.get(spec.key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let path = join(target, spec.key);
            let label = format!("{label}.{}", spec.key);

            match spec.kind {
                FieldKind::Group(group) => match value.as_object() {
                    Some(map) => self.fields(Some(path.as_str()), &label, group, map),
                    None => self.violations.push(FieldViolation::new(label, "expected an object")),
                },
                kind => {
                    if let Some(v) = self.scalar(kind, value, &label) {
                        self.emit(path, v);
                    }
                }
            }
        }
    }

    fn scalar(&mut self, kind: FieldKind, value: &Value, label: &str) -> Option<Value> {
        match kind {
            FieldKind::Text | FieldKind::RequiredText => {
                let Some(text) = value.as_str() else {
                    self.violations.push(FieldViolation::new(label, "expected a string"));
                    return None;
                };
                let text = text.trim();
                if matches!(kind, FieldKind::RequiredText) && text.is_empty() {
                    self.violations.push(FieldViolation::new(label, "must not be empty"));
                    return None;
                }
                Some(Value::String(text.to_string()))
            }
            FieldKind::Bool => match value {
                Value::Bool(_) => Some(value.clone()),
                _ => {
                    self.violations.push(FieldViolation::new(label, "expected true or false"));
                    None
                }
            },
            FieldKind::OneOf(values) => {
                let allowed = values();
                match value.as_str().map(str::trim) {
                    Some(text) if allowed.contains(&text) => Some(Value::String(text.to_string())),
                    _ => {
                        self.violations.push(FieldViolation::new(
                            label,
                            format!("must be one of {allowed:?}"),
                        ));
                        None
                    }
                }
            }
            FieldKind::Records(item_fields) => self.records(item_fields, value, label),
            FieldKind::Group(_) => None,
        }
    }

    fn records(&mut self, item_fields: &[&str], value: &Value, label: &str) -> Option<Value> {
        let Some(entries) = value.as_array() else {
            self.violations.push(FieldViolation::new(label, "expected an array"));
            return None;
        };

        let mut kept = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if is_blank(entry) {
                continue;
            }
            let Some(object) = entry.as_object() else {
                self.violations
                    .push(FieldViolation::new(format!("{label}[{i}]"), "expected an object"));
                continue;
            };

            let mut item = Map::new();
            for &key in item_fields {
                let text = match object.get(key) {
                    None | Some(Value::Null) => NOT_AVAILABLE,
                    Some(Value::String(s)) if s.trim().is_empty() => NOT_AVAILABLE,
                    Some(Value::String(s)) => s.trim(),
                    Some(_) => {
                        self.violations.push(FieldViolation::new(
                            format!("{label}[{i}].{key}"),
                            "expected a string",
                        ));
                        continue;
                    }
                };
                item.insert(key.to_string(), Value::String(text.to_string()));
            }
            kept.push(Value::Object(item));
        }
        Some(Value::Array(kept))
    }

    fn emit(&mut self, path: String, value: Value) {
        if policy::is_protected(self.protected, &path) {
            tracing::debug!(path = %path, "Dropping protected field from profile update");
            return;
        }
        match policy::rule_for(USER_PROFILE_RULES, &path) {
            Some(rule) if rule.policy.is_mergeable() => {
                self.patch.insert(path, value);
            }
            _ => tracing::debug!(path = %path, "No writable merge rule for profile field"),
        }
    }
}

/// Null, blank text, or an object whose every value is null or blank text.
fn is_blank(entry: &Value) -> bool {
    match entry {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.values().all(|v| match v {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }),
        _ => false,
    }
}
