use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Typed view of one node of an extraction output schema
/// (`OBJECT | ARRAY | STRING | INTEGER | NUMBER | BOOLEAN`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum SchemaNode {
    #[serde(rename = "OBJECT")]
    Object {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        properties: BTreeMap<String, SchemaNode>,
    },
    #[serde(rename = "ARRAY")]
    Array {
        #[serde(default)]
        description: Option<String>,
        items: Box<SchemaNode>,
    },
    #[serde(rename = "STRING")]
    Text {
        #[serde(default)]
        description: Option<String>,
        #[serde(default, rename = "enum")]
        allowed: Option<Vec<String>>,
    },
    #[serde(rename = "INTEGER")]
    Integer {
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "NUMBER")]
    Number {
        #[serde(default)]
        description: Option<String>,
    },
    #[serde(rename = "BOOLEAN")]
    Boolean {
        #[serde(default)]
        description: Option<String>,
    },
}

/// A place where an extractor payload disagrees with its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "(root)" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

impl SchemaNode {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Object { .. } => "OBJECT",
            Self::Array { .. } => "ARRAY",
            Self::Text { .. } => "STRING",
            Self::Integer { .. } => "INTEGER",
            Self::Number { .. } => "NUMBER",
            Self::Boolean { .. } => "BOOLEAN",
        }
    }

    /// Child node at a dotted property path (arrays are stepped through).
    pub fn find(&self, path: &str) -> Option<&SchemaNode> {
        let mut node = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            while let Self::Array { items, .. } = node {
                node = items;
            }
            match node {
                Self::Object { properties, .. } => node = properties.get(segment)?,
                _ => return None,
            }
        }
        Some(node)
    }

    /// Conform an extractor payload to this schema.
    ///
    /// Nulls are pruned so declared defaults apply downstream, an empty
    /// string on an enum field counts as absent, and properties the schema
    /// does not declare are dropped. Type mismatches and values outside an
    /// enum are collected rather than failing fast.
    pub fn normalize(&self, value: &Value) -> Result<Value, Vec<SchemaViolation>> {
        let mut violations = Vec::new();
        let normalized = normalize_at(self, value, "", &mut violations);
        if !violations.is_empty() {
            return Err(violations);
        }
        match normalized {
            Some(v) => Ok(v),
            None => Ok(match self {
                Self::Object { .. } => Value::Object(Map::new()),
                Self::Array { .. } => Value::Array(Vec::new()),
                _ => Value::Null,
            }),
        }
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn mismatch(path: &str, node: &SchemaNode, value: &Value, out: &mut Vec<SchemaViolation>) {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    out.push(SchemaViolation {
        path: path.to_string(),
        message: format!("expected {}, found {found}", node.type_name()),
    });
}

fn normalize_at(
    node: &SchemaNode,
    value: &Value,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) -> Option<Value> {
    if value.is_null() {
        return None;
    }

    match node {
        SchemaNode::Object { properties, .. } => {
            let Some(object) = value.as_object() else {
                mismatch(path, node, value, out);
                return None;
            };
            let mut normalized = Map::new();
            for (key, child) in properties {
                if let Some(raw) = object.get(key) {
                    if let Some(v) = normalize_at(child, raw, &child_path(path, key), out) {
                        normalized.insert(key.clone(), v);
                    }
                }
            }
            Some(Value::Object(normalized))
        }
        SchemaNode::Array { items, .. } => {
            let Some(array) = value.as_array() else {
                mismatch(path, node, value, out);
                return None;
            };
            let normalized = array
                .iter()
                .enumerate()
                .filter_map(|(i, item)| normalize_at(items, item, &format!("{path}[{i}]"), out))
                .collect();
            Some(Value::Array(normalized))
        }
        SchemaNode::Text { allowed, .. } => {
            let Some(text) = value.as_str() else {
                mismatch(path, node, value, out);
                return None;
            };
            if let Some(allowed) = allowed {
                if text.is_empty() {
                    return None;
                }
                if !allowed.iter().any(|a| a == text) {
                    out.push(SchemaViolation {
                        path: path.to_string(),
                        message: format!("'{text}' is not one of {allowed:?}"),
                    });
                    return None;
                }
            }
            Some(value.clone())
        }
        SchemaNode::Integer { .. } => {
            if value.is_i64() || value.is_u64() {
                return Some(value.clone());
            }
            match value.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                    Some(Value::from(f as i64))
                }
                _ => {
                    mismatch(path, node, value, out);
                    None
                }
            }
        }
        SchemaNode::Number { .. } => {
            if value.is_number() {
                Some(value.clone())
            } else {
                mismatch(path, node, value, out);
                None
            }
        }
        SchemaNode::Boolean { .. } => {
            if value.is_boolean() {
                Some(value.clone())
            } else {
                mismatch(path, node, value, out);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_node() -> SchemaNode {
        serde_json::from_value(json!({
            "type": "OBJECT",
            "properties": {
                "name": {"type": "STRING"},
                "gender": {"type": "STRING", "enum": ["male", "female", "NA"]},
                "age": {"type": "INTEGER"},
                "labs": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "value": {"type": "NUMBER"},
                            "flag": {"type": "STRING", "enum": ["High", "Low"]}
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn prunes_nulls_and_unknown_keys() {
        let normalized = sample_node()
            .normalize(&json!({"name": null, "extra": 1, "labs": [null, {"value": 3.5}]}))
            .unwrap();
        assert_eq!(normalized, json!({"labs": [{"value": 3.5}]}));
    }

    #[test]
    fn empty_enum_string_counts_as_absent() {
        let normalized = sample_node().normalize(&json!({"gender": ""})).unwrap();
        assert_eq!(normalized, json!({}));
    }

    #[test]
    fn collects_every_violation() {
        let violations = sample_node()
            .normalize(&json!({
                "name": 42,
                "gender": "Male",
                "labs": [{"value": "high", "flag": "High"}]
            }))
            .unwrap_err();
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["gender", "labs[0].value", "name"]);
    }

    #[test]
    fn whole_float_accepted_as_integer() {
        let normalized = sample_node().normalize(&json!({"age": 42.0})).unwrap();
        assert_eq!(normalized, json!({"age": 42}));
        assert!(sample_node().normalize(&json!({"age": 42.5})).is_err());
    }

    #[test]
    fn root_must_be_object() {
        let violations = sample_node().normalize(&json!([1, 2])).unwrap_err();
        assert_eq!(violations[0].to_string(), "(root): expected OBJECT, found array");
    }

    #[test]
    fn find_steps_through_arrays() {
        let node = sample_node();
        assert!(matches!(node.find("labs.flag"), Some(SchemaNode::Text { .. })));
        assert!(node.find("labs.missing").is_none());
    }
}
