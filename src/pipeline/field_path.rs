//! Dotted field paths (`accountSettings.notifications.email`) over JSON documents.

use serde_json::{Map, Value};

/// Value at a dotted path, if every segment resolves to an object key.
pub fn get<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, segment| node.get(segment))
}

/// Assign `value` at a dotted path, creating intermediate objects.
///
/// Returns false (and leaves `doc` untouched) when an intermediate segment
/// exists but is not an object.
pub fn set(doc: &mut Value, path: &str, value: Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return false;
    };

    let mut node = doc;
    for segment in segments {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        let Some(map) = node.as_object_mut() else {
            return false;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node.as_object_mut() {
        Some(map) => {
            map.insert(last.to_string(), value);
            true
        }
        None => false,
    }
}

/// Remove and return the value at a dotted path.
pub fn remove(doc: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (get_mut(doc, parent)?, last),
        None => (doc, path),
    };
    parent.as_object_mut()?.remove(last)
}

fn get_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(doc, |node, segment| node.get_mut(segment))
}

/// Whether `path` equals `prefix` or lies underneath it.
pub fn is_within(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'.')
}
