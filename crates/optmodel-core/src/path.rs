//! Option identifier parsing and sub-path traversal
//!
//! Option identifiers use `/` to address values nested inside an option:
//!
//! - `color` - the whole value of the `color` option
//! - `layout/cols` - the `cols` member of the `layout` option's value
//! - `menu/items/0/label` - sequences are indexed by decimal position
//!
//! # Examples
//!
//! ```
//! use optmodel_core::path::{split, get_at, set_at};
//! use serde_json::json;
//!
//! let path = split("layout/grid/cols").unwrap();
//! assert_eq!(path.key, "layout");
//! assert_eq!(path.sub_path.as_deref(), Some("grid/cols"));
//!
//! let mut value = json!({"grid": {"cols": 2}});
//! assert_eq!(get_at(&value, "grid/cols"), Some(&json!(2)));
//!
//! set_at(&mut value, "grid/rows", json!(4));
//! assert_eq!(value, json!({"grid": {"cols": 2, "rows": 4}}));
//! ```

use serde_json::{Map, Value};

/// Separator between the option key and its sub-path segments.
pub const SEPARATOR: char = '/';

/// A parsed option identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPath {
    /// The top-level option key (first segment)
    pub key: String,
    /// Remaining segments joined with [`SEPARATOR`], if any
    pub sub_path: Option<String>,
}

/// Split an option identifier into its key and optional sub-path.
///
/// Returns `None` for an empty identifier, which addresses the whole
/// value map.
///
/// ```
/// use optmodel_core::path::split;
///
/// assert!(split("").is_none());
///
/// let path = split("color").unwrap();
/// assert_eq!(path.key, "color");
/// assert_eq!(path.sub_path, None);
/// ```
pub fn split(option_id: &str) -> Option<OptionPath> {
    if option_id.is_empty() {
        return None;
    }

    let (key, sub_path) = match option_id.split_once(SEPARATOR) {
        Some((key, rest)) => (key, Some(rest.to_string())),
        None => (option_id, None),
    };

    Some(OptionPath {
        key: key.to_string(),
        sub_path,
    })
}

/// Look up the value at `sub_path` inside `value`.
///
/// Objects are traversed by key and sequences by decimal index. A `null`
/// at the end of the path is reported as absent.
pub fn get_at<'v>(value: &'v Value, sub_path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in sub_path.split(SEPARATOR) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    if current.is_null() { None } else { Some(current) }
}

/// Write `new_value` at `sub_path` inside `value`.
///
/// Missing intermediate members are created as objects. Scalars standing in
/// the way are replaced by objects. Sequences are only descended into for an
/// in-range index; any other segment turns the sequence into an object.
pub fn set_at(value: &mut Value, sub_path: &str, new_value: Value) {
    let segments: Vec<&str> = sub_path.split(SEPARATOR).collect();
    set_segments(value, &segments, new_value);
}

fn set_segments(value: &mut Value, segments: &[&str], new_value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *value = new_value;
        return;
    };

    if let Value::Array(items) = value {
        if let Some(item) = first.parse::<usize>().ok().and_then(|idx| items.get_mut(idx)) {
            set_segments(item, rest, new_value);
            return;
        }
    }

    if !value.is_object() {
        *value = Value::Object(Map::new());
    }

    if let Value::Object(map) = value {
        let child = map.entry((*first).to_string()).or_insert(Value::Null);
        set_segments(child, rest, new_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_empty() {
        assert_eq!(split(""), None);
    }

    #[test]
    fn test_split_key_only() {
        let path = split("color").unwrap();
        assert_eq!(path.key, "color");
        assert_eq!(path.sub_path, None);
    }

    #[test]
    fn test_split_nested() {
        let path = split("a/b/c").unwrap();
        assert_eq!(path.key, "a");
        assert_eq!(path.sub_path.as_deref(), Some("b/c"));
    }

    #[test]
    fn test_get_at_array_index() {
        let value = json!({"items": [{"label": "first"}, {"label": "second"}]});
        assert_eq!(get_at(&value, "items/1/label"), Some(&json!("second")));
        assert_eq!(get_at(&value, "items/7/label"), None);
    }

    #[test]
    fn test_get_at_null_is_absent() {
        let value = json!({"cols": null});
        assert_eq!(get_at(&value, "cols"), None);
    }

    #[test]
    fn test_set_at_creates_intermediates() {
        let mut value = Value::Null;
        set_at(&mut value, "grid/cols", json!(3));
        assert_eq!(value, json!({"grid": {"cols": 3}}));
    }

    #[test]
    fn test_set_at_replaces_scalar_intermediate() {
        let mut value = json!({"grid": "none"});
        set_at(&mut value, "grid/cols", json!(3));
        assert_eq!(value, json!({"grid": {"cols": 3}}));
    }

    #[test]
    fn test_set_at_array_in_range() {
        let mut value = json!({"items": ["a", "b"]});
        set_at(&mut value, "items/1", json!("z"));
        assert_eq!(value, json!({"items": ["a", "z"]}));
    }
}
