//! Deep merge of JSON objects
//!
//! Unlike RFC 7396 merge patch, `null` is an ordinary value here: it replaces
//! whatever was stored under the key instead of removing it.
//!
//! - If both sides of a key are objects, merge recursively
//! - Otherwise the incoming value replaces the existing one wholesale
//!   (arrays are never unioned)
//! - Keys absent from the incoming object are left untouched

use serde_json::{Map, Value};

/// Merge `incoming` into `target` key by key
///
/// # Examples
///
/// ```
/// use folio_core::merge::deep_merge;
/// use serde_json::json;
///
/// let mut target = json!({"a": {"x": 1}}).as_object().unwrap().clone();
/// let incoming = json!({"a": {"y": 2}}).as_object().unwrap().clone();
/// deep_merge(&mut target, &incoming);
/// assert_eq!(serde_json::Value::Object(target), json!({"a": {"x": 1, "y": 2}}));
/// ```
pub fn deep_merge(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                deep_merge(existing, nested);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
