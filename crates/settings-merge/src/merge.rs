//! Recursive union of two settings documents.
//!
//! The engine folds newly produced content (`incoming`) into an existing
//! document (`original`) without dropping anything the incoming side does not
//! explicitly overwrite:
//!
//! - **Objects** merge key by key. The original's keys keep their order; keys
//!   only the incoming side has are appended after them, in incoming order.
//! - **Arrays** concatenate: original elements, then incoming elements.
//! - **Scalars and shape changes**: a non-null incoming value replaces the
//!   original one.
//! - **Null**: an incoming `null` never overwrites an existing binding. A key
//!   that is new *and* null is still appended.
//!
//! Nested objects are walked with an explicit stack of frames instead of
//! call-stack recursion. Subtrees taken over whole (kept, replaced, appended,
//! or concatenated) are copied with `Value::clone`, which is iterative too, so
//! arbitrarily deep documents cannot overflow the stack.
//!
//! # Example
//! ```
//! use serde_json::json;
//! use settings_merge::{merge, Value};
//!
//! let original = Value::from(json!({"a": 1, "b": {"x": 1}}));
//! let incoming = Value::from(json!({"b": {"y": 2}, "c": 3}));
//! let merged = merge(&original, &incoming).unwrap();
//! assert_eq!(
//!     serde_json::Value::from(merged),
//!     json!({"a": 1, "b": {"x": 1, "y": 2}, "c": 3})
//! );
//! ```

use std::collections::{HashMap, HashSet};
use std::slice;

use tracing::{debug, warn};

use crate::error::{Result, SettingsError};
use crate::value::{Object, Value};

/// Merge `incoming` into `original`, returning a new document.
///
/// When the two roots are different kinds of container (object vs array) the
/// original is returned unchanged and `incoming` is discarded.
///
/// # Errors
///
/// Returns [`SettingsError::RootType`] if `original` is not an object or array.
pub fn merge(original: &Value, incoming: &Value) -> Result<Value> {
    Ok(try_merge(original, incoming)?.unwrap_or_else(|| original.clone()))
}

/// Like [`merge`], but reports the root-kind fallback as `Ok(None)` instead of
/// cloning the original, so callers holding the original text can reuse it.
///
/// # Errors
///
/// Returns [`SettingsError::RootType`] if `original` is not an object or array.
pub fn try_merge(original: &Value, incoming: &Value) -> Result<Option<Value>> {
    if !original.is_container() {
        return Err(SettingsError::RootType(original.kind()));
    }

    match (original, incoming) {
        (Value::Object(o1), Value::Object(o2)) => {
            debug!(
                original_keys = o1.len(),
                incoming_keys = o2.len(),
                "merging object documents"
            );
            Ok(Some(Value::Object(merge_object(o1, o2))))
        }
        (Value::Array(a1), Value::Array(a2)) => {
            debug!(
                original_len = a1.len(),
                incoming_len = a2.len(),
                "merging array documents"
            );
            Ok(Some(Value::Array(merge_array(a1, a2))))
        }
        _ => {
            warn!(
                original = %original.kind(),
                incoming = %incoming.kind(),
                "root kinds differ, keeping original document unchanged"
            );
            Ok(None)
        }
    }
}

/// Merge two objects key by key. See the module docs for the rules.
pub fn merge_object(original: &Object, incoming: &Object) -> Object {
    let mut stack: Vec<Frame<'_>> = Vec::new();
    let mut current = Frame::new(original, incoming);

    loop {
        match current.advance() {
            Step::Descend(o1, o2) => {
                let parent = std::mem::replace(&mut current, Frame::new(o1, o2));
                stack.push(parent);
            }
            Step::Finished => match stack.pop() {
                Some(parent) => {
                    let child = std::mem::replace(&mut current, parent);
                    current.attach(child.finish());
                }
                None => return current.finish(),
            },
        }
    }
}

/// Concatenate two arrays: every original element, then every incoming one.
///
/// No de-duplication happens, so merging the same incoming array twice
/// repeats its elements.
pub fn merge_array(original: &[Value], incoming: &[Value]) -> Vec<Value> {
    let mut out = Vec::with_capacity(original.len() + incoming.len());
    out.extend_from_slice(original);
    out.extend_from_slice(incoming);
    out
}

/// What a frame needs next from the driver loop.
enum Step<'a> {
    /// Both sides bind the pending key to objects; merge them before continuing.
    Descend(&'a Object, &'a Object),
    Finished,
}

/// One object merge in progress.
struct Frame<'a> {
    remaining: slice::Iter<'a, (String, Value)>,
    original_keys: HashSet<&'a str>,
    incoming: &'a Object,
    incoming_index: HashMap<&'a str, &'a Value>,
    /// Key whose merged child object is being built by the frame above this one.
    pending: Option<&'a str>,
    out: Object,
}

impl<'a> Frame<'a> {
    fn new(original: &'a Object, incoming: &'a Object) -> Self {
        Self {
            remaining: original.iter(),
            original_keys: original.keys().collect(),
            incoming,
            incoming_index: incoming.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            pending: None,
            out: Object::with_capacity(original.len() + incoming.len()),
        }
    }

    /// Emit original keys until one needs a nested object merge or the
    /// original is exhausted.
    fn advance(&mut self) -> Step<'a> {
        for (key, v1) in self.remaining.by_ref() {
            let v2 = match self.incoming_index.get(key.as_str()) {
                Some(v2) if !v2.is_null() => *v2,
                _ => {
                    self.out.push_unique(key.clone(), v1.clone());
                    continue;
                }
            };

            match (v1, v2) {
                (Value::Object(o1), Value::Object(o2)) => {
                    self.pending = Some(key.as_str());
                    return Step::Descend(o1, o2);
                }
                (Value::Array(a1), Value::Array(a2)) => {
                    self.out.push_unique(key.clone(), Value::Array(merge_array(a1, a2)));
                }
                _ => self.out.push_unique(key.clone(), v2.clone()),
            }
        }
        Step::Finished
    }

    /// Receive the merged object for the pending key.
    fn attach(&mut self, child: Object) {
        if let Some(key) = self.pending.take() {
            self.out.push_unique(key.to_owned(), Value::Object(child));
        }
    }

    /// Append the incoming side's novel keys and hand back the result.
    fn finish(mut self) -> Object {
        for (key, value) in self.incoming {
            if !self.original_keys.contains(key.as_str()) {
                self.out.push_unique(key.clone(), value.clone());
            }
        }
        self.out
    }
}
