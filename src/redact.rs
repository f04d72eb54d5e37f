//! Sensitive-field redaction over parsed JSON bodies
//!
//! A [`RedactionTable`] maps a field name to a masking function. [`redact`]
//! walks a parsed object depth-first and replaces every *string* value whose
//! key is listed in the table. Values of any other type under a listed key are
//! left alone, but nested objects are always descended into.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Masking function: receives the original bytes, returns the logged text
pub type Masker = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// Field name -> masking function. The default table is empty (no redaction).
#[derive(Clone, Default)]
pub struct RedactionTable {
    maskers: HashMap<String, Masker>,
}

impl RedactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a masking function for `field`
    pub fn with<F>(mut self, field: impl Into<String>, mask: F) -> Self
    where
        F: Fn(&[u8]) -> String + Send + Sync + 'static,
    {
        self.insert(field, mask);
        self
    }

    /// Register a constant replacement for `field`
    pub fn with_fixed(self, field: impl Into<String>, replacement: impl Into<String>) -> Self {
        let replacement = replacement.into();
        self.with(field, move |_| replacement.clone())
    }

    pub fn insert<F>(&mut self, field: impl Into<String>, mask: F)
    where
        F: Fn(&[u8]) -> String + Send + Sync + 'static,
    {
        self.maskers.insert(field.into(), Arc::new(mask));
    }

    pub fn get(&self, field: &str) -> Option<&Masker> {
        self.maskers.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.maskers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.maskers.len()
    }
}

impl fmt::Debug for RedactionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.maskers.keys().map(String::as_str).collect();
        fields.sort_unstable();
        f.debug_struct("RedactionTable").field("fields", &fields).finish()
    }
}

/// Shape of a JSON value as far as redaction cares
enum Node<'a> {
    Text(&'a mut String),
    Object(&'a mut Map<String, Value>),
    List(&'a mut Vec<Value>),
    Other,
}

impl<'a> Node<'a> {
    fn of(value: &'a mut Value) -> Self {
        match value {
            Value::String(text) => Node::Text(text),
            Value::Object(map) => Node::Object(map),
            Value::Array(items) => Node::List(items),
            Value::Null | Value::Bool(_) | Value::Number(_) => Node::Other,
        }
    }
}

/// Mask every listed string leaf in `map`, at any depth
pub fn redact(map: &mut Map<String, Value>, table: &RedactionTable) {
    if table.is_empty() {
        return;
    }

    for (key, value) in map.iter_mut() {
        match Node::of(value) {
            Node::Text(text) => {
                if let Some(mask) = table.get(key) {
                    *text = mask(text.as_bytes());
                }
            }
            Node::Object(inner) => redact(inner, table),
            Node::List(items) => redact_list(items, table),
            Node::Other => {}
        }
    }
}

// Array elements have no key of their own, so only containers matter here.
fn redact_list(items: &mut [Value], table: &RedactionTable) {
    for item in items.iter_mut() {
        match Node::of(item) {
            Node::Object(inner) => redact(inner, table),
            Node::List(inner) => redact_list(inner, table),
            Node::Text(_) | Node::Other => {}
        }
    }
}
