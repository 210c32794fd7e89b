// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store with Firestore-like semantics.
//!
//! Documents are kept as JSON and round-tripped through serde exactly like
//! the Firestore backend, so the same models work on both.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

const ID_FIELD: &str = "_firestore_id";

#[derive(Default)]
pub(crate) struct MemoryStore {
    collections: DashMap<String, DashMap<String, Value>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .get(collection)
            .and_then(|docs| docs.get(id).map(|doc| with_id(doc.value(), id)))
    }

    pub fn set(&self, collection: &str, id: &str, doc: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
    }

    /// Insert only if no document exists. Returns `false` on conflict.
    pub fn insert_if_absent(&self, collection: &str, id: &str, doc: Value) -> bool {
        let docs = self.collections.entry(collection.to_string()).or_default();
        let inserted = match docs.entry(id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(doc);
                true
            }
        };
        inserted
    }

    /// Insert with a generated document ID, returning the ID.
    pub fn insert_generated(&self, collection: &str, doc: Value) -> String {
        let id = format!("mem{:016}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.set(collection, &id, doc);
        id
    }

    pub fn delete(&self, collection: &str, id: &str) {
        if let Some(docs) = self.collections.get(collection) {
            docs.remove(id);
        }
    }

    /// All documents whose top-level `field` equals `value`.
    pub fn find(&self, collection: &str, field: &str, value: &str) -> Vec<Value> {
        self.all(collection)
            .into_iter()
            .filter(|doc| doc.get(field).and_then(Value::as_str) == Some(value))
            .collect()
    }

    pub fn all(&self, collection: &str) -> Vec<Value> {
        let Some(docs) = self.collections.get(collection) else {
            return Vec::new();
        };
        let mut out: Vec<Value> = docs
            .iter()
            .map(|entry| with_id(entry.value(), entry.key()))
            .collect();
        // Stable order, like a Firestore scan by document ID.
        out.sort_by(|a, b| a[ID_FIELD].as_str().cmp(&b[ID_FIELD].as_str()));
        out
    }
}

fn with_id(doc: &Value, id: &str) -> Value {
    let mut doc = doc.clone();
    if let Value::Object(map) = &mut doc {
        map.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    }
    doc
}
