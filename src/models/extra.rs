// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pass-through storage for document fields the web app owns.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

/// Prefix of the metadata keys the Firestore client adds on read.
const FIRESTORE_META_PREFIX: &str = "_firestore_";

/// Top-level document fields not modeled by a struct.
///
/// Used with `#[serde(flatten)]` so a read-modify-write keeps them.
/// Client metadata (`_firestore_id`, `_firestore_created`, ...) is dropped
/// on read and never written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtraFields(Map<String, Value>);

impl<'de> Deserialize<'de> for ExtraFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::deserialize(deserializer)?;
        map.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
        Ok(Self(map))
    }
}

impl Deref for ExtraFields {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ExtraFields {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize)]
    struct Doc {
        #[serde(default)]
        name: Option<String>,
        #[serde(flatten)]
        extra: ExtraFields,
    }

    #[test]
    fn keeps_unknown_fields_and_drops_client_metadata() {
        let doc: Doc = serde_json::from_value(json!({
            "name": "a",
            "billingEmail": "ap@example.com",
            "_firestore_full_id": "projects/p/databases/(default)/documents/orgs/o1",
            "_firestore_updated": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.extra.len(), 1);
        assert_eq!(doc.extra["billingEmail"], "ap@example.com");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back, json!({ "name": "a", "billingEmail": "ap@example.com" }));
    }
}
