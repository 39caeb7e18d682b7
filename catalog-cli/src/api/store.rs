//! Document store abstraction used by the CSV loader

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A document that was created remotely
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDocument {
    /// Store-assigned document id
    pub id: String,
    /// Full resource name, e.g. `projects/p/databases/(default)/documents/packages/<id>`
    pub name: String,
}

/// Somewhere rows can be written as new documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a new document with a store-generated id.
    ///
    /// Every call creates a new document; identical fields are never merged.
    async fn create_document(
        &self,
        collection: &str,
        fields: &[(String, String)],
    ) -> Result<CreatedDocument>;
}

/// Firestore `Document` body with every field stored as a string
pub fn document_body(fields: &[(String, String)]) -> Value {
    let mut encoded = Map::new();
    for (name, value) in fields {
        encoded.insert(name.clone(), json!({ "stringValue": value }));
    }
    json!({ "fields": encoded })
}

/// Store that prints document bodies instead of sending them
#[derive(Debug, Default)]
pub struct DryRunStore {
    counter: AtomicUsize,
}

impl DryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for DryRunStore {
    async fn create_document(
        &self,
        collection: &str,
        fields: &[(String, String)],
    ) -> Result<CreatedDocument> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let body = serde_json::to_string(&document_body(fields))?;
        println!("{} <- {}", collection, body);

        let id = format!("dry-run-{}", n);
        Ok(CreatedDocument {
            name: format!("{}/{}", collection, id),
            id,
        })
    }
}
