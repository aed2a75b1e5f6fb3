use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::BoxFuture;
use crate::ports::store::{DocumentStore, FieldMap, ScanFilter, StoredDocument};

type Collections = HashMap<String, HashMap<String, StoredDocument>>;

/// Process-local store used by the `memory` backend and by tests.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(HashMap::len)
            .unwrap_or_default()
    }
}

fn require_object(collection: &str, body: &Value) -> DomainResult<()> {
    if body.is_object() {
        Ok(())
    } else {
        Err(DomainError::Store(format!(
            "{collection} documents must be JSON objects"
        )))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<StoredDocument>>> {
        let collection = collection.to_string();
        let id = id.to_string();
        Box::pin(async move {
            let collections = self.collections.read().await;
            Ok(collections
                .get(&collection)
                .and_then(|docs| docs.get(&id))
                .cloned())
        })
    }

    fn insert(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        let collection = collection.to_string();
        let id = id.to_string();
        let body = body.clone();
        Box::pin(async move {
            require_object(&collection, &body)?;
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection.clone()).or_default();
            if docs.contains_key(&id) {
                return Err(DomainError::Conflict(format!(
                    "{collection} '{id}' already exists"
                )));
            }
            let doc = StoredDocument {
                id: id.clone(),
                version: 1,
                body,
            };
            docs.insert(id, doc.clone());
            Ok(doc)
        })
    }

    fn put(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        let collection = collection.to_string();
        let id = id.to_string();
        let body = body.clone();
        Box::pin(async move {
            require_object(&collection, &body)?;
            let mut collections = self.collections.write().await;
            let docs = collections.entry(collection).or_default();
            let version = docs.get(&id).map(|doc| doc.version).unwrap_or_default() + 1;
            let doc = StoredDocument {
                id: id.clone(),
                version,
                body,
            };
            docs.insert(id, doc.clone());
            Ok(doc)
        })
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &FieldMap,
        expected_version: Option<u64>,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        let collection = collection.to_string();
        let id = id.to_string();
        let fields = fields.clone();
        Box::pin(async move {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(&id))
                .ok_or(DomainError::NotFound("document"))?;
            if expected_version.is_some_and(|expected| expected != doc.version) {
                return Err(DomainError::StaleWrite);
            }
            let Some(body) = doc.body.as_object_mut() else {
                return Err(DomainError::Store(format!(
                    "{collection} '{id}' is not an object"
                )));
            };
            for (field, value) in fields {
                body.insert(field, value);
            }
            doc.version += 1;
            Ok(doc.clone())
        })
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let collection = collection.to_string();
        let id = id.to_string();
        Box::pin(async move {
            let mut collections = self.collections.write().await;
            Ok(collections
                .get_mut(&collection)
                .and_then(|docs| docs.remove(&id))
                .is_some())
        })
    }

    fn scan(
        &self,
        collection: &str,
        filter: &ScanFilter,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>> {
        let collection = collection.to_string();
        let filter = filter.clone();
        Box::pin(async move {
            let collections = self.collections.read().await;
            Ok(collections
                .get(&collection)
                .map(|docs| {
                    docs.values()
                        .filter(|doc| filter.matches(&doc.body))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    fn batch_get(
        &self,
        collection: &str,
        ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>> {
        let collection = collection.to_string();
        let ids = ids.to_vec();
        Box::pin(async move {
            let collections = self.collections.read().await;
            let Some(docs) = collections.get(&collection) else {
                return Ok(Vec::new());
            };
            Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_rejects_taken_ids() {
        let store = InMemoryDocumentStore::new();
        store
            .insert("students", "s-1", &json!({ "id": "s-1" }))
            .await
            .expect("first insert");
        let err = store
            .insert("students", "s-1", &json!({ "id": "s-1" }))
            .await
            .expect_err("second insert");
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_checks_version() {
        let store = InMemoryDocumentStore::new();
        store
            .insert(
                "messages",
                "m-1",
                &json!({ "id": "m-1", "replies": ["a"], "subject": "hi" }),
            )
            .await
            .expect("insert");

        let mut fields = FieldMap::new();
        fields.insert("replies".to_string(), json!(["a", "b"]));
        let updated = store
            .update("messages", "m-1", &fields, Some(1))
            .await
            .expect("update");
        assert_eq!(updated.version, 2);
        assert_eq!(updated.body["replies"], json!(["a", "b"]));
        assert_eq!(updated.body["subject"], json!("hi"));

        let err = store
            .update("messages", "m-1", &fields, Some(1))
            .await
            .expect_err("stale update");
        assert!(matches!(err, DomainError::StaleWrite));

        let err = store
            .update("messages", "missing", &fields, None)
            .await
            .expect_err("missing update");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn batch_get_skips_missing_ids() {
        let store = InMemoryDocumentStore::new();
        store
            .put("batches", "b-1", &json!({ "id": "b-1" }))
            .await
            .expect("put");
        let docs = store
            .batch_get("batches", &["b-1".to_string(), "b-2".to_string()])
            .await
            .expect("batch get");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "b-1");
    }
}
