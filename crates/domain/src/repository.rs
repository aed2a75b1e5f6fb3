use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::DomainResult;
use crate::assignments::Assignment;
use crate::batches::Batch;
use crate::class_tests::{ClassTest, TestResult};
use crate::error::DomainError;
use crate::fees::FeeRecord;
use crate::messages::Message;
use crate::notes::Note;
use crate::notifications::Notification;
use crate::ports::store::{DocumentStore, FieldMap, ScanFilter, StoredDocument};
use crate::students::Student;
use crate::teachers::Teacher;

const MAX_WRITE_ATTEMPTS: usize = 3;

pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    /// Singular name used in `NotFound` errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Typed CRUD over one collection of a [`DocumentStore`].
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn decode(doc: StoredDocument) -> DomainResult<Versioned<T>> {
        let version = doc.version;
        serde_json::from_value::<T>(doc.body)
            .map(|value| Versioned { value, version })
            .map_err(|err| {
                DomainError::Store(format!(
                    "invalid {} document '{}': {err}",
                    T::KIND,
                    doc.id
                ))
            })
    }

    fn decode_all(docs: Vec<StoredDocument>) -> DomainResult<Vec<T>> {
        docs.into_iter()
            .map(|doc| Self::decode(doc).map(|versioned| versioned.value))
            .collect()
    }

    fn encode(value: &T) -> DomainResult<Value> {
        serde_json::to_value(value)
            .map_err(|err| DomainError::Store(format!("invalid {} payload: {err}", T::KIND)))
    }

    fn retag_not_found(err: DomainError) -> DomainError {
        match err {
            DomainError::NotFound(_) => DomainError::NotFound(T::KIND),
            other => other,
        }
    }

    pub async fn get(&self, id: &str) -> DomainResult<Option<T>> {
        Ok(self.get_versioned(id).await?.map(|versioned| versioned.value))
    }

    pub async fn get_versioned(&self, id: &str) -> DomainResult<Option<Versioned<T>>> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(Self::decode)
            .transpose()
    }

    pub async fn require(&self, id: &str) -> DomainResult<T> {
        self.get(id).await?.ok_or(DomainError::NotFound(T::KIND))
    }

    pub async fn create(&self, value: &T) -> DomainResult<T> {
        let body = Self::encode(value)?;
        let doc = self.store.insert(T::COLLECTION, value.id(), &body).await?;
        Ok(Self::decode(doc)?.value)
    }

    pub async fn put(&self, value: &T) -> DomainResult<T> {
        let body = Self::encode(value)?;
        let doc = self.store.put(T::COLLECTION, value.id(), &body).await?;
        Ok(Self::decode(doc)?.value)
    }

    pub async fn update_fields(
        &self,
        id: &str,
        fields: FieldMap,
        expected_version: Option<u64>,
    ) -> DomainResult<Versioned<T>> {
        let doc = self
            .store
            .update(T::COLLECTION, id, &fields, expected_version)
            .await
            .map_err(Self::retag_not_found)?;
        Self::decode(doc)
    }

    /// Read-modify-write guarded by the stored version. `change` sees the
    /// latest value on every attempt and may abort with any error.
    pub async fn modify<F>(&self, id: &str, mut change: F) -> DomainResult<Versioned<T>>
    where
        F: FnMut(&T) -> DomainResult<FieldMap> + Send,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self
                .get_versioned(id)
                .await?
                .ok_or(DomainError::NotFound(T::KIND))?;
            let fields = change(&current.value)?;
            match self.update_fields(id, fields, Some(current.version)).await {
                Err(DomainError::StaleWrite) => {
                    tracing::debug!(
                        collection = T::COLLECTION,
                        id,
                        attempt,
                        "stale write; retrying"
                    );
                }
                other => return other,
            }
        }
        tracing::warn!(
            collection = T::COLLECTION,
            id,
            "gave up after repeated stale writes"
        );
        Err(DomainError::StaleWrite)
    }

    pub async fn delete(&self, id: &str) -> DomainResult<bool> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn scan(&self, filter: &ScanFilter) -> DomainResult<Vec<T>> {
        let docs = self.store.scan(T::COLLECTION, filter).await?;
        Self::decode_all(docs)
    }

    pub async fn list_all(&self) -> DomainResult<Vec<T>> {
        self.scan(&ScanFilter::all()).await
    }

    pub async fn batch_get(&self, ids: &[String]) -> DomainResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self.store.batch_get(T::COLLECTION, ids).await?;
        Self::decode_all(docs)
    }
}

/// Serializes a patch struct into top-level field replacements. `None`
/// fields must be skipped by the patch's serde attributes.
pub fn patch_fields<P: Serialize>(patch: &P) -> DomainResult<FieldMap> {
    match serde_json::to_value(patch) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(DomainError::Validation("patch must be an object".into())),
        Err(err) => Err(DomainError::Validation(format!("invalid patch: {err}"))),
    }
}

#[derive(Clone)]
pub struct Repositories {
    pub teachers: Repository<Teacher>,
    pub students: Repository<Student>,
    pub batches: Repository<Batch>,
    pub assignments: Repository<Assignment>,
    pub tests: Repository<ClassTest>,
    pub test_results: Repository<TestResult>,
    pub fees: Repository<FeeRecord>,
    pub notes: Repository<Note>,
    pub messages: Repository<Message>,
    pub notifications: Repository<Notification>,
}

impl Repositories {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            teachers: Repository::new(store.clone()),
            students: Repository::new(store.clone()),
            batches: Repository::new(store.clone()),
            assignments: Repository::new(store.clone()),
            tests: Repository::new(store.clone()),
            test_results: Repository::new(store.clone()),
            fees: Repository::new(store.clone()),
            notes: Repository::new(store.clone()),
            messages: Repository::new(store.clone()),
            notifications: Repository::new(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    struct Counter {
        id: String,
        hits: u32,
    }

    impl Document for Counter {
        const COLLECTION: &'static str = "counters";
        const KIND: &'static str = "counter";

        fn id(&self) -> &str {
            &self.id
        }
    }

    fn repo() -> Repository<Counter> {
        Repository::new(Arc::new(InMemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn modify_applies_change_against_latest_version() {
        let repo = repo();
        repo.create(&Counter {
            id: "c-1".into(),
            hits: 1,
        })
        .await
        .expect("create");

        let updated = repo
            .modify("c-1", |counter| {
                let mut fields = FieldMap::new();
                fields.insert("hits".into(), json!(counter.hits + 1));
                Ok(fields)
            })
            .await
            .expect("modify");
        assert_eq!(updated.value.hits, 2);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn modify_reports_missing_documents_by_kind() {
        let err = repo()
            .modify("nope", |_| Ok(FieldMap::new()))
            .await
            .expect_err("missing");
        assert!(matches!(err, DomainError::NotFound("counter")));
    }

    #[tokio::test]
    async fn update_fields_retags_not_found() {
        let err = repo()
            .update_fields("nope", FieldMap::new(), None)
            .await
            .expect_err("missing");
        assert!(matches!(err, DomainError::NotFound("counter")));
    }

    #[test]
    fn patch_fields_keeps_only_set_fields() {
        #[derive(Serialize)]
        struct Patch {
            #[serde(skip_serializing_if = "Option::is_none")]
            name: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            phone: Option<String>,
        }
        let fields = patch_fields(&Patch {
            name: Some("Asha".into()),
            phone: None,
        })
        .expect("fields");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], json!("Asha"));
    }
}
