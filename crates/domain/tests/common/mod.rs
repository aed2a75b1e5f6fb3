#![allow(dead_code)]

use std::sync::Arc;

use serde_json::Value;
use time::macros::datetime;
use tutorhub_domain::DomainResult;
use tutorhub_domain::batches::{Batch, BatchCreate};
use tutorhub_domain::clock::{Clock, FixedClock};
use tutorhub_domain::error::DomainError;
use tutorhub_domain::ports::BoxFuture;
use tutorhub_domain::ports::store::{DocumentStore, FieldMap, ScanFilter, StoredDocument};
use tutorhub_domain::services::Services;
use tutorhub_domain::store::InMemoryDocumentStore;
use tutorhub_domain::students::{Student, StudentCreate};

pub fn october_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(datetime!(2026-10-19 09:00:00 UTC)))
}

pub fn services() -> (Services, InMemoryDocumentStore) {
    let store = InMemoryDocumentStore::new();
    let services = Services::new(Arc::new(store.clone()), october_clock());
    (services, store)
}

pub async fn batch(services: &Services, name: &str, amount: Option<f64>) -> Batch {
    services
        .batches
        .create(BatchCreate {
            teacher_id: "t-1".to_string(),
            name: name.to_string(),
            subject: None,
            payment_amount: amount,
            payment_frequency: None,
            payment_day_of_month: None,
        })
        .await
        .expect("create batch")
}

pub async fn student(services: &Services, name: &str) -> Student {
    services
        .students
        .create(StudentCreate {
            name: name.to_string(),
            ..StudentCreate::default()
        })
        .await
        .expect("create student")
}

pub async fn enrolled(services: &Services, name: &str, batch_id: &str) -> Student {
    let student = student(services, name).await;
    services
        .membership
        .add_student_to_batch(&student.id, batch_id)
        .await
        .expect("enroll")
}

/// Delegates to an in-memory store but rejects every insert into one
/// collection.
#[derive(Clone)]
pub struct RejectingStore {
    inner: InMemoryDocumentStore,
    rejected: &'static str,
}

impl RejectingStore {
    pub fn new(inner: InMemoryDocumentStore, rejected: &'static str) -> Self {
        Self { inner, rejected }
    }
}

impl DocumentStore for RejectingStore {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    fn get(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<Option<StoredDocument>>> {
        self.inner.get(collection, id)
    }

    fn insert(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        if collection == self.rejected {
            return Box::pin(async { Err(DomainError::Store("insert rejected".into())) });
        }
        self.inner.insert(collection, id, body)
    }

    fn put(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        self.inner.put(collection, id, body)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &FieldMap,
        expected_version: Option<u64>,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        self.inner.update(collection, id, fields, expected_version)
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<bool>> {
        self.inner.delete(collection, id)
    }

    fn scan(
        &self,
        collection: &str,
        filter: &ScanFilter,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>> {
        self.inner.scan(collection, filter)
    }

    fn batch_get(
        &self,
        collection: &str,
        ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>> {
        self.inner.batch_get(collection, ids)
    }
}

/// Delegates to an in-memory store but answers every scan of one
/// collection with nothing, so lookups miss while inserts still collide.
#[derive(Clone)]
pub struct BlindScanStore {
    inner: InMemoryDocumentStore,
    blind: &'static str,
}

impl BlindScanStore {
    pub fn new(inner: InMemoryDocumentStore, blind: &'static str) -> Self {
        Self { inner, blind }
    }
}

impl DocumentStore for BlindScanStore {
    fn name(&self) -> &'static str {
        "blind-scan"
    }

    fn get(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<Option<StoredDocument>>> {
        self.inner.get(collection, id)
    }

    fn insert(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        self.inner.insert(collection, id, body)
    }

    fn put(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        self.inner.put(collection, id, body)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &FieldMap,
        expected_version: Option<u64>,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>> {
        self.inner.update(collection, id, fields, expected_version)
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<bool>> {
        self.inner.delete(collection, id)
    }

    fn scan(
        &self,
        collection: &str,
        filter: &ScanFilter,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>> {
        if collection == self.blind {
            return Box::pin(async { Ok(Vec::new()) });
        }
        self.inner.scan(collection, filter)
    }

    fn batch_get(
        &self,
        collection: &str,
        ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>> {
        self.inner.batch_get(collection, ids)
    }
}
