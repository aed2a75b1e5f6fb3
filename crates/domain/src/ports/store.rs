use serde_json::{Map, Value};

use crate::DomainResult;
use crate::ports::BoxFuture;

pub type FieldMap = Map<String, Value>;

/// A raw document as held by a store, with the version stamp the store bumps
/// on every write.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: u64,
    pub body: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Eq { field: String, value: Value },
    /// Matches when the array field holds the value, either as a bare element
    /// or as an object element whose `id` equals it.
    Contains { field: String, value: Value },
}

impl Clause {
    pub fn field(&self) -> &str {
        match self {
            Clause::Eq { field, .. } | Clause::Contains { field, .. } => field,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Clause::Eq { value, .. } | Clause::Contains { value, .. } => value,
        }
    }

    fn matches(&self, body: &Value) -> bool {
        match self {
            Clause::Eq { field, value } => body.get(field) == Some(value),
            Clause::Contains { field, value } => body
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| {
                    items.iter().any(|item| {
                        item == value || item.get("id").is_some_and(|id| id == value)
                    })
                }),
        }
    }
}

/// Conjunction of clauses. An empty filter matches every document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanFilter {
    pub clauses: Vec<Clause>,
}

impl ScanFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Contains {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(body))
    }
}

/// Collection-keyed document store. Scans carry no ordering guarantee and
/// `update` replaces top-level fields wholesale (arrays included).
#[allow(clippy::needless_pass_by_value)]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn get(&self, collection: &str, id: &str)
    -> BoxFuture<'_, DomainResult<Option<StoredDocument>>>;

    /// Fails with `Conflict` when the id is already taken.
    fn insert(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>>;

    fn put(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>>;

    /// With `expected_version` set the write only lands when the stored
    /// version still matches, otherwise `StaleWrite`.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &FieldMap,
        expected_version: Option<u64>,
    ) -> BoxFuture<'_, DomainResult<StoredDocument>>;

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<bool>>;

    fn scan(
        &self,
        collection: &str,
        filter: &ScanFilter,
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>>;

    fn batch_get(
        &self,
        collection: &str,
        ids: &[String],
    ) -> BoxFuture<'_, DomainResult<Vec<StoredDocument>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contains_matches_bare_and_enriched_entries() {
        let filter = ScanFilter::all().contains("batches", "b-1");
        assert!(filter.matches(&json!({ "batches": ["b-0", "b-1"] })));
        assert!(filter.matches(&json!({ "batches": [{ "id": "b-1", "name": "Physics" }] })));
        assert!(!filter.matches(&json!({ "batches": ["b-2"] })));
        assert!(!filter.matches(&json!({ "name": "no batches" })));
    }

    #[test]
    fn clauses_are_a_conjunction() {
        let filter = ScanFilter::all()
            .eq("batch_id", "b-1")
            .eq("month", "2026-10");
        assert!(filter.matches(&json!({ "batch_id": "b-1", "month": "2026-10" })));
        assert!(!filter.matches(&json!({ "batch_id": "b-1", "month": "2026-09" })));
        assert!(ScanFilter::all().matches(&json!({})));
    }
}
