use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use tokio::sync::RwLock;
use tutorhub_domain::DomainResult;
use tutorhub_domain::error::DomainError;
use tutorhub_domain::ports::BoxFuture;
use tutorhub_domain::ports::store::{Clause, DocumentStore, FieldMap, ScanFilter, StoredDocument};

const ROW_FIELDS: &str = "doc_id, version, body";

/// Each collection is a table of `{doc_id, version, body}` rows with a
/// unique index on `doc_id`.
#[derive(Clone)]
pub struct SurrealDocumentStore {
    client: Arc<Surreal<Client>>,
    prepared: Arc<RwLock<HashSet<String>>>,
}

#[derive(Debug, Deserialize)]
struct StoredRow {
    doc_id: String,
    version: i64,
    body: Value,
}

impl SurrealDocumentStore {
    pub fn new(client: Arc<Surreal<Client>>) -> Self {
        Self {
            client,
            prepared: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    fn map_surreal_error(err: surrealdb::Error) -> DomainError {
        let message = err.to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("already exists")
            || lowered.contains("already contains")
            || lowered.contains("duplicate")
            || lowered.contains("unique")
        {
            return DomainError::Conflict(message);
        }
        DomainError::Store(format!("surreal query failed: {message}"))
    }

    fn decode_rows(rows: Vec<Value>) -> DomainResult<Vec<StoredDocument>> {
        rows.into_iter()
            .map(|row| {
                let row = serde_json::from_value::<StoredRow>(row)
                    .map_err(|err| DomainError::Store(format!("invalid document row: {err}")))?;
                Ok(StoredDocument {
                    id: row.doc_id,
                    version: u64::try_from(row.version).unwrap_or_default(),
                    body: row.body,
                })
            })
            .collect()
    }

    async fn ensure_table(&self, collection: &str) -> DomainResult<()> {
        validate_identifier(collection)?;
        if self.prepared.read().await.contains(collection) {
            return Ok(());
        }
        let mut prepared = self.prepared.write().await;
        if prepared.contains(collection) {
            return Ok(());
        }
        self.client
            .query(format!(
                "DEFINE TABLE IF NOT EXISTS {collection} SCHEMALESS; \
                 DEFINE INDEX IF NOT EXISTS {collection}_doc_id ON TABLE {collection} \
                 FIELDS doc_id UNIQUE;"
            ))
            .await
            .map_err(Self::map_surreal_error)?
            .check()
            .map_err(Self::map_surreal_error)?;
        prepared.insert(collection.to_string());
        tracing::debug!(collection, "surreal table prepared");
        Ok(())
    }

    async fn run(&self, query: String, binds: Vec<(String, Value)>) -> DomainResult<Vec<StoredDocument>> {
        let mut pending = self.client.query(query);
        for bind in binds {
            pending = pending.bind(bind);
        }
        let mut response = pending.await.map_err(Self::map_surreal_error)?;
        let rows: Vec<Value> = response
            .take(0)
            .map_err(Self::map_surreal_error)?;
        Self::decode_rows(rows)
    }

    async fn fetch(&self, collection: &str, id: &str) -> DomainResult<Option<StoredDocument>> {
        self.ensure_table(collection).await?;
        let rows = self
            .run(
                format!("SELECT {ROW_FIELDS} FROM {collection} WHERE doc_id = $id LIMIT 1"),
                vec![("id".to_string(), Value::String(id.to_string()))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_row(&self, collection: &str, id: &str, body: Value) -> DomainResult<StoredDocument> {
        require_object(collection, &body)?;
        self.ensure_table(collection).await?;
        self.run(
            format!("CREATE {collection} SET doc_id = $id, version = 1, body = $body RETURN {ROW_FIELDS}"),
            vec![
                ("id".to_string(), Value::String(id.to_string())),
                ("body".to_string(), body),
            ],
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DomainError::Store("create returned no row".to_string()))
    }

    async fn replace_row(&self, collection: &str, id: &str, body: Value) -> DomainResult<Option<StoredDocument>> {
        Ok(self
            .run(
                format!(
                    "UPDATE {collection} SET version += 1, body = $body \
                     WHERE doc_id = $id RETURN {ROW_FIELDS}"
                ),
                vec![
                    ("id".to_string(), Value::String(id.to_string())),
                    ("body".to_string(), body),
                ],
            )
            .await?
            .into_iter()
            .next())
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

/// Table and field names are interpolated into SurrealQL, so only plain
/// identifiers are accepted.
fn validate_identifier(value: &str) -> DomainResult<()> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
    if valid_start && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "'{value}' is not a valid identifier"
        )))
    }
}

fn build_scan_query(collection: &str, filter: &ScanFilter) -> DomainResult<(String, Vec<(String, Value)>)> {
    let mut conditions = Vec::with_capacity(filter.clauses.len());
    let mut binds = Vec::with_capacity(filter.clauses.len());
    for (index, clause) in filter.clauses.iter().enumerate() {
        let field = clause.field();
        validate_identifier(field)?;
        let name = format!("v{index}");
        conditions.push(match clause {
            Clause::Eq { .. } => format!("body.{field} = ${name}"),
            Clause::Contains { .. } => {
                format!("(body.{field} CONTAINS ${name} OR body.{field}.id CONTAINS ${name})")
            }
        });
        binds.push((name, clause.value().clone()));
    }
    let mut query = format!("SELECT {ROW_FIELDS} FROM {collection}");
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }
    Ok((query, binds))
}

fn build_update_query(
    collection: &str,
    fields: &FieldMap,
    expected_version: Option<u64>,
) -> DomainResult<(String, Vec<(String, Value)>)> {
    let mut assignments = vec!["version += 1".to_string()];
    let mut binds = Vec::with_capacity(fields.len() + 1);
    for (index, (field, value)) in fields.iter().enumerate() {
        validate_identifier(field)?;
        let name = format!("f{index}");
        assignments.push(format!("body.{field} = ${name}"));
        binds.push((name, value.clone()));
    }
    let mut query = format!(
        "UPDATE {collection} SET {} WHERE doc_id = $id",
        assignments.join(", ")
    );
    if let Some(expected) = expected_version {
        query.push_str(" AND version = $expected");
        binds.push((
            "expected".to_string(),
            Value::from(i64::try_from(expected).unwrap_or(i64::MAX)),
        ));
    }
    query.push_str(&format!(" RETURN {ROW_FIELDS}"));
    Ok((query, binds))
}

impl DocumentStore for SurrealDocumentStore {
    fn name(&self) -> &'static str {
        "surrealdb"
    }

    fn get(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<Option<StoredDocument>>> {
        let collection = collection.to_string();
        let id = id.to_string();
        Box::pin(async move { self.fetch(&collection, &id).await })
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
        Box::pin(async move { self.create_row(&collection, &id, body).await })
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
            self.ensure_table(&collection).await?;
            if let Some(doc) = self.replace_row(&collection, &id, body.clone()).await? {
                return Ok(doc);
            }
            match self.create_row(&collection, &id, body.clone()).await {
                Err(DomainError::Conflict(_)) => self
                    .replace_row(&collection, &id, body)
                    .await?
                    .ok_or_else(|| DomainError::Store("put lost its row".to_string())),
                other => other,
            }
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
            self.ensure_table(&collection).await?;
            let (query, mut binds) = build_update_query(&collection, &fields, expected_version)?;
            binds.push(("id".to_string(), Value::String(id.clone())));
            if let Some(doc) = self.run(query, binds).await?.into_iter().next() {
                return Ok(doc);
            }
            // Nothing matched: either the row is gone or its version moved on.
            match self.fetch(&collection, &id).await? {
                Some(_) => Err(DomainError::StaleWrite),
                None => Err(DomainError::NotFound("document")),
            }
        })
    }

    fn delete(&self, collection: &str, id: &str) -> BoxFuture<'_, DomainResult<bool>> {
        let collection = collection.to_string();
        let id = id.to_string();
        Box::pin(async move {
            if self.fetch(&collection, &id).await?.is_none() {
                return Ok(false);
            }
            self.client
                .query(format!("DELETE {collection} WHERE doc_id = $id"))
                .bind(("id", id))
                .await
                .map_err(Self::map_surreal_error)?
                .check()
                .map_err(Self::map_surreal_error)?;
            Ok(true)
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
            self.ensure_table(&collection).await?;
            let (query, binds) = build_scan_query(&collection, &filter)?;
            self.run(query, binds).await
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
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.ensure_table(&collection).await?;
            let ids = Value::Array(ids.into_iter().map(Value::String).collect());
            self.run(
                format!("SELECT {ROW_FIELDS} FROM {collection} WHERE doc_id IN $ids"),
                vec![("ids".to_string(), ids)],
            )
            .await
        })
    }
}
