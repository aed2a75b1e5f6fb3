use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::DomainResult;
use crate::batches::Batch;
use crate::error::DomainError;
use crate::notifications::{NotificationEmitter, NotificationType, RecipientType, deeplink};
use crate::ports::store::FieldMap;
use crate::recipients::{RecipientResolver, UNKNOWN_BATCH};
use crate::repository::Repository;
use crate::students::{BatchRef, Student};

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub id: String,
    pub name: String,
}

/// Keeps `Student.batches` consistent with the batches collection.
#[derive(Clone)]
pub struct BatchMembershipService {
    students: Repository<Student>,
    batches: Repository<Batch>,
    resolver: RecipientResolver,
    emitter: NotificationEmitter,
}

impl BatchMembershipService {
    pub fn new(
        students: Repository<Student>,
        batches: Repository<Batch>,
        resolver: RecipientResolver,
        emitter: NotificationEmitter,
    ) -> Self {
        Self {
            students,
            batches,
            resolver,
            emitter,
        }
    }

    pub async fn add_student_to_batch(
        &self,
        student_id: &str,
        batch_id: &str,
    ) -> DomainResult<Student> {
        let batch_id = require_id("batch_id", batch_id)?;
        let updated = self
            .students
            .modify(student_id, |student| {
                let mut ids = student.batch_ids();
                if ids.iter().any(|id| id == batch_id) {
                    return Err(DomainError::Conflict("student already in batch".into()));
                }
                ids.push(batch_id.to_string());
                batches_field(ids)
            })
            .await?;

        tracing::info!(student_id, batch_id, "student added to batch");
        self.notify_teacher(&updated.value, batch_id).await;
        Ok(updated.value)
    }

    pub async fn remove_student_from_batch(
        &self,
        student_id: &str,
        batch_id: &str,
    ) -> DomainResult<Student> {
        let batch_id = require_id("batch_id", batch_id)?;
        let updated = self
            .students
            .modify(student_id, |student| {
                let ids = student.batch_ids();
                if !ids.iter().any(|id| id == batch_id) {
                    return Err(DomainError::NotFound("batch membership"));
                }
                batches_field(ids.into_iter().filter(|id| id != batch_id).collect())
            })
            .await?;

        tracing::info!(student_id, batch_id, "student removed from batch");
        Ok(updated.value)
    }

    pub async fn students_by_batch(&self, batch_id: &str) -> DomainResult<Vec<Student>> {
        let roster = self.resolver.batch_roster(batch_id).await?;
        self.enrich_students(roster).await
    }

    pub async fn batches_for_student(&self, student_id: &str) -> DomainResult<Vec<BatchSummary>> {
        let student = self.students.require(student_id).await?;
        let names = self.batch_names(&student.batch_ids()).await?;
        Ok(student
            .batch_ids()
            .into_iter()
            .map(|id| BatchSummary {
                name: name_for(&names, &id),
                id,
            })
            .collect())
    }

    /// Rewrites every membership entry to `{id, name}` with a single bulk
    /// batch fetch across all given students.
    pub async fn enrich_students(&self, students: Vec<Student>) -> DomainResult<Vec<Student>> {
        let mut seen = HashSet::new();
        let unique_ids: Vec<String> = students
            .iter()
            .flat_map(Student::batch_ids)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let names = self.batch_names(&unique_ids).await?;

        Ok(students
            .into_iter()
            .map(|mut student| {
                student.batches = student
                    .batch_ids()
                    .into_iter()
                    .map(|id| BatchRef::Enriched {
                        name: name_for(&names, &id),
                        id,
                    })
                    .collect();
                student
            })
            .collect())
    }

    async fn batch_names(&self, ids: &[String]) -> DomainResult<HashMap<String, String>> {
        Ok(self
            .batches
            .batch_get(ids)
            .await?
            .into_iter()
            .map(|batch| (batch.id, batch.name))
            .collect())
    }

    async fn notify_teacher(&self, student: &Student, batch_id: &str) {
        let batch = match self.batches.get(batch_id).await {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, batch_id, "batch lookup failed; teacher not notified");
                return;
            }
        };
        let title = format!("{} joined {}", student.name, batch.name);
        self.emitter
            .emit(
                &student.id,
                &batch.teacher_id,
                RecipientType::Teacher,
                NotificationType::NewStudent,
                &title,
                &deeplink("students", &student.id),
            )
            .await;
    }
}

fn require_id<'a>(field: &str, value: &'a str) -> DomainResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

fn batches_field(ids: Vec<String>) -> DomainResult<FieldMap> {
    let mut fields = FieldMap::new();
    fields.insert(
        "batches".into(),
        Value::Array(ids.into_iter().map(Value::String).collect()),
    );
    Ok(fields)
}

fn name_for(names: &HashMap<String, String>, id: &str) -> String {
    names
        .get(id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_BATCH.to_string())
}
