use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::notifications::{NotificationEmitter, NotificationType, deeplink};
use crate::ports::store::ScanFilter;
use crate::recipients::{RecipientResolver, Scope};
use crate::repository::{Document, Repository, patch_fields};
use crate::util::{format_date, format_rfc3339, non_blank, uuid_v7_without_dashes};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub id: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub publish_date: String,
    #[serde(default)]
    pub submission_date: Option<String>,
    pub title: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Document for Assignment {
    const COLLECTION: &'static str = "assignments";
    const KIND: &'static str = "assignment";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Assignment {
    pub fn scope(&self) -> Scope {
        Scope::from_ids(self.batch_id.as_deref(), self.student_id.as_deref())
    }
}

#[derive(Clone, Debug, Default)]
pub struct AssignmentCreate {
    pub batch_id: Option<String>,
    pub student_id: Option<String>,
    pub publish_date: Option<String>,
    pub submission_date: Option<String>,
    pub title: String,
    pub details: Option<String>,
    pub attachment_urls: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AssignmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_urls: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct AssignmentService {
    repo: Repository<Assignment>,
    resolver: RecipientResolver,
    emitter: NotificationEmitter,
    clock: Arc<dyn Clock>,
}

impl AssignmentService {
    pub fn new(
        repo: Repository<Assignment>,
        resolver: RecipientResolver,
        emitter: NotificationEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            resolver,
            emitter,
            clock,
        }
    }

    pub async fn create(&self, input: AssignmentCreate) -> DomainResult<Assignment> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }
        let now = self.clock.now();
        let assignment = Assignment {
            id: uuid_v7_without_dashes(),
            batch_id: non_blank(input.batch_id.as_deref()).map(str::to_string),
            student_id: non_blank(input.student_id.as_deref()).map(str::to_string),
            publish_date: non_blank(input.publish_date.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| format_date(now.date())),
            submission_date: input.submission_date,
            title,
            details: input.details,
            attachment_urls: input.attachment_urls,
            created_at: format_rfc3339(now),
        };
        let assignment = self.repo.create(&assignment).await?;
        tracing::info!(assignment_id = %assignment.id, "assignment created");

        self.notify(&assignment, &format!("New assignment: {}", assignment.title))
            .await;
        Ok(assignment)
    }

    pub async fn get(&self, assignment_id: &str) -> DomainResult<Assignment> {
        self.repo.require(assignment_id).await
    }

    pub async fn update(
        &self,
        assignment_id: &str,
        patch: AssignmentUpdate,
    ) -> DomainResult<Assignment> {
        if patch
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(DomainError::Validation("title cannot be empty".into()));
        }
        let fields = patch_fields(&patch)?;
        if fields.is_empty() {
            return self.get(assignment_id).await;
        }
        let assignment = self
            .repo
            .update_fields(assignment_id, fields, None)
            .await?
            .value;
        tracing::info!(assignment_id, "assignment updated");

        self.notify(
            &assignment,
            &format!("Assignment updated: {}", assignment.title),
        )
        .await;
        Ok(assignment)
    }

    pub async fn delete(&self, assignment_id: &str) -> DomainResult<()> {
        if self.repo.delete(assignment_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(Assignment::KIND))
        }
    }

    pub async fn list(
        &self,
        batch_id: Option<&str>,
        student_id: Option<&str>,
    ) -> DomainResult<Vec<Assignment>> {
        let filter = match Scope::from_ids(batch_id, student_id) {
            Scope::Batch(batch_id) => ScanFilter::all().eq("batch_id", batch_id),
            Scope::Student(student_id) => ScanFilter::all().eq("student_id", student_id),
            Scope::Unaddressed => {
                return Err(DomainError::Validation(
                    "batch_id or student_id is required".into(),
                ));
            }
        };
        let mut assignments = self.repo.scan(&filter).await?;
        assignments.sort_by(|left, right| right.publish_date.cmp(&left.publish_date));
        Ok(assignments)
    }

    async fn notify(&self, assignment: &Assignment, title: &str) {
        let recipients = self
            .resolver
            .resolve_for_fan_out(&assignment.scope(), &assignment.id)
            .await;
        self.emitter
            .fan_out(
                &assignment.id,
                &recipients,
                NotificationType::Assignment,
                title,
                &deeplink("assignments", &assignment.id),
            )
            .await;
    }
}
