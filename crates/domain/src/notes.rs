use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::notifications::{NotificationEmitter, NotificationType, deeplink};
use crate::ports::store::ScanFilter;
use crate::recipients::{RecipientResolver, Scope};
use crate::repository::{Document, Repository};
use crate::util::{format_date, format_rfc3339, non_blank, uuid_v7_without_dashes};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub publish_date: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub list_urls: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Document for Note {
    const COLLECTION: &'static str = "notes";
    const KIND: &'static str = "notes";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, Default)]
pub struct NoteCreate {
    pub batch_id: Option<String>,
    pub student_id: Option<String>,
    pub publish_date: Option<String>,
    pub title: String,
    pub content: Option<String>,
    pub list_urls: Vec<String>,
}

#[derive(Clone)]
pub struct NoteService {
    repo: Repository<Note>,
    resolver: RecipientResolver,
    emitter: NotificationEmitter,
    clock: Arc<dyn Clock>,
}

impl NoteService {
    pub fn new(
        repo: Repository<Note>,
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

    pub async fn create(&self, input: NoteCreate) -> DomainResult<Note> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }
        let now = self.clock.now();
        let note = Note {
            id: uuid_v7_without_dashes(),
            batch_id: non_blank(input.batch_id.as_deref()).map(str::to_string),
            student_id: non_blank(input.student_id.as_deref()).map(str::to_string),
            publish_date: non_blank(input.publish_date.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| format_date(now.date())),
            title,
            content: input.content,
            list_urls: input.list_urls,
            created_at: format_rfc3339(now),
        };
        let note = self.repo.create(&note).await?;
        tracing::info!(note_id = %note.id, "notes created");

        let scope = Scope::from_ids(note.batch_id.as_deref(), note.student_id.as_deref());
        let recipients = self.resolver.resolve_for_fan_out(&scope, &note.id).await;
        self.emitter
            .fan_out(
                &note.id,
                &recipients,
                NotificationType::Notes,
                &format!("New notes: {}", note.title),
                &deeplink("notes", &note.id),
            )
            .await;
        Ok(note)
    }

    pub async fn get(&self, note_id: &str) -> DomainResult<Note> {
        self.repo.require(note_id).await
    }

    pub async fn delete(&self, note_id: &str) -> DomainResult<()> {
        if self.repo.delete(note_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(Note::KIND))
        }
    }

    pub async fn list(
        &self,
        batch_id: Option<&str>,
        student_id: Option<&str>,
    ) -> DomainResult<Vec<Note>> {
        let filter = match Scope::from_ids(batch_id, student_id) {
            Scope::Batch(batch_id) => ScanFilter::all().eq("batch_id", batch_id),
            Scope::Student(student_id) => ScanFilter::all().eq("student_id", student_id),
            Scope::Unaddressed => {
                return Err(DomainError::Validation(
                    "batch_id or student_id is required".into(),
                ));
            }
        };
        let mut notes = self.repo.scan(&filter).await?;
        notes.sort_by(|left, right| right.publish_date.cmp(&left.publish_date));
        Ok(notes)
    }
}
