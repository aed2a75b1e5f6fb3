use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::notifications::{NotificationEmitter, NotificationType, Recipient, deeplink};
use crate::ports::store::{FieldMap, ScanFilter};
use crate::recipients::{RecipientResolver, Scope};
use crate::repository::{Document, Repository};
use crate::util::{format_rfc3339, non_blank, uuid_v7_without_dashes};

/// Sender or receiver of a message; same wire shape as a recipient.
pub type Participant = Recipient;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reply {
    pub content: String,
    pub sender: Participant,
    pub timestamp: String,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub sender: Participant,
    #[serde(default)]
    pub receiver: Option<Participant>,
    pub timestamp: String,
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    #[serde(default)]
    pub replies: Vec<Reply>,
}

impl Document for Message {
    const COLLECTION: &'static str = "messages";
    const KIND: &'static str = "message";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Message {
    pub fn scope(&self) -> Scope {
        Scope::from_ids(self.batch_id.as_deref(), self.student_id.as_deref())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MessageCreate {
    pub subject: String,
    pub content: String,
    pub batch_id: Option<String>,
    pub student_id: Option<String>,
    pub receiver: Option<Participant>,
    pub attachment_urls: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ReplyCreate {
    pub content: String,
    pub attachment_urls: Vec<String>,
}

#[derive(Clone)]
pub struct MessageService {
    repo: Repository<Message>,
    resolver: RecipientResolver,
    emitter: NotificationEmitter,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(
        repo: Repository<Message>,
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

    pub async fn create(&self, sender: Participant, input: MessageCreate) -> DomainResult<Message> {
        let subject = input.subject.trim().to_string();
        if subject.is_empty() {
            return Err(DomainError::Validation("subject is required".into()));
        }
        if input.content.trim().is_empty() {
            return Err(DomainError::Validation("content is required".into()));
        }
        let message = Message {
            id: uuid_v7_without_dashes(),
            subject,
            content: input.content,
            batch_id: non_blank(input.batch_id.as_deref()).map(str::to_string),
            student_id: non_blank(input.student_id.as_deref()).map(str::to_string),
            sender,
            receiver: input.receiver,
            timestamp: format_rfc3339(self.clock.now()),
            attachment_urls: input.attachment_urls,
            replies: Vec::new(),
        };
        let message = self.repo.create(&message).await?;
        tracing::info!(message_id = %message.id, "message created");

        let recipients = self.audience(&message, &message.sender).await;
        self.emitter
            .fan_out(
                &message.id,
                &recipients,
                NotificationType::Message,
                &format!("New message: {}", message.subject),
                &deeplink("messages", &message.id),
            )
            .await;
        Ok(message)
    }

    pub async fn get(&self, message_id: &str) -> DomainResult<Message> {
        self.repo.require(message_id).await
    }

    pub async fn list(
        &self,
        batch_id: Option<&str>,
        student_id: Option<&str>,
    ) -> DomainResult<Vec<Message>> {
        let mut filter = ScanFilter::all();
        if let Some(batch_id) = non_blank(batch_id) {
            filter = filter.eq("batch_id", batch_id);
        }
        if let Some(student_id) = non_blank(student_id) {
            filter = filter.eq("student_id", student_id);
        }
        if filter.clauses.is_empty() {
            return Err(DomainError::Validation(
                "batch_id or student_id is required".into(),
            ));
        }
        let mut messages = self.repo.scan(&filter).await?;
        messages.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
        Ok(messages)
    }

    pub fn new_reply(&self, sender: Participant, input: ReplyCreate) -> Reply {
        Reply {
            content: input.content,
            sender,
            timestamp: format_rfc3339(self.clock.now()),
            attachment_urls: input.attachment_urls,
        }
    }

    /// Appends under a version check so concurrent replies are all kept.
    pub async fn add_reply(&self, message_id: &str, reply: Reply) -> DomainResult<Message> {
        if reply.content.trim().is_empty() {
            return Err(DomainError::Validation("content is required".into()));
        }
        let updated = self
            .repo
            .modify(message_id, |message| {
                let mut replies = message.replies.clone();
                replies.push(reply.clone());
                let replies = serde_json::to_value(replies)
                    .map_err(|err| DomainError::Store(format!("invalid replies: {err}")))?;
                let mut fields = FieldMap::new();
                fields.insert("replies".into(), replies);
                Ok(fields)
            })
            .await?
            .value;
        tracing::info!(
            message_id,
            replies = updated.replies.len(),
            "reply appended"
        );

        let recipients = if reply.sender.id == updated.sender.id {
            self.audience(&updated, &reply.sender).await
        } else {
            vec![updated.sender.clone()]
        };
        self.emitter
            .fan_out(
                &updated.id,
                &recipients,
                NotificationType::MessageReply,
                &format!("New reply: {}", updated.subject),
                &deeplink("messages", &updated.id),
            )
            .await;
        Ok(updated)
    }

    /// Direct receiver when set, otherwise the resolved scope. The author is
    /// never notified of their own message.
    async fn audience(&self, message: &Message, author: &Participant) -> Vec<Recipient> {
        let recipients = match &message.receiver {
            Some(receiver) => vec![receiver.clone()],
            None => {
                self.resolver
                    .resolve_for_fan_out(&message.scope(), &message.id)
                    .await
            }
        };
        recipients
            .into_iter()
            .filter(|recipient| recipient.id != author.id)
            .collect()
    }
}
