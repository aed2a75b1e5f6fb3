use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::ports::store::{FieldMap, ScanFilter};
use crate::repository::{Document, Repository};
use crate::util::{format_rfc3339, uuid_v7_without_dashes};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientType {
    Student,
    Teacher,
}

impl RecipientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipientType::Student => "STUDENT",
            RecipientType::Teacher => "TEACHER",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Message,
    FeePaid,
    NewStudent,
    FeeInvoiceReleased,
    FeePaymentConfirmed,
    Assignment,
    Notes,
    MessageReply,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Message => "MESSAGE",
            NotificationType::FeePaid => "FEE_PAID",
            NotificationType::NewStudent => "NEW_STUDENT",
            NotificationType::FeeInvoiceReleased => "FEE_INVOICE_RELEASED",
            NotificationType::FeePaymentConfirmed => "FEE_PAYMENT_CONFIRMED",
            NotificationType::Assignment => "ASSIGNMENT",
            NotificationType::Notes => "NOTES",
            NotificationType::MessageReply => "MESSAGE_REPLY",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Recipient {
    pub id: String,
    #[serde(rename = "type")]
    pub recipient_type: RecipientType,
}

impl Recipient {
    pub fn student(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            recipient_type: RecipientType::Student,
        }
    }

    pub fn teacher(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            recipient_type: RecipientType::Teacher,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub recipient_type: RecipientType,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub object_id: String,
    pub deeplink: String,
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub seen_time: Option<String>,
    pub notification_time: String,
}

impl Document for Notification {
    const COLLECTION: &'static str = "notifications";
    const KIND: &'static str = "notification";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn deeplink(section: &str, object_id: &str) -> String {
    format!("/{section}/{object_id}")
}

/// Persists notifications on behalf of other services. Delivery is best
/// effort: a failed insert is logged and never reaches the caller.
#[derive(Clone)]
pub struct NotificationEmitter {
    repo: Repository<Notification>,
    clock: Arc<dyn Clock>,
}

impl NotificationEmitter {
    pub fn new(repo: Repository<Notification>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    async fn try_emit(
        &self,
        object_id: &str,
        recipient: &Recipient,
        notification_type: NotificationType,
        title: &str,
        deeplink: &str,
    ) -> DomainResult<Notification> {
        let notification = Notification {
            id: uuid_v7_without_dashes(),
            recipient_id: recipient.id.clone(),
            recipient_type: recipient.recipient_type,
            notification_type,
            title: title.to_string(),
            object_id: object_id.to_string(),
            deeplink: deeplink.to_string(),
            seen: false,
            seen_time: None,
            notification_time: format_rfc3339(self.clock.now()),
        };
        self.repo.create(&notification).await
    }

    pub async fn emit(
        &self,
        object_id: &str,
        recipient_id: &str,
        recipient_type: RecipientType,
        notification_type: NotificationType,
        title: &str,
        deeplink: &str,
    ) {
        let recipient = Recipient {
            id: recipient_id.to_string(),
            recipient_type,
        };
        self.deliver(object_id, &recipient, notification_type, title, deeplink)
            .await;
    }

    async fn deliver(
        &self,
        object_id: &str,
        recipient: &Recipient,
        notification_type: NotificationType,
        title: &str,
        deeplink: &str,
    ) -> bool {
        match self
            .try_emit(object_id, recipient, notification_type, title, deeplink)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    object_id,
                    recipient_id = %recipient.id,
                    recipient_type = recipient.recipient_type.as_str(),
                    notification_type = notification_type.as_str(),
                    "notification dropped"
                );
                false
            }
        }
    }

    /// One notification per recipient. Returns how many were persisted.
    pub async fn fan_out(
        &self,
        object_id: &str,
        recipients: &[Recipient],
        notification_type: NotificationType,
        title: &str,
        deeplink: &str,
    ) -> usize {
        let mut delivered = 0;
        for recipient in recipients {
            if self
                .deliver(object_id, recipient, notification_type, title, deeplink)
                .await
            {
                delivered += 1;
            }
        }
        tracing::debug!(
            object_id,
            notification_type = notification_type.as_str(),
            recipients = recipients.len(),
            delivered,
            "notification fan-out finished"
        );
        delivered
    }
}

#[derive(Clone)]
pub struct NotificationService {
    repo: Repository<Notification>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(repo: Repository<Notification>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn list_for_recipient(
        &self,
        recipient_id: &str,
        unseen_only: bool,
    ) -> DomainResult<Vec<Notification>> {
        let mut filter = ScanFilter::all().eq("recipient_id", recipient_id);
        if unseen_only {
            filter = filter.eq("seen", false);
        }
        let mut items = self.repo.scan(&filter).await?;
        items.sort_by(|left, right| {
            right
                .notification_time
                .cmp(&left.notification_time)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(items)
    }

    pub async fn get(&self, notification_id: &str) -> DomainResult<Notification> {
        self.repo.require(notification_id).await
    }

    pub async fn unread_count(&self, recipient_id: &str) -> DomainResult<usize> {
        Ok(self.list_for_recipient(recipient_id, true).await?.len())
    }

    pub async fn mark_seen(&self, notification_id: &str) -> DomainResult<Notification> {
        if notification_id.trim().is_empty() {
            return Err(DomainError::Validation("notification_id is required".into()));
        }
        let mut fields = FieldMap::new();
        fields.insert("seen".into(), true.into());
        fields.insert("seen_time".into(), format_rfc3339(self.clock.now()).into());
        Ok(self
            .repo
            .update_fields(notification_id, fields, None)
            .await?
            .value)
    }
}
