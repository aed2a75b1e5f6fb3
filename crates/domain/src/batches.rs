use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::ports::store::ScanFilter;
use crate::repository::{Document, Repository, patch_fields};
use crate::util::{format_rfc3339, uuid_v7_without_dashes};

const MAX_NAME_LENGTH: usize = 120;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFrequency {
    #[default]
    Monthly,
    Quarterly,
    OneTime,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    #[serde(default)]
    pub id: String,
    pub teacher_id: String,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub payment_amount: Option<f64>,
    #[serde(default)]
    pub payment_frequency: PaymentFrequency,
    #[serde(default)]
    pub payment_day_of_month: Option<u8>,
    #[serde(default)]
    pub created_at: String,
}

impl Document for Batch {
    const COLLECTION: &'static str = "batches";
    const KIND: &'static str = "batch";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, Default)]
pub struct BatchCreate {
    pub teacher_id: String,
    pub name: String,
    pub subject: Option<String>,
    pub payment_amount: Option<f64>,
    pub payment_frequency: Option<PaymentFrequency>,
    pub payment_day_of_month: Option<u8>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_frequency: Option<PaymentFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_day_of_month: Option<u8>,
}

#[derive(Clone)]
pub struct BatchService {
    repo: Repository<Batch>,
    clock: Arc<dyn Clock>,
}

impl BatchService {
    pub fn new(repo: Repository<Batch>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn create(&self, input: BatchCreate) -> DomainResult<Batch> {
        validate_name(&input.name)?;
        validate_payment(input.payment_amount, input.payment_day_of_month)?;
        if input.teacher_id.trim().is_empty() {
            return Err(DomainError::Validation("teacher_id is required".into()));
        }
        let batch = Batch {
            id: uuid_v7_without_dashes(),
            teacher_id: input.teacher_id.trim().to_string(),
            name: input.name.trim().to_string(),
            subject: input.subject,
            payment_amount: input.payment_amount,
            payment_frequency: input.payment_frequency.unwrap_or_default(),
            payment_day_of_month: input.payment_day_of_month,
            created_at: format_rfc3339(self.clock.now()),
        };
        self.repo.create(&batch).await
    }

    pub async fn get(&self, batch_id: &str) -> DomainResult<Batch> {
        self.repo.require(batch_id).await
    }

    pub async fn update(&self, batch_id: &str, patch: BatchUpdate) -> DomainResult<Batch> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        validate_payment(patch.payment_amount, patch.payment_day_of_month)?;
        let fields = patch_fields(&patch)?;
        if fields.is_empty() {
            return self.get(batch_id).await;
        }
        Ok(self.repo.update_fields(batch_id, fields, None).await?.value)
    }

    pub async fn list_by_teacher(&self, teacher_id: &str) -> DomainResult<Vec<Batch>> {
        let mut batches = self
            .repo
            .scan(&ScanFilter::all().eq("teacher_id", teacher_id))
            .await?;
        batches.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(batches)
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::Validation("name is required".into()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(DomainError::Validation(format!(
            "name exceeds max length of {MAX_NAME_LENGTH}"
        )));
    }
    Ok(())
}

fn validate_payment(amount: Option<f64>, day_of_month: Option<u8>) -> DomainResult<()> {
    if amount.is_some_and(|amount| !amount.is_finite() || amount < 0.0) {
        return Err(DomainError::Validation(
            "payment_amount must be a non-negative number".into(),
        ));
    }
    if day_of_month.is_some_and(|day| !(1..=31).contains(&day)) {
        return Err(DomainError::Validation(
            "payment_day_of_month must be between 1 and 31".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::InMemoryDocumentStore;

    fn service() -> BatchService {
        BatchService::new(
            Repository::new(Arc::new(InMemoryDocumentStore::new())),
            Arc::new(SystemClock),
        )
    }

    fn physics(teacher_id: &str) -> BatchCreate {
        BatchCreate {
            teacher_id: teacher_id.to_string(),
            name: "Physics XI".to_string(),
            subject: Some("Physics".to_string()),
            payment_amount: Some(1500.0),
            payment_frequency: None,
            payment_day_of_month: Some(5),
        }
    }

    #[tokio::test]
    async fn create_defaults_to_monthly_billing() {
        let batch = service().create(physics("t-1")).await.expect("create");
        assert_eq!(batch.payment_frequency, PaymentFrequency::Monthly);
        assert!(!batch.id.is_empty());
    }

    #[tokio::test]
    async fn rejects_negative_amounts() {
        let mut input = physics("t-1");
        input.payment_amount = Some(-1.0);
        assert!(matches!(
            service().create(input).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_keeps_untouched_fields() {
        let service = service();
        let batch = service.create(physics("t-1")).await.expect("create");
        let updated = service
            .update(
                &batch.id,
                BatchUpdate {
                    payment_amount: Some(1800.0),
                    ..BatchUpdate::default()
                },
            )
            .await
            .expect("update");
        assert_eq!(updated.payment_amount, Some(1800.0));
        assert_eq!(updated.name, "Physics XI");
    }

    #[tokio::test]
    async fn lists_batches_of_one_teacher() {
        let service = service();
        service.create(physics("t-1")).await.expect("create");
        service.create(physics("t-2")).await.expect("create");
        let batches = service.list_by_teacher("t-1").await.expect("list");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].teacher_id, "t-1");
    }
}
