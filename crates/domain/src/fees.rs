use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

use crate::DomainResult;
use crate::batches::Batch;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::notifications::{NotificationEmitter, NotificationType, RecipientType, deeplink};
use crate::ports::store::{FieldMap, ScanFilter};
use crate::recipients::{RecipientResolver, Scope};
use crate::repository::{Document, Repository};
use crate::util::{format_date, format_rfc3339, non_blank};

/// Day of the following month on which payment is expected.
const PAYMENT_DAY: u8 = 5;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    #[default]
    Pending,
    Paid,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeeRecord {
    pub id: String,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub month: String,
    pub due_date: String,
    #[serde(default)]
    pub payment_date: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub status: FeeStatus,
    #[serde(default)]
    pub teacher_acknowledgement: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Document for FeeRecord {
    const COLLECTION: &'static str = "fee_records";
    const KIND: &'static str = "fee record";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One record per student and month; the store rejects a second insert.
pub fn fee_record_id(student_id: &str, month: &str) -> String {
    format!("fee_{student_id}_{month}")
}

pub fn billing_month(now: OffsetDateTime) -> String {
    format!("{:04}-{:02}", now.year(), u8::from(now.month()))
}

pub fn parse_month(value: &str) -> DomainResult<(i32, Month)> {
    let invalid = || DomainError::Validation(format!("month '{value}' must be YYYY-MM"));
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Ok((year, month))
}

pub fn last_day_of_month(year: i32, month: Month) -> DomainResult<Date> {
    Date::from_calendar_date(year, month, month.length(year))
        .map_err(|err| DomainError::Validation(format!("invalid billing date: {err}")))
}

pub fn fifth_of_next_month(year: i32, month: Month) -> DomainResult<Date> {
    let next_year = if month == Month::December { year + 1 } else { year };
    Date::from_calendar_date(next_year, month.next(), PAYMENT_DAY)
        .map_err(|err| DomainError::Validation(format!("invalid billing date: {err}")))
}

fn display_date(value: &str) -> String {
    let Ok(date) = Date::parse(value, format_description!("[year]-[month]-[day]")) else {
        return value.to_string();
    };
    date.format(format_description!("[day] [month repr:short] [year]"))
        .unwrap_or_else(|_| value.to_string())
}

#[derive(Clone, Debug, PartialEq)]
pub enum CreateOutcome {
    Created(FeeRecord),
    /// A record for the same student and month was already stored.
    Duplicate(FeeRecord),
}

#[derive(Clone, Debug, Default)]
pub struct FeeCreate {
    pub batch_id: Option<String>,
    pub student_id: Option<String>,
    pub month: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<String>,
    pub payment_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct FeeCreateReport {
    pub created: Vec<FeeRecord>,
    pub duplicates: Vec<FeeRecord>,
}

impl FeeCreateReport {
    fn record(&mut self, outcome: CreateOutcome) {
        match outcome {
            CreateOutcome::Created(record) => self.created.push(record),
            CreateOutcome::Duplicate(record) => self.duplicates.push(record),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FeeQuery {
    pub student_id: Option<String>,
    pub batch_id: Option<String>,
    pub month: Option<String>,
}

#[derive(Clone)]
pub struct FeeService {
    fees: Repository<FeeRecord>,
    batches: Repository<Batch>,
    resolver: RecipientResolver,
    emitter: NotificationEmitter,
    clock: Arc<dyn Clock>,
}

impl FeeService {
    pub fn new(
        fees: Repository<FeeRecord>,
        batches: Repository<Batch>,
        resolver: RecipientResolver,
        emitter: NotificationEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fees,
            batches,
            resolver,
            emitter,
            clock,
        }
    }

    /// Stores a student-scoped record unless one already exists for the
    /// same month. Either way the student is told about the invoice.
    pub async fn create_record(&self, mut draft: FeeRecord) -> DomainResult<CreateOutcome> {
        let student_id = non_blank(draft.student_id.as_deref())
            .ok_or_else(|| DomainError::Validation("fee records need a student_id".into()))?
            .to_string();
        parse_month(&draft.month)?;

        let outcome = match self.find_existing(&student_id, &draft.month).await? {
            Some(existing) => CreateOutcome::Duplicate(existing),
            None => {
                draft.id = fee_record_id(&student_id, &draft.month);
                draft.student_id = Some(student_id.clone());
                if draft.created_at.is_empty() {
                    draft.created_at = format_rfc3339(self.clock.now());
                }
                match self.fees.create(&draft).await {
                    Ok(record) => CreateOutcome::Created(record),
                    Err(DomainError::Conflict(_)) => {
                        let existing = self.fees.require(&draft.id).await?;
                        CreateOutcome::Duplicate(existing)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        match &outcome {
            CreateOutcome::Created(record) => {
                tracing::info!(
                    fee_id = %record.id,
                    student_id = %student_id,
                    month = %record.month,
                    "fee record created"
                );
                self.notify_invoice(record, false).await?;
            }
            CreateOutcome::Duplicate(record) => {
                tracing::info!(
                    fee_id = %record.id,
                    student_id = %student_id,
                    month = %record.month,
                    "fee record already exists"
                );
                self.notify_invoice(record, true).await?;
            }
        }
        Ok(outcome)
    }

    async fn find_existing(&self, student_id: &str, month: &str) -> DomainResult<Option<FeeRecord>> {
        let filter = ScanFilter::all()
            .eq("student_id", student_id)
            .eq("month", month);
        Ok(self.fees.scan(&filter).await?.into_iter().next())
    }

    async fn notify_invoice(&self, record: &FeeRecord, duplicate: bool) -> DomainResult<()> {
        let scope = Scope::from_ids(None, record.student_id.as_deref());
        let recipients = self.resolver.resolve(&scope).await?;
        let due = display_date(&record.due_date);
        let title = if duplicate {
            format!("Reminder: fee of {:.2} is due on {due}", record.amount)
        } else {
            format!("Fee invoice of {:.2} released, due on {due}", record.amount)
        };
        self.emitter
            .fan_out(
                &record.id,
                &recipients,
                NotificationType::FeeInvoiceReleased,
                &title,
                &deeplink("fees", &record.id),
            )
            .await;
        Ok(())
    }

    /// Creates one record for a student, or one per member of a batch.
    pub async fn create(&self, input: FeeCreate) -> DomainResult<FeeCreateReport> {
        let scope = match non_blank(input.student_id.as_deref()) {
            Some(student_id) => Scope::Student(student_id.to_string()),
            None => Scope::from_ids(input.batch_id.as_deref(), None),
        };
        let batch = match non_blank(input.batch_id.as_deref()) {
            Some(batch_id) => Some(self.batches.require(batch_id).await?),
            None => None,
        };

        let month = match non_blank(input.month.as_deref()) {
            Some(month) => month.to_string(),
            None => billing_month(self.clock.now()),
        };
        let (year, calendar_month) = parse_month(&month)?;
        let amount = input
            .amount
            .or_else(|| batch.as_ref().and_then(|batch| batch.payment_amount))
            .ok_or_else(|| DomainError::Validation("amount is required".into()))?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(DomainError::Validation(
                "amount must be a non-negative number".into(),
            ));
        }
        let due_date = match non_blank(input.due_date.as_deref()) {
            Some(due_date) => due_date.to_string(),
            None => format_date(last_day_of_month(year, calendar_month)?),
        };
        let payment_date = match non_blank(input.payment_date.as_deref()) {
            Some(payment_date) => payment_date.to_string(),
            None => format_date(fifth_of_next_month(year, calendar_month)?),
        };

        let student_ids: Vec<String> = match &scope {
            Scope::Student(student_id) => vec![student_id.clone()],
            Scope::Batch(batch_id) => self
                .resolver
                .batch_roster(batch_id)
                .await?
                .into_iter()
                .map(|student| student.id)
                .collect(),
            Scope::Unaddressed => {
                return Err(DomainError::Validation(
                    "batch_id or student_id is required".into(),
                ));
            }
        };

        let mut report = FeeCreateReport::default();
        for student_id in student_ids {
            let draft = FeeRecord {
                id: String::new(),
                batch_id: batch.as_ref().map(|batch| batch.id.clone()),
                student_id: Some(student_id),
                month: month.clone(),
                due_date: due_date.clone(),
                payment_date: Some(payment_date.clone()),
                amount,
                status: FeeStatus::Pending,
                teacher_acknowledgement: false,
                notes: input.notes.clone(),
                created_at: String::new(),
            };
            report.record(self.create_record(draft).await?);
        }
        Ok(report)
    }

    pub async fn get(&self, fee_id: &str) -> DomainResult<FeeRecord> {
        self.fees.require(fee_id).await
    }

    pub async fn list(&self, query: &FeeQuery) -> DomainResult<Vec<FeeRecord>> {
        let mut filter = ScanFilter::all();
        if let Some(student_id) = non_blank(query.student_id.as_deref()) {
            filter = filter.eq("student_id", student_id);
        }
        if let Some(batch_id) = non_blank(query.batch_id.as_deref()) {
            filter = filter.eq("batch_id", batch_id);
        }
        if filter.clauses.is_empty() {
            return Err(DomainError::Validation(
                "batch_id or student_id is required".into(),
            ));
        }
        if let Some(month) = non_blank(query.month.as_deref()) {
            parse_month(month)?;
            filter = filter.eq("month", month);
        }
        let mut records = self.fees.scan(&filter).await?;
        records.sort_by(|left, right| {
            right
                .month
                .cmp(&left.month)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(records)
    }

    /// Marks the record paid and tells the batch's teacher.
    pub async fn mark_paid(
        &self,
        fee_id: &str,
        payment_date: Option<String>,
    ) -> DomainResult<FeeRecord> {
        let payment_date = match non_blank(payment_date.as_deref()) {
            Some(payment_date) => payment_date.to_string(),
            None => format_date(self.clock.now().date()),
        };
        let mut fields = FieldMap::new();
        fields.insert("status".into(), Value::String("paid".into()));
        fields.insert("payment_date".into(), Value::String(payment_date));
        let record = self.fees.update_fields(fee_id, fields, None).await?.value;
        tracing::info!(fee_id, "fee record marked paid");

        if let Some(batch_id) = non_blank(record.batch_id.as_deref()) {
            match self.batches.get(batch_id).await {
                Ok(Some(batch)) => {
                    let title = format!(
                        "Fee of {:.2} paid for {} ({})",
                        record.amount, batch.name, record.month
                    );
                    self.emitter
                        .emit(
                            &record.id,
                            &batch.teacher_id,
                            RecipientType::Teacher,
                            NotificationType::FeePaid,
                            &title,
                            &deeplink("fees", &record.id),
                        )
                        .await;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = %err, fee_id, batch_id, "batch lookup failed; teacher not notified");
                }
            }
        }
        Ok(record)
    }

    /// Teacher confirms receipt of a paid fee; the student is told.
    pub async fn acknowledge(&self, fee_id: &str) -> DomainResult<FeeRecord> {
        let updated = self
            .fees
            .modify(fee_id, |record| {
                if record.status != FeeStatus::Paid {
                    return Err(DomainError::Conflict("fee record is not paid yet".into()));
                }
                let mut fields = FieldMap::new();
                fields.insert("teacher_acknowledgement".into(), Value::Bool(true));
                Ok(fields)
            })
            .await?
            .value;
        tracing::info!(fee_id, "fee payment acknowledged");

        if let Some(student_id) = non_blank(updated.student_id.as_deref()) {
            let title = format!(
                "Payment of {:.2} for {} confirmed",
                updated.amount, updated.month
            );
            self.emitter
                .emit(
                    &updated.id,
                    student_id,
                    RecipientType::Student,
                    NotificationType::FeePaymentConfirmed,
                    &title,
                    &deeplink("fees", &updated.id),
                )
                .await;
        }
        Ok(updated)
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeRunStatus {
    Success,
    Error,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FeeRunReport {
    pub status: FeeRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub month: String,
    pub created: usize,
    pub duplicates: usize,
    pub skipped_batches: usize,
}

#[derive(Debug, Default)]
struct FeeRunCounts {
    created: usize,
    duplicates: usize,
    skipped_batches: usize,
}

/// Monthly job: bills every student of every priced batch once per month.
#[derive(Clone)]
pub struct FeeRecordGenerator {
    batches: Repository<Batch>,
    fees: Repository<FeeRecord>,
    resolver: RecipientResolver,
    service: FeeService,
    clock: Arc<dyn Clock>,
}

impl FeeRecordGenerator {
    pub fn new(
        batches: Repository<Batch>,
        fees: Repository<FeeRecord>,
        resolver: RecipientResolver,
        service: FeeService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            batches,
            fees,
            resolver,
            service,
            clock,
        }
    }

    pub async fn generate(&self) -> FeeRunReport {
        let now = self.clock.now();
        let month = billing_month(now);
        let mut counts = FeeRunCounts::default();
        let result = self.run(now, &month, &mut counts).await;

        let (status, message) = match result {
            Ok(()) => {
                tracing::info!(
                    month = %month,
                    created = counts.created,
                    duplicates = counts.duplicates,
                    skipped_batches = counts.skipped_batches,
                    "fee generation finished"
                );
                (FeeRunStatus::Success, None)
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    month = %month,
                    created = counts.created,
                    "fee generation aborted"
                );
                (FeeRunStatus::Error, Some(err.to_string()))
            }
        };
        FeeRunReport {
            status,
            message,
            month,
            created: counts.created,
            duplicates: counts.duplicates,
            skipped_batches: counts.skipped_batches,
        }
    }

    async fn run(
        &self,
        now: OffsetDateTime,
        month: &str,
        counts: &mut FeeRunCounts,
    ) -> DomainResult<()> {
        let year = now.year();
        let calendar_month = now.month();
        let due_date = format_date(last_day_of_month(year, calendar_month)?);
        let payment_date = format_date(fifth_of_next_month(year, calendar_month)?);

        // A student owes one fee per month however many batches they attend.
        let mut billed: HashSet<String> = self
            .fees
            .scan(&ScanFilter::all().eq("month", month))
            .await?
            .into_iter()
            .filter_map(|record| record.student_id)
            .collect();

        for batch in self.batches.list_all().await? {
            let amount = match batch.payment_amount {
                Some(amount) if !batch.id.trim().is_empty() => amount,
                _ => {
                    tracing::info!(batch_id = %batch.id, "batch has no id or payment amount; skipped");
                    counts.skipped_batches += 1;
                    continue;
                }
            };

            let roster = self.resolver.batch_roster(&batch.id).await?;
            for student in roster {
                if !billed.insert(student.id.clone()) {
                    continue;
                }
                let draft = FeeRecord {
                    id: String::new(),
                    batch_id: Some(batch.id.clone()),
                    student_id: Some(student.id),
                    month: month.to_string(),
                    due_date: due_date.clone(),
                    payment_date: Some(payment_date.clone()),
                    amount,
                    status: FeeStatus::Pending,
                    teacher_acknowledgement: false,
                    notes: Some(format!("Monthly fee for {} ({month})", batch.name)),
                    created_at: format_rfc3339(now),
                };
                match self.service.create_record(draft).await? {
                    CreateOutcome::Created(_) => counts.created += 1,
                    CreateOutcome::Duplicate(_) => counts.duplicates += 1,
                }
            }
        }
        Ok(())
    }
}
