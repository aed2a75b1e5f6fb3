use crate::DomainResult;
use crate::batches::Batch;
use crate::notifications::Recipient;
use crate::ports::store::ScanFilter;
use crate::repository::Repository;
use crate::students::Student;
use crate::util::non_blank;

pub const UNKNOWN_BATCH: &str = "Unknown Batch";

/// Addressing mode of a record that fans out notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Batch(String),
    Student(String),
    Unaddressed,
}

impl Scope {
    /// A batch id wins over a student id; blank ids count as absent.
    pub fn from_ids(batch_id: Option<&str>, student_id: Option<&str>) -> Self {
        if let Some(batch_id) = non_blank(batch_id) {
            return Scope::Batch(batch_id.to_string());
        }
        if let Some(student_id) = non_blank(student_id) {
            return Scope::Student(student_id.to_string());
        }
        Scope::Unaddressed
    }
}

#[derive(Clone)]
pub struct RecipientResolver {
    batches: Repository<Batch>,
    students: Repository<Student>,
}

impl RecipientResolver {
    pub fn new(batches: Repository<Batch>, students: Repository<Student>) -> Self {
        Self { batches, students }
    }

    pub async fn resolve(&self, scope: &Scope) -> DomainResult<Vec<Recipient>> {
        match scope {
            Scope::Batch(batch_id) => Ok(self
                .batch_roster(batch_id)
                .await?
                .into_iter()
                .map(|student| Recipient::student(student.id))
                .collect()),
            Scope::Student(student_id) => Ok(vec![Recipient::student(student_id.clone())]),
            Scope::Unaddressed => Ok(Vec::new()),
        }
    }

    /// Resolution for notification fan-out, where a store failure must not
    /// reach the caller.
    pub async fn resolve_for_fan_out(&self, scope: &Scope, object_id: &str) -> Vec<Recipient> {
        match self.resolve(scope).await {
            Ok(recipients) => recipients,
            Err(err) => {
                tracing::warn!(error = %err, object_id, "recipient resolution failed");
                Vec::new()
            }
        }
    }

    /// Never fails: lookup errors and missing batches both yield the
    /// placeholder name.
    pub async fn batch_label(&self, batch_id: &str) -> String {
        match self.batches.get(batch_id).await {
            Ok(Some(batch)) => batch.name,
            Ok(None) => UNKNOWN_BATCH.to_string(),
            Err(err) => {
                tracing::warn!(error = %err, batch_id, "batch lookup failed");
                UNKNOWN_BATCH.to_string()
            }
        }
    }

    /// Students whose membership list holds the batch, in store scan order.
    pub async fn batch_roster(&self, batch_id: &str) -> DomainResult<Vec<Student>> {
        self.students
            .scan(&ScanFilter::all().contains("batches", batch_id))
            .await
    }
}
