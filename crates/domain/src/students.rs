use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::repository::{Document, Repository, patch_fields};
use crate::util::{format_rfc3339, uuid_v7_without_dashes};

/// A membership entry as it may appear in a stored or outgoing student.
/// Only the bare id form is ever written back.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BatchRef {
    Id(String),
    Enriched {
        id: String,
        #[serde(default)]
        name: String,
    },
}

impl BatchRef {
    pub fn id(&self) -> &str {
        match self {
            BatchRef::Id(id) | BatchRef::Enriched { id, .. } => id,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Student {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub batches: Vec<BatchRef>,
}

impl Document for Student {
    const COLLECTION: &'static str = "students";
    const KIND: &'static str = "student";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Student {
    pub fn batch_ids(&self) -> Vec<String> {
        normalized_batch_ids(&self.batches)
    }

    pub fn is_member_of(&self, batch_id: &str) -> bool {
        self.batches.iter().any(|entry| entry.id() == batch_id)
    }
}

/// Bare ids in list order, first occurrence wins, blank ids dropped.
pub fn normalized_batch_ids(entries: &[BatchRef]) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|entry| entry.id().trim())
        .filter(|id| !id.is_empty() && seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug, Default)]
pub struct StudentCreate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub grade: Option<String>,
    pub school: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub batches: Vec<BatchRef>,
}

/// Profile fields only. Membership changes go through the membership service.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StudentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<String>,
}

#[derive(Clone)]
pub struct StudentService {
    repo: Repository<Student>,
    clock: Arc<dyn Clock>,
}

impl StudentService {
    pub fn new(repo: Repository<Student>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn create(&self, input: StudentCreate) -> DomainResult<Student> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        let student = Student {
            id: uuid_v7_without_dashes(),
            name,
            email: input.email,
            phone: input.phone,
            grade: input.grade,
            school: input.school,
            guardian_name: input.guardian_name,
            guardian_phone: input.guardian_phone,
            created_at: format_rfc3339(self.clock.now()),
            batches: normalized_batch_ids(&input.batches)
                .into_iter()
                .map(BatchRef::Id)
                .collect(),
        };
        self.repo.create(&student).await
    }

    pub async fn get(&self, student_id: &str) -> DomainResult<Student> {
        self.repo.require(student_id).await
    }

    pub async fn update(&self, student_id: &str, patch: StudentUpdate) -> DomainResult<Student> {
        if patch
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DomainError::Validation("name cannot be empty".into()));
        }
        let fields = patch_fields(&patch)?;
        if fields.is_empty() {
            return self.get(student_id).await;
        }
        Ok(self.repo.update_fields(student_id, fields, None).await?.value)
    }

    pub async fn delete(&self, student_id: &str) -> DomainResult<()> {
        if self.repo.delete(student_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound(Student::KIND))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::InMemoryDocumentStore;
    use serde_json::json;

    #[test]
    fn batch_refs_accept_both_shapes() {
        let refs: Vec<BatchRef> = serde_json::from_value(json!([
            "b-1",
            { "id": "b-2", "name": "Chemistry" },
            { "id": "b-3" }
        ]))
        .expect("decode");
        assert_eq!(refs[0], BatchRef::Id("b-1".into()));
        assert_eq!(
            refs[1],
            BatchRef::Enriched {
                id: "b-2".into(),
                name: "Chemistry".into()
            }
        );
        assert_eq!(refs[2].id(), "b-3");
    }

    #[test]
    fn normalization_dedupes_in_order() {
        let refs = vec![
            BatchRef::Id("b-2".into()),
            BatchRef::Enriched {
                id: "b-1".into(),
                name: "Maths".into(),
            },
            BatchRef::Id("b-2".into()),
            BatchRef::Id(" ".into()),
        ];
        assert_eq!(normalized_batch_ids(&refs), vec!["b-2", "b-1"]);
    }

    #[tokio::test]
    async fn create_persists_bare_batch_ids() {
        let service = StudentService::new(
            Repository::new(Arc::new(InMemoryDocumentStore::new())),
            Arc::new(SystemClock),
        );
        let student = service
            .create(StudentCreate {
                name: "Meera".into(),
                batches: vec![
                    BatchRef::Enriched {
                        id: "b-1".into(),
                        name: "Maths".into(),
                    },
                    BatchRef::Id("b-1".into()),
                ],
                ..StudentCreate::default()
            })
            .await
            .expect("create");
        assert_eq!(student.batches, vec![BatchRef::Id("b-1".into())]);

        service.delete(&student.id).await.expect("delete");
        assert!(matches!(
            service.delete(&student.id).await,
            Err(DomainError::NotFound("student"))
        ));
    }
}
