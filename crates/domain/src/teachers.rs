use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::repository::{Document, Repository, patch_fields};
use crate::util::{format_rfc3339, uuid_v7_without_dashes};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Document for Teacher {
    const COLLECTION: &'static str = "teachers";
    const KIND: &'static str = "teacher";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug)]
pub struct TeacherCreate {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subjects: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TeacherUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct TeacherService {
    repo: Repository<Teacher>,
    clock: Arc<dyn Clock>,
}

impl TeacherService {
    pub fn new(repo: Repository<Teacher>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn create(&self, input: TeacherCreate) -> DomainResult<Teacher> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::Validation("name is required".into()));
        }
        let teacher = Teacher {
            id: uuid_v7_without_dashes(),
            name,
            email: input.email,
            phone: input.phone,
            subjects: input.subjects,
            created_at: format_rfc3339(self.clock.now()),
        };
        self.repo.create(&teacher).await
    }

    pub async fn get(&self, teacher_id: &str) -> DomainResult<Teacher> {
        self.repo.require(teacher_id).await
    }

    pub async fn update(&self, teacher_id: &str, patch: TeacherUpdate) -> DomainResult<Teacher> {
        if patch
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DomainError::Validation("name cannot be empty".into()));
        }
        let fields = patch_fields(&patch)?;
        if fields.is_empty() {
            return self.get(teacher_id).await;
        }
        Ok(self.repo.update_fields(teacher_id, fields, None).await?.value)
    }
}
