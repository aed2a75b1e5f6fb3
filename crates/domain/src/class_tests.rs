use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::clock::Clock;
use crate::error::DomainError;
use crate::ports::store::ScanFilter;
use crate::repository::{Document, Repository};
use crate::util::{format_rfc3339, uuid_v7_without_dashes};

/// A scheduled test for one batch. Named to avoid clashing with `#[test]`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassTest {
    pub id: String,
    pub batch_id: String,
    pub title: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub test_date: String,
    pub total_marks: f64,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Document for ClassTest {
    const COLLECTION: &'static str = "tests";
    const KIND: &'static str = "test";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub id: String,
    pub test_id: String,
    pub student_id: String,
    pub marks_obtained: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    pub recorded_at: String,
}

impl Document for TestResult {
    const COLLECTION: &'static str = "test_results";
    const KIND: &'static str = "test result";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn test_result_id(test_id: &str, student_id: &str) -> String {
    format!("{test_id}_{student_id}")
}

#[derive(Clone, Debug, Default)]
pub struct ClassTestCreate {
    pub batch_id: String,
    pub title: String,
    pub subject: Option<String>,
    pub test_date: String,
    pub total_marks: f64,
    pub details: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ResultRecord {
    pub student_id: String,
    pub marks_obtained: f64,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct ClassTestService {
    tests: Repository<ClassTest>,
    results: Repository<TestResult>,
    clock: Arc<dyn Clock>,
}

impl ClassTestService {
    pub fn new(
        tests: Repository<ClassTest>,
        results: Repository<TestResult>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tests,
            results,
            clock,
        }
    }

    pub async fn create(&self, input: ClassTestCreate) -> DomainResult<ClassTest> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::Validation("title is required".into()));
        }
        if input.batch_id.trim().is_empty() {
            return Err(DomainError::Validation("batch_id is required".into()));
        }
        if !input.total_marks.is_finite() || input.total_marks <= 0.0 {
            return Err(DomainError::Validation(
                "total_marks must be positive".into(),
            ));
        }
        let test = ClassTest {
            id: uuid_v7_without_dashes(),
            batch_id: input.batch_id.trim().to_string(),
            title,
            subject: input.subject,
            test_date: input.test_date,
            total_marks: input.total_marks,
            details: input.details,
            created_at: format_rfc3339(self.clock.now()),
        };
        self.tests.create(&test).await
    }

    pub async fn get(&self, test_id: &str) -> DomainResult<ClassTest> {
        self.tests.require(test_id).await
    }

    pub async fn list_by_batch(&self, batch_id: &str) -> DomainResult<Vec<ClassTest>> {
        let mut tests = self
            .tests
            .scan(&ScanFilter::all().eq("batch_id", batch_id))
            .await?;
        tests.sort_by(|left, right| right.test_date.cmp(&left.test_date));
        Ok(tests)
    }

    /// Re-recording a student's result replaces the previous one.
    pub async fn record_result(
        &self,
        test_id: &str,
        input: ResultRecord,
    ) -> DomainResult<TestResult> {
        let test = self.get(test_id).await?;
        let student_id = input.student_id.trim();
        if student_id.is_empty() {
            return Err(DomainError::Validation("student_id is required".into()));
        }
        if !input.marks_obtained.is_finite()
            || input.marks_obtained < 0.0
            || input.marks_obtained > test.total_marks
        {
            return Err(DomainError::Validation(format!(
                "marks_obtained must be between 0 and {}",
                test.total_marks
            )));
        }
        let result = TestResult {
            id: test_result_id(&test.id, student_id),
            test_id: test.id.clone(),
            student_id: student_id.to_string(),
            marks_obtained: input.marks_obtained,
            remarks: input.remarks,
            recorded_at: format_rfc3339(self.clock.now()),
        };
        let result = self.results.put(&result).await?;
        tracing::info!(test_id, student_id, "test result recorded");
        Ok(result)
    }

    pub async fn results_for_test(&self, test_id: &str) -> DomainResult<Vec<TestResult>> {
        self.get(test_id).await?;
        let mut results = self
            .results
            .scan(&ScanFilter::all().eq("test_id", test_id))
            .await?;
        results.sort_by(|left, right| left.student_id.cmp(&right.student_id));
        Ok(results)
    }

    pub async fn results_for_student(&self, student_id: &str) -> DomainResult<Vec<TestResult>> {
        let mut results = self
            .results
            .scan(&ScanFilter::all().eq("student_id", student_id))
            .await?;
        results.sort_by(|left, right| right.recorded_at.cmp(&left.recorded_at));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::InMemoryDocumentStore;

    fn service() -> ClassTestService {
        let store = Arc::new(InMemoryDocumentStore::new());
        ClassTestService::new(
            Repository::new(store.clone()),
            Repository::new(store),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn recording_twice_overwrites_the_result() {
        let service = service();
        let test = service
            .create(ClassTestCreate {
                batch_id: "b-1".into(),
                title: "Unit test 1".into(),
                test_date: "2026-10-20".into(),
                total_marks: 50.0,
                ..ClassTestCreate::default()
            })
            .await
            .expect("create");

        for marks in [31.0, 42.0] {
            service
                .record_result(
                    &test.id,
                    ResultRecord {
                        student_id: "s-1".into(),
                        marks_obtained: marks,
                        remarks: None,
                    },
                )
                .await
                .expect("record");
        }

        let results = service.results_for_test(&test.id).await.expect("results");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].marks_obtained, 42.0);
        assert_eq!(results[0].id, test_result_id(&test.id, "s-1"));
    }

    #[tokio::test]
    async fn marks_above_total_are_rejected() {
        let service = service();
        let test = service
            .create(ClassTestCreate {
                batch_id: "b-1".into(),
                title: "Quiz".into(),
                test_date: "2026-10-20".into(),
                total_marks: 10.0,
                ..ClassTestCreate::default()
            })
            .await
            .expect("create");
        let err = service
            .record_result(
                &test.id,
                ResultRecord {
                    student_id: "s-1".into(),
                    marks_obtained: 11.0,
                    remarks: None,
                },
            )
            .await
            .expect_err("too many marks");
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
