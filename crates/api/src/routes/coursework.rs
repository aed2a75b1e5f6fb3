use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;
use tutorhub_domain::{
    assignments::{Assignment, AssignmentCreate, AssignmentUpdate},
    class_tests::{ClassTest, ClassTestCreate, ResultRecord, TestResult},
    notes::{Note, NoteCreate},
};
use validator::Validate;

use super::{ScopeQuery, created};
use crate::{error::ApiError, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/assignments",
            post(create_assignment).get(list_assignments),
        )
        .route(
            "/assignments/:assignment_id",
            get(get_assignment)
                .patch(update_assignment)
                .delete(delete_assignment),
        )
        .route("/notes", post(create_note).get(list_notes))
        .route("/notes/:note_id", get(get_note).delete(delete_note))
        .route("/tests", post(create_test).get(list_tests))
        .route("/tests/:test_id", get(get_test))
        .route(
            "/tests/:test_id/results",
            post(record_result).get(list_test_results),
        )
        .route("/students/:student_id/results", get(list_student_results))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateAssignmentRequest {
    #[validate(length(max = 64))]
    batch_id: Option<String>,
    #[validate(length(max = 64))]
    student_id: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    publish_date: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    submission_date: Option<String>,
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(max = 4000))]
    details: Option<String>,
    #[serde(default)]
    attachment_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateAssignmentRequest {
    #[validate(length(min = 1, max = 200))]
    title: Option<String>,
    #[validate(length(max = 4000))]
    details: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    publish_date: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    submission_date: Option<String>,
    attachment_urls: Option<Vec<String>>,
}

async fn create_assignment(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let assignment = state
        .services
        .assignments
        .create(AssignmentCreate {
            batch_id: payload.batch_id,
            student_id: payload.student_id,
            publish_date: payload.publish_date,
            submission_date: payload.submission_date,
            title: payload.title,
            details: payload.details,
            attachment_urls: payload.attachment_urls,
        })
        .await?;
    Ok(created(assignment))
}

async fn list_assignments(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    let assignments = state
        .services
        .assignments
        .list(query.batch_id.as_deref(), query.student_id.as_deref())
        .await?;
    Ok(Json(assignments))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> Result<Json<Assignment>, ApiError> {
    Ok(Json(state.services.assignments.get(&assignment_id).await?))
}

async fn update_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> Result<Json<Assignment>, ApiError> {
    validation::validate(&payload)?;
    let assignment = state
        .services
        .assignments
        .update(
            &assignment_id,
            AssignmentUpdate {
                title: payload.title,
                details: payload.details,
                publish_date: payload.publish_date,
                submission_date: payload.submission_date,
                attachment_urls: payload.attachment_urls,
            },
        )
        .await?;
    Ok(Json(assignment))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.assignments.delete(&assignment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
struct CreateNoteRequest {
    #[validate(length(max = 64))]
    batch_id: Option<String>,
    #[validate(length(max = 64))]
    student_id: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    publish_date: Option<String>,
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(max = 20000))]
    content: Option<String>,
    #[serde(default)]
    list_urls: Vec<String>,
}

async fn create_note(
    State(state): State<AppState>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let note = state
        .services
        .notes
        .create(NoteCreate {
            batch_id: payload.batch_id,
            student_id: payload.student_id,
            publish_date: payload.publish_date,
            title: payload.title,
            content: payload.content,
            list_urls: payload.list_urls,
        })
        .await?;
    Ok(created(note))
}

async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = state
        .services
        .notes
        .list(query.batch_id.as_deref(), query.student_id.as_deref())
        .await?;
    Ok(Json(notes))
}

async fn get_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    Ok(Json(state.services.notes.get(&note_id).await?))
}

async fn delete_note(
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.notes.delete(&note_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTestRequest {
    #[validate(length(min = 1, max = 64))]
    batch_id: String,
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(max = 120))]
    subject: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    test_date: String,
    #[validate(range(exclusive_min = 0.0))]
    total_marks: f64,
    #[validate(length(max = 4000))]
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TestListQuery {
    batch_id: String,
}

#[derive(Debug, Deserialize, Validate)]
struct RecordResultRequest {
    #[validate(length(min = 1, max = 64))]
    student_id: String,
    #[validate(range(min = 0.0))]
    marks_obtained: f64,
    #[validate(length(max = 1000))]
    remarks: Option<String>,
}

async fn create_test(
    State(state): State<AppState>,
    Json(payload): Json<CreateTestRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    state.services.batches.get(&payload.batch_id).await?;
    let test = state
        .services
        .tests
        .create(ClassTestCreate {
            batch_id: payload.batch_id,
            title: payload.title,
            subject: payload.subject,
            test_date: payload.test_date,
            total_marks: payload.total_marks,
            details: payload.details,
        })
        .await?;
    Ok(created(test))
}

async fn list_tests(
    State(state): State<AppState>,
    Query(query): Query<TestListQuery>,
) -> Result<Json<Vec<ClassTest>>, ApiError> {
    Ok(Json(
        state.services.tests.list_by_batch(&query.batch_id).await?,
    ))
}

async fn get_test(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<ClassTest>, ApiError> {
    Ok(Json(state.services.tests.get(&test_id).await?))
}

async fn record_result(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
    Json(payload): Json<RecordResultRequest>,
) -> Result<Json<TestResult>, ApiError> {
    validation::validate(&payload)?;
    let result = state
        .services
        .tests
        .record_result(
            &test_id,
            ResultRecord {
                student_id: payload.student_id,
                marks_obtained: payload.marks_obtained,
                remarks: payload.remarks,
            },
        )
        .await?;
    Ok(Json(result))
}

async fn list_test_results(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<Vec<TestResult>>, ApiError> {
    Ok(Json(state.services.tests.results_for_test(&test_id).await?))
}

async fn list_student_results(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<TestResult>>, ApiError> {
    state.services.students.get(&student_id).await?;
    Ok(Json(
        state
            .services
            .tests
            .results_for_student(&student_id)
            .await?,
    ))
}
