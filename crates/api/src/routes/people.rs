use axum::extract::{Path, State};
use axum::{
    Json, Router,
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
};
use serde::Deserialize;
use tutorhub_domain::{
    batches::{Batch, BatchCreate, BatchUpdate, PaymentFrequency},
    membership::BatchSummary,
    students::{BatchRef, Student, StudentCreate, StudentUpdate},
    teachers::{Teacher, TeacherCreate, TeacherUpdate},
};
use validator::Validate;

use super::created;
use crate::{error::ApiError, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/teachers", post(create_teacher))
        .route("/teachers/:teacher_id", get(get_teacher).patch(update_teacher))
        .route("/teachers/:teacher_id/batches", get(list_teacher_batches))
        .route("/students", post(create_student))
        .route(
            "/students/:student_id",
            get(get_student).patch(update_student).delete(delete_student),
        )
        .route(
            "/students/:student_id/batches",
            get(list_student_batches).post(add_student_to_batch),
        )
        .route(
            "/students/:student_id/batches/:batch_id",
            delete(remove_student_from_batch),
        )
        .route("/batches", post(create_batch))
        .route("/batches/:batch_id", get(get_batch).patch(update_batch))
        .route("/batches/:batch_id/students", get(list_batch_students))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTeacherRequest {
    #[validate(length(min = 1, max = 120))]
    name: String,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(max = 32))]
    phone: Option<String>,
    #[serde(default)]
    subjects: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateTeacherRequest {
    #[validate(length(min = 1, max = 120))]
    name: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(max = 32))]
    phone: Option<String>,
    subjects: Option<Vec<String>>,
}

async fn create_teacher(
    State(state): State<AppState>,
    Json(payload): Json<CreateTeacherRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let teacher = state
        .services
        .teachers
        .create(TeacherCreate {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            subjects: payload.subjects,
        })
        .await?;
    Ok(created(teacher))
}

async fn get_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<Teacher>, ApiError> {
    Ok(Json(state.services.teachers.get(&teacher_id).await?))
}

async fn update_teacher(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
    Json(payload): Json<UpdateTeacherRequest>,
) -> Result<Json<Teacher>, ApiError> {
    validation::validate(&payload)?;
    let teacher = state
        .services
        .teachers
        .update(
            &teacher_id,
            TeacherUpdate {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                subjects: payload.subjects,
            },
        )
        .await?;
    Ok(Json(teacher))
}

async fn list_teacher_batches(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    state.services.teachers.get(&teacher_id).await?;
    Ok(Json(
        state.services.batches.list_by_teacher(&teacher_id).await?,
    ))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateStudentRequest {
    #[validate(length(min = 1, max = 120))]
    name: String,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(max = 32))]
    phone: Option<String>,
    #[validate(length(max = 32))]
    grade: Option<String>,
    #[validate(length(max = 120))]
    school: Option<String>,
    #[validate(length(max = 120))]
    guardian_name: Option<String>,
    #[validate(length(max = 32))]
    guardian_phone: Option<String>,
    #[serde(default)]
    batches: Vec<BatchRef>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 120))]
    name: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(max = 32))]
    phone: Option<String>,
    #[validate(length(max = 32))]
    grade: Option<String>,
    #[validate(length(max = 120))]
    school: Option<String>,
    #[validate(length(max = 120))]
    guardian_name: Option<String>,
    #[validate(length(max = 32))]
    guardian_phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct AddToBatchRequest {
    #[validate(length(min = 1, max = 64))]
    batch_id: String,
}

async fn create_student(
    State(state): State<AppState>,
    Json(payload): Json<CreateStudentRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let student = state
        .services
        .students
        .create(StudentCreate {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            grade: payload.grade,
            school: payload.school,
            guardian_name: payload.guardian_name,
            guardian_phone: payload.guardian_phone,
            batches: payload.batches,
        })
        .await?;
    Ok(created(student))
}

async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Student>, ApiError> {
    let student = state.services.students.get(&student_id).await?;
    let enriched = state
        .services
        .membership
        .enrich_students(vec![student])
        .await?;
    enriched
        .into_iter()
        .next()
        .map(Json)
        .ok_or(ApiError::Internal)
}

async fn update_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(payload): Json<UpdateStudentRequest>,
) -> Result<Json<Student>, ApiError> {
    validation::validate(&payload)?;
    let student = state
        .services
        .students
        .update(
            &student_id,
            StudentUpdate {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                grade: payload.grade,
                school: payload.school,
                guardian_name: payload.guardian_name,
                guardian_phone: payload.guardian_phone,
            },
        )
        .await?;
    Ok(Json(student))
}

async fn delete_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.students.delete(&student_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_student_batches(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<BatchSummary>>, ApiError> {
    Ok(Json(
        state
            .services
            .membership
            .batches_for_student(&student_id)
            .await?,
    ))
}

async fn add_student_to_batch(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(payload): Json<AddToBatchRequest>,
) -> Result<Json<Student>, ApiError> {
    validation::validate(&payload)?;
    state.services.batches.get(&payload.batch_id).await?;
    let student = state
        .services
        .membership
        .add_student_to_batch(&student_id, &payload.batch_id)
        .await?;
    Ok(Json(student))
}

async fn remove_student_from_batch(
    State(state): State<AppState>,
    Path((student_id, batch_id)): Path<(String, String)>,
) -> Result<Json<Student>, ApiError> {
    let student = state
        .services
        .membership
        .remove_student_from_batch(&student_id, &batch_id)
        .await?;
    Ok(Json(student))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateBatchRequest {
    #[validate(length(min = 1, max = 64))]
    teacher_id: String,
    #[validate(length(min = 1, max = 120))]
    name: String,
    #[validate(length(max = 120))]
    subject: Option<String>,
    #[validate(range(min = 0.0))]
    payment_amount: Option<f64>,
    payment_frequency: Option<PaymentFrequency>,
    #[validate(range(min = 1, max = 31))]
    payment_day_of_month: Option<u8>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateBatchRequest {
    #[validate(length(min = 1, max = 120))]
    name: Option<String>,
    #[validate(length(max = 120))]
    subject: Option<String>,
    #[validate(range(min = 0.0))]
    payment_amount: Option<f64>,
    payment_frequency: Option<PaymentFrequency>,
    #[validate(range(min = 1, max = 31))]
    payment_day_of_month: Option<u8>,
}

async fn create_batch(
    State(state): State<AppState>,
    Json(payload): Json<CreateBatchRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    state.services.teachers.get(&payload.teacher_id).await?;
    let batch = state
        .services
        .batches
        .create(BatchCreate {
            teacher_id: payload.teacher_id,
            name: payload.name,
            subject: payload.subject,
            payment_amount: payload.payment_amount,
            payment_frequency: payload.payment_frequency,
            payment_day_of_month: payload.payment_day_of_month,
        })
        .await?;
    Ok(created(batch))
}

async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Batch>, ApiError> {
    Ok(Json(state.services.batches.get(&batch_id).await?))
}

async fn update_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Json(payload): Json<UpdateBatchRequest>,
) -> Result<Json<Batch>, ApiError> {
    validation::validate(&payload)?;
    let batch = state
        .services
        .batches
        .update(
            &batch_id,
            BatchUpdate {
                name: payload.name,
                subject: payload.subject,
                payment_amount: payload.payment_amount,
                payment_frequency: payload.payment_frequency,
                payment_day_of_month: payload.payment_day_of_month,
            },
        )
        .await?;
    Ok(Json(batch))
}

async fn list_batch_students(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Vec<Student>>, ApiError> {
    state.services.batches.get(&batch_id).await?;
    Ok(Json(
        state.services.membership.students_by_batch(&batch_id).await?,
    ))
}
