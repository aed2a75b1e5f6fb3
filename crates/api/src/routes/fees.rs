use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tutorhub_domain::fees::{FeeCreate, FeeQuery, FeeRecord, FeeRunReport};
use validator::Validate;

use crate::{error::ApiError, observability, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/fees", post(create_fees).get(list_fees))
        .route("/fees/generate", post(generate_fees))
        .route("/fees/:fee_id", get(get_fee))
        .route("/fees/:fee_id/pay", post(mark_paid))
        .route("/fees/:fee_id/acknowledge", post(acknowledge))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateFeeRequest {
    #[validate(length(max = 64))]
    batch_id: Option<String>,
    #[validate(length(max = 64))]
    student_id: Option<String>,
    #[validate(custom(function = "validation::month"))]
    month: Option<String>,
    #[validate(range(min = 0.0))]
    amount: Option<f64>,
    #[validate(custom(function = "validation::calendar_date"))]
    due_date: Option<String>,
    #[validate(custom(function = "validation::calendar_date"))]
    payment_date: Option<String>,
    #[validate(length(max = 1000))]
    notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct FeeListQuery {
    #[validate(length(max = 64))]
    batch_id: Option<String>,
    #[validate(length(max = 64))]
    student_id: Option<String>,
    #[validate(custom(function = "validation::month"))]
    month: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
struct MarkPaidRequest {
    #[validate(custom(function = "validation::calendar_date"))]
    payment_date: Option<String>,
}

/// Responds 201 when at least one record was written, 200 when every
/// target already had a record for the month.
async fn create_fees(
    State(state): State<AppState>,
    Json(payload): Json<CreateFeeRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let report = state
        .services
        .fees
        .create(FeeCreate {
            batch_id: payload.batch_id,
            student_id: payload.student_id,
            month: payload.month,
            amount: payload.amount,
            due_date: payload.due_date,
            payment_date: payload.payment_date,
            notes: payload.notes,
        })
        .await?;
    let status = if report.created.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(report)).into_response())
}

async fn list_fees(
    State(state): State<AppState>,
    Query(query): Query<FeeListQuery>,
) -> Result<Json<Vec<FeeRecord>>, ApiError> {
    validation::validate(&query)?;
    let records = state
        .services
        .fees
        .list(&FeeQuery {
            batch_id: query.batch_id,
            student_id: query.student_id,
            month: query.month,
        })
        .await?;
    Ok(Json(records))
}

async fn generate_fees(State(state): State<AppState>) -> Json<FeeRunReport> {
    let report = state.services.fee_generator.generate().await;
    observability::register_fee_run(&report);
    Json(report)
}

async fn get_fee(
    State(state): State<AppState>,
    Path(fee_id): Path<String>,
) -> Result<Json<FeeRecord>, ApiError> {
    Ok(Json(state.services.fees.get(&fee_id).await?))
}

async fn mark_paid(
    State(state): State<AppState>,
    Path(fee_id): Path<String>,
    payload: Option<Json<MarkPaidRequest>>,
) -> Result<Json<FeeRecord>, ApiError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    validation::validate(&payload)?;
    let record = state
        .services
        .fees
        .mark_paid(&fee_id, payload.payment_date)
        .await?;
    Ok(Json(record))
}

async fn acknowledge(
    State(state): State<AppState>,
    Path(fee_id): Path<String>,
) -> Result<Json<FeeRecord>, ApiError> {
    Ok(Json(state.services.fees.acknowledge(&fee_id).await?))
}
