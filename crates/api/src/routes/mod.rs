mod coursework;
mod fees;
mod messages;
mod people;

use axum::extract::State;
use axum::{
    Json, Router,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{middleware as app_middleware, observability, state::AppState};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .merge(people::routes())
        .merge(coursework::routes())
        .merge(fees::routes())
        .merge(messages::routes())
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/v1", protected)
        .layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ));

    if !state.config.is_test() {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    store: &'static str,
}

async fn health(State(state): State<AppState>) -> Response {
    let (status, store) = match &state.db {
        None => (StatusCode::OK, "memory"),
        Some(db) => match db.health_check().await {
            Ok(()) => (StatusCode::OK, db.name()),
            Err(err) => {
                tracing::warn!(error = %err, adapter = db.name(), "store health check failed");
                (StatusCode::SERVICE_UNAVAILABLE, db.name())
            }
        },
    };
    let body = HealthResponse {
        status: if status.is_success() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
        store,
    };
    (status, Json(body)).into_response()
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// `?batch_id=` / `?student_id=` filter shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
struct ScopeQuery {
    batch_id: Option<String>,
    student_id: Option<String>,
}

fn created<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}
