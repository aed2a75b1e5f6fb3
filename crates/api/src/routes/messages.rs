use axum::extract::{Extension, Path, Query, State};
use axum::{
    Json, Router,
    response::Response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tutorhub_domain::{
    identity::Caller,
    messages::{Message, MessageCreate, Participant, ReplyCreate},
    notifications::{Notification, Recipient, RecipientType},
};
use validator::Validate;

use super::{ScopeQuery, created};
use crate::middleware::AuthContext;
use crate::{error::ApiError, state::AppState, validation};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(create_message).get(list_messages))
        .route("/messages/:message_id", get(get_message))
        .route("/messages/:message_id/replies", post(add_reply))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/:notification_id/seen", post(mark_seen))
}

/// Messages are authored by teachers or students only.
fn participant(caller: &Caller) -> Result<Participant, ApiError> {
    let recipient_type = caller.recipient_type().ok_or_else(|| {
        ApiError::Validation("only teachers and students can post messages".into())
    })?;
    Ok(Recipient {
        id: caller.user_id.clone(),
        recipient_type,
    })
}

#[derive(Debug, Deserialize)]
struct ReceiverRequest {
    id: String,
    #[serde(rename = "type")]
    recipient_type: RecipientType,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateMessageRequest {
    #[validate(length(min = 1, max = 200))]
    subject: String,
    #[validate(length(min = 1, max = 20000))]
    content: String,
    #[validate(length(max = 64))]
    batch_id: Option<String>,
    #[validate(length(max = 64))]
    student_id: Option<String>,
    receiver: Option<ReceiverRequest>,
    #[serde(default)]
    attachment_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateReplyRequest {
    #[validate(length(min = 1, max = 20000))]
    content: String,
    #[serde(default)]
    attachment_urls: Vec<String>,
}

async fn create_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<Response, ApiError> {
    validation::validate(&payload)?;
    let sender = participant(&auth.caller()?)?;
    let message = state
        .services
        .messages
        .create(
            sender,
            MessageCreate {
                subject: payload.subject,
                content: payload.content,
                batch_id: payload.batch_id,
                student_id: payload.student_id,
                receiver: payload.receiver.map(|receiver| Recipient {
                    id: receiver.id,
                    recipient_type: receiver.recipient_type,
                }),
                attachment_urls: payload.attachment_urls,
            },
        )
        .await?;
    Ok(created(message))
}

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state
        .services
        .messages
        .list(query.batch_id.as_deref(), query.student_id.as_deref())
        .await?;
    Ok(Json(messages))
}

async fn get_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(state.services.messages.get(&message_id).await?))
}

async fn add_reply(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(message_id): Path<String>,
    Json(payload): Json<CreateReplyRequest>,
) -> Result<Json<Message>, ApiError> {
    validation::validate(&payload)?;
    let sender = participant(&auth.caller()?)?;
    let service = &state.services.messages;
    let reply = service.new_reply(
        sender,
        ReplyCreate {
            content: payload.content,
            attachment_urls: payload.attachment_urls,
        },
    );
    Ok(Json(service.add_reply(&message_id, reply).await?))
}

#[derive(Debug, Default, Deserialize)]
struct NotificationQuery {
    #[serde(default)]
    unseen: bool,
}

#[derive(Serialize)]
struct UnreadCountResponse {
    unread: usize,
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let caller = auth.caller()?;
    let items = state
        .services
        .notifications
        .list_for_recipient(&caller.user_id, query.unseen)
        .await?;
    Ok(Json(items))
}

async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let caller = auth.caller()?;
    let unread = state
        .services
        .notifications
        .unread_count(&caller.user_id)
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Only the recipient may mark a notification seen; others get a 404.
async fn mark_seen(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(notification_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let caller = auth.caller()?;
    let notifications = &state.services.notifications;
    let notification = notifications.get(&notification_id).await?;
    if notification.recipient_id != caller.user_id {
        return Err(ApiError::NotFound("notification"));
    }
    Ok(Json(notifications.mark_seen(&notification_id).await?))
}
