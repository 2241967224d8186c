use axum::{
    debug_handler,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{session::Caller, AppError, AppResult, AppState};

use super::{ConversationService, Draft};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SendMessageBody {
    job_id: Option<Uuid>,
    receiver_id: Option<Uuid>,
    body: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    State(conversations): State<ConversationService>,
    caller: Caller,
    payload: Result<Json<SendMessageBody>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let Json(SendMessageBody { job_id, receiver_id, body }) =
        payload.map_err(|rejection| AppError::validation(rejection.body_text()))?;

    let draft = Draft {
        job_id,
        sender_id: Some(caller.user_id),
        receiver_id,
        body,
    };
    let message = conversations.send_message(caller.user_id, draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Message sent successfully",
            "data": message,
        })),
    ))
}

#[debug_handler(state = AppState)]
pub(crate) async fn conversation(
    State(conversations): State<ConversationService>,
    caller: Caller,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> AppResult<Json<Value>> {
    let Path((job_id, other_user_id)) =
        path.map_err(|rejection| AppError::validation(rejection.body_text()))?;
    let conversation = conversations
        .get_conversation(job_id, caller.user_id, other_user_id)
        .await?;
    let other_user = conversations.directory().resolve(other_user_id).await?;

    Ok(Json(json!({
        "success": true,
        "participants": {
            "currentUser": caller.user_id,
            "otherUser": other_user,
        },
        "messages": conversation.messages,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryQuery {
    job_id: Option<Uuid>,
    user_id: Option<Uuid>,
    other_user_id: Option<Uuid>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat_history(
    State(conversations): State<ConversationService>,
    caller: Caller,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let Query(HistoryQuery { job_id, user_id, other_user_id }) =
        query.map_err(|rejection| AppError::validation(rejection.body_text()))?;

    let (Some(job_id), Some(user_id), Some(other_user_id)) = (job_id, user_id, other_user_id) else {
        return Err(AppError::validation("jobId, userId and otherUserId are required"));
    };
    caller.ensure_is(user_id)?;

    let conversation = conversations.get_conversation(job_id, user_id, other_user_id).await?;

    Ok(Json(json!({
        "success": true,
        "messages": conversation.messages,
    })))
}

#[debug_handler(state = AppState)]
pub(crate) async fn chat_list(
    State(conversations): State<ConversationService>,
    caller: Caller,
) -> AppResult<Json<Value>> {
    let chats = conversations.get_chat_list(caller.user_id).await?;
    tracing::debug!(
        user_id = %caller.user_id,
        role = %caller.role,
        chats = chats.len(),
        "chat list"
    );

    Ok(Json(json!({
        "success": true,
        "totalChats": chats.len(),
        "chats": chats,
    })))
}
