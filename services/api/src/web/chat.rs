//! services/api/src/web/chat.rs
//!
//! Chat endpoints: the active conversation, sending messages, and history.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use moodigo_core::domain::{NewMessage, Sender, UserSession};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::web::protocol::{
    ChatView, ConversationDetail, HistoryPage, HistoryQuery, SendMessageRequest,
    SendMessageResponse,
};
use crate::web::state::AppState;

/// How many messages the chat view shows.
pub const CHAT_MESSAGE_LIMIT: i64 = 50;
pub const HISTORY_PAGE_SIZE: i64 = 10;

/// Out-of-range pages land on the last page; unparsable ones on the first.
fn resolve_page(requested: Option<&str>, num_pages: i64) -> i64 {
    match requested.map(|p| p.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(page)) if page < 1 || page > num_pages => num_pages,
        Some(Ok(page)) => page,
    }
}

/// Get the active conversation, starting one if needed.
#[utoipa::path(
    get,
    path = "/chat",
    responses(
        (status = 200, description = "The active conversation", body = ChatView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<Json<ChatView>, ApiError> {
    let conversation = state
        .db
        .get_or_create_active_conversation(session.id)
        .await?;
    let messages = state
        .db
        .list_messages(conversation.id, Some(CHAT_MESSAGE_LIMIT))
        .await?;

    Ok(Json(ChatView {
        conversation: conversation.into(),
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

/// Send a chat message and receive the bot's reply.
///
/// The body is parsed by hand so that malformed JSON is reported as
/// `{"error": ...}` like every other failure.
#[utoipa::path(
    post,
    path = "/send-message",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "The bot replied", body = SendMessageResponse),
        (status = 400, description = "Empty message"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    body: Bytes,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let request: SendMessageRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("Rejected malformed chat payload: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    let content = request.message.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty".to_string()));
    }

    // 1. Store the visitor's message
    let conversation = state
        .db
        .get_or_create_active_conversation(session.id)
        .await?;
    state
        .db
        .save_message(NewMessage::from_user(conversation.id, content))
        .await?;

    // 2. Classify and reply
    let analysis = state.analyzer.analyze_message(content);
    let bot_message = state
        .db
        .save_message(NewMessage {
            conversation_id: conversation.id,
            sender: Sender::Bot,
            content: analysis.response.clone(),
            predicted_condition: analysis.prediction,
            confidence_score: Some(analysis.confidence),
        })
        .await?;

    // 3. Remember that this visitor needed crisis support
    if analysis.is_crisis {
        info!("Crisis detected in session {}", session.id);
        state.db.set_crisis_mode(session.id).await.map_err(|e| {
            error!("Failed to enable crisis mode: {:?}", e);
            e
        })?;
    }

    Ok(Json(SendMessageResponse {
        bot_response: analysis.response,
        prediction: analysis.prediction.map(|c| c.label().to_string()),
        confidence: analysis.confidence,
        is_crisis: analysis.is_crisis,
        timestamp: bot_message.timestamp.format("%H:%M").to_string(),
    }))
}

/// Close the active conversation; the next chat starts a fresh one.
#[utoipa::path(
    post,
    path = "/new-conversation",
    responses(
        (status = 204, description = "Active conversations closed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn new_conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.deactivate_conversations(session.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the visitor's conversations, newest first.
#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "One page of conversations", body = HistoryPage),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, ApiError> {
    let total = state.db.count_conversations(session.id).await?;
    let num_pages = ((total + HISTORY_PAGE_SIZE - 1) / HISTORY_PAGE_SIZE).max(1);
    let page = resolve_page(query.page.as_deref(), num_pages);

    let conversations = state
        .db
        .list_conversations(session.id, HISTORY_PAGE_SIZE, (page - 1) * HISTORY_PAGE_SIZE)
        .await?;

    Ok(Json(HistoryPage {
        conversations: conversations.into_iter().map(Into::into).collect(),
        page,
        num_pages,
        total,
        has_previous: page > 1,
        has_next: page < num_pages,
    }))
}

/// Show one of the visitor's conversations with every message.
#[utoipa::path(
    get,
    path = "/conversation/{id}",
    params(("id" = i64, Path, description = "The conversation ID")),
    responses(
        (status = 200, description = "The conversation", body = ConversationDetail),
        (status = 404, description = "No such conversation for this visitor"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn conversation_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<ConversationDetail>, ApiError> {
    let conversation = state.db.get_conversation(session.id, conversation_id).await?;
    let messages = state.db.list_messages(conversation.id, None).await?;

    Ok(Json(ConversationDetail {
        conversation: conversation.into(),
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_resolution_matches_paginator_rules() {
        assert_eq!(resolve_page(None, 3), 1);
        assert_eq!(resolve_page(Some("abc"), 3), 1);
        assert_eq!(resolve_page(Some("2"), 3), 2);
        assert_eq!(resolve_page(Some("9"), 3), 3);
        assert_eq!(resolve_page(Some("0"), 3), 3);
        assert_eq!(resolve_page(Some("1"), 1), 1);
    }
}
