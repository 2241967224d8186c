use axum::{
    debug_handler,
    extract::{ws::{Message as WsMessage, WebSocket}, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::{messages::ConversationService, session::Caller, AppError};

use super::{event::ClientEvent, Connection};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn live_ws(
    State(conversations): State<ConversationService>,
    caller: Caller,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve(stream, caller, conversations))
}

async fn serve(stream: WebSocket, caller: Caller, conversations: ConversationService) {
    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::channel(conversations.rooms().capacity());

    let mut write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "cannot encode live event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    tracing::info!(user_id = %caller.user_id, "live connection opened");
    let mut conn = Connection::new(caller, tx);

    loop {
        tokio::select! {
            _ = &mut write_task => break,
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else { break };
                match frame {
                    WsMessage::Text(text) => {
                        match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(event) => conn.handle(&conversations, event).await,
                            Err(err) => {
                                let err = AppError::validation(format!("malformed frame: {err}"));
                                conn.reject(None, err);
                            }
                        }
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
        }
    }

    conn.close().await;
    write_task.abort();
    conversations.rooms().prune();
    tracing::info!(user_id = %caller.user_id, "live connection closed");
}
