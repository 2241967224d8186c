mod directory;
mod handlers;
mod model;
mod service;
mod status;
mod store;

use axum::{routing::{get, post}, Router};

use crate::AppState;

pub use directory::Directory;
pub use model::{ChatEntry, Conversation, Counterpart, Draft, Message};
pub use service::{latest_per_counterpart, ConversationService};
pub use status::MessageStatus;
pub use store::MessageStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::send_message))
        .route("/messages/history", get(handlers::chat_history))
        .route("/messages/{job_id}/{user_id}", get(handlers::conversation))
        .route("/chats", get(handlers::chat_list))
}
