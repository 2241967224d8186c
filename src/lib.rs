pub mod appresult;
pub mod config;
pub mod db;
pub mod live;
pub mod messages;
pub mod session;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use sqlx::SqlitePool;

pub use appresult::{AppError, AppResult};

use live::Rooms;
use messages::{ConversationService, Directory, MessageStore};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub rooms: Arc<Rooms>,
    pub conversations: ConversationService,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, room_capacity: usize) -> AppState {
        let rooms = Arc::new(Rooms::new(room_capacity));
        let conversations = ConversationService::new(
            MessageStore::new(db_pool.clone()),
            Directory::new(db_pool.clone()),
            rooms.clone(),
        );

        AppState {
            db_pool,
            rooms,
            conversations,
        }
    }
}

/// All messaging routes. Callers add state and the session layer.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(db::health))
        .nest("/api", messages::router())
        .merge(live::router())
}
