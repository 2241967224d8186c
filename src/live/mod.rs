mod connection;
pub mod event;
mod rooms;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use connection::Connection;
pub use rooms::Rooms;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::live_ws))
}
