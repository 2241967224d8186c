#![allow(dead_code)]

use axum::{
    body::Body,
    extract::Path,
    http::{header, Request, StatusCode},
    routing::post,
    Router,
};
use jobchat::{
    db,
    session::{sign_in, sign_out, Caller, Role},
    AppResult, AppState,
};
use sqlx::SqlitePool;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

/// Fresh in-memory database. A single connection keeps every query on the
/// same database.
pub async fn pool() -> SqlitePool {
    let db_pool = db::connect("sqlite::memory:", 1).await.expect("connect sqlite");
    db::migrate(&db_pool).await.expect("migrate");
    db_pool
}

pub async fn state() -> AppState {
    AppState::new(pool().await, 16)
}

pub async fn add_profile(db_pool: &SqlitePool, name: &str, role: &str) -> Uuid {
    let user_id = Uuid::now_v7();
    sqlx::query("INSERT INTO profiles (user_id,name,email,role) VALUES (?,?,?,?)")
        .bind(user_id.to_string())
        .bind(name)
        .bind(format!("{}@example.com", name.to_lowercase()))
        .bind(role)
        .execute(db_pool)
        .await
        .expect("insert profile");
    user_id
}

// stands in for the account system's login and logout flows
async fn login(
    Path((user_id, role)): Path<(Uuid, Role)>,
    session: Session,
) -> AppResult<StatusCode> {
    sign_in(&session, Caller { user_id, role }).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn logout(session: Session) -> StatusCode {
    sign_out(&session).await;
    StatusCode::NO_CONTENT
}

pub fn app(state: AppState) -> Router {
    jobchat::router()
        .route("/test/login/{user_id}/{role}", post(login))
        .route("/test/logout", post(logout))
        .with_state(state)
        .layer(SessionManagerLayer::new(MemoryStore::default()))
}

/// Signs `user_id` in and returns the `name=value` pair of its session cookie.
pub async fn cookie_for(app: &Router, user_id: Uuid, role: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/test/login/{user_id}/{role}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_owned()
}
