use std::fmt;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppError, AppResult};

pub const USER_ID: &str = "user_id";
pub const ROLE: &str = "role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Freelancer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Role::*;
        match self {
            Client => write!(f, "client"),
            Freelancer => write!(f, "freelancer"),
        }
    }
}

/// Verified identity of whoever is making the current request.
///
/// Populated by the login flow through [`sign_in`]; the messaging core only
/// ever reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    /// Rejects a payload that claims to act for someone else.
    pub fn ensure_is(&self, claimed: Uuid) -> AppResult<()> {
        if claimed != self.user_id {
            return Err(AppError::not_authorized(format!(
                "u/{} cannot act as u/{claimed}",
                self.user_id
            )));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::not_authorized(msg))?;

        let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
            return Err(AppError::not_authorized("login required"));
        };
        let Some(role) = session.get::<Role>(ROLE).await? else {
            return Err(AppError::not_authorized("session carries no role"));
        };

        Ok(Caller { user_id, role })
    }
}

pub async fn sign_in(session: &Session, caller: Caller) -> AppResult<()> {
    session.insert(USER_ID, caller.user_id).await?;
    session.insert(ROLE, caller.role).await?;
    tracing::info!(user_id = %caller.user_id, role = %caller.role, "signed in");
    Ok(())
}

pub async fn sign_out(session: &Session) {
    session.clear().await;
}
