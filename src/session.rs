use anyhow::anyhow;
use axum::{extract::{FromRef, FromRequestParts}, http::request::Parts};
use sqlx::SqlitePool;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{appresult::{AppError, AppResult}, authz::Actor, db::Identity, store::identity};

pub const USER_ID: &str = "user_id";

impl<S> FromRequestParts<S> for Actor
where
    SqlitePool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> AppResult<Self> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| anyhow!(msg))?;

        let Some(user_id) = session.get::<Uuid>(USER_ID).await? else {
            return Ok(Actor::Anonymous);
        };

        let db_pool = SqlitePool::from_ref(state);
        match identity::find(&db_pool, user_id).await? {
            Some(identity) => Ok(Actor::Identified(identity)),
            None => {
                session.remove::<Uuid>(USER_ID).await?;
                Ok(Actor::Anonymous)
            }
        }
    }
}

/// Starts an authenticated session under a fresh session id.
pub async fn log_in(session: &Session, identity: &Identity) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, identity.id).await?;
    Ok(())
}

pub async fn log_out(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}

/// Only same-site paths are followed after login or logout.
pub fn local_return_url(return_url: Option<String>) -> String {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.contains('\\') => url,
        _ => "/".to_owned(),
    }
}
