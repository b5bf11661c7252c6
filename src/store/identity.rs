use serde::Deserialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    appresult::{AppError, AppResult},
    auth::password,
    authz::Actor,
    db::Identity,
};

const USERNAME_MAX: usize = 150;
const AVATAR_MAX: usize = 500;
const TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Registration {
    pub username: String,
    pub password1: String,
    pub password2: String,
    pub avatar: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub username: String,
    pub avatar: String,
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::invalid("Enter a username."));
    }
    if username.chars().count() > USERNAME_MAX {
        return Err(AppError::invalid(format!(
            "Usernames have at most {USERNAME_MAX} characters."
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(AppError::invalid(
            "Usernames may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    Ok(())
}

fn check_avatar(raw: &str) -> AppResult<Option<String>> {
    let avatar = raw.trim();
    if avatar.is_empty() {
        return Ok(None);
    }

    let linkable = avatar.starts_with("https://")
        || avatar.starts_with("http://")
        || (avatar.starts_with('/') && !avatar.starts_with("//"));
    if !linkable || avatar.len() > AVATAR_MAX {
        return Err(AppError::invalid("Avatar must be an http(s) URL or a site path."));
    }
    Ok(Some(avatar.to_owned()))
}

async fn username_taken(db_pool: &SqlitePool, username: &str, except: Option<Uuid>) -> AppResult<bool> {
    let owner: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM identities WHERE username=?")
        .bind(username)
        .fetch_optional(db_pool)
        .await?;
    Ok(owner.is_some_and(|(id,)| Some(id) != except))
}

fn username_conflict(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::invalid(TAKEN),
        _ => err.into(),
    }
}

pub async fn register(db_pool: &SqlitePool, form: &Registration) -> AppResult<Identity> {
    let username = normalize_username(&form.username);
    check_username(&username)?;
    if username_taken(db_pool, &username, None).await? {
        return Err(AppError::invalid(TAKEN));
    }
    if form.password1 != form.password2 {
        return Err(AppError::invalid("The two password fields didn't match."));
    }
    password::check_policy(&form.password1, &username)?;
    let avatar = check_avatar(&form.avatar)?;

    let identity = Identity {
        id: Uuid::now_v7(),
        username,
        avatar,
        created: OffsetDateTime::now_utc(),
    };
    let password_hash = password::hash(&form.password1)?;

    sqlx::query("INSERT INTO identities (id,username,password_hash,avatar,created) VALUES (?,?,?,?,?)")
        .bind(identity.id)
        .bind(&identity.username)
        .bind(password_hash)
        .bind(&identity.avatar)
        .bind(identity.created)
        .execute(db_pool)
        .await
        .map_err(username_conflict)?;

    info!("registered @{}#{}", identity.username, identity.id);
    Ok(identity)
}

/// Resolves a username/password pair. Unknown users and wrong passwords fail the same way.
pub async fn authenticate(db_pool: &SqlitePool, username: &str, password: &str) -> AppResult<Identity> {
    let username = normalize_username(username);

    let Some((id, password_hash)): Option<(Uuid, String)> =
        sqlx::query_as("SELECT id,password_hash FROM identities WHERE username=?")
            .bind(&username)
            .fetch_optional(db_pool)
            .await?
    else {
        warn!("failed login for @{username}: no such user");
        return Err(AppError::InvalidCredentials);
    };

    if !password::verify(password, &password_hash)? {
        warn!("failed login for @{username}: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    get(db_pool, id).await
}

pub async fn find(db_pool: &SqlitePool, id: Uuid) -> AppResult<Option<Identity>> {
    Ok(
        sqlx::query_as("SELECT id,username,avatar,created FROM identities WHERE id=?")
            .bind(id)
            .fetch_optional(db_pool)
            .await?
    )
}

pub async fn get(db_pool: &SqlitePool, id: Uuid) -> AppResult<Identity> {
    find(db_pool, id).await?.ok_or(AppError::NotFound("user"))
}

pub async fn update_profile(db_pool: &SqlitePool, actor: &Actor, form: &ProfileUpdate) -> AppResult<Identity> {
    let current = actor.require()?;

    let username = normalize_username(&form.username);
    check_username(&username)?;
    if username_taken(db_pool, &username, Some(current.id)).await? {
        return Err(AppError::invalid(TAKEN));
    }
    let avatar = check_avatar(&form.avatar)?;

    let updated = sqlx::query("UPDATE identities SET username=?,avatar=? WHERE id=?")
        .bind(&username)
        .bind(&avatar)
        .bind(current.id)
        .execute(db_pool)
        .await
        .map_err(username_conflict)?;
    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("user"));
    }

    info!("@{} is now @{username}", current.username);
    Ok(Identity {
        username,
        avatar,
        ..current.clone()
    })
}

#[cfg(test)]
pub(crate) async fn register_user(db_pool: &SqlitePool, username: &str) -> Identity {
    register(
        db_pool,
        &Registration {
            username: username.to_owned(),
            password1: "analytical engine".to_owned(),
            password2: "analytical engine".to_owned(),
            avatar: String::new(),
        },
    )
    .await
    .unwrap()
}
