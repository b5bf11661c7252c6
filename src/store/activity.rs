use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    appresult::{AppError, AppResult},
    authz::{ensure_can_mutate, Actor},
    db::{begin_write, Identity, Message},
};

use super::contains_pattern;

const BODY_MAX: usize = 5000;

macro_rules! message_select {
    () => {
        r"SELECT m.id, m.room_id, r.name AS room_name,
            m.author_id, a.username AS author_username, a.avatar AS author_avatar,
            m.body, m.created
        FROM messages m
        JOIN rooms r ON r.id = m.room_id
        JOIN identities a ON a.id = m.author_id"
    };
}

const NEWEST_FIRST: &str = " ORDER BY julianday(m.created) DESC, m.rowid DESC";

async fn fetch_message(conn: &mut SqliteConnection, message_id: Uuid) -> AppResult<Message> {
    sqlx::query_as(concat!(message_select!(), " WHERE m.id=?"))
        .bind(message_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("message"))
}

pub async fn get_message(db_pool: &SqlitePool, message_id: Uuid) -> AppResult<Message> {
    let mut conn = db_pool.acquire().await?;
    fetch_message(&mut conn, message_id).await
}

/// Loads a message the actor is allowed to delete, for the confirmation page.
pub async fn authorize_message(db_pool: &SqlitePool, actor: &Actor, message_id: Uuid) -> AppResult<Message> {
    actor.require()?;
    let message = get_message(db_pool, message_id).await?;
    ensure_can_mutate(actor, &message)?;
    Ok(message)
}

/// Posts to a room and makes the author one of its participants.
pub async fn post_message(db_pool: &SqlitePool, actor: &Actor, room_id: Uuid, body: &str) -> AppResult<Message> {
    let author = actor.require()?;

    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::invalid("Write something first."));
    }
    if body.chars().count() > BODY_MAX {
        return Err(AppError::invalid(format!(
            "Messages have at most {BODY_MAX} characters."
        )));
    }

    let mut tx = begin_write(db_pool).await?;
    if sqlx::query_as::<_, (i64,)>("SELECT 1 FROM rooms WHERE id=?")
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("room"));
    }

    let message_id = Uuid::now_v7();
    sqlx::query("INSERT INTO messages (id,room_id,author_id,body,created) VALUES (?,?,?,?,?)")
        .bind(message_id)
        .bind(room_id)
        .bind(author.id)
        .bind(body)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO room_participants (room_id,identity_id) VALUES (?,?) ON CONFLICT DO NOTHING")
        .bind(room_id)
        .bind(author.id)
        .execute(&mut *tx)
        .await?;

    let message = fetch_message(&mut tx, message_id).await?;
    tx.commit().await?;

    info!("@{} posted #{} in {}#{}", author.username, message.id, message.room_name, room_id);
    Ok(message)
}

pub async fn delete_message(db_pool: &SqlitePool, actor: &Actor, message_id: Uuid) -> AppResult<Message> {
    actor.require()?;

    let mut tx = begin_write(db_pool).await?;
    let message = fetch_message(&mut tx, message_id).await?;
    ensure_can_mutate(actor, &message)?;

    sqlx::query("DELETE FROM messages WHERE id=?")
        .bind(message.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("deleted message #{} from {}#{}", message.id, message.room_name, message.room_id);
    Ok(message)
}

pub async fn room_messages(db_pool: &SqlitePool, room_id: Uuid) -> AppResult<Vec<Message>> {
    let sql = concat!(message_select!(), " WHERE m.room_id=?").to_owned() + NEWEST_FIRST;
    Ok(
        sqlx::query_as(&sql)
            .bind(room_id)
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn participants(db_pool: &SqlitePool, room_id: Uuid) -> AppResult<Vec<Identity>> {
    Ok(
        sqlx::query_as(
            "SELECT i.id, i.username, i.avatar, i.created
            FROM room_participants p
            JOIN identities i ON i.id = p.identity_id
            WHERE p.room_id=?
            ORDER BY i.username",
        )
        .bind(room_id)
        .fetch_all(db_pool)
        .await?
    )
}

/// Newest messages in rooms whose topic name contains `q`.
pub async fn recent_messages(db_pool: &SqlitePool, q: &str, limit: i64) -> AppResult<Vec<Message>> {
    let sql = concat!(
        message_select!(),
        r" JOIN topics t ON t.id = r.topic_id WHERE t.name_folded LIKE ? ESCAPE '\'"
    )
    .to_owned()
        + NEWEST_FIRST
        + " LIMIT ?";
    Ok(
        sqlx::query_as(&sql)
            .bind(contains_pattern(q))
            .bind(limit)
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn messages_by(db_pool: &SqlitePool, author_id: Uuid, limit: i64) -> AppResult<Vec<Message>> {
    let sql = concat!(message_select!(), " WHERE m.author_id=?").to_owned() + NEWEST_FIRST + " LIMIT ?";
    Ok(
        sqlx::query_as(&sql)
            .bind(author_id)
            .bind(limit)
            .fetch_all(db_pool)
            .await?
    )
}
