use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::{
    appresult::{AppError, AppResult},
    authz::{ensure_can_mutate, Actor},
    db::{begin_write, Room, Topic, TopicCount},
};

use super::{contains_pattern, fold};

const NAME_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 2000;

macro_rules! room_select {
    () => {
        r"SELECT r.id, r.name, r.description,
            r.topic_id, t.name AS topic_name,
            r.host_id, h.username AS host_username,
            r.created, r.updated
        FROM rooms r
        JOIN topics t ON t.id = r.topic_id
        JOIN identities h ON h.id = r.host_id"
    };
}

// julianday() compares instants regardless of how many fractional digits were stored.
const ROOM_ORDER: &str = " ORDER BY julianday(r.updated) DESC, julianday(r.created) DESC, r.rowid DESC";

/// The room form: name, description and a free-text topic name.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RoomDraft {
    pub name: String,
    pub description: String,
    pub topic: String,
}

impl RoomDraft {
    pub fn from_room(room: &Room) -> Self {
        RoomDraft {
            name: room.name.clone(),
            description: room.description.clone(),
            topic: room.topic_name.clone(),
        }
    }

    fn cleaned(&self) -> AppResult<RoomDraft> {
        let draft = RoomDraft {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            topic: self.topic.trim().to_owned(),
        };

        if draft.topic.is_empty() {
            return Err(AppError::invalid("Pick or type a topic."));
        }
        if draft.name.is_empty() {
            return Err(AppError::invalid("Give the room a name."));
        }
        if draft.name.chars().count() > NAME_MAX || draft.topic.chars().count() > NAME_MAX {
            return Err(AppError::invalid(format!(
                "Room and topic names have at most {NAME_MAX} characters."
            )));
        }
        if draft.description.chars().count() > DESCRIPTION_MAX {
            return Err(AppError::invalid(format!(
                "Descriptions have at most {DESCRIPTION_MAX} characters."
            )));
        }
        Ok(draft)
    }
}

/// Fetches the topic with this exact name, inserting it if there is none.
/// A single upsert against the unique name, so concurrent callers agree on one row.
pub async fn get_or_create_topic(conn: &mut SqliteConnection, name: &str) -> AppResult<Topic> {
    Ok(
        sqlx::query_as(
            "INSERT INTO topics (id,name,name_folded) VALUES (?,?,?)
            ON CONFLICT(name) DO UPDATE SET name=excluded.name
            RETURNING id,name",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(fold(name))
        .fetch_one(&mut *conn)
        .await?
    )
}

async fn fetch_room(conn: &mut SqliteConnection, room_id: Uuid) -> AppResult<Room> {
    sqlx::query_as(concat!(room_select!(), " WHERE r.id=?"))
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound("room"))
}

pub async fn get_room(db_pool: &SqlitePool, room_id: Uuid) -> AppResult<Room> {
    let mut conn = db_pool.acquire().await?;
    fetch_room(&mut conn, room_id).await
}

/// Loads a room the actor is allowed to change, for the edit and delete-confirmation pages.
pub async fn authorize_room(db_pool: &SqlitePool, actor: &Actor, room_id: Uuid) -> AppResult<Room> {
    actor.require()?;
    let room = get_room(db_pool, room_id).await?;
    ensure_can_mutate(actor, &room)?;
    Ok(room)
}

pub async fn create_room(db_pool: &SqlitePool, actor: &Actor, draft: &RoomDraft) -> AppResult<Room> {
    let host = actor.require()?;
    let draft = draft.cleaned()?;

    let mut tx = begin_write(db_pool).await?;
    let topic = get_or_create_topic(&mut tx, &draft.topic).await?;

    let room_id = Uuid::now_v7();
    let now = OffsetDateTime::now_utc();
    sqlx::query(
        "INSERT INTO rooms (id,host_id,topic_id,name,description,name_folded,description_folded,created,updated)
        VALUES (?,?,?,?,?,?,?,?,?)",
    )
    .bind(room_id)
    .bind(host.id)
    .bind(topic.id)
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(fold(&draft.name))
    .bind(fold(&draft.description))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let room = fetch_room(&mut tx, room_id).await?;
    tx.commit().await?;

    info!("@{} opened {}#{} under {}", host.username, room.name, room.id, room.topic_name);
    Ok(room)
}

pub async fn update_room(db_pool: &SqlitePool, actor: &Actor, room_id: Uuid, draft: &RoomDraft) -> AppResult<Room> {
    actor.require()?;

    let mut tx = begin_write(db_pool).await?;
    let room = fetch_room(&mut tx, room_id).await?;
    ensure_can_mutate(actor, &room)?;

    let draft = draft.cleaned()?;
    let topic = get_or_create_topic(&mut tx, &draft.topic).await?;

    sqlx::query(
        "UPDATE rooms SET name=?,description=?,name_folded=?,description_folded=?,topic_id=?,updated=? WHERE id=?",
    )
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(fold(&draft.name))
    .bind(fold(&draft.description))
    .bind(topic.id)
    .bind(OffsetDateTime::now_utc())
    .bind(room.id)
    .execute(&mut *tx)
    .await?;

    let room = fetch_room(&mut tx, room_id).await?;
    tx.commit().await?;

    info!("updated {}#{}", room.name, room.id);
    Ok(room)
}

/// Deletes a room along with its messages and participant entries. The topic stays.
pub async fn delete_room(db_pool: &SqlitePool, actor: &Actor, room_id: Uuid) -> AppResult<Room> {
    actor.require()?;

    let mut tx = begin_write(db_pool).await?;
    let room = fetch_room(&mut tx, room_id).await?;
    ensure_can_mutate(actor, &room)?;

    sqlx::query("DELETE FROM messages WHERE room_id=?")
        .bind(room.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM room_participants WHERE room_id=?")
        .bind(room.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM rooms WHERE id=?")
        .bind(room.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("deleted {}#{}", room.name, room.id);
    Ok(room)
}

/// Rooms whose topic name, name or description contains `q`, ignoring case.
/// A blank `q` matches every room. Matching runs on the folded columns, so
/// non-ASCII text compares case-insensitively too.
pub async fn search_rooms(db_pool: &SqlitePool, q: &str) -> AppResult<Vec<Room>> {
    let sql = concat!(
        room_select!(),
        r" WHERE t.name_folded LIKE ?1 ESCAPE '\'
            OR r.name_folded LIKE ?1 ESCAPE '\'
            OR r.description_folded LIKE ?1 ESCAPE '\'"
    )
    .to_owned()
        + ROOM_ORDER;

    Ok(
        sqlx::query_as(&sql)
            .bind(contains_pattern(q))
            .fetch_all(db_pool)
            .await?
    )
}

pub async fn rooms_hosted_by(db_pool: &SqlitePool, host_id: Uuid) -> AppResult<Vec<Room>> {
    let sql = concat!(room_select!(), " WHERE r.host_id=?").to_owned() + ROOM_ORDER;

    Ok(
        sqlx::query_as(&sql)
            .bind(host_id)
            .fetch_all(db_pool)
            .await?
    )
}

/// Topics whose name contains `q`, busiest first, with how many rooms use each.
pub async fn topics(db_pool: &SqlitePool, q: &str, limit: Option<i64>) -> AppResult<Vec<TopicCount>> {
    Ok(
        sqlx::query_as(
            r"SELECT t.id, t.name, COUNT(r.id) AS room_count
            FROM topics t
            LEFT JOIN rooms r ON r.topic_id = t.id
            WHERE t.name_folded LIKE ? ESCAPE '\'
            GROUP BY t.id, t.name
            ORDER BY room_count DESC, t.name
            LIMIT ?",
        )
        .bind(contains_pattern(q))
        .bind(limit.unwrap_or(-1))
        .fetch_all(db_pool)
        .await?
    )
}

pub async fn room_total(db_pool: &SqlitePool) -> AppResult<i64> {
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
        .fetch_one(db_pool)
        .await?;
    Ok(total)
}

#[cfg(test)]
pub(crate) fn draft(name: &str, description: &str, topic: &str) -> RoomDraft {
    RoomDraft {
        name: name.to_owned(),
        description: description.to_owned(),
        topic: topic.to_owned(),
    }
}
