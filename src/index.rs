use askama::Template;
use axum::{debug_handler, extract::{Query, State}, response::{IntoResponse, Response}, routing::get, Router};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    config::Listing,
    db::{Message, Room, TopicCount},
    res::{self, render},
    store::{activity, catalog},
    AppResult, AppState,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage {
    actor: Actor,
    room_total: i64,
    topics: Vec<TopicCount>,
    rooms: Vec<Room>,
    activity: Vec<Message>,
}

#[derive(Template)]
#[template(path = "topics.html")]
struct TopicsPage {
    actor: Actor,
    q: String,
    room_total: i64,
    topics: Vec<TopicCount>,
}

#[derive(Template)]
#[template(path = "activity.html")]
struct ActivityPage {
    actor: Actor,
    activity: Vec<Message>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/topics", get(topics))
        .route("/activity", get(recent_activity))
        .route("/style.css", get(res::stylesheet))
}

#[debug_handler(state = AppState)]
pub(crate) async fn home(
    State(db_pool): State<SqlitePool>,
    State(listing): State<Listing>,
    actor: Actor,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Response> {
    let rooms = catalog::search_rooms(&db_pool, &q).await?;
    let topics = catalog::topics(&db_pool, "", Some(listing.home_topics)).await?;
    let room_total = catalog::room_total(&db_pool).await?;
    let activity = activity::recent_messages(&db_pool, &q, listing.home_activity).await?;

    Ok(render(HomePage { actor, room_total, topics, rooms, activity })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn topics(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Response> {
    let topics = catalog::topics(&db_pool, &q, None).await?;
    let room_total = catalog::room_total(&db_pool).await?;

    Ok(render(TopicsPage { actor, q, room_total, topics })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn recent_activity(
    State(db_pool): State<SqlitePool>,
    State(listing): State<Listing>,
    actor: Actor,
) -> AppResult<Response> {
    let activity = activity::recent_messages(&db_pool, "", listing.activity).await?;

    Ok(render(ActivityPage { actor, activity })?.into_response())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn topic_links_carry_an_encoded_query() {
        let page = TopicsPage {
            actor: Actor::Anonymous,
            q: "\"><script>".to_owned(),
            room_total: 1,
            topics: vec![TopicCount { id: Uuid::now_v7(), name: "c++ & rust".to_owned(), room_count: 1 }],
        }
        .render()
        .unwrap();

        assert!(page.contains(r#"href="/?q=c%2B%2B%20%26%20rust""#));
        assert!(page.contains("c++ &amp; rust</a>"));
        assert!(!page.contains("\"><script>"));
    }
}
