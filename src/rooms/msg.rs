use axum::{debug_handler, extract::{Path, State}, response::{IntoResponse, Redirect, Response}};
use pulldown_cmark::{Event, Parser, Tag};
use sqlx::SqlitePool;

use crate::{
    authz::Actor,
    db::{parse_id, Message},
    res::render,
    store::activity,
    AppResult, AppState,
};

use super::DeletePage;

const EXCERPT: usize = 80;

fn linkable(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    !["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Markdown to HTML. Raw HTML in the source comes out as visible text.
fn render_body(markdown: &str) -> String {
    let parser = Parser::new(markdown).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) if !linkable(&dest_url) => {
            Event::Start(Tag::Link { link_type, dest_url: "#".into(), title, id })
        }
        Event::Start(Tag::Image { link_type, dest_url, title, id }) if !linkable(&dest_url) => {
            Event::Start(Tag::Image { link_type, dest_url: "#".into(), title, id })
        }
        _ => event,
    });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

impl Message {
    pub fn body_html(&self) -> String {
        render_body(&self.body)
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_message_page(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(message_id): Path<String>,
) -> AppResult<Response> {
    let message = activity::authorize_message(&db_pool, &actor, parse_id(&message_id, "message")?).await?;

    let obj = message.body.chars().take(EXCERPT).collect();
    let back = format!("/r/{}", message.room_id);
    Ok(render(DeletePage { actor, heading: "Delete message", obj, back })?.into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn delete_message(
    State(db_pool): State<SqlitePool>,
    actor: Actor,
    Path(message_id): Path<String>,
) -> AppResult<Response> {
    let message = activity::delete_message(&db_pool, &actor, parse_id(&message_id, "message")?).await?;
    Ok(Redirect::to(&format!("/r/{}", message.room_id)).into_response())
}
