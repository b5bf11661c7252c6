use askama::Template;
use axum::{
    debug_handler,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use time::OffsetDateTime;

use crate::{
    db::{Identity, Message, Room},
    AppResult,
};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css")],
        include_res!(str, "/static/style.css"),
    )
}

/// Renders a page template from `res/pages`.
pub fn render(page: impl Template) -> AppResult<Html<String>> {
    Ok(Html(page.render()?))
}

#[derive(Template)]
#[template(path = "sorry.html")]
struct Sorry {
    what: &'static str,
}

pub fn sorry(what: &'static str) -> Response {
    match render(Sorry { what }) {
        Ok(page) => (StatusCode::NOT_FOUND, page).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Human age of a timestamp, e.g. "3 hours ago".
pub fn since(then: OffsetDateTime) -> String {
    since_at(then, OffsetDateTime::now_utc())
}

fn since_at(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let secs = (now - then).whole_seconds().max(0);
    let (n, unit) = match secs {
        0..60 => return "just now".to_owned(),
        60..3_600 => (secs / 60, "minute"),
        3_600..86_400 => (secs / 3_600, "hour"),
        86_400..2_592_000 => (secs / 86_400, "day"),
        2_592_000..31_536_000 => (secs / 2_592_000, "month"),
        _ => (secs / 31_536_000, "year"),
    };
    let plural = if n == 1 { "" } else { "s" };
    format!("{n} {unit}{plural} ago")
}

impl Identity {
    pub fn since(&self) -> String {
        since(self.created)
    }
}

impl Room {
    pub fn since(&self) -> String {
        since(self.created)
    }
}

impl Message {
    pub fn since(&self) -> String {
        since(self.created)
    }
}
