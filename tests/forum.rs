use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use studyrooms::{app, config::Listing, db, session_layer, store::{activity, catalog}, AppState};

async fn forum() -> (Router, SqlitePool) {
    let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
    let app_state = AppState {
        db_pool: db_pool.clone(),
        listing: Listing::default(),
    };
    (app(app_state, session_layer(60, false)), db_pool)
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::empty()).unwrap()
}

fn post(uri: &str, cookie: Option<&str>, form: &str) -> Request<Body> {
    let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::from(form.to_owned())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Registers and returns the `id=...` session cookie.
async fn sign_up(app: &Router, username: &str) -> String {
    let response = send(
        app,
        post("/register", None, &format!("username={username}&password1=analytical+engine&password2=analytical+engine")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned()
}

async fn only_room_id(db_pool: &SqlitePool) -> Uuid {
    let rooms = catalog::search_rooms(db_pool, "").await.unwrap();
    assert_eq!(rooms.len(), 1);
    rooms[0].id
}

#[tokio::test]
async fn host_only_deletion_cascades_to_messages() {
    let (app, db_pool) = forum().await;
    let u1 = sign_up(&app, "u1").await;
    let u2 = sign_up(&app, "u2").await;

    let response = send(&app, post("/r/new", Some(&u1), "name=R1&description=&topic=chess")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    let room_id = only_room_id(&db_pool).await;

    let response = send(&app, post(&format!("/r/{room_id}"), Some(&u2), "body=hi")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/r/{room_id}"));

    let participants: Vec<String> = activity::participants(&db_pool, room_id)
        .await
        .unwrap()
        .into_iter()
        .map(|identity| identity.username)
        .collect();
    assert_eq!(participants, ["u2"]);

    let page = text(send(&app, get(&format!("/r/{room_id}"), None)).await).await;
    assert!(page.contains("<p>hi</p>"));
    assert!(page.contains("Participants (1)"));

    let response = send(&app, post(&format!("/r/{room_id}/delete"), Some(&u2), "")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = send(&app, get(&format!("/r/{room_id}/edit"), Some(&u2))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, post(&format!("/r/{room_id}/delete"), Some(&u1), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    assert!(activity::recent_messages(&db_pool, "", 10).await.unwrap().is_empty());
    assert_eq!(catalog::topics(&db_pool, "chess", None).await.unwrap().len(), 1);
    let response = send(&app, get(&format!("/r/{room_id}"), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_the_author_deletes_a_message() {
    let (app, db_pool) = forum().await;
    let host = sign_up(&app, "host").await;
    let author = sign_up(&app, "author").await;

    send(&app, post("/r/new", Some(&host), "name=R1&topic=go")).await;
    let room_id = only_room_id(&db_pool).await;
    send(&app, post(&format!("/r/{room_id}"), Some(&author), "body=mine")).await;
    let message_id = activity::room_messages(&db_pool, room_id).await.unwrap()[0].id;

    let response = send(&app, post(&format!("/m/{message_id}/delete"), Some(&host), "")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, get(&format!("/m/{message_id}/delete"), Some(&author))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, post(&format!("/m/{message_id}/delete"), Some(&author), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/r/{room_id}"));
    assert!(activity::room_messages(&db_pool, room_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_mutations_go_to_login() {
    let (app, db_pool) = forum().await;

    for request in [
        get("/r/new", None),
        post("/r/new", None, "name=R1&topic=chess"),
        get("/p/edit", None),
    ] {
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");
    }
    assert!(catalog::search_rooms(&db_pool, "").await.unwrap().is_empty());

    let host = sign_up(&app, "host").await;
    send(&app, post("/r/new", Some(&host), "name=R1&topic=chess")).await;
    let room_id = only_room_id(&db_pool).await;
    send(&app, post(&format!("/r/{room_id}"), Some(&host), "body=first")).await;
    let message_id = activity::room_messages(&db_pool, room_id).await.unwrap()[0].id;

    for request in [
        post(&format!("/r/{room_id}"), None, "body=drive-by"),
        post(&format!("/r/{room_id}/edit"), None, "name=Taken&topic=chess"),
        post(&format!("/r/{room_id}/delete"), None, ""),
        post(&format!("/m/{message_id}/delete"), None, ""),
    ] {
        let uri = request.uri().to_string();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login", "{uri}");
    }

    let room = catalog::get_room(&db_pool, room_id).await.unwrap();
    assert_eq!(room.name, "R1");
    let messages = activity::room_messages(&db_pool, room_id).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].body, "first");
}

#[tokio::test]
async fn unknown_ids_are_404() {
    let (app, _) = forum().await;

    for uri in ["/r/not-a-room", &format!("/r/{}", Uuid::now_v7()), &format!("/p/{}", Uuid::now_v7())] {
        let response = send(&app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn wrong_password_gets_no_session() {
    let (app, _) = forum().await;
    sign_up(&app, "ada").await;

    let response = send(&app, post("/login", None, "username=ada&password=difference+engine")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let wrong_password = text(response).await;

    let response = send(&app, post("/login", None, "username=bob&password=analytical+engine")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let no_user = text(response).await;

    assert!(wrong_password.contains("Invalid username or password"));
    assert!(no_user.contains("Invalid username or password"));

    let response = send(&app, post("/login", None, "username=ADA&password=analytical+engine&return_url=/r/new")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/r/new");
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn logout_ends_the_session() {
    let (app, _) = forum().await;
    let cookie = sign_up(&app, "ada").await;

    assert_eq!(send(&app, get("/r/new", Some(&cookie))).await.status(), StatusCode::OK);

    let response = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, get("/r/new", Some(&cookie))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn invalid_forms_come_back_filled_in() {
    let (app, _) = forum().await;
    sign_up(&app, "ada").await;

    let response = send(&app, post("/register", None, "username=Ada&password1=analytical+engine&password2=analytical+engine")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let page = text(response).await;
    assert!(page.contains("already exists"));
    assert!(page.contains(r#"value="Ada""#));
    assert!(!page.contains("analytical engine"));

    let cookie = sign_up(&app, "bob").await;
    let response = send(&app, post("/r/new", Some(&cookie), "name=&description=%3Cb%3Ebold%3C%2Fb%3E&topic=chess")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let page = text(response).await;
    assert!(page.contains("Give the room a name."));
    assert!(page.contains("&lt;b&gt;bold"));
    assert!(!page.contains("<b>bold"));
    assert!(page.contains(r#"value="chess""#));
}

#[tokio::test]
async fn home_searches_across_topic_name_and_description() {
    let (app, _) = forum().await;
    let cookie = sign_up(&app, "ada").await;
    send(&app, post("/r/new", Some(&cookie), "name=Openings&description=e4+or+d4&topic=Chess")).await;
    send(&app, post("/r/new", Some(&cookie), "name=Beginners&description=welcome&topic=Python")).await;

    let everything = text(send(&app, get("/", None)).await).await;
    assert!(everything.contains("2 rooms available"));

    let by_topic = text(send(&app, get("/?q=pyth", None)).await).await;
    assert!(by_topic.contains("1 rooms available"));
    assert!(by_topic.contains("Beginners"));
    assert!(!by_topic.contains("Openings"));

    let topics = text(send(&app, get("/topics?q=che", None)).await).await;
    assert!(topics.contains(r#"<a href="/?q=Chess">Chess</a>"#));
    assert!(!topics.contains("Python"));
}
