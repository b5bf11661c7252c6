mod login;
mod logout;
pub mod password;
mod register;

use axum::{routing::{any, get}, Router};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", get(register::register_page).post(register::register))
        .route("/logout", any(logout::logout))
}
