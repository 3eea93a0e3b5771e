use axum::{routing::delete, routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", get(handlers::list_feed))
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", put(handlers::update_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/comments", post(handlers::add_comment))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/profile", put(handlers::update_profile))
        .route("/users/profile-picture", post(handlers::upload_profile_picture))
        .route("/users/profile-picture", delete(handlers::delete_profile_picture))
        .route("/users/cover-photo", post(handlers::upload_cover_photo))
        .route("/users/cover-photo", delete(handlers::delete_cover_photo))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/posts", get(handlers::list_author_posts))
}
