use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn verses() -> Router<AppState> {
    Router::new()
        .route("/verses/lookup", get(handlers::lookup_verse))
        .route(
            "/verses/:id/interpretations",
            get(handlers::list_interpretations).post(handlers::create_interpretation),
        )
        .route(
            "/verses/:id/references/inbound",
            get(handlers::inbound_references),
        )
}

pub fn interpretations() -> Router<AppState> {
    Router::new()
        .route("/interpretations/:id", delete(handlers::delete_interpretation))
        .route(
            "/interpretations/:id/upvote",
            post(handlers::upvote_interpretation),
        )
        .route(
            "/interpretations/:id/flag",
            post(handlers::flag_interpretation),
        )
        .route(
            "/interpretations/:id/replies",
            get(handlers::list_replies).post(handlers::create_reply),
        )
        .route(
            "/interpretations/:id/counts",
            get(handlers::interpretation_counts),
        )
}

pub fn replies() -> Router<AppState> {
    Router::new()
        .route("/replies/:id", delete(handlers::delete_reply))
        .route("/replies/:id/upvote", post(handlers::upvote_reply))
        .route("/replies/:id/flag", post(handlers::flag_reply))
        .route("/replies/:id/counts", get(handlers::reply_counts))
}

pub fn admin() -> Router<AppState> {
    Router::new().route(
        "/admin/counts/:kind/:id/recompute",
        post(handlers::recompute_counts),
    )
}
