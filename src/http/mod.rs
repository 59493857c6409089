use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod middleware;
mod routes;

pub use auth::AdminToken;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::verses())
        .merge(routes::interpretations())
        .merge(routes::replies())
        .merge(routes::admin())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .with_state(state)
}
