use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

use crate::app::actor::Actor;
use crate::http::AppError;
use crate::AppState;

/// Maps a request to the rate-limited action it performs, if any.
fn action_for(method: &Method, path: &str) -> Option<&'static str> {
    if *method != Method::POST {
        return None;
    }
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match segments.as_slice() {
        ["interpretations" | "replies", _, "upvote"] => Some("vote"),
        ["interpretations" | "replies", _, "flag"] => Some("flag"),
        ["interpretations", _, "replies"] => Some("reply"),
        ["verses", _, "interpretations"] => Some("interpretation"),
        _ => None,
    }
}

/// Per-user quotas on write actions. Anonymous requests pass through and are
/// rejected by the handler. A Redis failure lets the request through.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    actor: Actor,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(request).await);
    };
    let Some(action) = action_for(request.method(), request.uri().path()) else {
        return Ok(next.run(request).await);
    };
    let Some(user_id) = actor.user_id() else {
        return Ok(next.run(request).await);
    };

    match limiter.hit(user_id, action).await {
        Ok(info) if info.limited => {
            return Err(AppError::rate_limited(format!(
                "Rate limit exceeded for action: {}. Please try again later.",
                action
            )));
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(error = ?err, user_id = %user_id, action = action, "failed to check rate limit");
        }
    }

    Ok(next.run(request).await)
}
