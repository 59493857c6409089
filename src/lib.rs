pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use anyhow::Result;

use crate::app::gate::ContentGate;
use crate::app::locks::ActionLocks;
use crate::app::policy::ModerationPolicy;
use crate::app::rate_limiter::RateLimiter;
use crate::app::references::ReferenceExtractor;
use crate::app::session::SessionKeys;
use crate::config::AppConfig;
use crate::infra::store::SharedStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub locks: ActionLocks,
    pub gate: ContentGate,
    pub references: ReferenceExtractor,
    pub policy: ModerationPolicy,
    pub sessions: SessionKeys,
    pub rate_limiter: Option<RateLimiter>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        config: &AppConfig,
        rate_limiter: Option<RateLimiter>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            locks: ActionLocks::new(),
            gate: ContentGate::new()?,
            references: ReferenceExtractor::new()?,
            policy: ModerationPolicy::new(
                config.interpretation_hide_threshold,
                config.reply_hide_threshold,
            ),
            sessions: SessionKeys::new(config.session_key, config.session_issuer.clone()),
            rate_limiter,
            admin_token: config.admin_token.clone(),
        })
    }
}
