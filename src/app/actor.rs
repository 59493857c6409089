use uuid::Uuid;

use crate::app::error::ActionError;

/// Who is performing an action. Anonymous callers are represented
/// explicitly so every core operation decides for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(Option<Uuid>);

impl Actor {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(user_id: Uuid) -> Self {
        Self(Some(user_id))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.0
    }

    pub fn require(&self) -> Result<Uuid, ActionError> {
        self.0.ok_or(ActionError::Unauthenticated)
    }
}
