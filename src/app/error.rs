use crate::infra::store::StoreError;

/// Everything a core action can fail with. Rendered to HTTP by
/// `http::error`, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("already upvoted")]
    AlreadyVoted,
    #[error("already reported")]
    AlreadyFlagged,
    #[error("you already have an interpretation on this verse")]
    DuplicateInterpretation,
    #[error("text contains markup or forbidden content")]
    ContainsMarkup,
    #[error("text is too short")]
    TooShort,
    #[error("text is too long")]
    TooLong,
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("only the author can do that")]
    Forbidden,
    #[error("storage unavailable")]
    StorageUnavailable(#[source] StoreError),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable(err)
    }
}

pub type ActionResult<T> = Result<T, ActionError>;
