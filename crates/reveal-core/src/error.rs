use thiserror::Error;

/// Why a write was rejected as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    EmailTaken,
    DuplicateVote,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::EmailTaken => f.write_str("email is already registered"),
            Conflict::DuplicateVote => f.write_str("user has already voted on this event"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("conflict: {0}")]
    Conflict(Conflict),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("voting is closed for this event")]
    VotingClosed,

    #[error("reset token has expired")]
    Expired,

    #[error("account is inactive")]
    InactiveAccount,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
