//! Game error kinds.

use std::time::Duration;

use thiserror::Error;

use crate::database::StoreError;

use super::pending::ActionKind;

/// Why a game operation did not happen.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("a {0} is already in progress")]
    AlreadyPending(ActionKind),

    #[error("only the user who started this can answer it")]
    Unauthorized,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("no characters left in the catalog")]
    EmptyCatalog,

    #[error("this request has expired")]
    Expired,

    #[error("on cooldown for another {remaining:?}")]
    Cooldown { remaining: Duration },

    #[error("nothing to transfer")]
    NothingToTransfer,

    #[error("recipient unavailable")]
    RecipientUnavailable,

    #[error("{0}")]
    InvalidInput(String),

    #[error("store failure: {0}")]
    TransientStoreFailure(#[from] StoreError),
}

impl GameError {
    /// Whether the requester caused this (shown verbatim, never retried).
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, GameError::TransientStoreFailure(_))
    }

    /// Short diagnostic code shown instead of internal details.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "E404",
            GameError::AlreadyPending(_) => "E409",
            GameError::Unauthorized => "E403",
            GameError::InsufficientFunds { .. } => "E402",
            GameError::EmptyCatalog => "E410",
            GameError::Expired => "E408",
            GameError::Cooldown { .. } => "E429",
            GameError::NothingToTransfer => "E204",
            GameError::RecipientUnavailable => "E424",
            GameError::InvalidInput(_) => "E400",
            GameError::TransientStoreFailure(_) => "E503",
        }
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::outage;

    #[test]
    fn test_store_failures_are_not_user_facing() {
        let err = GameError::from(outage("down"));
        assert!(!err.is_user_facing());
        assert_eq!(err.code(), "E503");
        assert!(GameError::Unauthorized.is_user_facing());
    }
}
