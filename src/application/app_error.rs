use strum::{AsRefStr, Display};
use thiserror::Error;

/// Why a request conflicts with stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictReason {
    PurchaseTokenLinkedToAnotherUser,
    PremiumUserCannotStartTrial,
    TrialAlreadyActive,
    TrialAlreadyUsed,
}

impl ConflictReason {
    /// Human-readable message shown to API clients.
    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::PurchaseTokenLinkedToAnotherUser => {
                "Purchase token already linked to another user"
            }
            ConflictReason::PremiumUserCannotStartTrial => "Premium users cannot start trial",
            ConflictReason::TrialAlreadyActive => "Trial already active",
            ConflictReason::TrialAlreadyUsed => "Trial already used",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Conflict: {}", .0.message())]
    Conflict(ConflictReason),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    Forbidden,
    InvalidInput,
    NotFound,
    Conflict,
    UpstreamUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
