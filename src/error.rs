use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the exchange core.
///
/// Validation variants are raised before any write happens; store and
/// gateway failures are folded into `ExternalServiceFailure` by the
/// infrastructure adapters.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("no active rate for card type '{0}'")]
    RateNotFound(String),
    #[error("invalid rate bounds: {0}")]
    InvalidRateBounds(String),
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        required: Decimal,
        available: Decimal,
    },
    #[error("account verification failed: {0}")]
    AccountVerificationFailed(String),
    #[error("external service failure: {0}")]
    ExternalServiceFailure(String),
    #[error("no profile for user '{0}'")]
    ProfileNotFound(String),
    #[error("profile already exists for user '{0}'")]
    ProfileExists(String),
    #[error("no {collection} record with id '{id}'")]
    RecordNotFound {
        collection: &'static str,
        id: String,
    },
    #[error("{collection} record '{id}' was already reviewed")]
    AlreadyReviewed {
        collection: &'static str,
        id: String,
    },
    #[error("invalid referral code: {0}")]
    InvalidReferralCode(String),
    #[error("invalid identity document: {0}")]
    InvalidDocument(String),
    #[error("{collection} record '{id}' is in status '{status}', operation not allowed")]
    InvalidStatus {
        collection: &'static str,
        id: String,
        status: String,
    },
    #[error("concurrent update conflict on {collection} record '{id}'")]
    UpdateConflict {
        collection: &'static str,
        id: String,
    },
}

pub type Result<T> = std::result::Result<T, ExchangeError>;
