use thiserror::Error;

/// Errors raised by the pure token layer (no I/O involved).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid decimals: {0} (expected 0..=9)")]
    InvalidDecimals(u8),

    #[error("transaction has no instructions")]
    EmptyTransaction,

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid account data: {0}")]
    InvalidAccountData(String),
}
