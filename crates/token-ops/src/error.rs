use sol_token::{Pubkey, SolError};
use thiserror::Error;

use crate::ledger::Signature;

/// Failures of the remote ledger service (transport or JSON-RPC level).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("unexpected rpc response: {0}")]
    Decode(String),
}

/// Failures reported by the external wallet signer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("user declined: {0}")]
    Declined(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("signer failed: {0}")]
    Failed(String),
}

/// Failures while loading configuration or key material.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid keypair file: {0}")]
    Keypair(String),
}

/// The user-facing error categories every operation failure maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    RemoteUnavailable,
    SignerRejected,
    ConfirmationTimeout,
    LedgerExecutionFailed,
}

/// Token operation errors.
#[derive(Debug, Error)]
pub enum TokenOpsError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid decimals: {0} (expected 0..=9)")]
    InvalidDecimals(u8),

    #[error("transaction has no instructions")]
    EmptyTransaction,

    #[error("mint {0} does not exist")]
    MintNotFound(Pubkey),

    #[error("source token account {0} does not exist")]
    SourceAccountMissing(Pubkey),

    #[error("insufficient token balance: {available} available, {requested} requested")]
    InsufficientBalance { available: u64, requested: u64 },

    #[error("invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("transaction build error: {0}")]
    TransactionBuild(String),

    #[error("remote ledger unavailable: {0}")]
    RemoteUnavailable(#[source] RpcError),

    #[error("signer rejected the transaction: {0}")]
    SignerRejected(#[source] SignerError),

    #[error("transaction {signature} not confirmed before timeout; it may still land")]
    ConfirmationTimeout { signature: Signature },

    #[error("transaction {signature} failed on-chain: {reason}")]
    LedgerExecutionFailed { signature: Signature, reason: String },
}

impl TokenOpsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenOpsError::InvalidAmount(_)
            | TokenOpsError::InvalidAddress(_)
            | TokenOpsError::InvalidDecimals(_)
            | TokenOpsError::EmptyTransaction
            | TokenOpsError::MintNotFound(_)
            | TokenOpsError::SourceAccountMissing(_)
            | TokenOpsError::InsufficientBalance { .. }
            | TokenOpsError::InvalidAccountData(_)
            | TokenOpsError::TransactionBuild(_) => ErrorKind::InvalidInput,
            TokenOpsError::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            TokenOpsError::SignerRejected(_) => ErrorKind::SignerRejected,
            TokenOpsError::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            TokenOpsError::LedgerExecutionFailed { .. } => ErrorKind::LedgerExecutionFailed,
        }
    }

    /// Whether repeating the whole operation cannot cause a duplicate
    /// submission.
    ///
    /// Only read failures qualify. After a `ConfirmationTimeout` the
    /// transaction may still land, so its status must be re-checked first.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, TokenOpsError::RemoteUnavailable(_))
    }

    /// The transaction signature, for errors raised after broadcast.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            TokenOpsError::ConfirmationTimeout { signature }
            | TokenOpsError::LedgerExecutionFailed { signature, .. } => Some(signature),
            _ => None,
        }
    }
}

impl From<SolError> for TokenOpsError {
    fn from(e: SolError) -> Self {
        match e {
            SolError::InvalidAddress(msg) => TokenOpsError::InvalidAddress(msg),
            SolError::InvalidAmount(msg) => TokenOpsError::InvalidAmount(msg),
            SolError::InvalidDecimals(d) => TokenOpsError::InvalidDecimals(d),
            SolError::EmptyTransaction => TokenOpsError::EmptyTransaction,
            SolError::InvalidAccountData(msg) => TokenOpsError::InvalidAccountData(msg),
            other => TokenOpsError::TransactionBuild(other.to_string()),
        }
    }
}

impl From<RpcError> for TokenOpsError {
    fn from(e: RpcError) -> Self {
        TokenOpsError::RemoteUnavailable(e)
    }
}

impl From<SignerError> for TokenOpsError {
    fn from(e: SignerError) -> Self {
        TokenOpsError::SignerRejected(e)
    }
}
