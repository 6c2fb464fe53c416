//! Token operation orchestration on top of `sol-token`.
//!
//! [`TokenOperationOrchestrator`] runs the three write operations (create a
//! mint, mint tokens, send tokens) through a forward-only stage machine and
//! answers the read-side queries (native balance, token balances, recent
//! history). The network and the wallet are reached only through the
//! [`LedgerClient`] and [`WalletSigner`] traits, with [`RpcLedgerClient`]
//! and [`KeypairSigner`] as the provided implementations.

pub mod builder;
pub mod config;
pub mod error;
pub mod existence;
pub mod ledger;
pub mod orchestrator;
pub mod rpc;
pub mod signer;
pub mod stage;
pub mod submitter;

pub use builder::{InstructionBuilder, ResolvedAccount};
pub use config::{Cluster, TokenOpsConfig};
pub use error::{ConfigError, ErrorKind, RpcError, SignerError, TokenOpsError};
pub use existence::AccountExistenceChecker;
pub use ledger::{
    AccountInfo, Commitment, LedgerClient, MintInfo, Signature, SignatureInfo, TransactionStatus,
};
pub use orchestrator::{CreatedMint, TokenBalance, TokenOperationOrchestrator, DEFAULT_HISTORY_LIMIT};
pub use rpc::RpcLedgerClient;
pub use signer::{KeypairSigner, PreparedTransaction, WalletSigner};
pub use stage::{OperationFailure, OperationStage};
pub use submitter::TransactionSubmitter;
