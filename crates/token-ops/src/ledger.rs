//! The remote ledger contract.
//!
//! Everything the orchestration layer needs from the network goes through
//! [`LedgerClient`]. Production code talks JSON-RPC via
//! [`RpcLedgerClient`](crate::rpc::RpcLedgerClient); tests substitute an
//! in-memory ledger. Reads are never cached: every call hits the service.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sol_token::{Mint, Pubkey, TOKEN_PROGRAM_ID};

use crate::error::{RpcError, TokenOpsError};

/// A transaction signature (Base58), which doubles as the transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Signature {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Signature {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durability levels, weakest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level: {other}")),
        }
    }
}

/// Raw account state as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// Decoded mint record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintInfo {
    pub address: Pubkey,
    pub decimals: u8,
    pub supply: u64,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
}

/// Status of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatus {
    /// Highest commitment level reached so far, if any.
    pub commitment: Option<Commitment>,
    /// Execution error reported by the ledger. A transaction with an error
    /// has landed and failed: that outcome is final.
    pub error: Option<String>,
}

impl TransactionStatus {
    pub fn reached(&self, target: Commitment) -> bool {
        self.commitment.is_some_and(|c| c >= target)
    }
}

/// One entry of an address's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureInfo {
    pub signature: Signature,
    /// Unix timestamp, when the ledger knows it.
    pub block_time: Option<i64>,
    pub confirmation_status: Option<Commitment>,
    pub failed: bool,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch an account. `Ok(None)` means the account does not exist.
    async fn read_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError>;

    /// Lamports needed for an account of `data_len` bytes to be rent exempt.
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError>;

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    /// Submit a fully signed wire transaction.
    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError>;

    /// `Ok(None)` while the ledger has not seen the transaction yet.
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, RpcError>;

    /// Native balance in lamports.
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, RpcError>;

    /// All SPL token accounts owned by `owner`, keyed by account address.
    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, AccountInfo)>, RpcError>;

    /// Most recent signatures involving `address`, newest first.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError>;

    /// Read and decode a mint account.
    async fn get_mint_info(&self, mint: &Pubkey) -> Result<MintInfo, TokenOpsError> {
        let account = self
            .read_account(mint)
            .await?
            .ok_or(TokenOpsError::MintNotFound(*mint))?;

        if account.owner != TOKEN_PROGRAM_ID {
            return Err(TokenOpsError::InvalidAccountData(format!(
                "{mint} is not owned by the token program"
            )));
        }

        let state = Mint::unpack(&account.data)?;
        Ok(MintInfo {
            address: *mint,
            decimals: state.decimals,
            supply: state.supply,
            mint_authority: state.mint_authority,
            freeze_authority: state.freeze_authority,
        })
    }
}
