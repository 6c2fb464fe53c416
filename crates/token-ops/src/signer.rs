//! The external wallet signer contract and a local keypair implementation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sol_token::{partial_sign_wire, Keypair, Message, Pubkey};
use tracing::{debug, info};

use crate::error::{ConfigError, RpcError, SignerError};
use crate::ledger::{LedgerClient, Signature};

/// A compiled transaction ready for the wallet.
///
/// `wire` already carries every ephemeral signature (e.g. a fresh mint
/// keypair); the slot belonging to the wallet is still zeroed.
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub message: Message,
    pub wire: Vec<u8>,
    pub fee_payer: Pubkey,
}

/// The connected wallet: approves, signs and broadcasts transactions.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    async fn sign_and_broadcast(
        &self,
        transaction: &PreparedTransaction,
    ) -> Result<Signature, SignerError>;
}

/// Signs with a local Ed25519 keypair and broadcasts through a ledger client.
pub struct KeypairSigner {
    keypair: Keypair,
    ledger: Arc<dyn LedgerClient>,
}

impl KeypairSigner {
    pub fn from_keypair(keypair: Keypair, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { keypair, ledger }
    }

    /// Load a Solana CLI keypair file: a JSON array of 64 bytes
    /// (secret key followed by public key).
    pub fn from_file(
        path: impl AsRef<Path>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let keypair = parse_keypair_json(&content)?;
        Ok(Self::from_keypair(keypair, ledger))
    }
}

impl std::fmt::Debug for KeypairSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairSigner")
            .field("pubkey", &self.keypair.pubkey())
            .finish_non_exhaustive()
    }
}

pub(crate) fn parse_keypair_json(content: &str) -> Result<Keypair, ConfigError> {
    let bytes: Vec<u8> = serde_json::from_str(content.trim())
        .map_err(|e| ConfigError::Keypair(format!("expected a JSON byte array: {e}")))?;
    Keypair::from_keypair_bytes(&bytes).map_err(|e| ConfigError::Keypair(e.to_string()))
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_broadcast(
        &self,
        transaction: &PreparedTransaction,
    ) -> Result<Signature, SignerError> {
        let signed = partial_sign_wire(&self.keypair, &transaction.wire)
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        debug!(bytes = signed.len(), "keypair_signed");

        let signature = self
            .ledger
            .send_transaction(&signed)
            .await
            .map_err(classify_send_error)?;
        info!(%signature, "transaction_broadcast");
        Ok(signature)
    }
}

/// Preflight simulation reports an underfunded payer as a plain RPC error.
fn classify_send_error(err: RpcError) -> SignerError {
    let text = err.to_string();
    if text.to_ascii_lowercase().contains("insufficient") {
        SignerError::InsufficientFunds(text)
    } else {
        SignerError::Failed(text)
    }
}
