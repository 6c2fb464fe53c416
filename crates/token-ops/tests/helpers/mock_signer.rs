use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sol_token::{partial_sign_wire, Instruction, Keypair, Pubkey};
use token_ops::{LedgerClient, PreparedTransaction, Signature, SignerError, WalletSigner};

use super::mock_ledger::MockLedger;

/// Wallet stand-in that records every transaction it is asked to approve.
#[derive(Clone)]
pub struct MockSigner {
    keypair: Arc<Keypair>,
    ledger: MockLedger,
    seen: Arc<Mutex<Vec<PreparedTransaction>>>,
    reject: Option<SignerError>,
}

impl MockSigner {
    pub fn new(keypair: Keypair, ledger: MockLedger) -> Self {
        Self {
            keypair: Arc::new(keypair),
            ledger,
            seen: Arc::new(Mutex::new(Vec::new())),
            reject: None,
        }
    }

    pub fn rejecting(mut self, error: SignerError) -> Self {
        self.reject = Some(error);
        self
    }

    pub fn prepared(&self) -> Vec<PreparedTransaction> {
        self.seen.lock().unwrap().clone()
    }

    /// Instructions of the last transaction presented to the wallet.
    pub fn last_instructions(&self) -> Vec<Instruction> {
        let prepared = self.prepared();
        let last = prepared.last().expect("no transaction was presented");
        last.message.decompile().unwrap()
    }
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_and_broadcast(
        &self,
        transaction: &PreparedTransaction,
    ) -> Result<Signature, SignerError> {
        self.seen.lock().unwrap().push(transaction.clone());
        if let Some(error) = &self.reject {
            return Err(error.clone());
        }
        let signed = partial_sign_wire(&self.keypair, &transaction.wire)
            .map_err(|e| SignerError::Failed(e.to_string()))?;
        self.ledger
            .send_transaction(&signed)
            .await
            .map_err(|e| SignerError::Failed(e.to_string()))
    }
}
