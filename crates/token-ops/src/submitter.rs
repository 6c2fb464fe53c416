//! Hand transactions to the wallet and wait for the ledger to confirm them.

use std::sync::Arc;
use std::time::Duration;

use sol_token::Transaction;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TokenOpsConfig;
use crate::error::TokenOpsError;
use crate::ledger::{Commitment, LedgerClient, Signature};
use crate::signer::{PreparedTransaction, WalletSigner};

pub struct TransactionSubmitter {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn WalletSigner>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl TransactionSubmitter {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn WalletSigner>,
        confirm_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            signer,
            confirm_timeout,
            // tokio intervals panic on a zero period
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn WalletSigner>,
        config: &TokenOpsConfig,
    ) -> Self {
        Self::new(ledger, signer, config.confirm_timeout(), config.poll_interval())
    }

    /// Broadcast and wait for `commitment`. Never resubmits.
    pub async fn submit(
        &self,
        transaction: &Transaction,
        commitment: Commitment,
    ) -> Result<Signature, TokenOpsError> {
        let prepared = self.prepare(transaction).await?;
        let signature = self.broadcast(&prepared).await?;
        self.confirm(&signature, commitment).await?;
        Ok(signature)
    }

    /// Fetch a blockhash, compile, and apply the local co-signatures.
    pub async fn prepare(&self, transaction: &Transaction) -> Result<PreparedTransaction, TokenOpsError> {
        let blockhash = self.ledger.latest_blockhash().await?;
        let (message, wire) = transaction.prepare(&blockhash)?;
        debug!(
            signers = message.num_required_signatures,
            accounts = message.account_keys.len(),
            bytes = wire.len(),
            "transaction_prepared"
        );
        Ok(PreparedTransaction {
            message,
            wire,
            fee_payer: *transaction.fee_payer(),
        })
    }

    /// Pass the prepared transaction to the wallet for signing and sending.
    pub async fn broadcast(&self, prepared: &PreparedTransaction) -> Result<Signature, TokenOpsError> {
        let signature = self.signer.sign_and_broadcast(prepared).await?;
        info!(%signature, fee_payer = %prepared.fee_payer, "transaction_submitted");
        Ok(signature)
    }

    /// Poll until `signature` reaches `commitment`, fails on the ledger, or
    /// the confirmation timeout elapses.
    ///
    /// Dropping the returned future stops polling; it cannot recall the
    /// transaction. Read errors while polling are transient and ignored.
    pub async fn confirm(
        &self,
        signature: &Signature,
        commitment: Commitment,
    ) -> Result<(), TokenOpsError> {
        let outcome = timeout(self.confirm_timeout, self.poll(signature, commitment)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(%signature, timeout = ?self.confirm_timeout, "confirmation_timeout");
                Err(TokenOpsError::ConfirmationTimeout {
                    signature: signature.clone(),
                })
            }
        }
    }

    async fn poll(&self, signature: &Signature, commitment: Commitment) -> Result<(), TokenOpsError> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts: u32 = 0;

        loop {
            ticker.tick().await;
            attempts += 1;

            match self.ledger.signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(reason) = status.error {
                        warn!(%signature, %reason, "transaction_failed");
                        return Err(TokenOpsError::LedgerExecutionFailed {
                            signature: signature.clone(),
                            reason,
                        });
                    }
                    if status.reached(commitment) {
                        info!(%signature, %commitment, attempts, "transaction_confirmed");
                        return Ok(());
                    }
                    debug!(%signature, status = ?status.commitment, attempts, "awaiting_commitment");
                }
                Ok(None) => debug!(%signature, attempts, "signature_not_found_yet"),
                Err(e) => warn!(%signature, error = %e, attempts, "status_poll_failed"),
            }
        }
    }
}
