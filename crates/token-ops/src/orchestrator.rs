//! The user-facing token operations.
//!
//! Each entry point validates its input, resolves what it needs from the
//! ledger, builds and assembles the transaction, hands it to the wallet and
//! waits for confirmation. The orchestrator itself keeps no per-operation
//! state, so independent operations may run concurrently on one instance.

use std::sync::Arc;

use serde::Serialize;
use sol_token::units::check_decimals;
use sol_token::{assemble, to_base_units, Keypair, Pubkey, TokenAccount};
use tracing::{info, warn};

use crate::builder::InstructionBuilder;
use crate::config::TokenOpsConfig;
use crate::error::TokenOpsError;
use crate::ledger::{Commitment, LedgerClient, Signature, SignatureInfo};
use crate::signer::WalletSigner;
use crate::stage::{OperationFailure, OperationMachine, OperationStage};
use crate::submitter::TransactionSubmitter;

/// Number of history entries returned when the caller does not choose.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Result of [`TokenOperationOrchestrator::create_token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedMint {
    pub mint: Pubkey,
    pub signature: Signature,
}

/// One SPL token account held by a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalance {
    pub mint: Pubkey,
    pub account: Pubkey,
    /// Base units.
    pub amount: u64,
    pub decimals: u8,
}

pub struct TokenOperationOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn WalletSigner>,
    builder: InstructionBuilder,
    submitter: TransactionSubmitter,
    commitment: Commitment,
    preflight_source_balance: bool,
}

impl TokenOperationOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        signer: Arc<dyn WalletSigner>,
        config: &TokenOpsConfig,
    ) -> Self {
        Self {
            builder: InstructionBuilder::new(ledger.clone()),
            submitter: TransactionSubmitter::from_config(ledger.clone(), signer.clone(), config),
            ledger,
            signer,
            commitment: config.commitment,
            preflight_source_balance: config.preflight_source_balance,
        }
    }

    /// The connected wallet, which pays for every transaction.
    pub fn wallet(&self) -> Pubkey {
        self.signer.pubkey()
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }

    /// Create a new mint with `decimals` precision.
    ///
    /// `authority` becomes both the mint and the freeze authority. A fresh
    /// keypair is generated for the mint account and co-signs locally.
    pub async fn create_token(
        &self,
        decimals: u8,
        authority: &str,
    ) -> Result<CreatedMint, OperationFailure> {
        let mut op = OperationMachine::start("create_token");

        let authority = op.step(OperationStage::Validating, || {
            check_decimals(decimals)?;
            parse_address("authority", authority)
        })?;

        let payer = self.signer.pubkey();
        let mint_keypair = Keypair::generate();
        let mint = mint_keypair.pubkey();

        let instructions = op
            .run(
                OperationStage::Building,
                self.builder
                    .build_create_mint(&payer, &mint, decimals, &authority, Some(&authority)),
            )
            .await?;

        let transaction = op.step(OperationStage::Assembling, || {
            Ok(assemble(instructions, payer)?.with_signer(mint_keypair))
        })?;

        let signature = self.submit(&mut op, &transaction).await?;
        info!(%mint, decimals, %signature, "token_created");
        op.succeed();
        Ok(CreatedMint { mint, signature })
    }

    /// Mint `amount` (human units) of `mint` to `destination_owner`.
    ///
    /// The connected wallet must be the mint authority.
    pub async fn mint_tokens(
        &self,
        mint: &str,
        destination_owner: &str,
        amount: &str,
    ) -> Result<Signature, OperationFailure> {
        let mut op = OperationMachine::start("mint_tokens");

        let (mint, destination_owner) = op.step(OperationStage::Validating, || {
            let mint = parse_address("mint", mint)?;
            let destination = parse_address("destination", destination_owner)?;
            check_amount_syntax(amount)?;
            Ok((mint, destination))
        })?;

        let (base_units, destination) = op
            .run(OperationStage::Resolving, async {
                let base_units = self.resolve_amount(&mint, amount).await?;
                let destination = self
                    .builder
                    .resolve_associated_account(&destination_owner, &mint)
                    .await?;
                Ok::<_, TokenOpsError>((base_units, destination))
            })
            .await?;

        let payer = self.signer.pubkey();
        let instructions = op.step(OperationStage::Building, || {
            self.builder
                .mint_to_instructions(&payer, &mint, &destination, base_units)
        })?;

        let transaction = op.step(OperationStage::Assembling, || {
            Ok(assemble(instructions, payer)?)
        })?;

        let signature = self.submit(&mut op, &transaction).await?;
        info!(%mint, destination = %destination_owner, base_units, %signature, "tokens_minted");
        op.succeed();
        Ok(signature)
    }

    /// Send `amount` (human units) of `mint` from the connected wallet to
    /// `destination_owner`, creating the recipient's token account if needed.
    pub async fn send_tokens(
        &self,
        mint: &str,
        destination_owner: &str,
        amount: &str,
    ) -> Result<Signature, OperationFailure> {
        let mut op = OperationMachine::start("send_tokens");

        let (mint, destination_owner) = op.step(OperationStage::Validating, || {
            let mint = parse_address("mint", mint)?;
            let destination = parse_address("destination", destination_owner)?;
            check_amount_syntax(amount)?;
            Ok((mint, destination))
        })?;

        let source_owner = self.signer.pubkey();
        let (base_units, destination) = op
            .run(OperationStage::Resolving, async {
                let base_units = self.resolve_amount(&mint, amount).await?;
                if self.preflight_source_balance {
                    self.builder
                        .check_source_balance(&mint, &source_owner, base_units)
                        .await?;
                }
                let destination = self
                    .builder
                    .resolve_associated_account(&destination_owner, &mint)
                    .await?;
                Ok::<_, TokenOpsError>((base_units, destination))
            })
            .await?;

        let instructions = op.step(OperationStage::Building, || {
            self.builder.transfer_instructions(
                &source_owner,
                &mint,
                &source_owner,
                &destination,
                base_units,
            )
        })?;

        let transaction = op.step(OperationStage::Assembling, || {
            Ok(assemble(instructions, source_owner)?)
        })?;

        let signature = self.submit(&mut op, &transaction).await?;
        info!(%mint, destination = %destination_owner, base_units, %signature, "tokens_sent");
        op.succeed();
        Ok(signature)
    }

    /// Native balance of `owner` in lamports.
    pub async fn wallet_balance(&self, owner: &str) -> Result<u64, OperationFailure> {
        let mut op = OperationMachine::start("wallet_balance");
        let owner = op.step(OperationStage::Validating, || parse_address("owner", owner))?;
        let lamports = op
            .run(OperationStage::Resolving, async {
                self.ledger.get_balance(&owner).await.map_err(TokenOpsError::from)
            })
            .await?;
        op.succeed();
        Ok(lamports)
    }

    /// Every SPL token account owned by `owner`, with each mint's decimals.
    pub async fn token_balances(&self, owner: &str) -> Result<Vec<TokenBalance>, OperationFailure> {
        let mut op = OperationMachine::start("token_balances");
        let owner = op.step(OperationStage::Validating, || parse_address("owner", owner))?;
        let balances = op
            .run(OperationStage::Resolving, self.collect_balances(&owner))
            .await?;
        op.succeed();
        Ok(balances)
    }

    /// The `limit` most recent transactions touching `owner`, newest first.
    pub async fn recent_history(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, OperationFailure> {
        let mut op = OperationMachine::start("recent_history");
        let owner = op.step(OperationStage::Validating, || parse_address("owner", owner))?;
        let history = op
            .run(OperationStage::Resolving, async {
                self.ledger
                    .signatures_for_address(&owner, limit)
                    .await
                    .map_err(TokenOpsError::from)
            })
            .await?;
        op.succeed();
        Ok(history)
    }

    async fn submit(
        &self,
        op: &mut OperationMachine,
        transaction: &sol_token::Transaction,
    ) -> Result<Signature, OperationFailure> {
        let signature = op
            .run(OperationStage::Submitting, async {
                let prepared = self.submitter.prepare(transaction).await?;
                self.submitter.broadcast(&prepared).await
            })
            .await?;
        op.run(
            OperationStage::Confirming,
            self.submitter.confirm(&signature, self.commitment),
        )
        .await?;
        Ok(signature)
    }

    async fn resolve_amount(&self, mint: &Pubkey, amount: &str) -> Result<u64, TokenOpsError> {
        let info = self.ledger.get_mint_info(mint).await?;
        let base_units = to_base_units(amount, info.decimals)?;
        if base_units == 0 {
            return Err(TokenOpsError::InvalidAmount(format!(
                "{amount} is below the smallest unit of a {}-decimal token",
                info.decimals
            )));
        }
        Ok(base_units)
    }

    async fn collect_balances(&self, owner: &Pubkey) -> Result<Vec<TokenBalance>, TokenOpsError> {
        let accounts = self.ledger.token_accounts_by_owner(owner).await?;
        let mut balances = Vec::with_capacity(accounts.len());

        for (address, account) in accounts {
            let state = match TokenAccount::unpack(&account.data) {
                Ok(state) => state,
                Err(e) => {
                    warn!(%address, error = %e, "skipping_unreadable_token_account");
                    continue;
                }
            };
            let decimals = match balances.iter().find(|b: &&TokenBalance| b.mint == state.mint) {
                Some(known) => known.decimals,
                None => match self.ledger.get_mint_info(&state.mint).await {
                    Ok(info) => info.decimals,
                    // An unreachable ledger fails the listing; a bad mint only its entry.
                    Err(e @ TokenOpsError::RemoteUnavailable(_)) => return Err(e),
                    Err(e) => {
                        warn!(
                            %address,
                            mint = %state.mint,
                            error = %e,
                            "skipping_token_account_with_unreadable_mint"
                        );
                        continue;
                    }
                },
            };
            balances.push(TokenBalance {
                mint: state.mint,
                account: address,
                amount: state.amount,
                decimals,
            });
        }

        Ok(balances)
    }
}

fn parse_address(role: &str, value: &str) -> Result<Pubkey, TokenOpsError> {
    let address: Pubkey = value
        .parse()
        .map_err(|e| TokenOpsError::InvalidAddress(format!("{role}: {e}")))?;
    if address.is_default() {
        return Err(TokenOpsError::InvalidAddress(format!(
            "{role} must not be the default address"
        )));
    }
    Ok(address)
}

/// Syntax and sign check, done before the mint's precision is known.
fn check_amount_syntax(amount: &str) -> Result<(), TokenOpsError> {
    to_base_units(amount, 0)?;
    if !amount.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        return Err(TokenOpsError::InvalidAmount("amount must be > 0".into()));
    }
    Ok(())
}
