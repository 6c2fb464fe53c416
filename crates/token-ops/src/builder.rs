//! Ordered instruction lists for each token operation.
//!
//! Builders only read the ledger: rent for a new mint and the existence of
//! associated token accounts. Input validation always runs first, so a bad
//! request never costs a network round trip.

use std::sync::Arc;

use sol_token::spl_token;
use sol_token::units::check_decimals;
use sol_token::{
    derive_associated_token_address, Instruction, Pubkey, TokenAccount, MINT_SIZE,
    TOKEN_PROGRAM_ID,
};
use tracing::debug;

use crate::error::TokenOpsError;
use crate::existence::AccountExistenceChecker;
use crate::ledger::LedgerClient;

/// An associated token account and whether the ledger already holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub owner: Pubkey,
    pub address: Pubkey,
    pub exists: bool,
}

pub struct InstructionBuilder {
    ledger: Arc<dyn LedgerClient>,
    existence: AccountExistenceChecker,
}

impl InstructionBuilder {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            existence: AccountExistenceChecker::new(ledger.clone()),
            ledger,
        }
    }

    /// `[create_account, initialize_mint]` for a brand new mint account.
    ///
    /// `mint` must sign the resulting transaction alongside `payer`.
    pub async fn build_create_mint(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        decimals: u8,
        mint_authority: &Pubkey,
        freeze_authority: Option<&Pubkey>,
    ) -> Result<Vec<Instruction>, TokenOpsError> {
        check_decimals(decimals)?;
        require_address("payer", payer)?;
        require_address("mint", mint)?;
        require_address("mint authority", mint_authority)?;
        if let Some(freeze) = freeze_authority {
            require_address("freeze authority", freeze)?;
        }

        let lamports = self
            .ledger
            .minimum_balance_for_rent_exemption(MINT_SIZE)
            .await?;
        debug!(%mint, decimals, lamports, "build_create_mint");

        Ok(vec![
            spl_token::create_account(payer, mint, lamports, MINT_SIZE as u64, &TOKEN_PROGRAM_ID),
            spl_token::initialize_mint(mint, decimals, mint_authority, freeze_authority)?,
        ])
    }

    /// Derive the associated account of `owner` for `mint` and look it up.
    pub async fn resolve_associated_account(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<ResolvedAccount, TokenOpsError> {
        require_address("mint", mint)?;
        require_address("owner", owner)?;

        let address = derive_associated_token_address(owner, mint)?;
        let exists = self.existence.exists(&address).await?;
        if !exists {
            debug!(%address, %owner, "associated_account_missing");
        }
        Ok(ResolvedAccount {
            owner: *owner,
            address,
            exists,
        })
    }

    /// Mint `amount` base units to the associated account of
    /// `destination_owner`, creating that account first when needed.
    ///
    /// The payer is also the mint authority.
    pub async fn build_mint_to(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        destination_owner: &Pubkey,
        amount: u64,
    ) -> Result<Vec<Instruction>, TokenOpsError> {
        require_amount(amount)?;
        require_address("payer", payer)?;
        require_address("destination", destination_owner)?;

        let destination = self.resolve_associated_account(destination_owner, mint).await?;
        self.mint_to_instructions(payer, mint, &destination, amount)
    }

    /// [`build_mint_to`](Self::build_mint_to) for a destination that was
    /// already resolved. Performs no reads.
    pub fn mint_to_instructions(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        destination: &ResolvedAccount,
        amount: u64,
    ) -> Result<Vec<Instruction>, TokenOpsError> {
        require_amount(amount)?;
        require_address("payer", payer)?;
        require_address("mint", mint)?;

        let mut instructions = create_if_missing(payer, destination, mint);
        instructions.push(spl_token::mint_to(mint, &destination.address, payer, amount)?);

        debug!(%mint, destination = %destination.address, amount, count = instructions.len(), "build_mint_to");
        Ok(instructions)
    }

    /// Transfer `amount` base units between the associated accounts of
    /// `source_owner` and `destination_owner`.
    ///
    /// The source account is assumed to exist; see
    /// [`check_source_balance`](Self::check_source_balance) for an explicit
    /// check.
    pub async fn build_transfer(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        source_owner: &Pubkey,
        destination_owner: &Pubkey,
        amount: u64,
    ) -> Result<Vec<Instruction>, TokenOpsError> {
        require_amount(amount)?;
        require_address("payer", payer)?;
        require_address("source", source_owner)?;
        require_address("destination", destination_owner)?;

        let destination = self.resolve_associated_account(destination_owner, mint).await?;
        self.transfer_instructions(payer, mint, source_owner, &destination, amount)
    }

    /// [`build_transfer`](Self::build_transfer) for a destination that was
    /// already resolved. Performs no reads.
    pub fn transfer_instructions(
        &self,
        payer: &Pubkey,
        mint: &Pubkey,
        source_owner: &Pubkey,
        destination: &ResolvedAccount,
        amount: u64,
    ) -> Result<Vec<Instruction>, TokenOpsError> {
        require_amount(amount)?;
        require_address("payer", payer)?;
        require_address("mint", mint)?;
        require_address("source", source_owner)?;

        let source = derive_associated_token_address(source_owner, mint)?;
        let mut instructions = create_if_missing(payer, destination, mint);
        instructions.push(spl_token::transfer(
            &source,
            &destination.address,
            source_owner,
            amount,
        )?);

        debug!(%mint, %source, destination = %destination.address, amount, count = instructions.len(), "build_transfer");
        Ok(instructions)
    }

    /// Verify that `owner` holds at least `amount` base units of `mint`.
    pub async fn check_source_balance(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
        amount: u64,
    ) -> Result<(), TokenOpsError> {
        let source = derive_associated_token_address(owner, mint)?;
        let account = self
            .ledger
            .read_account(&source)
            .await?
            .ok_or(TokenOpsError::SourceAccountMissing(source))?;

        let state = TokenAccount::unpack(&account.data)?;
        if state.amount < amount {
            return Err(TokenOpsError::InsufficientBalance {
                available: state.amount,
                requested: amount,
            });
        }
        Ok(())
    }
}

fn create_if_missing(payer: &Pubkey, account: &ResolvedAccount, mint: &Pubkey) -> Vec<Instruction> {
    if account.exists {
        return Vec::new();
    }
    vec![spl_token::create_associated_token_account(
        payer,
        &account.address,
        &account.owner,
        mint,
    )]
}

fn require_address(role: &str, address: &Pubkey) -> Result<(), TokenOpsError> {
    if address.is_default() {
        return Err(TokenOpsError::InvalidAddress(format!(
            "{role} must not be the default address"
        )));
    }
    Ok(())
}

fn require_amount(amount: u64) -> Result<(), TokenOpsError> {
    if amount == 0 {
        return Err(TokenOpsError::InvalidAmount("amount must be > 0".into()));
    }
    Ok(())
}
