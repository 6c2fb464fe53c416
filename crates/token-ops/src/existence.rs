use std::sync::Arc;

use sol_token::Pubkey;
use tracing::debug;

use crate::error::TokenOpsError;
use crate::ledger::LedgerClient;

/// Answers whether an account is present on the ledger.
#[derive(Clone)]
pub struct AccountExistenceChecker {
    ledger: Arc<dyn LedgerClient>,
}

impl AccountExistenceChecker {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// One uncached read. A missing account is `Ok(false)`; only transport
    /// failures are errors.
    pub async fn exists(&self, address: &Pubkey) -> Result<bool, TokenOpsError> {
        let found = self.ledger.read_account(address).await?.is_some();
        debug!(%address, found, "account_exists");
        Ok(found)
    }
}
