use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sol_token::{derive_associated_token_address, transaction_id, Pubkey, TOKEN_PROGRAM_ID};
use tokio::sync::RwLock;
use token_ops::{
    AccountInfo, Commitment, LedgerClient, RpcError, Signature, SignatureInfo, TransactionStatus,
};

use super::fixtures::{pack_mint, pack_token_account, RENT_EXEMPT_MINT};

/// How the ledger reports submitted transactions.
#[derive(Debug, Clone)]
pub enum StatusMode {
    /// Report the transaction at this commitment.
    Reach(Commitment),
    /// Never report the transaction.
    Never,
    /// Report an execution error.
    Fail(String),
    /// Fail this many status reads, then report `Confirmed`.
    FlakyThenConfirm(u32),
}

struct LedgerState {
    accounts: HashMap<Pubkey, AccountInfo>,
    balances: HashMap<Pubkey, u64>,
    history: Vec<SignatureInfo>,
    status_mode: StatusMode,
    fail_reads: bool,
    unreachable: HashSet<Pubkey>,
    reads: usize,
    status_polls: u32,
    sent: Vec<Vec<u8>>,
}

/// In-memory ledger. Clones share state.
#[derive(Clone)]
pub struct MockLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState {
                accounts: HashMap::new(),
                balances: HashMap::new(),
                history: Vec::new(),
                status_mode: StatusMode::Reach(Commitment::Confirmed),
                fail_reads: false,
                unreachable: HashSet::new(),
                reads: 0,
                status_polls: 0,
                sent: Vec::new(),
            })),
        }
    }

    pub async fn add_mint(&self, mint: Pubkey, decimals: u8, authority: Pubkey) {
        let account = AccountInfo {
            lamports: RENT_EXEMPT_MINT,
            owner: TOKEN_PROGRAM_ID,
            data: pack_mint(decimals, 0, Some(authority)),
            executable: false,
        };
        self.state.write().await.accounts.insert(mint, account);
    }

    /// Create the associated token account of `owner` for `mint`.
    pub async fn add_token_account(&self, owner: Pubkey, mint: Pubkey, amount: u64) -> Pubkey {
        let address = derive_associated_token_address(&owner, &mint).unwrap();
        let account = AccountInfo {
            lamports: 2_039_280,
            owner: TOKEN_PROGRAM_ID,
            data: pack_token_account(&mint, &owner, amount),
            executable: false,
        };
        self.state.write().await.accounts.insert(address, account);
        address
    }

    pub async fn insert_account(&self, address: Pubkey, account: AccountInfo) {
        self.state.write().await.accounts.insert(address, account);
    }

    pub async fn set_balance(&self, owner: Pubkey, lamports: u64) {
        self.state.write().await.balances.insert(owner, lamports);
    }

    pub async fn push_history(&self, entry: SignatureInfo) {
        self.state.write().await.history.push(entry);
    }

    pub async fn set_status_mode(&self, mode: StatusMode) {
        self.state.write().await.status_mode = mode;
    }

    /// Make every account read fail with a transport error.
    pub async fn fail_reads(&self, fail: bool) {
        self.state.write().await.fail_reads = fail;
    }

    /// Fail every read of `address` with a transport error.
    pub async fn fail_reads_of(&self, address: Pubkey) {
        self.state.write().await.unreachable.insert(address);
    }

    pub async fn read_count(&self) -> usize {
        self.state.read().await.reads
    }

    pub async fn status_polls(&self) -> u32 {
        self.state.read().await.status_polls
    }

    pub async fn sent_transactions(&self) -> Vec<Vec<u8>> {
        self.state.read().await.sent.clone()
    }

    async fn record_read(&self) -> Result<(), RpcError> {
        let mut state = self.state.write().await;
        state.reads += 1;
        if state.fail_reads {
            return Err(RpcError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn read_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        self.record_read().await?;
        let state = self.state.read().await;
        if state.unreachable.contains(address) {
            return Err(RpcError::Transport(format!("read of {address} timed out")));
        }
        Ok(state.accounts.get(address).cloned())
    }

    async fn minimum_balance_for_rent_exemption(&self, _data_len: usize) -> Result<u64, RpcError> {
        self.record_read().await?;
        Ok(RENT_EXEMPT_MINT)
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        self.record_read().await?;
        Ok([0xBB; 32])
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError> {
        let id = transaction_id(wire).map_err(|e| RpcError::Rpc {
            code: -32602,
            message: e.to_string(),
        })?;
        self.state.write().await.sent.push(wire.to_vec());
        Ok(Signature::from(id))
    }

    async fn signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<Option<TransactionStatus>, RpcError> {
        let mut state = self.state.write().await;
        state.status_polls += 1;
        match state.status_mode.clone() {
            StatusMode::Reach(commitment) => Ok(Some(TransactionStatus {
                commitment: Some(commitment),
                error: None,
            })),
            StatusMode::Never => Ok(None),
            StatusMode::Fail(reason) => Ok(Some(TransactionStatus {
                commitment: Some(Commitment::Confirmed),
                error: Some(reason),
            })),
            StatusMode::FlakyThenConfirm(failures) => {
                if state.status_polls <= failures {
                    Err(RpcError::Transport("timed out".into()))
                } else {
                    Ok(Some(TransactionStatus {
                        commitment: Some(Commitment::Confirmed),
                        error: None,
                    }))
                }
            }
        }
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, RpcError> {
        self.record_read().await?;
        Ok(self.state.read().await.balances.get(owner).copied().unwrap_or(0))
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, AccountInfo)>, RpcError> {
        self.record_read().await?;
        let state = self.state.read().await;
        let mut accounts: Vec<(Pubkey, AccountInfo)> = state
            .accounts
            .iter()
            .filter(|(_, account)| {
                account.owner == TOKEN_PROGRAM_ID
                    && account.data.len() == sol_token::TOKEN_ACCOUNT_SIZE
                    && account.data[32..64] == owner.as_bytes()[..]
            })
            .map(|(address, account)| (*address, account.clone()))
            .collect();
        accounts.sort_by_key(|(address, _)| *address);
        Ok(accounts)
    }

    async fn signatures_for_address(
        &self,
        _address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        self.record_read().await?;
        Ok(self.state.read().await.history.iter().take(limit).cloned().collect())
    }
}
