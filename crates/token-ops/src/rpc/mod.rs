//! Solana JSON-RPC 2.0 client over HTTP.

mod base64;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sol_token::{Pubkey, TOKEN_PROGRAM_ID};
use tracing::{debug, warn};

use crate::config::TokenOpsConfig;
use crate::error::RpcError;
use crate::ledger::{AccountInfo, Commitment, LedgerClient, Signature, SignatureInfo, TransactionStatus};

/// [`LedgerClient`] backed by a Solana RPC node.
#[derive(Debug)]
pub struct RpcLedgerClient {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(
        url: impl Into<String>,
        commitment: Commitment,
        request_timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &TokenOpsConfig) -> Result<Self, RpcError> {
        Self::new(config.rpc_url(), config.commitment, config.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, url = %self.url, "rpc_request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(method, error = %e, "rpc_send_error");
                RpcError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(method, status = %status, body = %body, "rpc_http_error");
            return Err(RpcError::Transport(format!("http {status}: {body}")));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("{method}: {e}")))?;
        envelope.into_result(method)
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

impl<T> RpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T, RpcError> {
        if let Some(err) = self.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| RpcError::Decode(format!("{method}: response has no result")))
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: (String, String),
    #[serde(default)]
    executable: bool,
}

impl UiAccount {
    fn decode(self) -> Result<AccountInfo, RpcError> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(RpcError::Decode(format!("unexpected account encoding {encoding}")));
        }
        let data = base64::decode(&payload)
            .ok_or_else(|| RpcError::Decode("account data is not valid base64".into()))?;
        let owner = self
            .owner
            .parse()
            .map_err(|e| RpcError::Decode(format!("account owner: {e}")))?;

        Ok(AccountInfo {
            lamports: self.lamports,
            owner,
            data,
            executable: self.executable,
        })
    }
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    pubkey: String,
    account: UiAccount,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSignatureStatus {
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

impl From<UiSignatureStatus> for TransactionStatus {
    fn from(s: UiSignatureStatus) -> Self {
        TransactionStatus {
            commitment: s.confirmation_status,
            error: s.err.map(|e| e.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSignatureInfo {
    signature: String,
    block_time: Option<i64>,
    confirmation_status: Option<Commitment>,
    err: Option<Value>,
}

impl From<UiSignatureInfo> for SignatureInfo {
    fn from(s: UiSignatureInfo) -> Self {
        SignatureInfo {
            signature: Signature::from(s.signature),
            block_time: s.block_time,
            confirmation_status: s.confirmation_status,
            failed: s.err.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// LedgerClient
// ---------------------------------------------------------------------------

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn read_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let response: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment }
                ]),
            )
            .await?;
        response.value.map(UiAccount::decode).transpose()
    }

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, RpcError> {
        self.call(
            "getMinimumBalanceForRentExemption",
            json!([data_len, { "commitment": self.commitment }]),
        )
        .await
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let response: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": self.commitment }]))
            .await?;
        sol_token::address_to_bytes(&response.value.blockhash)
            .map_err(|e| RpcError::Decode(format!("blockhash: {e}")))
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError> {
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    base64::encode(wire),
                    { "encoding": "base64", "preflightCommitment": self.commitment }
                ]),
            )
            .await?;
        Ok(Signature::from(signature))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, RpcError> {
        let response: WithContext<Vec<Option<UiSignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.as_str()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(TransactionStatus::from))
    }

    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, RpcError> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([owner.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(response.value)
    }

    async fn token_accounts_by_owner(
        &self,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, AccountInfo)>, RpcError> {
        let response: WithContext<Vec<KeyedAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "programId": TOKEN_PROGRAM_ID.to_string() },
                    { "encoding": "base64", "commitment": self.commitment }
                ]),
            )
            .await?;

        response
            .value
            .into_iter()
            .map(|keyed| {
                let address = keyed
                    .pubkey
                    .parse()
                    .map_err(|e| RpcError::Decode(format!("token account address: {e}")))?;
                Ok((address, keyed.account.decode()?))
            })
            .collect()
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, RpcError> {
        // History queries do not accept `processed`.
        let commitment = self.commitment.max(Commitment::Confirmed);
        let entries: Vec<UiSignatureInfo> = self
            .call(
                "getSignaturesForAddress",
                json!([address.to_string(), { "limit": limit, "commitment": commitment }]),
            )
            .await?;
        Ok(entries.into_iter().map(SignatureInfo::from).collect())
    }
}
