//! Read-only views of SPL Token account data.
//!
//! Layouts (little-endian, `COption` = u32 tag + payload):
//!
//! ```text
//! Mint (82 bytes)
//!   0..36   mint_authority     COption<Pubkey>
//!   36..44  supply             u64
//!   44      decimals           u8
//!   45      is_initialized     bool
//!   46..82  freeze_authority   COption<Pubkey>
//!
//! Account (165 bytes)
//!   0..32   mint               Pubkey
//!   32..64  owner              Pubkey
//!   64..72  amount             u64
//!   72..108 delegate           COption<Pubkey>
//!   108     state              u8 (0 uninitialized, 1 initialized, 2 frozen)
//!   ...     native / delegated_amount / close_authority
//! ```

use serde::Serialize;

use crate::address::Pubkey;
use crate::error::SolError;

/// Size of a mint account, used for `CreateAccount` space and rent.
pub const MINT_SIZE: usize = 82;

/// Size of a token account.
pub const TOKEN_ACCOUNT_SIZE: usize = 165;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mint {
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<Pubkey>,
}

impl Mint {
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        if data.len() < MINT_SIZE {
            return Err(SolError::InvalidAccountData(format!(
                "mint data is {} bytes, expected {MINT_SIZE}",
                data.len()
            )));
        }

        let mint = Self {
            mint_authority: read_coption_pubkey(&data[0..36])?,
            supply: read_u64(&data[36..44]),
            decimals: data[44],
            is_initialized: data[45] != 0,
            freeze_authority: read_coption_pubkey(&data[46..82])?,
        };

        if !mint.is_initialized {
            return Err(SolError::InvalidAccountData("mint is not initialized".into()));
        }
        Ok(mint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub is_frozen: bool,
}

impl TokenAccount {
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        if data.len() < TOKEN_ACCOUNT_SIZE {
            return Err(SolError::InvalidAccountData(format!(
                "token account data is {} bytes, expected {TOKEN_ACCOUNT_SIZE}",
                data.len()
            )));
        }

        let state = data[108];
        if state == 0 {
            return Err(SolError::InvalidAccountData(
                "token account is not initialized".into(),
            ));
        }

        Ok(Self {
            mint: read_pubkey(&data[0..32]),
            owner: read_pubkey(&data[32..64]),
            amount: read_u64(&data[64..72]),
            is_frozen: state == 2,
        })
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

fn read_pubkey(bytes: &[u8]) -> Pubkey {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(&bytes[..32]);
    Pubkey::new_from_array(buf)
}

fn read_coption_pubkey(bytes: &[u8]) -> Result<Option<Pubkey>, SolError> {
    match bytes[..4] {
        [0, 0, 0, 0] => Ok(None),
        [1, 0, 0, 0] => Ok(Some(read_pubkey(&bytes[4..36]))),
        _ => Err(SolError::InvalidAccountData("invalid COption tag".into())),
    }
}
