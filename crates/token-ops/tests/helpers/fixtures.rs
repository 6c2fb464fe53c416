use sol_token::{Keypair, Pubkey, MINT_SIZE, TOKEN_ACCOUNT_SIZE};
use token_ops::TokenOpsConfig;

pub const RENT_EXEMPT_MINT: u64 = 1_461_600;

pub fn wallet_keypair() -> Keypair {
    Keypair::from_seed(&[0x11; 32])
}

pub fn key(byte: u8) -> Pubkey {
    Pubkey::new_from_array([byte; 32])
}

pub fn test_config() -> TokenOpsConfig {
    TokenOpsConfig {
        confirm_timeout_secs: 5,
        poll_interval_ms: 100,
        ..TokenOpsConfig::default()
    }
}

/// SPL mint layout: COption<authority>, supply, decimals, initialized,
/// COption<freeze authority>.
pub fn pack_mint(decimals: u8, supply: u64, authority: Option<Pubkey>) -> Vec<u8> {
    let mut data = vec![0u8; MINT_SIZE];
    if let Some(authority) = authority {
        data[0..4].copy_from_slice(&1u32.to_le_bytes());
        data[4..36].copy_from_slice(authority.as_bytes());
    }
    data[36..44].copy_from_slice(&supply.to_le_bytes());
    data[44] = decimals;
    data[45] = 1;
    data
}

/// SPL token account layout with `state = initialized`.
pub fn pack_token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_SIZE];
    data[0..32].copy_from_slice(mint.as_bytes());
    data[32..64].copy_from_slice(owner.as_bytes());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data[108] = 1;
    data
}
