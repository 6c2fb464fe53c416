//! SPL Token, Associated Token Account and System Program instructions.
//!
//! Every instruction needed to create a mint, mint supply and move balances
//! is encoded here by hand, byte for byte, without the `solana-sdk` or
//! `spl-token` crates. Associated token account (ATA) addresses are derived
//! as program-derived addresses with the same algorithm the on-chain
//! program uses.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::SolError;
use crate::transaction::{AccountMeta, Instruction};
use crate::units;

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// The Solana System Program: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// Rent sysvar: `SysvarRent111111111111111111111111111111111`
pub const SYSVAR_RENT_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xa7, 0xd5, 0x17, 0x19, 0x2c, 0x5c, 0x51, 0x21, 0x8c, 0xc9, 0x4c, 0x3d, 0x4a, 0xf1,
    0x7f, 0x58, 0xda, 0xee, 0x08, 0x9b, 0xa1, 0xfd, 0x44, 0xe3, 0xdb, 0xd9, 0x8a, 0x00, 0x00,
    0x00, 0x00,
]);

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// System Program `CreateAccount` instruction index (u32 LE).
const SYSTEM_CREATE_ACCOUNT_IX_INDEX: u32 = 0;

/// SPL Token instruction tags.
const TOKEN_INITIALIZE_MINT_TAG: u8 = 0;
const TOKEN_TRANSFER_TAG: u8 = 3;
const TOKEN_MINT_TO_TAG: u8 = 7;

/// The kinds of instruction this crate knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    CreateAccount,
    InitializeMint,
    CreateAssociatedAccount,
    MintTo,
    Transfer,
}

impl InstructionKind {
    /// Recognize an instruction produced by the builders in this module.
    pub fn of(ix: &Instruction) -> Option<Self> {
        if ix.program_id == SYSTEM_PROGRAM_ID {
            let index = ix.data.get(..4)?;
            return (index == SYSTEM_CREATE_ACCOUNT_IX_INDEX.to_le_bytes())
                .then_some(Self::CreateAccount);
        }
        if ix.program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
            return Some(Self::CreateAssociatedAccount);
        }
        if ix.program_id == TOKEN_PROGRAM_ID {
            return match *ix.data.first()? {
                TOKEN_INITIALIZE_MINT_TAG => Some(Self::InitializeMint),
                TOKEN_TRANSFER_TAG => Some(Self::Transfer),
                TOKEN_MINT_TO_TAG => Some(Self::MintTo),
                _ => None,
            };
        }
        None
    }
}

// ---------------------------------------------------------------------------
// System Program
// ---------------------------------------------------------------------------

/// Build a System Program `CreateAccount` instruction.
///
/// Both the payer and the new account must sign: the new account proves the
/// caller holds its private key, which is why a fresh mint keypair is
/// generated per create-mint operation.
///
/// # Wire format
///
/// u32 LE index (0) + u64 LE lamports + u64 LE space + 32-byte owner = 52 bytes.
pub fn create_account(
    payer: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner_program: &Pubkey,
) -> Instruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&SYSTEM_CREATE_ACCOUNT_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner_program.as_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*new_account, true),
        ],
        data,
    }
}

// ---------------------------------------------------------------------------
// SPL Token
// ---------------------------------------------------------------------------

/// Build an SPL Token `InitializeMint` instruction.
///
/// # Wire format
///
/// `[0, decimals] ++ mint_authority(32) ++ COption<freeze_authority>`, where
/// the option is a single `0` byte when absent or `1` followed by 32 bytes
/// when present (35 or 67 bytes in total).
pub fn initialize_mint(
    mint: &Pubkey,
    decimals: u8,
    mint_authority: &Pubkey,
    freeze_authority: Option<&Pubkey>,
) -> Result<Instruction, SolError> {
    units::check_decimals(decimals)?;

    let mut data = Vec::with_capacity(67);
    data.push(TOKEN_INITIALIZE_MINT_TAG);
    data.push(decimals);
    data.extend_from_slice(mint_authority.as_bytes());
    match freeze_authority {
        Some(authority) => {
            data.push(1);
            data.extend_from_slice(authority.as_bytes());
        }
        None => data.push(0),
    }

    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new_readonly(SYSVAR_RENT_ID, false),
        ],
        data,
    })
}

/// Build an SPL Token `MintTo` instruction.
///
/// `[7] ++ amount(u64 LE)`, 9 bytes. The mint authority must sign.
pub fn mint_to(
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, SolError> {
    if amount == 0 {
        return Err(SolError::InvalidAmount("mint amount must be > 0".into()));
    }

    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*mint, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*authority, true),
        ],
        data: amount_data(TOKEN_MINT_TO_TAG, amount),
    })
}

/// Build an SPL Token `Transfer` instruction.
///
/// This transfers `amount` of the smallest token unit (e.g. for a token with
/// 6 decimals, `amount = 1_000_000` transfers 1 whole token).
///
/// # Wire format
///
/// SPL Token `Transfer` instruction index = 3, followed by u64 LE amount.
/// Total data: 9 bytes.
pub fn transfer(
    source: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<Instruction, SolError> {
    if amount == 0 {
        return Err(SolError::InvalidAmount(
            "transfer amount must be > 0".into(),
        ));
    }

    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*source, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(*owner, true),
        ],
        data: amount_data(TOKEN_TRANSFER_TAG, amount),
    })
}

fn amount_data(tag: u8, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(9);
    data.push(tag);
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

// ---------------------------------------------------------------------------
// Associated Token Account program
// ---------------------------------------------------------------------------

/// Build an Associated Token Account `Create` instruction.
///
/// The instruction data is empty (the legacy `Create` form): the program
/// fails if the account already exists, so callers check existence first.
pub fn create_associated_token_account(
    payer: &Pubkey,
    associated_account: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*associated_account, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: Vec::new(),
    }
}

/// Derive the associated token account address for a wallet + mint pair.
///
/// The ATA is a Program Derived Address (PDA) with seeds:
///   `[wallet_address, token_program_id, mint_address]`
/// derived from the Associated Token Account program.
///
/// The derivation searches for a bump seed (255 down to 0) such that the
/// resulting point is NOT on the Ed25519 curve.
pub fn derive_associated_token_address(
    wallet: &Pubkey,
    mint: &Pubkey,
) -> Result<Pubkey, SolError> {
    find_program_address(
        &[wallet.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SolError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (invalid PDA, try next bump).
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &Pubkey,
) -> Option<Pubkey> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(Pubkey::new_from_array(hash))
}

/// Uses `curve25519-dalek` to attempt decompression. If it succeeds, the
/// point is on the curve.
fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    // -- Constant verification ----------------------------------------------

    #[test]
    fn program_ids_match_their_base58_names() {
        assert_eq!(TOKEN_PROGRAM_ID.to_string(), "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
        assert_eq!(
            ASSOCIATED_TOKEN_PROGRAM_ID.to_string(),
            "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL"
        );
        assert_eq!(SYSVAR_RENT_ID.to_string(), "SysvarRent111111111111111111111111111111111");
        assert_eq!(SYSTEM_PROGRAM_ID.to_string(), "11111111111111111111111111111111");
    }

    // -- System CreateAccount -----------------------------------------------

    #[test]
    fn create_account_layout() {
        let ix = create_account(&key(1), &key(2), 1_461_600, 82, &TOKEN_PROGRAM_ID);

        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.data.len(), 52);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(&ix.data[4..12], &1_461_600u64.to_le_bytes());
        assert_eq!(&ix.data[12..20], &82u64.to_le_bytes());
        assert_eq!(&ix.data[20..], TOKEN_PROGRAM_ID.as_bytes());

        // Payer and new account both sign and are writable.
        assert!(ix.accounts.iter().all(|m| m.is_signer && m.is_writable));
        assert_eq!(InstructionKind::of(&ix), Some(InstructionKind::CreateAccount));
    }

    // -- InitializeMint -----------------------------------------------------

    #[test]
    fn initialize_mint_with_freeze_authority() {
        let ix = initialize_mint(&key(1), 9, &key(2), Some(&key(3))).unwrap();

        assert_eq!(ix.data.len(), 67);
        assert_eq!(ix.data[0], 0);
        assert_eq!(ix.data[1], 9);
        assert_eq!(&ix.data[2..34], key(2).as_bytes());
        assert_eq!(ix.data[34], 1);
        assert_eq!(&ix.data[35..], key(3).as_bytes());

        assert_eq!(ix.accounts[0].pubkey, key(1));
        assert!(ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, SYSVAR_RENT_ID);
        assert!(!ix.accounts[1].is_writable);
    }

    #[test]
    fn initialize_mint_without_freeze_authority() {
        let ix = initialize_mint(&key(1), 0, &key(2), None).unwrap();
        assert_eq!(ix.data.len(), 35);
        assert_eq!(ix.data[34], 0);
        assert_eq!(InstructionKind::of(&ix), Some(InstructionKind::InitializeMint));
    }

    #[test]
    fn initialize_mint_rejects_decimals_above_nine() {
        let err = initialize_mint(&key(1), 10, &key(2), None).unwrap_err();
        assert_eq!(err, SolError::InvalidDecimals(10));
    }

    // -- MintTo / Transfer --------------------------------------------------

    #[test]
    fn mint_to_encoding_and_roles() {
        let ix = mint_to(&key(1), &key(2), &key(3), 2_500_000_000).unwrap();

        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(ix.data[0], 7);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 2_500_000_000);

        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_signer && !ix.accounts[2].is_writable);
        assert_eq!(InstructionKind::of(&ix), Some(InstructionKind::MintTo));
    }

    #[test]
    fn transfer_data_encoding() {
        let ix = transfer(&key(1), &key(2), &key(3), 500_000).unwrap();

        assert_eq!(ix.data.len(), 9);
        assert_eq!(ix.data[0], 3);
        let encoded_amount = u64::from_le_bytes(ix.data[1..9].try_into().unwrap());
        assert_eq!(encoded_amount, 500_000);
        assert_eq!(InstructionKind::of(&ix), Some(InstructionKind::Transfer));
    }

    #[test]
    fn transfer_account_roles() {
        let ix = transfer(&key(1), &key(2), &key(3), 100).unwrap();

        assert_eq!(ix.accounts.len(), 3);
        assert!(ix.accounts[0].is_writable);
        assert!(!ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_writable);
        assert!(!ix.accounts[1].is_signer);
        assert!(ix.accounts[2].is_signer);
        assert!(!ix.accounts[2].is_writable);
    }

    #[test]
    fn zero_amounts_fail() {
        assert!(matches!(
            transfer(&key(1), &key(2), &key(3), 0),
            Err(SolError::InvalidAmount(_))
        ));
        assert!(matches!(
            mint_to(&key(1), &key(2), &key(3), 0),
            Err(SolError::InvalidAmount(_))
        ));
    }

    #[test]
    fn max_amount_is_accepted() {
        let ix = transfer(&key(1), &key(2), &key(3), u64::MAX).unwrap();
        assert_eq!(&ix.data[1..], &u64::MAX.to_le_bytes());
    }

    // -- Associated token account -------------------------------------------

    #[test]
    fn create_ata_accounts() {
        let ix = create_associated_token_account(&key(1), &key(2), &key(3), &key(4));

        assert!(ix.data.is_empty());
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![key(1), key(2), key(3), key(4), SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID]
        );
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(!ix.accounts[1].is_signer && ix.accounts[1].is_writable);
        assert!(ix.accounts[2..].iter().all(|m| !m.is_signer && !m.is_writable));
        assert_eq!(
            InstructionKind::of(&ix),
            Some(InstructionKind::CreateAssociatedAccount)
        );
    }

    #[test]
    fn unknown_instruction_is_not_classified() {
        let ix = Instruction {
            program_id: key(9),
            accounts: vec![],
            data: vec![1],
        };
        assert_eq!(InstructionKind::of(&ix), None);
    }

    // -- PDA derivation -----------------------------------------------------

    #[test]
    fn pda_is_not_on_curve() {
        let ata = derive_associated_token_address(&key(0xAA), &key(0xBB)).unwrap();
        assert!(!is_on_curve(ata.as_bytes()), "PDA must NOT be on the Ed25519 curve");
    }

    #[test]
    fn pda_derivation_is_deterministic() {
        let ata1 = derive_associated_token_address(&key(0x11), &key(0x22)).unwrap();
        let ata2 = derive_associated_token_address(&key(0x11), &key(0x22)).unwrap();
        assert_eq!(ata1, ata2);
    }

    #[test]
    fn pda_different_wallets_give_different_atas() {
        let ata_a = derive_associated_token_address(&key(0x01), &key(0xFF)).unwrap();
        let ata_b = derive_associated_token_address(&key(0x02), &key(0xFF)).unwrap();
        assert_ne!(ata_a, ata_b);
    }

    #[test]
    fn pda_different_mints_give_different_atas() {
        let ata_a = derive_associated_token_address(&key(0xAA), &key(0x01)).unwrap();
        let ata_b = derive_associated_token_address(&key(0xAA), &key(0x02)).unwrap();
        assert_ne!(ata_a, ata_b);
    }

    #[test]
    fn is_on_curve_accepts_basepoint() {
        // The Ed25519 basepoint (compressed form).
        let mut basepoint = [0x66u8; 32];
        basepoint[0] = 0x58;
        assert!(is_on_curve(&basepoint));
    }

    #[test]
    fn derive_ata_for_usdc_mint() {
        let usdc_mint: Pubkey = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".parse().unwrap();
        let ata = derive_associated_token_address(&key(0x42), &usdc_mint).unwrap();

        assert!(!is_on_curve(ata.as_bytes()));
        assert_ne!(ata, usdc_mint);
        assert_eq!(ata.to_string(), "4pw5VSwn2Sec4SjMhbUSBcVjS51rG34Ho1WuHQgxqVd2");

        let (_, bump) = find_program_address(
            &[key(0x42).as_ref(), TOKEN_PROGRAM_ID.as_ref(), usdc_mint.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        )
        .unwrap();
        assert_eq!(bump, 250);
    }
}
