//! Pure SPL token primitives.
//!
//! This crate handles everything about a token operation that can be
//! computed locally: address parsing and associated-token-account
//! derivation, conversion between human amounts and base units, the System,
//! SPL Token and Associated Token Account instructions, transaction assembly
//! and the Solana wire format. Nothing here performs I/O.
//!
//! As with the rest of the workspace we do not pull in `solana-sdk`; the
//! wire format is implemented by hand on top of `ed25519-dalek`,
//! `curve25519-dalek`, `sha2` and `bs58`.

pub mod address;
pub mod error;
pub mod keypair;
pub mod spl_token;
pub mod state;
pub mod transaction;
pub mod units;

pub use address::{address_to_bytes, bytes_to_address, validate_address, Pubkey};
pub use error::SolError;
pub use keypair::Keypair;
pub use spl_token::{
    derive_associated_token_address, InstructionKind, ASSOCIATED_TOKEN_PROGRAM_ID,
    SYSTEM_PROGRAM_ID, SYSVAR_RENT_ID, TOKEN_PROGRAM_ID,
};
pub use state::{Mint, TokenAccount, MINT_SIZE, TOKEN_ACCOUNT_SIZE};
pub use transaction::{
    assemble, partial_sign_wire, transaction_id, AccountMeta, CompiledInstruction, Instruction,
    Message, Transaction,
};
pub use units::{to_base_units, to_base_units_f64, to_human_units, MAX_DECIMALS};
