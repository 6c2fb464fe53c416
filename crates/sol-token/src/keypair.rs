//! Ed25519 keypairs for local signing.
//!
//! Only two kinds of keys ever live in this process: the throwaway keypair
//! of a freshly created mint account, and (in the CLI) a wallet key loaded
//! from a Solana CLI keypair file. The signing key is zeroized on drop by
//! `ed25519-dalek`.

use std::fmt;

use ed25519_dalek::Signer;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::address::Pubkey;
use crate::error::SolError;

pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a new random keypair from the OS entropy source.
    pub fn generate() -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut OsRng),
        }
    }

    /// Build a keypair from a 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut seed = *seed;
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    /// Parse the 64-byte `seed || pubkey` layout used by Solana keypair files.
    ///
    /// The embedded public key must match the one derived from the seed.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        let mut arr: [u8; 64] = bytes.try_into().map_err(|_| {
            SolError::InvalidPrivateKey(format!("expected 64 bytes, got {}", bytes.len()))
        })?;
        let result = ed25519_dalek::SigningKey::from_keypair_bytes(&arr)
            .map_err(|e| SolError::InvalidPrivateKey(e.to_string()));
        arr.zeroize();
        Ok(Self {
            signing_key: result?,
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign an arbitrary message, returning the raw 64-byte signature.
    pub fn sign_message(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
