//! Transaction assembly and the Solana wire format.
//!
//! We build Solana transactions entirely by hand, no `solana-sdk` dependency.
//! The wire format is a compact binary layout documented here:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```
//!
//! A [`Transaction`] is the assembled, blockhash-free form: fee payer,
//! ordered instructions and any local co-signers. It is compiled into a
//! [`Message`] only at submission time, once a recent blockhash is known.

use crate::address::Pubkey;
use crate::error::SolError;
use crate::keypair::Keypair;

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes (max 0x1_ffff, but u16 caps at 0xffff)
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    let value = u16::try_from(value)
        .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()))?;

    Ok((value, consumed))
}

fn compact_len(len: usize, what: &str) -> Result<Vec<u8>, SolError> {
    let len = u16::try_from(len)
        .map_err(|_| SolError::SerializationError(format!("too many {what}: {len}")))?;
    Ok(encode_compact_u16(len))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    /// A writable account reference.
    pub fn new(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    /// A read-only account reference.
    pub fn new_readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A Solana instruction (before it is compiled into a message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

/// An assembled transaction: fee payer plus instructions in execution order.
///
/// Local co-signers (for example the keypair of a mint account being created
/// in the same transaction) travel with it and sign during [`prepare`].
///
/// [`prepare`]: Transaction::prepare
#[derive(Debug)]
pub struct Transaction {
    fee_payer: Pubkey,
    instructions: Vec<Instruction>,
    local_signers: Vec<Keypair>,
}

/// A compiled message where account references are replaced by indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers (fee payer first)
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Pubkey>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    pub instructions: Vec<CompiledInstruction>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the message's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Package an ordered instruction list and a fee payer into a transaction.
///
/// The order of `instructions` is kept exactly: the ledger executes them
/// sequentially, so an account-creation instruction placed first is visible
/// to everything after it. An empty list is rejected.
pub fn assemble(instructions: Vec<Instruction>, fee_payer: Pubkey) -> Result<Transaction, SolError> {
    if instructions.is_empty() {
        return Err(SolError::EmptyTransaction);
    }
    if fee_payer.is_default() {
        return Err(SolError::InvalidAddress(
            "fee payer must not be the default address".into(),
        ));
    }

    Ok(Transaction {
        fee_payer,
        instructions,
        local_signers: Vec::new(),
    })
}

impl Transaction {
    pub fn fee_payer(&self) -> &Pubkey {
        &self.fee_payer
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Attach a local co-signer whose signature is applied by [`prepare`].
    ///
    /// [`prepare`]: Transaction::prepare
    pub fn with_signer(mut self, signer: Keypair) -> Self {
        self.local_signers.push(signer);
        self
    }

    pub fn local_signers(&self) -> impl Iterator<Item = Pubkey> + '_ {
        self.local_signers.iter().map(Keypair::pubkey)
    }

    /// Every account that must sign, fee payer first.
    pub fn required_signers(&self) -> Vec<Pubkey> {
        self.ordered_accounts()
            .into_iter()
            .filter(|e| e.is_signer)
            .map(|e| e.pubkey)
            .collect()
    }

    /// Compile against a recent blockhash.
    pub fn compile(&self, recent_blockhash: &[u8; 32]) -> Result<Message, SolError> {
        let entries = self.ordered_accounts();
        if entries.len() > 256 {
            return Err(SolError::TransactionBuildError(format!(
                "too many accounts: {}",
                entries.len()
            )));
        }

        let count = |pred: fn(&AccountEntry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
        let num_required_signatures = count(|e| e.is_signer);
        let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
        let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

        let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
        let index_of = |key: &Pubkey| -> Result<u8, SolError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or_else(|| {
                    SolError::TransactionBuildError(format!("{key} not in account keys"))
                })
        };

        let mut compiled = Vec::with_capacity(self.instructions.len());
        for ix in &self.instructions {
            let program_id_index = index_of(&ix.program_id)?;
            let account_indices = ix
                .accounts
                .iter()
                .map(|meta| index_of(&meta.pubkey))
                .collect::<Result<Vec<u8>, _>>()?;

            compiled.push(CompiledInstruction {
                program_id_index,
                account_indices,
                data: ix.data.clone(),
            });
        }

        Ok(Message {
            account_keys,
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            recent_blockhash: *recent_blockhash,
            instructions: compiled,
        })
    }

    /// Compile, serialize and apply all local signatures.
    ///
    /// Returns the compiled message together with wire bytes in which every
    /// signature slot not owned by a local signer is still zeroed, ready for
    /// the wallet to fill in its own.
    pub fn prepare(&self, recent_blockhash: &[u8; 32]) -> Result<(Message, Vec<u8>), SolError> {
        let message = self.compile(recent_blockhash)?;
        let mut wire = message.to_unsigned_wire()?;
        for signer in &self.local_signers {
            wire = partial_sign_wire(signer, &wire)?;
        }
        Ok((message, wire))
    }

    fn ordered_accounts(&self) -> Vec<AccountEntry> {
        // Instruction account lists are tiny, so a linear scan is enough.
        let mut entries: Vec<AccountEntry> = Vec::new();

        let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            } else {
                entries.push(AccountEntry {
                    pubkey,
                    is_signer: signer,
                    is_writable: writable,
                });
            }
        };

        // Fee payer is always signer + writable.
        upsert(self.fee_payer, true, true);

        for ix in &self.instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            // Program IDs are non-signer, read-only accounts.
            upsert(ix.program_id, false, false);
        }

        // Stable sort: within a category insertion order is kept, so the fee
        // payer (inserted first, rank 0) stays at index 0.
        entries.sort_by_key(AccountEntry::rank);
        entries
    }
}

struct AccountEntry {
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl AccountEntry {
    fn rank(&self) -> u8 {
        match (self.is_signer, self.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Message serialization
// ---------------------------------------------------------------------------

impl Message {
    /// The accounts that must sign, in signature-slot order.
    pub fn signers(&self) -> &[Pubkey] {
        &self.account_keys[..self.num_required_signatures as usize]
    }

    /// Serialize the message (the bytes that get signed).
    pub fn serialize(&self) -> Result<Vec<u8>, SolError> {
        let mut buf = Vec::with_capacity(256);

        buf.push(self.num_required_signatures);
        buf.push(self.num_readonly_signed);
        buf.push(self.num_readonly_unsigned);

        buf.extend_from_slice(&compact_len(self.account_keys.len(), "account keys")?);
        for key in &self.account_keys {
            buf.extend_from_slice(key.as_bytes());
        }

        buf.extend_from_slice(&self.recent_blockhash);

        buf.extend_from_slice(&compact_len(self.instructions.len(), "instructions")?);
        for ix in &self.instructions {
            buf.push(ix.program_id_index);

            buf.extend_from_slice(&compact_len(ix.account_indices.len(), "instruction accounts")?);
            buf.extend_from_slice(&ix.account_indices);

            buf.extend_from_slice(&compact_len(ix.data.len(), "instruction data bytes")?);
            buf.extend_from_slice(&ix.data);
        }

        Ok(buf)
    }

    /// Wire bytes with one zeroed 64-byte slot per required signature.
    pub fn to_unsigned_wire(&self) -> Result<Vec<u8>, SolError> {
        let message = self.serialize()?;
        let slots = self.num_required_signatures as usize;

        let mut wire = Vec::with_capacity(3 + slots * 64 + message.len());
        wire.extend_from_slice(&encode_compact_u16(slots as u16));
        wire.resize(wire.len() + slots * 64, 0);
        wire.extend_from_slice(&message);
        Ok(wire)
    }

    /// Rebuild the instruction list, with signer/writable flags recovered
    /// from the message header.
    pub fn decompile(&self) -> Result<Vec<Instruction>, SolError> {
        let total = self.account_keys.len();
        let signed = self.num_required_signatures as usize;
        let writable_signed = signed.saturating_sub(self.num_readonly_signed as usize);
        let writable_unsigned_end = total.saturating_sub(self.num_readonly_unsigned as usize);

        let key_at = |index: u8| -> Result<Pubkey, SolError> {
            self.account_keys.get(index as usize).copied().ok_or_else(|| {
                SolError::SerializationError(format!("account index {index} out of range"))
            })
        };

        self.instructions
            .iter()
            .map(|ix| {
                let accounts = ix
                    .account_indices
                    .iter()
                    .map(|&i| {
                        let idx = i as usize;
                        Ok(AccountMeta {
                            pubkey: key_at(i)?,
                            is_signer: idx < signed,
                            is_writable: if idx < signed {
                                idx < writable_signed
                            } else {
                                idx < writable_unsigned_end
                            },
                        })
                    })
                    .collect::<Result<Vec<_>, SolError>>()?;

                Ok(Instruction {
                    program_id: key_at(ix.program_id_index)?,
                    accounts,
                    data: ix.data.clone(),
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Signing pre-built wire transactions
// ---------------------------------------------------------------------------

/// Locate the signature slots and message inside wire bytes.
///
/// Returns `(num_signatures, offset_of_first_slot, offset_of_message)`.
fn split_wire(raw_tx: &[u8]) -> Result<(usize, usize, usize), SolError> {
    let (num_sigs, compact_len) = decode_compact_u16(raw_tx)?;

    if num_sigs == 0 {
        return Err(SolError::TransactionBuildError(
            "transaction has zero signatures".into(),
        ));
    }

    let sigs_start = compact_len;
    let sigs_end = sigs_start + (num_sigs as usize) * 64;

    if sigs_end > raw_tx.len() {
        return Err(SolError::SerializationError(
            "transaction too short: signature slots exceed length".into(),
        ));
    }
    if raw_tx.len() - sigs_end < 4 {
        return Err(SolError::SerializationError(
            "transaction message too short".into(),
        ));
    }

    Ok((num_sigs as usize, sigs_start, sigs_end))
}

/// Fill the signature slot belonging to `signer` in a wire transaction.
///
/// The function:
///
/// 1. Parses the wire format to locate the signature slots and the message.
/// 2. Finds which signature slot corresponds to the signer's public key.
/// 3. Signs the message bytes and writes the signature into that slot.
///
/// Other slots are left untouched, so several parties can sign in any order.
/// If the key is not among the transaction's signers, an error is returned.
pub fn partial_sign_wire(signer: &Keypair, raw_tx: &[u8]) -> Result<Vec<u8>, SolError> {
    let our_pubkey = signer.pubkey();
    let (num_sigs, sigs_start, sigs_end) = split_wire(raw_tx)?;
    let message_bytes = &raw_tx[sigs_end..];

    // Message header: num_required_signatures(u8) | num_readonly_signed(u8) | num_readonly_unsigned(u8)
    let num_required_sigs = message_bytes[0] as usize;
    let (num_accounts, accounts_compact_len) = decode_compact_u16(&message_bytes[3..])?;

    let accounts_start = 3 + accounts_compact_len;
    let accounts_end = accounts_start + (num_accounts as usize) * 32;

    if accounts_end > message_bytes.len() {
        return Err(SolError::SerializationError(
            "transaction message too short for account keys".into(),
        ));
    }

    let signer_idx = (0..num_required_sigs.min(num_accounts as usize))
        .find(|i| {
            let key_start = accounts_start + i * 32;
            message_bytes[key_start..key_start + 32] == *our_pubkey.as_bytes()
        })
        .ok_or_else(|| {
            SolError::SigningError(format!("{our_pubkey} not found in transaction signers"))
        })?;

    if signer_idx >= num_sigs {
        return Err(SolError::SerializationError(format!(
            "signer index {signer_idx} exceeds the {num_sigs} signature slots"
        )));
    }

    let signature = signer.sign_message(message_bytes);

    let mut signed_tx = raw_tx.to_vec();
    let sig_offset = sigs_start + signer_idx * 64;
    signed_tx[sig_offset..sig_offset + 64].copy_from_slice(&signature);

    Ok(signed_tx)
}

/// The first signature of a wire transaction, Base58-encoded.
///
/// This is the fee payer's signature, which the ledger uses as the
/// transaction identifier. Fails if the slot is still zeroed.
pub fn transaction_id(raw_tx: &[u8]) -> Result<String, SolError> {
    let (_, sigs_start, _) = split_wire(raw_tx)?;
    let slot = &raw_tx[sigs_start..sigs_start + 64];
    if slot.iter().all(|&b| b == 0) {
        return Err(SolError::SigningError("fee payer has not signed".into()));
    }
    Ok(bs58::encode(slot).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spl_token::{self, InstructionKind, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};

    fn key(byte: u8) -> Pubkey {
        Pubkey::new_from_array([byte; 32])
    }

    fn sample_transfer(payer: Pubkey) -> Instruction {
        spl_token::transfer(&key(0xA1), &key(0xA2), &payer, 100).unwrap()
    }

    // -- compact-u16 encoding -----------------------------------------------

    #[test]
    fn compact_u16_boundaries() {
        assert_eq!(encode_compact_u16(0), vec![0x00]);
        assert_eq!(encode_compact_u16(0x7f), vec![0x7f]);
        assert_eq!(encode_compact_u16(128), vec![0x80, 0x01]);
        assert_eq!(encode_compact_u16(16383), vec![0xff, 0x7f]);
        assert_eq!(encode_compact_u16(16384), vec![0x80, 0x80, 0x01]);
        assert_eq!(encode_compact_u16(u16::MAX), vec![0xff, 0xff, 0x03]);
    }

    #[test]
    fn decode_compact_u16_three_bytes() {
        let (val, len) = decode_compact_u16(&[0x80, 0x80, 0x01]).unwrap();
        assert_eq!(val, 16384);
        assert_eq!(len, 3);
    }

    #[test]
    fn decode_compact_u16_roundtrip() {
        for value in [0u16, 1, 127, 128, 255, 256, 16383, 16384, 65535] {
            let encoded = encode_compact_u16(value);
            let (decoded, len) = decode_compact_u16(&encoded).unwrap();
            assert_eq!(decoded, value, "roundtrip failed for {value}");
            assert_eq!(len, encoded.len());
        }
    }

    #[test]
    fn decode_compact_u16_truncated_input_fails() {
        assert!(decode_compact_u16(&[]).is_err());
        assert!(decode_compact_u16(&[0x80]).is_err());
    }

    // -- Assembly -----------------------------------------------------------

    #[test]
    fn assemble_rejects_empty_list() {
        let err = assemble(vec![], key(1)).unwrap_err();
        assert_eq!(err, SolError::EmptyTransaction);
    }

    #[test]
    fn assemble_rejects_default_fee_payer() {
        let err = assemble(vec![sample_transfer(key(1))], Pubkey::default()).unwrap_err();
        assert!(matches!(err, SolError::InvalidAddress(_)));
    }

    #[test]
    fn assemble_preserves_instruction_order() {
        let payer = key(1);
        let ixs = vec![
            spl_token::create_associated_token_account(&payer, &key(0xA2), &key(3), &key(4)),
            sample_transfer(payer),
            spl_token::mint_to(&key(4), &key(0xA2), &payer, 5).unwrap(),
        ];

        let tx = assemble(ixs.clone(), payer).unwrap();
        assert_eq!(tx.instructions(), ixs.as_slice());
        assert_eq!(tx.fee_payer(), &payer);

        let kinds: Vec<_> = tx.instructions().iter().map(|ix| InstructionKind::of(ix).unwrap()).collect();
        assert_eq!(
            kinds,
            vec![
                InstructionKind::CreateAssociatedAccount,
                InstructionKind::Transfer,
                InstructionKind::MintTo
            ]
        );
    }

    // -- Compilation --------------------------------------------------------

    #[test]
    fn compiled_account_order_puts_fee_payer_first() {
        let payer = key(1);
        let tx = assemble(vec![sample_transfer(payer)], payer).unwrap();
        let msg = tx.compile(&[0xAA; 32]).unwrap();

        // payer (signer+writable), source + destination (writable), token program (read-only)
        assert_eq!(msg.account_keys.len(), 4);
        assert_eq!(msg.account_keys[0], payer);
        assert_eq!(msg.num_required_signatures, 1);
        assert_eq!(msg.num_readonly_signed, 0);
        assert_eq!(msg.num_readonly_unsigned, 1);
        assert_eq!(msg.account_keys[3], TOKEN_PROGRAM_ID);
        assert_eq!(msg.recent_blockhash, [0xAA; 32]);
    }

    #[test]
    fn compiled_instruction_indices() {
        let payer = key(1);
        let tx = assemble(vec![sample_transfer(payer)], payer).unwrap();
        let msg = tx.compile(&[0u8; 32]).unwrap();

        let cix = &msg.instructions[0];
        let pos = |k: Pubkey| msg.account_keys.iter().position(|x| *x == k).unwrap() as u8;
        assert_eq!(cix.program_id_index, pos(TOKEN_PROGRAM_ID));
        assert_eq!(cix.account_indices, vec![pos(key(0xA1)), pos(key(0xA2)), pos(payer)]);
    }

    #[test]
    fn create_mint_requires_two_signers() {
        let payer = key(1);
        let mint = Keypair::from_seed(&[9u8; 32]);
        let ixs = vec![
            spl_token::create_account(&payer, &mint.pubkey(), 1, 82, &TOKEN_PROGRAM_ID),
            spl_token::initialize_mint(&mint.pubkey(), 9, &payer, Some(&payer)).unwrap(),
        ];
        let tx = assemble(ixs, payer).unwrap().with_signer(mint);

        let signers = tx.required_signers();
        assert_eq!(signers.len(), 2);
        assert_eq!(signers[0], payer);
        assert_eq!(tx.local_signers().count(), 1);

        let msg = tx.compile(&[0u8; 32]).unwrap();
        assert_eq!(msg.signers(), signers.as_slice());
        assert!(msg.account_keys.contains(&SYSTEM_PROGRAM_ID));
    }

    #[test]
    fn decompile_recovers_instructions() {
        let payer = key(1);
        let ixs = vec![
            spl_token::create_associated_token_account(&payer, &key(0xA2), &key(3), &key(4)),
            sample_transfer(payer),
        ];
        let tx = assemble(ixs.clone(), payer).unwrap();
        let msg = tx.compile(&[0u8; 32]).unwrap();
        let recovered = msg.decompile().unwrap();

        assert_eq!(recovered.len(), ixs.len());
        for (got, want) in recovered.iter().zip(&ixs) {
            assert_eq!(got.program_id, want.program_id);
            assert_eq!(got.data, want.data);
            let got_keys: Vec<Pubkey> = got.accounts.iter().map(|m| m.pubkey).collect();
            let want_keys: Vec<Pubkey> = want.accounts.iter().map(|m| m.pubkey).collect();
            assert_eq!(got_keys, want_keys);
        }

        // Flags come from the merged account table: the payer signs and is
        // writable everywhere it appears.
        let owner_meta = &recovered[1].accounts[2];
        assert_eq!(owner_meta.pubkey, payer);
        assert!(owner_meta.is_signer && owner_meta.is_writable);
        assert!(!recovered[0].accounts[2].is_writable);
    }

    // -- Serialization and signing ------------------------------------------

    #[test]
    fn serialized_message_layout() {
        let payer = key(1);
        let tx = assemble(vec![sample_transfer(payer)], payer).unwrap();
        let msg = tx.compile(&[0xCC; 32]).unwrap();
        let bytes = msg.serialize().unwrap();

        assert_eq!(bytes[0], msg.num_required_signatures);
        assert_eq!(bytes[1], msg.num_readonly_signed);
        assert_eq!(bytes[2], msg.num_readonly_unsigned);

        let offset = 3 + 1 + 32 * msg.account_keys.len();
        assert_eq!(&bytes[offset..offset + 32], &[0xCC; 32]);
    }

    #[test]
    fn unsigned_wire_has_zeroed_slots() {
        let payer = key(1);
        let tx = assemble(vec![sample_transfer(payer)], payer).unwrap();
        let msg = tx.compile(&[0u8; 32]).unwrap();
        let wire = msg.to_unsigned_wire().unwrap();

        assert_eq!(wire[0], 1);
        assert!(wire[1..65].iter().all(|&b| b == 0));
        assert_eq!(&wire[65..], msg.serialize().unwrap().as_slice());
        assert!(transaction_id(&wire).is_err());
    }

    #[test]
    fn prepare_applies_local_signature_in_its_slot() {
        use ed25519_dalek::{Signature, VerifyingKey};

        let payer = key(1);
        let mint = Keypair::from_seed(&[0x21; 32]);
        let mint_pubkey = mint.pubkey();
        let ixs = vec![
            spl_token::create_account(&payer, &mint_pubkey, 1, 82, &TOKEN_PROGRAM_ID),
            spl_token::initialize_mint(&mint_pubkey, 6, &payer, None).unwrap(),
        ];
        let tx = assemble(ixs, payer).unwrap().with_signer(mint);
        let (msg, wire) = tx.prepare(&[0x10; 32]).unwrap();

        // Slot 0 (fee payer) untouched, slot 1 (mint) signed.
        assert_eq!(wire[0], 2);
        assert!(wire[1..65].iter().all(|&b| b == 0));

        let mint_slot = msg.signers().iter().position(|k| *k == mint_pubkey).unwrap();
        assert_eq!(mint_slot, 1);
        let sig_bytes: [u8; 64] = wire[65..129].try_into().unwrap();
        let vk = VerifyingKey::from_bytes(mint_pubkey.as_bytes()).unwrap();
        assert!(vk
            .verify_strict(&wire[129..], &Signature::from_bytes(&sig_bytes))
            .is_ok());
    }

    #[test]
    fn fee_payer_signature_becomes_transaction_id() {
        let wallet = Keypair::from_seed(&[0x42; 32]);
        let payer = wallet.pubkey();
        let tx = assemble(vec![sample_transfer(payer)], payer).unwrap();
        let (_, wire) = tx.prepare(&[0x99; 32]).unwrap();

        let signed = partial_sign_wire(&wallet, &wire).unwrap();
        let id = transaction_id(&signed).unwrap();
        assert_eq!(id, bs58::encode(&signed[1..65]).into_string());

        // Signing does not alter the message portion.
        assert_eq!(&signed[65..], &wire[65..]);
        // Deterministic for the same key and message.
        assert_eq!(partial_sign_wire(&wallet, &wire).unwrap(), signed);
    }

    #[test]
    fn partial_sign_with_foreign_key_fails() {
        let payer = key(1);
        let tx = assemble(vec![sample_transfer(payer)], payer).unwrap();
        let (_, wire) = tx.prepare(&[0u8; 32]).unwrap();

        let stranger = Keypair::from_seed(&[0x77; 32]);
        let err = partial_sign_wire(&stranger, &wire).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn partial_sign_rejects_header_with_more_signers_than_slots() {
        let payer = key(1);
        let mint = Keypair::from_seed(&[0x21; 32]);
        let mint_pubkey = mint.pubkey();
        let ixs = vec![
            spl_token::create_account(&payer, &mint_pubkey, 1, 82, &TOKEN_PROGRAM_ID),
            spl_token::initialize_mint(&mint_pubkey, 6, &payer, None).unwrap(),
        ];
        let msg = assemble(ixs, payer).unwrap().compile(&[0x10; 32]).unwrap();
        let wire = msg.to_unsigned_wire().unwrap();
        assert_eq!(wire[0], 2);

        // Prefix claims one slot while the header still requires two.
        let mut truncated = vec![1u8];
        truncated.extend_from_slice(&wire[1..65]);
        truncated.extend_from_slice(&wire[129..]);

        let err = partial_sign_wire(&mint, &truncated).unwrap_err();
        assert!(err.to_string().contains("signature slots"), "{err}");
    }

    #[test]
    fn partial_sign_malformed_input_fails() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        assert!(partial_sign_wire(&kp, &[]).is_err());
        assert!(partial_sign_wire(&kp, &[0x01]).is_err());
        let err = partial_sign_wire(&kp, &[0x00, 0x01, 0x00, 0x00]).unwrap_err();
        assert!(err.to_string().contains("zero signatures"));
    }
}
