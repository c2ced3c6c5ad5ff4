//! Signature hash computation for transaction signing.
//!
//! Computes the digest that is signed by ECDSA to authorize spending a
//! transaction input. Legacy scripts sign a modified copy of the
//! transaction; witness v0 scripts sign the BIP143 preimage, which commits
//! to the spent amount.
//!
//! See <https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki>

use btcx_primitives::hash::sha256d;
use btcx_primitives::util::{BtcWriter, VarInt};
use btcx_script::interpreter::SigVersion;
use btcx_script::Script;
use tracing::trace;

use crate::input::TxInLike;
use crate::outpoint::OutPointLike;
use crate::output::{TxOut, TxOutLike};
use crate::transaction::TransactionLike;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: only sign the current input, allowing other
/// inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Digest returned by the legacy algorithm for SIGHASH_SINGLE without a
/// matching output: the number one as a little-endian 256-bit value.
pub const SIGHASH_ONE: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

/// A sighash type byte split into its base type and modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SighashType(pub u32);

impl SighashType {
    pub const ALL: SighashType = SighashType(SIGHASH_ALL);
    pub const NONE: SighashType = SighashType(SIGHASH_NONE);
    pub const SINGLE: SighashType = SighashType(SIGHASH_SINGLE);

    /// The low five bits. Values other than ALL, NONE and SINGLE hash like
    /// ALL.
    pub fn base_type(self) -> u32 {
        self.0 & SIGHASH_MASK
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & SIGHASH_ANYONECANPAY != 0
    }

    pub fn with_anyone_can_pay(self) -> SighashType {
        SighashType(self.0 | SIGHASH_ANYONECANPAY)
    }

    /// Byte appended to a DER signature.
    pub fn to_byte(self) -> u8 {
        self.0 as u8
    }
}

impl From<u32> for SighashType {
    fn from(v: u32) -> Self {
        SighashType(v)
    }
}

/// Compute the signature hash of one input.
///
/// # Arguments
/// * `script_code` - The script being satisfied (scriptCode).
/// * `tx`          - The spending transaction.
/// * `input_index` - Index of the input being signed.
/// * `hash_type`   - Sighash flags.
/// * `amount`      - Value of the spent output; only witness v0 commits to it.
/// * `sig_version` - Which digest algorithm applies.
///
/// # Returns
/// The 32-byte digest, or `InvalidTransaction` if `input_index` is out of range.
pub fn signature_hash<T: TransactionLike>(
    script_code: &Script,
    tx: &T,
    input_index: usize,
    hash_type: impl Into<SighashType>,
    amount: i64,
    sig_version: SigVersion,
) -> Result<[u8; 32], TransactionError> {
    let hash_type = hash_type.into();
    match sig_version {
        SigVersion::Base => legacy_signature_hash(script_code, tx, input_index, hash_type),
        SigVersion::WitnessV0 => {
            witness_v0_signature_hash(script_code, tx, input_index, hash_type, amount)
        }
    }
}

fn check_index<T: TransactionLike>(tx: &T, input_index: usize) -> Result<(), TransactionError> {
    if input_index >= tx.inputs().len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs().len()
        )));
    }
    Ok(())
}

// -----------------------------------------------------------------------
// Legacy signature hash
// -----------------------------------------------------------------------

/// Compute the pre-segwit signature hash.
///
/// Serializes a copy of the transaction in which:
/// - every scriptSig is empty except the signed input's, which holds
///   `script_code` with `OP_CODESEPARATOR`s removed;
/// - with NONE, no outputs remain and other inputs' sequences are zero;
/// - with SINGLE, outputs are cut after the signed index, earlier ones
///   replaced by null outputs, and other inputs' sequences are zero;
/// - with ANYONECANPAY, only the signed input remains.
///
/// The 4-byte hash type is appended before double hashing. SINGLE with no
/// output at `input_index` yields [`SIGHASH_ONE`].
pub fn legacy_signature_hash<T: TransactionLike>(
    script_code: &Script,
    tx: &T,
    input_index: usize,
    hash_type: SighashType,
) -> Result<[u8; 32], TransactionError> {
    check_index(tx, input_index)?;

    let base = hash_type.base_type();
    if base == SIGHASH_SINGLE && input_index >= tx.outputs().len() {
        return Ok(SIGHASH_ONE);
    }

    let script_code = script_code.without_codeseparators();
    let zero_other_sequences = base == SIGHASH_NONE || base == SIGHASH_SINGLE;
    let empty = Script::new();

    let mut writer = BtcWriter::with_capacity(256);
    writer.write_i32_le(tx.version());

    let write_input = |writer: &mut BtcWriter, i: usize| {
        let input = &tx.inputs()[i];
        input.prevout().write_to(writer);
        let script = if i == input_index { &script_code } else { &empty };
        writer.write_var_bytes(script.to_bytes());
        let sequence = if i != input_index && zero_other_sequences { 0 } else { input.sequence() };
        writer.write_u32_le(sequence);
    };

    if hash_type.anyone_can_pay() {
        writer.write_varint(VarInt(1));
        write_input(&mut writer, input_index);
    } else {
        writer.write_varint(VarInt::from(tx.inputs().len()));
        for i in 0..tx.inputs().len() {
            write_input(&mut writer, i);
        }
    }

    match base {
        SIGHASH_NONE => writer.write_varint(VarInt(0)),
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            let null = TxOut::null();
            for _ in 0..input_index {
                null.write_to(&mut writer);
            }
            tx.outputs()[input_index].write_to(&mut writer);
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs().len()));
            for output in tx.outputs() {
                output.write_to(&mut writer);
            }
        }
    }

    writer.write_u32_le(tx.lock_time());
    writer.write_u32_le(hash_type.0);

    trace!(input_index, preimage_len = writer.len(), "legacy sighash preimage");
    Ok(sha256d(writer.as_bytes()))
}

// -----------------------------------------------------------------------
// BIP143 signature hash
// -----------------------------------------------------------------------

/// Compute the witness v0 (BIP143) signature hash.
pub fn witness_v0_signature_hash<T: TransactionLike>(
    script_code: &Script,
    tx: &T,
    input_index: usize,
    hash_type: SighashType,
    amount: i64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = calc_preimage(script_code, tx, input_index, hash_type, amount)?;
    trace!(input_index, preimage_len = preimage.len(), "witness v0 sighash preimage");
    Ok(sha256d(&preimage))
}

/// Compute the BIP143 pre-image bytes before double-hashing.
///
/// The preimage consists of:
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
/// 3. hashSequence (32 bytes) - sha256d of all sequences unless ANYONECANPAY/SINGLE/NONE
/// 4. outpoint (32+4 bytes) - txid + vout of the input being signed
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE) - amount of the output being spent
/// 7. nSequence (4 bytes LE) - sequence of the input being signed
/// 8. hashOutputs (32 bytes) - sha256d of all outputs or one output
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
pub fn calc_preimage<T: TransactionLike>(
    script_code: &Script,
    tx: &T,
    input_index: usize,
    hash_type: SighashType,
    amount: i64,
) -> Result<Vec<u8>, TransactionError> {
    check_index(tx, input_index)?;

    let input = &tx.inputs()[input_index];
    let base = hash_type.base_type();
    let acp = hash_type.anyone_can_pay();

    let hash_prevouts = if !acp { prevouts_hash(tx) } else { [0u8; 32] };

    let hash_sequence = if !acp && base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        outputs_hash(tx, None)
    } else if base == SIGHASH_SINGLE && input_index < tx.outputs().len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = BtcWriter::with_capacity(156 + script_code.len());
    writer.write_i32_le(tx.version());
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.prevout().write_to(&mut writer);
    writer.write_var_bytes(script_code.to_bytes());
    writer.write_i64_le(amount);
    writer.write_u32_le(input.sequence());
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time());
    writer.write_u32_le(hash_type.0);

    Ok(writer.into_bytes())
}

// -----------------------------------------------------------------------
// Internal helper functions
// -----------------------------------------------------------------------

/// Double-SHA256 of all input outpoints concatenated.
fn prevouts_hash<T: TransactionLike>(tx: &T) -> [u8; 32] {
    let mut writer = BtcWriter::with_capacity(tx.inputs().len() * 36);
    for input in tx.inputs() {
        input.prevout().write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of all input sequence numbers concatenated.
fn sequence_hash<T: TransactionLike>(tx: &T) -> [u8; 32] {
    let mut writer = BtcWriter::with_capacity(tx.inputs().len() * 4);
    for input in tx.inputs() {
        writer.write_u32_le(input.sequence());
    }
    sha256d(writer.as_bytes())
}

/// Double-SHA256 of serialized outputs: all of them, or only output `n`.
fn outputs_hash<T: TransactionLike>(tx: &T, n: Option<usize>) -> [u8; 32] {
    let mut writer = BtcWriter::new();
    match n {
        Some(n) => tx.outputs()[n].write_to(&mut writer),
        None => {
            for output in tx.outputs() {
                output.write_to(&mut writer);
            }
        }
    }
    sha256d(writer.as_bytes())
}
