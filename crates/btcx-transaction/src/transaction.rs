//! Transaction type in immutable and mutable form.
//!
//! [`Transaction`] freezes its parts on construction and caches its txid and
//! wtxid, so it can serve as a map key. [`MutableTransaction`] exposes its
//! fields for building and signing and recomputes hashes on each request.
//! Serialization and the identifying hashes live on [`TransactionLike`],
//! shared by both forms.

use std::fmt;
use std::sync::OnceLock;

use btcx_primitives::chainhash::{double_hash_h, Hash};
use btcx_primitives::util::{BtcReader, BtcWriter, VarInt};
use btcx_script::ScriptWitness;

use crate::input::{MutableTxIn, TxIn, TxInLike};
use crate::output::{MutableTxOut, TxOut, TxOutLike};
use crate::outpoint::OutPointLike;
use crate::witness::{MutableTxWitness, TxWitness};
use crate::TransactionError;

/// Weight units per byte of non-witness data.
pub const WITNESS_SCALE_FACTOR: usize = 4;

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

/// Read access and serialization shared by [`Transaction`] and
/// [`MutableTransaction`].
///
/// # Wire format
///
/// | Field          | Size                          |
/// |----------------|-------------------------------|
/// | version        | 4 bytes (LE, signed)          |
/// | marker, flag   | `00 01`, only with witness    |
/// | input count    | VarInt                        |
/// | inputs         | variable                      |
/// | output count   | VarInt                        |
/// | outputs        | variable                      |
/// | witnesses      | one stack per input, only with witness |
/// | lock_time      | 4 bytes (LE)                  |
pub trait TransactionLike {
    type TxIn: TxInLike;
    type TxOut: TxOutLike;

    fn version(&self) -> i32;

    fn inputs(&self) -> &[Self::TxIn];

    fn outputs(&self) -> &[Self::TxOut];

    /// Witness stack of input `idx`, if the witness section has one.
    fn input_witness(&self, idx: usize) -> Option<&ScriptWitness>;

    fn lock_time(&self) -> u32;

    /// Whether any input carries a non-empty witness stack.
    fn has_witness(&self) -> bool {
        (0..self.inputs().len())
            .any(|i| self.input_witness(i).map_or(false, |w| !w.is_null()))
    }

    /// Exactly one input, spending the null outpoint.
    fn is_coinbase(&self) -> bool {
        self.inputs().len() == 1 && self.inputs()[0].prevout().is_null()
    }

    /// Serialize, including the witness section when there is witness data.
    fn write_to(&self, writer: &mut BtcWriter, include_witness: bool) {
        let with_witness = include_witness && self.has_witness();

        writer.write_i32_le(self.version());
        if with_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs().len()));
        for input in self.inputs() {
            input.write_to(writer);
        }

        writer.write_varint(VarInt::from(self.outputs().len()));
        for output in self.outputs() {
            output.write_to(writer);
        }

        if with_witness {
            let empty = ScriptWitness::default();
            for i in 0..self.inputs().len() {
                self.input_witness(i).unwrap_or(&empty).write_to(writer);
            }
        }

        writer.write_u32_le(self.lock_time());
    }

    fn serialize(&self) -> Vec<u8> {
        let mut writer = BtcWriter::with_capacity(256);
        self.write_to(&mut writer, true);
        writer.into_bytes()
    }

    /// Serialization without witness data, as committed to by the txid.
    fn serialize_legacy(&self) -> Vec<u8> {
        let mut writer = BtcWriter::with_capacity(256);
        self.write_to(&mut writer, false);
        writer.into_bytes()
    }

    fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Double SHA-256 of the legacy serialization.
    fn txid(&self) -> Hash {
        double_hash_h(&self.serialize_legacy())
    }

    /// Double SHA-256 of the full serialization. Equal to the txid when
    /// there is no witness data.
    fn wtxid(&self) -> Hash {
        double_hash_h(&self.serialize())
    }

    /// Identifying hash of the whole structure, witness included.
    fn get_hash(&self) -> Hash {
        self.wtxid()
    }

    /// `3 * legacy_size + total_size`.
    fn weight(&self) -> usize {
        let legacy = self.serialize_legacy().len();
        let total = if self.has_witness() { self.serialize().len() } else { legacy };
        legacy * (WITNESS_SCALE_FACTOR - 1) + total
    }

    /// Weight divided by four, rounded up.
    fn virtual_size(&self) -> usize {
        (self.weight() + WITNESS_SCALE_FACTOR - 1) / WITNESS_SCALE_FACTOR
    }
}

/// Parsed parts of a serialized transaction, in immutable form.
struct Parts {
    version: i32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    witness: TxWitness,
    lock_time: u32,
}

fn read_inputs(reader: &mut BtcReader<'_>) -> Result<Vec<TxIn>, TransactionError> {
    let count = reader.read_compact_size().map_err(|e| {
        TransactionError::MalformedData(format!("reading input count: {}", e))
    })?;
    // an input takes at least 41 bytes
    let mut inputs = Vec::with_capacity(count.min(reader.remaining() / 41));
    for _ in 0..count {
        inputs.push(TxIn::read_from(reader)?);
    }
    Ok(inputs)
}

fn read_outputs(reader: &mut BtcReader<'_>) -> Result<Vec<TxOut>, TransactionError> {
    let count = reader.read_compact_size().map_err(|e| {
        TransactionError::MalformedData(format!("reading output count: {}", e))
    })?;
    // an output takes at least 9 bytes
    let mut outputs = Vec::with_capacity(count.min(reader.remaining() / 9));
    for _ in 0..count {
        outputs.push(TxOut::read_from(reader)?);
    }
    Ok(outputs)
}

/// An empty input list is followed by a flags byte. Flag bit 0 announces
/// a witness section, which must then hold at least one non-empty stack;
/// any other flag bit is rejected.
fn read_parts(reader: &mut BtcReader<'_>) -> Result<Parts, TransactionError> {
    let version = reader.read_i32_le().map_err(|e| {
        TransactionError::MalformedData(format!("reading version: {}", e))
    })?;

    let mut flags = 0u8;
    let mut inputs = read_inputs(reader)?;
    let outputs = if inputs.is_empty() {
        flags = reader.read_u8().map_err(|e| {
            TransactionError::MalformedData(format!("reading segwit flag: {}", e))
        })?;
        if flags != 0 {
            inputs = read_inputs(reader)?;
            read_outputs(reader)?
        } else {
            Vec::new()
        }
    } else {
        read_outputs(reader)?
    };

    let mut witness = TxWitness::default();
    if flags & SEGWIT_FLAG != 0 {
        flags ^= SEGWIT_FLAG;
        witness = TxWitness::read_from(reader, inputs.len())?;
        if witness.is_null() {
            return Err(TransactionError::MalformedData(
                "superfluous witness record".to_string(),
            ));
        }
    }
    if flags != 0 {
        return Err(TransactionError::MalformedData(format!(
            "unknown transaction optional data, flags {:#04x}",
            flags
        )));
    }

    let lock_time = reader.read_u32_le().map_err(|e| {
        TransactionError::MalformedData(format!("reading lock time: {}", e))
    })?;

    Ok(Parts { version, inputs, outputs, witness, lock_time })
}

fn read_exact(bytes: &[u8]) -> Result<Parts, TransactionError> {
    let mut reader = BtcReader::new(bytes);
    let parts = read_parts(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(TransactionError::MalformedData(format!(
            "trailing {} bytes after transaction",
            reader.remaining()
        )));
    }
    Ok(parts)
}

fn decode_hex(hex_str: &str) -> Result<Vec<u8>, TransactionError> {
    hex::decode(hex_str)
        .map_err(|e| TransactionError::MalformedData(format!("invalid hex: {}", e)))
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Immutable transaction with cached identifying hashes.
pub struct Transaction {
    version: i32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
    witness: TxWitness,
    lock_time: u32,
    txid: OnceLock<Hash>,
    wtxid: OnceLock<Hash>,
}

impl Transaction {
    /// Build a transaction, freezing any mutable parts.
    pub fn new<I, O>(
        version: i32,
        inputs: I,
        outputs: O,
        witness: impl Into<TxWitness>,
        lock_time: u32,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<TxIn>,
        O: IntoIterator,
        O::Item: Into<TxOut>,
    {
        Transaction {
            version,
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            witness: witness.into(),
            lock_time,
            txid: OnceLock::new(),
            wtxid: OnceLock::new(),
        }
    }

    /// Parse exactly one transaction; trailing bytes are an error.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        Ok(Self::from_parts(read_exact(bytes)?))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::deserialize(&decode_hex(hex_str)?)
    }

    /// Parse one transaction from a stream, leaving the reader after it.
    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        Ok(Self::from_parts(read_parts(reader)?))
    }

    fn from_parts(p: Parts) -> Self {
        Transaction::new(p.version, p.inputs, p.outputs, p.witness, p.lock_time)
    }

    pub fn witness(&self) -> &TxWitness {
        &self.witness
    }

    /// Deep copy into mutable form.
    pub fn to_mutable(&self) -> MutableTransaction {
        MutableTransaction {
            version: self.version,
            inputs: self.inputs.iter().map(TxIn::to_mutable).collect(),
            outputs: self.outputs.iter().map(TxOut::to_mutable).collect(),
            witness: self.witness.to_mutable(),
            lock_time: self.lock_time,
        }
    }

    pub fn to_immutable(&self) -> Transaction {
        self.clone()
    }
}

impl TransactionLike for Transaction {
    type TxIn = TxIn;
    type TxOut = TxOut;

    fn version(&self) -> i32 {
        self.version
    }

    fn inputs(&self) -> &[TxIn] {
        &self.inputs
    }

    fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    fn input_witness(&self, idx: usize) -> Option<&ScriptWitness> {
        self.witness.inputs().get(idx).map(|w| w.script_witness())
    }

    fn lock_time(&self) -> u32 {
        self.lock_time
    }

    fn txid(&self) -> Hash {
        *self.txid.get_or_init(|| double_hash_h(&self.serialize_legacy()))
    }

    fn wtxid(&self) -> Hash {
        *self.wtxid.get_or_init(|| double_hash_h(&self.serialize()))
    }
}

impl Clone for Transaction {
    fn clone(&self) -> Self {
        Transaction {
            version: self.version,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            witness: self.witness.clone(),
            lock_time: self.lock_time,
            txid: self.txid.clone(),
            wtxid: self.wtxid.clone(),
        }
    }
}

/// Cached hashes take no part in equality.
impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.inputs == other.inputs
            && self.outputs == other.outputs
            && self.witness == other.witness
            && self.lock_time == other.lock_time
    }
}

impl Eq for Transaction {}

impl std::hash::Hash for Transaction {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.wtxid(), state);
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction::new(1, Vec::<TxIn>::new(), Vec::<TxOut>::new(), TxWitness::default(), 0)
    }
}

impl From<MutableTransaction> for Transaction {
    fn from(tx: MutableTransaction) -> Self {
        Transaction::new(tx.version, tx.inputs, tx.outputs, tx.witness, tx.lock_time)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("version", &self.version)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("witness", &self.witness)
            .field("lock_time", &self.lock_time)
            .finish()
    }
}

/// Hex of the full serialization.
impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for Transaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Transaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Transaction::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// MutableTransaction
// ---------------------------------------------------------------------------

/// Transaction with assignable fields. Hashes are never cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutableTransaction {
    pub version: i32,
    pub inputs: Vec<MutableTxIn>,
    pub outputs: Vec<MutableTxOut>,
    pub witness: MutableTxWitness,
    pub lock_time: u32,
}

impl MutableTransaction {
    /// Build a transaction, thawing any immutable parts.
    pub fn new<I, O>(
        version: i32,
        inputs: I,
        outputs: O,
        witness: impl Into<MutableTxWitness>,
        lock_time: u32,
    ) -> Self
    where
        I: IntoIterator,
        I::Item: Into<MutableTxIn>,
        O: IntoIterator,
        O::Item: Into<MutableTxOut>,
    {
        MutableTransaction {
            version,
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            witness: witness.into(),
            lock_time,
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, TransactionError> {
        Ok(Self::from_parts(read_exact(bytes)?))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        Self::deserialize(&decode_hex(hex_str)?)
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        Ok(Self::from_parts(read_parts(reader)?))
    }

    fn from_parts(p: Parts) -> Self {
        MutableTransaction::new(p.version, p.inputs, p.outputs, p.witness, p.lock_time)
    }

    pub fn to_mutable(&self) -> MutableTransaction {
        self.clone()
    }

    /// Deep copy into immutable form.
    pub fn to_immutable(&self) -> Transaction {
        Transaction::from(self.clone())
    }

    /// Mutable access to the witness stack of input `idx`, growing the
    /// witness section to cover it.
    pub fn input_witness_mut(&mut self, idx: usize) -> &mut ScriptWitness {
        if self.witness.inputs.len() <= idx {
            self.witness.inputs.resize_with(idx + 1, Default::default);
        }
        &mut self.witness.inputs[idx].script_witness
    }
}

impl TransactionLike for MutableTransaction {
    type TxIn = MutableTxIn;
    type TxOut = MutableTxOut;

    fn version(&self) -> i32 {
        self.version
    }

    fn inputs(&self) -> &[MutableTxIn] {
        &self.inputs
    }

    fn outputs(&self) -> &[MutableTxOut] {
        &self.outputs
    }

    fn input_witness(&self, idx: usize) -> Option<&ScriptWitness> {
        self.witness.inputs.get(idx).map(|w| &w.script_witness)
    }

    fn lock_time(&self) -> u32 {
        self.lock_time
    }
}

impl Default for MutableTransaction {
    fn default() -> Self {
        Transaction::default().to_mutable()
    }
}

impl From<Transaction> for MutableTransaction {
    fn from(tx: Transaction) -> Self {
        tx.to_mutable()
    }
}

impl fmt::Display for MutableTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for MutableTransaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for MutableTransaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        MutableTransaction::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
