//! Transaction output: an amount locked by a script.

use std::fmt;

use btcx_primitives::chainhash::{double_hash_h, Hash};
use btcx_primitives::util::{BtcReader, BtcWriter};
use btcx_primitives::ChainParams;
use btcx_script::Script;

use crate::TransactionError;

/// Read access shared by [`TxOut`] and [`MutableTxOut`].
///
/// # Wire format
///
/// | Field          | Size           |
/// |----------------|----------------|
/// | value          | 8 bytes (LE)   |
/// | script length  | VarInt         |
/// | script_pubkey  | variable       |
pub trait TxOutLike {
    /// Amount in base units. Signed, since `-1` marks a null output.
    fn value(&self) -> i64;

    fn script_pubkey(&self) -> &Script;

    /// Whether the value lies within the chain's money range.
    fn is_valid(&self, params: &ChainParams) -> bool {
        params.money_range(self.value())
    }

    fn write_to(&self, writer: &mut BtcWriter) {
        writer.write_i64_le(self.value());
        writer.write_var_bytes(self.script_pubkey().to_bytes());
    }

    fn serialize(&self) -> Vec<u8> {
        let mut writer = BtcWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    fn get_hash(&self) -> Hash {
        double_hash_h(&self.serialize())
    }
}

fn read_parts(reader: &mut BtcReader<'_>) -> Result<(i64, Script), TransactionError> {
    let value = reader.read_i64_le().map_err(|e| {
        TransactionError::MalformedData(format!("reading output value: {}", e))
    })?;
    let script = reader.read_var_bytes().map_err(|e| {
        TransactionError::MalformedData(format!("reading script_pubkey: {}", e))
    })?;
    Ok((value, Script::from(script)))
}

// ---------------------------------------------------------------------------
// TxOut
// ---------------------------------------------------------------------------

/// Immutable transaction output.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TxOut {
    value: i64,
    script_pubkey: Script,
}

impl TxOut {
    pub fn new(value: i64, script_pubkey: Script) -> Self {
        TxOut { value, script_pubkey }
    }

    /// The null output written in place of skipped outputs by the legacy
    /// SIGHASH_SINGLE digest.
    pub fn null() -> Self {
        TxOut { value: -1, script_pubkey: Script::new() }
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        let (value, script_pubkey) = read_parts(reader)?;
        Ok(TxOut { value, script_pubkey })
    }

    pub fn to_mutable(&self) -> MutableTxOut {
        MutableTxOut { value: self.value, script_pubkey: self.script_pubkey.clone() }
    }

    pub fn to_immutable(&self) -> TxOut {
        self.clone()
    }
}

impl TxOutLike for TxOut {
    fn value(&self) -> i64 {
        self.value
    }

    fn script_pubkey(&self) -> &Script {
        &self.script_pubkey
    }
}

impl Default for TxOut {
    fn default() -> Self {
        TxOut::null()
    }
}

impl From<MutableTxOut> for TxOut {
    fn from(out: MutableTxOut) -> Self {
        TxOut { value: out.value, script_pubkey: out.script_pubkey }
    }
}

impl fmt::Debug for TxOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxOut({}, {:?})", self.value, self.script_pubkey)
    }
}

// ---------------------------------------------------------------------------
// MutableTxOut
// ---------------------------------------------------------------------------

/// Transaction output with assignable fields.
#[derive(Clone, PartialEq, Eq)]
pub struct MutableTxOut {
    pub value: i64,
    pub script_pubkey: Script,
}

impl MutableTxOut {
    pub fn new(value: i64, script_pubkey: Script) -> Self {
        MutableTxOut { value, script_pubkey }
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        let (value, script_pubkey) = read_parts(reader)?;
        Ok(MutableTxOut { value, script_pubkey })
    }

    pub fn to_mutable(&self) -> MutableTxOut {
        self.clone()
    }

    pub fn to_immutable(&self) -> TxOut {
        TxOut::from(self.clone())
    }
}

impl TxOutLike for MutableTxOut {
    fn value(&self) -> i64 {
        self.value
    }

    fn script_pubkey(&self) -> &Script {
        &self.script_pubkey
    }
}

impl Default for MutableTxOut {
    fn default() -> Self {
        TxOut::null().to_mutable()
    }
}

impl From<TxOut> for MutableTxOut {
    fn from(out: TxOut) -> Self {
        MutableTxOut { value: out.value, script_pubkey: out.script_pubkey }
    }
}

impl fmt::Debug for MutableTxOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MutableTxOut({}, {:?})", self.value, self.script_pubkey)
    }
}
