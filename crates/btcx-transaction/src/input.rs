//! Transaction input spending a previous output.
//!
//! Contains the outpoint being spent, the unlocking script (scriptSig) and
//! the sequence number. Witness data is kept apart from the input, in the
//! transaction's witness section.

use std::fmt;

use btcx_primitives::chainhash::{double_hash_h, Hash};
use btcx_primitives::util::{BtcReader, BtcWriter};
use btcx_script::Script;

use crate::outpoint::{MutableOutPoint, OutPoint, OutPointLike};
use crate::TransactionError;

/// Sequence number of a final input (no relative lock time, no RBF).
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// Read access shared by [`TxIn`] and [`MutableTxIn`].
///
/// # Wire format
///
/// | Field        | Size             |
/// |--------------|------------------|
/// | prevout      | 36 bytes         |
/// | script len   | VarInt           |
/// | script_sig   | variable         |
/// | sequence     | 4 bytes (LE)     |
pub trait TxInLike {
    type OutPoint: OutPointLike;

    fn prevout(&self) -> &Self::OutPoint;

    fn script_sig(&self) -> &Script;

    fn sequence(&self) -> u32;

    fn is_final(&self) -> bool {
        self.sequence() == SEQUENCE_FINAL
    }

    fn write_to(&self, writer: &mut BtcWriter) {
        self.prevout().write_to(writer);
        writer.write_var_bytes(self.script_sig().to_bytes());
        writer.write_u32_le(self.sequence());
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

fn read_parts(reader: &mut BtcReader<'_>) -> Result<(OutPoint, Script, u32), TransactionError> {
    let prevout = OutPoint::read_from(reader)?;
    let script = reader.read_var_bytes().map_err(|e| {
        TransactionError::MalformedData(format!("reading script_sig: {}", e))
    })?;
    let sequence = reader.read_u32_le().map_err(|e| {
        TransactionError::MalformedData(format!("reading sequence: {}", e))
    })?;
    Ok((prevout, Script::from(script), sequence))
}

// ---------------------------------------------------------------------------
// TxIn
// ---------------------------------------------------------------------------

/// Immutable transaction input.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TxIn {
    prevout: OutPoint,
    script_sig: Script,
    sequence: u32,
}

impl TxIn {
    /// Build an input; a mutable outpoint is frozen.
    pub fn new(prevout: impl Into<OutPoint>, script_sig: Script, sequence: u32) -> Self {
        TxIn { prevout: prevout.into(), script_sig, sequence }
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        let (prevout, script_sig, sequence) = read_parts(reader)?;
        Ok(TxIn { prevout, script_sig, sequence })
    }

    pub fn to_mutable(&self) -> MutableTxIn {
        MutableTxIn {
            prevout: self.prevout.to_mutable(),
            script_sig: self.script_sig.clone(),
            sequence: self.sequence,
        }
    }

    pub fn to_immutable(&self) -> TxIn {
        self.clone()
    }
}

impl TxInLike for TxIn {
    type OutPoint = OutPoint;

    fn prevout(&self) -> &OutPoint {
        &self.prevout
    }

    fn script_sig(&self) -> &Script {
        &self.script_sig
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Default for TxIn {
    fn default() -> Self {
        TxIn { prevout: OutPoint::null(), script_sig: Script::new(), sequence: SEQUENCE_FINAL }
    }
}

impl From<MutableTxIn> for TxIn {
    fn from(txin: MutableTxIn) -> Self {
        TxIn { prevout: txin.prevout.into(), script_sig: txin.script_sig, sequence: txin.sequence }
    }
}

impl fmt::Debug for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxIn({:?}, {:?}, {:#010x})", self.prevout, self.script_sig, self.sequence)
    }
}

// ---------------------------------------------------------------------------
// MutableTxIn
// ---------------------------------------------------------------------------

/// Transaction input with assignable fields.
#[derive(Clone, PartialEq, Eq)]
pub struct MutableTxIn {
    pub prevout: MutableOutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl MutableTxIn {
    /// Build an input; an immutable outpoint is thawed.
    pub fn new(prevout: impl Into<MutableOutPoint>, script_sig: Script, sequence: u32) -> Self {
        MutableTxIn { prevout: prevout.into(), script_sig, sequence }
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        Ok(TxIn::read_from(reader)?.into())
    }

    pub fn to_mutable(&self) -> MutableTxIn {
        self.clone()
    }

    pub fn to_immutable(&self) -> TxIn {
        TxIn::from(self.clone())
    }
}

impl TxInLike for MutableTxIn {
    type OutPoint = MutableOutPoint;

    fn prevout(&self) -> &MutableOutPoint {
        &self.prevout
    }

    fn script_sig(&self) -> &Script {
        &self.script_sig
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl Default for MutableTxIn {
    fn default() -> Self {
        TxIn::default().to_mutable()
    }
}

impl From<TxIn> for MutableTxIn {
    fn from(txin: TxIn) -> Self {
        MutableTxIn {
            prevout: txin.prevout.into(),
            script_sig: txin.script_sig,
            sequence: txin.sequence,
        }
    }
}

impl fmt::Debug for MutableTxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MutableTxIn({:?}, {:?}, {:#010x})", self.prevout, self.script_sig, self.sequence)
    }
}
