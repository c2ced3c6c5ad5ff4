//! Reference to a previous transaction output.
//!
//! [`OutPoint`] is the frozen form, usable as a map key. [`MutableOutPoint`]
//! has public fields for transaction-building code. Both implement
//! [`OutPointLike`], which carries the serialization shared by the two.

use std::fmt;

use btcx_primitives::chainhash::{double_hash_h, Hash};
use btcx_primitives::util::{BtcReader, BtcWriter};

use crate::TransactionError;

/// Output index of a null outpoint.
pub const NULL_INDEX: u32 = 0xFFFF_FFFF;

/// Read access shared by [`OutPoint`] and [`MutableOutPoint`].
pub trait OutPointLike {
    /// Id of the transaction holding the output, in internal byte order.
    fn hash(&self) -> &Hash;

    /// Index of the output within that transaction.
    fn n(&self) -> u32;

    /// A null outpoint marks the input of a coinbase transaction.
    fn is_null(&self) -> bool {
        self.hash().is_zero() && self.n() == NULL_INDEX
    }

    /// 32-byte hash followed by the 4-byte index.
    fn write_to(&self, writer: &mut BtcWriter) {
        writer.write_bytes(self.hash().as_bytes());
        writer.write_u32_le(self.n());
    }

    fn serialize(&self) -> Vec<u8> {
        let mut writer = BtcWriter::with_capacity(36);
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    /// Double SHA-256 of the serialization. Recomputed on every call.
    fn get_hash(&self) -> Hash {
        double_hash_h(&self.serialize())
    }
}

// ---------------------------------------------------------------------------
// OutPoint
// ---------------------------------------------------------------------------

/// Immutable outpoint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    hash: Hash,
    n: u32,
}

impl OutPoint {
    pub fn new(hash: Hash, n: u32) -> Self {
        OutPoint { hash, n }
    }

    /// The null outpoint (all-zero hash, index `0xFFFFFFFF`).
    pub fn null() -> Self {
        OutPoint { hash: Hash::ZERO, n: NULL_INDEX }
    }

    pub fn read_from(reader: &mut BtcReader<'_>) -> Result<Self, TransactionError> {
        let hash = reader.read_array::<32>().map_err(|e| {
            TransactionError::MalformedData(format!("reading outpoint hash: {}", e))
        })?;
        let n = reader.read_u32_le().map_err(|e| {
            TransactionError::MalformedData(format!("reading outpoint index: {}", e))
        })?;
        Ok(OutPoint { hash: Hash::new(hash), n })
    }

    pub fn to_mutable(&self) -> MutableOutPoint {
        MutableOutPoint { hash: self.hash, n: self.n }
    }

    pub fn to_immutable(&self) -> OutPoint {
        *self
    }
}

impl OutPointLike for OutPoint {
    fn hash(&self) -> &Hash {
        &self.hash
    }

    fn n(&self) -> u32 {
        self.n
    }
}

impl Default for OutPoint {
    fn default() -> Self {
        OutPoint::null()
    }
}

impl From<MutableOutPoint> for OutPoint {
    fn from(op: MutableOutPoint) -> Self {
        OutPoint { hash: op.hash, n: op.n }
    }
}

/// `<txid>:<n>` with the txid in display (reversed) order.
impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.n)
    }
}

impl fmt::Debug for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "OutPoint()")
        } else {
            write!(f, "OutPoint({:?}, {})", self.hash, self.n)
        }
    }
}

// ---------------------------------------------------------------------------
// MutableOutPoint
// ---------------------------------------------------------------------------

/// Outpoint with assignable fields.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MutableOutPoint {
    pub hash: Hash,
    pub n: u32,
}

impl MutableOutPoint {
    pub fn new(hash: Hash, n: u32) -> Self {
        MutableOutPoint { hash, n }
    }

    pub fn to_mutable(&self) -> MutableOutPoint {
        *self
    }

    pub fn to_immutable(&self) -> OutPoint {
        OutPoint::from(*self)
    }
}

impl OutPointLike for MutableOutPoint {
    fn hash(&self) -> &Hash {
        &self.hash
    }

    fn n(&self) -> u32 {
        self.n
    }
}

impl Default for MutableOutPoint {
    fn default() -> Self {
        MutableOutPoint { hash: Hash::ZERO, n: NULL_INDEX }
    }
}

impl From<OutPoint> for MutableOutPoint {
    fn from(op: OutPoint) -> Self {
        op.to_mutable()
    }
}

impl fmt::Display for MutableOutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.n)
    }
}

impl fmt::Debug for MutableOutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "MutableOutPoint()")
        } else {
            write!(f, "MutableOutPoint({:?}, {})", self.hash, self.n)
        }
    }
}
