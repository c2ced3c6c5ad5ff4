/// Per-input witness stack.
///
/// A `ScriptWitness` is the ordered list of byte vectors supplied alongside
/// an input for segwit spends. Item 0 is the bottom of the stack.

use std::fmt;

use btcx_primitives::util::{BtcReader, BtcWriter, VarInt};
use btcx_primitives::PrimitivesError;

/// Ordered witness stack items for one input.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScriptWitness {
    stack: Vec<Vec<u8>>,
}

impl ScriptWitness {
    pub fn new(stack: Vec<Vec<u8>>) -> Self {
        ScriptWitness { stack }
    }

    pub fn stack(&self) -> &[Vec<u8>] {
        &self.stack
    }

    pub fn into_stack(self) -> Vec<Vec<u8>> {
        self.stack
    }

    pub fn push(&mut self, item: Vec<u8>) {
        self.stack.push(item);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// An empty witness serializes to a single zero count.
    pub fn is_null(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<u8>> {
        self.stack.iter()
    }

    /// Item count followed by each length-prefixed item.
    pub fn write_to(&self, w: &mut BtcWriter) {
        w.write_varint(VarInt::from(self.stack.len()));
        for item in &self.stack {
            w.write_var_bytes(item);
        }
    }

    pub fn read_from(r: &mut BtcReader<'_>) -> Result<Self, PrimitivesError> {
        let count = r.read_compact_size()?;
        // each item takes at least one byte
        if count > r.remaining() {
            return Err(PrimitivesError::MalformedData(format!(
                "witness item count {} exceeds remaining {} bytes",
                count,
                r.remaining()
            )));
        }
        let mut stack = Vec::with_capacity(count);
        for _ in 0..count {
            stack.push(r.read_var_bytes()?);
        }
        Ok(ScriptWitness { stack })
    }

    pub fn serialized_size(&self) -> usize {
        VarInt::from(self.stack.len()).length()
            + self
                .stack
                .iter()
                .map(|i| VarInt::from(i.len()).length() + i.len())
                .sum::<usize>()
    }
}

impl From<Vec<Vec<u8>>> for ScriptWitness {
    fn from(stack: Vec<Vec<u8>>) -> Self {
        ScriptWitness::new(stack)
    }
}

impl<'a> IntoIterator for &'a ScriptWitness {
    type Item = &'a Vec<u8>;
    type IntoIter = std::slice::Iter<'a, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.stack.iter()
    }
}

impl fmt::Debug for ScriptWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.stack.iter().map(hex::encode).collect();
        write!(f, "ScriptWitness([{}])", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_witness_serialize() {
        let w = ScriptWitness::new(vec![vec![0xaa, 0xbb], vec![], vec![0x01]]);
        let mut writer = BtcWriter::new();
        w.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(hex::encode(&bytes), "0302aabb000101");
        assert_eq!(w.serialized_size(), bytes.len());

        let mut r = BtcReader::new(&bytes);
        let back = ScriptWitness::read_from(&mut r).expect("decodes");
        assert_eq!(back, w);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_witness_empty() {
        let w = ScriptWitness::default();
        assert!(w.is_null());
        let mut writer = BtcWriter::new();
        w.write_to(&mut writer);
        assert_eq!(writer.into_bytes(), vec![0x00]);
    }

    /// A huge declared item count fails before allocating.
    #[test]
    fn test_witness_hostile_count() {
        let bytes = [0xfe, 0xff, 0xff, 0xff, 0x01];
        let mut r = BtcReader::new(&bytes);
        assert!(ScriptWitness::read_from(&mut r).is_err());
    }

    #[test]
    fn test_witness_truncated_item() {
        let bytes = [0x01, 0x05, 0xaa];
        let mut r = BtcReader::new(&bytes);
        assert!(ScriptWitness::read_from(&mut r).is_err());
    }
}
