//! Byte codec for the wire format.
//!
//! Provides CompactSize (`VarInt`) encoding/decoding plus `BtcReader` and
//! `BtcWriter` for reading/writing little-endian protocol data. Every
//! decoding failure is reported as `PrimitivesError::MalformedData`:
//! truncated buffers, non-minimal CompactSize encodings and declared
//! lengths beyond [`MAX_SIZE`].

use crate::PrimitivesError;

/// Upper bound on any length or element count read from untrusted input.
pub const MAX_SIZE: u64 = 0x0200_0000;

// ---------------------------------------------------------------------------
// VarInt
// ---------------------------------------------------------------------------

/// A CompactSize variable-length integer.
///
/// Values below 0xfd take one byte; larger values use a marker byte
/// (0xfd, 0xfe, 0xff) followed by a 2, 4 or 8 byte little-endian value.
/// Only the shortest encoding of a value is accepted when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Decode a VarInt from the start of a byte slice.
    ///
    /// # Arguments
    /// * `data` - Byte slice starting with a CompactSize encoding.
    ///
    /// # Returns
    /// A tuple of `(VarInt, bytes_consumed)`, or `MalformedData` if the
    /// slice is too short or the encoding is not minimal.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), PrimitivesError> {
        let mut reader = BtcReader::new(data);
        let vi = reader.read_varint()?;
        Ok((vi, reader.position()))
    }

    /// Return the wire-format byte length of this VarInt.
    ///
    /// # Returns
    /// 1, 3, 5, or 9 depending on the value.
    pub fn length(&self) -> usize {
        if self.0 < 0xfd {
            1
        } else if self.0 <= 0xffff {
            3
        } else if self.0 <= 0xffff_ffff {
            5
        } else {
            9
        }
    }

    /// Encode the VarInt into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.length()];
        self.put_bytes(&mut buf);
        buf
    }

    /// Write the VarInt into a destination buffer of at least
    /// `self.length()` bytes, returning the number of bytes written.
    pub fn put_bytes(&self, dst: &mut [u8]) -> usize {
        let v = self.0;
        if v < 0xfd {
            dst[0] = v as u8;
            1
        } else if v <= 0xffff {
            dst[0] = 0xfd;
            dst[1..3].copy_from_slice(&(v as u16).to_le_bytes());
            3
        } else if v <= 0xffff_ffff {
            dst[0] = 0xfe;
            dst[1..5].copy_from_slice(&(v as u32).to_le_bytes());
            5
        } else {
            dst[0] = 0xff;
            dst[1..9].copy_from_slice(&v.to_le_bytes());
            9
        }
    }

    /// Return the underlying u64 value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VarInt {
    fn from(v: u64) -> Self {
        VarInt(v)
    }
}

impl From<usize> for VarInt {
    fn from(v: usize) -> Self {
        VarInt(v as u64)
    }
}

// ---------------------------------------------------------------------------
// BtcReader
// ---------------------------------------------------------------------------

/// A cursor-based reader for wire-format data.
///
/// Wraps a byte slice and maintains a read position, providing methods
/// to read fixed-size little-endian integers, CompactSize values and
/// length-prefixed byte vectors.
pub struct BtcReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BtcReader<'a> {
    /// Create a new reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        BtcReader { data, pos: 0 }
    }

    /// Read `n` bytes and advance the position.
    ///
    /// # Arguments
    /// * `n` - Number of bytes to read.
    ///
    /// # Returns
    /// A byte slice of length `n`, or `MalformedData` if fewer than `n`
    /// bytes remain.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PrimitivesError> {
        if n > self.remaining() {
            return Err(PrimitivesError::MalformedData(format!(
                "unexpected end of data: need {} bytes, {} remaining",
                n,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PrimitivesError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Return the next `n` bytes without advancing, or `None` if fewer remain.
    pub fn peek_bytes(&self, n: usize) -> Option<&'a [u8]> {
        if n > self.remaining() {
            return None;
        }
        Some(&self.data[self.pos..self.pos + n])
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, PrimitivesError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16, PrimitivesError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, PrimitivesError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian i32.
    pub fn read_i32_le(&mut self) -> Result<i32, PrimitivesError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian u64.
    pub fn read_u64_le(&mut self) -> Result<u64, PrimitivesError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian i64.
    pub fn read_i64_le(&mut self) -> Result<i64, PrimitivesError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read a CompactSize value, rejecting non-minimal encodings.
    ///
    /// # Returns
    /// The decoded `VarInt`, or `MalformedData` if the data is truncated
    /// or the value could have been encoded in fewer bytes.
    pub fn read_varint(&mut self) -> Result<VarInt, PrimitivesError> {
        let first = self.read_u8()?;
        let (val, min) = match first {
            0xff => (self.read_u64_le()?, 0x1_0000_0000),
            0xfe => (self.read_u32_le()? as u64, 0x1_0000),
            0xfd => (self.read_u16_le()? as u64, 0xfd),
            b => return Ok(VarInt(b as u64)),
        };
        if val < min {
            return Err(PrimitivesError::MalformedData(format!(
                "non-canonical compact size: {} encoded with marker {:#04x}",
                val, first
            )));
        }
        Ok(VarInt(val))
    }

    /// Read a CompactSize used as a length or count.
    ///
    /// # Returns
    /// The value as `usize`, or `MalformedData` if it exceeds [`MAX_SIZE`].
    pub fn read_compact_size(&mut self) -> Result<usize, PrimitivesError> {
        let vi = self.read_varint()?;
        if vi.0 > MAX_SIZE {
            return Err(PrimitivesError::MalformedData(format!(
                "compact size {} exceeds limit {}",
                vi.0, MAX_SIZE
            )));
        }
        Ok(vi.0 as usize)
    }

    /// Read a CompactSize-prefixed byte vector.
    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, PrimitivesError> {
        let len = self.read_compact_size()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Return the number of bytes remaining.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Return the number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

// ---------------------------------------------------------------------------
// BtcWriter
// ---------------------------------------------------------------------------

/// A buffer-based writer for wire-format data.
///
/// Wraps a `Vec<u8>` and provides methods to append fixed-size integers,
/// CompactSize values and length-prefixed byte vectors in little-endian order.
pub struct BtcWriter {
    buf: Vec<u8>,
}

impl BtcWriter {
    /// Create a new empty writer.
    pub fn new() -> Self {
        BtcWriter { buf: Vec::new() }
    }

    /// Create a new writer with a pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        BtcWriter { buf: Vec::with_capacity(capacity) }
    }

    /// Append raw bytes to the buffer.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a single byte.
    pub fn write_u8(&mut self, val: u8) {
        self.buf.push(val);
    }

    /// Append a little-endian u16.
    pub fn write_u16_le(&mut self, val: u16) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian u32.
    pub fn write_u32_le(&mut self, val: u32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian i32.
    pub fn write_i32_le(&mut self, val: i32) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian u64.
    pub fn write_u64_le(&mut self, val: u64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a little-endian i64.
    pub fn write_i64_le(&mut self, val: i64) {
        self.buf.extend_from_slice(&val.to_le_bytes());
    }

    /// Append a CompactSize value.
    pub fn write_varint(&mut self, varint: VarInt) {
        let mut tmp = [0u8; 9];
        let n = varint.put_bytes(&mut tmp);
        self.buf.extend_from_slice(&tmp[..n]);
    }

    /// Append a CompactSize length prefix followed by `bytes`.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_varint(VarInt::from(bytes.len()));
        self.buf.extend_from_slice(bytes);
    }

    /// Consume the writer and return the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Return a reference to the current buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Return the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for BtcWriter {
    fn default() -> Self {
        Self::new()
    }
}
