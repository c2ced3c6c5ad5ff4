//! Script number arithmetic with Bitcoin consensus rules.
//!
//! All numbers on the Bitcoin script stack are encoded as little-endian
//! byte arrays with a sign bit in the most significant bit of the last byte.
//! Numeric opcodes read operands of at most 4 bytes, so every intermediate
//! fits an `i64`. Results may exceed 4 bytes and stay valid as long as they
//! are not read back as numbers.

use super::error::{InterpreterError, InterpreterErrorCode};

/// A decoded script number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScriptNumber {
    pub val: i64,
}

impl ScriptNumber {
    pub fn new(val: i64) -> Self {
        ScriptNumber { val }
    }

    /// Parse a byte array into a ScriptNumber.
    ///
    /// `script_num_len` is the max allowed byte length and
    /// `require_minimal` rejects encodings with redundant trailing bytes.
    pub fn from_bytes(
        bb: &[u8],
        script_num_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bb.len() > script_num_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bb,
                    bb.len(),
                    script_num_len
                ),
            ));
        }

        if require_minimal {
            check_minimal_data_encoding(bb)?;
        }

        if bb.is_empty() {
            return Ok(ScriptNumber::new(0));
        }

        let mut v: i64 = 0;
        for (i, &b) in bb.iter().enumerate() {
            v |= (b as i64) << (8 * i);
        }

        let last = bb.len() - 1;
        if bb[last] & 0x80 != 0 {
            v &= !(0x80_i64 << (8 * last));
            v = -v;
        }

        Ok(ScriptNumber::new(v))
    }

    /// Serialize the number to bytes in little-endian with sign bit.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.val == 0 {
            return vec![];
        }

        let is_negative = self.val < 0;
        let mut abs_val = self.val.unsigned_abs();

        let mut result: Vec<u8> = Vec::with_capacity(9);
        while abs_val > 0 {
            result.push((abs_val & 0xff) as u8);
            abs_val >>= 8;
        }

        let last = result.len() - 1;
        if result[last] & 0x80 != 0 {
            result.push(if is_negative { 0x80 } else { 0x00 });
        } else if is_negative {
            result[last] |= 0x80;
        }

        result
    }

    pub fn is_zero(&self) -> bool {
        self.val == 0
    }

    /// Convert to i32, clamping to [i32::MIN, i32::MAX] on overflow.
    pub fn to_i32(&self) -> i32 {
        self.val.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    pub fn to_i64(&self) -> i64 {
        self.val
    }
}

impl From<i64> for ScriptNumber {
    fn from(val: i64) -> Self {
        ScriptNumber::new(val)
    }
}

/// Check that a byte array uses minimal data encoding.
///
/// The last byte may only be 0x00 or 0x80 when the byte before it has its
/// high bit set; negative zero is never minimal.
pub fn check_minimal_data_encoding(v: &[u8]) -> Result<(), InterpreterError> {
    if v.is_empty() {
        return Ok(());
    }

    if v[v.len() - 1] & 0x7f == 0 && (v.len() == 1 || v[v.len() - 2] & 0x80 == 0) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!(
                "numeric value encoded as {:02x?} is not minimally encoded",
                v
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_script_num_bytes() {
        let tests: Vec<(i64, Vec<u8>)> = vec![
            (0, vec![]),
            (1, hex_to_bytes("01")),
            (-1, hex_to_bytes("81")),
            (127, hex_to_bytes("7f")),
            (-127, hex_to_bytes("ff")),
            (128, hex_to_bytes("8000")),
            (-128, hex_to_bytes("8080")),
            (129, hex_to_bytes("8100")),
            (-129, hex_to_bytes("8180")),
            (256, hex_to_bytes("0001")),
            (-256, hex_to_bytes("0081")),
            (32767, hex_to_bytes("ff7f")),
            (-32767, hex_to_bytes("ffff")),
            (32768, hex_to_bytes("008000")),
            (-32768, hex_to_bytes("008080")),
            (65535, hex_to_bytes("ffff00")),
            (-65535, hex_to_bytes("ffff80")),
            (8388608, hex_to_bytes("00008000")),
            (-8388608, hex_to_bytes("00008080")),
            (2147483647, hex_to_bytes("ffffff7f")),
            (-2147483647, hex_to_bytes("ffffffff")),
            // Results outside the operand range still serialize
            (2147483648, hex_to_bytes("0000008000")),
            (-2147483648, hex_to_bytes("0000008080")),
            (4294967295, hex_to_bytes("ffffffff00")),
            (-4294967295, hex_to_bytes("ffffffff80")),
            (9223372036854775807, hex_to_bytes("ffffffffffffff7f")),
            (-9223372036854775807, hex_to_bytes("ffffffffffffffff")),
        ];

        for (num, expected) in &tests {
            let got = ScriptNumber::new(*num).to_bytes();
            assert_eq!(
                &got, expected,
                "Bytes: num={}, got={:02x?}, want={:02x?}",
                num, got, expected
            );
        }
    }

    #[test]
    fn test_make_script_num() {
        struct Test {
            serialized: Vec<u8>,
            num: i64,
            num_len: usize,
            minimal_encoding: bool,
            expect_err: bool,
        }

        let tests = vec![
            // Minimal encoding rejects negative 0
            Test { serialized: hex_to_bytes("80"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            Test { serialized: vec![], num: 0, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("01"), num: 1, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("81"), num: -1, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("8000"), num: 128, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("8080"), num: -128, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffffff7f"), num: 2147483647, num_len: 4, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffffffff"), num: -2147483647, num_len: 4, minimal_encoding: true, expect_err: false },
            // Lock time operands
            Test { serialized: hex_to_bytes("ffffffff7f"), num: 549755813887, num_len: 5, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("ffffffffff"), num: -549755813887, num_len: 5, minimal_encoding: true, expect_err: false },
            Test { serialized: hex_to_bytes("0000008000"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            // Non-minimally encoded with flag
            Test { serialized: hex_to_bytes("00"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            Test { serialized: hex_to_bytes("0100"), num: 0, num_len: 4, minimal_encoding: true, expect_err: true },
            // Non-minimally encoded without flag
            Test { serialized: hex_to_bytes("00"), num: 0, num_len: 4, minimal_encoding: false, expect_err: false },
            Test { serialized: hex_to_bytes("0100"), num: 1, num_len: 4, minimal_encoding: false, expect_err: false },
            Test { serialized: hex_to_bytes("80"), num: 0, num_len: 4, minimal_encoding: false, expect_err: false },
        ];

        for test in &tests {
            let result = ScriptNumber::from_bytes(&test.serialized, test.num_len, test.minimal_encoding);
            match result {
                Ok(sn) => {
                    assert!(!test.expect_err, "from_bytes({:02x?}): expected error", test.serialized);
                    assert_eq!(sn.to_i64(), test.num, "from_bytes({:02x?})", test.serialized);
                }
                Err(_) => {
                    assert!(test.expect_err, "from_bytes({:02x?}): unexpected error", test.serialized);
                }
            }
        }
    }

    #[test]
    fn test_script_num_int32() {
        let tests: Vec<(i64, i32)> = vec![
            (0, 0),
            (-1, -1),
            (2147483647, 2147483647),
            (-2147483648, -2147483648),
            // Clamped values
            (2147483648, 2147483647),
            (-2147483649, -2147483648),
            (i64::MAX, i32::MAX),
            (i64::MIN, i32::MIN),
        ];

        for (input, want) in &tests {
            assert_eq!(ScriptNumber::new(*input).to_i32(), *want, "Int32({})", input);
        }
    }

    #[test]
    fn test_ordering() {
        assert!(ScriptNumber::new(-5) < ScriptNumber::new(3));
        assert_eq!(ScriptNumber::from(7).max(ScriptNumber::new(2)).val, 7);
    }
}
