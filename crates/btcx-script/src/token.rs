/// Script tokenization.
///
/// A script is a flat sequence of tokens: plain opcodes and data pushes.
/// Tokenizing is total. A truncated push yields one final
/// [`ScriptToken::Invalid`] and the iterator stops, so callers can keep and
/// compare scripts that would never execute.

use crate::opcodes::*;
use crate::ScriptError;

/// One element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptToken {
    /// A non-push opcode, including `OP_1NEGATE` and `OP_1..=OP_16`.
    Op(u8),
    /// A data push. `OP_0` is an empty push.
    Push {
        /// The push opcode as written (`OP_0`, a direct length or `OP_PUSHDATA*`).
        opcode: u8,
        /// The pushed bytes.
        data: Vec<u8>,
        /// Whether this is the smallest encoding for `data`.
        minimal: bool,
    },
    /// The remainder of the script could not be parsed.
    Invalid {
        /// Byte offset of the opcode that failed to parse.
        offset: usize,
        /// What went wrong.
        reason: String,
    },
}

impl ScriptToken {
    /// The opcode byte of this token, `None` for an invalid tail.
    pub fn opcode(&self) -> Option<u8> {
        match self {
            ScriptToken::Op(op) => Some(*op),
            ScriptToken::Push { opcode, .. } => Some(*opcode),
            ScriptToken::Invalid { .. } => None,
        }
    }

    /// Pushed data, if this is a push.
    pub fn push_data(&self) -> Option<&[u8]> {
        match self {
            ScriptToken::Push { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ScriptToken::Invalid { .. })
    }

    /// ASM rendering: pushes as hex (`0` for the empty push), opcodes by
    /// name, an invalid tail as `[error]`.
    pub fn to_asm_string(&self) -> String {
        match self {
            ScriptToken::Op(op) => opcode_to_string(*op),
            ScriptToken::Push { data, .. } if data.is_empty() => "0".to_string(),
            ScriptToken::Push { data, .. } => hex::encode(data),
            ScriptToken::Invalid { .. } => "[error]".to_string(),
        }
    }
}

/// Restartable iterator over the tokens of a byte script.
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Tokens<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Tokens { bytes, pos: 0, done: false }
    }

    /// Offset of the next token to be yielded.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn invalid(&mut self, offset: usize, reason: &str) -> ScriptToken {
        self.done = true;
        self.pos = self.bytes.len();
        ScriptToken::Invalid { offset, reason: reason.to_string() }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = ScriptToken;

    fn next(&mut self) -> Option<ScriptToken> {
        if self.done || self.pos >= self.bytes.len() {
            return None;
        }
        let b = self.bytes;
        let start = self.pos;
        let op = b[start];

        let (header, len) = match op {
            OP_0 => (1, 0),
            OP_DATA_1..=OP_DATA_75 => (1, op as usize),
            OP_PUSHDATA1 => match b.get(start + 1) {
                Some(&n) => (2, n as usize),
                None => return Some(self.invalid(start, "OP_PUSHDATA1: missing data length")),
            },
            OP_PUSHDATA2 => match b.get(start + 1..start + 3) {
                Some(n) => (3, u16::from_le_bytes([n[0], n[1]]) as usize),
                None => return Some(self.invalid(start, "OP_PUSHDATA2: missing data length")),
            },
            OP_PUSHDATA4 => match b.get(start + 1..start + 5) {
                Some(n) => (5, u32::from_le_bytes([n[0], n[1], n[2], n[3]]) as usize),
                None => return Some(self.invalid(start, "OP_PUSHDATA4: missing data length")),
            },
            _ => {
                self.pos += 1;
                return Some(ScriptToken::Op(op));
            }
        };

        let data_start = start + header;
        if b.len() - data_start < len {
            return Some(self.invalid(start, "push data exceeds script length"));
        }
        let data = b[data_start..data_start + len].to_vec();
        self.pos = data_start + len;
        let minimal = is_minimal_push(op, &data);
        Some(ScriptToken::Push { opcode: op, data, minimal })
    }
}

/// Whether `opcode` is the smallest way to push `data`.
///
/// Single bytes `1..=16` and `0x81` count as non-minimal when pushed as data,
/// since `OP_1..=OP_16` and `OP_1NEGATE` encode them in one byte.
pub fn is_minimal_push(opcode: u8, data: &[u8]) -> bool {
    match data.len() {
        0 => opcode == OP_0,
        1 if (1..=16).contains(&data[0]) => false,
        1 if data[0] == 0x81 => false,
        n if n <= OP_DATA_75 as usize => opcode as usize == n,
        n if n <= 0xff => opcode == OP_PUSHDATA1,
        n if n <= 0xffff => opcode == OP_PUSHDATA2,
        _ => true,
    }
}

/// Length prefix for a push of `data_len` bytes, using the shortest form.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

#[cfg(test)]
mod tests {
    //! Tokenizer behaviour on well-formed, non-canonical and truncated input.

    use super::*;

    // -----------------------------------------------------------------------
    // Well-formed scripts
    // -----------------------------------------------------------------------

    /// Three direct pushes decode to three push tokens.
    #[test]
    fn test_tokens_simple() {
        let bytes = hex::decode("05000102030401ff02abcd").expect("valid hex");
        let tokens: Vec<_> = Tokens::new(&bytes).collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].push_data(), Some(&[0, 1, 2, 3, 4][..]));
        assert_eq!(tokens[2].push_data(), Some(&[0xab, 0xcd][..]));
        assert!(tokens.iter().all(|t| !t.is_invalid()));
    }

    /// A multisig script with two OP_PUSHDATA1 pushes decodes to five tokens.
    #[test]
    fn test_tokens_complex() {
        let script_hex = "524c53ff0488b21e000000000000000000362f7a9030543db8751401c387d6a71e870f1895b3a62569d455e8ee5f5f5e5f03036624c6df96984db6b4e625b6707c017eb0e0d137cd13a0c989bfa77a4473fd000000004c53ff0488b21e0000000000000000008b20425398995f3c866ea6ce5c1828a516b007379cf97b136bffbdc86f75df14036454bad23b019eae34f10aff8b8d6d8deb18cb31354e5a169ee09d8a4560e8250000000052ae";
        let bytes = hex::decode(script_hex).expect("valid hex");
        let tokens: Vec<_> = Tokens::new(&bytes).collect();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], ScriptToken::Op(OP_2));
        // 0x53 bytes via OP_PUSHDATA1 could have used a direct push
        match &tokens[1] {
            ScriptToken::Push { opcode, data, minimal } => {
                assert_eq!(*opcode, OP_PUSHDATA1);
                assert_eq!(data.len(), 0x53);
                assert!(!*minimal);
            }
            other => panic!("expected push, got {:?}", other),
        }
        assert_eq!(tokens[4], ScriptToken::Op(OP_CHECKMULTISIG));
    }

    /// OP_0 is an empty, minimal push; OP_RETURN does not swallow the tail.
    #[test]
    fn test_tokens_op0_and_return() {
        let bytes = [OP_0, OP_RETURN, 0x01, 0xaa];
        let tokens: Vec<_> = Tokens::new(&bytes).collect();
        assert_eq!(
            tokens,
            vec![
                ScriptToken::Push { opcode: OP_0, data: vec![], minimal: true },
                ScriptToken::Op(OP_RETURN),
                ScriptToken::Push { opcode: 0x01, data: vec![0xaa], minimal: true },
            ]
        );
    }

    /// Iterating twice yields the same sequence.
    #[test]
    fn test_tokens_restartable() {
        let bytes = hex::decode("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac").expect("valid hex");
        let it = Tokens::new(&bytes);
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    // -----------------------------------------------------------------------
    // Truncated scripts
    // -----------------------------------------------------------------------

    /// A direct push announcing 5 bytes with 3 present ends in Invalid.
    #[test]
    fn test_tokens_truncated_direct_push() {
        let bytes = hex::decode("51050000").expect("valid hex");
        let tokens: Vec<_> = Tokens::new(&bytes).collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], ScriptToken::Op(OP_1));
        match &tokens[1] {
            ScriptToken::Invalid { offset, .. } => assert_eq!(*offset, 1),
            other => panic!("expected invalid, got {:?}", other),
        }
    }

    /// Each OP_PUSHDATA form with a missing length field ends in Invalid.
    #[test]
    fn test_tokens_missing_length() {
        for bytes in [vec![OP_PUSHDATA1], vec![OP_PUSHDATA2, 0x01], vec![OP_PUSHDATA4, 0, 0]] {
            let tokens: Vec<_> = Tokens::new(&bytes).collect();
            assert_eq!(tokens.len(), 1);
            assert!(tokens[0].is_invalid());
        }
    }

    /// OP_PUSHDATA4 claiming 4 GiB does not allocate or panic.
    #[test]
    fn test_tokens_huge_pushdata4() {
        let bytes = [OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff, 0x00];
        let tokens: Vec<_> = Tokens::new(&bytes).collect();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_invalid());
    }

    // -----------------------------------------------------------------------
    // Minimal pushes and prefixes
    // -----------------------------------------------------------------------

    #[test]
    fn test_is_minimal_push() {
        assert!(is_minimal_push(OP_0, &[]));
        assert!(!is_minimal_push(OP_PUSHDATA1, &[]));
        assert!(!is_minimal_push(0x01, &[0x05]));
        assert!(!is_minimal_push(0x01, &[0x81]));
        assert!(is_minimal_push(0x01, &[0x00]));
        assert!(is_minimal_push(0x01, &[0x11]));
        assert!(is_minimal_push(OP_PUSHDATA1, &[0u8; 76]));
        assert!(!is_minimal_push(OP_PUSHDATA2, &[0u8; 76]));
        assert!(is_minimal_push(OP_PUSHDATA2, &[0u8; 256]));
    }

    /// Prefix sizes switch at 76, 256 and 65536 bytes.
    #[test]
    fn test_push_data_prefix_boundaries() {
        assert_eq!(push_data_prefix(0).expect("ok"), vec![0x00]);
        assert_eq!(push_data_prefix(75).expect("ok"), vec![0x4b]);
        assert_eq!(push_data_prefix(76).expect("ok"), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(255).expect("ok"), vec![OP_PUSHDATA1, 0xff]);
        assert_eq!(push_data_prefix(256).expect("ok"), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(
            push_data_prefix(65536).expect("ok"),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_to_asm_string() {
        assert_eq!(ScriptToken::Op(OP_DUP).to_asm_string(), "OP_DUP");
        let push = ScriptToken::Push { opcode: 20, data: vec![0xab; 20], minimal: true };
        assert_eq!(push.to_asm_string(), "ab".repeat(20));
        let empty = ScriptToken::Push { opcode: OP_0, data: vec![], minimal: true };
        assert_eq!(empty.to_asm_string(), "0");
    }
}
