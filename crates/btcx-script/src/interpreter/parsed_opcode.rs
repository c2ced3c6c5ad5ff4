//! Parsed opcode representation and script parser.

use crate::opcodes::*;
use crate::token::{is_minimal_push, ScriptToken, Tokens};
use crate::Script;

use super::config::MAX_SCRIPT_ELEMENT_SIZE;
use super::error::{InterpreterError, InterpreterErrorCode};

/// A parsed opcode with its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpcode {
    /// The opcode byte value.
    pub opcode: u8,
    /// The data payload of push opcodes (empty for non-push opcodes).
    pub data: Vec<u8>,
    /// Byte offset just past this opcode in its script.
    pub end: usize,
}

impl ParsedOpcode {
    /// Return the human-readable name of this opcode.
    pub fn name(&self) -> String {
        opcode_to_string(self.opcode)
    }

    pub fn is_push(&self) -> bool {
        self.opcode <= OP_PUSHDATA4
    }

    /// Opcodes removed from the language; they fail even in unexecuted branches.
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.opcode,
            OP_CAT
                | OP_SUBSTR
                | OP_LEFT
                | OP_RIGHT
                | OP_INVERT
                | OP_AND
                | OP_OR
                | OP_XOR
                | OP_2MUL
                | OP_2DIV
                | OP_MUL
                | OP_DIV
                | OP_MOD
                | OP_LSHIFT
                | OP_RSHIFT
        )
    }

    /// Return true if this opcode is always illegal (OP_VERIF, OP_VERNOTIF).
    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode, OP_VERIF | OP_VERNOTIF)
    }

    /// Opcodes in the `OP_IF..=OP_ENDIF` range are dispatched even when
    /// the current branch is not executing.
    pub fn is_conditional(&self) -> bool {
        (OP_IF..=OP_ENDIF).contains(&self.opcode)
    }

    /// Check that push uses minimal encoding.
    pub fn enforce_minimum_data_push(&self) -> Result<(), InterpreterError> {
        if is_minimal_push(self.opcode, &self.data) {
            return Ok(());
        }
        let data_len = self.data.len();
        let expected = match data_len {
            0 => "OP_0".to_string(),
            1 if self.data[0] == 0x81 => "OP_1NEGATE".to_string(),
            1 if self.data[0] <= 16 => format!("OP_{}", self.data[0]),
            n if n <= OP_DATA_75 as usize => format!("OP_DATA_{}", n),
            n if n <= 0xff => "OP_PUSHDATA1".to_string(),
            _ => "OP_PUSHDATA2".to_string(),
        };
        Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!(
                "data push of {} bytes encoded with opcode {} instead of {}",
                data_len,
                self.name(),
                expected
            ),
        ))
    }
}

/// A parsed script is a sequence of parsed opcodes.
pub type ParsedScript = Vec<ParsedOpcode>;

/// Parse a script for execution.
///
/// A truncated push anywhere fails the whole script. Pushes larger than
/// the element limit are rejected here, before any opcode runs.
pub fn parse_script(script: &Script) -> Result<ParsedScript, InterpreterError> {
    let mut tokens = Tokens::new(script.to_bytes());
    let mut out = Vec::new();
    while let Some(token) = tokens.next() {
        let end = tokens.position();
        match token {
            ScriptToken::Op(opcode) => out.push(ParsedOpcode { opcode, data: Vec::new(), end }),
            ScriptToken::Push { opcode, data, .. } => {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::ElementTooBig,
                        format!(
                            "element size {} exceeds max allowed size {}",
                            data.len(),
                            MAX_SCRIPT_ELEMENT_SIZE
                        ),
                    ));
                }
                out.push(ParsedOpcode { opcode, data, end });
            }
            ScriptToken::Invalid { offset, reason } => {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MalformedPush,
                    format!("opcode at offset {}: {}", offset, reason),
                ));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop(opcode: u8, data: Vec<u8>) -> ParsedOpcode {
        ParsedOpcode { opcode, data, end: 0 }
    }

    #[test]
    fn test_parse_script_offsets() {
        let script = Script::from_hex("0102036a4c0105").unwrap();
        let parsed = parse_script(&script).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].data, vec![0x02, 0x03]);
        assert_eq!(parsed[0].end, 3);
        assert_eq!(parsed[1].opcode, OP_RETURN);
        assert_eq!(parsed[2].opcode, OP_PUSHDATA1);
        assert_eq!(parsed[2].end, 7);
    }

    #[test]
    fn test_parse_script_malformed() {
        let script = Script::from_hex("4c05aabb").unwrap();
        let err = parse_script(&script).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::MalformedPush);
    }

    #[test]
    fn test_parse_script_element_too_big() {
        let mut script = Script::new();
        script.append_push_data(&[0u8; 521]).unwrap();
        let err = parse_script(&script).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::ElementTooBig);
    }

    #[test]
    fn test_enforce_minimum_data_push() {
        assert!(pop(OP_0, vec![]).enforce_minimum_data_push().is_ok());
        assert!(pop(OP_PUSHDATA1, vec![]).enforce_minimum_data_push().is_err());
        assert!(pop(OP_DATA_1, vec![0x05]).enforce_minimum_data_push().is_err());
        assert!(pop(OP_DATA_1, vec![0x81]).enforce_minimum_data_push().is_err());
        assert!(pop(OP_DATA_1, vec![0x11]).enforce_minimum_data_push().is_ok());
        assert!(pop(OP_PUSHDATA1, vec![0xaa; 20]).enforce_minimum_data_push().is_err());
        assert!(pop(OP_PUSHDATA1, vec![0xaa; 76]).enforce_minimum_data_push().is_ok());
        assert!(pop(OP_PUSHDATA2, vec![0xaa; 255]).enforce_minimum_data_push().is_err());
        assert!(pop(OP_PUSHDATA2, vec![0xaa; 256]).enforce_minimum_data_push().is_ok());
    }

    #[test]
    fn test_disabled_and_conditional() {
        assert!(pop(OP_CAT, vec![]).is_disabled());
        assert!(pop(OP_MUL, vec![]).is_disabled());
        assert!(!pop(OP_ADD, vec![]).is_disabled());
        assert!(pop(OP_VERIF, vec![]).is_conditional());
        assert!(!pop(OP_VERIFY, vec![]).is_conditional());
    }
}
