//! Script execution stack.

use super::config::MAX_SCRIPT_NUMBER_LENGTH;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Convert byte array to boolean (Bitcoin consensus rules).
pub fn as_bool(t: &[u8]) -> bool {
    for i in 0..t.len() {
        if t[i] != 0 {
            // Negative 0 is also considered false
            if i == t.len() - 1 && t[i] == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

/// Convert boolean to byte array.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

fn invalid_index(idx: usize, sz: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::InvalidStackOperation,
        format!("index {} is invalid for stack size {}", idx, sz),
    )
}

/// The main data/alt stack used by the script interpreter.
///
/// Indices passed to `peek_*` and `nip_n` count down from the top, so 0 is
/// the top item.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub stk: Vec<Vec<u8>>,
    pub verify_minimal_data: bool,
}

impl Stack {
    pub fn new(verify_minimal_data: bool) -> Self {
        Stack {
            stk: Vec::new(),
            verify_minimal_data,
        }
    }

    pub fn depth(&self) -> usize {
        self.stk.len()
    }

    pub fn push_byte_array(&mut self, data: Vec<u8>) {
        self.stk.push(data);
    }

    pub fn push_int(&mut self, n: &ScriptNumber) {
        self.push_byte_array(n.to_bytes());
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push_byte_array(from_bool(val));
    }

    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.nip_n(0)
    }

    /// Pop a numeric operand of at most 4 bytes.
    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop_byte_array()?;
        ScriptNumber::from_bytes(&data, MAX_SCRIPT_NUMBER_LENGTH, self.verify_minimal_data)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        let data = self.pop_byte_array()?;
        Ok(as_bool(&data))
    }

    pub fn peek_byte_array(&self, idx: usize) -> Result<&[u8], InterpreterError> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(invalid_index(idx, sz));
        }
        Ok(&self.stk[sz - idx - 1])
    }

    /// Read a numeric item without popping it. `max_len` is 5 for lock time operands.
    pub fn peek_int(&self, idx: usize, max_len: usize) -> Result<ScriptNumber, InterpreterError> {
        let data = self.peek_byte_array(idx)?;
        ScriptNumber::from_bytes(data, max_len, self.verify_minimal_data)
    }

    pub fn peek_bool(&self, idx: usize) -> Result<bool, InterpreterError> {
        Ok(as_bool(self.peek_byte_array(idx)?))
    }

    fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, InterpreterError> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(invalid_index(idx, sz));
        }
        Ok(self.stk.remove(sz - idx - 1))
    }

    pub fn nip_n_discard(&mut self, idx: usize) -> Result<(), InterpreterError> {
        self.nip_n(idx)?;
        Ok(())
    }

    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let so2 = self.pop_byte_array()?;
        let so1 = self.pop_byte_array()?;
        self.push_byte_array(so2.clone());
        self.push_byte_array(so1);
        self.push_byte_array(so2);
        Ok(())
    }

    /// Drop the top `n` items; fails without modifying the stack when fewer exist.
    pub fn drop_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n < 1 || n > self.stk.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("attempt to drop {} items from stack of {}", n, self.stk.len()),
            ));
        }
        self.stk.truncate(self.stk.len() - n);
        Ok(())
    }

    pub fn dup_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("attempt to dup {} stack items", n),
            ));
        }
        for _ in 0..n {
            let so = self.peek_byte_array(n - 1)?.to_vec();
            self.push_byte_array(so);
        }
        Ok(())
    }

    pub fn rot_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("attempt to rotate {} stack items", n),
            ));
        }
        let entry = 3 * n - 1;
        self.peek_byte_array(entry)?;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so);
        }
        Ok(())
    }

    pub fn swap_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("attempt to swap {} stack items", n),
            ));
        }
        let entry = 2 * n - 1;
        self.peek_byte_array(entry)?;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so);
        }
        Ok(())
    }

    pub fn over_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("attempt to perform over on {} stack items", n),
            ));
        }
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.peek_byte_array(entry)?.to_vec();
            self.push_byte_array(so);
        }
        Ok(())
    }

    pub fn pick_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let so = self.peek_byte_array(n)?.to_vec();
        self.push_byte_array(so);
        Ok(())
    }

    pub fn roll_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let so = self.nip_n(n)?;
        self.push_byte_array(so);
        Ok(())
    }

    /// Get stack contents as array (bottom to top).
    pub fn get_stack(&self) -> Vec<Vec<u8>> {
        self.stk.clone()
    }

    /// Set stack contents from array (last = top).
    pub fn set_stack(&mut self, data: Vec<Vec<u8>>) {
        self.stk = data;
    }

    pub fn into_inner(self) -> Vec<Vec<u8>> {
        self.stk
    }

    pub fn clear(&mut self) {
        self.stk.clear();
    }
}

/// IF/ELSE/ENDIF state.
///
/// Only the position of the first false entry matters: the branch executes
/// exactly when no entry is false. Every operation is O(1).
#[derive(Debug, Clone, Default)]
pub struct ConditionStack {
    size: usize,
    first_false_pos: Option<usize>,
}

impl ConditionStack {
    pub fn new() -> Self {
        ConditionStack::default()
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn depth(&self) -> usize {
        self.size
    }

    pub fn all_true(&self) -> bool {
        self.first_false_pos.is_none()
    }

    pub fn push_back(&mut self, f: bool) {
        if self.first_false_pos.is_none() && !f {
            self.first_false_pos = Some(self.size);
        }
        self.size += 1;
    }

    pub fn pop_back(&mut self) -> Result<(), InterpreterError> {
        if self.size == 0 {
            return Err(unbalanced("OP_ENDIF"));
        }
        self.size -= 1;
        if self.first_false_pos == Some(self.size) {
            self.first_false_pos = None;
        }
        Ok(())
    }

    /// Flip the innermost entry, as OP_ELSE does.
    pub fn toggle_top(&mut self) -> Result<(), InterpreterError> {
        if self.size == 0 {
            return Err(unbalanced("OP_ELSE"));
        }
        match self.first_false_pos {
            // top is true, becomes the first false
            None => self.first_false_pos = Some(self.size - 1),
            // top is the first false, becomes true
            Some(pos) if pos == self.size - 1 => self.first_false_pos = None,
            // an outer entry is false; the top stays irrelevant
            Some(_) => {}
        }
        Ok(())
    }
}

fn unbalanced(op: &str) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::UnbalancedConditional,
        format!("encountered opcode {} with no matching opcode to begin conditional execution", op),
    )
}
