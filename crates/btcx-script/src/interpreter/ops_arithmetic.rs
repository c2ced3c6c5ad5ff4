//! Arithmetic operations for the script interpreter.
//!
//! Operands are at most 4 bytes; results are computed in i64 and may be
//! longer when pushed back.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_int(&mut self, f: impl FnOnce(i64) -> i64) -> Result<(), InterpreterError> {
        let m = self.dstack.pop_int()?;
        self.dstack.push_int(&ScriptNumber::new(f(m.val)));
        Ok(())
    }

    pub(crate) fn op_binary_int(
        &mut self,
        f: impl FnOnce(i64, i64) -> i64,
    ) -> Result<(), InterpreterError> {
        let v0 = self.dstack.pop_int()?;
        let v1 = self.dstack.pop_int()?;
        self.dstack.push_int(&ScriptNumber::new(f(v1.val, v0.val)));
        Ok(())
    }

    pub(crate) fn op_bool_binop(
        &mut self,
        f: impl FnOnce(i64, i64) -> bool,
    ) -> Result<(), InterpreterError> {
        self.op_binary_int(|a, b| f(a, b) as i64)
    }

    pub(crate) fn op_numequalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_bool_binop(|a, b| a == b)?;
        self.abstract_verify(pop, InterpreterErrorCode::NumEqualVerify)
    }

    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max_val = self.dstack.pop_int()?;
        let min_val = self.dstack.pop_int()?;
        let x = self.dstack.pop_int()?;
        self.dstack.push_bool(min_val <= x && x < max_val);
        Ok(())
    }
}
