//! Flow control and lock time operations for the script interpreter.

use super::config::{
    LOCKTIME_NUMBER_LENGTH, LOCKTIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG,
    SEQUENCE_LOCKTIME_MASK, SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::stack::as_bool;
use super::thread::Thread;
use super::SigVersion;

impl<'a> Thread<'a> {
    pub(crate) fn op_bad(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::BadOpcode,
            format!("attempt to execute invalid opcode {}", pop.name()),
        ))
    }

    /// Pop the IF/NOTIF argument. Witness v0 scripts under MINIMALIF
    /// accept only the empty vector and `0x01`.
    fn pop_if_bool(&mut self) -> Result<bool, InterpreterError> {
        let b = self.dstack.pop_byte_array().map_err(|_| {
            InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "conditional with empty stack".to_string(),
            )
        })?;
        if self.sig_version == SigVersion::WitnessV0 && self.has_flag(ScriptFlags::MINIMAL_IF) {
            if b.len() > 1 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalIf,
                    format!("conditional has data of length {}", b.len()),
                ));
            }
            if b.len() == 1 && b[0] != 1 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalIf,
                    format!("conditional argument 0x{:02x} is not minimal", b[0]),
                ));
            }
        }
        Ok(as_bool(&b))
    }

    /// OP_IF and OP_NOTIF. Unexecuted branches push a false entry without
    /// touching the data stack.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        let mut value = false;
        if self.cond_stack.all_true() {
            value = self.pop_if_bool()? != negate;
        }
        self.cond_stack.push_back(value);
        Ok(())
    }

    pub(crate) fn op_else(&mut self) -> Result<(), InterpreterError> {
        self.cond_stack.toggle_top()
    }

    pub(crate) fn op_endif(&mut self) -> Result<(), InterpreterError> {
        self.cond_stack.pop_back()
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        let verified = self.dstack.pop_bool()?;
        if !verified {
            return Err(InterpreterError::new(code, format!("{} failed", pop.name())));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::OpReturn,
            "script returned early".to_string(),
        ))
    }

    pub(crate) fn op_upgradable_nop(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNops,
                format!("{} reserved for soft-fork upgrades", pop.name()),
            ));
        }
        Ok(())
    }

    /// BIP65. The argument stays on the stack.
    pub(crate) fn op_check_locktime_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECKLOCKTIMEVERIFY) {
            return self.op_upgradable_nop(pop);
        }

        let lock_time = self.dstack.peek_int(0, LOCKTIME_NUMBER_LENGTH)?.to_i64();
        if lock_time < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", lock_time),
            ));
        }

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for CHECKLOCKTIMEVERIFY".to_string(),
            )
        })?;

        let tx_lock_time = ctx.lock_time() as i64;
        verify_lock_time(tx_lock_time, LOCKTIME_THRESHOLD as i64, lock_time)?;

        // a final input would let the lock time be bypassed
        if ctx.input_sequence(self.input_idx) == SEQUENCE_FINAL {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized".to_string(),
            ));
        }

        Ok(())
    }

    /// BIP112. The argument stays on the stack.
    pub(crate) fn op_check_sequence_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECKSEQUENCEVERIFY) {
            return self.op_upgradable_nop(pop);
        }

        let sequence = self.dstack.peek_int(0, LOCKTIME_NUMBER_LENGTH)?.to_i64();
        if sequence < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative sequence: {}", sequence),
            ));
        }

        if sequence & (SEQUENCE_LOCKTIME_DISABLE_FLAG as i64) != 0 {
            return Ok(());
        }

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for CHECKSEQUENCEVERIFY".to_string(),
            )
        })?;

        if (ctx.tx_version() as u32) < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("invalid transaction version: {}", ctx.tx_version()),
            ));
        }

        let tx_sequence = ctx.input_sequence(self.input_idx) as i64;
        if tx_sequence & (SEQUENCE_LOCKTIME_DISABLE_FLAG as i64) != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!(
                    "transaction sequence has sequence locktime disabled bit set: 0x{:x}",
                    tx_sequence
                ),
            ));
        }

        let lock_time_mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
        verify_lock_time(
            tx_sequence & lock_time_mask,
            SEQUENCE_LOCKTIME_TYPE_FLAG as i64,
            sequence & lock_time_mask,
        )
    }
}

/// Both lock times must be of the same kind (height or time), and the
/// script's must not exceed the transaction's.
pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "mismatched locktime types -- tx locktime {}, stack locktime {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "locktime requirement not satisfied -- locktime is greater than the transaction locktime: {} > {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_lock_time() {
        let t = LOCKTIME_THRESHOLD as i64;
        assert!(verify_lock_time(100, t, 100).is_ok());
        assert!(verify_lock_time(100, t, 50).is_ok());
        assert!(verify_lock_time(100, t, 101).is_err());
        // height against timestamp
        assert!(verify_lock_time(100, t, t + 1).is_err());
        assert!(verify_lock_time(t + 10, t, t + 5).is_ok());
    }
}
