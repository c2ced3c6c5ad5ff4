//! Script execution thread: evaluates one script against a stack.

use tracing::trace;

use crate::opcodes::*;
use crate::Script;

use super::config::{MAX_OPS_PER_SCRIPT, MAX_SCRIPT_SIZE, MAX_STACK_SIZE};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashType;
use super::parsed_opcode::*;
use super::scriptnum::ScriptNumber;
use super::stack::*;
use super::{SigVersion, TxContext};

/// The execution thread for the script interpreter.
///
/// A thread runs a single script. P2SH redeem scripts and witness scripts
/// each get their own thread seeded with the stack left by the previous one.
pub struct Thread<'a> {
    /// The main data stack used during script execution.
    pub dstack: Stack,
    /// The alternate stack used by OP_TOALTSTACK and OP_FROMALTSTACK.
    pub astack: Stack,
    /// Nested IF/ELSE/ENDIF state.
    pub cond_stack: ConditionStack,
    /// The script being executed.
    pub script: Script,
    pub ops: ParsedScript,
    /// Index of the next opcode to execute.
    pub script_off: usize,
    /// Byte offset where the signed script code begins.
    pub begin_code_hash: usize,
    /// Running count of non-push opcodes (checked against the per-script limit).
    pub num_ops: usize,
    pub flags: ScriptFlags,
    pub sig_version: SigVersion,
    /// Optional transaction context for signature and locktime verification.
    pub tx_context: Option<&'a dyn TxContext>,
    /// The transaction input index being verified.
    pub input_idx: usize,
}

impl<'a> Thread<'a> {
    /// Prepare `script` for execution on top of `stack`.
    ///
    /// Fails when the script is over the size limit or contains a
    /// truncated or oversized push.
    pub fn new(
        script: &Script,
        stack: Vec<Vec<u8>>,
        flags: ScriptFlags,
        sig_version: SigVersion,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "script size {} is larger than the max allowed size {}",
                    script.len(),
                    MAX_SCRIPT_SIZE
                ),
            ));
        }

        let ops = parse_script(script)?;
        let verify_minimal_data = flags.has_flag(ScriptFlags::MINIMAL_DATA);
        let mut dstack = Stack::new(verify_minimal_data);
        dstack.set_stack(stack);

        Ok(Thread {
            dstack,
            astack: Stack::new(verify_minimal_data),
            cond_stack: ConditionStack::new(),
            script: script.clone(),
            ops,
            script_off: 0,
            begin_code_hash: 0,
            num_ops: 0,
            flags,
            sig_version,
            tx_context,
            input_idx,
        })
    }

    /// Check if a specific script verification flag is set.
    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Check if any of the given script verification flags are set.
    pub fn has_any(&self, flags: &[ScriptFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// Return true if the current conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.all_true()
    }

    /// Run the script to completion.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while !self.step()? {}
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution".to_string(),
            ));
        }
        Ok(())
    }

    /// Execute one opcode. Returns true once the script is exhausted.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        if self.script_off >= self.ops.len() {
            return Ok(true);
        }

        let pop = self.ops[self.script_off].clone();
        trace!(
            offset = self.script_off,
            opcode = %pop.name(),
            depth = self.dstack.depth(),
            "step"
        );
        self.execute_opcode(&pop)?;
        self.script_off += 1;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > MAX_STACK_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, MAX_STACK_SIZE
                ),
            ));
        }

        Ok(self.script_off >= self.ops.len())
    }

    /// Final data stack, bottom first.
    pub fn into_stack(self) -> Vec<Vec<u8>> {
        self.dstack.into_inner()
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", MAX_OPS_PER_SCRIPT),
                ));
            }
        }

        // Disabled opcodes fail even in unexecuted branches
        if pop.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        if pop.opcode == OP_CODESEPARATOR
            && self.sig_version == SigVersion::Base
            && self.has_flag(ScriptFlags::CONST_SCRIPTCODE)
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::OpCodeSeparator,
                "OP_CODESEPARATOR in legacy script".to_string(),
            ));
        }

        let exec = self.is_branch_executing();

        if pop.is_push() {
            if exec {
                if self.dstack.verify_minimal_data {
                    pop.enforce_minimum_data_push()?;
                }
                self.dstack.push_byte_array(pop.data.clone());
            }
            return Ok(());
        }

        if !exec && !pop.is_conditional() {
            return Ok(());
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_1NEGATE => {
                self.dstack.push_int(&ScriptNumber::new(-1));
                Ok(())
            }
            op if (OP_1..=OP_16).contains(&op) => {
                self.dstack.push_byte_array(vec![op - (OP_1 - 1)]);
                Ok(())
            }
            OP_NOP => Ok(()),
            OP_IF => self.op_if(false),
            OP_NOTIF => self.op_if(true),
            OP_ELSE => self.op_else(),
            OP_ENDIF => self.op_endif(),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),

            // Locktime
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(pop),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(pop),

            // Stack ops
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => self.op_depth(),
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip_n_discard(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            OP_SIZE => self.op_size(),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(pop),

            // Arithmetic
            OP_1ADD => self.op_unary_int(|a| a + 1),
            OP_1SUB => self.op_unary_int(|a| a - 1),
            OP_NEGATE => self.op_unary_int(|a| -a),
            OP_ABS => self.op_unary_int(|a| a.abs()),
            OP_NOT => self.op_unary_int(|a| (a == 0) as i64),
            OP_0NOTEQUAL => self.op_unary_int(|a| (a != 0) as i64),
            OP_ADD => self.op_binary_int(|a, b| a + b),
            OP_SUB => self.op_binary_int(|a, b| a - b),
            OP_BOOLAND => self.op_bool_binop(|a, b| a != 0 && b != 0),
            OP_BOOLOR => self.op_bool_binop(|a, b| a != 0 || b != 0),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a == b),
            OP_NUMEQUALVERIFY => self.op_numequalverify(pop),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| a != b),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a < b),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a > b),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a <= b),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a >= b),
            OP_MIN => self.op_binary_int(|a, b| a.min(b)),
            OP_MAX => self.op_binary_int(|a, b| a.max(b)),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 => self.op_hash(HashType::Ripemd160),
            OP_SHA1 => self.op_hash(HashType::Sha1),
            OP_SHA256 => self.op_hash(HashType::Sha256),
            OP_HASH160 => self.op_hash(HashType::Hash160),
            OP_HASH256 => self.op_hash(HashType::Hash256),
            OP_CODESEPARATOR => {
                self.begin_code_hash = pop.end;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(pop),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(pop),

            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                self.op_upgradable_nop(pop)
            }

            // OP_RESERVED, OP_VER, OP_VERIF, OP_VERNOTIF, OP_RESERVED1/2 and undefined opcodes
            _ => self.op_bad(pop),
        }
    }
}
