//! Bitcoin script interpreter.
//!
//! Evaluates a spend of one output: the input's script_sig, the output's
//! script_pubkey and the input's witness, under a set of [`ScriptFlags`].
//! P2SH redeem scripts (BIP16) and witness v0 programs (BIP141) are
//! evaluated when their flags are set.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers
//! provide a [`TxContext`] implementation that computes signature hashes
//! and exposes the lock time fields.
//!
//! # Example
//!
//! ```ignore
//! use btcx_script::interpreter::{Engine, ScriptFlags};
//!
//! let engine = Engine::new();
//! engine.verify(
//!     &script_sig,
//!     &script_pubkey,
//!     &witness,
//!     ScriptFlags::STANDARD,
//!     Some(&checker),
//!     0,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use btcx_primitives::hash::sha256;
use tracing::debug;

use crate::token::push_data_prefix;
use crate::{Script, ScriptWitness};
use config::MAX_SCRIPT_ELEMENT_SIZE;
use stack::as_bool;
use thread::Thread;

/// Which signature hash algorithm a script's signatures commit to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigVersion {
    /// Legacy scripts and P2SH redeem scripts.
    Base,
    /// Witness v0 scripts (BIP143).
    WitnessV0,
}

/// Transaction data needed by signature and lock time opcodes.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// `full_sig` includes the sighash type byte at the end and is never
    /// empty. `script_code` is the signed portion of the executing script,
    /// with signature pushes already removed for [`SigVersion::Base`].
    ///
    /// Returns Ok(true) if valid, Ok(false) if invalid. Errors count as
    /// an invalid signature.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        input_idx: usize,
        sig_version: SigVersion,
    ) -> Result<bool, InterpreterError>;

    /// The spending transaction's nLockTime, read by OP_CHECKLOCKTIMEVERIFY.
    fn lock_time(&self) -> u32;

    /// The spending transaction's version, read by OP_CHECKSEQUENCEVERIFY.
    fn tx_version(&self) -> i32;

    /// Get the sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// The script execution engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Verify a spend without witness data.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        self.verify(
            unlocking_script,
            locking_script,
            &ScriptWitness::default(),
            flags,
            tx_context,
            input_idx,
        )
    }

    /// Verify that `script_sig` and `witness` satisfy `script_pubkey`.
    ///
    /// # Arguments
    /// * `script_sig` - The input's unlocking script.
    /// * `script_pubkey` - The spent output's locking script.
    /// * `witness` - The input's witness stack (empty for legacy spends).
    /// * `flags` - Verification flags.
    /// * `tx_context` - Transaction context for signature and lock time opcodes.
    /// * `input_idx` - The input index being verified.
    pub fn verify(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        witness: &ScriptWitness,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let result = self.verify_inner(script_sig, script_pubkey, witness, flags, tx_context, input_idx);
        if let Err(e) = &result {
            debug!(input_idx, code = %e.code, "script verification failed: {}", e.description);
        }
        result
    }

    fn verify_inner(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        witness: &ScriptWitness,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        if flags.has_flag(ScriptFlags::CLEAN_STACK)
            && !flags.has_flag(ScriptFlags::P2SH | ScriptFlags::WITNESS)
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "CLEAN_STACK requires P2SH and WITNESS".to_string(),
            ));
        }
        if flags.has_flag(ScriptFlags::WITNESS) && !flags.has_flag(ScriptFlags::P2SH) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "WITNESS requires P2SH".to_string(),
            ));
        }

        if flags.has_flag(ScriptFlags::SIG_PUSH_ONLY) && !script_sig.is_push_only() {
            return Err(not_push_only("signature script is not push only"));
        }

        let stack = self.eval_script(Vec::new(), script_sig, flags, SigVersion::Base, tx_context, input_idx)?;
        let stack_copy = if flags.has_flag(ScriptFlags::P2SH) {
            stack.clone()
        } else {
            Vec::new()
        };
        let mut stack =
            self.eval_script(stack, script_pubkey, flags, SigVersion::Base, tx_context, input_idx)?;
        check_true(&stack)?;

        let mut had_witness = false;
        if flags.has_flag(ScriptFlags::WITNESS) {
            if let (Some(version), Some(program)) =
                (script_pubkey.witness_version(), script_pubkey.witness_program())
            {
                had_witness = true;
                if !script_sig.is_empty() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessMalleated,
                        "native witness program spent with a non-empty script_sig".to_string(),
                    ));
                }
                self.verify_witness_program(witness, version, program, flags, tx_context, input_idx)?;
                stack.truncate(1);
            }
        }

        if flags.has_flag(ScriptFlags::P2SH) && script_pubkey.is_p2sh() {
            if !script_sig.is_push_only() {
                return Err(not_push_only("pay to script hash is not push only"));
            }

            stack = stack_copy;
            // the hash check above fails on an empty stack
            let redeem_bytes = stack.pop().ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::EvalFalse,
                    "missing redeem script".to_string(),
                )
            })?;
            let redeem_script = Script::from(redeem_bytes);

            stack = self.eval_script(stack, &redeem_script, flags, SigVersion::Base, tx_context, input_idx)?;
            check_true(&stack)?;

            if flags.has_flag(ScriptFlags::WITNESS) {
                if let (Some(version), Some(program)) =
                    (redeem_script.witness_version(), redeem_script.witness_program())
                {
                    had_witness = true;
                    let mut expected = push_data_prefix(redeem_script.len()).map_err(|e| {
                        InterpreterError::new(InterpreterErrorCode::ElementTooBig, e.to_string())
                    })?;
                    expected.extend_from_slice(redeem_script.to_bytes());
                    if script_sig.to_bytes() != expected.as_slice() {
                        return Err(InterpreterError::new(
                            InterpreterErrorCode::WitnessMalleatedP2SH,
                            "script_sig must be exactly one push of the witness program".to_string(),
                        ));
                    }
                    self.verify_witness_program(witness, version, program, flags, tx_context, input_idx)?;
                    stack.truncate(1);
                }
            }
        }

        if flags.has_flag(ScriptFlags::CLEAN_STACK) && stack.len() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", stack.len().saturating_sub(1)),
            ));
        }

        if flags.has_flag(ScriptFlags::WITNESS) && !had_witness && !witness.is_null() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::WitnessUnexpected,
                "witness supplied for a non-witness spend".to_string(),
            ));
        }

        Ok(())
    }

    /// Run a single script on `stack` and return the resulting stack.
    pub fn eval_script(
        &self,
        stack: Vec<Vec<u8>>,
        script: &Script,
        flags: ScriptFlags,
        sig_version: SigVersion,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<Vec<Vec<u8>>, InterpreterError> {
        let mut thread = Thread::new(script, stack, flags, sig_version, tx_context, input_idx)?;
        thread.execute()?;
        Ok(thread.into_stack())
    }

    fn verify_witness_program(
        &self,
        witness: &ScriptWitness,
        version: u8,
        program: &[u8],
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        if version != 0 {
            if flags.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::DiscourageUpgradableWitnessProgram,
                    format!("witness version {} reserved for soft-fork upgrades", version),
                ));
            }
            // future versions are anyone-can-spend
            return Ok(());
        }

        let mut stack = witness.stack().to_vec();
        let script = match program.len() {
            32 => {
                let witness_script = stack.pop().ok_or_else(|| {
                    InterpreterError::new(
                        InterpreterErrorCode::WitnessProgramWitnessEmpty,
                        "witness script hash program with empty witness".to_string(),
                    )
                })?;
                if sha256(&witness_script)[..] != *program {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessProgramMismatch,
                        "witness script does not match its hash".to_string(),
                    ));
                }
                Script::from(witness_script)
            }
            20 => {
                if stack.len() != 2 {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessProgramMismatch,
                        format!("key hash program needs 2 witness items, got {}", stack.len()),
                    ));
                }
                let mut hash = [0u8; 20];
                hash.copy_from_slice(program);
                Script::p2pkh_script(&hash)
            }
            n => {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::WitnessProgramWrongLength,
                    format!("witness v0 program of {} bytes", n),
                ));
            }
        };

        if let Some(item) = stack.iter().find(|i| i.len() > MAX_SCRIPT_ELEMENT_SIZE) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "witness item size {} exceeds max allowed size {}",
                    item.len(),
                    MAX_SCRIPT_ELEMENT_SIZE
                ),
            ));
        }

        let stack = self.eval_script(stack, &script, flags, SigVersion::WitnessV0, tx_context, input_idx)?;
        // witness scripts always require a clean stack
        if stack.len() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("witness script left {} items", stack.len()),
            ));
        }
        check_true(&stack)
    }
}

fn check_true(stack: &[Vec<u8>]) -> Result<(), InterpreterError> {
    match stack.last() {
        Some(top) if as_bool(top) => Ok(()),
        _ => Err(InterpreterError::new(
            InterpreterErrorCode::EvalFalse,
            "false stack entry at end of script execution".to_string(),
        )),
    }
}

fn not_push_only(msg: &str) -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::NotPushOnly, msg.to_string())
}
