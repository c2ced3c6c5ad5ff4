//! Spend verification: running the script interpreter against a transaction.
//!
//! [`TransactionChecker`] gives the interpreter the transaction data it
//! needs for signature and lock time opcodes. [`verify_script`] checks one
//! input; [`verify_transaction_inputs`] checks all of them against the
//! outputs they spend.

use btcx_primitives::ec::{PublicKey, Signature};
use btcx_script::interpreter::{
    Engine, InterpreterError, InterpreterErrorCode, ScriptFlags, SigVersion, TxContext,
};
use btcx_script::{Script, ScriptWitness};
use tracing::{debug, debug_span};

use crate::input::TxInLike;
use crate::output::TxOutLike;
use crate::sighash::signature_hash;
use crate::transaction::TransactionLike;
use crate::TransactionError;

/// Interpreter context for one input of a transaction.
pub struct TransactionChecker<'a, T: TransactionLike> {
    tx: &'a T,
    amount: i64,
}

impl<'a, T: TransactionLike> TransactionChecker<'a, T> {
    /// `amount` is the value of the output spent by the checked input.
    pub fn new(tx: &'a T, amount: i64) -> Self {
        TransactionChecker { tx, amount }
    }
}

impl<'a, T: TransactionLike> TxContext for TransactionChecker<'a, T> {
    /// Splits off the hash type byte, computes the digest for `script_code`
    /// and verifies with the public key. Unparseable keys or signatures
    /// give `Ok(false)`.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        input_idx: usize,
        sig_version: SigVersion,
    ) -> Result<bool, InterpreterError> {
        let (hash_type, der) = match full_sig.split_last() {
            Some(parts) => parts,
            None => return Ok(false),
        };
        let key = match PublicKey::from_bytes(pub_key) {
            Ok(k) => k,
            Err(_) => return Ok(false),
        };
        let sig = match Signature::from_der(der) {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };

        let digest = signature_hash(
            script_code,
            self.tx,
            input_idx,
            *hash_type as u32,
            self.amount,
            sig_version,
        )
        .map_err(|e| InterpreterError::new(InterpreterErrorCode::InvalidIndex, e.to_string()))?;

        Ok(key.verify(&digest, &sig))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time()
    }

    fn tx_version(&self) -> i32 {
        self.tx.version()
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx.inputs().get(input_idx).map_or(0, |i| i.sequence())
    }
}

/// Verify that input `input_index` of `tx` may spend an output locked by
/// `script_pubkey` holding `amount`.
///
/// `script_sig` and `witness` are passed explicitly so a caller can check
/// candidate unlocking data before placing it in the transaction.
pub fn verify_script<T: TransactionLike>(
    script_sig: &Script,
    script_pubkey: &Script,
    witness: &ScriptWitness,
    tx: &T,
    input_index: usize,
    flags: ScriptFlags,
    amount: i64,
) -> Result<(), TransactionError> {
    let span = debug_span!("verify_script", input_index, flags = flags.0);
    let _enter = span.enter();

    if input_index >= tx.inputs().len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs().len()
        )));
    }

    let checker = TransactionChecker::new(tx, amount);
    Engine::new().verify(script_sig, script_pubkey, witness, flags, Some(&checker), input_index)?;
    Ok(())
}

/// Verify every input of `tx` against the outputs it spends.
///
/// `spent_outputs[i]` is the output spent by input `i`. Stops at the first
/// failing input unless `full_report` is set, in which case every input is
/// evaluated and all failures are returned together as
/// [`TransactionError::InputsInvalid`].
pub fn verify_transaction_inputs<T, O>(
    tx: &T,
    spent_outputs: &[O],
    flags: ScriptFlags,
    full_report: bool,
) -> Result<(), TransactionError>
where
    T: TransactionLike,
    O: TxOutLike,
{
    if spent_outputs.len() != tx.inputs().len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "{} spent outputs given for {} inputs",
            spent_outputs.len(),
            tx.inputs().len()
        )));
    }

    let empty = ScriptWitness::default();
    let mut failures = Vec::new();
    for (i, (input, spent)) in tx.inputs().iter().zip(spent_outputs).enumerate() {
        let witness = tx.input_witness(i).unwrap_or(&empty);
        let result = verify_script(
            input.script_sig(),
            spent.script_pubkey(),
            witness,
            tx,
            i,
            flags,
            spent.value(),
        );
        match result {
            Ok(()) => {}
            Err(TransactionError::Verify(e)) if full_report => {
                debug!(input = i, error = %e, "input failed verification");
                failures.push((i, e));
            }
            Err(e) => return Err(e),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(TransactionError::InputsInvalid(failures))
    }
}
