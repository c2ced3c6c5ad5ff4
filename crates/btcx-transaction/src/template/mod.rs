//! Script templates for common output types.
//!
//! A template knows how to lock an output to a key and how to produce the
//! unlocking data that spends it. [`sign_input`] runs a template against a
//! [`MutableTransaction`] and stores the result in the input.

pub mod p2pkh;
pub mod p2wpkh;

use btcx_primitives::ec::{PrivateKey, Signature};
use btcx_script::{Script, ScriptWitness};

use crate::sighash::SighashType;
use crate::transaction::{MutableTransaction, TransactionLike};
use crate::TransactionError;

/// Unlocking data for one input: a scriptSig, a witness stack, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Unlocking {
    pub script_sig: Script,
    pub witness: ScriptWitness,
}

/// Trait for templates that produce unlocking data.
///
/// `sign` receives the whole transaction, the input index and the value of
/// the spent output, computes the signature hash the template's script
/// type requires, and returns the unlocking data.
pub trait UnlockingScriptTemplate {
    fn sign<T: TransactionLike>(
        &self,
        tx: &T,
        input_index: usize,
        amount: i64,
    ) -> Result<Unlocking, TransactionError>;

    /// Upper estimate of the bytes the unlocking data adds, for fee
    /// calculation before signing.
    fn estimate_length(&self) -> usize;
}

/// Sign input `input_index` of `tx` with `template`, replacing its
/// scriptSig and witness stack.
pub fn sign_input<U: UnlockingScriptTemplate>(
    tx: &mut MutableTransaction,
    input_index: usize,
    template: &U,
    amount: i64,
) -> Result<(), TransactionError> {
    let unlocking = template.sign(&*tx, input_index, amount)?;
    tx.inputs[input_index].script_sig = unlocking.script_sig;
    if !unlocking.witness.is_null() || input_index < tx.witness.inputs.len() {
        *tx.input_witness_mut(input_index) = unlocking.witness;
    }
    Ok(())
}

pub(crate) fn check_input_index<T: TransactionLike>(
    tx: &T,
    input_index: usize,
) -> Result<(), TransactionError> {
    if input_index >= tx.inputs().len() {
        return Err(TransactionError::SigningError(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs().len()
        )));
    }
    Ok(())
}

/// DER signature of `digest` followed by the hash type byte.
pub(crate) fn signature_with_hash_type(
    key: &PrivateKey,
    digest: &[u8; 32],
    hash_type: SighashType,
) -> Result<Vec<u8>, TransactionError> {
    let signature: Signature = key.sign(digest)?;
    let der = signature.to_der();
    let mut sig = Vec::with_capacity(der.len() + 1);
    sig.extend_from_slice(&der);
    sig.push(hash_type.to_byte());
    Ok(sig)
}
