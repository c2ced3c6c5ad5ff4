//! Pay-to-Witness-Public-Key-Hash (P2WPKH) script template.
//!
//! The locking script is `OP_0 <20-byte key hash>`. The spend has an empty
//! scriptSig and the witness stack `[<sig>, <pubkey>]`; the signature
//! commits to the spent amount through the BIP143 digest.

use btcx_primitives::ec::PrivateKey;
use btcx_script::interpreter::SigVersion;
use btcx_script::{Address, AddressPayload, Script, ScriptError, ScriptWitness};

use crate::sighash::{signature_hash, SighashType};
use crate::template::{check_input_index, signature_with_hash_type, Unlocking, UnlockingScriptTemplate};
use crate::transaction::TransactionLike;
use crate::TransactionError;

/// Create a P2WPKH locking script from a witness key hash address.
pub fn lock(address: &Address) -> Result<Script, TransactionError> {
    match address.payload() {
        AddressPayload::P2WPKH(pkh) => Ok(Script::p2wpkh_script(pkh)),
        other => Err(ScriptError::InvalidAddress(format!(
            "P2WPKH lock needs a witness key hash address, got {:?}",
            other
        ))
        .into()),
    }
}

/// Create a P2WPKH unlocker. `hash_type` defaults to SIGHASH_ALL.
pub fn unlock(private_key: PrivateKey, hash_type: Option<SighashType>) -> P2WPKH {
    P2WPKH {
        private_key,
        hash_type: hash_type.unwrap_or(SighashType::ALL),
    }
}

pub struct P2WPKH {
    private_key: PrivateKey,
    hash_type: SighashType,
}

impl UnlockingScriptTemplate for P2WPKH {
    fn sign<T: TransactionLike>(
        &self,
        tx: &T,
        input_index: usize,
        amount: i64,
    ) -> Result<Unlocking, TransactionError> {
        check_input_index(tx, input_index)?;

        let pub_key = self.private_key.pub_key();
        if !pub_key.is_compressed() {
            return Err(TransactionError::SigningError(
                "witness v0 spends require a compressed public key".to_string(),
            ));
        }

        // the scriptCode of a key hash program is its P2PKH equivalent
        let script_code = Script::p2pkh_script(&pub_key.hash160());
        let digest = signature_hash(
            &script_code,
            tx,
            input_index,
            self.hash_type,
            amount,
            SigVersion::WitnessV0,
        )?;
        let sig = signature_with_hash_type(&self.private_key, &digest, self.hash_type)?;

        Ok(Unlocking {
            script_sig: Script::new(),
            witness: ScriptWitness::new(vec![sig, pub_key.to_compressed().to_vec()]),
        })
    }

    /// Witness items: count, then each length-prefixed item.
    fn estimate_length(&self) -> usize {
        1 + 1 + 73 + 1 + 33
    }
}
