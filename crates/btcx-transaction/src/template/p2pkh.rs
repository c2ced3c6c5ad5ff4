//! Pay-to-Public-Key-Hash (P2PKH) script template.
//!
//! Creates standard P2PKH locking scripts (`OP_DUP OP_HASH160 <hash>
//! OP_EQUALVERIFY OP_CHECKSIG`) and unlocking scripts (`<sig> <pubkey>`).

use btcx_primitives::ec::PrivateKey;
use btcx_script::interpreter::SigVersion;
use btcx_script::{Address, AddressPayload, Script, ScriptError};

use crate::sighash::{signature_hash, SighashType};
use crate::template::{check_input_index, signature_with_hash_type, Unlocking, UnlockingScriptTemplate};
use crate::transaction::TransactionLike;
use crate::TransactionError;

/// Create a P2PKH locking script from a P2PKH address.
///
/// # Returns
/// The 25-byte locking script, or an error if `address` pays to anything
/// other than a public key hash.
pub fn lock(address: &Address) -> Result<Script, TransactionError> {
    match address.payload() {
        AddressPayload::P2PKH(pkh) => Ok(Script::p2pkh_script(pkh)),
        other => Err(ScriptError::InvalidAddress(format!(
            "P2PKH lock needs a key hash address, got {:?}",
            other
        ))
        .into()),
    }
}

/// Create a P2PKH unlocker. `hash_type` defaults to SIGHASH_ALL.
pub fn unlock(private_key: PrivateKey, hash_type: Option<SighashType>) -> P2PKH {
    P2PKH {
        private_key,
        hash_type: hash_type.unwrap_or(SighashType::ALL),
    }
}

/// P2PKH signing template holding a private key and sighash type.
pub struct P2PKH {
    private_key: PrivateKey,
    hash_type: SighashType,
}

impl UnlockingScriptTemplate for P2PKH {
    /// Computes the legacy signature hash over the P2PKH script of the
    /// key and builds `<DER_sig || hash_type> <pubkey>`. The key is
    /// serialized in its own encoding, so an uncompressed key spends the
    /// uncompressed hash.
    fn sign<T: TransactionLike>(
        &self,
        tx: &T,
        input_index: usize,
        amount: i64,
    ) -> Result<Unlocking, TransactionError> {
        check_input_index(tx, input_index)?;

        let pub_key = self.private_key.pub_key();
        let script_code = Script::p2pkh_script(&pub_key.hash160());
        let digest = signature_hash(
            &script_code,
            tx,
            input_index,
            self.hash_type,
            amount,
            SigVersion::Base,
        )?;
        let sig = signature_with_hash_type(&self.private_key, &digest, self.hash_type)?;

        let mut script_sig = Script::new();
        script_sig.append_push_data(&sig)?;
        script_sig.append_push_data(&pub_key.to_bytes())?;

        Ok(Unlocking { script_sig, ..Default::default() })
    }

    /// 1 + 73 (DER sig + hash type) + 1 + 33 (compressed key).
    fn estimate_length(&self) -> usize {
        108
    }
}
