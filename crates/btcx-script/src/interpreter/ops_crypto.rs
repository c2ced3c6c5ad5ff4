//! Crypto operations for the script interpreter.

use btcx_primitives::ec::Signature;
use btcx_primitives::hash;

use crate::token::push_data_prefix;
use crate::Script;

use super::config::{MAX_OPS_PER_SCRIPT, MAX_PUBKEYS_PER_MULTISIG, MAX_SCRIPT_NUMBER_LENGTH};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::thread::Thread;
use super::{SigVersion, TxContext};

const SIGHASH_ALL: u8 = 0x01;
const SIGHASH_SINGLE: u8 = 0x03;
const SIGHASH_ANYONECANPAY: u8 = 0x80;

pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop_byte_array()?;
        let result = match hash_type {
            HashType::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashType::Sha1 => hash::sha1(&buf).to_vec(),
            HashType::Sha256 => hash::sha256(&buf).to_vec(),
            HashType::Hash160 => hash::hash160(&buf).to_vec(),
            HashType::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push_byte_array(result);
        Ok(())
    }

    /// The script from just after the last executed OP_CODESEPARATOR.
    pub(crate) fn sub_script(&self) -> Script {
        Script::from_bytes(&self.script.to_bytes()[self.begin_code_hash..])
    }

    fn context(&self) -> Result<&'a dyn TxContext, InterpreterError> {
        self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no tx context for signature check".to_string(),
            )
        })
    }

    /// Drop pushes of `sig` from a legacy script code.
    fn delete_signature(&self, script_code: Script, sig: &[u8]) -> Result<Script, InterpreterError> {
        if self.sig_version != SigVersion::Base {
            return Ok(script_code);
        }
        let mut pattern = push_data_prefix(sig.len()).map_err(|e| {
            InterpreterError::new(InterpreterErrorCode::ElementTooBig, e.to_string())
        })?;
        pattern.extend_from_slice(sig);
        let (cleaned, found) = script_code.find_and_delete(&Script::from(pattern));
        if found > 0 && self.has_flag(ScriptFlags::CONST_SCRIPTCODE) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigFindAndDelete,
                "signature found in script code".to_string(),
            ));
        }
        Ok(cleaned)
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop_byte_array()?;
        let full_sig_bytes = self.dstack.pop_byte_array()?;
        let ctx = self.context()?;

        let script_code = self.delete_signature(self.sub_script(), &full_sig_bytes)?;

        self.check_signature_encoding(&full_sig_bytes)?;
        self.check_pub_key_encoding(&pk_bytes)?;

        let valid = !full_sig_bytes.is_empty()
            && ctx
                .verify_signature(
                    &full_sig_bytes,
                    &pk_bytes,
                    &script_code,
                    self.input_idx,
                    self.sig_version,
                )
                .unwrap_or(false);

        if !valid && self.has_flag(ScriptFlags::NULL_FAIL) && !full_sig_bytes.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig".to_string(),
            ));
        }
        self.dstack.push_bool(valid);
        Ok(())
    }

    pub(crate) fn op_checksigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
    }

    /// Stack layout, top first: key count, keys, signature count,
    /// signatures, and one extra dummy item consumed by a historic bug.
    /// Keys and signatures are matched in order; a key that does not match
    /// the current signature is skipped for good.
    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let mut i = 1usize;
        let num_pub_keys = self.dstack.peek_int(i - 1, MAX_SCRIPT_NUMBER_LENGTH)?.to_i32();
        if num_pub_keys < 0 || num_pub_keys as usize > MAX_PUBKEYS_PER_MULTISIG {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "number of pubkeys {} out of range 0..={}",
                    num_pub_keys, MAX_PUBKEYS_PER_MULTISIG
                ),
            ));
        }
        let mut num_keys = num_pub_keys as usize;

        self.num_ops += num_keys;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", MAX_OPS_PER_SCRIPT),
            ));
        }

        i += 1;
        let mut ikey = i;
        // counts the items above the signatures, for NULLFAIL cleanup
        let mut ikey2 = num_keys + 2;
        i += num_keys;
        let num_signatures = self.dstack.peek_int(i - 1, MAX_SCRIPT_NUMBER_LENGTH)?.to_i32();
        if num_signatures < 0 || num_signatures > num_pub_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!(
                    "number of signatures {} out of range 0..={}",
                    num_signatures, num_pub_keys
                ),
            ));
        }
        let mut num_sigs = num_signatures as usize;

        i += 1;
        let mut isig = i;
        i += num_sigs;
        if self.dstack.depth() < i {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("checkmultisig needs {} items, stack has {}", i, self.dstack.depth()),
            ));
        }

        let ctx = self.context()?;

        let mut script_code = self.sub_script();
        for k in 0..num_sigs {
            let sig = self.dstack.peek_byte_array(isig + k - 1)?.to_vec();
            script_code = self.delete_signature(script_code, &sig)?;
        }

        let mut success = true;
        while success && num_sigs > 0 {
            let sig = self.dstack.peek_byte_array(isig - 1)?;
            let pub_key = self.dstack.peek_byte_array(ikey - 1)?;

            self.check_signature_encoding(sig)?;
            self.check_pub_key_encoding(pub_key)?;

            let ok = !sig.is_empty()
                && ctx
                    .verify_signature(sig, pub_key, &script_code, self.input_idx, self.sig_version)
                    .unwrap_or(false);
            if ok {
                isig += 1;
                num_sigs -= 1;
            }
            ikey += 1;
            num_keys -= 1;

            if num_sigs > num_keys {
                success = false;
            }
        }

        while i > 1 {
            i -= 1;
            if !success
                && self.has_flag(ScriptFlags::NULL_FAIL)
                && ikey2 == 0
                && !self.dstack.peek_byte_array(0)?.is_empty()
            {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::NullFail,
                    "not all signatures empty on failed checkmultisig".to_string(),
                ));
            }
            ikey2 = ikey2.saturating_sub(1);
            self.dstack.pop_byte_array()?;
        }

        let dummy = self.dstack.pop_byte_array()?;
        if self.has_flag(ScriptFlags::NULL_DUMMY) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!(
                    "multisig dummy argument has length {} instead of 0",
                    dummy.len()
                ),
            ));
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
    }

    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::STRICT_ENCODING) && !is_compressed_or_uncompressed(pub_key) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                "unsupported public key type".to_string(),
            ));
        }
        if self.has_flag(ScriptFlags::WITNESS_PUBKEY_TYPE)
            && self.sig_version == SigVersion::WitnessV0
            && !is_compressed(pub_key)
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::WitnessPubKeyType,
                "witness v0 public key is not compressed".to_string(),
            ));
        }
        Ok(())
    }

    /// Encoding checks on a signature with its trailing hash type byte.
    /// The empty signature always passes so it can serve as a cheap failure.
    pub(crate) fn check_signature_encoding(&self, full_sig: &[u8]) -> Result<(), InterpreterError> {
        if full_sig.is_empty() {
            return Ok(());
        }
        let sig = &full_sig[..full_sig.len() - 1];

        if self.has_any(&[
            ScriptFlags::DER_SIGNATURES,
            ScriptFlags::LOW_S,
            ScriptFlags::STRICT_ENCODING,
        ]) {
            check_strict_der(sig)?;
        }

        if self.has_flag(ScriptFlags::LOW_S) {
            if let Ok(parsed) = Signature::from_der(sig) {
                if !parsed.is_low_s() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::SigHighS,
                        "signature is not canonical due to unnecessarily high S value".to_string(),
                    ));
                }
            }
        }

        if self.has_flag(ScriptFlags::STRICT_ENCODING) {
            let shf = full_sig[full_sig.len() - 1];
            let base = shf & !SIGHASH_ANYONECANPAY;
            if !(SIGHASH_ALL..=SIGHASH_SINGLE).contains(&base) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::InvalidSigHashType,
                    format!("invalid hash type 0x{:x}", shf),
                ));
            }
        }

        Ok(())
    }
}

fn is_compressed_or_uncompressed(pub_key: &[u8]) -> bool {
    match pub_key.first() {
        Some(0x04) => pub_key.len() == 65,
        Some(0x02) | Some(0x03) => pub_key.len() == 33,
        _ => false,
    }
}

fn is_compressed(pub_key: &[u8]) -> bool {
    pub_key.len() == 33 && matches!(pub_key[0], 0x02 | 0x03)
}

fn der_error(code: InterpreterErrorCode, msg: String) -> InterpreterError {
    InterpreterError::new(code, format!("malformed signature: {}", msg))
}

/// Strict DER check on a signature without its hash type byte.
///
/// Layout: `0x30 len 0x02 rlen R 0x02 slen S`, where R and S are minimal
/// positive big-endian integers.
pub(crate) fn check_strict_der(sig: &[u8]) -> Result<(), InterpreterError> {
    use InterpreterErrorCode::*;

    let sig_len = sig.len();
    if sig_len < 8 {
        return Err(der_error(SigTooShort, format!("too short: {} < 8", sig_len)));
    }
    if sig_len > 72 {
        return Err(der_error(SigTooLong, format!("too long: {} > 72", sig_len)));
    }
    if sig[0] != 0x30 {
        return Err(der_error(SigInvalidSeqID, format!("format has wrong type: {:#x}", sig[0])));
    }
    if sig[1] as usize != sig_len - 2 {
        return Err(der_error(
            SigInvalidDataLen,
            format!("bad length: {} != {}", sig[1], sig_len - 2),
        ));
    }

    let r_len = sig[3] as usize;
    let s_type_offset = 4 + r_len;
    let s_len_offset = s_type_offset + 1;

    if s_type_offset >= sig_len {
        return Err(der_error(SigMissingSTypeID, "S type indicator missing".to_string()));
    }
    if s_len_offset >= sig_len {
        return Err(der_error(SigMissingSLen, "S length missing".to_string()));
    }

    let s_offset = s_len_offset + 1;
    let s_len = sig[s_len_offset] as usize;
    if s_offset + s_len != sig_len {
        return Err(der_error(SigInvalidSLen, "invalid S length".to_string()));
    }

    if sig[2] != 0x02 {
        return Err(der_error(
            SigInvalidRIntID,
            format!("R integer marker: {:#x} != 0x02", sig[2]),
        ));
    }
    if r_len == 0 {
        return Err(der_error(SigZeroRLen, "R length is zero".to_string()));
    }
    if sig[4] & 0x80 != 0 {
        return Err(der_error(SigNegativeR, "R is negative".to_string()));
    }
    if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return Err(der_error(SigTooMuchRPadding, "R value has too much padding".to_string()));
    }

    if sig[s_type_offset] != 0x02 {
        return Err(der_error(
            SigInvalidSIntID,
            format!("S integer marker: {:#x} != 0x02", sig[s_type_offset]),
        ));
    }
    if s_len == 0 {
        return Err(der_error(SigZeroSLen, "S length is zero".to_string()));
    }
    if sig[s_offset] & 0x80 != 0 {
        return Err(der_error(SigNegativeS, "S is negative".to_string()));
    }
    if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
        return Err(der_error(SigTooMuchSPadding, "S value has too much padding".to_string()));
    }

    Ok(())
}
