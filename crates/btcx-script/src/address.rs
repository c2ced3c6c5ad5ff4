/// Bitcoin address handling.
///
/// An address is a payload (key hash, script hash or witness program) plus
/// the chain parameters that choose its text prefix. Base58Check covers the
/// legacy forms, bech32 the witness v0 forms.

use std::fmt;

use btcx_primitives::ec::PublicKey;
use btcx_primitives::hash::{hash160, sha256};
use btcx_primitives::{base58, segwit_addr, ChainParams};

use crate::token::ScriptToken;
use crate::opcodes::*;
use crate::{Script, ScriptError};

/// What an address commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressPayload {
    /// Hash160 of a public key.
    P2PKH([u8; 20]),
    /// Hash160 of a redeem script.
    P2SH([u8; 20]),
    /// Hash160 of a compressed public key, witness v0.
    P2WPKH([u8; 20]),
    /// SHA-256 of a witness script, witness v0.
    P2WSH([u8; 32]),
}

/// An address bound to the chain it is rendered for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    payload: AddressPayload,
    params: ChainParams,
}

impl Address {
    pub fn new(payload: AddressPayload, params: &ChainParams) -> Self {
        Address { payload, params: params.clone() }
    }

    /// Parse an address string for the given chain.
    ///
    /// Strings starting with `<hrp>1` are decoded as bech32, anything else
    /// as Base58Check with the chain's pubkey-hash or script-hash prefix.
    pub fn from_str(s: &str, params: &ChainParams) -> Result<Self, ScriptError> {
        let bech32_prefix = format!("{}1", params.bech32_hrp);
        if s.to_lowercase().starts_with(&bech32_prefix) {
            return Self::from_bech32(s, params);
        }

        let (prefix, data) = base58::decode_prefixed(s)?;
        if data.len() != 20 {
            return Err(ScriptError::InvalidAddress(format!(
                "base58 payload of {} bytes, want 20",
                data.len()
            )));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data);
        let payload = if prefix == params.pubkey_hash_prefix {
            AddressPayload::P2PKH(hash)
        } else if prefix == params.script_hash_prefix {
            AddressPayload::P2SH(hash)
        } else {
            return Err(ScriptError::UnexpectedPrefix(prefix, params.name.clone()));
        };
        Ok(Self::new(payload, params))
    }

    fn from_bech32(s: &str, params: &ChainParams) -> Result<Self, ScriptError> {
        let (version, program) = segwit_addr::decode(&params.bech32_hrp, s)?;
        if version != 0 {
            return Err(ScriptError::InvalidAddress(format!(
                "witness version {} addresses are not supported",
                version
            )));
        }
        let payload = match program.len() {
            20 => {
                let mut h = [0u8; 20];
                h.copy_from_slice(&program);
                AddressPayload::P2WPKH(h)
            }
            32 => {
                let mut h = [0u8; 32];
                h.copy_from_slice(&program);
                AddressPayload::P2WSH(h)
            }
            n => {
                return Err(ScriptError::InvalidAddress(format!(
                    "witness v0 program of {} bytes",
                    n
                )))
            }
        };
        Ok(Self::new(payload, params))
    }

    /// Address of a standard output script.
    ///
    /// Only the exact P2PKH, P2SH, P2WPKH and P2WSH byte patterns are
    /// recognised.
    pub fn from_script_pubkey(script: &Script, params: &ChainParams) -> Result<Self, ScriptError> {
        let b = script.to_bytes();
        let payload = if script.is_p2pkh() {
            AddressPayload::P2PKH(array20(&b[3..23]))
        } else if script.is_p2sh() {
            AddressPayload::P2SH(array20(&b[2..22]))
        } else if script.is_p2wpkh() {
            AddressPayload::P2WPKH(array20(&b[2..22]))
        } else if script.is_p2wsh() {
            let mut h = [0u8; 32];
            h.copy_from_slice(&b[2..34]);
            AddressPayload::P2WSH(h)
        } else {
            return Err(ScriptError::InvalidAddress(format!(
                "no address form for script {}",
                script.to_asm()
            )));
        };
        Ok(Self::new(payload, params))
    }

    /// Like [`Address::from_script_pubkey`], plus two wallet conveniences:
    /// a P2PKH pattern whose hash push is not minimally encoded, and a
    /// bare `<pubkey> OP_CHECKSIG` script, both mapped to P2PKH.
    ///
    /// The resulting address does not reproduce the original script, so
    /// this must never feed validation.
    pub fn from_script_pubkey_lenient(
        script: &Script,
        params: &ChainParams,
    ) -> Result<Self, ScriptError> {
        if let Ok(addr) = Self::from_script_pubkey(script, params) {
            return Ok(addr);
        }
        let tokens: Vec<ScriptToken> = script.tokens().collect();
        match tokens.as_slice() {
            [ScriptToken::Op(OP_DUP), ScriptToken::Op(OP_HASH160), ScriptToken::Push { data, .. }, ScriptToken::Op(OP_EQUALVERIFY), ScriptToken::Op(OP_CHECKSIG)]
                if data.len() == 20 =>
            {
                Ok(Self::new(AddressPayload::P2PKH(array20(data)), params))
            }
            [ScriptToken::Push { data, .. }, ScriptToken::Op(OP_CHECKSIG)] => {
                let key = PublicKey::from_bytes(data)?;
                Ok(Self::from_pubkey(&key, params))
            }
            _ => Err(ScriptError::InvalidAddress(format!(
                "no address form for script {}",
                script.to_asm()
            ))),
        }
    }

    /// P2PKH address of a key, hashing the key in its own encoding.
    pub fn from_pubkey(key: &PublicKey, params: &ChainParams) -> Self {
        Self::new(AddressPayload::P2PKH(key.hash160()), params)
    }

    /// P2WPKH address of a compressed key.
    pub fn from_pubkey_witness(key: &PublicKey, params: &ChainParams) -> Result<Self, ScriptError> {
        if !key.is_compressed() {
            return Err(ScriptError::InvalidAddress(
                "witness key hash requires a compressed public key".to_string(),
            ));
        }
        Ok(Self::new(AddressPayload::P2WPKH(key.hash160()), params))
    }

    pub fn from_redeem_script(redeem: &Script, params: &ChainParams) -> Self {
        Self::new(AddressPayload::P2SH(hash160(redeem.to_bytes())), params)
    }

    pub fn from_witness_script(witness_script: &Script, params: &ChainParams) -> Self {
        Self::new(AddressPayload::P2WSH(sha256(witness_script.to_bytes())), params)
    }

    pub fn payload(&self) -> &AddressPayload {
        &self.payload
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// The output script paying to this address.
    pub fn to_script_pubkey(&self) -> Script {
        match &self.payload {
            AddressPayload::P2PKH(h) => Script::p2pkh_script(h),
            AddressPayload::P2SH(h) => Script::p2sh_script(h),
            AddressPayload::P2WPKH(h) => Script::p2wpkh_script(h),
            AddressPayload::P2WSH(h) => Script::p2wsh_script(h),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            AddressPayload::P2PKH(h) => {
                write!(f, "{}", base58::encode_prefixed(self.params.pubkey_hash_prefix, h))
            }
            AddressPayload::P2SH(h) => {
                write!(f, "{}", base58::encode_prefixed(self.params.script_hash_prefix, h))
            }
            AddressPayload::P2WPKH(h) => write_bech32(f, &self.params.bech32_hrp, h),
            AddressPayload::P2WSH(h) => write_bech32(f, &self.params.bech32_hrp, h),
        }
    }
}

fn write_bech32(f: &mut fmt::Formatter<'_>, hrp: &str, program: &[u8]) -> fmt::Result {
    let s = segwit_addr::encode(hrp, 0, program).map_err(|_| fmt::Error)?;
    write!(f, "{}", s)
}

fn array20(b: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(b);
    out
}

#[cfg(test)]
mod tests {
    //! Tests for address parsing, rendering and script mapping across
    //! chains.

    use super::*;

    const PKH_HEX: &str = "8fe80c75c9560e8b56ed64ea3c26e18d2c52211b";

    fn mainnet() -> ChainParams {
        ChainParams::mainnet()
    }

    // -----------------------------------------------------------------------
    // Base58 forms
    // -----------------------------------------------------------------------

    /// Parse a known mainnet P2PKH address and verify the hash.
    #[test]
    fn test_from_str_mainnet_p2pkh() {
        let addr = Address::from_str("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr", &mainnet())
            .expect("should parse mainnet");
        match addr.payload() {
            AddressPayload::P2PKH(h) => assert_eq!(hex::encode(h), PKH_HEX),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(addr.to_string(), "1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr");
    }

    /// The same hash on testnet renders with the testnet prefix.
    #[test]
    fn test_from_str_testnet_p2pkh() {
        let testnet = ChainParams::testnet();
        let addr = Address::from_str("mtdruWYVEV1wz5yL7GvpBj4MgifCB7yhPd", &testnet)
            .expect("should parse testnet");
        assert_eq!(addr.payload(), &AddressPayload::P2PKH(array20(&hex::decode(PKH_HEX).expect("hex"))));
    }

    /// A mainnet address is rejected under testnet parameters.
    #[test]
    fn test_from_str_wrong_chain() {
        let err = Address::from_str("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr", &ChainParams::testnet());
        assert!(matches!(err, Err(ScriptError::UnexpectedPrefix(0x00, _))));
    }

    #[test]
    fn test_from_str_bad_checksum() {
        assert!(Address::from_str("1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMs", &mainnet()).is_err());
    }

    #[test]
    fn test_p2sh_roundtrip() {
        let redeem = Script::from_bytes(&[OP_1]);
        let addr = Address::from_redeem_script(&redeem, &mainnet());
        let s = addr.to_string();
        assert!(s.starts_with('3'));
        let back = Address::from_str(&s, &mainnet()).expect("parses");
        assert_eq!(back, addr);
        assert_eq!(back.to_script_pubkey(), redeem.to_p2sh_script_pubkey().expect("small"));
    }

    // -----------------------------------------------------------------------
    // Bech32 forms
    // -----------------------------------------------------------------------

    /// BIP173 mainnet P2WPKH vector.
    #[test]
    fn test_bech32_p2wpkh() {
        let addr = Address::from_str("BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4", &mainnet())
            .expect("bip173 vector");
        assert_eq!(
            addr.to_script_pubkey().to_hex(),
            "0014751e76e8199196d454941c45d1b3a323f1433bd6"
        );
        assert_eq!(addr.to_string(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
    }

    /// BIP173 testnet P2WSH vector.
    #[test]
    fn test_bech32_p2wsh() {
        let testnet = ChainParams::testnet();
        let s = "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";
        let addr = Address::from_str(s, &testnet).expect("bip173 vector");
        assert_eq!(
            addr.to_script_pubkey().to_hex(),
            "00201863143c14c5166804bd19203356da136c985678cd4d27a1b8c6329604903262"
        );
        assert_eq!(addr.to_string(), s);
        assert!(Address::from_str(s, &mainnet()).is_err());
    }

    // -----------------------------------------------------------------------
    // Script mapping
    // -----------------------------------------------------------------------

    #[test]
    fn test_from_script_pubkey() {
        let spk = Script::from_hex("76a9148fe80c75c9560e8b56ed64ea3c26e18d2c52211b88ac").expect("hex");
        let addr = Address::from_script_pubkey(&spk, &mainnet()).expect("p2pkh");
        assert_eq!(addr.to_string(), "1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr");
        assert_eq!(addr.to_script_pubkey(), spk);

        let op_return = Script::from_bytes(&[OP_RETURN]);
        assert!(Address::from_script_pubkey(&op_return, &mainnet()).is_err());
    }

    /// Bare checksig only maps to an address through the lenient path.
    #[test]
    fn test_bare_checksig_lenient_only() {
        let key = PublicKey::from_hex(
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        )
        .expect("valid key");
        let mut spk = Script::new();
        spk.append_push_data(&key.to_bytes()).expect("push");
        spk.append_opcodes(&[OP_CHECKSIG]).expect("op");

        assert!(Address::from_script_pubkey(&spk, &mainnet()).is_err());
        let addr = Address::from_script_pubkey_lenient(&spk, &mainnet()).expect("lenient");
        assert_eq!(addr, Address::from_pubkey(&key, &mainnet()));
        assert_ne!(addr.to_script_pubkey(), spk);
    }

    /// A P2PKH pattern with an OP_PUSHDATA1 hash push maps only leniently.
    #[test]
    fn test_non_canonical_p2pkh_lenient() {
        let mut b = vec![OP_DUP, OP_HASH160, OP_PUSHDATA1, 20];
        b.extend_from_slice(&hex::decode(PKH_HEX).expect("hex"));
        b.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        let spk = Script::from_bytes(&b);
        assert!(Address::from_script_pubkey(&spk, &mainnet()).is_err());
        let addr = Address::from_script_pubkey_lenient(&spk, &mainnet()).expect("lenient");
        assert_eq!(addr.to_string(), "1E7ucTTWRTahCyViPhxSMor2pj4VGQdFMr");
    }

    #[test]
    fn test_from_pubkey_witness_requires_compressed() {
        let key = PublicKey::from_hex(
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        )
        .expect("valid key");
        let addr = Address::from_pubkey_witness(&key, &mainnet()).expect("compressed");
        assert_eq!(addr.to_string(), "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");

        let uncompressed = PublicKey::from_bytes(&key.to_uncompressed()).expect("valid");
        assert!(Address::from_pubkey_witness(&uncompressed, &mainnet()).is_err());
    }
}
