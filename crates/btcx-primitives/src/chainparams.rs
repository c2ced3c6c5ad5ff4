//! Per-network constants.
//!
//! A `ChainParams` value is passed explicitly to the address and key codecs
//! and to whole-transaction checks. Nothing in the workspace keeps a global
//! "current network"; callers that handle several networks simply hold
//! several values.

use serde::{Deserialize, Serialize};

use crate::PrimitivesError;

/// Number of base units in one coin.
pub const COIN: i64 = 100_000_000;

/// Network-dependent constants used by the text codecs and consensus checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    /// Lookup name, e.g. `bitcoin/mainnet`.
    pub name: String,
    /// Human-friendly name.
    pub readable_name: String,
    /// Default JSON-RPC port of a full node on this network.
    pub rpc_port: u16,
    /// Largest amount any output or sum of outputs may carry.
    pub max_money: i64,
    /// Base58 version byte of pay-to-pubkey-hash addresses.
    pub pubkey_hash_prefix: u8,
    /// Base58 version byte of pay-to-script-hash addresses.
    pub script_hash_prefix: u8,
    /// Base58 version byte of WIF secret keys.
    pub secret_key_prefix: u8,
    /// Bech32 human-readable part of segwit addresses.
    pub bech32_hrp: String,
}

impl ChainParams {
    pub fn mainnet() -> Self {
        ChainParams {
            name: "bitcoin/mainnet".to_string(),
            readable_name: "Bitcoin".to_string(),
            rpc_port: 8332,
            max_money: 21_000_000 * COIN,
            pubkey_hash_prefix: 0x00,
            script_hash_prefix: 0x05,
            secret_key_prefix: 0x80,
            bech32_hrp: "bc".to_string(),
        }
    }

    pub fn testnet() -> Self {
        ChainParams {
            name: "bitcoin/testnet".to_string(),
            readable_name: "Bitcoin testnet".to_string(),
            rpc_port: 18332,
            pubkey_hash_prefix: 0x6f,
            script_hash_prefix: 0xc4,
            secret_key_prefix: 0xef,
            bech32_hrp: "tb".to_string(),
            ..Self::mainnet()
        }
    }

    pub fn regtest() -> Self {
        ChainParams {
            name: "bitcoin/regtest".to_string(),
            readable_name: "Bitcoin regtest".to_string(),
            rpc_port: 18443,
            bech32_hrp: "bcrt".to_string(),
            ..Self::testnet()
        }
    }

    /// Look up one of the built-in networks by name.
    pub fn by_name(name: &str) -> Result<Self, PrimitivesError> {
        Self::all()
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| PrimitivesError::UnknownChain(name.to_string()))
    }

    /// All built-in networks, mainnet first.
    pub fn all() -> Vec<Self> {
        vec![Self::mainnet(), Self::testnet(), Self::regtest()]
    }

    /// Whether `value` lies within `0..=max_money`.
    pub fn money_range(&self, value: i64) -> bool {
        (0..=self.max_money).contains(&value)
    }
}

impl Default for ChainParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(ChainParams::by_name("bitcoin/regtest").unwrap().bech32_hrp, "bcrt");
        assert_eq!(ChainParams::by_name("bitcoin/testnet").unwrap().rpc_port, 18332);
        assert!(matches!(
            ChainParams::by_name("litecoin/mainnet"),
            Err(PrimitivesError::UnknownChain(_))
        ));
    }

    #[test]
    fn test_regtest_shares_testnet_prefixes() {
        let t = ChainParams::testnet();
        let r = ChainParams::regtest();
        assert_eq!(t.pubkey_hash_prefix, r.pubkey_hash_prefix);
        assert_eq!(t.script_hash_prefix, r.script_hash_prefix);
        assert_ne!(t.bech32_hrp, r.bech32_hrp);
    }

    #[test]
    fn test_money_range() {
        let p = ChainParams::mainnet();
        assert!(p.money_range(0));
        assert!(p.money_range(21_000_000 * COIN));
        assert!(!p.money_range(21_000_000 * COIN + 1));
        assert!(!p.money_range(-1));
    }

    #[test]
    fn test_json_roundtrip() {
        let p = ChainParams::testnet();
        let json = serde_json::to_string(&p).unwrap();
        let back: ChainParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
