/// btcx - Byte codec, hashing, keys and text codecs.
///
/// This crate provides the foundational building blocks shared by the
/// script and transaction crates:
/// - Little-endian integer and CompactSize codec with hostile-input bounds
/// - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Chain hash type for transaction identification
/// - secp256k1 keys and ECDSA signatures (via `k256`)
/// - Base58Check and bech32 segwit address codecs
/// - Chain parameters (mainnet, testnet, regtest)

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod base58;
pub mod segwit_addr;
pub mod ec;
pub mod chainparams;

mod error;
pub use error::PrimitivesError;
pub use chainparams::ChainParams;
