//! Base58 and Base58Check text codec.
//!
//! Base58Check payloads carry a one-byte version prefix chosen by the
//! active [`ChainParams`](crate::ChainParams) (pubkey-hash, script-hash or
//! secret-key prefix) followed by the raw payload and a 4-byte SHA-256d
//! checksum.

use crate::hash::sha256d;
use crate::PrimitivesError;

/// Encode bytes with the Bitcoin Base58 alphabet.
///
/// Leading zero bytes become leading '1' characters.
pub fn encode(data: &[u8]) -> String {
    bs58::encode(data).with_alphabet(bs58::Alphabet::BITCOIN).into_string()
}

/// Decode a Base58 string.
///
/// # Returns
/// The decoded bytes, or `InvalidBase58` for characters outside the alphabet.
pub fn decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    bs58::decode(s)
        .with_alphabet(bs58::Alphabet::BITCOIN)
        .into_vec()
        .map_err(|e| PrimitivesError::InvalidBase58(e.to_string()))
}

/// Encode `data` followed by its 4-byte SHA-256d checksum.
pub fn check_encode(data: &[u8]) -> String {
    let checksum = sha256d(data);
    let mut payload = Vec::with_capacity(data.len() + 4);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum[..4]);
    encode(&payload)
}

/// Decode a Base58Check string and verify its checksum.
///
/// # Returns
/// The payload without the checksum, `ChecksumMismatch` if the checksum
/// does not match, or `InvalidBase58` for malformed input.
pub fn check_decode(s: &str) -> Result<Vec<u8>, PrimitivesError> {
    let decoded = decode(s)?;
    if decoded.len() < 4 {
        return Err(PrimitivesError::InvalidBase58(
            "data too short for checksum".to_string(),
        ));
    }
    let (payload, checksum) = decoded.split_at(decoded.len() - 4);
    if checksum != &sha256d(payload)[..4] {
        return Err(PrimitivesError::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

/// Base58Check-encode `payload` under a one-byte version prefix.
pub fn encode_prefixed(prefix: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 1);
    data.push(prefix);
    data.extend_from_slice(payload);
    check_encode(&data)
}

/// Decode a Base58Check string into its version prefix and payload.
pub fn decode_prefixed(s: &str) -> Result<(u8, Vec<u8>), PrimitivesError> {
    let mut data = check_decode(s)?;
    if data.is_empty() {
        return Err(PrimitivesError::InvalidBase58("missing version prefix".to_string()));
    }
    let prefix = data.remove(0);
    Ok((prefix, data))
}
