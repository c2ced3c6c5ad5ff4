/// Unified error type for all primitives operations.
///
/// Covers errors from the byte codec, hashing, EC operations and text encodings.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// Truncated, oversized or non-canonical serialized data.
    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid WIF format: {0}")]
    InvalidWif(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("point not on curve")]
    PointNotOnCurve,

    #[error("invalid tweak: {0}")]
    InvalidTweak(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("invalid base58: {0}")]
    InvalidBase58(String),

    #[error("invalid bech32: {0}")]
    InvalidBech32(String),

    #[error("unexpected base58 prefix: {0:#04x}")]
    UnexpectedPrefix(u8),

    #[error("unknown chain: {0}")]
    UnknownChain(String),
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}

impl From<k256::ecdsa::Error> for PrimitivesError {
    fn from(e: k256::ecdsa::Error) -> Self {
        PrimitivesError::InvalidPublicKey(e.to_string())
    }
}
