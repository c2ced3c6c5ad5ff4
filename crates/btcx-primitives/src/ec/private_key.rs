//! secp256k1 private key.
//!
//! Wraps a k256 `SigningKey` and adds WIF encoding under explicit chain
//! parameters, scalar tweaking and the compressed-pubkey preference that
//! WIF carries.

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::Field;
use k256::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::base58;
use crate::chainparams::ChainParams;
use crate::ec::public_key::{scalar_from_tweak, PublicKey};
use crate::ec::signature::Signature;
use crate::PrimitivesError;

/// Length of a serialized private key in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Trailing WIF byte marking a compressed public key.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
    compressed: bool,
}

impl PrivateKey {
    /// Generate a random key (compressed public key form).
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
            compressed: true,
        }
    }

    /// Create a key from a 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the scalar is in `1..N`, or `InvalidPrivateKey`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner, compressed: true })
    }

    /// Create a key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Decode a WIF string for the given network.
    ///
    /// The payload is 32 key bytes, optionally followed by `0x01` when the
    /// matching public key is compressed.
    pub fn from_wif(wif: &str, params: &ChainParams) -> Result<Self, PrimitivesError> {
        let (prefix, mut payload) = base58::decode_prefixed(wif).map_err(|e| match e {
            PrimitivesError::ChecksumMismatch => e,
            other => PrimitivesError::InvalidWif(other.to_string()),
        })?;
        if prefix != params.secret_key_prefix {
            payload.zeroize();
            return Err(PrimitivesError::UnexpectedPrefix(prefix));
        }
        let compressed = match payload.len() {
            33 if payload[32] == COMPRESS_MAGIC => true,
            32 => false,
            n => {
                payload.zeroize();
                return Err(PrimitivesError::InvalidWif(format!(
                    "malformed private key: invalid length {}",
                    n
                )));
            }
        };
        let key = Self::from_bytes(&payload[..PRIVATE_KEY_BYTES_LEN]);
        payload.zeroize();
        Ok(key?.with_compressed(compressed))
    }

    /// Encode as WIF for the given network.
    pub fn to_wif(&self, params: &ChainParams) -> String {
        let mut payload = Vec::with_capacity(PRIVATE_KEY_BYTES_LEN + 1);
        payload.extend_from_slice(&self.to_bytes());
        if self.compressed {
            payload.push(COMPRESS_MAGIC);
        }
        let out = base58::encode_prefixed(params.secret_key_prefix, &payload);
        payload.zeroize();
        out
    }

    /// Return a copy that derives its public key in the given form.
    pub fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Whether the derived public key is compressed.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The 32-byte big-endian scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derive the matching public key.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(*self.inner.verifying_key(), self.compressed)
    }

    /// Sign a 32-byte digest (RFC6979, low S).
    pub fn sign(&self, hash: &[u8; 32]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    /// Return `(self + tweak) mod N`.
    pub fn add_tweak(&self, tweak: &[u8; 32]) -> Result<PrivateKey, PrimitivesError> {
        let t = scalar_from_tweak(tweak)?;
        let sum: Scalar = *self.inner.as_nonzero_scalar().as_ref() + t;
        if bool::from(sum.is_zero()) {
            return Err(PrimitivesError::InvalidTweak("tweaked key is zero".to_string()));
        }
        let inner = SigningKey::from_bytes(&sum.to_bytes())
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner, compressed: self.compressed })
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}
