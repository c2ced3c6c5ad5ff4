//! secp256k1 public key.
//!
//! Keeps track of whether the key arrived in compressed or uncompressed
//! SEC1 form, because script hashes commit to the exact serialization.

use std::fmt;

use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, ProjectivePoint, Scalar};

use crate::ec::signature::Signature;
use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a compressed public key.
pub const COMPRESSED_LEN: usize = 33;

/// Length of an uncompressed public key.
pub const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key.
#[derive(Clone, Debug)]
pub struct PublicKey {
    inner: VerifyingKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse SEC1 bytes (33-byte compressed or 65-byte uncompressed).
    ///
    /// The 65-byte hybrid forms (prefix 0x06 or 0x07) are accepted when the
    /// prefix parity matches Y and are treated as uncompressed. Rejecting
    /// them is left to the script interpreter's encoding policy.
    ///
    /// # Returns
    /// `Ok(PublicKey)` on success, or `InvalidPublicKey` if the bytes do not
    /// encode a point on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let compressed = match bytes.len() {
            COMPRESSED_LEN => true,
            UNCOMPRESSED_LEN => false,
            n => {
                return Err(PrimitivesError::InvalidPublicKey(format!(
                    "invalid length {}",
                    n
                )))
            }
        };
        let inner = match bytes[0] {
            0x06 | 0x07 if !compressed => {
                if bytes[0] & 1 != bytes[UNCOMPRESSED_LEN - 1] & 1 {
                    return Err(PrimitivesError::InvalidPublicKey(
                        "hybrid prefix does not match y parity".to_string(),
                    ));
                }
                let mut plain = [0u8; UNCOMPRESSED_LEN];
                plain.copy_from_slice(bytes);
                plain[0] = 0x04;
                VerifyingKey::from_sec1_bytes(&plain)?
            }
            _ => VerifyingKey::from_sec1_bytes(bytes)?,
        };
        Ok(PublicKey { inner, compressed })
    }

    /// Parse a hex-encoded SEC1 key.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        Self::from_bytes(&hex::decode(hex_str)?)
    }

    /// Whether the key serializes in compressed form.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Serialize in the form the key was created with.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.to_encoded_point(self.compressed).as_bytes().to_vec()
    }

    /// Serialize in compressed SEC1 form (33 bytes).
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(self.inner.to_encoded_point(true).as_bytes());
        out
    }

    /// Serialize in uncompressed SEC1 form (65 bytes).
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(self.inner.to_encoded_point(false).as_bytes());
        out
    }

    /// Lowercase hex of [`to_bytes`](Self::to_bytes).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Hash160 of the serialized key, as committed to by pay-to-pubkey-hash.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    /// Verify an ECDSA signature over a 32-byte digest.
    pub fn verify(&self, hash: &[u8; 32], sig: &Signature) -> bool {
        sig.verify(hash, self)
    }

    /// Return `self + tweak·G`.
    ///
    /// # Returns
    /// The tweaked key (same compression), or `InvalidTweak` if the tweak is
    /// not below the curve order or the result is the point at infinity.
    pub fn add_tweak(&self, tweak: &[u8; 32]) -> Result<PublicKey, PrimitivesError> {
        let t = scalar_from_tweak(tweak)?;
        let point = self.to_projective_point() + ProjectivePoint::GENERATOR * t;
        Self::from_projective(point, self.compressed)
    }

    /// Sum several public keys into one.
    ///
    /// The result is compressed. Fails on an empty list or when the sum is
    /// the point at infinity.
    pub fn combine(keys: &[PublicKey]) -> Result<PublicKey, PrimitivesError> {
        if keys.is_empty() {
            return Err(PrimitivesError::InvalidPublicKey("no keys to combine".to_string()));
        }
        let sum = keys
            .iter()
            .fold(ProjectivePoint::IDENTITY, |acc, k| acc + k.to_projective_point());
        Self::from_projective(sum, true)
    }

    pub(crate) fn from_verifying_key(vk: VerifyingKey, compressed: bool) -> Self {
        PublicKey { inner: vk, compressed }
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }

    fn to_projective_point(&self) -> ProjectivePoint {
        ProjectivePoint::from(*self.inner.as_affine())
    }

    fn from_projective(point: ProjectivePoint, compressed: bool) -> Result<PublicKey, PrimitivesError> {
        if point == ProjectivePoint::IDENTITY {
            return Err(PrimitivesError::InvalidTweak("result is the point at infinity".to_string()));
        }
        let inner = VerifyingKey::from_affine(point.to_affine())?;
        Ok(PublicKey { inner, compressed })
    }
}

/// Interpret 32 bytes as a scalar strictly below the curve order.
pub(crate) fn scalar_from_tweak(tweak: &[u8; 32]) -> Result<Scalar, PrimitivesError> {
    Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*tweak)))
        .ok_or_else(|| PrimitivesError::InvalidTweak("tweak is not below the curve order".to_string()))
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed && self.inner == other.inner
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::PrivateKey;

    const UNCOMPRESSED: &str = "0411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5c\
                                b2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3";
    const COMPRESSED_EVEN: &str = "02ce0b14fb842b1ba549fdd675c98075f12e9c510f8ef52bd021a9a1f4809d3b4d";
    const COMPRESSED_ODD: &str = "032689c7c2dab13309fb143e0e8fe396342521887e976690b6b47f5b2a4b7d448e";

    #[test]
    fn test_parse_valid_and_invalid() {
        assert!(PublicKey::from_hex(UNCOMPRESSED).is_ok());
        assert!(PublicKey::from_hex(COMPRESSED_EVEN).is_ok());
        assert!(PublicKey::from_hex(COMPRESSED_ODD).is_ok());

        // x coordinate altered, no longer on the curve
        let off_curve = format!("0415{}", &UNCOMPRESSED[4..]);
        assert!(PublicKey::from_hex(&off_curve).is_err());
        assert!(PublicKey::from_bytes(&[0x05]).is_err());
        assert!(PublicKey::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_parse_hybrid() {
        let plain = hex::decode(UNCOMPRESSED).unwrap();
        let odd = plain[UNCOMPRESSED_LEN - 1] & 1;

        let mut hybrid = plain.clone();
        hybrid[0] = 0x06 | odd;
        let key = PublicKey::from_bytes(&hybrid).unwrap();
        assert!(!key.is_compressed());
        assert_eq!(key.to_bytes(), plain);

        hybrid[0] = 0x06 | (odd ^ 1);
        assert!(PublicKey::from_bytes(&hybrid).is_err());

        // hybrid prefix is meaningless on a 33-byte key
        let mut short = hex::decode(COMPRESSED_EVEN).unwrap();
        short[0] = 0x06;
        assert!(PublicKey::from_bytes(&short).is_err());
    }

    #[test]
    fn test_serialization_preserves_form() {
        let u = PublicKey::from_hex(UNCOMPRESSED).unwrap();
        assert!(!u.is_compressed());
        assert_eq!(u.to_hex(), UNCOMPRESSED);
        assert_eq!(u.to_bytes().len(), UNCOMPRESSED_LEN);

        let c = PublicKey::from_hex(COMPRESSED_EVEN).unwrap();
        assert!(c.is_compressed());
        assert_eq!(format!("{}", c), COMPRESSED_EVEN);
        assert_ne!(u, PublicKey::from_bytes(&u.to_compressed()).unwrap());
    }

    #[test]
    fn test_hash160_depends_on_form() {
        let u = PublicKey::from_hex(UNCOMPRESSED).unwrap();
        let c = PublicKey::from_bytes(&u.to_compressed()).unwrap();
        assert_ne!(u.hash160(), c.hash160());
    }

    #[test]
    fn test_add_tweak_matches_private_tweak() {
        let key = PrivateKey::from_bytes(&[0x01; 32]).unwrap();
        let tweak = [0x02; 32];
        let via_pub = key.pub_key().add_tweak(&tweak).unwrap();
        let via_priv = key.add_tweak(&tweak).unwrap().pub_key();
        assert_eq!(via_pub, via_priv);
    }

    #[test]
    fn test_tweak_out_of_range() {
        let key = PublicKey::from_hex(COMPRESSED_EVEN).unwrap();
        assert!(matches!(key.add_tweak(&[0xff; 32]), Err(PrimitivesError::InvalidTweak(_))));
    }

    #[test]
    fn test_combine() {
        let a = PrivateKey::from_bytes(&[0x01; 32]).unwrap();
        let b_bytes = {
            let mut b = [0u8; 32];
            b[31] = 5;
            b
        };
        let b = PrivateKey::from_bytes(&b_bytes).unwrap();
        let combined = PublicKey::combine(&[a.pub_key(), b.pub_key()]).unwrap();
        // a + b as scalars equals a tweaked by b.
        assert_eq!(combined, a.add_tweak(&b_bytes).unwrap().pub_key());
        assert!(PublicKey::combine(&[]).is_err());
    }
}
