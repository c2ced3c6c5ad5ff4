//! ECDSA signatures over secp256k1.
//!
//! Parsing is permissive (long-form lengths and zero padding on R and S are
//! accepted) so that signatures valid under pre-BIP66 rules still verify.
//! Strict DER shape checks live in the script interpreter behind policy
//! flags. Verification accepts high-S values.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// The secp256k1 curve order N.
const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// N/2, the largest S value considered low.
const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// An ECDSA signature with 32-byte big-endian R and S components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S values.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// The R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Parse a BER-like DER signature the way consensus has always read them.
    ///
    /// Expected layout: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>`.
    /// The sequence length may use the long form and is skipped rather than
    /// checked. Integer lengths may also use the long form, and leading zero
    /// bytes on R and S are ignored. Trailing bytes are ignored.
    ///
    /// An R or S that does not fit below the curve order is not an error:
    /// the whole signature parses as zero and will never verify.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` if the structure is
    /// malformed.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let bad = |msg: &str| PrimitivesError::InvalidSignature(format!("malformed signature: {}", msg));

        let mut pos = 0usize;
        if bytes.first() != Some(&0x30) {
            return Err(bad("no header magic"));
        }
        pos += 1;

        let seq_len = *bytes.get(pos).ok_or_else(|| bad("too short"))?;
        pos += 1;
        if seq_len & 0x80 != 0 {
            let n = (seq_len & 0x7f) as usize;
            if n > bytes.len() - pos {
                return Err(bad("bad length"));
            }
            pos += n;
        }

        let r_bytes = read_der_int(bytes, &mut pos).ok_or_else(|| bad("bogus R"))?;
        let s_bytes = read_der_int(bytes, &mut pos).ok_or_else(|| bad("bogus S"))?;

        match (to_scalar_bytes(r_bytes), to_scalar_bytes(s_bytes)) {
            (Some(r), Some(s)) => Ok(Signature { r, s }),
            _ => Ok(Signature { r: [0u8; 32], s: [0u8; 32] }),
        }
    }

    /// Serialize the signature in canonical DER form.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&self.s);

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Whether S lies in the lower half of the curve order.
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_ORDER
    }

    /// Return the equivalent signature with S replaced by `N - S` when S is high.
    pub fn normalize_s(&self) -> Signature {
        if self.is_low_s() {
            self.clone()
        } else {
            Signature { r: self.r, s: subtract_from_order(&self.s) }
        }
    }

    /// Sign a 32-byte digest with RFC6979 deterministic nonces.
    ///
    /// The result always has a low S value.
    pub fn sign(hash: &[u8; 32], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let (k256_sig, _recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let sig = Signature { r: r_bytes.into(), s: s_bytes.into() };
        Ok(sig.normalize_s())
    }

    /// Verify this signature against a 32-byte digest and public key.
    ///
    /// High-S signatures verify; rejecting them is a policy decision made
    /// by the caller.
    pub fn verify(&self, hash: &[u8; 32], pub_key: &PublicKey) -> bool {
        if is_zero(&self.r) || is_zero(&self.s) {
            return false;
        }
        let low = self.normalize_s();
        let k256_sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(low.r),
            k256::FieldBytes::from(low.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        pub_key.verifying_key().verify_prehash(hash, &k256_sig).is_ok()
    }
}

/// Read one INTEGER (`0x02 <len> <bytes>`) starting at `pos`, advancing it.
fn read_der_int<'a>(data: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    if data.get(*pos) != Some(&0x02) {
        return None;
    }
    *pos += 1;
    let len_byte = *data.get(*pos)?;
    *pos += 1;

    let len = if len_byte & 0x80 != 0 {
        let mut n = (len_byte & 0x7f) as usize;
        if n > data.len() - *pos {
            return None;
        }
        while n > 0 && data[*pos] == 0 {
            *pos += 1;
            n -= 1;
        }
        if n >= std::mem::size_of::<usize>() {
            return None;
        }
        let mut len = 0usize;
        for _ in 0..n {
            len = (len << 8) | data[*pos] as usize;
            *pos += 1;
        }
        len
    } else {
        len_byte as usize
    };

    if len > data.len() - *pos {
        return None;
    }
    let value = &data[*pos..*pos + len];
    *pos += len;
    Some(value)
}

/// Strip leading zeros and prefix 0x00 when the high bit is set.
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Left-pad a big-endian integer to 32 bytes after stripping zero padding.
/// `None` when the value is not below the curve order.
fn to_scalar_bytes(bytes: &[u8]) -> Option<[u8; 32]> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    if out >= CURVE_ORDER {
        return None;
    }
    Some(out)
}

fn is_zero(val: &[u8; 32]) -> bool {
    val.iter().all(|&b| b == 0)
}

/// Compute N - val.
fn subtract_from_order(val: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: i16 = 0;
    for i in (0..32).rev() {
        let diff = CURVE_ORDER[i] as i16 - val[i] as i16 - borrow;
        if diff < 0 {
            result[i] = (diff + 256) as u8;
            borrow = 1;
        } else {
            result[i] = diff as u8;
            borrow = 0;
        }
    }
    result
}
