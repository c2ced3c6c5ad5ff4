//! Bech32 / bech32m segwit address codec.
//!
//! Wraps the `bech32` crate's segwit helpers. This layer only moves the
//! witness version and program bytes in and out of text; interpreting the
//! program is the script crate's job.

use bech32::{segwit, Fe32, Hrp};

use crate::PrimitivesError;

/// Encode a witness program under the given human-readable part.
///
/// Version 0 programs use bech32, later versions bech32m.
pub fn encode(hrp: &str, version: u8, program: &[u8]) -> Result<String, PrimitivesError> {
    let hrp = Hrp::parse(hrp).map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))?;
    let version = Fe32::try_from(version).map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))?;
    segwit::encode(hrp, version, program).map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))
}

/// Decode a segwit address, requiring `expected_hrp`.
///
/// # Returns
/// `(witness_version, witness_program)`, or `InvalidBech32` on checksum,
/// HRP, version or program-length errors.
pub fn decode(expected_hrp: &str, s: &str) -> Result<(u8, Vec<u8>), PrimitivesError> {
    let (hrp, version, program) =
        segwit::decode(s).map_err(|e| PrimitivesError::InvalidBech32(e.to_string()))?;
    if hrp.to_lowercase() != expected_hrp.to_lowercase() {
        return Err(PrimitivesError::InvalidBech32(format!(
            "unexpected human-readable part '{}', want '{}'",
            hrp.to_lowercase(),
            expected_hrp
        )));
    }
    Ok((version.to_u8(), program))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2wpkh_mainnet() {
        let (v, prog) = decode("bc", "BC1QW508D6QEJXTDG4Y5R3ZARVARY0C5XW7KV8F3T4").unwrap();
        assert_eq!(v, 0);
        assert_eq!(hex::encode(&prog), "751e76e8199196d454941c45d1b3a323f1433bd6");
        assert_eq!(
            encode("bc", 0, &prog).unwrap(),
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"
        );
    }

    #[test]
    fn test_p2wsh_testnet() {
        let s = "tb1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3q0sl5k7";
        let (v, prog) = decode("tb", s).unwrap();
        assert_eq!(v, 0);
        assert_eq!(
            hex::encode(&prog),
            "1863143c14c5166804bd19203356da136c985678cd4d27a1b8c6329604903262"
        );
    }

    #[test]
    fn test_wrong_hrp_rejected() {
        let err = decode("tb", "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap_err();
        assert!(matches!(err, PrimitivesError::InvalidBech32(_)));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        assert!(decode("bc", "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5").is_err());
    }
}
