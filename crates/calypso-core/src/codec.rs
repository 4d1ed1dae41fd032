//! Conversions between internal binary identifiers and their hex forms

use crate::{Error, Result, ADDRESS_LEN};
use k256::{
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    AffinePoint, EncodedPoint, ProjectivePoint,
};

/// Encode bytes as lowercase hex without prefix
pub fn encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, rejecting odd lengths and non-hex characters
pub fn decode(hex_str: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str).map_err(|e| Error::Encoding(format!("{}: {:?}", e, hex_str)))
}

/// Encode a curve point in compressed SEC1 form
pub fn encode_point(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

/// Encode a curve point as compressed SEC1 hex
pub fn encode_point_hex(point: &ProjectivePoint) -> String {
    encode(&encode_point(point))
}

/// Decode SEC1 bytes into a curve point
///
/// Fails with `InvalidKey` unless the bytes name a non-identity point on
/// secp256k1.
pub fn decode_point(bytes: &[u8]) -> Result<ProjectivePoint> {
    let encoded = EncodedPoint::from_bytes(bytes)
        .map_err(|e| Error::InvalidKey(format!("not a SEC1 point: {}", e)))?;
    let affine_opt = AffinePoint::from_encoded_point(&encoded);
    let affine: AffinePoint = Option::<AffinePoint>::from(affine_opt)
        .ok_or_else(|| Error::InvalidKey("point is not on the curve".into()))?;
    let point = ProjectivePoint::from(affine);

    if point == ProjectivePoint::IDENTITY {
        return Err(Error::InvalidKey("identity is not a valid key".into()));
    }

    Ok(point)
}

/// Decode a hex-encoded curve point
pub fn decode_point_hex(hex_str: &str) -> Result<ProjectivePoint> {
    decode_point(&decode(hex_str)?)
}

/// Parse an external address into its fixed-width form
///
/// Accepts an optional `0x` prefix and up to [`ADDRESS_LEN`] bytes of hex;
/// shorter values are left-padded with zeros.
pub fn decode_address(hex_str: &str) -> Result<[u8; ADDRESS_LEN]> {
    let digits = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);

    if digits.is_empty() {
        return Err(Error::Encoding("empty address".into()));
    }

    let bytes = decode(digits)?;
    if bytes.len() > ADDRESS_LEN {
        return Err(Error::Encoding(format!(
            "address is {} bytes, at most {} allowed",
            bytes.len(),
            ADDRESS_LEN
        )));
    }

    let mut address = [0u8; ADDRESS_LEN];
    address[ADDRESS_LEN - bytes.len()..].copy_from_slice(&bytes);
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::Scalar;
    use proptest::prelude::*;

    /// Uncompressed SEC1 encoding of (1, 1), which fails y^2 = x^3 + 7
    fn off_curve_point() -> Vec<u8> {
        let mut bytes = vec![0u8; 65];
        bytes[0] = 0x04;
        bytes[32] = 1;
        bytes[64] = 1;
        bytes
    }

    #[test]
    fn test_encode_is_lowercase() {
        assert_eq!(encode(&[0xA1, 0xB2]), "a1b2");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode("abc"), Err(Error::Encoding(_))));
        assert!(matches!(decode("not-hex!"), Err(Error::Encoding(_))));
        assert_eq!(decode("A1b2").unwrap(), vec![0xa1, 0xb2]);
    }

    #[test]
    fn test_point_roundtrip() {
        let point = ProjectivePoint::GENERATOR * Scalar::from(42u64);
        let bytes = encode_point(&point);
        assert_eq!(bytes.len(), 33);
        assert_eq!(decode_point(&bytes).unwrap(), point);
    }

    #[test]
    fn test_decode_point_accepts_uncompressed() {
        let point = ProjectivePoint::GENERATOR * Scalar::from(7u64);
        let uncompressed = point.to_affine().to_encoded_point(false);
        assert_eq!(decode_point(uncompressed.as_bytes()).unwrap(), point);
    }

    #[test]
    fn test_decode_point_rejects_off_curve() {
        assert!(matches!(
            decode_point(&off_curve_point()),
            Err(Error::InvalidKey(_))
        ));

        // x >= p is not a field element
        let mut compressed = vec![0xffu8; 33];
        compressed[0] = 0x02;
        assert!(matches!(decode_point(&compressed), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_decode_point_rejects_identity_and_garbage() {
        assert!(matches!(decode_point(&[0x00]), Err(Error::InvalidKey(_))));
        assert!(matches!(decode_point(&[1, 2, 3]), Err(Error::InvalidKey(_))));
        assert!(matches!(decode_point_hex("zz"), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_decode_address_pads_and_strips_prefix() {
        let address = decode_address("0xdeadbeef").unwrap();
        assert_eq!(&address[..16], &[0u8; 16]);
        assert_eq!(&address[16..], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode_address("DEADBEEF").unwrap(), address);
    }

    #[test]
    fn test_decode_address_rejects_malformed() {
        let too_long = "ab".repeat(21);
        for input in ["", "0x", "not-hex!", "abc", too_long.as_str()] {
            assert!(
                matches!(decode_address(input), Err(Error::Encoding(_))),
                "accepted {:?}",
                input
            );
        }
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            prop_assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }

        #[test]
        fn encode_normalises_case(hex_str in "([0-9a-fA-F]{2}){0,64}") {
            prop_assert_eq!(encode(&decode(&hex_str).unwrap()), hex_str.to_lowercase());
        }

        #[test]
        fn encode_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(encode(&bytes), encode(&bytes));
        }
    }
}
