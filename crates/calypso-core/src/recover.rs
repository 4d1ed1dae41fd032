//! Client-side completion of a decryption

use crate::codec;
use crate::{DecryptionResult, Error, ReadSecret, Result};
use k256::{elliptic_curve::PrimeField, FieldBytes, ProjectivePoint, Scalar};

const MASK_CONTEXT: &str = "calypso 2024-01-01 write key mask";

/// XOR `data` with a keystream derived from a shared curve point
pub fn apply_mask(shared: &ProjectivePoint, data: &[u8]) -> Vec<u8> {
    let mut stream = vec![0u8; data.len()];
    let mut hasher = blake3::Hasher::new_derive_key(MASK_CONTEXT);
    hasher.update(&codec::encode_point(shared));
    hasher.finalize_xof().fill(&mut stream);

    data.iter().zip(stream.iter()).map(|(d, k)| d ^ k).collect()
}

/// Parse a read secret as a non-zero scalar
pub fn secret_scalar(secret: &ReadSecret) -> Result<Scalar> {
    let bytes: [u8; 32] = secret
        .as_bytes()
        .try_into()
        .map_err(|_| Error::InvalidKey("read secret must be 32 bytes".into()))?;
    let scalar_opt = Scalar::from_repr(FieldBytes::from(bytes));
    let scalar: Scalar = Option::<Scalar>::from(scalar_opt)
        .ok_or_else(|| Error::InvalidKey("read secret is not a valid scalar".into()))?;

    if scalar == Scalar::ZERO {
        return Err(Error::InvalidKey("read secret is zero".into()));
    }

    Ok(scalar)
}

/// Unmask the key material of a decryption result
///
/// Removes the reader's blinding from `xhat_enc`, leaving the point the
/// write was masked with, and strips that mask from `masked_key`.
pub fn recover_key(secret: &ReadSecret, result: &DecryptionResult) -> Result<Vec<u8>> {
    let xc = secret_scalar(secret)?;
    let shared = result.xhat_enc - result.public_key * xc;
    Ok(apply_mask(&shared, &result.masked_key))
}
