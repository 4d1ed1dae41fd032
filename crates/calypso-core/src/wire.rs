//! JSON request/response bodies of the roster HTTP API
//!
//! Identifiers and points travel as hex, payloads as base64.

use crate::codec;
use crate::service::{ServiceFailure, ServiceResult};
use crate::{DecryptionResult, LtsHandle, LtsId, ReadAddress, Roster, WriteAddress};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Request to create an LTS
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLtsRequest {
    pub roster: Roster,
}

/// Newly created LTS
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLtsResponse {
    pub lts_id: String,
    pub public_key: String,
}

/// Request to register a write
#[derive(Debug, Serialize, Deserialize)]
pub struct AddWriteRequest {
    pub roster: Roster,
    pub lts_id: String,
    pub public_key: String,
    pub payload: String, // base64 encoded
}

/// Registered write
#[derive(Debug, Serialize, Deserialize)]
pub struct AddWriteResponse {
    pub write: WriteAddress,
}

/// Request to register a read
///
/// Carries only the reader's public point; its secret never leaves the
/// requester.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddReadRequest {
    pub roster: Roster,
    pub write: WriteAddress,
    pub reader: String,
}

/// Registered read
#[derive(Debug, Serialize, Deserialize)]
pub struct AddReadResponse {
    pub read: ReadAddress,
}

/// Request to re-encrypt a write's key
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptKeyRequest {
    pub roster: Roster,
    pub write: WriteAddress,
    pub read: ReadAddress,
}

/// Re-encrypted key
#[derive(Debug, Serialize, Deserialize)]
pub struct DecryptKeyResponse {
    pub masked_key: String, // base64 encoded
    pub xhat_enc: String,
    pub cs: Vec<String>,
    pub public_key: String,
}

/// Failure body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub kind: String,
    pub message: String,
}

fn malformed(what: &str, e: impl std::fmt::Display) -> ServiceFailure {
    ServiceFailure::Unavailable(format!("malformed {}: {}", what, e))
}

impl From<&LtsHandle> for CreateLtsResponse {
    fn from(handle: &LtsHandle) -> Self {
        Self {
            lts_id: handle.id.to_hex(),
            public_key: handle.public_key_hex(),
        }
    }
}

impl CreateLtsResponse {
    pub fn into_handle(self) -> ServiceResult<LtsHandle> {
        let id = codec::decode(&self.lts_id).map_err(|e| malformed("LTS id", e))?;
        let public_key =
            codec::decode_point_hex(&self.public_key).map_err(|e| malformed("public key", e))?;
        Ok(LtsHandle {
            id: LtsId::new(id),
            public_key,
        })
    }
}

impl From<&DecryptionResult> for DecryptKeyResponse {
    fn from(result: &DecryptionResult) -> Self {
        Self {
            masked_key: STANDARD.encode(&result.masked_key),
            xhat_enc: codec::encode_point_hex(&result.xhat_enc),
            cs: result.cs.iter().map(codec::encode_point_hex).collect(),
            public_key: codec::encode_point_hex(&result.public_key),
        }
    }
}

impl DecryptKeyResponse {
    pub fn into_result(self) -> ServiceResult<DecryptionResult> {
        let masked_key = STANDARD
            .decode(&self.masked_key)
            .map_err(|e| malformed("masked key", e))?;
        let xhat_enc =
            codec::decode_point_hex(&self.xhat_enc).map_err(|e| malformed("xhat", e))?;
        let cs = self
            .cs
            .iter()
            .map(|c| codec::decode_point_hex(c).map_err(|e| malformed("ciphertext point", e)))
            .collect::<ServiceResult<Vec<_>>>()?;
        let public_key =
            codec::decode_point_hex(&self.public_key).map_err(|e| malformed("public key", e))?;

        Ok(DecryptionResult {
            masked_key,
            xhat_enc,
            cs,
            public_key,
        })
    }
}

impl From<&ServiceFailure> for ErrorResponse {
    fn from(failure: &ServiceFailure) -> Self {
        Self {
            kind: failure.kind().to_string(),
            message: failure.message().to_string(),
        }
    }
}

impl From<ErrorResponse> for ServiceFailure {
    fn from(body: ErrorResponse) -> Self {
        ServiceFailure::from_kind(&body.kind, body.message)
    }
}

/// Encode a payload for the wire
pub fn encode_payload(payload: &[u8]) -> String {
    STANDARD.encode(payload)
}

/// Decode a payload from the wire
pub fn decode_payload(payload: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(payload)
}
