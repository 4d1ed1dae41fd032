//! Boundary to the secret-management roster

use crate::{
    DecryptionResult, LtsHandle, LtsId, ReadAddress, ReadSecret, Roster, WriteAddress,
};
use k256::ProjectivePoint;
use thiserror::Error;

pub use ::async_trait::async_trait;

/// Failures reported by the roster
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    /// Roster unreachable or too few live nodes
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Request understood but refused
    #[error("rejected: {0}")]
    Rejected(String),

    /// Decryption not authorized for this read/write pair
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced LTS, write or read does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceFailure {
    /// Stable name of the failure kind, as used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceFailure::Unavailable(_) => "unavailable",
            ServiceFailure::Rejected(_) => "rejected",
            ServiceFailure::Unauthorized(_) => "unauthorized",
            ServiceFailure::NotFound(_) => "not_found",
        }
    }

    /// Rebuild a failure from its wire kind
    pub fn from_kind(kind: &str, message: String) -> Self {
        match kind {
            "rejected" => ServiceFailure::Rejected(message),
            "unauthorized" => ServiceFailure::Unauthorized(message),
            "not_found" => ServiceFailure::NotFound(message),
            _ => ServiceFailure::Unavailable(message),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ServiceFailure::Unavailable(m)
            | ServiceFailure::Rejected(m)
            | ServiceFailure::Unauthorized(m)
            | ServiceFailure::NotFound(m) => m,
        }
    }
}

/// Result type for roster calls
pub type ServiceResult<T> = std::result::Result<T, ServiceFailure>;

/// The roster's four capabilities
///
/// Every call receives the rooted roster; implementations address its
/// leader. Timeouts and retries belong to the implementation's transport.
#[async_trait]
pub trait SecretService: Send + Sync {
    /// Run distributed key generation for a new LTS
    async fn create_lts(&self, roster: &Roster) -> ServiceResult<LtsHandle>;

    /// Register a write bound to `lts_id`
    async fn add_write(
        &self,
        roster: &Roster,
        lts_id: &LtsId,
        public_key: &ProjectivePoint,
        payload: &[u8],
    ) -> ServiceResult<WriteAddress>;

    /// Register a read authorizing decryption of `write`
    ///
    /// The returned secret is drawn by the implementation on the caller's
    /// side; only its public point may reach the roster.
    async fn add_read(
        &self,
        roster: &Roster,
        write: &WriteAddress,
    ) -> ServiceResult<(ReadSecret, ReadAddress)>;

    /// Re-encrypt the key of `write` towards the holder of `read`
    async fn decrypt_key(
        &self,
        roster: &Roster,
        write: &WriteAddress,
        read: &ReadAddress,
    ) -> ServiceResult<DecryptionResult>;
}

#[async_trait]
impl<S: SecretService + ?Sized> SecretService for std::sync::Arc<S> {
    async fn create_lts(&self, roster: &Roster) -> ServiceResult<LtsHandle> {
        (**self).create_lts(roster).await
    }

    async fn add_write(
        &self,
        roster: &Roster,
        lts_id: &LtsId,
        public_key: &ProjectivePoint,
        payload: &[u8],
    ) -> ServiceResult<WriteAddress> {
        (**self).add_write(roster, lts_id, public_key, payload).await
    }

    async fn add_read(
        &self,
        roster: &Roster,
        write: &WriteAddress,
    ) -> ServiceResult<(ReadSecret, ReadAddress)> {
        (**self).add_read(roster, write).await
    }

    async fn decrypt_key(
        &self,
        roster: &Roster,
        write: &WriteAddress,
        read: &ReadAddress,
    ) -> ServiceResult<DecryptionResult> {
        (**self).decrypt_key(roster, write, read).await
    }
}

/// In-memory roster for testing and local development
pub mod memory;

pub use memory::MemoryRoster;
