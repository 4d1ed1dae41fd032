//! Sequencing of the four roster operations

use crate::codec;
use crate::service::{SecretService, ServiceFailure};
use crate::{
    DecryptionResult, Error, LtsHandle, LtsId, Operation, ReadAddress, ReadRecord, Result,
    Roster, WriteAddress,
};
use tracing::{debug, info, instrument, warn};

/// Drives the workflow against a roster
///
/// Holds no state between calls. Each operation validates its input
/// locally, then makes exactly one call to the service; failures are
/// classified and returned without retry.
pub struct Orchestrator<S> {
    service: S,
}

impl<S: SecretService> Orchestrator<S> {
    /// Create an orchestrator over an explicitly constructed service client
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Request a new distributed secret from the roster
    #[instrument(skip_all, fields(nodes = roster.len()))]
    pub async fn create_lts(&self, roster: &Roster) -> Result<LtsHandle> {
        let rooted = roster.rooted()?;

        let handle = self
            .service
            .create_lts(&rooted)
            .await
            .map_err(|e| classify(Operation::CreateLts, e))?;

        info!(
            lts_id = %handle.id,
            public_key = handle.public_key_hex(),
            "LTS created"
        );

        Ok(handle)
    }

    /// Register a write bound to an LTS
    ///
    /// `lts_id_hex` is forwarded byte-for-byte; `public_key_hex` must decode
    /// to a point on the curve.
    #[instrument(skip(self, roster, payload), fields(payload_len = payload.len()))]
    pub async fn add_write(
        &self,
        roster: &Roster,
        lts_id_hex: &str,
        public_key_hex: &str,
        payload: &[u8],
    ) -> Result<WriteAddress> {
        let rooted = roster.rooted()?;
        let lts_id = LtsId::from_hex(lts_id_hex)?;
        let public_key = codec::decode_point_hex(public_key_hex)?;

        let write = self
            .service
            .add_write(&rooted, &lts_id, &public_key, payload)
            .await
            .map_err(|e| classify(Operation::AddWrite, e))?;

        info!(write = %write, "Write registered");
        Ok(write)
    }

    /// Register a read authorizing decryption of a write
    #[instrument(skip(self, roster))]
    pub async fn add_read(&self, roster: &Roster, write_address_hex: &str) -> Result<ReadRecord> {
        let rooted = roster.rooted()?;
        let write = WriteAddress::from_hex(write_address_hex)?;

        let (secret, read) = self
            .service
            .add_read(&rooted, &write)
            .await
            .map_err(|e| classify(Operation::AddRead, e))?;

        info!(write = %write, read = %read, "Read registered");
        Ok(ReadRecord {
            write,
            read,
            secret,
        })
    }

    /// Ask the roster to re-encrypt the key of a write for a read
    #[instrument(skip(self, roster))]
    pub async fn decrypt_key(
        &self,
        roster: &Roster,
        write_address_hex: &str,
        read_address_hex: &str,
    ) -> Result<DecryptionResult> {
        let rooted = roster.rooted()?;
        let write = WriteAddress::from_hex(write_address_hex)?;
        let read = ReadAddress::from_hex(read_address_hex)?;

        self.decrypt_addresses(&rooted, &write, &read).await
    }

    /// Decrypt using the write/read pair a read record was created with
    #[instrument(skip(self, roster, record), fields(write = %record.write, read = %record.read))]
    pub async fn decrypt_record(
        &self,
        roster: &Roster,
        record: &ReadRecord,
    ) -> Result<DecryptionResult> {
        let rooted = roster.rooted()?;
        self.decrypt_addresses(&rooted, &record.write, &record.read)
            .await
    }

    async fn decrypt_addresses(
        &self,
        rooted: &Roster,
        write: &WriteAddress,
        read: &ReadAddress,
    ) -> Result<DecryptionResult> {
        let result = self
            .service
            .decrypt_key(rooted, write, read)
            .await
            .map_err(|e| classify(Operation::DecryptKey, e))?;

        debug!(cs = result.cs.len(), "Decryption result received");
        info!(write = %write, read = %read, "Key re-encrypted by roster");
        Ok(result)
    }
}

/// Map a roster failure onto the error taxonomy, keeping its message
fn classify(op: Operation, failure: ServiceFailure) -> Error {
    warn!(%op, kind = failure.kind(), "Roster call failed");

    match failure {
        ServiceFailure::Unauthorized(message) => Error::Authorization { op, message },
        ServiceFailure::NotFound(message) => Error::NotFound { op, message },
        ServiceFailure::Unavailable(message) | ServiceFailure::Rejected(message) => {
            Error::Service { op, message }
        }
    }
}
