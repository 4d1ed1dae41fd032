//! Roster Client
//!
//! HTTP implementation of [`SecretService`] that talks to the roster leader.

use calypso_core::service::{async_trait, SecretService, ServiceFailure, ServiceResult};
use calypso_core::wire::{
    self, AddReadRequest, AddReadResponse, AddWriteRequest, AddWriteResponse, CreateLtsRequest,
    CreateLtsResponse, DecryptKeyRequest, DecryptKeyResponse, ErrorResponse,
};
use calypso_core::{
    codec, DecryptionResult, LtsHandle, LtsId, ReadAddress, ReadSecret, Roster, WriteAddress,
};
use k256::{elliptic_curve::Field, ProjectivePoint, Scalar};
use rand::rngs::OsRng;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP-based roster client
///
/// Constructed explicitly by the caller; holds no roster of its own and
/// addresses the leader of whichever roster a call is made with.
#[derive(Clone)]
pub struct RosterClient {
    /// HTTP client
    client: Client,
    /// Request timeout
    timeout: Duration,
}

impl RosterClient {
    /// Create a new roster client
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(roster: &Roster, path: &str) -> ServiceResult<String> {
        let leader = roster
            .leader()
            .ok_or_else(|| ServiceFailure::Unavailable("roster has no leader".into()))?;
        Ok(format!("{}{}", leader.address.trim().trim_end_matches('/'), path))
    }

    /// Post a request to the roster leader
    #[instrument(skip(self, roster, body))]
    async fn post<B, R>(&self, roster: &Roster, path: &str, body: &B) -> ServiceResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = Self::endpoint(roster, path)?;

        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ServiceFailure::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(%url, %status, "Roster responded");

        if !status.is_success() {
            return Err(match response.json::<ErrorResponse>().await {
                Ok(body) => ServiceFailure::from(body),
                Err(_) => ServiceFailure::Unavailable(format!(
                    "POST {} failed with status: {}",
                    path, status
                )),
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ServiceFailure::Unavailable(format!("invalid response: {}", e)))
    }
}

impl Default for RosterClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretService for RosterClient {
    async fn create_lts(&self, roster: &Roster) -> ServiceResult<LtsHandle> {
        let req = CreateLtsRequest {
            roster: roster.clone(),
        };
        let response: CreateLtsResponse = self.post(roster, "/v1/lts", &req).await?;
        response.into_handle()
    }

    async fn add_write(
        &self,
        roster: &Roster,
        lts_id: &LtsId,
        public_key: &ProjectivePoint,
        payload: &[u8],
    ) -> ServiceResult<WriteAddress> {
        let req = AddWriteRequest {
            roster: roster.clone(),
            lts_id: lts_id.to_hex(),
            public_key: codec::encode_point_hex(public_key),
            payload: wire::encode_payload(payload),
        };
        let response: AddWriteResponse = self.post(roster, "/v1/write", &req).await?;
        Ok(response.write)
    }

    async fn add_read(
        &self,
        roster: &Roster,
        write: &WriteAddress,
    ) -> ServiceResult<(ReadSecret, ReadAddress)> {
        // The reader key pair is drawn here; the roster only learns Xc
        let xc = Scalar::random(&mut OsRng);
        let req = AddReadRequest {
            roster: roster.clone(),
            write: *write,
            reader: codec::encode_point_hex(&(ProjectivePoint::GENERATOR * xc)),
        };
        let response: AddReadResponse = self.post(roster, "/v1/read", &req).await?;
        Ok((ReadSecret::new(xc.to_bytes().to_vec()), response.read))
    }

    async fn decrypt_key(
        &self,
        roster: &Roster,
        write: &WriteAddress,
        read: &ReadAddress,
    ) -> ServiceResult<DecryptionResult> {
        let req = DecryptKeyRequest {
            roster: roster.clone(),
            write: *write,
            read: *read,
        };
        let response: DecryptKeyResponse = self.post(roster, "/v1/decrypt", &req).await?;
        response.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uses_leader() {
        let roster = Roster::from_addresses(&["http://leader:7770/", "http://other:7772"]).unwrap();
        assert_eq!(
            RosterClient::endpoint(&roster, "/v1/lts").unwrap(),
            "http://leader:7770/v1/lts"
        );

        let rooted = roster.with_root("http://other:7772").unwrap();
        assert_eq!(
            RosterClient::endpoint(&rooted, "/v1/read").unwrap(),
            "http://other:7772/v1/read"
        );
    }

    #[tokio::test]
    async fn test_unreachable_leader_is_unavailable() {
        // Port 9 (discard) on localhost is normally closed
        let roster = Roster::from_addresses(&["http://127.0.0.1:9"]).unwrap();
        let client = RosterClient::new().with_timeout(Duration::from_secs(2));

        assert!(matches!(
            client.create_lts(&roster).await,
            Err(ServiceFailure::Unavailable(_))
        ));
    }
}
