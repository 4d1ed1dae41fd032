//! Roster Service
//!
//! HTTP front for [`MemoryRoster`], standing in for a roster leader during
//! development and tests.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use calypso_core::service::{SecretService, ServiceFailure};
use calypso_core::wire::{
    self, AddReadRequest, AddReadResponse, AddWriteRequest, AddWriteResponse, CreateLtsRequest,
    CreateLtsResponse, DecryptKeyRequest, DecryptKeyResponse, ErrorResponse,
};
use calypso_core::{codec, LtsId, MemoryRoster};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state
pub struct AppState {
    pub roster: MemoryRoster,
}

impl AppState {
    pub fn new(roster: MemoryRoster) -> Arc<Self> {
        Arc::new(Self { roster })
    }
}

/// Failure returned by a handler
pub struct ApiError(ServiceFailure);

impl From<ServiceFailure> for ApiError {
    fn from(failure: ServiceFailure) -> Self {
        ApiError(failure)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ServiceFailure::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceFailure::Unauthorized(_) => StatusCode::FORBIDDEN,
            ServiceFailure::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceFailure::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        warn!(%status, error = %self.0, "Request failed");
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

fn rejected(e: impl std::fmt::Display) -> ApiError {
    ApiError(ServiceFailure::Rejected(e.to_string()))
}

/// Build the service router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/lts", post(create_lts))
        .route("/v1/write", post(add_write))
        .route("/v1/read", post(add_read))
        .route("/v1/decrypt", post(decrypt_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on a bound listener until the process exits
pub async fn serve(listener: tokio::net::TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "calypso-svc",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn create_lts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLtsRequest>,
) -> Result<Json<CreateLtsResponse>, ApiError> {
    let handle = state.roster.create_lts(&req.roster).await?;

    info!(lts_id = %handle.id, nodes = req.roster.len(), "LTS created");
    Ok(Json(CreateLtsResponse::from(&handle)))
}

async fn add_write(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddWriteRequest>,
) -> Result<Json<AddWriteResponse>, ApiError> {
    let lts_id = LtsId::from_hex(&req.lts_id).map_err(rejected)?;
    let public_key = codec::decode_point_hex(&req.public_key).map_err(rejected)?;
    let payload = wire::decode_payload(&req.payload).map_err(rejected)?;

    let write = state
        .roster
        .add_write(&req.roster, &lts_id, &public_key, &payload)
        .await?;

    info!(write = %write, lts_id = %lts_id, "Write stored");
    Ok(Json(AddWriteResponse { write }))
}

async fn add_read(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddReadRequest>,
) -> Result<Json<AddReadResponse>, ApiError> {
    let reader = codec::decode_point_hex(&req.reader).map_err(rejected)?;
    let read = state.roster.register_read(&req.roster, &req.write, &reader)?;

    info!(read = %read, write = %req.write, "Read stored");
    Ok(Json(AddReadResponse { read }))
}

async fn decrypt_key(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecryptKeyRequest>,
) -> Result<Json<DecryptKeyResponse>, ApiError> {
    let result = state
        .roster
        .decrypt_key(&req.roster, &req.write, &req.read)
        .await?;

    info!(write = %req.write, read = %req.read, "Key re-encrypted");
    Ok(Json(DecryptKeyResponse::from(&result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use calypso_core::k256::{elliptic_curve::Field, ProjectivePoint, Scalar};
    use calypso_core::{ReadSecret, Roster};
    use rand::rngs::OsRng;
    use serde::{de::DeserializeOwned, Serialize};
    use tower::ServiceExt;

    fn roster() -> Roster {
        Roster::from_addresses(&["http://n1", "http://n2", "http://n3", "http://n4"]).unwrap()
    }

    async fn call<B: Serialize, R: DeserializeOwned>(
        app: &Router,
        path: &str,
        body: &B,
    ) -> (StatusCode, R) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(AppState::new(MemoryRoster::new()));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_workflow_over_http() {
        let app = router(AppState::new(MemoryRoster::new()));
        let roster = roster();

        let (status, lts): (_, CreateLtsResponse) =
            call(&app, "/v1/lts", &CreateLtsRequest { roster: roster.clone() }).await;
        assert_eq!(status, StatusCode::OK);

        let (status, write): (_, AddWriteResponse) = call(
            &app,
            "/v1/write",
            &AddWriteRequest {
                roster: roster.clone(),
                lts_id: lts.lts_id.clone(),
                public_key: lts.public_key.clone(),
                payload: wire::encode_payload(b"Sabrina"),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let xc = Scalar::random(&mut OsRng);
        let (status, read): (_, AddReadResponse) = call(
            &app,
            "/v1/read",
            &AddReadRequest {
                roster: roster.clone(),
                write: write.write,
                reader: codec::encode_point_hex(&(ProjectivePoint::GENERATOR * xc)),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let read_address = read.read;
        let secret = ReadSecret::new(xc.to_bytes().to_vec());

        let (status, decrypted): (_, DecryptKeyResponse) = call(
            &app,
            "/v1/decrypt",
            &DecryptKeyRequest {
                roster: roster.clone(),
                write: write.write,
                read: read_address,
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let result = decrypted.into_result().unwrap();
        assert_eq!(
            calypso_core::recover_key(&secret, &result).unwrap(),
            b"Sabrina".to_vec()
        );

        // Second use of the same read
        let (status, body): (_, ErrorResponse) = call(
            &app,
            "/v1/decrypt",
            &DecryptKeyRequest {
                roster,
                write: write.write,
                read: read_address,
            },
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.kind, "unauthorized");
    }

    #[tokio::test]
    async fn test_unknown_lts_is_not_found() {
        let app = router(AppState::new(MemoryRoster::new()));
        let (status, body): (_, ErrorResponse) = call(
            &app,
            "/v1/write",
            &AddWriteRequest {
                roster: roster(),
                lts_id: "a1b2".into(),
                public_key: codec::encode_point_hex(&ProjectivePoint::GENERATOR),
                payload: wire::encode_payload(b"key"),
            },
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.kind, "not_found");
    }

    #[tokio::test]
    async fn test_malformed_fields_rejected() {
        let app = router(AppState::new(MemoryRoster::new()));
        let (status, body): (_, ErrorResponse) = call(
            &app,
            "/v1/write",
            &AddWriteRequest {
                roster: roster(),
                lts_id: "a1b2".into(),
                public_key: "02ff".into(),
                payload: "***".into(),
            },
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.kind, "rejected");
    }

    #[tokio::test]
    async fn test_offline_nodes_unavailable() {
        let memory = MemoryRoster::new();
        memory.set_online("http://n1", false);
        memory.set_online("http://n2", false);
        let app = router(AppState::new(memory));

        let (status, body): (_, ErrorResponse) =
            call(&app, "/v1/lts", &CreateLtsRequest { roster: roster() }).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.kind, "unavailable");
    }

    #[tokio::test]
    async fn test_read_response_carries_no_secret() {
        let app = router(AppState::new(MemoryRoster::new()));
        let roster = roster();

        let (_, lts): (_, CreateLtsResponse) =
            call(&app, "/v1/lts", &CreateLtsRequest { roster: roster.clone() }).await;
        let (_, write): (_, AddWriteResponse) = call(
            &app,
            "/v1/write",
            &AddWriteRequest {
                roster: roster.clone(),
                lts_id: lts.lts_id,
                public_key: lts.public_key,
                payload: wire::encode_payload(b"Sabrina"),
            },
        )
        .await;

        let reader = ProjectivePoint::GENERATOR * Scalar::random(&mut OsRng);
        let (status, body): (_, serde_json::Value) = call(
            &app,
            "/v1/read",
            &AddReadRequest {
                roster: roster.clone(),
                write: write.write,
                reader: codec::encode_point_hex(&reader),
            },
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let fields = body.as_object().unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("read"));
        assert!(!fields.contains_key("secret"));

        // A reader key that is not a curve point is refused
        let (status, body): (_, ErrorResponse) = call(
            &app,
            "/v1/read",
            &AddReadRequest {
                roster,
                write: write.write,
                reader: "02ff".into(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.kind, "rejected");
    }
}
