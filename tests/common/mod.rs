//! Common Test Utilities
//!
//! Builds the real router over the in-memory backend and provides request
//! helpers plus envelope assertions.

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use chitter::config::{
    CorsSettings, DatabaseSettings, MediaSettings, ServerSettings, Settings, SnapshotSettings,
};
use chitter::domain::service::ChatService;
use chitter::infrastructure::memory::{RoomSnapshot, SnapshotStore};
use chitter::infrastructure::{CredentialRegistry, MemoryChatService};
use chitter::presentation::http::routes;
use chitter::startup::AppState;

pub const SHUTDOWN_TOKEN: &str = "test-shutdown-token";

/// Snapshot store that keeps nothing, for tests that don't exercise
/// persistence.
pub struct NullSnapshotStore;

#[async_trait::async_trait]
impl SnapshotStore for NullSnapshotStore {
    async fn load(&self) -> std::io::Result<Vec<RoomSnapshot>> {
        Ok(Vec::new())
    }

    async fn save(&self, _rooms: &[RoomSnapshot]) -> std::io::Result<()> {
        Ok(())
    }
}

/// Test application over the in-memory backend.
pub struct TestApp {
    pub router: Router,
    pub service: Arc<dyn ChatService>,
    _upload_dir: TempDir,
}

impl TestApp {
    /// Create a new test application.
    pub async fn new() -> Self {
        let registry = Arc::new(CredentialRegistry::new());
        let service: Arc<dyn ChatService> = Arc::new(MemoryChatService::with_store(
            Arc::new(NullSnapshotStore),
            registry,
        ));
        Self::with_service(service).await
    }

    /// Build the router around an existing service.
    pub async fn with_service(service: Arc<dyn ChatService>) -> Self {
        let upload_dir = TempDir::new().expect("create upload dir");

        let settings = Settings {
            server: ServerSettings {
                host: "127.0.0.1".into(),
                port: 0,
            },
            database: DatabaseSettings {
                name: "mem".into(),
                user: String::new(),
                password: String::new(),
                host: "localhost".into(),
                max_connections: 1,
                acquire_timeout: 1,
            },
            media: MediaSettings {
                upload_dir: upload_dir.path().to_string_lossy().into_owned(),
            },
            snapshot: SnapshotSettings {
                path: "unused".into(),
            },
            cors: CorsSettings {
                allowed_origins: vec![],
            },
            shutdown_token: Some(SHUTDOWN_TOKEN.into()),
            environment: "test".into(),
        };

        let state = AppState {
            service: service.clone(),
            settings: Arc::new(settings),
            shutdown: Arc::new(tokio::sync::Notify::new()),
        };

        Self {
            router: routes::create_router(state),
            service,
            _upload_dir: upload_dir,
        }
    }

    /// POST a JSON body without authentication.
    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// POST a JSON body with the token in the Authorization header.
    pub async fn post_json_auth(&self, uri: &str, body: Value, token: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .header("Authorization", token)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Authenticated GET.
    pub async fn get_auth(&self, uri: &str, token: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .header("Authorization", token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Authenticated DELETE with a JSON body.
    pub async fn delete_json_auth(&self, uri: &str, body: Value, token: &str) -> Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .header("Authorization", token)
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Authenticated multipart POST with a single `file` field.
    pub async fn post_multipart_auth(
        &self,
        uri: &str,
        token: &str,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Response {
        let boundary = "test-boundary-7MA4YWxkTrZu0gW";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(
                        "Content-Type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .header("Authorization", token)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the success envelope and return its `data`.
pub async fn data(response: Response) -> Value {
    assert_eq!(response.status(), 200, "expected a success response");
    let body = body_json(response).await;
    assert_eq!(body["success"], true, "expected success envelope: {body}");
    body["data"].clone()
}

/// Assert the error envelope and return its `error` tag.
pub async fn error_tag(response: Response) -> String {
    assert_eq!(response.status(), 400, "expected an error response");
    let body = body_json(response).await;
    assert_eq!(body["success"], false, "expected error envelope: {body}");
    body["error"].as_str().expect("error tag").to_string()
}

/// Bootstrap a room; returns (room, admin-with-token, general channel).
pub async fn create_room(
    app: &TestApp,
    room_name: &str,
    admin_name: &str,
    admin_invite_only: bool,
) -> (Value, Value, Value) {
    let response = app
        .post_json(
            "/api/createRoomAndAdmin",
            serde_json::json!({
                "roomName": room_name,
                "adminName": admin_name,
                "adminInviteOnly": admin_invite_only,
            }),
        )
        .await;
    let payload = data(response).await;
    (
        payload["room"].clone(),
        payload["admin"].clone(),
        payload["generalChannel"].clone(),
    )
}

/// Mint an invite in the admin's room and join with the given display name;
/// returns the new user (token included).
pub async fn join_via_invite(app: &TestApp, admin_token: &str, display_name: &str) -> Value {
    let response = app
        .post_json_auth("/api/createInviteCode", serde_json::json!({}), admin_token)
        .await;
    let invite = data(response).await;

    let response = app
        .post_json(
            "/api/createUserFromInviteCode",
            serde_json::json!({
                "inviteCode": invite["inviteCode"],
                "displayName": display_name,
            }),
        )
        .await;
    data(response).await
}

/// A tiny valid PNG, produced by the image crate itself.
pub fn tiny_png() -> Vec<u8> {
    use image::{ImageBuffer, Rgba};
    let img = ImageBuffer::<Rgba<u8>, _>::new(2, 3);
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}
