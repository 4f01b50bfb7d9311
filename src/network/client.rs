//! HTTP Control Plane Client
//!
//! JSON-over-HTTP client for the proxy's election endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ControlPlane, Endpoint, DKG_ACTORS_PATH};
use crate::error::{Error, Result};
use crate::status::{Action, ElectionStatus};

#[derive(Debug, Serialize)]
struct UpdateRequest {
    #[serde(rename = "Action")]
    action: Action,
}

#[derive(Debug, Serialize)]
struct InitializeNodeRequest<'a> {
    #[serde(rename = "ElectionID")]
    election_id: &'a str,
    #[serde(rename = "ProxyAddress")]
    proxy_address: &'a str,
}

/// Status as reported by the proxy: a numeric code, or a status name
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireStatus {
    Code(u16),
    Name(ElectionStatus),
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(rename = "Status", alias = "status")]
    status: WireStatus,
}

/// Control plane reached over HTTP
pub struct HttpControlPlane {
    client: reqwest::Client,
    /// Proxy base URL, without trailing slash
    base_url: String,
}

impl HttpControlPlane {
    /// Create a new client for the proxy at `base_url`
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the proxy base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-2xx response into an error carrying the body text
    async fn check(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Request {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn update(&self, endpoint: &Endpoint, action: Action) -> Result<()> {
        let path = endpoint.path();
        tracing::debug!("PUT {} action={}", path, action);

        let response = self
            .client
            .put(self.url(&path))
            .json(&UpdateRequest { action })
            .send()
            .await?;

        Self::check(&path, response).await?;
        Ok(())
    }

    async fn initialize_node(&self, election_id: &str, proxy_address: &str) -> Result<()> {
        tracing::debug!("POST {} proxy={}", DKG_ACTORS_PATH, proxy_address);

        let response = self
            .client
            .post(self.url(DKG_ACTORS_PATH))
            .json(&InitializeNodeRequest {
                election_id,
                proxy_address,
            })
            .send()
            .await?;

        Self::check(DKG_ACTORS_PATH, response).await?;
        Ok(())
    }

    async fn status(&self, endpoint: &Endpoint) -> Result<ElectionStatus> {
        let path = endpoint.path();

        let response = self.client.get(self.url(&path)).send().await?;
        let response = Self::check(&path, response).await?;

        let body = response.text().await?;
        let parsed: StatusResponse = serde_json::from_str(&body).map_err(|e| Error::Decode {
            endpoint: path.clone(),
            reason: e.to_string(),
        })?;

        match parsed.status {
            WireStatus::Name(status) => Ok(status),
            WireStatus::Code(code) => endpoint.kind.decode_status(code).ok_or_else(|| Error::Decode {
                endpoint: path,
                reason: format!("unknown {} status code {}", endpoint.kind, code),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::authoritative_status;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{get, post, put},
        Json, Router,
    };
    use serde_json::{json, Value};

    #[derive(Default)]
    struct Recorded {
        bodies: Mutex<Vec<(String, Value)>>,
    }

    async fn spawn_proxy(recorded: Arc<Recorded>) -> String {
        async fn update_form(
            State(rec): State<Arc<Recorded>>,
            Path(id): Path<String>,
            Json(body): Json<Value>,
        ) -> StatusCode {
            rec.bodies.lock().unwrap().push((format!("forms/{}", id), body));
            StatusCode::OK
        }

        async fn init_actor(State(rec): State<Arc<Recorded>>, Json(body): Json<Value>) -> StatusCode {
            rec.bodies.lock().unwrap().push(("actors".to_string(), body));
            StatusCode::OK
        }

        async fn form_status(Path(id): Path<String>) -> Json<Value> {
            match id.as_str() {
                "named" => Json(json!({ "status": "Open" })),
                "future" => Json(json!({ "Status": 42 })),
                "fresh" | "blank" => Json(json!({ "Status": 0 })),
                _ => Json(json!({ "Status": 2, "Roster": ["a", "b"] })),
            }
        }

        async fn broken_shuffle(Path(_id): Path<String>) -> (StatusCode, &'static str) {
            (StatusCode::INTERNAL_SERVER_ERROR, "shuffle refused")
        }

        async fn actor_status(Path(id): Path<String>) -> Response {
            match id.as_str() {
                "garbled" => Json(json!({ "Status": "Exploded" })).into_response(),
                "fresh" => Json(json!({ "Status": 0, "Error": {} })).into_response(),
                "blank" => (StatusCode::NOT_FOUND, "actor not found").into_response(),
                _ => Json(json!({ "Status": 1, "Error": {} })).into_response(),
            }
        }

        let app = Router::new()
            .route("/evoting/forms/:id", put(update_form).get(form_status))
            .route("/evoting/services/dkg/actors", post(init_actor))
            .route("/evoting/services/dkg/actors/:id", get(actor_status))
            .route("/evoting/services/shuffle/:id", put(broken_shuffle))
            .with_state(recorded);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_update_sends_action_body() {
        let recorded = Arc::new(Recorded::default());
        let base = spawn_proxy(recorded.clone()).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        plane.update(&Endpoint::election("e1"), Action::Close).await.unwrap();

        let bodies = recorded.bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].0, "forms/e1");
        assert_eq!(bodies[0].1, json!({ "Action": "close" }));
    }

    #[tokio::test]
    async fn test_initialize_node_body() {
        let recorded = Arc::new(Recorded::default());
        let base = spawn_proxy(recorded.clone()).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        plane.initialize_node("e1", "http://node-a:9080").await.unwrap();

        let bodies = recorded.bodies.lock().unwrap();
        assert_eq!(
            bodies[0].1,
            json!({ "ElectionID": "e1", "ProxyAddress": "http://node-a:9080" })
        );
    }

    #[tokio::test]
    async fn test_status_query() {
        let base = spawn_proxy(Arc::new(Recorded::default())).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        let status = plane.status(&Endpoint::election("e1")).await.unwrap();
        assert_eq!(status, ElectionStatus::Closed);

        let status = plane.status(&Endpoint::election("named")).await.unwrap();
        assert_eq!(status, ElectionStatus::Open);
    }

    #[tokio::test]
    async fn test_dkg_status_query() {
        let base = spawn_proxy(Arc::new(Recorded::default())).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        let status = plane.status(&Endpoint::dkg_actors("e1")).await.unwrap();
        assert_eq!(status, ElectionStatus::Setup);

        let status = plane.status(&Endpoint::dkg_actors("fresh")).await.unwrap();
        assert_eq!(status, ElectionStatus::InitializedNodes);
    }

    #[tokio::test]
    async fn test_authoritative_status_consults_dkg_actor() {
        let base = spawn_proxy(Arc::new(Recorded::default())).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        // Form is closed: the actor is not consulted
        assert_eq!(authoritative_status(&plane, "e1").await.unwrap(), ElectionStatus::Closed);
        // Form is initial, actor exists but holds no key yet
        assert_eq!(
            authoritative_status(&plane, "fresh").await.unwrap(),
            ElectionStatus::InitializedNodes
        );
        // Form is initial, no actor on the proxy
        assert_eq!(authoritative_status(&plane, "blank").await.unwrap(), ElectionStatus::Initial);
    }

    #[tokio::test]
    async fn test_unknown_status_code_is_decode_error() {
        let base = spawn_proxy(Arc::new(Recorded::default())).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        let err = plane.status(&Endpoint::election("future")).await.unwrap_err();
        match err {
            Error::Decode { reason, .. } => assert!(reason.contains("42")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_failure() {
        let base = spawn_proxy(Arc::new(Recorded::default())).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        let err = plane
            .update(&Endpoint::shuffle("e1"), Action::Shuffle)
            .await
            .unwrap_err();

        match err {
            Error::Request { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "shuffle refused");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_status_is_decode_error() {
        let base = spawn_proxy(Arc::new(Recorded::default())).await;
        let plane = HttpControlPlane::new(&base, Duration::from_secs(5)).unwrap();

        let err = plane.status(&Endpoint::dkg_actors("garbled")).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.is_remote());
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let plane = HttpControlPlane::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();

        let result = plane.status(&Endpoint::election("e1")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_base_url_trimmed() {
        let plane = HttpControlPlane::new("http://proxy:9080///", Duration::from_secs(1)).unwrap();
        assert_eq!(plane.base_url(), "http://proxy:9080");
        assert_eq!(plane.url("evoting/forms/x"), "http://proxy:9080/evoting/forms/x");
    }
}
