//! Stub upstream archive server.
//!
//! Records everything it receives so tests can assert on exactly what
//! crossed the proxy boundary: path, identity header, surviving cookies
//! and the body. Paths ending in `/bounce` answer with a redirect so
//! relay behavior is observable.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};

/// One request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path_and_query: String,
    pub identity: Option<String>,
    pub cookies: Option<String>,
    pub forwarded_for: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct UpstreamState {
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// A stub archive instance.
pub struct TestUpstream {
    pub base_url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl TestUpstream {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let state = UpstreamState {
            requests: Arc::clone(&requests),
        };
        let app = Router::new().fallback(record).with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ReceivedRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("upstream saw no request")
    }
}

async fn record(State(state): State<UpstreamState>, request: Request<Body>) -> Response {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    // The closure borrows the request; keep it in a block that closes
    // before the body await so the handler future stays Send.
    let (identity, cookies, forwarded_for) = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        (
            header("x-forwarded-identity"),
            header("cookie"),
            header("x-forwarded-for"),
        )
    };

    let bounce = request.uri().path().ends_with("/bounce");
    let method = request.method().to_string();
    let body = axum::body::to_bytes(request.into_body(), 1 << 20)
        .await
        .unwrap_or_default()
        .to_vec();

    state.requests.lock().unwrap().push(ReceivedRequest {
        method,
        path_and_query: path_and_query.clone(),
        identity,
        cookies,
        forwarded_for,
        body,
    });

    if bounce {
        return Response::builder()
            .status(StatusCode::FOUND)
            .header("location", "/album/elsewhere/")
            .body(Body::empty())
            .unwrap();
    }
    (StatusCode::OK, format!("archive {path_and_query}")).into_response()
}
