//! Local HTTP server answering with canned responses, for client tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use reqwest::Url;

use super::client::{ApiClient, ClientOptions};

/// A request as the server received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

#[derive(Debug, Clone)]
struct Canned {
    method: Method,
    path: String,
    status: StatusCode,
    body: String,
}

#[derive(Debug, Clone, Default)]
struct Shared {
    canned: Arc<Mutex<Vec<Canned>>>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TestServer {
    url: Url,
    shared: Shared,
}

impl TestServer {
    /// Bind to an ephemeral local port and serve in the background.
    pub async fn start() -> Self {
        let shared = Shared::default();
        let app = Router::new().fallback(answer).with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let url = Url::parse(&format!("http://{}", addr)).expect("server url");
        Self { url, shared }
    }

    /// Answer `method path` with `status` and `body`. Unmatched requests get 501.
    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: &str) -> &Self {
        lock(&self.shared.canned).push(Canned {
            method,
            path: path.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// A client without a token, as used for the token request.
    pub fn anonymous_client(&self) -> ApiClient {
        ApiClient::new(self.url(), &ClientOptions::default()).expect("client")
    }

    /// A client carrying the bearer token `test-token`.
    pub fn client(&self) -> ApiClient {
        self.anonymous_client().with_token("test-token".to_string())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.shared.requests).clone()
    }

    /// The only request received; panics unless exactly one arrived.
    pub fn single_request(&self) -> Recorded {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "requests: {:?}", requests);
        requests[0].clone()
    }
}

async fn answer(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    let reply = lock(&shared.canned)
        .iter()
        .find(|c| c.method == method && c.path == path)
        .map(|c| (c.status, c.body.clone()));

    lock(&shared.requests).push(Recorded {
        method,
        path,
        headers,
        body,
    });

    reply.unwrap_or((StatusCode::NOT_IMPLEMENTED, "no canned response".to_string()))
}
