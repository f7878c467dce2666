//! Integration tests for the Ferramas storefront client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ferramas-integration-tests
//! ```
//!
//! The tests need no external services: [`MockPaymentServer`] serves the
//! payment endpoint on a random local port with axum and records every
//! request it receives.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use ferramas_storefront::ClientConfig;
use ferramas_storefront::payment::HttpPaymentGateway;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Path the mock endpoint is mounted on.
pub const PAYMENT_PATH: &str = "/pagos/procesar/";

/// A request received by the mock endpoint.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Debug)]
struct Inner {
    status: StatusCode,
    response: Value,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug, Clone)]
struct MockState(Arc<Mutex<Inner>>);

impl MockState {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn process_payment(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut inner = state.lock();
    inner.requests.push(RecordedRequest { headers, body });
    (inner.status, Json(inner.response.clone()))
}

/// A response approving the payment with `voucher_id`, shaped like the
/// storefront's receipt payload.
#[must_use]
pub fn approved(voucher_id: &str) -> Value {
    json!({
        "success": true,
        "voucher_id": voucher_id,
        "numero_voucher": voucher_id,
        "comprador": "Ana Pérez",
        "fecha": "2026-03-14T15:09:00",
        "metodo_pago": "tarjeta",
        "productos": [
            {"nombre": "Martillo", "precio": 1000, "cantidad": 2},
            {"nombre": "Clavos", "precio": 500, "cantidad": 3}
        ],
        "subtotal": 3500,
        "subtotal_con_descuento": 2941.18,
        "descuento": 0,
        "iva": 558.82,
        "total": 3500,
        "es_usuario_registrado": true
    })
}

/// A response declining the payment.
#[must_use]
pub fn declined(reason: &str) -> Value {
    json!({"success": false, "error": reason})
}

/// Mock payment endpoint. Shuts down when dropped.
#[derive(Debug)]
pub struct MockPaymentServer {
    addr: SocketAddr,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockPaymentServer {
    /// Start a server that approves every payment with voucher `abc123`.
    ///
    /// # Errors
    ///
    /// Returns error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = MockState(Arc::new(Mutex::new(Inner {
            status: StatusCode::OK,
            response: approved("abc123"),
            requests: Vec::new(),
        })));

        let app = Router::new()
            .route(PAYMENT_PATH, post(process_payment))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state, task })
    }

    /// Answer future requests with `status` and `body`.
    pub fn respond_with(&self, status: StatusCode, body: Value) {
        let mut inner = self.state.lock();
        inner.status = status;
        inner.response = body;
    }

    /// Origin of the server, e.g. `http://127.0.0.1:38211`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            payment_path: PAYMENT_PATH.to_string(),
            ..ClientConfig::default()
        }
    }

    /// HTTP gateway posting to this server.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn gateway(&self) -> HttpPaymentGateway {
        let endpoint = self
            .config()
            .payment_endpoint()
            .expect("mock server URL is valid");
        HttpPaymentGateway::new(endpoint).expect("HTTP client builds")
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }
}

impl Drop for MockPaymentServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An endpoint URL on a local port nothing listens on.
///
/// # Errors
///
/// Returns error if no local port can be bound.
pub async fn unreachable_endpoint() -> std::io::Result<reqwest::Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    reqwest::Url::parse(&format!("http://{addr}{PAYMENT_PATH}"))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}
