//! Payment endpoint client.
//!
//! One checkout submission is one `POST` of a [`PaymentRequest`] to the
//! storefront's payment endpoint. The endpoint answers with a JSON body
//! whether or not the HTTP status is a success, so the body is always parsed
//! and the `success` flag decides the outcome.

use std::future::Future;

use ferramas_core::{PaymentMethod, Price, VoucherId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::cart::Cart;

/// Header carrying the CSRF token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Shown when a declined response carries no error text.
const UNKNOWN_ERROR: &str = "Error desconocido";

/// Errors that can occur while submitting a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response is JSON but lacks required fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The endpoint rejected the payment.
    #[error("Payment declined: {0}")]
    Declined(String),
}

impl PaymentError {
    /// Alert text shown to the buyer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Declined(reason) => format!("Error al procesar el pago: {reason}"),
            Self::Http(_) | Self::Parse(_) | Self::MalformedResponse(_) => {
                "Error al procesar el pago. Intente nuevamente.".to_string()
            }
        }
    }

    /// Whether the failure happened before a usable answer was received.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        !matches!(self, Self::Declined(_))
    }
}

/// One product line of a payment request or receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub nombre: String,
    pub precio: Price,
    pub cantidad: u32,
}

/// Payer details sent for guest checkouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub nombre: String,
    pub email: String,
}

/// Body of a payment submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub productos: Vec<LineItem>,
    pub metodo_pago: PaymentMethod,
    /// Only present for guests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datos_cliente: Option<GuestDetails>,
}

impl PaymentRequest {
    /// Build a request from the cart contents, in display order.
    #[must_use]
    pub fn from_cart(cart: &Cart, method: PaymentMethod, guest: Option<GuestDetails>) -> Self {
        Self {
            productos: cart
                .iter()
                .map(|(_, entry)| LineItem {
                    nombre: entry.name.clone(),
                    precio: entry.unit_price,
                    cantidad: entry.quantity,
                })
                .collect(),
            metodo_pago: method,
            datos_cliente: guest,
        }
    }
}

/// Outcome reported by the payment endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentResponse {
    /// Payment accepted; `payload` is the full response body (the receipt).
    Approved { voucher_id: VoucherId, payload: Value },
    /// Payment rejected with a reason.
    Declined { error: String },
}

impl PaymentResponse {
    /// Interpret a response body.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::MalformedResponse`] if the body is not an
    /// object, or reports success without a voucher id.
    pub fn from_value(value: Value) -> Result<Self, PaymentError> {
        if !value.is_object() {
            return Err(PaymentError::MalformedResponse(
                "response is not a JSON object".to_string(),
            ));
        }

        if value.get("success").and_then(Value::as_bool) != Some(true) {
            let error = match value.get("error") {
                Some(Value::String(text)) if !text.is_empty() => text.clone(),
                Some(Value::Null) | None => UNKNOWN_ERROR.to_string(),
                Some(other) => other.to_string(),
            };
            return Ok(Self::Declined { error });
        }

        let voucher_id = match value.get("voucher_id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(PaymentError::MalformedResponse(
                    "success response without voucher_id".to_string(),
                ));
            }
        };

        Ok(Self::Approved {
            voucher_id: VoucherId::new(voucher_id),
            payload: value,
        })
    }

    /// Treat a decline as an error.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Declined`] for declined payments.
    pub fn into_result(self) -> Result<(VoucherId, Value), PaymentError> {
        match self {
            Self::Approved {
                voucher_id,
                payload,
            } => Ok((voucher_id, payload)),
            Self::Declined { error } => Err(PaymentError::Declined(error)),
        }
    }
}

/// Something that can process a payment request.
pub trait PaymentGateway: Send + Sync {
    /// Submit `request`, attaching `csrf_token` when present.
    fn process(
        &self,
        request: &PaymentRequest,
        csrf_token: Option<&SecretString>,
    ) -> impl Future<Output = Result<PaymentResponse, PaymentError>> + Send;
}

/// Payment gateway backed by the storefront's HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPaymentGateway {
    /// Create a gateway posting to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(endpoint: Url) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ferramas/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoint })
    }

    /// The endpoint requests are sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, method = %request.metodo_pago))]
    async fn process(
        &self,
        request: &PaymentRequest,
        csrf_token: Option<&SecretString>,
    ) -> Result<PaymentResponse, PaymentError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(token) = csrf_token {
            builder = builder.header(CSRF_HEADER, token.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = status.as_u16(), "Payment endpoint responded");

        let value: Value = serde_json::from_str(&body)?;
        let outcome = PaymentResponse::from_value(value)?;
        match &outcome {
            PaymentResponse::Approved { voucher_id, .. } => {
                tracing::info!(voucher_id = %voucher_id, "Payment approved");
            }
            PaymentResponse::Declined { error } => {
                tracing::warn!(status = status.as_u16(), error = %error, "Payment declined");
            }
        }
        Ok(outcome)
    }
}
