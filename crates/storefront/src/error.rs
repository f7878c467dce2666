//! Unified error handling with Sentry integration.
//!
//! Component operations recover locally wherever the page can keep working;
//! `ClientError` is what escapes to callers that need a `Result` (the CLI,
//! template rendering, configuration). [`ClientError::report`] captures
//! unexpected failures to Sentry before they are shown to the user.

use thiserror::Error;

use crate::config::ConfigError;
use crate::payment::PaymentError;
use crate::storage::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Browser storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Payment endpoint call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A view template failed to render.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// User input was rejected.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Required page element is missing.
    #[error("Missing element: #{0}")]
    MissingElement(String),
}

impl ClientError {
    /// Capture server-side or infrastructure failures to Sentry.
    ///
    /// Validation errors are expected user mistakes and are not captured.
    pub fn report(&self) {
        if matches!(
            self,
            Self::Storage(_) | Self::Payment(_) | Self::Template(_)
        ) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Client error"
            );
        }
    }

    /// Message safe to show in the page.
    ///
    /// Internal details are never exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(_) | Self::Template(_) | Self::MissingElement(_) => {
                "Ocurrió un error inesperado".to_string()
            }
            Self::Payment(err) => err.user_message(),
            Self::Config(_) => "Configuración inválida".to_string(),
            Self::Validation(msg) => msg.clone(),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Item added", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Validation("El carrito está vacío".to_string());
        assert_eq!(err.to_string(), "Validation error: El carrito está vacío");

        let err = ClientError::MissingElement("cart-items".to_string());
        assert_eq!(err.to_string(), "Missing element: #cart-items");
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = ClientError::Storage(StorageError::QuotaExceeded {
            limit: 10,
            requested: 20,
        });
        assert_eq!(err.user_message(), "Ocurrió un error inesperado");

        let err = ClientError::Validation("Por favor, ingresa tu nombre completo".to_string());
        assert_eq!(err.user_message(), "Por favor, ingresa tu nombre completo");
    }

    #[test]
    fn test_payment_declined_message_passes_through() {
        let err = ClientError::Payment(PaymentError::Declined("tarjeta rechazada".to_string()));
        assert!(err.user_message().contains("tarjeta rechazada"));
    }
}
