//! Payment method enumeration.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown payment method code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid payment method: {0}")]
pub struct PaymentMethodError(pub String);

/// Payment method accepted by the payment endpoint.
///
/// Serializes to the wire codes `tarjeta` and `transferencia`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Credit or debit card.
    #[serde(rename = "tarjeta")]
    Card,
    /// Bank transfer.
    #[serde(rename = "transferencia")]
    Transfer,
}

impl PaymentMethod {
    /// Wire code sent to the payment endpoint.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Card => "tarjeta",
            Self::Transfer => "transferencia",
        }
    }

    /// Human-readable label shown on receipts.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Card => "Tarjeta de Crédito/Débito",
            Self::Transfer => "Transferencia Bancaria",
        }
    }

    /// Display label for a raw method code; unknown codes are returned verbatim.
    #[must_use]
    pub fn label_for_code(code: &str) -> &str {
        code.parse::<Self>().map_or(code, |method| method.label())
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = PaymentMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tarjeta" => Ok(Self::Card),
            "transferencia" => Ok(Self::Transfer),
            _ => Err(PaymentMethodError(s.to_owned())),
        }
    }
}
