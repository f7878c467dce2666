//! Core types for Ferramas.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod payment;
pub mod price;

pub use id::*;
pub use payment::{PaymentMethod, PaymentMethodError};
pub use price::{Price, PriceError};
