//! Ferramas Core - Shared types library.
//!
//! This crate provides common types used across all Ferramas components:
//! - `storefront` - Client-side storefront layer (cart, checkout, voucher)
//! - `cli` - Command-line driver for the storefront layer
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices, quantities and payment methods

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
