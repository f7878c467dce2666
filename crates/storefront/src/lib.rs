//! Ferramas Storefront client library.
//!
//! The page-side layer of the storefront: the floating cart widget, the
//! checkout controller, the voucher renderer and the small page helpers
//! (login toggle, payment redirect, subscription pop-up).
//!
//! Browser facilities are reached through two seams so every component runs
//! natively and under test:
//!
//! - [`storage::Storage`] - `localStorage` / `sessionStorage`
//! - [`dom::Dom`] - the document (elements, dialogs, navigation, cookies)
//!
//! [`app::Storefront`] is the composition root that builds each component
//! once and routes page clicks to them.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod dom;
pub mod error;
pub mod format;
pub mod login;
pub mod payment;
pub mod popup;
pub mod redirect;
pub mod schedule;
pub mod storage;
pub mod telemetry;
pub mod views;
pub mod voucher;

pub use app::{PageContext, Storefront};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
