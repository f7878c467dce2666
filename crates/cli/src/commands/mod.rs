//! CLI command implementations.

use std::path::Path;
use std::sync::Arc;

use ferramas_storefront::ClientError;
use ferramas_storefront::cart::CartStore;
use ferramas_storefront::config::ClientConfig;
use ferramas_storefront::storage::FileStorage;
use thiserror::Error;

pub mod cart;
pub mod checkout;
pub mod voucher;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A storefront component failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The product is not in the cart.
    #[error("Product not in cart: {0}")]
    NotInCart(String),

    /// There is no receipt to show.
    #[error("No voucher data available")]
    NoVoucher,

    /// The stored receipt could not be read.
    #[error("Voucher data is unreadable")]
    UnreadableVoucher,

    /// Output serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage and configuration shared by every command.
pub struct Context {
    pub config: Arc<ClientConfig>,
    pub local: Arc<FileStorage>,
    pub session: Arc<FileStorage>,
}

impl Context {
    /// Open the emulated browser storage in `storage_dir`.
    pub fn open(storage_dir: &Path, config: ClientConfig) -> Self {
        tracing::debug!(dir = %storage_dir.display(), "Opening storage");
        Self {
            config: Arc::new(config),
            local: Arc::new(FileStorage::new(storage_dir.join("local.json"))),
            session: Arc::new(FileStorage::new(storage_dir.join("session.json"))),
        }
    }

    /// The cart store backed by `local.json`.
    pub fn store(&self) -> CartStore {
        CartStore::new(self.local.clone(), self.config.cart_key.clone())
    }
}
