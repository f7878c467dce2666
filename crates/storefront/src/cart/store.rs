//! Persisted cart state.
//!
//! The whole cart lives under one storage key as a flat JSON object:
//!
//! ```json
//! { "p1": { "nombre": "Martillo", "precio": 1000, "cantidad": 2 } }
//! ```
//!
//! Every mutation reads the slot, applies the change and writes it back
//! before returning, so whatever refresh the caller triggers next sees the
//! new state. Tabs sharing the slot are not coordinated: the last writer wins.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ferramas_core::{Price, ProductId};
use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::instrument;

use crate::storage::Storage;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Display name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Unit price.
    #[serde(rename = "precio")]
    pub unit_price: Price,
    /// Quantity, always at least 1.
    #[serde(rename = "cantidad")]
    pub quantity: u32,
}

impl CartEntry {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.line_total(self.quantity)
    }
}

/// Product id to entry, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    entries: IndexMap<ProductId, CartEntry>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartEntry> {
        self.entries.get(id)
    }

    /// Entries in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &CartEntry)> {
        self.entries.iter()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the line totals, unrounded. Saturates at `Decimal::MAX`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.entries
            .values()
            .map(CartEntry::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Derived totals.
    #[must_use]
    pub fn stats(&self) -> CartStats {
        let item_count = self
            .entries
            .values()
            .map(|entry| u64::from(entry.quantity))
            .fold(0_u64, u64::saturating_add);
        let total = self
            .subtotal()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        CartStats {
            item_count,
            total,
            is_empty: item_count == 0,
        }
    }

    fn insert_or_increment(&mut self, id: ProductId, name: &str, unit_price: Price) -> CartEntry {
        let entry = self
            .entries
            .entry(id)
            .and_modify(|entry| entry.quantity = entry.quantity.saturating_add(1))
            .or_insert_with(|| CartEntry {
                name: name.to_string(),
                unit_price,
                quantity: 1,
            });
        entry.clone()
    }

    fn remove(&mut self, id: &ProductId) -> Option<CartEntry> {
        self.entries.shift_remove(id)
    }

    fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                entry.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Drop entries that break the `quantity >= 1` invariant.
    fn retain_valid(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.quantity >= 1);
        before - self.entries.len()
    }
}

impl FromIterator<(ProductId, CartEntry)> for Cart {
    fn from_iter<I: IntoIterator<Item = (ProductId, CartEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Totals derived from a cart. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartStats {
    /// Sum of all quantities.
    pub item_count: u64,
    /// Sum of price times quantity, rounded to 2 decimals.
    pub total: Decimal,
    /// `item_count == 0`.
    pub is_empty: bool,
}

/// Notification emitted by every cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A product was added or its quantity incremented.
    ItemAdded {
        /// Product id.
        id: ProductId,
        /// Entry after the change.
        entry: CartEntry,
    },
    /// A product was removed.
    ItemRemoved {
        /// Product id.
        id: ProductId,
        /// Entry that was removed.
        entry: CartEntry,
    },
    /// A product's quantity was set.
    ItemUpdated {
        /// Product id.
        id: ProductId,
        /// New quantity.
        quantity: u32,
    },
    /// The cart slot was removed.
    Cleared,
}

/// Read/write access to the persisted cart slot.
///
/// Cheap to clone; clones share the storage handle and the change channel.
#[derive(Clone)]
pub struct CartStore {
    storage: Arc<dyn Storage>,
    key: String,
    changes: broadcast::Sender<CartChange>,
    // Cart whose last save failed; stays authoritative until a save succeeds
    unsaved: Arc<Mutex<Option<Cart>>>,
}

impl fmt::Debug for CartStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartStore")
            .field("key", &self.key)
            .field("subscribers", &self.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store over `storage`, using `key` as the cart slot.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            storage,
            key: key.into(),
            changes,
            unsaved: Arc::new(Mutex::new(None)),
        }
    }

    /// The storage key of the cart slot.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn unsaved(&self) -> MutexGuard<'_, Option<Cart>> {
        self.unsaved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartChange> {
        self.changes.subscribe()
    }

    /// Read the cart. A missing, unreadable or malformed slot yields an empty cart.
    #[must_use]
    pub fn load(&self) -> Cart {
        if let Some(cart) = self.unsaved().clone() {
            return cart;
        }

        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cart::new(),
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Failed to read cart data");
                return Cart::new();
            }
        };

        match serde_json::from_str::<Cart>(&raw) {
            Ok(mut cart) => {
                let dropped = cart.retain_valid();
                if dropped > 0 {
                    tracing::warn!(key = %self.key, dropped, "Dropped cart entries with zero quantity");
                }
                cart
            }
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Error parsing cart data");
                Cart::new()
            }
        }
    }

    /// Persist the cart. Failures are logged; the cart stays readable through
    /// [`CartStore::load`] for the life of this store.
    pub fn save(&self, cart: &Cart) {
        let result = serde_json::to_string(cart)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.storage.set_item(&self.key, &json));

        let mut unsaved = self.unsaved();
        match result {
            Ok(()) => *unsaved = None,
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "Error saving cart data");
                *unsaved = Some(cart.clone());
            }
        }
    }

    /// Add one unit of a product.
    ///
    /// Name and price are taken from the first add; later adds of the same id
    /// only increment the quantity.
    #[instrument(skip(self, name, unit_price), fields(product_id = %id))]
    pub fn add_item(&self, id: ProductId, name: &str, unit_price: Price) -> CartChange {
        let mut cart = self.load();
        let entry = cart.insert_or_increment(id.clone(), name, unit_price);
        self.save(&cart);

        self.notify(CartChange::ItemAdded { id, entry })
    }

    /// Remove a product. Returns `None` if it was not in the cart.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn remove_item(&self, id: &ProductId) -> Option<CartChange> {
        let mut cart = self.load();
        let entry = cart.remove(id)?;
        self.save(&cart);

        Some(self.notify(CartChange::ItemRemoved {
            id: id.clone(),
            entry,
        }))
    }

    /// Set a product's quantity. Zero or less removes it.
    ///
    /// Returns `None` if the product was not in the cart.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn update_quantity(&self, id: &ProductId, quantity: i64) -> Option<CartChange> {
        if quantity <= 0 {
            return self.remove_item(id);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let mut cart = self.load();
        if !cart.set_quantity(id, quantity) {
            return None;
        }
        self.save(&cart);

        Some(self.notify(CartChange::ItemUpdated {
            id: id.clone(),
            quantity,
        }))
    }

    /// Remove the cart slot entirely.
    #[instrument(skip(self))]
    pub fn clear(&self) -> CartChange {
        if let Err(e) = self.storage.remove_item(&self.key) {
            tracing::error!(key = %self.key, error = %e, "Error removing cart data");
        }
        *self.unsaved() = None;

        self.notify(CartChange::Cleared)
    }

    /// Totals for the current cart.
    #[must_use]
    pub fn stats(&self) -> CartStats {
        self.load().stats()
    }

    fn notify(&self, change: CartChange) -> CartChange {
        // No subscribers is not an error
        let _ = self.changes.send(change.clone());
        change
    }
}
