//! Newsletter subscription pop-up.
//!
//! Shown once per browser: closing it (or subscribing) stores a flag in
//! local storage and it never opens again. The server only renders the
//! pop-up for anonymous visitors.

use std::sync::Arc;

use crate::dom::{ClickTarget, Dom};
use crate::error::add_breadcrumb;
use crate::storage::Storage;

/// Element ids of the pop-up.
pub mod ids {
    pub const OVERLAY: &str = "subscription-popup-overlay";
    pub const CLOSE: &str = "close-popup";
    pub const SUBMIT: &str = "subscription-submit";
}

/// Local-storage flag set once the pop-up has been dismissed.
pub const DISMISSED_KEY: &str = "subscriptionPopupClosed";

/// The subscription pop-up.
pub struct SubscriptionPopup {
    dom: Arc<dyn Dom>,
    storage: Arc<dyn Storage>,
    active: bool,
}

impl std::fmt::Debug for SubscriptionPopup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionPopup")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl SubscriptionPopup {
    /// Bind to the page and show the pop-up unless it was dismissed before.
    pub fn bind(dom: Arc<dyn Dom>, storage: Arc<dyn Storage>) -> Self {
        let present = dom.exists(ids::OVERLAY) && dom.exists(ids::SUBMIT);
        let dismissed = match storage.get_item(DISMISSED_KEY) {
            Ok(flag) => flag.is_some(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read subscription pop-up flag");
                false
            }
        };

        let active = present && !dismissed;
        if active {
            dom.remove_class(ids::OVERLAY, "hidden");
        }

        Self {
            dom,
            storage,
            active,
        }
    }

    /// Whether the pop-up is showing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Hide the pop-up and remember the choice.
    pub fn dismiss(&mut self) {
        self.dom.add_class(ids::OVERLAY, "hidden");
        if let Err(e) = self.storage.set_item(DISMISSED_KEY, "true") {
            tracing::error!(error = %e, "Failed to store subscription pop-up flag");
        }
        self.active = false;
        add_breadcrumb("popup", "Subscription pop-up dismissed", None);
    }

    /// Route a click. Returns `true` if it dismissed the pop-up.
    ///
    /// Only a click on the bare overlay counts as "outside"; clicks on the
    /// pop-up content are ignored.
    pub fn handle_click(&mut self, target: &ClickTarget) -> bool {
        if !self.active {
            return false;
        }

        if target.within(ids::CLOSE) || target.within(ids::SUBMIT) || target.is(ids::OVERLAY) {
            self.dismiss();
            return true;
        }
        false
    }
}
