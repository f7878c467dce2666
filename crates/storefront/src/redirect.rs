//! Hand-off to an external payment page.
//!
//! The server renders this page with the provider's init point; the page
//! shows a loading overlay and follows the link after a short delay.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::dom::Dom;
use crate::schedule::{Scheduler, TimerHandle};

/// Element ids on the redirect page.
pub mod ids {
    pub const OVERLAY: &str = "loading-overlay";
    pub const SUBMIT: &str = "submit-btn";
}

/// The payment redirect page. Dropping it cancels a pending redirect.
pub struct PaymentRedirect {
    dom: Arc<dyn Dom>,
    config: Arc<ClientConfig>,
    scheduler: Scheduler,
}

impl std::fmt::Debug for PaymentRedirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentRedirect")
            .field("pending", &self.scheduler.pending())
            .finish_non_exhaustive()
    }
}

impl PaymentRedirect {
    #[must_use]
    pub fn new(dom: Arc<dyn Dom>, config: Arc<ClientConfig>) -> Self {
        Self {
            dom,
            config,
            scheduler: Scheduler::new(),
        }
    }

    /// Start the redirect to `init_point`. Nothing happens without one.
    pub fn start(&self, init_point: Option<&str>) -> Option<TimerHandle> {
        let init_point = init_point.map(str::trim).filter(|url| !url.is_empty())?;

        self.dom.remove_class(ids::OVERLAY, "hidden");
        self.dom.set_disabled(ids::SUBMIT, true);
        tracing::info!(delay_ms = self.config.redirect_delay.as_millis(), "Redirecting to payment provider");

        let dom = Arc::clone(&self.dom);
        let url = init_point.to_string();
        Some(
            self.scheduler
                .schedule(self.config.redirect_delay, move || dom.navigate(&url)),
        )
    }
}
