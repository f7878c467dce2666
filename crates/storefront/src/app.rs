//! Page composition root.
//!
//! [`Storefront::start`] builds the components a page needs exactly once,
//! hands each its dependencies and routes page clicks to them. Every page
//! gets the subscription pop-up and, except the checkout page (whose summary
//! reuses the `cart-items` id), the floating cart.

use std::sync::Arc;

use serde_json::Value;

use crate::cart::{CartStore, CartWidget};
use crate::checkout::{CheckoutController, CheckoutOptions};
use crate::config::ClientConfig;
use crate::dom::{ClickTarget, Dom};
use crate::error::Result;
use crate::login::LoginForm;
use crate::payment::PaymentGateway;
use crate::popup::SubscriptionPopup;
use crate::redirect::PaymentRedirect;
use crate::storage::Storage;
use crate::voucher::{VoucherOutcome, VoucherRenderer};

/// Which page is being started, with the data the server rendered into it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PageContext {
    /// Any page without its own controller (home, catalog, product).
    #[default]
    Catalog,
    Checkout(CheckoutOptions),
    Voucher {
        /// Receipt embedded by the server, if any.
        injected: Option<Value>,
    },
    Login,
    PaymentRedirect {
        init_point: Option<String>,
    },
}

/// The page-specific controller.
#[derive(Debug)]
pub enum PageController<G> {
    None,
    Checkout(CheckoutController<G>),
    Voucher {
        renderer: VoucherRenderer,
        outcome: VoucherOutcome,
    },
    Login(LoginForm),
    PaymentRedirect(PaymentRedirect),
}

/// A running storefront page.
#[derive(Debug)]
pub struct Storefront<G> {
    store: CartStore,
    cart: Option<CartWidget>,
    popup: SubscriptionPopup,
    page: PageController<G>,
}

impl<G: PaymentGateway> Storefront<G> {
    /// Start the page described by `context`.
    ///
    /// Must be called from within a Tokio runtime (the cart panel and the
    /// redirect page use timers).
    ///
    /// # Errors
    ///
    /// Returns an error if the initial render of the checkout summary or the
    /// receipt fails.
    pub fn start(
        dom: Arc<dyn Dom>,
        local: Arc<dyn Storage>,
        session: Arc<dyn Storage>,
        gateway: G,
        config: Arc<ClientConfig>,
        context: PageContext,
    ) -> Result<Self> {
        let store = CartStore::new(Arc::clone(&local), config.cart_key.clone());
        let popup = SubscriptionPopup::bind(Arc::clone(&dom), local);

        let cart = (!matches!(context, PageContext::Checkout(_))).then(|| {
            CartWidget::bind(Arc::clone(&dom), store.clone(), Arc::clone(&config))
        });

        let page = match context {
            PageContext::Catalog => PageController::None,
            PageContext::Checkout(options) => {
                let controller = CheckoutController::new(
                    Arc::clone(&dom),
                    store.clone(),
                    session,
                    gateway,
                    Arc::clone(&config),
                    options,
                );
                controller.load()?;
                PageController::Checkout(controller)
            }
            PageContext::Voucher { injected } => {
                let renderer = VoucherRenderer::new(Arc::clone(&dom), session, Arc::clone(&config));
                let outcome = renderer.init(injected.as_ref())?;
                PageController::Voucher { renderer, outcome }
            }
            PageContext::Login => PageController::Login(LoginForm::bind(Arc::clone(&dom))),
            PageContext::PaymentRedirect { init_point } => {
                let redirect = PaymentRedirect::new(Arc::clone(&dom), Arc::clone(&config));
                redirect.start(init_point.as_deref());
                PageController::PaymentRedirect(redirect)
            }
        };

        tracing::debug!(has_cart = cart.is_some(), "Page started");
        Ok(Self {
            store,
            cart,
            popup,
            page,
        })
    }

    /// The cart store shared by every component of the page.
    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    /// The floating cart, absent on the checkout page.
    #[must_use]
    pub const fn cart(&self) -> Option<&CartWidget> {
        self.cart.as_ref()
    }

    #[must_use]
    pub const fn popup(&self) -> &SubscriptionPopup {
        &self.popup
    }

    #[must_use]
    pub const fn page(&self) -> &PageController<G> {
        &self.page
    }

    /// Deliver a click to every component, like listeners on the document.
    /// Returns `true` if any of them handled it.
    pub async fn click(&mut self, target: &ClickTarget) -> bool {
        let mut handled = self.popup.handle_click(target);

        handled |= match &self.page {
            PageController::Checkout(controller) => controller.handle_click(target).await,
            PageController::Voucher { renderer, .. } => renderer.handle_click(target),
            PageController::Login(form) => form.handle_click(target),
            PageController::None | PageController::PaymentRedirect(_) => false,
        };

        if let Some(cart) = &self.cart {
            handled |= cart.handle_click(target);
        }
        handled
    }
}
