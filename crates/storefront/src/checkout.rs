//! Checkout page controller.
//!
//! Shows a read-only summary of the cart (with the buyer's discount, if
//! any), collects guest details when the buyer is not logged in and submits
//! exactly one payment request at a time. On success the cart is discarded,
//! the receipt is stashed in session storage and the page moves to the
//! receipt; on failure the buyer is told why and can try again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use askama::Template;
use ferramas_core::PaymentMethod;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::instrument;

use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::dom::{ClickTarget, Dom};
use crate::error::{ClientError, Result, add_breadcrumb};
use crate::format::get_cookie;
use crate::payment::{GuestDetails, PaymentError, PaymentGateway, PaymentRequest, PaymentResponse};
use crate::storage::Storage;
use crate::views::{CheckoutItemsTemplate, CheckoutTotalTemplate};

/// Element ids on the checkout page.
pub mod ids {
    pub const CART_ITEMS: &str = "cart-items";
    pub const TOTAL: &str = "total";
    pub const GUEST_NAME: &str = "guest-name";
    pub const GUEST_EMAIL: &str = "guest-email";
    pub const CONTINUE: &str = "btn-continuar-pago";
    pub const PAYMENT_BUTTONS: &str = "payment-buttons";
    pub const PAY_CARD: &str = "pagar-tarjeta";
    pub const CONFIRM_TRANSFER: &str = "confirmar-transferencia";
    pub const TRANSFER_BUTTON: &str = "transfer-button";
    pub const TRANSFER_DETAILS: &str = "transfer-details";
    pub const BACK: &str = "btn-volver";
}

const EMPTY_CART: &str = "El carrito está vacío";
const MISSING_GUEST_NAME: &str = "Por favor, ingresa tu nombre completo";
const ALREADY_SUBMITTING: &str = "Ya hay un pago en proceso";
const BUSY_LABEL: &str = "Procesando...";

/// Where a checkout submission stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    /// A payment request is in flight.
    Submitting,
    /// The last submission failed with the message shown to the buyer.
    Failed(String),
    /// Payment succeeded and the page is moving to the receipt.
    NavigatingAway(String),
}

/// Buyer information provided by the server with the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckoutOptions {
    /// Discount applied to the subtotal, in percent. Zero means none.
    pub discount_percentage: Decimal,
    /// Whether the buyer is logged in (no guest details needed).
    pub is_authenticated: bool,
}

/// Totals shown on the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub item_count: u64,
    pub subtotal: Decimal,
    /// Subtotal after the discount.
    pub total: Decimal,
}

/// Apply a percentage discount. Percentages outside `0..=100` are clamped.
#[must_use]
pub fn apply_discount(subtotal: Decimal, percentage: Decimal) -> Decimal {
    if percentage <= Decimal::ZERO {
        return subtotal;
    }
    let percentage = percentage.min(Decimal::ONE_HUNDRED);
    subtotal
        .checked_mul(Decimal::ONE - percentage / Decimal::ONE_HUNDRED)
        .unwrap_or(subtotal)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The checkout page.
pub struct CheckoutController<G> {
    dom: Arc<dyn Dom>,
    store: CartStore,
    session: Arc<dyn Storage>,
    gateway: G,
    config: Arc<ClientConfig>,
    options: CheckoutOptions,
    state: Mutex<CheckoutState>,
}

impl<G> std::fmt::Debug for CheckoutController<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutController")
            .field("options", &self.options)
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl<G: PaymentGateway> CheckoutController<G> {
    /// Create the controller. Call [`CheckoutController::load`] to render.
    pub fn new(
        dom: Arc<dyn Dom>,
        store: CartStore,
        session: Arc<dyn Storage>,
        gateway: G,
        config: Arc<ClientConfig>,
        options: CheckoutOptions,
    ) -> Self {
        Self {
            dom,
            store,
            session,
            gateway,
            config,
            options,
            state: Mutex::new(CheckoutState::Idle),
        }
    }

    /// Current submission state.
    #[must_use]
    pub fn state(&self) -> CheckoutState {
        lock(&self.state).clone()
    }

    /// Render the cart summary and the total.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    #[instrument(skip(self))]
    pub fn load(&self) -> Result<CheckoutSummary> {
        let cart = self.store.load();
        let stats = cart.stats();
        let subtotal = cart.subtotal();
        let total = apply_discount(subtotal, self.options.discount_percentage);

        if self.dom.exists(ids::CART_ITEMS) {
            let html = CheckoutItemsTemplate::from(&cart).render()?;
            self.dom.set_html(ids::CART_ITEMS, &html);
        }

        if self.dom.exists(ids::TOTAL) {
            let discounted =
                (self.options.discount_percentage > Decimal::ZERO).then_some(total);
            let html = CheckoutTotalTemplate::new(subtotal, discounted).render()?;
            self.dom.set_html(ids::TOTAL, &html);
        }

        Ok(CheckoutSummary {
            item_count: stats.item_count,
            subtotal,
            total,
        })
    }

    /// Guest details from the form, or a validation error already shown to
    /// the buyer.
    fn guest_details(&self) -> Result<Option<GuestDetails>> {
        if self.options.is_authenticated {
            return Ok(None);
        }

        let name = self
            .dom
            .value(ids::GUEST_NAME)
            .map(|name| name.trim().to_string())
            .unwrap_or_default();
        if name.is_empty() {
            self.dom.alert(MISSING_GUEST_NAME);
            self.dom.focus(ids::GUEST_NAME);
            return Err(ClientError::Validation(MISSING_GUEST_NAME.to_string()));
        }

        let email = self
            .dom
            .value(ids::GUEST_EMAIL)
            .map(|email| email.trim().to_string())
            .unwrap_or_default();
        Ok(Some(GuestDetails {
            nombre: name,
            email,
        }))
    }

    /// Validate the guest name and reveal the payment buttons.
    pub fn continue_as_guest(&self) -> bool {
        if self.guest_details().is_err() {
            return false;
        }
        self.dom.set_style(ids::PAYMENT_BUTTONS, "display", "flex");
        true
    }

    /// Show or hide the bank transfer details.
    pub fn toggle_transfer_details(&self) {
        self.dom.toggle_class(ids::TRANSFER_DETAILS, "hidden");
    }

    /// Go back to the previous page.
    pub fn go_back(&self) {
        self.dom.history_back();
    }

    /// Submit the cart for payment with `method`.
    ///
    /// Every failure is shown to the buyer before it is returned. On success
    /// returns the receipt URL the page navigated to.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty cart, a missing guest
    /// name or a submission already in flight, and [`ClientError::Payment`]
    /// when the payment is declined or the endpoint cannot be reached.
    #[instrument(skip_all, fields(method = %method))]
    pub async fn submit(&self, method: PaymentMethod) -> Result<String> {
        let cart = self.store.load();
        if cart.is_empty() {
            self.dom.alert(EMPTY_CART);
            return Err(ClientError::Validation(EMPTY_CART.to_string()));
        }

        let guest = self.guest_details()?;
        let request = PaymentRequest::from_cart(&cart, method, guest);

        {
            let mut state = lock(&self.state);
            if matches!(
                *state,
                CheckoutState::Submitting | CheckoutState::NavigatingAway(_)
            ) {
                tracing::warn!("Payment submission already in progress");
                return Err(ClientError::Validation(ALREADY_SUBMITTING.to_string()));
            }
            *state = CheckoutState::Submitting;
        }

        add_breadcrumb("checkout", "Payment submitted", Some(&[("method", method.code())]));
        let button = Self::control_for(method);
        let label = self.show_busy(button);

        let csrf_token = get_cookie(&self.dom.cookies(), &self.config.csrf_cookie)
            .map(SecretString::from);
        if csrf_token.is_none() {
            tracing::warn!(cookie = %self.config.csrf_cookie, "CSRF cookie not found");
        }

        let outcome = self
            .gateway
            .process(&request, csrf_token.as_ref())
            .await
            .and_then(PaymentResponse::into_result);
        self.hide_busy(button, label);

        match outcome {
            Ok((voucher_id, payload)) => {
                self.store.clear();
                if let Err(e) = self
                    .session
                    .set_item(&self.config.voucher_key, &payload.to_string())
                {
                    tracing::error!(error = %e, "Failed to stash voucher data");
                }

                let url = ClientConfig::voucher_path(voucher_id.as_str());
                self.dom.navigate(&url);
                *lock(&self.state) = CheckoutState::NavigatingAway(url.clone());
                Ok(url)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, err: PaymentError) -> ClientError {
        let message = err.user_message();
        let err = ClientError::from(err);
        if let ClientError::Payment(payment) = &err
            && payment.is_transport()
        {
            err.report();
        }

        self.dom.alert(&message);
        *lock(&self.state) = CheckoutState::Failed(message);
        err
    }

    const fn control_for(method: PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::Card => ids::PAY_CARD,
            PaymentMethod::Transfer => ids::CONFIRM_TRANSFER,
        }
    }

    fn show_busy(&self, button: &str) -> Option<String> {
        let label = self.dom.text(button)?;
        self.dom.set_text(button, BUSY_LABEL);
        self.dom.set_disabled(button, true);
        Some(label)
    }

    fn hide_busy(&self, button: &str, label: Option<String>) {
        if let Some(label) = label {
            self.dom.set_text(button, &label);
            self.dom.set_disabled(button, false);
        }
    }

    /// Route a click on the checkout page. Returns `true` if it was handled.
    pub async fn handle_click(&self, target: &ClickTarget) -> bool {
        if target.within(ids::BACK) {
            self.go_back();
            return true;
        }
        if target.within(ids::CONTINUE) {
            self.continue_as_guest();
            return true;
        }
        if target.within(ids::TRANSFER_BUTTON) {
            self.toggle_transfer_details();
            return true;
        }

        let method = if target.within(ids::PAY_CARD) {
            PaymentMethod::Card
        } else if target.within(ids::CONFIRM_TRANSFER) {
            PaymentMethod::Transfer
        } else {
            return false;
        };

        // Disabled buttons do not fire
        let control = Self::control_for(method);
        if target
            .closest(|node| node.is(control))
            .is_some_and(|node| node.disabled)
        {
            return true;
        }

        if let Err(e) = self.submit(method).await {
            tracing::debug!(error = %e, "Checkout submission did not complete");
        }
        true
    }
}
