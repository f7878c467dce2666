//! Checkout command.
//!
//! Builds the checkout page in memory, fills the guest form from the
//! arguments and submits the cart through the HTTP payment endpoint
//! (`FERRAMAS_BASE_URL` + `FERRAMAS_PAYMENT_PATH`). On success the receipt is
//! left in `session.json` for `ferramas voucher`.

use std::sync::Arc;

use ferramas_core::PaymentMethod;
use ferramas_storefront::ClientError;
use ferramas_storefront::checkout::{CheckoutController, CheckoutOptions, ids};
use ferramas_storefront::dom::{Element, MemoryDom};
use ferramas_storefront::format::format_currency;
use ferramas_storefront::payment::HttpPaymentGateway;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

use super::{CommandError, Context};

/// Arguments of a checkout.
pub struct CheckoutArgs {
    pub method: PaymentMethod,
    /// Set for guest checkouts.
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub csrf_token: Option<SecretString>,
    pub discount_percentage: Decimal,
}

/// The checkout page as the server would render it.
fn checkout_page(args: &CheckoutArgs, csrf_cookie: &str) -> MemoryDom {
    let mut dom = MemoryDom::new()
        .with(ids::CART_ITEMS, Element::new("div"))
        .with(ids::TOTAL, Element::new("p"))
        .with(ids::PAY_CARD, Element::new("button").text("Pagar con tarjeta"))
        .with(
            ids::CONFIRM_TRANSFER,
            Element::new("button").text("Confirmar transferencia"),
        );

    if let Some(name) = &args.guest_name {
        dom = dom
            .with(ids::GUEST_NAME, Element::new("input").value(name))
            .with(
                ids::GUEST_EMAIL,
                Element::new("input").value(args.guest_email.as_deref().unwrap_or_default()),
            );
    }

    if let Some(token) = &args.csrf_token {
        dom.set_cookies(&format!("{csrf_cookie}={}", token.expose_secret()));
    }
    dom
}

/// Submit the cart. Returns the receipt page URL.
///
/// # Errors
///
/// Returns an error if the endpoint is misconfigured, the cart is empty, the
/// guest name is blank or the payment fails.
#[allow(clippy::print_stdout)]
pub async fn run(ctx: &Context, args: CheckoutArgs) -> Result<String, CommandError> {
    let endpoint = ctx.config.payment_endpoint().map_err(ClientError::from)?;
    let gateway = HttpPaymentGateway::new(endpoint).map_err(ClientError::from)?;

    let dom = Arc::new(checkout_page(&args, &ctx.config.csrf_cookie));
    let controller = CheckoutController::new(
        dom.clone(),
        ctx.store(),
        ctx.session.clone(),
        gateway,
        ctx.config.clone(),
        CheckoutOptions {
            discount_percentage: args.discount_percentage,
            is_authenticated: args.guest_name.is_none(),
        },
    );

    let summary = controller.load()?;
    tracing::info!(
        items = summary.item_count,
        subtotal = %format_currency(summary.subtotal),
        total = %format_currency(summary.total),
        method = %args.method,
        "Submitting payment"
    );

    let url = controller.submit(args.method).await?;
    println!("{url}");
    Ok(url)
}
