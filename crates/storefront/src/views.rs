//! HTML fragments rendered into the page.
//!
//! Each fragment is an Askama template under `templates/`; names and other
//! user-controlled text are escaped by the template engine. Amounts are
//! formatted before they reach the template.

use askama::Template;
use rust_decimal::Decimal;

use crate::cart::Cart;
use crate::format::{format_currency, format_fixed};
use crate::payment::LineItem;

// =============================================================================
// Cart widget
// =============================================================================

/// One line of the floating cart panel.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Item list of the floating cart panel (`#cart-items`).
#[derive(Template)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub items: Vec<CartLineView>,
    pub currency: String,
    pub empty_message: String,
}

impl CartItemsTemplate {
    /// Build the list for `cart`.
    #[must_use]
    pub fn new(cart: &Cart, currency: &str, empty_message: &str) -> Self {
        let items = cart
            .iter()
            .map(|(id, entry)| CartLineView {
                id: id.to_string(),
                name: entry.name.clone(),
                unit_price: entry.unit_price.to_string(),
                quantity: entry.quantity,
                line_total: format_fixed(entry.line_total(), 2),
            })
            .collect();

        Self {
            items,
            currency: currency.to_string(),
            empty_message: empty_message.to_string(),
        }
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// One read-only line of the checkout summary.
#[derive(Debug, Clone)]
pub struct CheckoutLineView {
    pub name: String,
    pub price: String,
    pub quantity: u32,
}

/// Checkout summary (`#cart-items` on the checkout page).
#[derive(Template)]
#[template(path = "checkout/items.html")]
pub struct CheckoutItemsTemplate {
    pub lines: Vec<CheckoutLineView>,
}

impl From<&Cart> for CheckoutItemsTemplate {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .iter()
                .map(|(_, entry)| CheckoutLineView {
                    name: entry.name.clone(),
                    price: format_currency(entry.unit_price.amount()),
                    quantity: entry.quantity,
                })
                .collect(),
        }
    }
}

/// Checkout total (`#total`), with the original struck through when a
/// discount applies.
#[derive(Template)]
#[template(path = "checkout/total.html")]
pub struct CheckoutTotalTemplate {
    pub original: String,
    pub discounted: Option<String>,
}

impl CheckoutTotalTemplate {
    #[must_use]
    pub fn new(subtotal: Decimal, discounted: Option<Decimal>) -> Self {
        Self {
            original: format_currency(subtotal),
            discounted: discounted.map(format_currency),
        }
    }
}

// =============================================================================
// Voucher
// =============================================================================

#[derive(Debug, Clone)]
pub struct VoucherRowView {
    pub name: String,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal: String,
}

/// Product table body of the receipt (`#productos-detalle`).
#[derive(Template)]
#[template(path = "voucher/rows.html")]
pub struct VoucherRowsTemplate {
    pub rows: Vec<VoucherRowView>,
}

impl From<&[LineItem]> for VoucherRowsTemplate {
    fn from(products: &[LineItem]) -> Self {
        Self {
            rows: products
                .iter()
                .map(|item| VoucherRowView {
                    name: item.nombre.clone(),
                    quantity: item.cantidad,
                    unit_price: format_currency(item.precio.amount()),
                    subtotal: format_currency(item.precio.line_total(item.cantidad)),
                })
                .collect(),
        }
    }
}

/// Shown instead of the receipt when no receipt data is available.
#[derive(Template)]
#[template(path = "voucher/access_denied.html")]
pub struct AccessDeniedTemplate {
    pub home_url: String,
}

/// Shown instead of the receipt when its data cannot be read.
#[derive(Template)]
#[template(path = "voucher/error.html")]
pub struct VoucherErrorTemplate {
    pub message: String,
    pub home_url: String,
}
