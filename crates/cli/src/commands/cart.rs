//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! ferramas cart add p1 Martillo 1000
//! ferramas cart update p1 3
//! ferramas cart remove p1
//! ferramas cart show
//! ferramas cart clear
//! ```

use ferramas_core::{Price, ProductId};
use ferramas_storefront::cart::{Cart, CartStats};
use ferramas_storefront::format::format_currency;

use super::{CommandError, Context};

/// Print the cart contents and totals.
#[allow(clippy::print_stdout)]
pub fn show(ctx: &Context) {
    let cart = ctx.store().load();
    for line in render_lines(&cart) {
        println!("{line}");
    }
}

/// Add one unit of a product.
pub fn add(ctx: &Context, id: &str, name: &str, price: Price) {
    ctx.store().add_item(ProductId::new(id), name, price);
    report(&ctx.store().stats());
}

/// Remove a product line.
///
/// # Errors
///
/// Returns `CommandError::NotInCart` if the product is not in the cart.
pub fn remove(ctx: &Context, id: &str) -> Result<(), CommandError> {
    let store = ctx.store();
    store
        .remove_item(&ProductId::new(id))
        .ok_or_else(|| CommandError::NotInCart(id.to_owned()))?;
    report(&store.stats());
    Ok(())
}

/// Set the quantity of a product line; zero or less removes it.
///
/// # Errors
///
/// Returns `CommandError::NotInCart` if the product is not in the cart.
pub fn update(ctx: &Context, id: &str, quantity: i64) -> Result<(), CommandError> {
    let store = ctx.store();
    store
        .update_quantity(&ProductId::new(id), quantity)
        .ok_or_else(|| CommandError::NotInCart(id.to_owned()))?;
    report(&store.stats());
    Ok(())
}

/// Empty the cart.
pub fn clear(ctx: &Context) {
    ctx.store().clear();
    tracing::info!("Cart cleared");
}

fn report(stats: &CartStats) {
    tracing::info!(
        items = stats.item_count,
        total = %format_currency(stats.total),
        "Cart updated"
    );
}

/// One line per product, then the totals.
fn render_lines(cart: &Cart) -> Vec<String> {
    if cart.is_empty() {
        return vec!["Carrito vacío".to_owned()];
    }

    let mut lines: Vec<String> = cart
        .iter()
        .map(|(id, entry)| {
            format!(
                "{id:<12} {name:<30} {quantity:>4} x {price:>10} = {total:>12}",
                id = id.as_str(),
                name = entry.name,
                quantity = entry.quantity,
                price = format_currency(entry.unit_price.amount()),
                total = format_currency(entry.line_total()),
            )
        })
        .collect();

    let stats = cart.stats();
    lines.push(format!(
        "{} productos, total {}",
        stats.item_count,
        format_currency(stats.total)
    ));
    lines
}
