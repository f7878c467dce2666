//! Receipt command.
//!
//! Shows the receipt left in `session.json` by the last successful
//! checkout. Like the receipt page, reading it consumes it.

use std::sync::Arc;

use ferramas_storefront::dom::{Dom, Element, MemoryDom};
use ferramas_storefront::format::format_currency;
use ferramas_storefront::voucher::{VoucherOutcome, VoucherRenderer, ids};

use super::{CommandError, Context};

/// Receipt fields in display order.
const FIELDS: [(&str, &str); 9] = [
    ("Voucher", ids::NUMBER),
    ("Comprador", ids::BUYER),
    ("Fecha", ids::DATE),
    ("Método de pago", ids::METHOD),
    ("Cliente", ids::CUSTOMER_TYPE),
    ("Subtotal", ids::SUBTOTAL),
    ("Subtotal neto", ids::NET_SUBTOTAL),
    ("IVA", ids::TAX),
    ("Total", ids::TOTAL_FINAL),
];

fn voucher_page() -> MemoryDom {
    FIELDS.iter().fold(
        MemoryDom::new().with(ids::CONTAINER, Element::new("div")),
        |dom, (_, id)| dom.with(id, Element::new("span").child_of(ids::CONTAINER)),
    )
}

/// Print the receipt, as text or as its raw JSON data.
///
/// # Errors
///
/// Returns `CommandError::NoVoucher` when there is no receipt and
/// `CommandError::UnreadableVoucher` when it cannot be parsed.
#[allow(clippy::print_stdout)]
pub fn show(ctx: &Context, json: bool) -> Result<(), CommandError> {
    let dom = Arc::new(voucher_page());
    let renderer = VoucherRenderer::new(dom.clone(), ctx.session.clone(), ctx.config.clone());

    let data = match renderer.init(None)? {
        VoucherOutcome::Rendered(data) => data,
        VoucherOutcome::AccessDenied => return Err(CommandError::NoVoucher),
        VoucherOutcome::Failed => return Err(CommandError::UnreadableVoucher),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    for (label, id) in FIELDS {
        println!("{label:<16} {}", dom.text(id).unwrap_or_default());
    }
    if data.descuento > rust_decimal::Decimal::ZERO {
        println!("{:<16} -{}", "Descuento", format_currency(data.descuento));
    }
    println!();
    for item in &data.productos {
        println!(
            "{:<30} {:>4} x {:>10}",
            item.nombre,
            item.cantidad,
            format_currency(item.precio.amount())
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_voucher_page_has_every_field() {
        let dom = voucher_page();
        for (_, id) in FIELDS {
            assert!(dom.exists(id), "missing #{id}");
        }
    }
}
