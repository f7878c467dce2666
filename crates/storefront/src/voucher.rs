//! Payment receipt page.
//!
//! The receipt comes either from the server (embedded in the page) or from
//! the session slot the checkout left behind. The session slot is single
//! use: it is removed as soon as it is read.

use std::sync::Arc;

use askama::Template;
use ferramas_core::PaymentMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::config::ClientConfig;
use crate::dom::{ClickTarget, Dom};
use crate::error::Result;
use crate::format::{format_currency, format_date_str};
use crate::payment::LineItem;
use crate::storage::Storage;
use crate::views::{AccessDeniedTemplate, VoucherErrorTemplate, VoucherRowsTemplate};

/// Element ids on the receipt page.
pub mod ids {
    pub const CONTAINER: &str = "voucher-container";
    pub const NUMBER: &str = "voucher-number";
    pub const BUYER: &str = "comprador-nombre";
    pub const DATE: &str = "fecha-pago";
    pub const METHOD: &str = "metodo-pago";
    pub const CUSTOMER_TYPE: &str = "tipo-cliente";
    pub const TOTAL_PAID: &str = "total-pago";
    pub const SUBTOTAL: &str = "subtotal-original";
    pub const NET_SUBTOTAL: &str = "subtotal-neto";
    pub const TAX: &str = "iva-monto";
    pub const TOTAL_FINAL: &str = "total-final";
    pub const DISCOUNT_ROW: &str = "descuento-row";
    pub const DISCOUNT_AMOUNT: &str = "descuento-monto";
    pub const PRODUCTS: &str = "productos-detalle";
    pub const PRINT: &str = "btn-imprimir";
    pub const HOME: &str = "btn-volver";
}

const HOME_URL: &str = "/";
const REGISTERED_CUSTOMER: &str = "Cliente registrado (10% descuento aplicado)";
const GUEST_CUSTOMER: &str = "Cliente invitado";
const INJECTED_ERROR: &str = "Error al cargar los datos del voucher";
const SESSION_ERROR: &str = "Error al cargar datos del voucher";

/// Receipt data produced by the payment endpoint.
///
/// Every field is optional on the wire; missing fields take their default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoucherData {
    #[serde(deserialize_with = "string_or_number")]
    pub numero_voucher: String,
    pub comprador: String,
    pub fecha: String,
    pub metodo_pago: String,
    pub productos: Vec<LineItem>,
    pub subtotal: Decimal,
    pub subtotal_con_descuento: Decimal,
    pub descuento: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub es_usuario_registrado: bool,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// What the receipt page ended up showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoucherOutcome {
    Rendered(Box<VoucherData>),
    /// No receipt data was available.
    AccessDenied,
    /// Receipt data was present but unreadable.
    Failed,
}

/// The receipt page.
pub struct VoucherRenderer {
    dom: Arc<dyn Dom>,
    session: Arc<dyn Storage>,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for VoucherRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoucherRenderer")
            .field("voucher_key", &self.config.voucher_key)
            .finish_non_exhaustive()
    }
}

impl VoucherRenderer {
    #[must_use]
    pub fn new(dom: Arc<dyn Dom>, session: Arc<dyn Storage>, config: Arc<ClientConfig>) -> Self {
        Self {
            dom,
            session,
            config,
        }
    }

    /// Show the receipt, preferring `injected` over the session slot.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to render.
    #[instrument(skip_all, fields(injected = injected.is_some()))]
    pub fn init(&self, injected: Option<&Value>) -> Result<VoucherOutcome> {
        if let Some(value) = injected {
            return match VoucherData::deserialize(value) {
                Ok(data) => self.show(data),
                Err(e) => {
                    tracing::error!(error = %e, "Injected voucher data is invalid");
                    self.show_error(INJECTED_ERROR)?;
                    Ok(VoucherOutcome::Failed)
                }
            };
        }

        let raw = match self.session.get_item(&self.config.voucher_key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read voucher data");
                None
            }
        };
        let Some(raw) = raw else {
            self.show_access_denied()?;
            return Ok(VoucherOutcome::AccessDenied);
        };

        // Single use, even when unreadable
        if let Err(e) = self.session.remove_item(&self.config.voucher_key) {
            tracing::error!(error = %e, "Failed to remove voucher data");
        }

        match serde_json::from_str::<VoucherData>(&raw) {
            Ok(data) => self.show(data),
            Err(e) => {
                tracing::error!(error = %e, "Error parsing voucher data from session storage");
                self.show_error(SESSION_ERROR)?;
                Ok(VoucherOutcome::Failed)
            }
        }
    }

    fn show(&self, data: VoucherData) -> Result<VoucherOutcome> {
        self.render(&data)?;
        Ok(VoucherOutcome::Rendered(Box::new(data)))
    }

    /// Fill the receipt fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the product table fails to render.
    pub fn render(&self, data: &VoucherData) -> Result<()> {
        let dom = &self.dom;
        dom.set_text(ids::NUMBER, &format!("N° {}", data.numero_voucher));
        dom.set_text(ids::BUYER, &data.comprador);
        dom.set_text(
            ids::DATE,
            &format_date_str(&data.fecha).unwrap_or_else(|| data.fecha.clone()),
        );
        dom.set_text(ids::METHOD, PaymentMethod::label_for_code(&data.metodo_pago));
        dom.set_text(
            ids::CUSTOMER_TYPE,
            if data.es_usuario_registrado {
                REGISTERED_CUSTOMER
            } else {
                GUEST_CUSTOMER
            },
        );

        dom.set_text(ids::TOTAL_PAID, &format_currency(data.total));
        dom.set_text(ids::SUBTOTAL, &format_currency(data.subtotal));
        dom.set_text(ids::NET_SUBTOTAL, &format_currency(data.subtotal_con_descuento));
        dom.set_text(ids::TAX, &format_currency(data.iva));
        dom.set_text(ids::TOTAL_FINAL, &format_currency(data.total));

        if data.descuento > Decimal::ZERO && dom.exists(ids::DISCOUNT_ROW) {
            dom.set_style(ids::DISCOUNT_ROW, "display", "flex");
            dom.set_text(
                ids::DISCOUNT_AMOUNT,
                &format!("-{}", format_currency(data.descuento)),
            );
        }

        if dom.exists(ids::PRODUCTS) {
            let html = VoucherRowsTemplate::from(data.productos.as_slice()).render()?;
            dom.set_html(ids::PRODUCTS, &html);
        }
        Ok(())
    }

    fn show_access_denied(&self) -> Result<()> {
        tracing::warn!("No voucher data available");
        let html = AccessDeniedTemplate {
            home_url: HOME_URL.to_string(),
        }
        .render()?;
        self.dom.set_html(ids::CONTAINER, &html);
        Ok(())
    }

    fn show_error(&self, message: &str) -> Result<()> {
        let html = VoucherErrorTemplate {
            message: message.to_string(),
            home_url: HOME_URL.to_string(),
        }
        .render()?;
        self.dom.set_html(ids::CONTAINER, &html);
        Ok(())
    }

    /// Open the print dialog.
    pub fn print(&self) {
        self.dom.print();
    }

    /// Go to the storefront home page.
    pub fn home(&self) {
        self.dom.navigate(HOME_URL);
    }

    /// Route a click on the receipt page. Returns `true` if it was handled.
    pub fn handle_click(&self, target: &ClickTarget) -> bool {
        if target.within(ids::PRINT) {
            self.print();
            true
        } else if target.within(ids::HOME) {
            self.home();
            true
        } else {
            false
        }
    }
}
