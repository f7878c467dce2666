//! A buyer's trip through the storefront pages, from catalog to receipt.
//!
//! Run with: cargo test -p ferramas-integration-tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use ferramas_integration_tests::{MockPaymentServer, declined};
use ferramas_storefront::app::PageController;
use ferramas_storefront::cart::ids as cart_ids;
use ferramas_storefront::checkout::{CheckoutOptions, ids as checkout_ids};
use ferramas_storefront::dom::{Dom, Element, MemoryDom};
use ferramas_storefront::payment::HttpPaymentGateway;
use ferramas_storefront::storage::{MemoryStorage, Storage};
use ferramas_storefront::voucher::{VoucherOutcome, ids as voucher_ids};
use ferramas_storefront::{PageContext, Storefront};
use rust_decimal::Decimal;

/// One browser: storage outlives the pages it visits.
struct Browser {
    server: MockPaymentServer,
    local: Arc<MemoryStorage>,
    session: Arc<MemoryStorage>,
}

impl Browser {
    async fn new() -> Self {
        Self {
            server: MockPaymentServer::start().await.unwrap(),
            local: Arc::new(MemoryStorage::new()),
            session: Arc::new(MemoryStorage::new()),
        }
    }

    fn open(&self, dom: &Arc<MemoryDom>, context: PageContext) -> Storefront<HttpPaymentGateway> {
        Storefront::start(
            dom.clone(),
            self.local.clone(),
            self.session.clone(),
            self.server.gateway(),
            Arc::new(self.server.config()),
            context,
        )
        .unwrap()
    }
}

fn add_button(id: &str, name: &str, price: &str) -> Element {
    Element::new("button")
        .class("add-to-cart-btn")
        .attr("data-id", id)
        .attr("data-nombre", name)
        .attr("data-precio", price)
}

fn catalog_page() -> Arc<MemoryDom> {
    Arc::new(
        MemoryDom::new()
            .with(cart_ids::CART_BTN, Element::new("button"))
            .with(
                cart_ids::CART_COUNT,
                Element::new("span").child_of(cart_ids::CART_BTN),
            )
            .with(cart_ids::CART_SUMMARY, Element::new("div").class("hidden"))
            .with(
                cart_ids::CART_ITEMS,
                Element::new("ul").child_of(cart_ids::CART_SUMMARY),
            )
            .with(
                cart_ids::CART_TOTAL,
                Element::new("span").child_of(cart_ids::CART_SUMMARY),
            )
            .with(
                cart_ids::BTN_CHECKOUT,
                Element::new("a").child_of(cart_ids::CART_SUMMARY),
            )
            .with("add-martillo", add_button("p1", "Martillo", "1000"))
            .with("add-clavos", add_button("p2", "Clavos", "500")),
    )
}

fn checkout_page() -> Arc<MemoryDom> {
    let dom = Arc::new(
        MemoryDom::new()
            .with(checkout_ids::CART_ITEMS, Element::new("div"))
            .with(checkout_ids::TOTAL, Element::new("p"))
            .with(
                checkout_ids::PAY_CARD,
                Element::new("button").text("Pagar con tarjeta"),
            ),
    );
    dom.set_cookies("csrftoken=tok-123");
    dom
}

fn voucher_page() -> Arc<MemoryDom> {
    let ids = [
        voucher_ids::NUMBER,
        voucher_ids::BUYER,
        voucher_ids::METHOD,
        voucher_ids::CUSTOMER_TYPE,
        voucher_ids::TOTAL_PAID,
        voucher_ids::TAX,
        voucher_ids::PRODUCTS,
    ];
    Arc::new(ids.iter().fold(
        MemoryDom::new().with(voucher_ids::CONTAINER, Element::new("div")),
        |dom, id| dom.with(id, Element::new("span").child_of(voucher_ids::CONTAINER)),
    ))
}

async fn fill_cart(browser: &Browser) {
    let dom = catalog_page();
    let mut page = browser.open(&dom, PageContext::Catalog);

    for id in [
        "add-martillo",
        "add-martillo",
        "add-clavos",
        "add-clavos",
        "add-clavos",
    ] {
        assert!(page.click(&dom.click_target(id).unwrap()).await);
    }

    let stats = page.store().stats();
    assert_eq!(stats.item_count, 5);
    assert_eq!(stats.total, Decimal::from(3500));
    assert_eq!(dom.text(cart_ids::CART_COUNT).as_deref(), Some("5"));
    assert_eq!(dom.text(cart_ids::CART_TOTAL).as_deref(), Some("3500.00"));

    assert!(page.click(&dom.click_target(cart_ids::BTN_CHECKOUT).unwrap()).await);
    assert_eq!(dom.location().as_deref(), Some("/checkout/"));
}

#[tokio::test]
async fn test_catalog_to_receipt() {
    let browser = Browser::new().await;
    fill_cart(&browser).await;

    // Checkout
    let dom = checkout_page();
    let mut page = browser.open(
        &dom,
        PageContext::Checkout(CheckoutOptions {
            discount_percentage: Decimal::ZERO,
            is_authenticated: true,
        }),
    );
    let summary = dom.html(checkout_ids::CART_ITEMS).unwrap();
    assert!(summary.contains("Martillo"));
    assert!(summary.contains("Clavos"));

    assert!(page.click(&dom.click_target(checkout_ids::PAY_CARD).unwrap()).await);
    assert_eq!(dom.location().as_deref(), Some("/pagos/voucher/abc123/"));
    assert!(browser.local.get_item("cart").unwrap().is_none());
    assert_eq!(
        browser.server.requests()[0]
            .headers
            .get("x-csrftoken")
            .unwrap(),
        "tok-123"
    );

    // Receipt
    let dom = voucher_page();
    let page = browser.open(&dom, PageContext::Voucher { injected: None });
    assert!(matches!(
        page.page(),
        PageController::Voucher {
            outcome: VoucherOutcome::Rendered(_),
            ..
        }
    ));
    assert_eq!(dom.text(voucher_ids::NUMBER).as_deref(), Some("N° abc123"));
    assert_eq!(dom.text(voucher_ids::BUYER).as_deref(), Some("Ana Pérez"));
    assert_eq!(
        dom.text(voucher_ids::METHOD).as_deref(),
        Some("Tarjeta de Crédito/Débito")
    );
    assert_eq!(dom.text(voucher_ids::TOTAL_PAID).as_deref(), Some("$3.500"));
    assert_eq!(dom.text(voucher_ids::TAX).as_deref(), Some("$558,82"));
    assert!(dom.html(voucher_ids::PRODUCTS).unwrap().contains("Martillo"));

    // Reloading the receipt page finds nothing
    let dom = voucher_page();
    let page = browser.open(&dom, PageContext::Voucher { injected: None });
    assert!(matches!(
        page.page(),
        PageController::Voucher {
            outcome: VoucherOutcome::AccessDenied,
            ..
        }
    ));
    assert!(dom.html(voucher_ids::CONTAINER).unwrap().contains("Acceso Denegado"));
}

#[tokio::test]
async fn test_declined_checkout_keeps_cart_for_next_visit() {
    let browser = Browser::new().await;
    browser
        .server
        .respond_with(StatusCode::PAYMENT_REQUIRED, declined("tarjeta rechazada"));
    fill_cart(&browser).await;

    let dom = checkout_page();
    let mut page = browser.open(
        &dom,
        PageContext::Checkout(CheckoutOptions {
            discount_percentage: Decimal::TEN,
            is_authenticated: true,
        }),
    );
    assert!(page.click(&dom.click_target(checkout_ids::PAY_CARD).unwrap()).await);
    assert_eq!(
        dom.alerts(),
        vec!["Error al procesar el pago: tarjeta rechazada".to_string()]
    );
    assert!(dom.location().is_none());
    drop(page);

    // Back on the catalog the cart is still there
    let dom = catalog_page();
    let page = browser.open(&dom, PageContext::Catalog);
    assert_eq!(page.store().stats().item_count, 5);
    assert_eq!(dom.text(cart_ids::CART_COUNT).as_deref(), Some("5"));
}
