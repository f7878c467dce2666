//! Checkout submissions against the mock payment endpoint.
//!
//! Run with: cargo test -p ferramas-integration-tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use ferramas_core::{PaymentMethod, Price, ProductId};
use ferramas_integration_tests::{MockPaymentServer, declined, unreachable_endpoint};
use ferramas_storefront::cart::CartStore;
use ferramas_storefront::checkout::{CheckoutController, CheckoutOptions, CheckoutState, ids};
use ferramas_storefront::dom::{Dom, Element, MemoryDom};
use ferramas_storefront::payment::HttpPaymentGateway;
use ferramas_storefront::storage::{MemoryStorage, Storage};
use ferramas_storefront::{ClientConfig, ClientError};
use rust_decimal::Decimal;

const CARD_LABEL: &str = "Pagar con tarjeta";

struct Page {
    dom: Arc<MemoryDom>,
    local: Arc<MemoryStorage>,
    session: Arc<MemoryStorage>,
    controller: CheckoutController<HttpPaymentGateway>,
}

/// Checkout page holding Martillo x2 and Clavos x3.
fn checkout_page(gateway: HttpPaymentGateway, config: ClientConfig, authenticated: bool) -> Page {
    let dom = Arc::new(
        MemoryDom::new()
            .with(ids::CART_ITEMS, Element::new("div"))
            .with(ids::TOTAL, Element::new("p"))
            .with(ids::GUEST_NAME, Element::new("input").value("Ana Pérez"))
            .with(ids::GUEST_EMAIL, Element::new("input").value("ana@example.com"))
            .with(ids::PAY_CARD, Element::new("button").text(CARD_LABEL))
            .with(
                ids::CONFIRM_TRANSFER,
                Element::new("button").text("Confirmar transferencia"),
            ),
    );
    dom.set_cookies("sessionid=xyz; csrftoken=tok-123");

    let local = Arc::new(MemoryStorage::new());
    let session = Arc::new(MemoryStorage::new());
    let store = CartStore::new(local.clone(), "cart");
    store.add_item(ProductId::new("p1"), "Martillo", Price::from(1000));
    store.add_item(ProductId::new("p1"), "Martillo", Price::from(1000));
    store.add_item(ProductId::new("p2"), "Clavos", Price::from(500));
    store.update_quantity(&ProductId::new("p2"), 3);

    let controller = CheckoutController::new(
        dom.clone(),
        store,
        session.clone(),
        gateway,
        Arc::new(config),
        CheckoutOptions {
            discount_percentage: Decimal::ZERO,
            is_authenticated: authenticated,
        },
    );
    controller.load().unwrap();

    Page {
        dom,
        local,
        session,
        controller,
    }
}

#[tokio::test]
async fn test_approved_payment_clears_cart_and_opens_receipt() {
    let server = MockPaymentServer::start().await.unwrap();
    let page = checkout_page(server.gateway(), server.config(), true);

    let url = page.controller.submit(PaymentMethod::Card).await.unwrap();

    assert_eq!(url, "/pagos/voucher/abc123/");
    assert_eq!(page.dom.location().as_deref(), Some("/pagos/voucher/abc123/"));
    assert!(page.local.get_item("cart").unwrap().is_none());
    assert!(page.dom.alerts().is_empty());
    assert_eq!(
        page.controller.state(),
        CheckoutState::NavigatingAway("/pagos/voucher/abc123/".to_string())
    );

    let stashed = page.session.get_item("voucherData").unwrap().unwrap();
    let stashed: serde_json::Value = serde_json::from_str(&stashed).unwrap();
    assert_eq!(stashed["numero_voucher"], "abc123");

    // Request shape
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let body = &requests[0].body;
    assert_eq!(body["metodo_pago"], "tarjeta");
    assert_eq!(body["productos"][0]["nombre"], "Martillo");
    assert_eq!(body["productos"][0]["cantidad"], 2);
    assert_eq!(body["productos"][1]["nombre"], "Clavos");
    assert_eq!(body["productos"][1]["cantidad"], 3);
    assert_eq!(body["productos"][1]["precio"].as_f64(), Some(500.0));
    assert!(body.get("datos_cliente").is_none());
}

#[tokio::test]
async fn test_csrf_token_is_sent_from_cookie() {
    let server = MockPaymentServer::start().await.unwrap();
    let page = checkout_page(server.gateway(), server.config(), true);

    page.controller.submit(PaymentMethod::Card).await.unwrap();

    let requests = server.requests();
    let headers = &requests[0].headers;
    assert_eq!(headers.get("x-csrftoken").unwrap(), "tok-123");
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
}

#[tokio::test]
async fn test_missing_csrf_cookie_omits_header() {
    let server = MockPaymentServer::start().await.unwrap();
    let page = checkout_page(server.gateway(), server.config(), true);
    page.dom.set_cookies("sessionid=xyz");

    page.controller.submit(PaymentMethod::Card).await.unwrap();

    assert!(server.requests()[0].headers.get("x-csrftoken").is_none());
}

#[tokio::test]
async fn test_guest_checkout_sends_buyer_details() {
    let server = MockPaymentServer::start().await.unwrap();
    let page = checkout_page(server.gateway(), server.config(), false);

    page.controller
        .submit(PaymentMethod::Transfer)
        .await
        .unwrap();

    let body = &server.requests()[0].body;
    assert_eq!(body["metodo_pago"], "transferencia");
    assert_eq!(body["datos_cliente"]["nombre"], "Ana Pérez");
    assert_eq!(body["datos_cliente"]["email"], "ana@example.com");
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let server = MockPaymentServer::start().await.unwrap();
    server.respond_with(StatusCode::OK, declined("tarjeta rechazada"));
    let page = checkout_page(server.gateway(), server.config(), true);

    let err = page.controller.submit(PaymentMethod::Card).await.unwrap_err();

    assert!(matches!(err, ClientError::Payment(_)));
    assert_eq!(
        page.dom.alerts(),
        vec!["Error al procesar el pago: tarjeta rechazada".to_string()]
    );
    assert!(page.dom.location().is_none());
    assert!(page.session.get_item("voucherData").unwrap().is_none());

    // Cart untouched, button usable again
    let stats = CartStore::new(page.local.clone(), "cart").stats();
    assert_eq!(stats.item_count, 5);
    assert_eq!(stats.total, Decimal::from(3500));
    assert_eq!(page.dom.text(ids::PAY_CARD).as_deref(), Some(CARD_LABEL));
    assert!(!page.dom.is_disabled(ids::PAY_CARD));
    assert!(matches!(page.controller.state(), CheckoutState::Failed(_)));
}

#[tokio::test]
async fn test_error_status_body_is_still_read() {
    let server = MockPaymentServer::start().await.unwrap();
    server.respond_with(StatusCode::BAD_REQUEST, declined("Stock insuficiente"));
    let page = checkout_page(server.gateway(), server.config(), true);

    assert!(page.controller.submit(PaymentMethod::Card).await.is_err());
    assert_eq!(
        page.dom.alerts(),
        vec!["Error al procesar el pago: Stock insuficiente".to_string()]
    );
}

#[tokio::test]
async fn test_retry_after_decline_succeeds() {
    let server = MockPaymentServer::start().await.unwrap();
    server.respond_with(StatusCode::OK, declined("tarjeta rechazada"));
    let page = checkout_page(server.gateway(), server.config(), true);
    assert!(page.controller.submit(PaymentMethod::Card).await.is_err());

    server.respond_with(StatusCode::OK, ferramas_integration_tests::approved("def456"));
    let url = page.controller.submit(PaymentMethod::Card).await.unwrap();

    assert_eq!(url, "/pagos/voucher/def456/");
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_unreachable_endpoint_shows_generic_error() {
    let endpoint = unreachable_endpoint().await.unwrap();
    let gateway = HttpPaymentGateway::new(endpoint).unwrap();
    let page = checkout_page(gateway, ClientConfig::default(), true);

    let err = page.controller.submit(PaymentMethod::Card).await.unwrap_err();

    match err {
        ClientError::Payment(payment) => assert!(payment.is_transport()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        page.dom.alerts(),
        vec!["Error al procesar el pago. Intente nuevamente.".to_string()]
    );
    assert_eq!(CartStore::new(page.local.clone(), "cart").stats().item_count, 5);
    assert!(!page.dom.is_disabled(ids::PAY_CARD));
}

#[tokio::test]
async fn test_invalid_submissions_never_reach_the_endpoint() {
    let server = MockPaymentServer::start().await.unwrap();

    // Guest without a name
    let page = checkout_page(server.gateway(), server.config(), false);
    page.dom.set_value(ids::GUEST_NAME, "   ");
    assert!(matches!(
        page.controller.submit(PaymentMethod::Card).await,
        Err(ClientError::Validation(_))
    ));
    assert_eq!(page.dom.focused().as_deref(), Some(ids::GUEST_NAME));

    // Empty cart
    let page = checkout_page(server.gateway(), server.config(), true);
    CartStore::new(page.local.clone(), "cart").clear();
    assert!(matches!(
        page.controller.submit(PaymentMethod::Card).await,
        Err(ClientError::Validation(_))
    ));
    assert_eq!(page.dom.alerts().len(), 1);

    assert!(server.requests().is_empty());
}
