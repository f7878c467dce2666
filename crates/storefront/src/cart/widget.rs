//! Floating cart panel.
//!
//! The panel is a button with an item counter plus a summary popover that
//! lists the cart. All clicks on the page are routed through
//! [`CartWidget::handle_click`]; add-to-cart controls are recognised by their
//! markup when clicked, so products rendered after start-up need no wiring.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use askama::Template;
use ferramas_core::{Price, ProductId};
use tokio::sync::broadcast;
use tracing::instrument;

use super::store::{Cart, CartChange, CartStats, CartStore};
use crate::config::ClientConfig;
use crate::dom::{ClickTarget, Dom, Element, TargetNode};
use crate::error::{Result, add_breadcrumb};
use crate::format::{format_fixed, generate_id};
use crate::schedule::{Scheduler, TimerHandle};
use crate::views::CartItemsTemplate;

/// Element ids the widget binds to.
pub mod ids {
    pub const CART_BTN: &str = "cart-btn";
    pub const CART_COUNT: &str = "cart-count";
    pub const CART_SUMMARY: &str = "cart-summary";
    pub const CART_ITEMS: &str = "cart-items";
    pub const CART_TOTAL: &str = "cart-total";
    pub const BTN_CLOSE: &str = "btn-close-cart";
    pub const BTN_CLEAR: &str = "btn-clear-cart";
    pub const BTN_CHECKOUT: &str = "btn-checkout";

    pub(super) const REQUIRED: [&str; 5] =
        [CART_BTN, CART_COUNT, CART_SUMMARY, CART_ITEMS, CART_TOTAL];
    pub(super) const BUTTONS: [&str; 3] = [BTN_CLOSE, BTN_CLEAR, BTN_CHECKOUT];
}

const CHECKOUT_URL: &str = "/checkout/";
const OPEN_DELAY: Duration = Duration::from_millis(10);
const PULSE_DURATION: Duration = Duration::from_secs(1);
const TOAST_ENTER_DELAY: Duration = Duration::from_millis(100);
const TOAST_EXIT_DURATION: Duration = Duration::from_millis(300);

const HIDDEN: &str = "hidden";
const CLOSED_CLASSES: [&str; 2] = ["opacity-0", "scale-95"];
const OPEN_CLASSES: [&str; 2] = ["opacity-100", "scale-100"];
const PULSE: &str = "animate-pulse";
const TOAST_OFFSCREEN: &str = "translate-x-full";

const ADD_TO_CART_ATTR: &str = "data-add-to-cart";
const ADD_TO_CART_CLASS: &str = "add-to-cart-btn";
const REMOVE_ATTR: &str = "data-cart-remove";

/// Whether the summary panel is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelState {
    #[default]
    Closed,
    Open,
}

/// Color of a feedback toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackKind {
    #[default]
    Success,
    Error,
    Info,
}

impl FeedbackKind {
    const fn color_class(self) -> &'static str {
        match self {
            Self::Success => "bg-green-500",
            Self::Error => "bg-red-500",
            Self::Info => "bg-blue-500",
        }
    }
}

/// Notifications emitted by the widget itself. Cart mutations are reported
/// through [`CartStore::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Opened,
    Closed,
    /// Checkout was requested with a non-empty cart.
    CheckoutRequested { cart: Cart, stats: CartStats },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The floating cart panel.
///
/// Dropping the widget cancels its pending animations and toasts.
pub struct CartWidget {
    dom: Arc<dyn Dom>,
    store: CartStore,
    config: Arc<ClientConfig>,
    state: Mutex<PanelState>,
    animation: Mutex<Option<TimerHandle>>,
    scheduler: Scheduler,
    events: broadcast::Sender<WidgetEvent>,
}

impl std::fmt::Debug for CartWidget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartWidget")
            .field("store", &self.store)
            .field("state", &*lock(&self.state))
            .finish_non_exhaustive()
    }
}

impl CartWidget {
    /// Bind to the page and render the current cart.
    ///
    /// Missing elements are logged; the features that depend on them are
    /// unavailable but everything else keeps working.
    pub fn bind(dom: Arc<dyn Dom>, store: CartStore, config: Arc<ClientConfig>) -> Self {
        let missing = dom.missing(&ids::REQUIRED);
        if !missing.is_empty() {
            tracing::warn!(?missing, "Missing required cart elements");
        }
        let missing = dom.missing(&ids::BUTTONS);
        if !missing.is_empty() {
            tracing::warn!(?missing, "Missing cart button elements");
        }

        let (events, _) = broadcast::channel(16);
        let widget = Self {
            dom,
            store,
            config,
            state: Mutex::new(PanelState::Closed),
            animation: Mutex::new(None),
            scheduler: Scheduler::new(),
            events,
        };
        widget.refresh();
        widget
    }

    /// The store this widget writes through.
    #[must_use]
    pub const fn store(&self) -> &CartStore {
        &self.store
    }

    /// Current panel state.
    #[must_use]
    pub fn state(&self) -> PanelState {
        *lock(&self.state)
    }

    /// Whether the summary panel is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == PanelState::Open
    }

    /// Subscribe to widget notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Panel
    // =========================================================================

    /// Show the summary panel. No-op if it is already open.
    pub fn open(&self) {
        if !self.dom.exists(ids::CART_SUMMARY) || !self.transition(PanelState::Open) {
            return;
        }

        self.dom.remove_class(ids::CART_SUMMARY, HIDDEN);
        let dom = Arc::clone(&self.dom);
        self.animate(OPEN_DELAY, move || {
            dom.remove_classes(ids::CART_SUMMARY, &CLOSED_CLASSES);
            dom.add_classes(ids::CART_SUMMARY, &OPEN_CLASSES);
        });

        add_breadcrumb("cart", "Cart opened", None);
        self.emit(WidgetEvent::Opened);
    }

    /// Hide the summary panel. No-op if it is already closed.
    pub fn close(&self) {
        if !self.dom.exists(ids::CART_SUMMARY) || !self.transition(PanelState::Closed) {
            return;
        }

        self.dom.remove_classes(ids::CART_SUMMARY, &OPEN_CLASSES);
        self.dom.add_classes(ids::CART_SUMMARY, &CLOSED_CLASSES);
        let dom = Arc::clone(&self.dom);
        self.animate(self.config.animation_duration, move || {
            dom.add_class(ids::CART_SUMMARY, HIDDEN);
        });

        add_breadcrumb("cart", "Cart closed", None);
        self.emit(WidgetEvent::Closed);
    }

    /// Open a closed panel or close an open one.
    pub fn toggle(&self) {
        match self.state() {
            PanelState::Open => self.close(),
            PanelState::Closed => self.open(),
        }
    }

    /// Move to `target`; `false` if already there.
    fn transition(&self, target: PanelState) -> bool {
        let mut state = lock(&self.state);
        if *state == target {
            return false;
        }
        *state = target;
        true
    }

    /// Schedule the final step of a transition, replacing any step still pending.
    fn animate<F>(&self, delay: Duration, step: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = self.scheduler.schedule(delay, step);
        if let Some(previous) = lock(&self.animation).replace(handle) {
            previous.cancel();
        }
    }

    // =========================================================================
    // Clicks
    // =========================================================================

    /// Route a page click. Returns `true` if the click belonged to the cart.
    #[instrument(skip_all)]
    pub fn handle_click(&self, target: &ClickTarget) -> bool {
        if target.within(ids::CART_BTN) {
            self.toggle();
            return true;
        }
        if target.within(ids::BTN_CLOSE) {
            self.close();
            return true;
        }
        if target.within(ids::BTN_CLEAR) {
            self.clear();
            return true;
        }
        if target.within(ids::BTN_CHECKOUT) {
            self.dom.navigate(CHECKOUT_URL);
            return true;
        }
        if let Some(id) = target
            .closest(|node| node.attr(REMOVE_ATTR).is_some())
            .and_then(|node| node.attr(REMOVE_ATTR))
        {
            self.remove_item(&ProductId::new(id));
            return true;
        }

        let mut handled = false;
        if let Some(button) =
            target.closest(|node| node.attr(ADD_TO_CART_ATTR).is_some() || node.has_class(ADD_TO_CART_CLASS))
        {
            handled = true;
            if !button.disabled {
                self.add_from_marker(button);
            }
        }

        if self.is_open() && !target.within(ids::CART_SUMMARY) {
            self.close();
            handled = true;
        }
        handled
    }

    fn add_from_marker(&self, button: &TargetNode) {
        let (Some(id), Some(name), Some(raw_price)) = (
            button.data("id"),
            button.data("nombre"),
            button.data("precio"),
        ) else {
            tracing::warn!(element = ?button.id, "Add-to-cart control is missing product data");
            return;
        };

        match raw_price.parse::<Price>() {
            Ok(price) => {
                self.add_item(ProductId::new(id), name, price);
            }
            Err(e) => {
                tracing::warn!(product_id = id, price = raw_price, error = %e, "Invalid product price");
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add one unit of a product and confirm it with a toast.
    pub fn add_item(&self, id: ProductId, name: &str, unit_price: Price) -> CartChange {
        let product_id = id.to_string();
        let change = self.store.add_item(id, name, unit_price);
        add_breadcrumb("cart", "Item added", Some(&[("product_id", product_id.as_str())]));

        self.refresh();
        self.show_feedback(&format!("{name} agregado al carrito"), FeedbackKind::Success);
        change
    }

    /// Remove a product. No-op if it is not in the cart.
    pub fn remove_item(&self, id: &ProductId) -> Option<CartChange> {
        let change = self.store.remove_item(id)?;
        add_breadcrumb("cart", "Item removed", Some(&[("product_id", id.as_str())]));

        self.refresh();
        if let CartChange::ItemRemoved { entry, .. } = &change {
            self.show_feedback(
                &format!("{} eliminado del carrito", entry.name),
                FeedbackKind::Success,
            );
        }
        Some(change)
    }

    /// Set a product's quantity; zero or less removes it.
    pub fn update_quantity(&self, id: &ProductId, quantity: i64) -> Option<CartChange> {
        if quantity <= 0 {
            return self.remove_item(id);
        }

        let change = self.store.update_quantity(id, quantity)?;
        self.refresh();
        Some(change)
    }

    /// Empty the cart after the user confirms. Returns whether it was emptied.
    pub fn clear(&self) -> bool {
        if !self.dom.confirm(&self.config.confirm_clear_message) {
            return false;
        }

        self.store.clear();
        add_breadcrumb("cart", "Cart cleared", None);

        self.refresh();
        self.show_feedback("Carrito vaciado", FeedbackKind::Success);
        true
    }

    /// Request checkout. An empty cart only shows an error toast.
    pub fn checkout(&self) -> Option<Cart> {
        let cart = self.store.load();
        let stats = cart.stats();
        if stats.is_empty {
            self.show_feedback("El carrito está vacío", FeedbackKind::Error);
            return None;
        }

        tracing::info!(item_count = stats.item_count, "Checkout requested");
        self.emit(WidgetEvent::CheckoutRequested {
            cart: cart.clone(),
            stats,
        });
        Some(cart)
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Redraw the counter, the total and the item list from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the item list template fails to render.
    pub fn render(&self) -> Result<()> {
        let cart = self.store.load();
        let stats = cart.stats();

        if self.dom.exists(ids::CART_COUNT) {
            self.dom
                .set_text(ids::CART_COUNT, &stats.item_count.to_string());
            if !stats.is_empty {
                self.pulse_counter();
            }
        }

        if self.dom.exists(ids::CART_TOTAL) {
            self.dom
                .set_text(ids::CART_TOTAL, &format_fixed(stats.total, 2));
        }

        if self.dom.exists(ids::CART_ITEMS) {
            let html = CartItemsTemplate::new(
                &cart,
                &self.config.currency,
                &self.config.empty_cart_message,
            )
            .render()?;
            self.dom.set_html(ids::CART_ITEMS, &html);
        }
        Ok(())
    }

    fn refresh(&self) {
        if let Err(e) = self.render() {
            e.report();
        }
    }

    fn pulse_counter(&self) {
        self.dom.add_class(ids::CART_COUNT, PULSE);
        let dom = Arc::clone(&self.dom);
        self.scheduler.schedule(PULSE_DURATION, move || {
            dom.remove_class(ids::CART_COUNT, PULSE);
        });
    }

    /// Show a toast; it slides in, stays for the feedback duration and is
    /// then removed from the page. Returns the toast's element id.
    pub fn show_feedback(&self, message: &str, kind: FeedbackKind) -> String {
        let id = generate_id();
        let toast = [
            "fixed",
            "top-20",
            "right-4",
            kind.color_class(),
            "text-white",
            "px-4",
            "py-2",
            "rounded-md",
            "shadow-lg",
            "z-50",
            "transform",
            "transition-all",
            "duration-300",
            TOAST_OFFSCREEN,
        ]
        .into_iter()
        .fold(Element::new("div"), Element::class)
        .text(message);
        self.dom.append(&id, toast);

        let dom = Arc::clone(&self.dom);
        let toast_id = id.clone();
        self.scheduler.schedule(TOAST_ENTER_DELAY, move || {
            dom.remove_class(&toast_id, TOAST_OFFSCREEN);
        });

        let dom = Arc::clone(&self.dom);
        let toast_id = id.clone();
        self.scheduler
            .schedule(self.config.feedback_duration, move || {
                dom.add_class(&toast_id, TOAST_OFFSCREEN);
            });

        let dom = Arc::clone(&self.dom);
        let toast_id = id.clone();
        self.scheduler.schedule(
            self.config.feedback_duration + TOAST_EXIT_DURATION,
            move || dom.remove(&toast_id),
        );

        id
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use super::*;
    use crate::dom::MemoryDom;
    use crate::storage::MemoryStorage;

    fn page() -> Arc<MemoryDom> {
        Arc::new(
            MemoryDom::new()
                .with(ids::CART_BTN, Element::new("button"))
                .with(ids::CART_COUNT, Element::new("span").child_of(ids::CART_BTN))
                .with(
                    ids::CART_SUMMARY,
                    Element::new("div")
                        .class("hidden")
                        .class("opacity-0")
                        .class("scale-95"),
                )
                .with(ids::CART_ITEMS, Element::new("ul").child_of(ids::CART_SUMMARY))
                .with(ids::CART_TOTAL, Element::new("span").child_of(ids::CART_SUMMARY))
                .with(ids::BTN_CLOSE, Element::new("button").child_of(ids::CART_SUMMARY))
                .with(ids::BTN_CLEAR, Element::new("button").child_of(ids::CART_SUMMARY))
                .with(ids::BTN_CHECKOUT, Element::new("a").child_of(ids::CART_SUMMARY))
                .with("main", Element::new("main")),
        )
    }

    fn widget(dom: &Arc<MemoryDom>) -> CartWidget {
        let store = CartStore::new(Arc::new(MemoryStorage::new()), "cart");
        CartWidget::bind(dom.clone(), store, Arc::new(ClientConfig::default()))
    }

    fn product_button(id: &str, name: &str, price: &str) -> Element {
        Element::new("button")
            .class("add-to-cart-btn")
            .attr("data-id", id)
            .attr("data-nombre", name)
            .attr("data-precio", price)
            .child_of("main")
    }

    fn toasts(dom: &MemoryDom) -> Vec<Element> {
        dom.children(None)
            .into_iter()
            .filter(|id| id.starts_with("ferramas_"))
            .filter_map(|id| dom.element(&id))
            .collect()
    }

    fn click(widget: &CartWidget, dom: &MemoryDom, id: &str) -> bool {
        widget.handle_click(&dom.click_target(id).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_renders_empty_cart() {
        let dom = page();
        let _widget = widget(&dom);

        assert_eq!(dom.text(ids::CART_COUNT).as_deref(), Some("0"));
        assert_eq!(dom.text(ids::CART_TOTAL).as_deref(), Some("0.00"));
        assert_eq!(dom.text(ids::CART_ITEMS).as_deref(), Some("Carrito vacío"));
        assert!(!dom.has_class(ids::CART_COUNT, "animate-pulse"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_with_missing_elements_still_works() {
        let dom = Arc::new(MemoryDom::new().with("main", Element::new("main")));
        dom.append("add-1", product_button("p1", "Martillo", "1000"));
        let widget = widget(&dom);

        assert!(click(&widget, &dom, "add-1"));
        assert_eq!(widget.store().stats().item_count, 1);

        // No panel to open
        widget.open();
        assert!(!widget.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_cart_click_updates_display() {
        let dom = page();
        let widget = widget(&dom);
        dom.append("add-1", product_button("p1", "Martillo", "1000"));

        assert!(click(&widget, &dom, "add-1"));
        assert!(click(&widget, &dom, "add-1"));

        assert_eq!(dom.text(ids::CART_COUNT).as_deref(), Some("2"));
        assert_eq!(dom.text(ids::CART_TOTAL).as_deref(), Some("2000.00"));
        assert!(dom.has_class(ids::CART_COUNT, "animate-pulse"));
        let items = dom.html(ids::CART_ITEMS).unwrap();
        assert!(items.contains("Martillo"));
        assert!(items.contains("$1000 x 2"));

        let messages: Vec<_> = toasts(&dom).into_iter().map(|t| t.text).collect();
        assert_eq!(messages, vec!["Martillo agregado al carrito"; 2]);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!dom.has_class(ids::CART_COUNT, "animate-pulse"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_to_cart_by_data_attribute_and_nested_target() {
        let dom = page();
        let widget = widget(&dom);
        dom.append(
            "card-btn",
            Element::new("button")
                .attr("data-add-to-cart", "")
                .attr("data-id", "p9")
                .attr("data-nombre", "Taladro")
                .attr("data-precio", "45990")
                .child_of("main"),
        );
        dom.append("card-btn-icon", Element::new("svg").child_of("card-btn"));

        assert!(click(&widget, &dom, "card-btn-icon"));
        assert_eq!(dom.text(ids::CART_TOTAL).as_deref(), Some("45990.00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_or_invalid_add_to_cart_is_ignored() {
        let dom = page();
        let widget = widget(&dom);
        dom.append("sold-out", product_button("p1", "Martillo", "1000").disabled());
        dom.append("bad-price", product_button("p2", "Clavos", "gratis"));

        click(&widget, &dom, "sold-out");
        click(&widget, &dom, "bad-price");

        assert!(widget.store().load().is_empty());
        assert!(toasts(&dom).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_and_close_animation() {
        let dom = page();
        let widget = widget(&dom);
        let mut events = widget.subscribe();

        assert!(click(&widget, &dom, ids::CART_BTN));
        assert!(widget.is_open());
        assert!(!dom.has_class(ids::CART_SUMMARY, "hidden"));
        assert!(dom.has_class(ids::CART_SUMMARY, "opacity-0"));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(dom.has_class(ids::CART_SUMMARY, "opacity-100"));
        assert!(dom.has_class(ids::CART_SUMMARY, "scale-100"));
        assert!(!dom.has_class(ids::CART_SUMMARY, "scale-95"));

        assert!(click(&widget, &dom, ids::BTN_CLOSE));
        assert!(!widget.is_open());
        assert!(dom.has_class(ids::CART_SUMMARY, "opacity-0"));
        assert!(!dom.has_class(ids::CART_SUMMARY, "hidden"));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(dom.has_class(ids::CART_SUMMARY, "hidden"));

        assert_eq!(events.recv().await.unwrap(), WidgetEvent::Opened);
        assert_eq!(events.recv().await.unwrap(), WidgetEvent::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transitions_are_guarded() {
        let dom = page();
        let widget = widget(&dom);
        let mut events = widget.subscribe();

        widget.close();
        widget.open();
        widget.open();
        widget.toggle();
        widget.toggle();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![WidgetEvent::Opened, WidgetEvent::Closed, WidgetEvent::Opened]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_cancels_pending_hide() {
        let dom = page();
        let widget = widget(&dom);

        widget.open();
        widget.close();
        tokio::time::sleep(Duration::from_millis(50)).await;
        widget.open();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(widget.is_open());
        assert!(!dom.has_class(ids::CART_SUMMARY, "hidden"));
        assert!(dom.has_class(ids::CART_SUMMARY, "opacity-100"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outside_click_closes_panel() {
        let dom = page();
        let widget = widget(&dom);

        widget.open();
        // Inside the panel: stays open
        assert!(!click(&widget, &dom, ids::CART_TOTAL));
        assert!(widget.is_open());

        assert!(click(&widget, &dom, "main"));
        assert!(!widget.is_open());

        // Closed panel ignores outside clicks
        assert!(!click(&widget, &dom, "main"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_control_in_rendered_list() {
        let dom = page();
        let widget = widget(&dom);
        widget.add_item(ProductId::new("p1"), "Martillo", Price::from(1000));
        widget.add_item(ProductId::new("p2"), "Clavos", Price::from(500));
        widget.open();

        let target = ClickTarget {
            path: vec![
                TargetNode {
                    attributes: BTreeMap::from([(
                        "data-cart-remove".to_string(),
                        "p1".to_string(),
                    )]),
                    ..TargetNode::default()
                },
                TargetNode {
                    id: Some(ids::CART_ITEMS.to_string()),
                    ..TargetNode::default()
                },
                TargetNode {
                    id: Some(ids::CART_SUMMARY.to_string()),
                    ..TargetNode::default()
                },
            ],
        };
        assert!(widget.handle_click(&target));

        assert!(widget.is_open());
        assert_eq!(dom.text(ids::CART_COUNT).as_deref(), Some("1"));
        assert!(!dom.html(ids::CART_ITEMS).unwrap().contains("Martillo"));
        assert!(
            toasts(&dom)
                .iter()
                .any(|t| t.text == "Martillo eliminado del carrito")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_quantity_redraws() {
        let dom = page();
        let widget = widget(&dom);
        let id = ProductId::new("p1");
        widget.add_item(id.clone(), "Martillo", Price::from(1000));

        widget.update_quantity(&id, 5);
        assert_eq!(dom.text(ids::CART_COUNT).as_deref(), Some("5"));
        assert_eq!(dom.text(ids::CART_TOTAL).as_deref(), Some("5000.00"));

        assert!(matches!(
            widget.update_quantity(&id, 0),
            Some(CartChange::ItemRemoved { .. })
        ));
        assert_eq!(dom.text(ids::CART_ITEMS).as_deref(), Some("Carrito vacío"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_requires_confirmation() {
        let dom = page();
        let widget = widget(&dom);
        widget.add_item(ProductId::new("p1"), "Martillo", Price::from(1000));

        dom.set_confirm_answer(false);
        assert!(click(&widget, &dom, ids::BTN_CLEAR));
        assert_eq!(widget.store().stats().item_count, 1);
        assert_eq!(
            dom.confirm_prompts(),
            vec!["¿Estás seguro de que quieres vaciar el carrito?"]
        );

        dom.set_confirm_answer(true);
        assert!(widget.clear());
        assert!(widget.store().stats().is_empty);
        assert_eq!(dom.text(ids::CART_COUNT).as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_button_navigates() {
        let dom = page();
        let widget = widget(&dom);

        assert!(click(&widget, &dom, ids::BTN_CHECKOUT));
        assert_eq!(dom.location().as_deref(), Some("/checkout/"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_request() {
        let dom = page();
        let widget = widget(&dom);
        let mut events = widget.subscribe();

        assert!(widget.checkout().is_none());
        let toast = toasts(&dom).pop().unwrap();
        assert_eq!(toast.text, "El carrito está vacío");
        assert!(toast.has_class("bg-red-500"));

        widget.add_item(ProductId::new("p1"), "Martillo", Price::from(1000));
        let cart = widget.checkout().unwrap();
        assert_eq!(cart.len(), 1);
        assert!(matches!(
            events.recv().await.unwrap(),
            WidgetEvent::CheckoutRequested { stats, .. } if stats.total == Decimal::from(1000)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_lifecycle() {
        let dom = page();
        let widget = widget(&dom);

        let id = widget.show_feedback("Hola", FeedbackKind::Info);
        assert!(dom.has_class(&id, "translate-x-full"));
        assert!(dom.has_class(&id, "bg-blue-500"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!dom.has_class(&id, "translate-x-full"));

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(dom.has_class(&id, "translate-x-full"));
        assert!(dom.exists(&id));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!dom.exists(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timers() {
        let dom = page();
        let widget = widget(&dom);
        widget.open();
        tokio::time::sleep(Duration::from_millis(20)).await;
        widget.close();
        let toast = widget.show_feedback("Hola", FeedbackKind::Success);
        drop(widget);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!dom.has_class(ids::CART_SUMMARY, "hidden"));
        assert!(dom.exists(&toast));
    }
}
