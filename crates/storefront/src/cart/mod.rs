//! Shopping cart.
//!
//! [`CartStore`] owns the persisted cart slot; [`CartWidget`] is the floating
//! cart panel present on every storefront page.

mod store;
mod widget;

pub use store::{Cart, CartChange, CartEntry, CartStats, CartStore};
pub use widget::{CartWidget, FeedbackKind, PanelState, WidgetEvent, ids};
