//! Document access.
//!
//! Components never hold element references; they address elements by id
//! through the [`Dom`] trait, so a missing element is always an `Option` or a
//! silent no-op rather than a crash. [`MemoryDom`] is a complete in-memory
//! page used by tests and by the CLI.
//!
//! Click handling is delegated: the page reports a [`ClickTarget`] (the
//! clicked element plus its ancestor chain) and components decide what it
//! means with [`ClickTarget::closest`], so controls inserted after start-up
//! are handled without re-binding.

use std::collections::BTreeMap;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use regex::{Captures, Regex};

use crate::format::escape_html;

/// Character references decoded when reading text back out of markup.
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|(lt|gt|quot|apos|amp|nbsp));")
        .expect("valid entity regex")
});

/// A page element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name, e.g. `button`.
    pub tag: String,
    /// Id of the parent element, if any.
    pub parent: Option<String>,
    /// Class list, in insertion order.
    pub classes: Vec<String>,
    /// Attributes, including `data-*` attributes.
    pub attributes: BTreeMap<String, String>,
    /// Text content.
    pub text: String,
    /// Inner HTML.
    pub html: String,
    /// Form value.
    pub value: String,
    /// Whether a form control is disabled.
    pub disabled: bool,
    /// Inline style properties.
    pub style: BTreeMap<String, String>,
}

impl Element {
    /// Create an element with the given tag.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    /// Add a class.
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        if !self.classes.iter().any(|c| c == class) {
            self.classes.push(class.to_string());
        }
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the parent element id.
    #[must_use]
    pub fn child_of(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    /// Set the text content.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.html = escape_html(text);
        self.text = text.to_string();
        self
    }

    /// Set the form value.
    #[must_use]
    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    /// Mark a form control as disabled.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Whether the class list contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// One element on the path from a click target up to the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetNode {
    /// Element id, if it has one.
    pub id: Option<String>,
    /// Class list.
    pub classes: Vec<String>,
    /// Attributes.
    pub attributes: BTreeMap<String, String>,
    /// Disabled flag.
    pub disabled: bool,
}

impl TargetNode {
    /// Whether the class list contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// `data-*` attribute value, e.g. `data("nombre")` reads `data-nombre`.
    #[must_use]
    pub fn data(&self, name: &str) -> Option<&str> {
        self.attr(&format!("data-{name}"))
    }

    /// Whether this node has the given id.
    #[must_use]
    pub fn is(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

/// A click event: the target first, then each ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    /// Target and ancestors, innermost first.
    pub path: Vec<TargetNode>,
}

impl ClickTarget {
    /// The clicked element itself.
    #[must_use]
    pub fn target(&self) -> Option<&TargetNode> {
        self.path.first()
    }

    /// Nearest node (target included) matching `predicate`.
    pub fn closest<P>(&self, predicate: P) -> Option<&TargetNode>
    where
        P: Fn(&TargetNode) -> bool,
    {
        self.path.iter().find(|node| predicate(node))
    }

    /// Whether the click landed on element `id` or inside it.
    #[must_use]
    pub fn within(&self, id: &str) -> bool {
        self.path.iter().any(|node| node.is(id))
    }

    /// Whether the clicked element itself is `id`.
    #[must_use]
    pub fn is(&self, id: &str) -> bool {
        self.target().is_some_and(|node| node.is(id))
    }
}

/// Access to the current page.
///
/// Mutators on a missing element are no-ops; readers return `None`/`false`.
pub trait Dom: Send + Sync {
    /// Whether an element with `id` exists.
    fn exists(&self, id: &str) -> bool;

    /// Text content of an element.
    fn text(&self, id: &str) -> Option<String>;

    /// Replace the text content (HTML-escaped into the element).
    fn set_text(&self, id: &str, text: &str);

    /// Inner HTML of an element.
    fn html(&self, id: &str) -> Option<String>;

    /// Replace the inner HTML.
    fn set_html(&self, id: &str, html: &str);

    /// Add a class.
    fn add_class(&self, id: &str, class: &str);

    /// Remove a class.
    fn remove_class(&self, id: &str, class: &str);

    /// Whether the element has a class.
    fn has_class(&self, id: &str, class: &str) -> bool;

    /// Attribute value.
    fn attribute(&self, id: &str, name: &str) -> Option<String>;

    /// Set an attribute.
    fn set_attribute(&self, id: &str, name: &str, value: &str);

    /// Set an inline style property.
    fn set_style(&self, id: &str, property: &str, value: &str);

    /// Inline style property.
    fn style(&self, id: &str, property: &str) -> Option<String>;

    /// Form control value.
    fn value(&self, id: &str) -> Option<String>;

    /// Set a form control value.
    fn set_value(&self, id: &str, value: &str);

    /// Enable or disable a form control.
    fn set_disabled(&self, id: &str, disabled: bool);

    /// Whether a form control is disabled.
    fn is_disabled(&self, id: &str) -> bool;

    /// Move keyboard focus to an element.
    fn focus(&self, id: &str);

    /// Insert a new element with the given id.
    fn append(&self, id: &str, element: Element);

    /// Remove an element.
    fn remove(&self, id: &str);

    /// The page's cookie string (`document.cookie`).
    fn cookies(&self) -> String;

    /// Navigate away to `url`.
    fn navigate(&self, url: &str);

    /// Go back one history entry.
    fn history_back(&self);

    /// Show a blocking message.
    fn alert(&self, message: &str);

    /// Ask for confirmation.
    fn confirm(&self, message: &str) -> bool;

    /// Open the print dialog.
    fn print(&self);

    /// Toggle a class; returns whether the class is present afterwards.
    fn toggle_class(&self, id: &str, class: &str) -> bool {
        if self.has_class(id, class) {
            self.remove_class(id, class);
            false
        } else {
            self.add_class(id, class);
            self.exists(id)
        }
    }

    /// Add several classes.
    fn add_classes(&self, id: &str, classes: &[&str]) {
        for class in classes {
            self.add_class(id, class);
        }
    }

    /// Remove several classes.
    fn remove_classes(&self, id: &str, classes: &[&str]) {
        for class in classes {
            self.remove_class(id, class);
        }
    }

    /// The subset of `ids` that are not on the page.
    fn missing<'a>(&self, ids: &[&'a str]) -> Vec<&'a str> {
        ids.iter().copied().filter(|id| !self.exists(id)).collect()
    }
}

// =============================================================================
// MemoryDom
// =============================================================================

#[derive(Debug, Default)]
struct PageState {
    elements: BTreeMap<String, Element>,
    cookie: String,
    location: Option<String>,
    back_count: usize,
    alerts: Vec<String>,
    confirm_prompts: Vec<String>,
    confirm_answer: bool,
    focused: Option<String>,
    print_count: usize,
}

/// An in-memory page.
///
/// Besides implementing [`Dom`] it records every side effect a browser would
/// show the user (alerts, navigation, focus, print requests) so they can be
/// inspected.
#[derive(Debug)]
pub struct MemoryDom {
    state: Mutex<PageState>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create an empty page. Confirmation dialogs answer "yes".
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                confirm_answer: true,
                ..PageState::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_element<R>(&self, id: &str, f: impl FnOnce(&mut Element) -> R) -> Option<R> {
        self.state().elements.get_mut(id).map(f)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(self, id: &str, element: Element) -> Self {
        self.append(id, element);
        self
    }

    /// Set the cookie string.
    pub fn set_cookies(&self, cookies: &str) {
        self.state().cookie = cookies.to_string();
    }

    /// Answer given by future confirmation dialogs.
    pub fn set_confirm_answer(&self, answer: bool) {
        self.state().confirm_answer = answer;
    }

    /// Snapshot of an element.
    #[must_use]
    pub fn element(&self, id: &str) -> Option<Element> {
        self.state().elements.get(id).cloned()
    }

    /// Ids of the direct children of `parent` (`None` for top-level elements).
    #[must_use]
    pub fn children(&self, parent: Option<&str>) -> Vec<String> {
        self.state()
            .elements
            .iter()
            .filter(|(_, el)| el.parent.as_deref() == parent)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Where the page navigated to, if it did.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.state().location.clone()
    }

    /// How many times history-back was requested.
    #[must_use]
    pub fn back_count(&self) -> usize {
        self.state().back_count
    }

    /// Every alert shown so far.
    #[must_use]
    pub fn alerts(&self) -> Vec<String> {
        self.state().alerts.clone()
    }

    /// Every confirmation prompt shown so far.
    #[must_use]
    pub fn confirm_prompts(&self) -> Vec<String> {
        self.state().confirm_prompts.clone()
    }

    /// Currently focused element.
    #[must_use]
    pub fn focused(&self) -> Option<String> {
        self.state().focused.clone()
    }

    /// How many times printing was requested.
    #[must_use]
    pub fn print_count(&self) -> usize {
        self.state().print_count
    }

    /// Build the click event for element `id`.
    #[must_use]
    pub fn click_target(&self, id: &str) -> Option<ClickTarget> {
        let state = self.state();
        let mut path = Vec::new();
        let mut current = Some(id.to_string());

        while let Some(node_id) = current {
            // Guard against parent cycles in hand-built pages
            if path.len() > state.elements.len() {
                break;
            }
            let Some(element) = state.elements.get(&node_id) else {
                break;
            };
            path.push(TargetNode {
                id: Some(node_id.clone()),
                classes: element.classes.clone(),
                attributes: element.attributes.clone(),
                disabled: element.disabled,
            });
            current = element.parent.clone();
        }

        if path.is_empty() { None } else { Some(ClickTarget { path }) }
    }
}

impl Dom for MemoryDom {
    fn exists(&self, id: &str) -> bool {
        self.state().elements.contains_key(id)
    }

    fn text(&self, id: &str) -> Option<String> {
        self.with_element(id, |el| el.text.clone())
    }

    fn set_text(&self, id: &str, text: &str) {
        self.with_element(id, |el| {
            el.html = escape_html(text);
            el.text = text.to_string();
        });
    }

    fn html(&self, id: &str) -> Option<String> {
        self.with_element(id, |el| el.html.clone())
    }

    fn set_html(&self, id: &str, html: &str) {
        self.with_element(id, |el| {
            el.text = html_to_text(html);
            el.html = html.to_string();
        });
    }

    fn add_class(&self, id: &str, class: &str) {
        self.with_element(id, |el| {
            if !el.has_class(class) {
                el.classes.push(class.to_string());
            }
        });
    }

    fn remove_class(&self, id: &str, class: &str) {
        self.with_element(id, |el| el.classes.retain(|c| c != class));
    }

    fn has_class(&self, id: &str, class: &str) -> bool {
        self.with_element(id, |el| el.has_class(class))
            .unwrap_or(false)
    }

    fn attribute(&self, id: &str, name: &str) -> Option<String> {
        self.with_element(id, |el| el.attributes.get(name).cloned())
            .flatten()
    }

    fn set_attribute(&self, id: &str, name: &str, value: &str) {
        self.with_element(id, |el| {
            el.attributes.insert(name.to_string(), value.to_string());
        });
    }

    fn set_style(&self, id: &str, property: &str, value: &str) {
        self.with_element(id, |el| {
            el.style.insert(property.to_string(), value.to_string());
        });
    }

    fn style(&self, id: &str, property: &str) -> Option<String> {
        self.with_element(id, |el| el.style.get(property).cloned())
            .flatten()
    }

    fn value(&self, id: &str) -> Option<String> {
        self.with_element(id, |el| el.value.clone())
    }

    fn set_value(&self, id: &str, value: &str) {
        self.with_element(id, |el| el.value = value.to_string());
    }

    fn set_disabled(&self, id: &str, disabled: bool) {
        self.with_element(id, |el| el.disabled = disabled);
    }

    fn is_disabled(&self, id: &str) -> bool {
        self.with_element(id, |el| el.disabled).unwrap_or(false)
    }

    fn focus(&self, id: &str) {
        let mut state = self.state();
        if state.elements.contains_key(id) {
            state.focused = Some(id.to_string());
        }
    }

    fn append(&self, id: &str, element: Element) {
        self.state().elements.insert(id.to_string(), element);
    }

    fn remove(&self, id: &str) {
        let mut state = self.state();
        state.elements.remove(id);
        if state.focused.as_deref() == Some(id) {
            state.focused = None;
        }
    }

    fn cookies(&self) -> String {
        self.state().cookie.clone()
    }

    fn navigate(&self, url: &str) {
        tracing::debug!(url, "Navigating");
        self.state().location = Some(url.to_string());
    }

    fn history_back(&self) {
        self.state().back_count += 1;
    }

    fn alert(&self, message: &str) {
        self.state().alerts.push(message.to_string());
    }

    fn confirm(&self, message: &str) -> bool {
        let mut state = self.state();
        state.confirm_prompts.push(message.to_string());
        state.confirm_answer
    }

    fn print(&self) {
        self.state().print_count += 1;
    }
}

/// Text content of an HTML fragment: tags dropped, character references decoded,
/// whitespace collapsed.
fn html_to_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let decoded = ENTITY_RE.replace_all(&text, |caps: &Captures<'_>| {
        let code = match (caps.get(1), caps.get(2), caps.get(3)) {
            (Some(dec), _, _) => dec.as_str().parse::<u32>().ok(),
            (_, Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, _, Some(name)) => match name.as_str() {
                "lt" => Some(0x3c),
                "gt" => Some(0x3e),
                "quot" => Some(0x22),
                "apos" => Some(0x27),
                "amp" => Some(0x26),
                _ => Some(0xa0),
            },
            _ => None,
        };
        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
