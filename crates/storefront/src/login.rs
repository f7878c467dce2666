//! Login form helpers.

use std::sync::Arc;

use crate::dom::{ClickTarget, Dom};
use crate::error::{ClientError, Result};

/// Element ids on the login page.
pub mod ids {
    pub const FORM: &str = "login-form";
    pub const USERNAME: &str = "usuario";
    pub const PASSWORD: &str = "password";
    pub const TOGGLE: &str = "togglePassword";
    pub const EYE_OPEN: &str = "eyeIconOpen";
    pub const EYE_CLOSED: &str = "eyeIconClosed";
}

/// Elements the password toggle works on.
const TOGGLE_PARTS: [&str; 4] = [ids::TOGGLE, ids::PASSWORD, ids::EYE_OPEN, ids::EYE_CLOSED];

/// The login form.
pub struct LoginForm {
    dom: Arc<dyn Dom>,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm").finish_non_exhaustive()
    }
}

impl LoginForm {
    /// Bind to the page.
    ///
    /// After a failed login the server echoes the submitted username in the
    /// form's `data-usuario` attribute; it is copied back into the input.
    pub fn bind(dom: Arc<dyn Dom>) -> Self {
        if let Some(username) = dom
            .attribute(ids::FORM, "data-usuario")
            .filter(|username| !username.is_empty())
            && dom.exists(ids::USERNAME)
        {
            dom.set_value(ids::USERNAME, &username);
        }

        let missing = dom.missing(&TOGGLE_PARTS);
        if !missing.is_empty() {
            tracing::debug!(?missing, "Password toggle unavailable");
        }

        Self { dom }
    }

    /// Show or hide the password. Returns whether it is now visible.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingElement` naming the first toggle element
    /// not on the page; nothing is changed in that case.
    pub fn toggle_password(&self) -> Result<bool> {
        if let Some(id) = self.dom.missing(&TOGGLE_PARTS).first() {
            return Err(ClientError::MissingElement((*id).to_string()));
        }

        let visible = self.dom.attribute(ids::PASSWORD, "type").as_deref() == Some("password");
        self.dom
            .set_attribute(ids::PASSWORD, "type", if visible { "text" } else { "password" });
        self.dom.toggle_class(ids::EYE_OPEN, "hidden");
        self.dom.toggle_class(ids::EYE_CLOSED, "hidden");
        Ok(visible)
    }

    /// Route a click on the login page. Returns `true` if it was handled.
    pub fn handle_click(&self, target: &ClickTarget) -> bool {
        if !target.within(ids::TOGGLE) {
            return false;
        }
        match self.toggle_password() {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "Password toggle ignored");
                false
            }
        }
    }
}
