//! HTML rendering for the connect page
//!
//! Uses minijinja with HTML auto-escape. The single template is embedded at
//! compile time so the binary stays standalone.

use crate::{BridgeError, Result};
use minijinja::{context, Environment};

/// Renderer for the connect page
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Build the environment and register the embedded templates
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        // Auto-escape HTML for security
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);
        env.add_template("connect", include_str!("../../static/connect.html"))
            .map_err(|e| BridgeError::internal(format!("invalid connect template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the connect page.
    ///
    /// With an `auth_code` the page runs in OAuth mode: the submitted token
    /// is stored against the code and the browser is bounced back to
    /// `redirect_uri`. Without one it is a plain registration form.
    pub fn render_connect(
        &self,
        auth_code: Option<&str>,
        redirect_uri: Option<&str>,
        state: Option<&str>,
    ) -> Result<String> {
        let template = self
            .env
            .get_template("connect")
            .map_err(|e| BridgeError::internal(format!("missing connect template: {e}")))?;
        template
            .render(context! {
                oauth_flow => auth_code.is_some(),
                auth_code => auth_code.unwrap_or(""),
                redirect_uri => redirect_uri.unwrap_or(""),
                state => state.unwrap_or(""),
            })
            .map_err(|e| BridgeError::internal(format!("template render failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_oauth_mode_carries_code() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_connect(Some("code-123"), Some("https://example.test/cb"), Some("s1"))
            .unwrap();
        assert!(html.contains("code-123"));
        assert!(html.contains("s1"));
    }

    #[test]
    fn test_render_plain_mode() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer.render_connect(None, None, None).unwrap();
        assert!(html.contains("/register"));
    }

    #[test]
    fn test_render_escapes_injected_markup() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_connect(Some("<script>alert(1)</script>"), None, None)
            .unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
    }
}
