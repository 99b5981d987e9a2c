//! Page templates using MiniJinja

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::error::TemplateResult;

pub const VIEW_TEMPLATE: &str = "view.html";
pub const FORM_TEMPLATE: &str = "form.html";
pub const DELETE_CONFIRM_TEMPLATE: &str = "delete_confirm.html";

/// Renders the editor's page chrome.
///
/// Everything is HTML auto-escaped; pre-rendered fragments such as table cells
/// and configured markup snippets are passed through with the `safe` filter.
pub struct HtmlTemplates {
    env: Environment<'static>,
}

impl HtmlTemplates {
    pub fn new() -> TemplateResult<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);

        env.add_template(VIEW_TEMPLATE, include_str!("../templates/view.html"))?;
        env.add_template(FORM_TEMPLATE, include_str!("../templates/form.html"))?;
        env.add_template(
            DELETE_CONFIRM_TEMPLATE,
            include_str!("../templates/delete_confirm.html"),
        )?;

        Ok(Self { env })
    }

    /// Render one of the built-in page templates
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> TemplateResult<String> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(context)?)
    }

    /// Render a configured markup snippet such as the add link or cancel button
    pub fn render_snippet<T: Serialize>(&self, source: &str, context: &T) -> TemplateResult<String> {
        Ok(self.env.render_str(source, context)?)
    }
}
