//! MiniJinja-backed templates.
//!
//! [`MiniJinjaTemplate`] renders a template held by a MiniJinja
//! [`Environment`]. Registry templates share one environment (so
//! `{% include %}` resolves against the registry); inline sources get a
//! private one.
//!
//! Besides the bound locals, every render exposes the view flow:
//!
//! | Function | Effect |
//! |----------|--------|
//! | `yield_content()` | main content (the `layout` slot) |
//! | `yield_content("title")` | a named slot, empty when missing |
//! | `content_for("title", "x")` | appends to a slot, outputs nothing |
//! | `content_for("title")` | reads a slot |
//! | `content_for_exists("title")` | whether a slot holds content |
//! | `provide("title", "x")` | like `content_for`, but hands a streamed layout the value right away |

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Value};

use crate::error::{to_engine_error, RenderError};
use crate::flow::View;

use super::{variable_from_path, Locals, Template};

/// A template compiled by MiniJinja.
pub struct MiniJinjaTemplate {
    env: Arc<Environment<'static>>,
    name: String,
    identifier: String,
    virtual_path: Option<String>,
    variable: Option<String>,
    format: Option<String>,
}

impl MiniJinjaTemplate {
    /// Compiles a standalone source into its own environment.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] if the source does not parse.
    pub fn from_source(
        identifier: &str,
        virtual_path: Option<&str>,
        format: Option<&str>,
        source: &str,
    ) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        configure_environment(&mut env);
        env.add_template_owned(identifier.to_string(), source.to_string())?;
        Ok(Self::new(
            Arc::new(env),
            identifier,
            virtual_path,
            format,
        ))
    }

    /// Wraps a template already reachable through `env` under `identifier`.
    ///
    /// Compilation happens on first render (or through [`compile`](Self::compile)).
    pub fn from_environment(
        env: Arc<Environment<'static>>,
        identifier: &str,
        virtual_path: Option<&str>,
        format: Option<&str>,
    ) -> Self {
        Self::new(env, identifier, virtual_path, format)
    }

    fn new(
        env: Arc<Environment<'static>>,
        identifier: &str,
        virtual_path: Option<&str>,
        format: Option<&str>,
    ) -> Self {
        Self {
            env,
            name: identifier.to_string(),
            identifier: identifier.to_string(),
            virtual_path: virtual_path.map(str::to_string),
            variable: virtual_path
                .and_then(variable_from_path)
                .map(str::to_string),
            format: format.map(str::to_string),
        }
    }

    /// Loads and parses the template so syntax errors surface before rendering.
    pub fn compile(&self) -> Result<(), RenderError> {
        self.env.get_template(&self.name)?;
        Ok(())
    }
}

/// Applies the settings every vitrine environment shares.
///
/// Output is never auto-escaped: escaping belongs to whoever builds the values.
pub fn configure_environment(env: &mut Environment<'static>) {
    env.set_auto_escape_callback(|_| AutoEscape::None);

    // Newline filter
    env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });
}

/// Builds the render context: locals plus the view-flow functions.
fn build_context(view: &View, locals: &Locals) -> HashMap<String, Value> {
    let mut context: HashMap<String, Value> = locals
        .iter()
        .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
        .collect();

    let yield_view = view.clone();
    context.insert(
        "yield_content".to_string(),
        Value::from_function(move |name: Option<String>| -> Result<Value, minijinja::Error> {
            yield_view
                .layout_for(name.as_deref())
                .map(Value::from_safe_string)
                .map_err(to_engine_error)
        }),
    );

    let content_view = view.clone();
    context.insert(
        "content_for".to_string(),
        Value::from_function(
            move |name: String, value: Option<String>| -> Result<Value, minijinja::Error> {
                let flow = content_view.flow();
                match value {
                    Some(value) => {
                        flow.append(&name, &value).map_err(to_engine_error)?;
                        Ok(Value::from(""))
                    }
                    None => flow
                        .get(&name)
                        .map(|content| Value::from_safe_string(content.unwrap_or_default()))
                        .map_err(to_engine_error),
                }
            },
        ),
    );

    let exists_view = view.clone();
    context.insert(
        "content_for_exists".to_string(),
        Value::from_function(move |name: String| -> bool { exists_view.flow().contains(&name) }),
    );

    let provide_view = view.clone();
    context.insert(
        "provide".to_string(),
        Value::from_function(
            move |name: String, value: String| -> Result<Value, minijinja::Error> {
                provide_view
                    .flow()
                    .provide(&name, &value)
                    .map_err(to_engine_error)?;
                Ok(Value::from(""))
            },
        ),
    );

    context
}

impl Template for MiniJinjaTemplate {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn virtual_path(&self) -> Option<&str> {
        self.virtual_path.as_deref()
    }

    fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn render(&self, view: &View, locals: &Locals, out: &mut dyn io::Write) -> Result<(), RenderError> {
        let template = self.env.get_template(&self.name)?;
        let context = build_context(view, locals);
        template.render_to_write(&context, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::LAYOUT_SLOT;
    use serde_json::json;

    fn locals(value: serde_json::Value) -> Locals {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("locals must be an object"),
        }
    }

    fn render(source: &str, view: &View, data: serde_json::Value) -> String {
        MiniJinjaTemplate::from_source("test.jinja", None, None, source)
            .unwrap()
            .render_to_string(view, &locals(data))
            .unwrap()
    }

    #[test]
    fn test_render_locals() {
        let output = render("Hello, {{ name }}!", &View::new(), json!({"name": "World"}));
        assert_eq!(output, "Hello, World!");
    }

    #[test]
    fn test_render_with_loop() {
        let output = render(
            "{% for item in items %}{{ item }},{% endfor %}",
            &View::new(),
            json!({"items": ["a", "b", "c"]}),
        );
        assert_eq!(output, "a,b,c,");
    }

    #[test]
    fn test_no_auto_escape() {
        let template =
            MiniJinjaTemplate::from_source("page.html", None, Some("html"), "{{ markup }}").unwrap();
        let output = template
            .render_to_string(&View::new(), &locals(json!({"markup": "<b>x</b>"})))
            .unwrap();
        assert_eq!(output, "<b>x</b>");
    }

    #[test]
    fn test_syntax_error() {
        let result = MiniJinjaTemplate::from_source("bad.jinja", None, None, "{{ unclosed");
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_yield_content() {
        let view = View::new();
        view.flow().set(LAYOUT_SLOT, "<main/>".into()).unwrap();
        view.flow().set("title", "Home".into()).unwrap();
        let output = render(
            "<title>{{ yield_content('title') }}</title>{{ yield_content() }}{{ yield_content('nope') }}",
            &view,
            json!({}),
        );
        assert_eq!(output, "<title>Home</title><main/>");
    }

    #[test]
    fn test_content_for_and_exists() {
        let view = View::new();
        let output = render(
            "{{ content_for('title', 'A') }}{{ content_for('title', 'B') }}\
             {% if content_for_exists('title') %}[{{ content_for('title') }}]{% endif %}\
             {% if content_for_exists('nope') %}never{% endif %}",
            &view,
            json!({}),
        );
        assert_eq!(output, "[AB]");
        assert_eq!(view.flow().get("title").unwrap().as_deref(), Some("AB"));
    }

    #[test]
    fn test_provide_writes_flow() {
        let view = View::new();
        let output = render("{{ provide('title', 'Hi') }}body", &view, json!({}));
        assert_eq!(output, "body");
        assert_eq!(view.flow().get("title").unwrap().as_deref(), Some("Hi"));
    }

    #[test]
    fn test_nl_filter() {
        let output = render("{{ 'a' | nl }}b", &View::new(), json!({}));
        assert_eq!(output, "a\nb");
    }

    #[test]
    fn test_declared_variable() {
        let template =
            MiniJinjaTemplate::from_source("posts/_post.html.jinja", Some("posts/_post"), Some("html"), "")
                .unwrap();
        assert_eq!(template.variable(), Some("post"));
        assert_eq!(template.identifier(), "posts/_post.html.jinja");
    }
}
