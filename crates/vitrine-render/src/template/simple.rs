//! Lightweight templates using format-string style substitution.
//!
//! This module provides [`SimpleTemplate`], a template handler that uses
//! `{variable}` syntax for variable substitution. It's much lighter than
//! MiniJinja and suits fragments that don't need loops, conditionals, or filters.
//!
//! # Syntax
//!
//! - `{name}` - Simple variable substitution
//! - `{user.name}` - Nested property access via dot notation
//! - `{items.0}` - Array index access
//! - `{yield}` - The main content of the view flow (layouts)
//! - `{yield:title}` - A named view flow slot
//! - `{{` and `}}` - Escaped braces (renders as `{` and `}`)
//!
//! # Example
//!
//! ```rust
//! use vitrine_render::{Locals, SimpleTemplate, Template, View};
//! use serde_json::json;
//!
//! let template = SimpleTemplate::compile("item.tmpl", Some("_item"), None, "<item>{item.name}</item>").unwrap();
//! let mut locals = Locals::new();
//! locals.insert("item".into(), json!({"name": "a"}));
//!
//! let output = template.render_to_string(&View::new(), &locals).unwrap();
//! assert_eq!(output, "<item>a</item>");
//! ```

use std::io;

use crate::error::RenderError;
use crate::flow::View;

use super::{variable_from_path, Locals, Template};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
    Yield(Option<String>),
}

/// A compiled `{variable}` template.
///
/// The source is parsed once at compile time; each render walks the segments
/// and writes them out in order, so a yield point only runs after everything
/// before it has reached the writer.
#[derive(Debug, Clone)]
pub struct SimpleTemplate {
    identifier: String,
    virtual_path: Option<String>,
    variable: Option<String>,
    format: Option<String>,
    segments: Vec<Segment>,
}

impl SimpleTemplate {
    /// Parses `source` into a template.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Template`] for an unclosed or empty placeholder.
    pub fn compile(
        identifier: &str,
        virtual_path: Option<&str>,
        format: Option<&str>,
        source: &str,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            identifier: identifier.to_string(),
            virtual_path: virtual_path.map(str::to_string),
            variable: virtual_path
                .and_then(variable_from_path)
                .map(str::to_string),
            format: format.map(str::to_string),
            segments: parse(source)?,
        })
    }

    /// Resolves a dotted path in a JSON value.
    ///
    /// Supports:
    /// - Simple keys: `name`
    /// - Nested objects: `user.profile.name`
    /// - Array indices: `items.0` or `items.0.name`
    fn resolve_path<'a>(locals: &'a Locals, path: &str) -> Option<&'a serde_json::Value> {
        let mut parts = path.split('.');
        let mut current = locals.get(parts.next()?)?;

        for part in parts {
            current = match current {
                serde_json::Value::Object(map) => map.get(part)?,
                serde_json::Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Formats a JSON value as a string for output.
    fn format_value(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => String::new(),
            // For arrays and objects, use JSON representation
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => value.to_string(),
        }
    }
}

fn parse(source: &str) -> Result<Vec<Segment>, RenderError> {
    let mut segments = Vec::new();
    let mut text = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                // Escaped brace: {{ -> {
                chars.next();
                text.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut found_close = false;

                for inner_ch in chars.by_ref() {
                    if inner_ch == '}' {
                        found_close = true;
                        break;
                    }
                    name.push(inner_ch);
                }

                if !found_close {
                    return Err(RenderError::Template(format!(
                        "unclosed variable substitution: {{{}",
                        name
                    )));
                }

                let name = name.trim();
                if name.is_empty() {
                    return Err(RenderError::Template(
                        "empty variable name in template".to_string(),
                    ));
                }

                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(placeholder(name));
            }
            '}' if chars.peek() == Some(&'}') => {
                // Escaped brace: }} -> }
                chars.next();
                text.push('}');
            }
            _ => text.push(ch),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

fn placeholder(name: &str) -> Segment {
    if name == "yield" {
        return Segment::Yield(None);
    }
    match name.strip_prefix("yield:") {
        Some(slot) => Segment::Yield(Some(slot.trim().to_string())),
        None => Segment::Variable(name.to_string()),
    }
}

impl Template for SimpleTemplate {
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
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.write_all(text.as_bytes())?,
                Segment::Variable(name) => match Self::resolve_path(locals, name) {
                    Some(value) => out.write_all(Self::format_value(value).as_bytes())?,
                    // Variable not found - leave placeholder for debugging
                    None => write!(out, "{{{}}}", name)?,
                },
                Segment::Yield(slot) => {
                    let content = view.layout_for(slot.as_deref())?;
                    out.write_all(content.as_bytes())?;
                }
            }
        }
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

    fn render(source: &str, data: serde_json::Value) -> String {
        SimpleTemplate::compile("test.tmpl", None, None, source)
            .unwrap()
            .render_to_string(&View::new(), &locals(data))
            .unwrap()
    }

    #[test]
    fn test_simple_substitution() {
        assert_eq!(render("Hello, {name}!", json!({"name": "World"})), "Hello, World!");
    }

    #[test]
    fn test_nested_access() {
        let data = json!({"user": {"name": "Alice", "profile": {"email": "alice@example.com"}}});
        assert_eq!(
            render("Name: {user.name}, Email: {user.profile.email}", data),
            "Name: Alice, Email: alice@example.com"
        );
    }

    #[test]
    fn test_array_index() {
        let data = json!({"items": ["first", "second", "third"]});
        assert_eq!(
            render("First: {items.0}, Third: {items.2}", data),
            "First: first, Third: third"
        );
    }

    #[test]
    fn test_value_formatting() {
        let data = json!({"n": 3, "b": false, "z": null, "list": [1, 2]});
        assert_eq!(render("{n}|{b}|{z}|{list}", data), "3|false||[1,2]");
    }

    #[test]
    fn test_escaped_braces() {
        assert_eq!(render("{{literal}} {x}", json!({"x": 1})), "{literal} 1");
    }

    #[test]
    fn test_missing_variable_keeps_placeholder() {
        assert_eq!(render("a {missing} b", json!({})), "a {missing} b");
    }

    #[test]
    fn test_unclosed_placeholder_fails_to_compile() {
        let result = SimpleTemplate::compile("t", None, None, "oops {name");
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_empty_placeholder_fails_to_compile() {
        let result = SimpleTemplate::compile("t", None, None, "oops { }");
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_yield_reads_flow() {
        let view = View::new();
        view.flow().set(LAYOUT_SLOT, "<body/>".into()).unwrap();
        view.flow().set("title", "Home".into()).unwrap();

        let layout = SimpleTemplate::compile(
            "application.tmpl",
            Some("layouts/application"),
            Some("html"),
            "<title>{yield:title}</title>{yield}",
        )
        .unwrap();
        let output = layout.render_to_string(&view, &Locals::new()).unwrap();
        assert_eq!(output, "<title>Home</title><body/>");
    }

    #[test]
    fn test_declared_variable_from_path() {
        let template = SimpleTemplate::compile("posts/_post.html.tmpl", Some("posts/_post"), Some("html"), "")
            .unwrap();
        assert_eq!(template.variable(), Some("post"));
        assert_eq!(template.format(), Some("html"));
        assert!(template.supports_streaming());
    }
}
