//! Render results that keep track of what produced them.

use std::fmt;

use crate::template::TemplateHandle;

/// Markup produced by one template render.
#[derive(Clone)]
pub struct RenderedTemplate {
    body: String,
    template: TemplateHandle,
}

impl RenderedTemplate {
    pub fn new(body: String, template: TemplateHandle) -> Self {
        Self { body, template }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn identifier(&self) -> &str {
        self.template.identifier()
    }

    pub fn format(&self) -> Option<&str> {
        self.template.format()
    }

    pub fn template(&self) -> &TemplateHandle {
        &self.template
    }
}

impl fmt::Debug for RenderedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedTemplate")
            .field("identifier", &self.identifier())
            .field("body", &self.body)
            .finish()
    }
}

/// Markup produced by a collection render.
///
/// An empty collection renders no template at all, so it carries neither
/// entries nor a format.
#[derive(Clone)]
pub struct RenderedCollection {
    entries: Vec<RenderedTemplate>,
    spacer: Option<String>,
    format: Option<String>,
}

impl RenderedCollection {
    pub fn new(entries: Vec<RenderedTemplate>, spacer: Option<String>) -> Self {
        let format = entries
            .first()
            .and_then(|entry| entry.format())
            .map(str::to_string);
        Self {
            entries,
            spacer,
            format,
        }
    }

    /// The result of rendering an empty collection.
    pub fn empty(format: Option<String>) -> Self {
        Self {
            entries: Vec::new(),
            spacer: None,
            format,
        }
    }

    /// All entries joined by the spacer markup.
    pub fn body(&self) -> String {
        let spacer = self.spacer.as_deref().unwrap_or("");
        self.entries
            .iter()
            .map(RenderedTemplate::body)
            .collect::<Vec<_>>()
            .join(spacer)
    }

    pub fn entries(&self) -> &[RenderedTemplate] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Identifiers of the templates used, in render order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.entries.iter().map(RenderedTemplate::identifier).collect()
    }
}

impl fmt::Debug for RenderedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedCollection")
            .field("len", &self.entries.len())
            .field("spacer", &self.spacer)
            .field("format", &self.format)
            .finish()
    }
}

/// Result of [`Renderer::render_to_object`](crate::Renderer::render_to_object).
#[derive(Debug, Clone)]
pub enum Rendered {
    Template(RenderedTemplate),
    Collection(RenderedCollection),
}

impl Rendered {
    pub fn body(&self) -> String {
        match self {
            Rendered::Template(template) => template.body().to_string(),
            Rendered::Collection(collection) => collection.body(),
        }
    }

    pub fn format(&self) -> Option<&str> {
        match self {
            Rendered::Template(template) => template.format(),
            Rendered::Collection(collection) => collection.format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::LiteralTemplate;
    use std::sync::Arc;

    fn rendered(body: &str) -> RenderedTemplate {
        RenderedTemplate::new(body.to_string(), Arc::new(LiteralTemplate::html(body)))
    }

    #[test]
    fn test_collection_body_joins_with_spacer() {
        let collection = RenderedCollection::new(vec![rendered("a"), rendered("b")], Some("|".into()));
        assert_eq!(collection.body(), "a|b");
        assert_eq!(collection.format(), Some("html"));
        assert_eq!(collection.identifiers(), vec!["html template", "html template"]);
    }

    #[test]
    fn test_empty_collection() {
        let collection = RenderedCollection::empty(None);
        assert!(collection.is_empty());
        assert_eq!(collection.body(), "");
        assert_eq!(Rendered::Collection(collection).format(), None);
    }
}
