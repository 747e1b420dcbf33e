//! The rendering entry point.
//!
//! [`Renderer`] owns what every render shares (lookup context, config and
//! the optional fragment cache) and dispatches each request either to the
//! template renderer or to one of the partial renderers.

mod streaming;
mod template;

use std::fmt;
use std::sync::Arc;

use crate::cache::FragmentCache;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::flow::View;
use crate::lookup::{LookupContext, TemplateLookup, TemplateResolver};
use crate::partial::{CollectionRenderer, ObjectRenderer, PartialOptions, PartialRenderer};
use crate::rendered::{Rendered, RenderedTemplate};
use crate::template::TemplateRegistry;

pub use streaming::{StreamOutcome, StreamingTemplateRenderer, Transport, TransportClosed};
pub use template::{LayoutFn, LayoutSpec, TemplateOptions, TemplateRenderer};

/// A render request: a whole template or a partial.
#[derive(Debug, Clone)]
pub enum RenderOptions {
    Template(TemplateOptions),
    Partial(PartialOptions),
}

impl From<TemplateOptions> for RenderOptions {
    fn from(options: TemplateOptions) -> Self {
        RenderOptions::Template(options)
    }
}

impl From<PartialOptions> for RenderOptions {
    fn from(options: PartialOptions) -> Self {
        RenderOptions::Partial(options)
    }
}

/// Renders templates and partials.
///
/// # Example
///
/// ```rust
/// use vitrine_render::{PartialOptions, Renderer, TemplateOptions, TemplateRegistry, View};
///
/// let registry = TemplateRegistry::from_embedded_entries(&[
///     ("layouts/app.html.jinja", "<main>{{ yield_content() }}</main>"),
///     ("posts/_post.html.jinja", "<p>{{ post }}</p>"),
/// ]);
/// let renderer = Renderer::from_registry(registry).with_prefixes(["posts"]);
///
/// let page = renderer
///     .render(&View::new(), TemplateOptions::html("hi").layout("app"))
///     .unwrap();
/// assert_eq!(page, "<main>hi</main>");
///
/// let partial = renderer
///     .render(&View::new(), PartialOptions::new("post").object(serde_json::json!("x").into()))
///     .unwrap();
/// assert_eq!(partial, "<p>x</p>");
/// ```
pub struct Renderer {
    context: LookupContext,
    config: RenderConfig,
    cache: Option<Arc<dyn FragmentCache>>,
}

impl Renderer {
    /// Creates a renderer with the default configuration.
    pub fn new(lookup: Arc<dyn TemplateLookup>) -> Self {
        let config = RenderConfig::default();
        let context = LookupContext::new(lookup).with_formats(config.default_formats.clone());
        Self {
            context,
            config,
            cache: None,
        }
    }

    /// Creates a renderer resolving templates from `registry`.
    pub fn from_registry(registry: TemplateRegistry) -> Self {
        Self::new(Arc::new(TemplateResolver::new(registry)))
    }

    /// Replaces the configuration. The lookup formats follow its default formats.
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.context = self.context.with_formats(config.default_formats.clone());
        self.config = config;
        self
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = self.context.with_prefixes(prefixes);
        self
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = self.context.with_formats(formats);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn FragmentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn context(&self) -> &LookupContext {
        &self.context
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<dyn FragmentCache>> {
        self.cache.as_ref()
    }

    /// Renders a request to its markup.
    pub fn render(
        &self,
        view: &View,
        options: impl Into<RenderOptions>,
    ) -> Result<String, RenderError> {
        self.render_to_object(view, options).map(|rendered| rendered.body())
    }

    /// Renders a request, keeping the template(s) it rendered with.
    pub fn render_to_object(
        &self,
        view: &View,
        options: impl Into<RenderOptions>,
    ) -> Result<Rendered, RenderError> {
        match options.into() {
            RenderOptions::Template(options) => {
                self.render_template(view, &options).map(Rendered::Template)
            }
            RenderOptions::Partial(options) => self.render_partial(view, &options),
        }
    }

    /// Renders a template inside its layout.
    pub fn render_template(
        &self,
        view: &View,
        options: &TemplateOptions,
    ) -> Result<RenderedTemplate, RenderError> {
        TemplateRenderer::new(&self.context, &self.config).render(view, options)
    }

    /// Renders a partial, an object or a collection.
    ///
    /// A named partial with a collection renders every element through it; a
    /// named partial with an object binds the object; a named partial alone
    /// renders with the given locals. Without a name, the object or each
    /// collection element renders through its own partial.
    pub fn render_partial(
        &self,
        view: &View,
        options: &PartialOptions,
    ) -> Result<Rendered, RenderError> {
        let base = PartialRenderer::new(&self.context, &self.config, options, self.cache.as_deref());

        match (&options.partial, &options.collection, &options.object) {
            (Some(partial), Some(collection), _) => CollectionRenderer::new(base)
                .render_collection_with_partial(collection.clone(), partial, view)
                .map(Rendered::Collection),
            (Some(partial), None, Some(object)) => ObjectRenderer::new(base)
                .render_object_with_partial(object, partial, view)
                .map(Rendered::Template),
            (Some(_), None, None) => base.render(view).map(Rendered::Template),
            (None, Some(collection), _) => CollectionRenderer::new(base)
                .render_collection_derive_partial(collection.clone(), view)
                .map(Rendered::Collection),
            (None, None, Some(object)) => ObjectRenderer::new(base)
                .render_object_derive_partial(object, view)
                .map(Rendered::Template),
            (None, None, None) => Err(RenderError::NotRenderable {
                value: serde_json::Value::Null.to_string(),
            }),
        }
    }

    /// Streams a template render to `transport`.
    ///
    /// See [`StreamingTemplateRenderer`] for when output is streamed and how
    /// failures are reported.
    pub fn render_to_stream<T: Transport + ?Sized>(
        &self,
        options: &TemplateOptions,
        transport: &mut T,
    ) -> Result<StreamOutcome, RenderError> {
        StreamingTemplateRenderer::new(TemplateRenderer::new(&self.context, &self.config))
            .render(options, transport)
    }

    /// Forgets memoized partial paths and the lookup's compiled templates.
    ///
    /// The fragment cache is left alone; its entries are keyed by the
    /// application.
    pub fn clear_caches(&self) {
        self.context.prefixed_paths().clear();
        self.context.lookup().clear_cache();
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("context", &self.context)
            .field("config", &self.config)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renderer() -> Renderer {
        Renderer::from_registry(TemplateRegistry::from_embedded_entries(&[
            ("posts/_post.html.tmpl", "<{post}>"),
            ("posts/_banner.html.tmpl", "banner {title}"),
            ("posts/index.html.tmpl", "index"),
        ]))
        .with_prefixes(["posts"])
    }

    #[test]
    fn test_dispatch_partial_with_locals() {
        let options = PartialOptions::new("banner").local("title", "T");
        assert_eq!(renderer().render(&View::new(), options).unwrap(), "banner T");
    }

    #[test]
    fn test_dispatch_object_with_partial() {
        let options = PartialOptions::new("post").object(json!("a").into());
        assert_eq!(renderer().render(&View::new(), options).unwrap(), "<a>");
    }

    #[test]
    fn test_dispatch_derived_object() {
        let object = crate::partial::Renderable::from_value(json!("b")).with_partial_path("posts/post");
        let options = PartialOptions::for_object(object);
        assert_eq!(renderer().render(&View::new(), options).unwrap(), "<b>");
    }

    #[test]
    fn test_dispatch_collection() {
        let options = PartialOptions::new("post").collection(vec![json!(1).into(), json!(2).into()]);
        let rendered = renderer().render_to_object(&View::new(), options).unwrap();
        assert!(matches!(rendered, Rendered::Collection(_)));
        assert_eq!(rendered.body(), "<1><2>");
    }

    #[test]
    fn test_dispatch_template() {
        let rendered = renderer()
            .render_to_object(&View::new(), TemplateOptions::path("index"))
            .unwrap();
        assert_eq!(rendered.format(), Some("html"));
        assert_eq!(rendered.body(), "index");
    }

    #[test]
    fn test_nothing_to_render() {
        let err = renderer()
            .render(&View::new(), PartialOptions::default())
            .unwrap_err();
        assert!(matches!(err, RenderError::NotRenderable { .. }));
    }

    #[test]
    fn test_clear_caches_drops_compiled_templates() {
        let resolver = Arc::new(TemplateResolver::new(
            TemplateRegistry::from_embedded_entries(&[("posts/_post.html.tmpl", "<{post}>")]),
        ));
        let renderer = Renderer::new(resolver.clone()).with_prefixes(["posts"]);
        let options = PartialOptions::new("post").object(json!("a").into());

        assert_eq!(renderer.render(&View::new(), options.clone()).unwrap(), "<a>");
        assert_eq!(resolver.cached_len(), 1);

        renderer.clear_caches();
        assert_eq!(resolver.cached_len(), 0);
        assert_eq!(renderer.render(&View::new(), options).unwrap(), "<a>");
    }

    #[test]
    fn test_with_config_updates_formats() {
        let config = RenderConfig {
            default_formats: vec!["text".into()],
            ..RenderConfig::default()
        };
        let renderer = renderer().with_config(config);
        assert_eq!(renderer.context().formats(), ["text".to_string()]);
    }

    #[test]
    fn test_non_streaming_template_sends_one_chunk() {
        let mut chunks: Vec<String> = Vec::new();
        let outcome = renderer()
            .render_to_stream(&TemplateOptions::path("index"), &mut chunks)
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(chunks, vec!["index"]);
    }
}
