use tracing::debug;

use crate::cache::FragmentCache;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::flow::View;
use crate::lookup::LookupContext;
use crate::rendered::RenderedTemplate;
use crate::template::{Locals, TemplateHandle};

use super::PartialOptions;

/// State shared by every partial render: where to look templates up, the
/// options of this render, and the collaborators it may use.
///
/// [`ObjectRenderer`](super::ObjectRenderer) and
/// [`CollectionRenderer`](super::CollectionRenderer) build on it.
pub struct PartialRenderer<'a> {
    pub(crate) context: &'a LookupContext,
    pub(crate) config: &'a RenderConfig,
    pub(crate) options: &'a PartialOptions,
    pub(crate) cache: Option<&'a dyn FragmentCache>,
}

impl<'a> PartialRenderer<'a> {
    pub fn new(
        context: &'a LookupContext,
        config: &'a RenderConfig,
        options: &'a PartialOptions,
        cache: Option<&'a dyn FragmentCache>,
    ) -> Self {
        Self {
            context,
            config,
            options,
            cache,
        }
    }

    pub fn options(&self) -> &PartialOptions {
        self.options
    }

    /// Finds a partial. Paths with a directory bypass the context prefixes.
    pub fn find_partial(
        &self,
        path: &str,
        locals: &[String],
    ) -> Result<TemplateHandle, RenderError> {
        let prefixes: &[String] = if path.contains('/') {
            &[]
        } else {
            self.context.prefixes()
        };
        self.context.find_template(path, prefixes, true, locals)
    }

    /// Resolves the partial layout, if one was requested.
    pub fn find_layout(&self, locals: &[String]) -> Result<Option<TemplateHandle>, RenderError> {
        self.options
            .layout
            .as_deref()
            .map(|layout| self.find_partial(layout, locals))
            .transpose()
    }

    /// Renders the partial named in the options with only the given locals bound.
    pub fn render(&self, view: &View) -> Result<RenderedTemplate, RenderError> {
        let partial = self
            .options
            .partial
            .as_deref()
            .ok_or_else(|| RenderError::Template("no partial given to render".to_string()))?;
        let keys = self.options.local_keys(&[]);
        let template = self.find_partial(partial, &keys)?;
        let layout = self.find_layout(&keys)?;
        self.render_partial_template(view, &template, layout.as_ref(), &self.options.locals)
    }

    /// Renders `template`, then wraps its markup in `layout`.
    ///
    /// The layout sees the same locals and reads the partial's markup from
    /// its `layout` slot.
    pub fn render_partial_template(
        &self,
        view: &View,
        template: &TemplateHandle,
        layout: Option<&TemplateHandle>,
        locals: &Locals,
    ) -> Result<RenderedTemplate, RenderError> {
        debug!(identifier = template.identifier(), "rendering partial");
        let mut content = template.render_to_string(view, locals)?;
        if let Some(layout) = layout {
            debug!(identifier = layout.identifier(), "rendering partial layout");
            content = layout.render_to_string(&view.scoped(content), locals)?;
        }
        Ok(RenderedTemplate::new(content, template.clone()))
    }
}
