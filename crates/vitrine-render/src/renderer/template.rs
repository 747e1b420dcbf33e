use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::flow::{View, LAYOUT_SLOT};
use crate::lookup::LookupContext;
use crate::rendered::RenderedTemplate;
use crate::template::{Handler, LiteralTemplate, Locals, TemplateHandle};

/// Layout chosen at render time from the formats being rendered.
pub type LayoutFn = Arc<dyn Fn(&[String]) -> LayoutSpec + Send + Sync>;

/// Which layout wraps a template render.
#[derive(Clone, Default)]
pub enum LayoutSpec {
    /// No layout.
    #[default]
    None,
    /// A layout name. Relative names are searched under the configured
    /// layout prefix; `/`-prefixed names are searched as given.
    Path(String),
    /// Computed when the render starts; the result is resolved in turn.
    Computed(LayoutFn),
    /// An already resolved layout.
    Template(TemplateHandle),
}

impl LayoutSpec {
    pub fn path(path: impl Into<String>) -> Self {
        LayoutSpec::Path(path.into())
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&[String]) -> LayoutSpec + Send + Sync + 'static,
    {
        LayoutSpec::Computed(Arc::new(f))
    }
}

impl From<&str> for LayoutSpec {
    fn from(path: &str) -> Self {
        LayoutSpec::Path(path.to_string())
    }
}

impl From<String> for LayoutSpec {
    fn from(path: String) -> Self {
        LayoutSpec::Path(path)
    }
}

impl From<TemplateHandle> for LayoutSpec {
    fn from(template: TemplateHandle) -> Self {
        LayoutSpec::Template(template)
    }
}

impl fmt::Debug for LayoutSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutSpec::None => f.write_str("None"),
            LayoutSpec::Path(path) => f.debug_tuple("Path").field(path).finish(),
            LayoutSpec::Computed(_) => f.write_str("Computed(..)"),
            LayoutSpec::Template(template) => f
                .debug_tuple("Template")
                .field(&template.identifier())
                .finish(),
        }
    }
}

/// Options for one template render.
///
/// Exactly one source must be set: `body`, `plain`, `html`, `file`,
/// `inline`, `template` or `path`.
#[derive(Clone, Default)]
pub struct TemplateOptions {
    /// Response body, emitted as is.
    pub body: Option<String>,
    /// Plain text, emitted as is.
    pub plain: Option<String>,
    /// Markup, emitted as is.
    pub html: Option<String>,
    /// File read verbatim.
    pub file: Option<PathBuf>,
    /// Template source compiled with `handler`.
    pub inline: Option<String>,
    pub handler: Handler,
    /// Already resolved template.
    pub template: Option<TemplateHandle>,
    /// Template name looked up through the renderer's lookup context.
    pub path: Option<String>,
    /// Prefixes searched for `path`; defaults to the context prefixes for bare names.
    pub prefixes: Option<Vec<String>>,
    /// Formats searched for `path`; defaults to the context formats.
    pub formats: Option<Vec<String>>,
    pub layout: LayoutSpec,
    pub locals: Locals,
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            html: Some(markup.into()),
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn inline(source: impl Into<String>, handler: Handler) -> Self {
        Self {
            inline: Some(source.into()),
            handler,
            ..Self::default()
        }
    }

    pub fn template(template: TemplateHandle) -> Self {
        Self {
            template: Some(template),
            ..Self::default()
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn layout(mut self, layout: impl Into<LayoutSpec>) -> Self {
        self.layout = layout.into();
        self
    }

    pub fn prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    pub fn local(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }

    pub fn locals(mut self, locals: Locals) -> Self {
        self.locals.extend(locals);
        self
    }

    /// Names of the sources that are set.
    pub fn sources(&self) -> Vec<&'static str> {
        [
            ("body", self.body.is_some()),
            ("plain", self.plain.is_some()),
            ("html", self.html.is_some()),
            ("file", self.file.is_some()),
            ("inline", self.inline.is_some()),
            ("template", self.template.is_some()),
            ("path", self.path.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

impl fmt::Debug for TemplateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateOptions")
            .field("sources", &self.sources())
            .field("path", &self.path)
            .field("handler", &self.handler)
            .field("layout", &self.layout)
            .field("locals", &self.locals)
            .finish_non_exhaustive()
    }
}

/// Renders a top-level template inside an optional layout.
pub struct TemplateRenderer<'a> {
    context: &'a LookupContext,
    config: &'a RenderConfig,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(context: &'a LookupContext, config: &'a RenderConfig) -> Self {
        Self { context, config }
    }

    pub fn config(&self) -> &RenderConfig {
        self.config
    }

    /// Renders the template, then its layout.
    pub fn render(
        &self,
        view: &View,
        options: &TemplateOptions,
    ) -> Result<RenderedTemplate, RenderError> {
        let template = self.determine_template(options)?;
        let layout = self.layout_for(&template, options)?;
        self.render_template(view, &template, layout.as_ref(), &options.locals)
    }

    /// Resolves the single template source of `options`.
    ///
    /// # Errors
    ///
    /// [`RenderError::AmbiguousTemplateSource`] unless exactly one source is set.
    pub fn determine_template(
        &self,
        options: &TemplateOptions,
    ) -> Result<TemplateHandle, RenderError> {
        let found = options.sources();
        if found.len() != 1 {
            return Err(RenderError::AmbiguousTemplateSource { found });
        }

        if let Some(body) = &options.body {
            return Ok(Arc::new(LiteralTemplate::body(body.clone())));
        }
        if let Some(text) = &options.plain {
            return Ok(Arc::new(LiteralTemplate::plain(text.clone())));
        }
        if let Some(markup) = &options.html {
            return Ok(Arc::new(LiteralTemplate::html(markup.clone())));
        }
        if let Some(file) = &options.file {
            return Ok(Arc::new(LiteralTemplate::raw_file(file)?));
        }
        if let Some(source) = &options.inline {
            let formats = self.formats(options);
            return options.handler.compile(
                "inline template",
                None,
                formats.first().map(String::as_str),
                source,
            );
        }
        if let Some(template) = &options.template {
            return Ok(template.clone());
        }

        match &options.path {
            Some(path) => {
                let prefixes = match &options.prefixes {
                    Some(prefixes) => prefixes.clone(),
                    None if path.contains('/') => Vec::new(),
                    None => self.context.prefixes().to_vec(),
                };
                let keys: Vec<String> = options.locals.keys().cloned().collect();
                self.context
                    .find_template_in(path, &prefixes, false, &keys, &self.formats(options))
            }
            None => Err(RenderError::AmbiguousTemplateSource { found }),
        }
    }

    /// Resolves the layout of `options` for a render of `template`.
    ///
    /// The template's own format is searched first.
    pub fn layout_for(
        &self,
        template: &TemplateHandle,
        options: &TemplateOptions,
    ) -> Result<Option<TemplateHandle>, RenderError> {
        let mut formats: Vec<String> = template.format().map(str::to_string).into_iter().collect();
        for format in self.formats(options) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        let keys: Vec<String> = options.locals.keys().cloned().collect();
        self.find_layout(&options.layout, &formats, &keys)
    }

    /// Resolves a layout spec.
    ///
    /// A named layout that exists only in other formats resolves to no
    /// layout; one that does not exist at all is an error.
    pub fn find_layout(
        &self,
        spec: &LayoutSpec,
        formats: &[String],
        keys: &[String],
    ) -> Result<Option<TemplateHandle>, RenderError> {
        match spec {
            LayoutSpec::None => Ok(None),
            LayoutSpec::Template(template) => Ok(Some(template.clone())),
            LayoutSpec::Computed(compute) => self.find_layout(&compute(formats), formats, keys),
            LayoutSpec::Path(path) => {
                if path.trim_matches('/').is_empty() {
                    return Err(RenderError::InvalidLayout(format!("'{}' names no layout", path)));
                }
                let prefixes = if path.starts_with('/') {
                    Vec::new()
                } else {
                    vec![self.config.layout_prefix.clone()]
                };
                match self
                    .context
                    .find_template_in(path, &prefixes, false, keys, formats)
                {
                    Ok(layout) => Ok(Some(layout)),
                    Err(RenderError::MissingTemplate { .. })
                        if self.context.template_exists(path, &prefixes, false) =>
                    {
                        debug!(layout = %path, ?formats, "layout has no matching format");
                        Ok(None)
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Renders `template`, stores its markup in the `layout` slot, and renders
    /// `layout` around it.
    pub fn render_template(
        &self,
        view: &View,
        template: &TemplateHandle,
        layout: Option<&TemplateHandle>,
        locals: &Locals,
    ) -> Result<RenderedTemplate, RenderError> {
        debug!(
            identifier = template.identifier(),
            layout = layout.map(|l| l.identifier()),
            "rendering template"
        );
        let content = template.render_to_string(view, locals)?;
        let body = match layout {
            Some(layout) => {
                view.flow().set(LAYOUT_SLOT, content)?;
                layout.render_to_string(view, locals)?
            }
            None => content,
        };
        Ok(RenderedTemplate::new(body, template.clone()))
    }

    fn formats(&self, options: &TemplateOptions) -> Vec<String> {
        options
            .formats
            .clone()
            .unwrap_or_else(|| self.context.formats().to_vec())
    }
}
