//! Compiled, renderable templates.
//!
//! Everything the partial and layout renderers produce goes through the
//! [`Template`] trait. A template is identified by its identifier (usually the
//! source file name), knows the virtual path it was found under, and renders
//! into a writer so a streaming caller can forward output as it is produced.
//!
//! ## Handlers
//!
//! Sources found by a [`TemplateRegistry`] are compiled by a [`Handler`]
//! chosen from the file extension:
//!
//! | Extension | Handler | Yield syntax |
//! |-----------|---------|--------------|
//! | `.jinja`, `.jinja2`, `.j2` | [`Handler::Jinja`] ([`MiniJinjaTemplate`]) | `{{ yield_content() }}`, `{{ yield_content("title") }}` |
//! | `.tmpl` | [`Handler::Simple`] ([`SimpleTemplate`]) | `{yield}`, `{yield:title}` |
//!
//! Literal sources passed straight to a template render (body, plain text,
//! HTML, raw files) become [`LiteralTemplate`]s, which never stream.
//!
//! ## Key Types
//!
//! - [`Template`]: The collaborator contract every renderer works against
//! - [`TemplateRegistry`]: Template sources from inline strings, embedded entries or directories
//! - [`Locals`]: Local variables bound for one template render

mod engine;
mod literal;
pub mod registry;
mod simple;

use std::io;
use std::sync::Arc;

pub use engine::{configure_environment, MiniJinjaTemplate};
pub use literal::LiteralTemplate;
pub use registry::{
    parse_template_name, walk_template_dir, RegistryError, ResolvedTemplate, TemplateEntry,
    TemplateFile, TemplateRegistry, TEMPLATE_EXTENSIONS,
};
pub use simple::SimpleTemplate;

use crate::error::RenderError;
use crate::flow::View;

/// Local variables bound for one template render.
pub type Locals = serde_json::Map<String, serde_json::Value>;

/// Shared handle to a compiled template.
pub type TemplateHandle = Arc<dyn Template>;

/// A compiled template that can render itself.
///
/// Templates are immutable once resolved and may be rendered concurrently;
/// per-render state lives in the [`View`] and the [`Locals`].
pub trait Template: Send + Sync {
    /// Unique identifier, typically the source name including extensions.
    fn identifier(&self) -> &str;

    /// Path the template was found under (`posts/_post`), if it came from a lookup.
    fn virtual_path(&self) -> Option<&str>;

    /// Local variable name declared by the template's path (`post` for `posts/_post`).
    fn variable(&self) -> Option<&str>;

    /// Output format (`html`, `text`, ...), if known.
    fn format(&self) -> Option<&str>;

    /// Whether the template can be rendered incrementally into a stream.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Renders the template into `out`.
    ///
    /// Yield points read their content from the view's flow.
    fn render(&self, view: &View, locals: &Locals, out: &mut dyn io::Write)
        -> Result<(), RenderError>;

    /// Renders the template into a string.
    fn render_to_string(&self, view: &View, locals: &Locals) -> Result<String, RenderError> {
        let mut buffer = Vec::new();
        self.render(view, locals, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| RenderError::Serialization(e.to_string()))
    }
}

/// Source language of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Handler {
    /// MiniJinja syntax.
    #[default]
    Jinja,
    /// `{variable}` substitution.
    Simple,
}

impl Handler {
    /// Handler for a file extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jinja" | "jinja2" | "j2" => Some(Handler::Jinja),
            "tmpl" => Some(Handler::Simple),
            _ => None,
        }
    }

    /// Compiles `source` into a template handle.
    pub fn compile(
        self,
        identifier: &str,
        virtual_path: Option<&str>,
        format: Option<&str>,
        source: &str,
    ) -> Result<TemplateHandle, RenderError> {
        Ok(match self {
            Handler::Jinja => Arc::new(MiniJinjaTemplate::from_source(
                identifier,
                virtual_path,
                format,
                source,
            )?),
            Handler::Simple => Arc::new(SimpleTemplate::compile(
                identifier,
                virtual_path,
                format,
                source,
            )?),
        })
    }
}

/// Local variable name a template path declares.
///
/// The basename with one leading underscore and any dotted suffixes removed:
/// `posts/_post.html` → `post`. Returns `None` for paths ending in `/` or
/// yielding an empty name.
pub fn variable_from_path(path: &str) -> Option<&str> {
    if path.ends_with('/') {
        return None;
    }
    let base = path.rsplit('/').next().unwrap_or(path);
    let base = base.strip_prefix('_').unwrap_or(base);
    let name = base.split('.').next().unwrap_or(base);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
