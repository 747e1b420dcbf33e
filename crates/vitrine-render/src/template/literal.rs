//! Templates whose source is already the output.

use std::io;
use std::path::Path;

use crate::error::RenderError;
use crate::flow::View;

use super::{Locals, Template};

/// Pre-rendered markup: a body, plain text, HTML, or a raw file's contents.
///
/// Literal templates have no yield points and never stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralTemplate {
    identifier: String,
    body: String,
    format: Option<String>,
}

impl LiteralTemplate {
    /// A response body with no declared format.
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            identifier: "body template".to_string(),
            body: body.into(),
            format: None,
        }
    }

    /// Plain text.
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            identifier: "text template".to_string(),
            body: body.into(),
            format: Some("text".to_string()),
        }
    }

    /// HTML markup, emitted as given.
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            identifier: "html template".to_string(),
            body: body.into(),
            format: Some("html".to_string()),
        }
    }

    /// A file read verbatim from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingFile`] if `path` is not an existing file.
    pub fn raw_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RenderError::MissingFile(path.to_path_buf()));
        }
        Ok(Self {
            identifier: path.display().to_string(),
            body: std::fs::read_to_string(path)?,
            format: None,
        })
    }
}

impl Template for LiteralTemplate {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn virtual_path(&self) -> Option<&str> {
        None
    }

    fn variable(&self) -> Option<&str> {
        None
    }

    fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    fn render(&self, _view: &View, _locals: &Locals, out: &mut dyn io::Write) -> Result<(), RenderError> {
        out.write_all(self.body.as_bytes())?;
        Ok(())
    }
}
