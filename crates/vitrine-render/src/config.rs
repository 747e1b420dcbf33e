//! Renderer configuration.
//!
//! [`RenderConfig`] carries the process-level defaults a [`Renderer`](crate::Renderer)
//! falls back on. Per-render choices live in the option structs instead
//! ([`PartialOptions`](crate::PartialOptions), [`TemplateOptions`](crate::TemplateOptions)).
//!
//! Configuration can be built in code or loaded from YAML:
//!
//! ```rust
//! use vitrine_render::RenderConfig;
//!
//! let config = RenderConfig::from_yaml(r#"
//! default_formats: [html, text]
//! perform_caching: false
//! "#).unwrap();
//!
//! assert_eq!(config.default_formats, vec!["html", "text"]);
//! assert!(!config.perform_caching);
//! assert_eq!(config.layout_prefix, "layouts");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Markup appended to a stream when a streaming task fails mid-flight.
///
/// It closes whatever attribute or tag may be open and sends the client to
/// the static error page.
pub const DEFAULT_STREAMING_COMPLETION: &str =
    "\"><script>window.location = \"/500.html\"</script></html>";

/// Defaults shared by every render performed through one renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Formats searched, in order, when the caller does not name any.
    pub default_formats: Vec<String>,

    /// Prefix under which relative layout names are looked up.
    pub layout_prefix: String,

    /// Merge the first lookup prefix's namespace into derived partial paths
    /// (`admin/posts` + `posts/post` → `admin/posts/post`).
    pub prefix_partial_path_with_namespace: bool,

    /// Global switch for the collection fragment cache.
    pub perform_caching: bool,

    /// Prefix prepended (with a `/`) to every fragment cache key.
    pub cache_namespace: Option<String>,

    /// Chunk appended to a stream whose layout or content task failed.
    pub streaming_completion_on_exception: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            default_formats: vec!["html".to_string()],
            layout_prefix: "layouts".to_string(),
            prefix_partial_path_with_namespace: true,
            perform_caching: true,
            cache_namespace: None,
            streaming_completion_on_exception: DEFAULT_STREAMING_COMPLETION.to_string(),
        }
    }
}

impl RenderConfig {
    /// Parses a configuration from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, RenderError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RenderError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Applies the configured namespace to a fragment cache key.
    pub fn namespaced_cache_key(&self, key: &str) -> String {
        match &self.cache_namespace {
            Some(namespace) => format!("{}/{}", namespace, key),
            None => key.to_string(),
        }
    }
}
