//! Template registry for file-based and inline templates.
//!
//! This module provides [`TemplateRegistry`], which holds template sources from
//! inline strings, embedded entries, or directories on disk, and answers the
//! question the resolver asks: "which source implements this path in one of
//! these formats?"
//!
//! # Template Names
//!
//! A template's name carries its lookup path, its format and its handler:
//!
//! ```text
//! posts/_post.html.jinja
//! └─path──┘ └fmt┘ └handler
//! ```
//!
//! The format segment is optional (`layouts/application.jinja` serves any
//! format). See [`parse_template_name`].
//!
//! # Supported Extensions
//!
//! Template files are recognized by extension, in priority order:
//!
//! | Priority | Extension | Handler |
//! |----------|-----------|---------|
//! | 1 (highest) | `.jinja` | MiniJinja |
//! | 2 | `.jinja2` | MiniJinja |
//! | 3 | `.j2` | MiniJinja |
//! | 4 (lowest) | `.tmpl` | `{variable}` substitution |
//!
//! If multiple files implement the same path and format with different
//! extensions (e.g., `_post.html.jinja` and `_post.html.tmpl`), the
//! higher-priority extension wins.
//!
//! # Collision Handling
//!
//! - Same directory, different extensions: higher priority extension wins (no error)
//! - Cross-directory collisions: [`RegistryError::Collision`] listing both files
//! - Inline templates replace whatever they collide with
//!
//! # Example
//!
//! ```rust
//! use vitrine_render::TemplateRegistry;
//!
//! let registry = TemplateRegistry::from_embedded_entries(&[
//!     ("posts/_post.html.jinja", "<p>{{ post.title }}</p>"),
//!     ("layouts/application.jinja", "<html>{{ yield_content() }}</html>"),
//! ]);
//!
//! let entry = registry.find("posts/_post", &["html".to_string()]).unwrap();
//! assert_eq!(entry.identifier, "posts/_post.html.jinja");
//! assert!(registry.find("layouts/application", &["text".to_string()]).is_some());
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Handler;
use crate::error::RenderError;

/// Recognized template file extensions in priority order.
///
/// When multiple sources implement the same path and format, the extension
/// appearing earlier in this list takes precedence.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".jinja", ".jinja2", ".j2", ".tmpl"];

/// Splits a template name into `(path, format, handler)`.
///
/// Returns `None` if the name does not end in one of [`TEMPLATE_EXTENSIONS`]
/// or has nothing in front of the extension.
///
/// ```rust
/// use vitrine_render::template::{parse_template_name, Handler};
///
/// assert_eq!(
///     parse_template_name("posts/_post.html.jinja"),
///     Some(("posts/_post".to_string(), Some("html".to_string()), Handler::Jinja))
/// );
/// assert_eq!(
///     parse_template_name("layouts/app.tmpl"),
///     Some(("layouts/app".to_string(), None, Handler::Simple))
/// );
/// assert_eq!(parse_template_name("notes.txt"), None);
/// ```
pub fn parse_template_name(name_with_ext: &str) -> Option<(String, Option<String>, Handler)> {
    let ext = TEMPLATE_EXTENSIONS
        .iter()
        .find(|ext| name_with_ext.ends_with(*ext))?;
    let handler = Handler::from_extension(ext.trim_start_matches('.'))?;
    let stem = &name_with_ext[..name_with_ext.len() - ext.len()];

    let (dir, base) = match stem.rfind('/') {
        Some(pos) => (&stem[..=pos], &stem[pos + 1..]),
        None => ("", stem),
    };
    if base.is_empty() {
        return None;
    }

    match base.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < base.len() => Some((
            format!("{}{}", dir, &base[..pos]),
            Some(base[pos + 1..].to_string()),
            handler,
        )),
        _ => Some((stem.to_string(), None, handler)),
    }
}

fn extension_priority(name: &str) -> usize {
    TEMPLATE_EXTENSIONS
        .iter()
        .position(|ext| name.ends_with(ext))
        .unwrap_or(usize::MAX)
}

/// A template file discovered during directory walking.
///
/// For a file at `/app/views/posts/_post.html.jinja` with root `/app/views`:
///
/// ```rust,ignore
/// TemplateFile {
///     name_with_ext: "posts/_post.html.jinja".to_string(),
///     absolute_path: PathBuf::from("/app/views/posts/_post.html.jinja"),
///     source_dir: PathBuf::from("/app/views"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Name relative to the directory root, with extensions
    pub name_with_ext: String,
    /// Absolute path to the template file
    pub absolute_path: PathBuf,
    /// The template directory root this file belongs to
    pub source_dir: PathBuf,
}

impl TemplateFile {
    /// Creates a new template file descriptor.
    pub fn new(
        name_with_ext: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        source_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name_with_ext: name_with_ext.into(),
            absolute_path: absolute_path.into(),
            source_dir: source_dir.into(),
        }
    }

    /// Returns the extension priority (lower is higher priority).
    ///
    /// Returns `usize::MAX` if the extension is not recognized.
    pub fn extension_priority(&self) -> usize {
        extension_priority(&self.name_with_ext)
    }
}

/// How a template's content is stored or accessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTemplate {
    /// Template content stored directly in memory (inline or embedded).
    Inline(String),

    /// Template read from disk on demand, so edits show up after a cache clear.
    File(PathBuf),
}

/// One registered template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    /// Full name with extensions, e.g. `posts/_post.html.jinja`.
    pub identifier: String,
    /// Lookup path, e.g. `posts/_post`.
    pub path: String,
    /// Format segment, if the name carries one.
    pub format: Option<String>,
    /// Handler chosen by the extension.
    pub handler: Handler,
    /// Where the content lives.
    pub source: ResolvedTemplate,
    source_dir: Option<PathBuf>,
}

impl TemplateEntry {
    /// Reads the entry's content, from disk if necessary.
    pub fn content(&self) -> Result<String, RegistryError> {
        match &self.source {
            ResolvedTemplate::Inline(content) => Ok(content.clone()),
            ResolvedTemplate::File(path) => {
                std::fs::read_to_string(path).map_err(|e| RegistryError::ReadError {
                    path: path.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Error type for template registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two template directories contain files that resolve to the same name.
    #[error(
        "Template collision detected for \"{name}\":\n  - {} (from {})\n  - {} (from {})",
        .existing_path.display(),
        .existing_dir.display(),
        .conflicting_path.display(),
        .conflicting_dir.display()
    )]
    Collision {
        name: String,
        existing_path: PathBuf,
        existing_dir: PathBuf,
        conflicting_path: PathBuf,
        conflicting_dir: PathBuf,
    },

    /// Template not found in registry.
    #[error("Template not found: \"{name}\"")]
    NotFound { name: String },

    /// The name does not end in a recognized template extension.
    #[error("Unrecognized template name \"{name}\": expected one of {:?}", TEMPLATE_EXTENSIONS)]
    UnrecognizedName { name: String },

    /// Failed to read template file from disk.
    #[error("Failed to read template \"{}\": {message}", .path.display())]
    ReadError { path: PathBuf, message: String },
}

impl From<RegistryError> for RenderError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { name } => RenderError::MissingTemplate {
                path: name,
                prefixes: Vec::new(),
                partial: false,
                formats: Vec::new(),
            },
            other => RenderError::Template(other.to_string()),
        }
    }
}

/// Registry of template sources.
///
/// Entries are grouped by lookup path; within a path each format keeps the
/// single highest-priority source. Every entry is also reachable by its full
/// identifier and by `path.format`, which is what `{% include %}` uses.
///
/// The registry is not thread-safe for mutation. Build it up front, then hand
/// it to a [`TemplateResolver`](crate::TemplateResolver), which shares it
/// read-only.
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    entries: Vec<TemplateEntry>,
    /// path → indices into `entries`, one per distinct format
    by_path: HashMap<String, Vec<usize>>,
    /// identifier, `path.format` and `path` → index into `entries`
    by_name: HashMap<String, usize>,
}

impl TemplateRegistry {
    /// Creates an empty template registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inline template, replacing any source registered for the same
    /// path and format.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnrecognizedName`] if `name_with_ext` lacks a
    /// template extension.
    pub fn add_inline(
        &mut self,
        name_with_ext: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name_with_ext = name_with_ext.into();
        let entry = Self::entry(&name_with_ext, ResolvedTemplate::Inline(content.into()), None)?;
        self.insert(entry, true);
        Ok(())
    }

    /// Adds a template directory, walking it recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or one of its files
    /// collides with a template from another directory.
    pub fn add_template_dir<P: AsRef<Path>>(&mut self, path: P) -> Result<(), RegistryError> {
        let path = path.as_ref();
        let files = walk_template_dir(path).map_err(|e| RegistryError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.add_from_files(files)
    }

    /// Adds templates discovered from a directory scan.
    ///
    /// Files are processed in extension priority order, so a lower-priority
    /// duplicate from the same directory is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Collision`] if templates from different
    /// directories resolve to the same path and format.
    pub fn add_from_files(&mut self, files: Vec<TemplateFile>) -> Result<(), RegistryError> {
        let mut sorted_files = files;
        sorted_files.sort_by_key(|f| f.extension_priority());

        for file in sorted_files {
            let entry = Self::entry(
                &file.name_with_ext,
                ResolvedTemplate::File(file.absolute_path.clone()),
                Some(file.source_dir.clone()),
            )?;

            if let Some(existing) = self.slot(&entry.path, entry.format.as_deref()) {
                let existing = &self.entries[existing];
                if let (ResolvedTemplate::File(existing_path), Some(existing_dir)) =
                    (&existing.source, &existing.source_dir)
                {
                    if existing_dir != &file.source_dir {
                        return Err(RegistryError::Collision {
                            name: qualified_name(&entry.path, entry.format.as_deref()),
                            existing_path: existing_path.clone(),
                            existing_dir: existing_dir.clone(),
                            conflicting_path: file.absolute_path,
                            conflicting_dir: file.source_dir,
                        });
                    }
                }
                // Same directory, lower priority extension (or shadowed by inline)
                continue;
            }

            self.insert(entry, false);
        }

        Ok(())
    }

    /// Creates a registry from embedded `(name_with_ext, content)` entries,
    /// applying the same extension priority as directory loading.
    ///
    /// Entries without a recognized extension are skipped.
    pub fn from_embedded_entries(entries: &[(&str, &str)]) -> Self {
        let mut registry = Self::new();

        let mut sorted: Vec<_> = entries.iter().collect();
        sorted.sort_by_key(|(name, _)| extension_priority(name));

        for (name_with_ext, content) in sorted {
            let Ok(entry) =
                Self::entry(name_with_ext, ResolvedTemplate::Inline(content.to_string()), None)
            else {
                continue;
            };
            if registry
                .slot(&entry.path, entry.format.as_deref())
                .is_none()
            {
                registry.insert(entry, false);
            }
        }

        registry
    }

    /// Finds the source implementing `path` in the first matching format.
    ///
    /// Formats are tried in order, then a format-less source is accepted.
    pub fn find(&self, path: &str, formats: &[String]) -> Option<&TemplateEntry> {
        let indices = self.by_path.get(path)?;
        formats
            .iter()
            .find_map(|format| {
                indices
                    .iter()
                    .find(|&&i| self.entries[i].format.as_deref() == Some(format.as_str()))
            })
            .or_else(|| indices.iter().find(|&&i| self.entries[i].format.is_none()))
            .map(|&i| &self.entries[i])
    }

    /// Whether any source, in any format, implements `path`.
    pub fn contains_path(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    /// Looks up an entry by identifier, `path.format` or bare path.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if the name is unknown.
    pub fn get(&self, name: &str) -> Result<&TemplateEntry, RegistryError> {
        self.by_name
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Gets the content of a template by name, reading from disk if necessary.
    pub fn get_content(&self, name: &str) -> Result<String, RegistryError> {
        self.get(name)?.content()
    }

    /// Returns the number of registered template sources.
    pub fn len(&self) -> usize {
        self.by_path.values().map(Vec::len).sum()
    }

    /// Returns true if no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Returns an iterator over all names an entry can be reached by.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|s| s.as_str())
    }

    /// Clears all templates from the registry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_path.clear();
        self.by_name.clear();
    }

    fn entry(
        name_with_ext: &str,
        source: ResolvedTemplate,
        source_dir: Option<PathBuf>,
    ) -> Result<TemplateEntry, RegistryError> {
        let (path, format, handler) =
            parse_template_name(name_with_ext).ok_or_else(|| RegistryError::UnrecognizedName {
                name: name_with_ext.to_string(),
            })?;
        Ok(TemplateEntry {
            identifier: name_with_ext.to_string(),
            path,
            format,
            handler,
            source,
            source_dir,
        })
    }

    fn slot(&self, path: &str, format: Option<&str>) -> Option<usize> {
        self.by_path
            .get(path)?
            .iter()
            .copied()
            .find(|&i| self.entries[i].format.as_deref() == format)
    }

    fn insert(&mut self, entry: TemplateEntry, replace: bool) {
        let qualified = qualified_name(&entry.path, entry.format.as_deref());
        let existing = self.slot(&entry.path, entry.format.as_deref());

        let index = match existing {
            Some(index) if replace => {
                let old = std::mem::replace(&mut self.entries[index], entry);
                self.by_name.remove(&old.identifier);
                index
            }
            Some(_) => return,
            None => {
                self.entries.push(entry);
                let index = self.entries.len() - 1;
                self.by_path
                    .entry(self.entries[index].path.clone())
                    .or_default()
                    .push(index);
                index
            }
        };

        let entry = &self.entries[index];
        self.by_name.insert(entry.identifier.clone(), index);
        self.by_name.insert(qualified, index);
        // A bare path reaches the format-less source, or else the first format registered
        if entry.format.is_none() || !self.by_name.contains_key(&entry.path) {
            self.by_name.insert(entry.path.clone(), index);
        }
    }
}

fn qualified_name(path: &str, format: Option<&str>) -> String {
    match format {
        Some(format) => format!("{}.{}", path, format),
        None => path.to_string(),
    }
}

/// Walks a template directory and collects template files.
///
/// The directory is traversed recursively; files without a recognized
/// extension ([`TEMPLATE_EXTENSIONS`]) are ignored. Names use `/` separators
/// regardless of platform.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or traversed.
pub fn walk_template_dir(root: impl AsRef<Path>) -> Result<Vec<TemplateFile>, std::io::Error> {
    let root = root.as_ref().canonicalize()?;
    let mut files = Vec::new();
    walk_dir_recursive(&root, &root, &mut files)?;
    Ok(files)
}

fn walk_dir_recursive(
    current: &Path,
    root: &Path,
    files: &mut Vec<TemplateFile>,
) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(current)? {
        let path = entry?.path();

        if path.is_dir() {
            walk_dir_recursive(&path, root, files)?;
        } else if path.is_file() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let name_with_ext = relative
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/");
            if extension_priority(&name_with_ext) != usize::MAX {
                files.push(TemplateFile::new(name_with_ext, path.clone(), root));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html() -> Vec<String> {
        vec!["html".to_string()]
    }

    // =========================================================================
    // Name parsing tests
    // =========================================================================

    #[test]
    fn test_parse_template_name() {
        assert_eq!(
            parse_template_name("posts/_post.html.jinja"),
            Some(("posts/_post".into(), Some("html".into()), Handler::Jinja))
        );
        assert_eq!(
            parse_template_name("_item.j2"),
            Some(("_item".into(), None, Handler::Jinja))
        );
        assert_eq!(
            parse_template_name("v1.2/page.text.tmpl"),
            Some(("v1.2/page".into(), Some("text".into()), Handler::Simple))
        );
        assert_eq!(parse_template_name(".jinja"), None);
        assert_eq!(parse_template_name("readme.md"), None);
    }

    #[test]
    fn test_template_file_extension_priority() {
        let jinja = TemplateFile::new("a.jinja", "/t/a.jinja", "/t");
        let jinja2 = TemplateFile::new("a.jinja2", "/t/a.jinja2", "/t");
        let j2 = TemplateFile::new("a.j2", "/t/a.j2", "/t");
        let tmpl = TemplateFile::new("a.tmpl", "/t/a.tmpl", "/t");
        let unknown = TemplateFile::new("a.xyz", "/t/a.xyz", "/t");

        assert_eq!(jinja.extension_priority(), 0);
        assert_eq!(jinja2.extension_priority(), 1);
        assert_eq!(j2.extension_priority(), 2);
        assert_eq!(tmpl.extension_priority(), 3);
        assert_eq!(unknown.extension_priority(), usize::MAX);
    }

    // =========================================================================
    // Inline tests
    // =========================================================================

    #[test]
    fn test_registry_add_inline() {
        let mut registry = TemplateRegistry::new();
        registry.add_inline("header.html.jinja", "{{ title }}").unwrap();

        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.get_content("header").unwrap(), "{{ title }}");
        assert_eq!(registry.get_content("header.html").unwrap(), "{{ title }}");
        assert_eq!(registry.get_content("header.html.jinja").unwrap(), "{{ title }}");
    }

    #[test]
    fn test_registry_inline_overwrites() {
        let mut registry = TemplateRegistry::new();
        registry.add_inline("header.jinja", "first").unwrap();
        registry.add_inline("header.tmpl", "second").unwrap();

        let entry = registry.find("header", &[]).unwrap();
        assert_eq!(entry.content().unwrap(), "second");
        assert_eq!(entry.handler, Handler::Simple);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("header.jinja").is_err());
    }

    #[test]
    fn test_registry_inline_rejects_unknown_extension() {
        let mut registry = TemplateRegistry::new();
        let result = registry.add_inline("header.erb", "x");
        assert!(matches!(result, Err(RegistryError::UnrecognizedName { .. })));
    }

    #[test]
    fn test_registry_not_found() {
        let registry = TemplateRegistry::new();
        let result = registry.get("nonexistent");
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }

    // =========================================================================
    // Format resolution tests
    // =========================================================================

    #[test]
    fn test_find_prefers_requested_format_order() {
        let registry = TemplateRegistry::from_embedded_entries(&[
            ("page.html.jinja", "html"),
            ("page.text.jinja", "text"),
            ("page.jinja", "any"),
        ]);

        let formats = vec!["text".to_string(), "html".to_string()];
        assert_eq!(registry.find("page", &formats).unwrap().content().unwrap(), "text");
        assert_eq!(registry.find("page", &html()).unwrap().content().unwrap(), "html");
        assert_eq!(
            registry.find("page", &["json".to_string()]).unwrap().content().unwrap(),
            "any"
        );
        assert_eq!(registry.get_content("page").unwrap(), "any");
    }

    #[test]
    fn test_find_format_only_in_other_format() {
        let registry = TemplateRegistry::from_embedded_entries(&[("feed.xml.jinja", "x")]);
        assert!(registry.find("feed", &html()).is_none());
        assert!(registry.contains_path("feed"));
        assert!(!registry.contains_path("posts"));
    }

    // =========================================================================
    // File-based template tests (using synthetic data)
    // =========================================================================

    #[test]
    fn test_registry_add_from_files() {
        let mut registry = TemplateRegistry::new();
        let files = vec![
            TemplateFile::new("config.jinja", "/templates/config.jinja", "/templates"),
            TemplateFile::new(
                "todos/_list.html.jinja",
                "/templates/todos/_list.html.jinja",
                "/templates",
            ),
        ];
        registry.add_from_files(files).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("config").is_ok());
        assert!(registry.get("todos/_list").is_ok());
        assert!(registry.get("todos/_list.html.jinja").is_ok());
        assert!(registry.find("todos/_list", &html()).is_some());
    }

    #[test]
    fn test_registry_extension_priority() {
        let mut registry = TemplateRegistry::new();
        let files = vec![
            TemplateFile::new("config.tmpl", "/templates/config.tmpl", "/templates"),
            TemplateFile::new("config.jinja", "/templates/config.jinja", "/templates"),
        ];
        registry.add_from_files(files).unwrap();

        let entry = registry.find("config", &[]).unwrap();
        match &entry.source {
            ResolvedTemplate::File(path) => {
                assert!(path.to_string_lossy().ends_with("config.jinja"));
            }
            _ => panic!("Expected file template"),
        }
        assert_eq!(entry.handler, Handler::Jinja);
    }

    #[test]
    fn test_registry_collision_different_dirs() {
        let mut registry = TemplateRegistry::new();
        let files = vec![
            TemplateFile::new("config.jinja", "/app/templates/config.jinja", "/app/templates"),
            TemplateFile::new(
                "config.jinja",
                "/plugins/templates/config.jinja",
                "/plugins/templates",
            ),
        ];

        let result = registry.add_from_files(files);
        match result {
            Err(RegistryError::Collision { name, .. }) => assert_eq!(name, "config"),
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_registry_inline_shadows_file() {
        let mut registry = TemplateRegistry::new();
        registry
            .add_from_files(vec![TemplateFile::new(
                "config.jinja",
                "/templates/config.jinja",
                "/templates",
            )])
            .unwrap();
        registry.add_inline("config.jinja", "inline content").unwrap();

        assert_eq!(registry.get_content("config").unwrap(), "inline content");
    }

    #[test]
    fn test_walk_template_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("posts")).unwrap();
        std::fs::write(dir.path().join("posts/_post.html.jinja"), "<p>{{ post }}</p>").unwrap();
        std::fs::write(dir.path().join("posts/notes.md"), "ignored").unwrap();
        std::fs::write(dir.path().join("app.tmpl"), "{yield}").unwrap();

        let mut files = walk_template_dir(dir.path()).unwrap();
        files.sort_by(|a, b| a.name_with_ext.cmp(&b.name_with_ext));
        let names: Vec<&str> = files.iter().map(|f| f.name_with_ext.as_str()).collect();
        assert_eq!(names, vec!["app.tmpl", "posts/_post.html.jinja"]);

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir.path()).unwrap();
        assert_eq!(
            registry.get_content("posts/_post.html").unwrap(),
            "<p>{{ post }}</p>"
        );
    }

    #[test]
    fn test_file_content_is_read_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("live.jinja");
        std::fs::write(&file, "v1").unwrap();

        let mut registry = TemplateRegistry::new();
        registry.add_template_dir(dir.path()).unwrap();
        assert_eq!(registry.get_content("live").unwrap(), "v1");

        std::fs::write(&file, "v2").unwrap();
        assert_eq!(registry.get_content("live").unwrap(), "v2");
    }

    #[test]
    fn test_registry_clear() {
        let mut registry = TemplateRegistry::new();
        registry.add_inline("a.jinja", "content").unwrap();
        assert!(!registry.is_empty());
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.names().count(), 0);
    }

    // =========================================================================
    // Error display tests
    // =========================================================================

    #[test]
    fn test_error_display_collision() {
        let err = RegistryError::Collision {
            name: "config".to_string(),
            existing_path: PathBuf::from("/a/config.jinja"),
            existing_dir: PathBuf::from("/a"),
            conflicting_path: PathBuf::from("/b/config.jinja"),
            conflicting_dir: PathBuf::from("/b"),
        };

        let display = err.to_string();
        assert!(display.contains("config"));
        assert!(display.contains("/a/config.jinja"));
        assert!(display.contains("/b/config.jinja"));
    }

    #[test]
    fn test_error_into_render_error() {
        let err: RenderError = RegistryError::NotFound {
            name: "missing".into(),
        }
        .into();
        assert!(matches!(err, RenderError::MissingTemplate { .. }));
    }

    #[test]
    fn test_embedded_include_works() {
        let registry = TemplateRegistry::from_embedded_entries(&[
            ("main.jinja", "Start {% include '_partial' %} End"),
            ("_partial.jinja", "PARTIAL_CONTENT"),
        ]);

        let mut env = minijinja::Environment::new();
        for name in registry.names() {
            env.add_template_owned(name.to_string(), registry.get_content(name).unwrap())
                .unwrap();
        }
        let output = env.get_template("main").unwrap().render(()).unwrap();
        assert_eq!(output, "Start PARTIAL_CONTENT End");
    }
}
