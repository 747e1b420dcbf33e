//! Template lookup: turning a path into a compiled [`Template`](crate::Template).
//!
//! Renderers never touch the registry directly. They go through the
//! [`TemplateLookup`] trait, so an application can plug in its own resolver
//! (a database, a remote store, a test double). [`TemplateResolver`] is the
//! stock implementation over a [`TemplateRegistry`].
//!
//! A lookup searches `prefix × path × format`:
//!
//! ```text
//! find_template("post", ["admin/posts", "posts"], partial = true, formats = [html])
//!   admin/posts/_post   html, then format-less
//!   posts/_post         html, then format-less
//! ```
//!
//! [`LookupContext`] bundles a lookup with the prefixes and formats of the
//! current render, plus the memo of namespace-prefixed partial paths.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use minijinja::{Environment, ErrorKind};
use tracing::debug;

use crate::error::RenderError;
use crate::flow::lock;
use crate::template::{
    configure_environment, Handler, MiniJinjaTemplate, SimpleTemplate, TemplateEntry,
    TemplateHandle, TemplateRegistry,
};

/// Format details of a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupDetails {
    /// Formats accepted, in preference order. Format-less sources always match last.
    pub formats: Vec<String>,
}

impl LookupDetails {
    pub fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }
}

/// Finds compiled templates by path.
pub trait TemplateLookup: Send + Sync {
    /// Finds the template implementing `path`.
    ///
    /// Bare paths are searched under each prefix in order; an empty prefix
    /// list searches `path` as given. A leading `/` is ignored. Partial
    /// lookups add a leading underscore to the basename. `locals` names the
    /// locals the render will bind.
    ///
    /// # Errors
    ///
    /// [`RenderError::MissingTemplate`] when nothing matches.
    fn find_template(
        &self,
        path: &str,
        prefixes: &[String],
        partial: bool,
        locals: &[String],
        details: &LookupDetails,
    ) -> Result<TemplateHandle, RenderError>;

    /// Whether `path` exists under any prefix in any format.
    fn template_exists(&self, path: &str, prefixes: &[String], partial: bool) -> bool;

    /// Drops whatever compiled state the lookup keeps between renders.
    fn clear_cache(&self) {}
}

/// Name searched for `path`: a partial's basename gets a leading underscore.
pub fn lookup_name(path: &str, partial: bool) -> String {
    let path = path.trim_start_matches('/');
    if !partial {
        return path.to_string();
    }
    match path.rsplit_once('/') {
        Some((dir, base)) if !base.starts_with('_') => format!("{}/_{}", dir, base),
        Some(_) => path.to_string(),
        None if path.starts_with('_') => path.to_string(),
        None => format!("_{}", path),
    }
}

fn candidates(name: &str, prefixes: &[String]) -> Vec<String> {
    if prefixes.is_empty() {
        return vec![name.to_string()];
    }
    prefixes
        .iter()
        .map(|prefix| {
            let prefix = prefix.trim_matches('/');
            if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", prefix, name)
            }
        })
        .collect()
}

/// Registry-backed [`TemplateLookup`].
///
/// Compiled templates are cached by identifier until [`TemplateLookup::clear_cache`].
/// MiniJinja templates share one environment whose loader reads the
/// registry, so `{% include %}` and `{% extends %}` resolve the same names.
pub struct TemplateResolver {
    registry: Arc<TemplateRegistry>,
    env: RwLock<Arc<Environment<'static>>>,
    compiled: Mutex<HashMap<String, TemplateHandle>>,
}

impl TemplateResolver {
    pub fn new(registry: TemplateRegistry) -> Self {
        let registry = Arc::new(registry);
        Self {
            env: RwLock::new(build_environment(&registry)),
            registry,
            compiled: Mutex::new(HashMap::new()),
        }
    }

    /// The registry templates are resolved from.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Number of compiled templates currently cached.
    pub fn cached_len(&self) -> usize {
        lock(&self.compiled).len()
    }

    fn environment(&self) -> Arc<Environment<'static>> {
        match self.env.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn compile(&self, entry: &TemplateEntry) -> Result<TemplateHandle, RenderError> {
        if let Some(template) = lock(&self.compiled).get(&entry.identifier) {
            return Ok(template.clone());
        }

        debug!(identifier = %entry.identifier, "compiling template");
        let format = entry.format.as_deref();
        let template: TemplateHandle = match entry.handler {
            Handler::Jinja => {
                let template = MiniJinjaTemplate::from_environment(
                    self.environment(),
                    &entry.identifier,
                    Some(&entry.path),
                    format,
                );
                template.compile()?;
                Arc::new(template)
            }
            Handler::Simple => Arc::new(SimpleTemplate::compile(
                &entry.identifier,
                Some(&entry.path),
                format,
                &entry.content()?,
            )?),
        };

        lock(&self.compiled).insert(entry.identifier.clone(), template.clone());
        Ok(template)
    }
}

fn build_environment(registry: &Arc<TemplateRegistry>) -> Arc<Environment<'static>> {
    let mut env = Environment::new();
    configure_environment(&mut env);

    let registry = Arc::clone(registry);
    env.set_loader(move |name| match registry.get(name) {
        Ok(entry) => entry
            .content()
            .map(Some)
            .map_err(|e| minijinja::Error::new(ErrorKind::InvalidOperation, e.to_string())),
        Err(_) => Ok(None),
    });
    Arc::new(env)
}

impl TemplateLookup for TemplateResolver {
    fn find_template(
        &self,
        path: &str,
        prefixes: &[String],
        partial: bool,
        _locals: &[String],
        details: &LookupDetails,
    ) -> Result<TemplateHandle, RenderError> {
        let name = lookup_name(path, partial);
        for candidate in candidates(&name, prefixes) {
            if let Some(entry) = self.registry.find(&candidate, &details.formats) {
                return self.compile(entry);
            }
        }
        Err(RenderError::MissingTemplate {
            path: path.to_string(),
            prefixes: prefixes.to_vec(),
            partial,
            formats: details.formats.clone(),
        })
    }

    fn template_exists(&self, path: &str, prefixes: &[String], partial: bool) -> bool {
        let name = lookup_name(path, partial);
        candidates(&name, prefixes)
            .iter()
            .any(|candidate| self.registry.contains_path(candidate))
    }

    /// Drops every compiled template so sources are re-read on next lookup.
    fn clear_cache(&self) {
        lock(&self.compiled).clear();
        let env = build_environment(&self.registry);
        match self.env.write() {
            Ok(mut guard) => *guard = env,
            Err(poisoned) => *poisoned.into_inner() = env,
        }
    }
}

impl fmt::Debug for TemplateResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResolver")
            .field("templates", &self.registry.len())
            .field("compiled", &self.cached_len())
            .finish()
    }
}

/// Memo of namespace-merged partial paths, keyed by `(prefix, object path)`.
///
/// Owned by a [`LookupContext`]; cleared explicitly when templates are reloaded.
#[derive(Debug, Default)]
pub struct PrefixedPathCache {
    paths: Mutex<HashMap<(String, String), String>>,
}

impl PrefixedPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized path, computing it with `merge` on first use.
    pub fn fetch(&self, prefix: &str, path: &str, merge: impl FnOnce() -> String) -> String {
        let key = (prefix.to_string(), path.to_string());
        if let Some(merged) = lock(&self.paths).get(&key) {
            return merged.clone();
        }
        let merged = merge();
        lock(&self.paths).insert(key, merged.clone());
        merged
    }

    pub fn len(&self) -> usize {
        lock(&self.paths).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.paths).clear();
    }
}

/// The lookup state of one renderer: where to look and in which formats.
pub struct LookupContext {
    lookup: Arc<dyn TemplateLookup>,
    prefixes: Vec<String>,
    formats: Vec<String>,
    prefixed_paths: PrefixedPathCache,
}

impl LookupContext {
    /// A context with no prefixes, accepting `html`.
    pub fn new(lookup: Arc<dyn TemplateLookup>) -> Self {
        Self {
            lookup,
            prefixes: Vec::new(),
            formats: vec!["html".to_string()],
            prefixed_paths: PrefixedPathCache::new(),
        }
    }

    /// Sets the prefixes bare template names are searched under.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the accepted formats, in preference order.
    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn lookup(&self) -> &Arc<dyn TemplateLookup> {
        &self.lookup
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    pub fn prefixed_paths(&self) -> &PrefixedPathCache {
        &self.prefixed_paths
    }

    /// Finds a template in the context's formats.
    pub fn find_template(
        &self,
        path: &str,
        prefixes: &[String],
        partial: bool,
        locals: &[String],
    ) -> Result<TemplateHandle, RenderError> {
        self.find_template_in(path, prefixes, partial, locals, &self.formats)
    }

    /// Finds a template in explicit formats.
    pub fn find_template_in(
        &self,
        path: &str,
        prefixes: &[String],
        partial: bool,
        locals: &[String],
        formats: &[String],
    ) -> Result<TemplateHandle, RenderError> {
        let details = LookupDetails::new(formats.to_vec());
        self.lookup
            .find_template(path, prefixes, partial, locals, &details)
    }

    pub fn template_exists(&self, path: &str, prefixes: &[String], partial: bool) -> bool {
        self.lookup.template_exists(path, prefixes, partial)
    }
}

impl fmt::Debug for LookupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupContext")
            .field("prefixes", &self.prefixes)
            .field("formats", &self.formats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::View;
    use crate::template::Locals;

    fn resolver(entries: &[(&str, &str)]) -> TemplateResolver {
        TemplateResolver::new(TemplateRegistry::from_embedded_entries(entries))
    }

    fn html() -> LookupDetails {
        LookupDetails::new(vec!["html".into()])
    }

    // =========================================================================
    // Name tests
    // =========================================================================

    #[test]
    fn test_lookup_name() {
        assert_eq!(lookup_name("post", true), "_post");
        assert_eq!(lookup_name("posts/post", true), "posts/_post");
        assert_eq!(lookup_name("posts/_post", true), "posts/_post");
        assert_eq!(lookup_name("_post", true), "_post");
        assert_eq!(lookup_name("posts/index", false), "posts/index");
        assert_eq!(lookup_name("/layouts/app", false), "layouts/app");
    }

    // =========================================================================
    // Resolver tests
    // =========================================================================

    #[test]
    fn test_find_partial_under_prefixes() {
        let resolver = resolver(&[
            ("posts/_post.html.jinja", "posts"),
            ("shared/_post.html.jinja", "shared"),
        ]);
        let prefixes = vec!["admin".to_string(), "shared".to_string(), "posts".to_string()];

        let template = resolver
            .find_template("post", &prefixes, true, &[], &html())
            .unwrap();
        assert_eq!(template.identifier(), "shared/_post.html.jinja");
        assert_eq!(template.virtual_path(), Some("shared/_post"));
        assert_eq!(template.variable(), Some("post"));
        assert_eq!(template.format(), Some("html"));
    }

    #[test]
    fn test_find_missing_reports_search() {
        let resolver = resolver(&[("posts/_post.text.jinja", "x")]);
        let err = resolver
            .find_template("posts/post", &[], true, &[], &html())
            .err()
            .unwrap();
        match err {
            RenderError::MissingTemplate {
                path,
                partial,
                formats,
                ..
            } => {
                assert_eq!(path, "posts/post");
                assert!(partial);
                assert_eq!(formats, vec!["html"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(resolver.template_exists("posts/post", &[], true));
        assert!(!resolver.template_exists("posts/post", &[], false));
    }

    #[test]
    fn test_compiled_cache_and_clear() {
        let resolver = resolver(&[("a.tmpl", "{x}"), ("b.jinja", "{{ x }}")]);
        let first = resolver.find_template("a", &[], false, &[], &html()).unwrap();
        let second = resolver.find_template("a", &[], false, &[], &html()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        resolver.find_template("b", &[], false, &[], &html()).unwrap();
        assert_eq!(resolver.cached_len(), 2);

        resolver.clear_cache();
        assert_eq!(resolver.cached_len(), 0);
        let third = resolver.find_template("a", &[], false, &[], &html()).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn test_jinja_syntax_error_surfaces_at_lookup() {
        let resolver = resolver(&[("broken.jinja", "{% if %}")]);
        let result = resolver.find_template("broken", &[], false, &[], &html());
        assert!(matches!(result, Err(RenderError::Template(_))));
    }

    #[test]
    fn test_jinja_include_resolves_through_registry() {
        let resolver = resolver(&[
            ("pages/show.html.jinja", "[{% include 'pages/_header.html' %}]"),
            ("pages/_header.html.jinja", "{{ title }}"),
        ]);
        let template = resolver
            .find_template("pages/show", &[], false, &[], &html())
            .unwrap();
        let mut locals = Locals::new();
        locals.insert("title".into(), serde_json::json!("Hi"));
        assert_eq!(template.render_to_string(&View::new(), &locals).unwrap(), "[Hi]");
    }

    // =========================================================================
    // Context tests
    // =========================================================================

    #[test]
    fn test_prefixed_path_cache_memoizes() {
        let cache = PrefixedPathCache::new();
        let mut calls = 0;
        let merged = cache.fetch("admin/posts", "posts/post", || {
            calls += 1;
            "admin/posts/post".to_string()
        });
        assert_eq!(merged, "admin/posts/post");
        let again = cache.fetch("admin/posts", "posts/post", || {
            calls += 1;
            String::new()
        });
        assert_eq!(again, "admin/posts/post");
        assert_eq!(calls, 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_context_uses_its_formats() {
        let lookup: Arc<dyn TemplateLookup> = Arc::new(resolver(&[
            ("page.html.jinja", "html"),
            ("page.text.jinja", "text"),
        ]));
        let context = LookupContext::new(lookup).with_formats(["text"]);
        let template = context.find_template("page", &[], false, &[]).unwrap();
        assert_eq!(template.format(), Some("text"));
    }
}
