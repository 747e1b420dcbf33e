//! Partial rendering: a template fragment bound to an object, once or once
//! per element of a collection.
//!
//! ## Objects
//!
//! Values rendered through partials are [`Renderable`]s: serialized data plus
//! the partial path the value renders through by default. Types opt in by
//! implementing [`PartialPathable`]:
//!
//! ```rust
//! use serde::Serialize;
//! use vitrine_render::{PartialPathable, Renderable};
//!
//! #[derive(Serialize)]
//! struct Post { id: u32, title: String }
//!
//! impl PartialPathable for Post {
//!     fn to_partial_path(&self) -> String {
//!         "posts/post".to_string()
//!     }
//! }
//!
//! let post = Renderable::new(&Post { id: 1, title: "Hello".into() }).unwrap();
//! assert_eq!(post.partial_path(), Some("posts/post"));
//! ```
//!
//! ## Collections
//!
//! A collection renders every element with three locals bound:
//!
//! | Local | Value |
//! |-------|-------|
//! | `post` | the element |
//! | `post_counter` | its zero-based index |
//! | `post_iteration` | `{index, size, first, last}` |
//!
//! When elements resolve to different partials the collection is
//! heterogeneous: each distinct partial is looked up once and counters run
//! across the whole collection.

mod base;
mod collection;
mod iteration;
pub mod iterator;
mod object;
pub mod path;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::RenderError;
use crate::template::Locals;

pub use base::PartialRenderer;
pub use collection::CollectionRenderer;
pub use iteration::PartialIteration;
pub use iterator::{CollectionIterator, MixedIterator, PrefetchingIterator, Preloader, UniformIterator};
pub use object::ObjectRenderer;
pub use path::IterationNames;

/// Types that know which partial renders them.
pub trait PartialPathable {
    /// Partial path such as `posts/post`; the basename names the local.
    fn to_partial_path(&self) -> String;

    /// Key for the collection fragment cache. Defaults to the serialized value.
    fn cache_key(&self) -> Option<String> {
        None
    }
}

/// A value that can be bound to a partial.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    value: serde_json::Value,
    partial_path: Option<String>,
    cache_key: Option<String>,
}

impl Renderable {
    /// Serializes `object` together with its partial path and cache key.
    pub fn new<T: Serialize + PartialPathable>(object: &T) -> Result<Self, RenderError> {
        Ok(Self {
            value: serde_json::to_value(object)?,
            partial_path: Some(object.to_partial_path()),
            cache_key: object.cache_key(),
        })
    }

    /// Serializes every element of `objects`.
    pub fn collection<'a, T, I>(objects: I) -> Result<Vec<Self>, RenderError>
    where
        T: Serialize + PartialPathable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        objects.into_iter().map(Self::new).collect()
    }

    /// A bare value, renderable only through an explicit partial.
    pub fn from_value(value: serde_json::Value) -> Self {
        Self {
            value,
            partial_path: None,
            cache_key: None,
        }
    }

    pub fn with_partial_path(mut self, path: impl Into<String>) -> Self {
        self.partial_path = Some(path.into());
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    pub fn partial_path(&self) -> Option<&str> {
        self.partial_path.as_deref()
    }

    /// The partial path, required when no partial was given explicitly.
    ///
    /// # Errors
    ///
    /// [`RenderError::NotRenderable`] if the value has none.
    pub fn to_partial_path(&self) -> Result<&str, RenderError> {
        self.partial_path
            .as_deref()
            .ok_or_else(|| RenderError::NotRenderable {
                value: self.value.to_string(),
            })
    }

    /// Fragment cache key: the explicit key, or the compact serialized value.
    pub fn cache_key(&self) -> String {
        self.cache_key
            .clone()
            .unwrap_or_else(|| self.value.to_string())
    }
}

impl From<serde_json::Value> for Renderable {
    fn from(value: serde_json::Value) -> Self {
        Self::from_value(value)
    }
}

/// Options for one partial render.
///
/// Exactly how the partial is found depends on which of `partial`, `object`
/// and `collection` are set:
///
/// | partial | object | collection | Renders |
/// |---------|--------|------------|---------|
/// | yes | - | - | the partial with `locals` |
/// | yes | yes | - | the partial with the object bound |
/// | - | yes | - | the object's own partial |
/// | yes | - | yes | the partial once per element |
/// | - | - | yes | each element's own partial |
#[derive(Clone, Default)]
pub struct PartialOptions {
    pub partial: Option<String>,
    pub object: Option<Renderable>,
    pub collection: Option<Vec<Renderable>>,
    /// Overrides the local the object (or element) is bound to.
    pub as_variable: Option<String>,
    /// Partial wrapped around every rendered partial.
    pub layout: Option<String>,
    /// Partial rendered once and placed between collection elements.
    pub spacer_template: Option<String>,
    pub locals: Locals,
    /// Use the fragment cache for collection elements.
    pub cached: bool,
    pub preloader: Option<Arc<dyn Preloader>>,
}

impl PartialOptions {
    /// Options rendering the named partial.
    pub fn new(partial: impl Into<String>) -> Self {
        Self {
            partial: Some(partial.into()),
            ..Self::default()
        }
    }

    /// Options rendering an object through its own partial.
    pub fn for_object(object: Renderable) -> Self {
        Self {
            object: Some(object),
            ..Self::default()
        }
    }

    /// Options rendering each element through its own partial.
    pub fn for_collection(collection: Vec<Renderable>) -> Self {
        Self {
            collection: Some(collection),
            ..Self::default()
        }
    }

    pub fn object(mut self, object: Renderable) -> Self {
        self.object = Some(object);
        self
    }

    pub fn collection(mut self, collection: Vec<Renderable>) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn as_variable(mut self, name: impl Into<String>) -> Self {
        self.as_variable = Some(name.into());
        self
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn spacer_template(mut self, spacer: impl Into<String>) -> Self {
        self.spacer_template = Some(spacer.into());
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

    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    pub fn preloader(mut self, preloader: Arc<dyn Preloader>) -> Self {
        self.preloader = Some(preloader);
        self
    }

    /// Names of the locals every render binds.
    pub(crate) fn local_keys(&self, extra: &[&str]) -> Vec<String> {
        self.locals
            .keys()
            .cloned()
            .chain(extra.iter().map(|key| key.to_string()))
            .collect()
    }
}

impl fmt::Debug for PartialOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialOptions")
            .field("partial", &self.partial)
            .field("object", &self.object)
            .field("collection", &self.collection.as_ref().map(Vec::len))
            .field("as_variable", &self.as_variable)
            .field("layout", &self.layout)
            .field("spacer_template", &self.spacer_template)
            .field("locals", &self.locals)
            .field("cached", &self.cached)
            .field("preloader", &self.preloader.is_some())
            .finish()
    }
}
