//! Strategies for walking a collection with per-element naming info.
//!
//! | Iterator | Naming |
//! |----------|--------|
//! | [`UniformIterator`] | one partial path and one set of names for every element |
//! | [`MixedIterator`] | a path and names per element, computed before iterating |
//! | [`PrefetchingIterator`] | wraps either, preloading the collection on first walk |

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::RenderError;

use super::path::IterationNames;
use super::Renderable;

/// Visitor called with each element and the names it renders under.
pub type Visit<'v> = dyn FnMut(&Renderable, &IterationNames) -> Result<(), RenderError> + 'v;

/// A collection paired with the partial naming of its elements.
pub trait CollectionIterator: Send {
    /// Number of elements.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements, in order.
    fn collection(&self) -> &[Renderable];

    /// Mutable access to the elements, for preloading.
    fn collection_mut(&mut self) -> &mut [Renderable];

    /// A new iterator over `collection` sharing this one's naming.
    fn from_collection(&self, collection: Vec<Renderable>) -> Box<dyn CollectionIterator>;

    /// Visits each element with its names, stopping at the first error.
    fn each_with_info(&mut self, visit: &mut Visit<'_>) -> Result<(), RenderError>;
}

/// Every element renders through the same partial.
#[derive(Debug, Clone)]
pub struct UniformIterator {
    collection: Vec<Renderable>,
    names: IterationNames,
}

impl UniformIterator {
    pub fn new(collection: Vec<Renderable>, names: IterationNames) -> Self {
        Self { collection, names }
    }

    pub fn names(&self) -> &IterationNames {
        &self.names
    }
}

impl CollectionIterator for UniformIterator {
    fn len(&self) -> usize {
        self.collection.len()
    }

    fn collection(&self) -> &[Renderable] {
        &self.collection
    }

    fn collection_mut(&mut self) -> &mut [Renderable] {
        &mut self.collection
    }

    fn from_collection(&self, collection: Vec<Renderable>) -> Box<dyn CollectionIterator> {
        Box::new(Self::new(collection, self.names.clone()))
    }

    fn each_with_info(&mut self, visit: &mut Visit<'_>) -> Result<(), RenderError> {
        for object in &self.collection {
            visit(object, &self.names)?;
        }
        Ok(())
    }
}

/// Each element renders through its own partial.
///
/// Names are paired with elements by position; a collection swapped in
/// through [`from_collection`](CollectionIterator::from_collection) reuses
/// them at the same positions.
#[derive(Debug, Clone)]
pub struct MixedIterator {
    collection: Vec<Renderable>,
    names: Vec<IterationNames>,
}

impl MixedIterator {
    pub fn new(collection: Vec<Renderable>, names: Vec<IterationNames>) -> Self {
        Self { collection, names }
    }

    /// Distinct partial paths, in first-seen order.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for names in &self.names {
            if !paths.contains(&names.path.as_str()) {
                paths.push(&names.path);
            }
        }
        paths
    }
}

impl CollectionIterator for MixedIterator {
    fn len(&self) -> usize {
        self.collection.len()
    }

    fn collection(&self) -> &[Renderable] {
        &self.collection
    }

    fn collection_mut(&mut self) -> &mut [Renderable] {
        &mut self.collection
    }

    fn from_collection(&self, collection: Vec<Renderable>) -> Box<dyn CollectionIterator> {
        Box::new(Self::new(collection, self.names.clone()))
    }

    fn each_with_info(&mut self, visit: &mut Visit<'_>) -> Result<(), RenderError> {
        for (object, names) in self.collection.iter().zip(&self.names) {
            visit(object, names)?;
        }
        Ok(())
    }
}

/// Bulk loader for collections whose elements are fetched lazily.
///
/// A collection render that would otherwise trigger one load per element
/// hands the whole collection over once instead.
pub trait Preloader: Send + Sync {
    /// Whether the collection is already materialized.
    fn is_loaded(&self, collection: &[Renderable]) -> bool;

    /// Loads every element in one pass.
    fn preload(&self, collection: &mut [Renderable]) -> Result<(), RenderError>;
}

/// Preloads the wrapped collection the first time it is walked.
pub struct PrefetchingIterator {
    inner: Box<dyn CollectionIterator>,
    preloader: Arc<dyn Preloader>,
    prefetched: bool,
}

impl PrefetchingIterator {
    pub fn new(inner: Box<dyn CollectionIterator>, preloader: Arc<dyn Preloader>) -> Self {
        Self {
            inner,
            preloader,
            prefetched: false,
        }
    }

    fn prefetch(&mut self) -> Result<(), RenderError> {
        if self.prefetched {
            return Ok(());
        }
        self.prefetched = true;
        if !self.preloader.is_loaded(self.inner.collection()) {
            debug!(count = self.inner.len(), "preloading collection");
            self.preloader.preload(self.inner.collection_mut())?;
        }
        Ok(())
    }
}

impl CollectionIterator for PrefetchingIterator {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn collection(&self) -> &[Renderable] {
        self.inner.collection()
    }

    fn collection_mut(&mut self) -> &mut [Renderable] {
        self.inner.collection_mut()
    }

    fn from_collection(&self, collection: Vec<Renderable>) -> Box<dyn CollectionIterator> {
        Box::new(Self::new(
            self.inner.from_collection(collection),
            Arc::clone(&self.preloader),
        ))
    }

    fn each_with_info(&mut self, visit: &mut Visit<'_>) -> Result<(), RenderError> {
        self.prefetch()?;
        self.inner.each_with_info(visit)
    }
}

impl fmt::Debug for PrefetchingIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefetchingIterator")
            .field("len", &self.inner.len())
            .field("prefetched", &self.prefetched)
            .finish()
    }
}
