//! View flow: named content slots shared between a template and its layout.
//!
//! A content template stores its markup (and any named sections it provides)
//! into the flow; the layout reads the slots back through its yield points.
//! The slot named [`LAYOUT_SLOT`] holds the main content.
//!
//! Implementations use interior mutability because templates reach the flow
//! from inside engine callbacks, which only hold shared references.
//!
//! | Implementation | Used for |
//! |----------------|----------|
//! | [`OutputFlow`] | Plain renders: a map of slots |
//! | [`ScopedFlow`] | Partial layouts: answers `layout` with the wrapped partial |
//! | streaming task flows | Streamed layouts: a missing slot suspends the layout task |

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RenderError;

/// Slot holding the main content a layout wraps.
pub const LAYOUT_SLOT: &str = "layout";

/// Named single-value store passing content from inner templates to layouts.
///
/// Reads and writes are fallible because a streaming flow may have to hand
/// control to another task to satisfy them, and that handoff can be cancelled.
pub trait ViewFlow: Send + Sync {
    /// Returns the content stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, RenderError>;

    /// Replaces the content stored under `key`.
    fn set(&self, key: &str, value: String) -> Result<(), RenderError>;

    /// Appends to the content stored under `key`, creating the slot if needed.
    fn append(&self, key: &str, value: &str) -> Result<(), RenderError>;

    /// Appends content that a waiting reader may consume immediately.
    ///
    /// Plain flows treat this as [`append`](Self::append); streaming flows
    /// resume a layout suspended on `key`.
    fn provide(&self, key: &str, value: &str) -> Result<(), RenderError> {
        self.append(key, value)
    }

    /// Whether a slot named `key` holds content. Never suspends.
    fn contains(&self, key: &str) -> bool;
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The default flow: a map of slots with no scheduling behaviour.
#[derive(Debug, Default)]
pub struct OutputFlow {
    content: Mutex<HashMap<String, String>>,
}

impl OutputFlow {
    /// Creates an empty flow.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewFlow for OutputFlow {
    fn get(&self, key: &str) -> Result<Option<String>, RenderError> {
        Ok(lock(&self.content).get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), RenderError> {
        lock(&self.content).insert(key.to_string(), value);
        Ok(())
    }

    fn append(&self, key: &str, value: &str) -> Result<(), RenderError> {
        lock(&self.content)
            .entry(key.to_string())
            .or_default()
            .push_str(value);
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        lock(&self.content).contains_key(key)
    }
}

/// Flow seen by a partial layout: `layout` resolves to the wrapped partial's
/// markup, every other slot is delegated to the enclosing flow.
pub struct ScopedFlow {
    parent: Arc<dyn ViewFlow>,
    content: String,
}

impl ScopedFlow {
    pub fn new(parent: Arc<dyn ViewFlow>, content: String) -> Self {
        Self { parent, content }
    }
}

impl ViewFlow for ScopedFlow {
    fn get(&self, key: &str) -> Result<Option<String>, RenderError> {
        if key == LAYOUT_SLOT {
            return Ok(Some(self.content.clone()));
        }
        self.parent.get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<(), RenderError> {
        self.parent.set(key, value)
    }

    fn append(&self, key: &str, value: &str) -> Result<(), RenderError> {
        self.parent.append(key, value)
    }

    fn provide(&self, key: &str, value: &str) -> Result<(), RenderError> {
        self.parent.provide(key, value)
    }

    fn contains(&self, key: &str) -> bool {
        key == LAYOUT_SLOT || self.parent.contains(key)
    }
}

/// Per-render view state handed to every template.
///
/// Cloning a view shares its flow.
#[derive(Clone)]
pub struct View {
    flow: Arc<dyn ViewFlow>,
}

impl View {
    /// Creates a view backed by a fresh [`OutputFlow`].
    pub fn new() -> Self {
        Self::with_flow(Arc::new(OutputFlow::new()))
    }

    /// Creates a view backed by the given flow.
    pub fn with_flow(flow: Arc<dyn ViewFlow>) -> Self {
        Self { flow }
    }

    /// The view's flow.
    pub fn flow(&self) -> &Arc<dyn ViewFlow> {
        &self.flow
    }

    /// Content for a yield point: the named slot, or the main content when
    /// `name` is `None`. Missing slots yield an empty string.
    pub fn layout_for(&self, name: Option<&str>) -> Result<String, RenderError> {
        Ok(self
            .flow
            .get(name.unwrap_or(LAYOUT_SLOT))?
            .unwrap_or_default())
    }

    /// A view whose `layout` slot is `content`, for wrapping a partial.
    pub(crate) fn scoped(&self, content: String) -> View {
        View::with_flow(Arc::new(ScopedFlow::new(self.flow.clone(), content)))
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_flow_set_and_get() {
        let flow = OutputFlow::new();
        assert_eq!(flow.get("title").unwrap(), None);
        assert!(!flow.contains("title"));

        flow.set("title", "Home".into()).unwrap();
        assert_eq!(flow.get("title").unwrap().as_deref(), Some("Home"));
        assert!(flow.contains("title"));

        flow.set("title", "About".into()).unwrap();
        assert_eq!(flow.get("title").unwrap().as_deref(), Some("About"));
    }

    #[test]
    fn test_output_flow_append_and_provide() {
        let flow = OutputFlow::new();
        flow.append("scripts", "<a>").unwrap();
        flow.provide("scripts", "<b>").unwrap();
        assert_eq!(flow.get("scripts").unwrap().as_deref(), Some("<a><b>"));
    }

    #[test]
    fn test_scoped_flow_answers_layout_and_delegates() {
        let parent: Arc<dyn ViewFlow> = Arc::new(OutputFlow::new());
        parent.set("layout", "page body".into()).unwrap();
        parent.set("title", "T".into()).unwrap();

        let scoped = ScopedFlow::new(parent.clone(), "partial body".into());
        assert_eq!(scoped.get("layout").unwrap().as_deref(), Some("partial body"));
        assert_eq!(scoped.get("title").unwrap().as_deref(), Some("T"));

        scoped.append("footer", "f").unwrap();
        assert_eq!(parent.get("footer").unwrap().as_deref(), Some("f"));
        assert_eq!(parent.get("layout").unwrap().as_deref(), Some("page body"));
    }

    #[test]
    fn test_view_layout_for() {
        let view = View::new();
        assert_eq!(view.layout_for(None).unwrap(), "");

        view.flow().set(LAYOUT_SLOT, "main".into()).unwrap();
        view.flow().set("sidebar", "side".into()).unwrap();
        assert_eq!(view.layout_for(None).unwrap(), "main");
        assert_eq!(view.layout_for(Some("sidebar")).unwrap(), "side");
        assert_eq!(view.layout_for(Some("nope")).unwrap(), "");
    }
}
