#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vitrine_render::{
    LookupDetails, Locals, RenderError, Renderer, Template, TemplateHandle, TemplateLookup,
    TemplateRegistry, TemplateResolver, Transport, TransportClosed, View,
};

/// Shared render counter.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wraps a template and counts how often it renders.
pub struct CountingTemplate {
    inner: TemplateHandle,
    renders: Counter,
}

impl CountingTemplate {
    pub fn wrap(inner: TemplateHandle, renders: Counter) -> TemplateHandle {
        Arc::new(Self { inner, renders })
    }
}

impl Template for CountingTemplate {
    fn identifier(&self) -> &str {
        self.inner.identifier()
    }

    fn virtual_path(&self) -> Option<&str> {
        self.inner.virtual_path()
    }

    fn variable(&self) -> Option<&str> {
        self.inner.variable()
    }

    fn format(&self) -> Option<&str> {
        self.inner.format()
    }

    fn supports_streaming(&self) -> bool {
        self.inner.supports_streaming()
    }

    fn render(&self, view: &View, locals: &Locals, out: &mut dyn io::Write) -> Result<(), RenderError> {
        self.renders.bump();
        self.inner.render(view, locals, out)
    }
}

/// Lookup whose templates all count into one counter.
pub struct CountingLookup {
    inner: TemplateResolver,
    pub renders: Counter,
    pub lookups: Counter,
}

impl TemplateLookup for CountingLookup {
    fn find_template(
        &self,
        path: &str,
        prefixes: &[String],
        partial: bool,
        locals: &[String],
        details: &LookupDetails,
    ) -> Result<TemplateHandle, RenderError> {
        self.lookups.bump();
        let template = self
            .inner
            .find_template(path, prefixes, partial, locals, details)?;
        Ok(CountingTemplate::wrap(template, self.renders.clone()))
    }

    fn template_exists(&self, path: &str, prefixes: &[String], partial: bool) -> bool {
        self.inner.template_exists(path, prefixes, partial)
    }
}

/// A renderer over embedded templates, plus its render and lookup counters.
pub fn counting_renderer(entries: &[(&str, &str)]) -> (Renderer, Counter, Counter) {
    let renders = Counter::default();
    let lookups = Counter::default();
    let lookup = CountingLookup {
        inner: TemplateResolver::new(TemplateRegistry::from_embedded_entries(entries)),
        renders: renders.clone(),
        lookups: lookups.clone(),
    };
    (Renderer::new(Arc::new(lookup)), renders, lookups)
}

/// A template that always fails.
pub struct FailingTemplate;

impl Template for FailingTemplate {
    fn identifier(&self) -> &str {
        "failing.tmpl"
    }

    fn virtual_path(&self) -> Option<&str> {
        Some("failing")
    }

    fn variable(&self) -> Option<&str> {
        None
    }

    fn format(&self) -> Option<&str> {
        Some("html")
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    fn render(&self, _view: &View, _locals: &Locals, _out: &mut dyn io::Write) -> Result<(), RenderError> {
        Err(RenderError::Template("undefined method for nil".to_string()))
    }
}

/// Records every chunk with the content render count at the time it arrived.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub chunks: Vec<(String, usize)>,
    pub renders: Counter,
    pub closed: bool,
    /// Number of chunks accepted before the transport reports itself closed.
    pub capacity: Option<usize>,
}

impl RecordingTransport {
    pub fn new(renders: Counter) -> Self {
        Self {
            renders,
            ..Self::default()
        }
    }

    pub fn with_capacity(renders: Counter, capacity: usize) -> Self {
        Self {
            renders,
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn body(&self) -> String {
        self.chunks.iter().map(|(chunk, _)| chunk.as_str()).collect()
    }

    /// Position of the first chunk containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.chunks.iter().position(|(chunk, _)| chunk.contains(needle))
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, chunk: &str) -> Result<(), TransportClosed> {
        if self.capacity.is_some_and(|capacity| self.chunks.len() >= capacity) {
            return Err(TransportClosed);
        }
        self.chunks.push((chunk.to_string(), self.renders.get()));
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
