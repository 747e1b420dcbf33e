//! Streaming renders.
//!
//! A streamed render sends the layout to a [`Transport`] while it renders.
//! The content template is deferred until the layout first asks the view
//! flow for a slot that is not there yet, so the head of a page can reach
//! the client before the body has been computed.
//!
//! The layout and the content each run on a scoped thread. The calling
//! thread schedules them and owns the transport. Exactly one of the two
//! renders runs at a time:
//!
//! 1. The layout renders; its output is forwarded chunk by chunk.
//! 2. A read of a missing slot parks the layout. The first park starts the
//!    content render; later parks resume it.
//! 3. The content parks again when it `provide`s the slot the layout waits
//!    for, handing control back to the layout.
//! 4. When the content finishes, its markup fills the `layout` slot and the
//!    layout resumes. Further reads of missing slots return nothing.
//!
//! If the layout never reads a missing slot the content is never rendered.

use std::any::Any;
use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::error::RenderError;
use crate::flow::{lock, View, ViewFlow, LAYOUT_SLOT};
use crate::template::{Locals, TemplateHandle};

use super::template::{TemplateOptions, TemplateRenderer};

/// The receiving end of a stream went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("transport closed")]
pub struct TransportClosed;

/// Destination of streamed chunks.
pub trait Transport {
    /// Sends one chunk. An error means no further chunks will be accepted.
    fn send(&mut self, chunk: &str) -> Result<(), TransportClosed>;

    /// Called once when the stream ends, however it ends.
    fn close(&mut self) {}
}

impl Transport for Vec<String> {
    fn send(&mut self, chunk: &str) -> Result<(), TransportClosed> {
        self.push(chunk.to_string());
        Ok(())
    }
}

impl Transport for Sender<String> {
    fn send(&mut self, chunk: &str) -> Result<(), TransportClosed> {
        Sender::send(self, chunk.to_string()).map_err(|_| TransportClosed)
    }
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Everything was rendered and sent.
    Completed,
    /// A render failed; the completion marker was sent after the partial output.
    Failed,
    /// The transport closed; remaining output was dropped.
    Aborted,
}

/// Messages from the render tasks to the scheduler.
enum Event {
    Chunk(String),
    Waiting(String),
    Provided,
    ContentDone(Result<String, RenderError>),
    LayoutDone(Result<(), RenderError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    Continue,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Layout,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    NotStarted,
    Running,
    Parked,
    Done,
}

#[derive(Debug, Default)]
struct Slots {
    content: HashMap<String, String>,
    waiting_for: Option<String>,
}

/// View flow of one streaming task. Both tasks share the slots; only the
/// layout parks on a missing slot, and only the content parks on `provide`.
struct TaskFlow {
    role: Role,
    slots: Arc<Mutex<Slots>>,
    events: Sender<Event>,
    resume: Mutex<Receiver<Resume>>,
}

impl TaskFlow {
    fn new(
        role: Role,
        slots: Arc<Mutex<Slots>>,
        events: Sender<Event>,
        resume: Receiver<Resume>,
    ) -> Self {
        Self {
            role,
            slots,
            events,
            resume: Mutex::new(resume),
        }
    }

    /// Reports `event` and blocks until the scheduler hands control back.
    fn park(&self, event: Event) -> Result<(), RenderError> {
        let resume = lock(&self.resume);
        self.events
            .send(event)
            .map_err(|_| RenderError::StreamAborted)?;
        match resume.recv() {
            Ok(Resume::Continue) => Ok(()),
            Ok(Resume::Cancel) | Err(_) => Err(RenderError::StreamAborted),
        }
    }
}

impl ViewFlow for TaskFlow {
    fn get(&self, key: &str) -> Result<Option<String>, RenderError> {
        {
            let mut slots = lock(&self.slots);
            if let Some(content) = slots.content.get(key) {
                return Ok(Some(content.clone()));
            }
            if self.role == Role::Content {
                return Ok(None);
            }
            slots.waiting_for = Some(key.to_string());
        }

        let parked = self.park(Event::Waiting(key.to_string()));
        let mut slots = lock(&self.slots);
        slots.waiting_for = None;
        parked?;
        Ok(slots.content.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), RenderError> {
        lock(&self.slots).content.insert(key.to_string(), value);
        Ok(())
    }

    fn append(&self, key: &str, value: &str) -> Result<(), RenderError> {
        lock(&self.slots)
            .content
            .entry(key.to_string())
            .or_default()
            .push_str(value);
        Ok(())
    }

    fn provide(&self, key: &str, value: &str) -> Result<(), RenderError> {
        let awaited = {
            let mut slots = lock(&self.slots);
            slots
                .content
                .entry(key.to_string())
                .or_default()
                .push_str(value);
            slots.waiting_for.as_deref() == Some(key)
        };
        if awaited && self.role == Role::Content {
            self.park(Event::Provided)?;
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        lock(&self.slots).content.contains_key(key)
    }
}

/// Output sink of the layout: every complete UTF-8 run written becomes a chunk.
struct StreamingBuffer {
    events: Sender<Event>,
    pending: Vec<u8>,
}

impl StreamingBuffer {
    fn new(events: Sender<Event>) -> Self {
        Self {
            events,
            pending: Vec::new(),
        }
    }
}

impl io::Write for StreamingBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let complete = match std::str::from_utf8(&self.pending) {
            Ok(text) => text.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        };
        if complete > 0 {
            let rest = self.pending.split_off(complete);
            let chunk = String::from_utf8(std::mem::replace(&mut self.pending, rest))
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.events
                .send(Event::Chunk(chunk))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "stream scheduler gone"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "render task panicked".to_string())
}

fn run_task<T>(task: impl FnOnce() -> Result<T, RenderError>) -> Result<T, RenderError> {
    panic::catch_unwind(AssertUnwindSafe(task))
        .unwrap_or_else(|payload| Err(RenderError::Stream(panic_message(payload.as_ref()))))
}

/// Renders a template and its layout to a [`Transport`].
pub struct StreamingTemplateRenderer<'a> {
    base: TemplateRenderer<'a>,
}

impl<'a> StreamingTemplateRenderer<'a> {
    pub fn new(base: TemplateRenderer<'a>) -> Self {
        Self { base }
    }

    /// Streams the render described by `options`.
    ///
    /// The render streams only when a layout resolves and the template can
    /// suspend. Otherwise the finished body is sent as a single chunk.
    ///
    /// # Errors
    ///
    /// Errors raised before anything is sent (no template source, a missing
    /// template or layout, a failing unstreamed render) are returned. Errors
    /// during streaming are logged and reported as [`StreamOutcome::Failed`].
    pub fn render<T: Transport + ?Sized>(
        &self,
        options: &TemplateOptions,
        transport: &mut T,
    ) -> Result<StreamOutcome, RenderError> {
        let template = self.base.determine_template(options)?;
        let layout = self.base.layout_for(&template, options)?;

        match layout {
            Some(layout) if template.supports_streaming() => {
                Ok(self.stream(&template, &layout, &options.locals, transport))
            }
            layout => {
                let rendered = self.base.render_template(
                    &View::new(),
                    &template,
                    layout.as_ref(),
                    &options.locals,
                )?;
                let outcome = match transport.send(rendered.body()) {
                    Ok(()) => StreamOutcome::Completed,
                    Err(TransportClosed) => StreamOutcome::Aborted,
                };
                transport.close();
                Ok(outcome)
            }
        }
    }

    fn stream<T: Transport + ?Sized>(
        &self,
        template: &TemplateHandle,
        layout: &TemplateHandle,
        locals: &Locals,
        transport: &mut T,
    ) -> StreamOutcome {
        debug!(
            identifier = template.identifier(),
            layout = layout.identifier(),
            "streaming template"
        );

        let slots = Arc::new(Mutex::new(Slots::default()));
        let (events_tx, events) = mpsc::channel();
        let (layout_resume, layout_resume_rx) = mpsc::channel();
        let (content_resume, content_resume_rx) = mpsc::channel();

        let layout_view = View::with_flow(Arc::new(TaskFlow::new(
            Role::Layout,
            slots.clone(),
            events_tx.clone(),
            layout_resume_rx,
        )));
        let mut content_view = Some(View::with_flow(Arc::new(TaskFlow::new(
            Role::Content,
            slots.clone(),
            events_tx.clone(),
            content_resume_rx,
        ))));

        let mut aborted = false;
        let mut failure: Option<RenderError> = None;

        thread::scope(|scope| {
            let layout_events = events_tx.clone();
            scope.spawn(move || {
                let mut output = StreamingBuffer::new(layout_events.clone());
                let result = run_task(|| layout.render(&layout_view, locals, &mut output));
                let _ = layout_events.send(Event::LayoutDone(result));
            });

            let mut content = TaskState::NotStarted;
            let mut layout_waiting = false;
            let mut layout_done = false;

            while !(layout_done && matches!(content, TaskState::NotStarted | TaskState::Done)) {
                let Ok(event) = events.recv() else {
                    break;
                };
                let stopping = aborted || failure.is_some();
                match event {
                    Event::Chunk(chunk) => {
                        if !aborted && transport.send(&chunk).is_err() {
                            warn!(identifier = template.identifier(), "transport closed mid-stream");
                            aborted = true;
                        }
                    }
                    Event::Waiting(key) => {
                        debug!(key = %key, "layout waiting for content");
                        if stopping {
                            let _ = layout_resume.send(Resume::Cancel);
                            continue;
                        }
                        match content {
                            TaskState::NotStarted => {
                                layout_waiting = true;
                                content = TaskState::Running;
                                if let Some(view) = content_view.take() {
                                    let content_events = events_tx.clone();
                                    scope.spawn(move || {
                                        let result =
                                            run_task(|| template.render_to_string(&view, locals));
                                        let _ = content_events.send(Event::ContentDone(result));
                                    });
                                }
                            }
                            TaskState::Parked => {
                                layout_waiting = true;
                                content = TaskState::Running;
                                let _ = content_resume.send(Resume::Continue);
                            }
                            TaskState::Running => layout_waiting = true,
                            TaskState::Done => {
                                let _ = layout_resume.send(Resume::Continue);
                            }
                        }
                    }
                    Event::Provided => {
                        content = TaskState::Parked;
                        layout_waiting = false;
                        let resume = if stopping { Resume::Cancel } else { Resume::Continue };
                        let _ = layout_resume.send(resume);
                    }
                    Event::ContentDone(result) => {
                        content = TaskState::Done;
                        match result {
                            Ok(markup) => {
                                lock(&slots).content.insert(LAYOUT_SLOT.to_string(), markup);
                            }
                            Err(err) if !stopping => {
                                log_failure(template, &err);
                                failure = Some(err);
                            }
                            Err(_) => {}
                        }
                        if layout_waiting {
                            layout_waiting = false;
                            let resume = if aborted || failure.is_some() {
                                Resume::Cancel
                            } else {
                                Resume::Continue
                            };
                            let _ = layout_resume.send(resume);
                        }
                    }
                    Event::LayoutDone(result) => {
                        layout_done = true;
                        if let Err(err) = result {
                            if !stopping {
                                log_failure(layout, &err);
                                failure = Some(err);
                            }
                        }
                        if content == TaskState::Parked {
                            content = TaskState::Running;
                            let resume = if aborted || failure.is_some() {
                                Resume::Cancel
                            } else {
                                Resume::Continue
                            };
                            let _ = content_resume.send(resume);
                        }
                    }
                }
            }
        });

        let outcome = if aborted {
            StreamOutcome::Aborted
        } else if failure.is_some() {
            let marker = &self.base.config().streaming_completion_on_exception;
            if transport.send(marker).is_err() {
                StreamOutcome::Aborted
            } else {
                StreamOutcome::Failed
            }
        } else {
            StreamOutcome::Completed
        };
        transport.close();
        debug!(?outcome, "stream finished");
        outcome
    }
}

fn log_failure(template: &TemplateHandle, err: &RenderError) {
    error!(
        identifier = template.identifier(),
        virtual_path = template.virtual_path(),
        error = %err,
        "streaming render failed"
    );
}
