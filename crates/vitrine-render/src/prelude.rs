//! Rendering prelude for convenient imports.
//!
//! This module re-exports the types most renders need, so a view layer can
//! import everything in one line:
//!
//! ```rust
//! use vitrine_render::prelude::*;
//!
//! let renderer = Renderer::from_registry(TemplateRegistry::new());
//! let output = renderer.render(&View::new(), TemplateOptions::plain("ok")).unwrap();
//! assert_eq!(output, "ok");
//! ```

// Entry point and requests
pub use crate::{PartialOptions, RenderOptions, Renderer, TemplateOptions};

// Values and per-render state
pub use crate::{Locals, PartialPathable, Renderable, View};

// Templates and lookup
pub use crate::{Template, TemplateRegistry};

// Layouts and streaming
pub use crate::{LayoutSpec, StreamOutcome, Transport};

// Errors
pub use crate::RenderError;
