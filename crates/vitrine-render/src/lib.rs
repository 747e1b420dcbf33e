//! # Vitrine Render - Partials, Layouts and Streamed Pages
//!
//! `vitrine-render` renders view templates the way server-side web frameworks
//! do: a page template wrapped in a layout, partials bound to objects, whole
//! collections rendered through per-element partials, a fragment cache in
//! front of collection renders, and layouts streamed to the client while the
//! page body is still being computed.
//!
//! ## Core Concepts
//!
//! - [`Renderer`]: Entry point dispatching template and partial renders
//! - [`TemplateOptions`] / [`PartialOptions`]: What to render and how
//! - [`Template`]: A compiled template; [`TemplateRegistry`] holds their sources
//! - [`TemplateLookup`]: Resolves names to templates ([`TemplateResolver`] is the default)
//! - [`View`]: Per-render state; its flow carries content from pages to layouts
//! - [`Renderable`] / [`PartialPathable`]: Values that know their own partial
//! - [`FragmentCache`]: Store for rendered collection elements ([`MemoryCache`])
//! - [`Transport`]: Receives streamed chunks
//!
//! ## Quick Start
//!
//! ```rust
//! use vitrine_render::{Locals, SimpleTemplate, Template, View};
//!
//! let template = SimpleTemplate::compile("greeting", None, Some("text"), "Hello, {name}!").unwrap();
//!
//! let mut locals = Locals::new();
//! locals.insert("name".into(), "world".into());
//!
//! let output = template.render_to_string(&View::new(), &locals).unwrap();
//! assert_eq!(output, "Hello, world!");
//! ```
//!
//! ## Template Names
//!
//! Registered templates are named `path.format.handler`. The format is
//! optional; the handler extension picks the template language:
//!
//! ```rust
//! use vitrine_render::template::{parse_template_name, Handler};
//!
//! let (path, format, handler) = parse_template_name("posts/_post.html.jinja").unwrap();
//! assert_eq!(path, "posts/_post");
//! assert_eq!(format.as_deref(), Some("html"));
//! assert_eq!(handler, Handler::Jinja);
//! ```
//!
//! Partials live next to the templates that use them, with a leading
//! underscore: rendering partial `post` under prefix `posts` finds
//! `posts/_post`.
//!
//! ## Collections
//!
//! ```rust
//! use serde::Serialize;
//! use vitrine_render::{PartialOptions, PartialPathable, Renderable, Renderer, TemplateRegistry, View};
//!
//! #[derive(Serialize)]
//! struct Post { title: String }
//!
//! impl PartialPathable for Post {
//!     fn to_partial_path(&self) -> String {
//!         "posts/post".into()
//!     }
//! }
//!
//! let registry = TemplateRegistry::from_embedded_entries(&[(
//!     "posts/_post.html.jinja",
//!     "{{ post_counter }}:{{ post.title }};",
//! )]);
//! let renderer = Renderer::from_registry(registry);
//!
//! let posts = [Post { title: "a".into() }, Post { title: "b".into() }];
//! let options = PartialOptions::for_collection(Renderable::collection(&posts).unwrap());
//!
//! let output = renderer.render(&View::new(), options).unwrap();
//! assert_eq!(output, "0:a;1:b;");
//! ```
//!
//! ## Configuration
//!
//! [`RenderConfig`] holds process-wide settings and can be loaded from YAML:
//!
//! ```rust
//! use vitrine_render::RenderConfig;
//!
//! let config = RenderConfig::from_yaml("perform_caching: false\nlayout_prefix: shells\n").unwrap();
//! assert!(!config.perform_caching);
//! assert_eq!(config.layout_prefix, "shells");
//! ```

mod cache;
mod config;
mod error;
mod flow;
mod lookup;
pub mod partial;
pub mod prelude;
mod rendered;
mod renderer;
pub mod template;

// Error type
pub use error::{IdentifierKind, RenderError};

// Configuration
pub use config::{RenderConfig, DEFAULT_STREAMING_COMPLETION};

// View state
pub use flow::{OutputFlow, ScopedFlow, View, ViewFlow, LAYOUT_SLOT};

// Template lookup
pub use lookup::{
    lookup_name, LookupContext, LookupDetails, PrefixedPathCache, TemplateLookup,
    TemplateResolver,
};

// Fragment cache
pub use cache::{FragmentCache, MemoryCache};

// Render results
pub use rendered::{Rendered, RenderedCollection, RenderedTemplate};

// Partials
pub use partial::{
    CollectionIterator, CollectionRenderer, IterationNames, MixedIterator, ObjectRenderer,
    PartialIteration, PartialOptions, PartialPathable, PartialRenderer, PrefetchingIterator,
    Preloader, Renderable, UniformIterator,
};

// Template and streaming renderers
pub use renderer::{
    LayoutFn, LayoutSpec, RenderOptions, Renderer, StreamOutcome, StreamingTemplateRenderer,
    TemplateOptions, TemplateRenderer, Transport, TransportClosed,
};

// Templates
pub use template::{
    Handler, LiteralTemplate, Locals, MiniJinjaTemplate, SimpleTemplate, Template,
    TemplateHandle, TemplateRegistry,
};
