//! # dustview - Server-side Template Views
//!
//! `dustview` renders HTML views from logic-less dust templates bound to JSON
//! models. It sits between a web framework and a template runtime:
//!
//! ```text
//! DustView::render
//!   -> ViewPathResolver       (template key, view path, cache key)
//!   -> TemplateLoader         (single file or whole directory)
//!        -> SourceCache / SourceLoader
//!        -> TemplateEngine::compile / load
//!   -> TemplateEngine::render (output + error channel)
//!   -> ErrorHandler
//! ```
//!
//! ## Core Concepts
//!
//! - [`TemplateEngine`]: owns the single execution context. `load` is
//!   idempotent per `(key, compiled text)`.
//! - [`SourceCache`]: raw template text by cache key, either full text
//!   ([`InMemorySourceCache`]) or presence only ([`PresenceSourceCache`]).
//! - [`SourceLoader`]: where template text comes from: files
//!   ([`FileSystemLoader`]), HTTP (`HttpLoader`, feature `http`) or a closure.
//! - [`TemplateLoader`]: cache-aware single and directory loading.
//! - [`DustView`]: the per-request orchestrator, configured by [`ViewConfig`].
//!
//! ## Model keys
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `_TEMPLATE_KEY` | template to render; absent means "not a template view" |
//! | `_VIEW_PATH_OVERRIDE` | full view path, used verbatim |
//! | `_VIEW_FILE_PATH` | base path, wrapped in prefix and suffix |
//! | `_VIEW_PATH_KEY` | property name whose value is the base path |
//! | `_CONTENT_KEY` / `_CONTENT_TEXT_KEY` | JSON data, structured or as text |
//!
//! Rendered markup is exported under `_view` and the bound JSON under
//! `_json` (both configurable). A request parameter `_refresh=Y` bypasses
//! the source cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dustview::{DustView, FileSystemLoader, View, ViewConfig, ViewRequest, ViewResponse};
//! use serde_json::json;
//!
//! let config = ViewConfig::from_yaml("prefix: /template\nsuffix: .html\nsource_mode: markup\n")?;
//! let view = DustView::builder(config)
//!     .source_loader(Arc::new(FileSystemLoader::new("./views")))
//!     .build()?;
//! view.initialize()?;
//!
//! let model = json!({
//!     "_TEMPLATE_KEY": "order_list",
//!     "_VIEW_FILE_PATH": "/order/list",
//!     "_CONTENT_KEY": {"orders": []},
//! });
//! let mut response = ViewResponse::new();
//! let output = view.render(model.as_object().unwrap(), &ViewRequest::new(), &mut response)?;
//! println!("{}", output["_view"]);
//! # Ok::<(), dustview::DustViewError>(())
//! ```

pub mod cache;
pub mod config;
pub mod engine;
mod error;
pub mod handler;
pub mod keys;
pub mod load;
pub mod loader;
mod request;
pub mod resolve;
mod view;

pub use cache::{InMemorySourceCache, PresenceSourceCache, SourceCache};
pub use config::ViewConfig;
pub use engine::{
    DustRuntime, EngineSettings, Library, LibrarySource, MiniJinjaRuntime, RenderOutput,
    TemplateEngine, TemplateRuntime,
};
pub use error::DustViewError;
pub use handler::{DefaultErrorHandler, ErrorHandler};
pub use load::{DirectoryLoadResult, LoaderSettings, SingleLoad, SourceMode, TemplateLoader};
#[cfg(feature = "http")]
pub use loader::HttpLoader;
pub use loader::{FileSystemLoader, LoadError, SourceLoader};
pub use request::{Model, ViewRequest, ViewResponse};
pub use resolve::{cache_key, CacheKeyStrategy, PropertySource, ViewPathResolver, YamlProperties};
pub use view::{DustView, DustViewBuilder, View};
