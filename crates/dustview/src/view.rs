//! The rendering orchestrator.
//!
//! [`DustView`] runs one render per call:
//!
//! 1. Merge the configured static attributes with the caller's model into a
//!    private copy.
//! 2. Read `_TEMPLATE_KEY`; without one the merged model is returned as is.
//! 3. Take the JSON data from `_CONTENT_KEY` (structured) or
//!    `_CONTENT_TEXT_KEY` (pre-serialized text).
//! 4. Resolve the view path and load the template, as a directory batch for
//!    multi-load requests and as a single file otherwise (or when the path
//!    is not a directory).
//! 5. Render, then pass the error channel to the [`ErrorHandler`].
//! 6. Export the markup and the JSON into the model and set the response
//!    charset headers.
//!
//! Nothing is exported unless every step succeeded.

use std::sync::Arc;

use encoding_rs::Encoding;
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{InMemorySourceCache, SourceCache};
use crate::config::ViewConfig;
use crate::engine::TemplateEngine;
use crate::error::DustViewError;
use crate::handler::{encoding_for_label, round_trip, DefaultErrorHandler, ErrorHandler};
use crate::keys;
use crate::load::{DirectoryLoadResult, SingleLoad, TemplateLoader};
use crate::loader::SourceLoader;
use crate::request::{Model, ViewRequest, ViewResponse};
use crate::resolve::{self, PropertySource, ViewPathResolver};

/// Something that renders a model into a response.
pub trait View: Send + Sync {
    /// Renders `model` and returns the output model.
    fn render(
        &self,
        model: &Model,
        request: &ViewRequest,
        response: &mut ViewResponse,
    ) -> Result<Model, DustViewError>;
}

/// Template view backed by a [`TemplateEngine`].
///
/// ```rust
/// use std::sync::Arc;
/// use dustview::{DustView, LoadError, SourceMode, View, ViewConfig, ViewRequest, ViewResponse};
/// use serde_json::json;
///
/// let config = ViewConfig {
///     source_mode: SourceMode::Markup,
///     ..ViewConfig::default()
/// };
/// let view = DustView::builder(config)
///     .source_loader(Arc::new(|_: &str| -> Result<String, LoadError> {
///         Ok("Hello {name} World!".to_string())
///     }))
///     .build()?;
/// view.initialize()?;
///
/// let model = json!({
///     "_TEMPLATE_KEY": "t1",
///     "_VIEW_FILE_PATH": "/hello.html",
///     "_CONTENT_KEY": {"name": "chanwook"},
/// });
/// let mut response = ViewResponse::new();
/// let output = view.render(model.as_object().unwrap(), &ViewRequest::new(), &mut response)?;
///
/// assert_eq!(output["_view"], "Hello chanwook World!");
/// assert_eq!(response.content_type(), Some("text/html;charset=UTF-8"));
/// # Ok::<(), dustview::DustViewError>(())
/// ```
pub struct DustView {
    config: ViewConfig,
    loader: TemplateLoader,
    resolver: ViewPathResolver,
    error_handler: Arc<dyn ErrorHandler>,
    encoding: &'static Encoding,
}

impl DustView {
    pub fn builder(config: ViewConfig) -> DustViewBuilder {
        DustViewBuilder::new(config)
    }

    /// Initializes the engine and preloads the common view path.
    pub fn initialize(&self) -> Result<(), DustViewError> {
        self.loader.engine().initialize()?;
        if let Some(common) = &self.config.common_view_path {
            let result = self.loader.load_common(common)?;
            info!(directory = %common, templates = result.loaded_keys.len(), "preloaded common templates");
        }
        Ok(())
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<TemplateEngine> {
        self.loader.engine()
    }

    pub fn loader(&self) -> &TemplateLoader {
        &self.loader
    }

    /// Loads the template for one request, as a directory batch when
    /// multi-load applies and the path is a directory.
    pub fn load_template_source(
        &self,
        request: &ViewRequest,
        template_key: &str,
        view_path: &str,
        cache_key: &str,
    ) -> Result<(), DustViewError> {
        let refresh = resolve::refresh_requested(request);
        if refresh {
            info!(template_key, "refresh requested, bypassing source cache");
        }

        if resolve::is_multi_load(request, self.config.multi_load) {
            let DirectoryLoadResult { succeeded, .. } =
                self.loader.load_directory(view_path, refresh)?;
            if succeeded {
                return Ok(());
            }
            debug!(template_key, view_path, "multi-load path is not a directory, loading single template");
        }

        self.loader.load_single(&SingleLoad {
            template_key,
            view_path,
            cache_key,
            refresh,
        })?;
        Ok(())
    }

    /// Renders a loaded template and checks the error channel.
    pub fn render_template(&self, template_key: &str, json: &str) -> Result<String, DustViewError> {
        let result = self.loader.engine().render(template_key, json)?;
        self.error_handler
            .handle_error(template_key, &result.error, self.encoding)?;
        Ok(round_trip(&result.output, self.encoding))
    }

    fn json_content(&self, template_key: &str, model: &Model) -> Result<String, DustViewError> {
        if let Some(content) = model.get(keys::CONTENT_KEY).filter(|v| !v.is_null()) {
            return serde_json::to_string(content).map_err(|e| DustViewError::InvalidData {
                template_key: template_key.to_string(),
                message: e.to_string(),
            });
        }

        match model.get(keys::CONTENT_TEXT_KEY) {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(Value::Null) | None => Err(DustViewError::MissingData {
                template_key: template_key.to_string(),
            }),
            Some(_) => Err(DustViewError::InvalidData {
                template_key: template_key.to_string(),
                message: format!("{} must hold JSON text", keys::CONTENT_TEXT_KEY),
            }),
        }
    }

    fn set_response_headers(&self, response: &mut ViewResponse) {
        let charset = &self.config.view_encoding;
        response.add_header("Accept-Charset", charset.as_str());
        response.set_content_type(format!("text/html;charset={charset}"));
        response.set_character_encoding(charset.as_str());
    }
}

impl View for DustView {
    fn render(
        &self,
        model: &Model,
        request: &ViewRequest,
        response: &mut ViewResponse,
    ) -> Result<Model, DustViewError> {
        let mut merged = self.config.static_attributes.clone();
        merged.extend(model.iter().map(|(k, v)| (k.clone(), v.clone())));

        let Some(template_key) = resolve::template_key(&merged).map(str::to_string) else {
            debug!("model has no template key, skipping template rendering");
            return Ok(merged);
        };

        let json = self.json_content(&template_key, &merged)?;
        let view_path = self.resolver.view_path(&merged)?;
        let cache_key =
            self.resolver
                .cache_key_for(&merged, &template_key, self.config.cache_key_strategy)?;

        self.load_template_source(request, &template_key, &view_path, &cache_key)?;
        let markup = self.render_template(&template_key, &json)?;

        self.set_response_headers(response);
        debug!(template_key = %template_key, view_path = %view_path, "rendered view");

        merged.insert(self.config.export_view_key.clone(), Value::String(markup));
        merged.insert(self.config.export_json_key.clone(), Value::String(json));
        Ok(merged)
    }
}

/// Builds a [`DustView`] from a configuration and injected strategies.
///
/// Only the source loader is required. The engine defaults to a dust engine
/// with the configured libraries, the cache to [`InMemorySourceCache`] and
/// the error handler to [`DefaultErrorHandler`].
pub struct DustViewBuilder {
    config: ViewConfig,
    engine: Option<Arc<TemplateEngine>>,
    source_loader: Option<Arc<dyn SourceLoader>>,
    cache: Option<Arc<dyn SourceCache>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    properties: Option<Arc<dyn PropertySource>>,
}

impl DustViewBuilder {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            engine: None,
            source_loader: None,
            cache: None,
            error_handler: None,
            properties: None,
        }
    }

    /// Shares an existing engine between views.
    pub fn engine(mut self, engine: Arc<TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn source_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
        self.source_loader = Some(loader);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn SourceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Property source for `_VIEW_PATH_KEY` lookups.
    pub fn properties(mut self, properties: Arc<dyn PropertySource>) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn build(self) -> Result<DustView, DustViewError> {
        let source_loader = self
            .source_loader
            .ok_or_else(|| DustViewError::config("a source loader is required"))?;
        let encoding = encoding_for_label(&self.config.view_encoding)?;

        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(TemplateEngine::new(self.config.engine.clone())));
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(InMemorySourceCache::new()));
        let loader = TemplateLoader::new(engine, source_loader, cache, self.config.loader_settings());

        let mut resolver = ViewPathResolver::new(self.config.prefix.clone(), self.config.suffix.clone())
            .merge_path(self.config.merge_path);
        if let Some(properties) = self.properties {
            resolver = resolver.with_properties(properties);
        }

        Ok(DustView {
            loader,
            resolver,
            error_handler: self
                .error_handler
                .unwrap_or_else(|| Arc::new(DefaultErrorHandler)),
            encoding,
            config: self.config,
        })
    }
}
