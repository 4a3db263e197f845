//! Template engine bridge.
//!
//! [`TemplateEngine`] owns the single execution context ([`TemplateRuntime`])
//! and the map of compiled forms it has registered. Every operation locks the
//! engine state for its whole duration; the guard releases the context on
//! every return path, including errors.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize()--> Initialized --compile/load/render--> Initialized
//!                                      ^                 |
//!                                      +--reinitialize()-+
//! ```
//!
//! Operations other than `initialize` fail with
//! [`DustViewError::EngineExecution`] until the engine is initialized.
//!
//! # Registration dedup
//!
//! [`TemplateEngine::load`] is idempotent on `(key, compiled form)`: loading
//! byte-identical text for a key that already holds it returns `false`
//! without touching the runtime. Different text for the same key always
//! re-registers.

mod library;
mod minijinja;
mod runtime;

pub use library::{EngineSettings, Library, LibrarySource, CORE_LIBRARY};
pub use minijinja::MiniJinjaRuntime;
pub use runtime::{DustRuntime, RuntimeFactory, TemplateRuntime};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::DustViewError;
use crate::handler::encoding_for_label;

/// What the runtime produced for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub output: String,
    /// Diagnostics from the runtime's error channel.
    pub error: String,
}

impl RenderOutput {
    pub fn has_error(&self) -> bool {
        !self.error.trim().is_empty()
    }
}

struct EngineState {
    settings: EngineSettings,
    runtime: Option<Box<dyn TemplateRuntime>>,
    compiled_sources: HashMap<String, String>,
}

impl EngineState {
    fn runtime_mut(&mut self) -> Result<&mut Box<dyn TemplateRuntime>, DustViewError> {
        self.runtime
            .as_mut()
            .ok_or_else(|| DustViewError::engine_execution("template engine is not initialized"))
    }

    fn install(&mut self, runtime: Box<dyn TemplateRuntime>) {
        self.runtime = Some(runtime);
        self.compiled_sources.clear();
    }
}

/// The template engine bridge.
///
/// ```rust
/// use dustview::{EngineSettings, TemplateEngine};
///
/// let engine = TemplateEngine::new(EngineSettings::default());
/// engine.initialize()?;
///
/// let compiled = engine.compile("t1", "Hello {name} World!")?;
/// assert!(engine.load("t1", &compiled)?);
/// assert!(!engine.load("t1", &compiled)?);
///
/// let result = engine.render("t1", r#"{"name":"chanwook"}"#)?;
/// assert_eq!(result.output, "Hello chanwook World!");
/// # Ok::<(), dustview::DustViewError>(())
/// ```
pub struct TemplateEngine {
    factory: RuntimeFactory,
    state: Mutex<EngineState>,
}

impl TemplateEngine {
    /// Creates an uninitialized engine backed by [`DustRuntime`].
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_runtime(settings, || -> Box<dyn TemplateRuntime> {
            Box::new(DustRuntime::new())
        })
    }

    /// Creates an uninitialized engine backed by [`MiniJinjaRuntime`].
    pub fn minijinja(settings: EngineSettings) -> Self {
        Self::with_runtime(settings, || -> Box<dyn TemplateRuntime> {
            Box::new(MiniJinjaRuntime::new())
        })
    }

    /// Creates an uninitialized engine whose runtimes come from `factory`.
    pub fn with_runtime<F>(settings: EngineSettings, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TemplateRuntime> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            state: Mutex::new(EngineState {
                settings,
                runtime: None,
                compiled_sources: HashMap::new(),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().runtime.is_some()
    }

    pub fn settings(&self) -> EngineSettings {
        self.state.lock().settings.clone()
    }

    /// Builds a fresh runtime, installs the configured libraries and swaps it in.
    ///
    /// Safe to call again: the previous runtime and every registration made
    /// through it are dropped. If any library fails to install, the engine
    /// keeps its previous runtime.
    pub fn initialize(&self) -> Result<(), DustViewError> {
        let mut state = self.state.lock();
        let runtime = self.build_runtime(&state.settings)?;
        state.install(runtime);
        Ok(())
    }

    /// Replaces the library settings and initializes again.
    pub fn reinitialize(&self, settings: EngineSettings) -> Result<(), DustViewError> {
        let mut state = self.state.lock();
        let runtime = self.build_runtime(&settings)?;
        state.settings = settings;
        state.install(runtime);
        Ok(())
    }

    fn build_runtime(
        &self,
        settings: &EngineSettings,
    ) -> Result<Box<dyn TemplateRuntime>, DustViewError> {
        let encoding = encoding_for_label(&settings.encoding)?;
        let mut runtime = (self.factory)();
        for source in settings.libraries() {
            let name = source.to_string();
            let library = Library::read(source, encoding)?;
            runtime.install_library(&name, &library)?;
            debug!(runtime = runtime.name(), library = %name, "installed library");
        }
        info!(runtime = runtime.name(), "template engine initialized");
        Ok(runtime)
    }

    /// Compiles raw markup. Nothing is registered.
    pub fn compile(&self, template_key: &str, source: &str) -> Result<String, DustViewError> {
        let mut state = self.state.lock();
        state.runtime_mut()?.compile(template_key, source)
    }

    /// Registers a compiled form, returning whether a registration happened.
    pub fn load(&self, template_key: &str, compiled: &str) -> Result<bool, DustViewError> {
        let mut state = self.state.lock();
        let unchanged = state
            .compiled_sources
            .get(template_key)
            .is_some_and(|existing| existing == compiled);
        if unchanged {
            debug!(template_key, "compiled source unchanged, skipping registration");
            return Ok(false);
        }

        state.runtime_mut()?.load(template_key, compiled)?;
        state
            .compiled_sources
            .insert(template_key.to_string(), compiled.to_string());
        info!(template_key, "registered template");
        Ok(true)
    }

    /// Renders a registered template with `json` as its data.
    ///
    /// An unknown key or unparseable JSON is reported through
    /// [`RenderOutput::error`], not as an `Err`.
    pub fn render(&self, template_key: &str, json: &str) -> Result<RenderOutput, DustViewError> {
        let mut state = self.state.lock();
        let mut result = RenderOutput::default();
        state
            .runtime_mut()?
            .render(template_key, json, &mut result.output, &mut result.error)?;
        Ok(result)
    }

    pub fn is_registered(&self, template_key: &str) -> bool {
        self.state.lock().compiled_sources.contains_key(template_key)
    }

    /// Keys registered through [`load`](Self::load) since the last initialization, sorted.
    pub fn registered_keys(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut keys: Vec<String> = state.compiled_sources.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}
