//! Execution contexts the engine bridge drives.

use std::sync::Arc;

use dustview_dust::Dust;

use super::library::Library;
use crate::error::DustViewError;

/// One template execution context.
///
/// The [`TemplateEngine`](super::TemplateEngine) owns exactly one runtime at a
/// time and serializes every call into it, so implementations need not be
/// reentrant. Rendering problems that a caller can recover from (unknown
/// template, unusable data) are written to `err` and reported as `Ok(())`;
/// an `Err` return means the context itself is broken.
pub trait TemplateRuntime: Send {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Installs a library's globals and partials.
    fn install_library(&mut self, name: &str, library: &Library) -> Result<(), DustViewError>;

    /// Compiles raw markup into this runtime's compiled form. Must not
    /// change what is registered.
    fn compile(&self, template_key: &str, source: &str) -> Result<String, DustViewError>;

    /// Registers a compiled form under `template_key`, replacing any previous
    /// registration for that key.
    fn load(&mut self, template_key: &str, compiled: &str) -> Result<(), DustViewError>;

    /// Renders `template_key` against `json`, appending markup to `out` and
    /// diagnostics to `err`.
    fn render(
        &mut self,
        template_key: &str,
        json: &str,
        out: &mut String,
        err: &mut String,
    ) -> Result<(), DustViewError>;
}

/// Builds a fresh runtime each time the engine (re)initializes.
pub type RuntimeFactory = Arc<dyn Fn() -> Box<dyn TemplateRuntime> + Send + Sync>;

/// Runtime backed by the `dustview-dust` template language.
///
/// Compiled forms name their template; loading registers the template under
/// that embedded name and, when it differs, under the requested key as well.
#[derive(Debug, Default)]
pub struct DustRuntime {
    dust: Dust,
}

impl DustRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dust(&self) -> &Dust {
        &self.dust
    }
}

impl TemplateRuntime for DustRuntime {
    fn name(&self) -> &'static str {
        "dust"
    }

    fn install_library(&mut self, name: &str, library: &Library) -> Result<(), DustViewError> {
        for (key, value) in &library.globals {
            self.dust.set_global(key.clone(), value.clone());
        }
        for (partial, source) in &library.partials {
            self.dust
                .register_markup(partial, source)
                .map_err(|e| DustViewError::engine_init(name, format!("partial '{partial}': {e}")))?;
        }
        Ok(())
    }

    fn compile(&self, template_key: &str, source: &str) -> Result<String, DustViewError> {
        dustview_dust::compile(template_key, source)
            .map_err(|e| DustViewError::compile(template_key, e.to_string()))
    }

    /// Registers under `template_key` only. The name embedded in the
    /// compiled form is ignored so one key never replaces another.
    fn load(&mut self, template_key: &str, compiled: &str) -> Result<(), DustViewError> {
        self.dust
            .load_source_as(template_key, compiled)
            .map_err(|e| DustViewError::compile(template_key, e.to_string()))
    }

    fn render(
        &mut self,
        template_key: &str,
        json: &str,
        out: &mut String,
        err: &mut String,
    ) -> Result<(), DustViewError> {
        let data: serde_json::Value = match serde_json::from_str(json) {
            Ok(data) => data,
            Err(e) => {
                err.push_str(&format!("Invalid JSON data: {e}"));
                return Ok(());
            }
        };

        match self.dust.render(template_key, &data) {
            Ok(markup) => out.push_str(&markup),
            Err(e) => err.push_str(&e.to_string()),
        }
        Ok(())
    }
}
