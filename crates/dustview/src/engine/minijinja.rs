//! MiniJinja-backed runtime.

use minijinja::{Environment, Value};

use super::library::Library;
use super::runtime::TemplateRuntime;
use crate::error::DustViewError;

/// Runtime for Jinja-syntax templates.
///
/// MiniJinja has no separate compiled artifact, so the compiled form is the
/// validated source text itself.
pub struct MiniJinjaRuntime {
    env: Environment<'static>,
}

impl MiniJinjaRuntime {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Gives access to the environment for registering filters and functions.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for MiniJinjaRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRuntime for MiniJinjaRuntime {
    fn name(&self) -> &'static str {
        "minijinja"
    }

    fn install_library(&mut self, name: &str, library: &Library) -> Result<(), DustViewError> {
        for (key, value) in &library.globals {
            self.env.add_global(key.clone(), Value::from_serialize(value));
        }
        for (partial, source) in &library.partials {
            self.env
                .add_template_owned(partial.clone(), source.clone())
                .map_err(|e| DustViewError::engine_init(name, format!("partial '{partial}': {e}")))?;
        }
        Ok(())
    }

    fn compile(&self, template_key: &str, source: &str) -> Result<String, DustViewError> {
        self.env
            .template_from_str(source)
            .map_err(|e| DustViewError::compile(template_key, e.to_string()))?;
        Ok(source.to_string())
    }

    fn load(&mut self, template_key: &str, compiled: &str) -> Result<(), DustViewError> {
        self.env
            .add_template_owned(template_key.to_string(), compiled.to_string())
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

        let rendered = self
            .env
            .get_template(template_key)
            .and_then(|template| template.render(Value::from_serialize(&data)));
        match rendered {
            Ok(markup) => out.push_str(&markup),
            Err(e) => err.push_str(&e.to_string()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut runtime = MiniJinjaRuntime::new();
        let compiled = runtime.compile("t1", "Hello {{ name }} World!").unwrap();
        runtime.load("t1", &compiled).unwrap();

        let (mut out, mut err) = (String::new(), String::new());
        runtime
            .render("t1", r#"{"name":"chanwook"}"#, &mut out, &mut err)
            .unwrap();
        assert_eq!(out, "Hello chanwook World!");
        assert!(err.is_empty());
    }

    #[test]
    fn test_syntax_error_is_compile_error() {
        let runtime = MiniJinjaRuntime::new();
        let err = runtime.compile("bad", "{% if %}").unwrap_err();
        assert!(matches!(err, DustViewError::Compile { .. }));
    }

    #[test]
    fn test_missing_template_goes_to_error_channel() {
        let mut runtime = MiniJinjaRuntime::new();
        let (mut out, mut err) = (String::new(), String::new());
        runtime.render("nope", "{}", &mut out, &mut err).unwrap();
        assert!(out.is_empty());
        assert!(err.contains("nope"));
    }

    #[test]
    fn test_library_partials_are_includable() {
        let mut runtime = MiniJinjaRuntime::new();
        let library = Library::parse(
            "helpers",
            "globals:\n  site: Example\npartials:\n  footer: \"<i>{{ site }}</i>\"\n",
        )
        .unwrap();
        runtime.install_library("helpers", &library).unwrap();
        runtime
            .load("page", "{{ title }}{% include 'footer' %}")
            .unwrap();

        let (mut out, mut err) = (String::new(), String::new());
        runtime
            .render("page", r#"{"title":"T"}"#, &mut out, &mut err)
            .unwrap();
        assert_eq!(out, "T<i>Example</i>");
    }
}
