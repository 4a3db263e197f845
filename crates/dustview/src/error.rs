//! Error types for the view pipeline.

use crate::loader::LoadError;

/// Errors raised by the engine bridge, the loaders and the view orchestrator.
///
/// Every failure that reaches the caller of [`View::render`](crate::View::render)
/// is one of these variants. Template key and path context travel with the
/// error; the underlying cause is kept as the `source` where one exists.
#[derive(Debug, thiserror::Error)]
pub enum DustViewError {
    /// A runtime library resource could not be located or installed.
    #[error("Failed to initialize template engine with library '{library}': {reason}")]
    EngineInit { library: String, reason: String },

    /// The runtime rejected template markup or a compiled form.
    #[error("Failed to compile template '{template_key}': {message}")]
    Compile {
        template_key: String,
        message: String,
    },

    /// The source loader could not fetch a template.
    #[error("Failed to load template '{template_key}' from '{path}'")]
    TemplateLoad {
        template_key: String,
        path: String,
        #[source]
        source: LoadError,
    },

    /// A directory resource existed but could not be enumerated.
    #[error("Failed to list template directory '{path}'")]
    Directory {
        path: String,
        #[source]
        source: LoadError,
    },

    /// None of the view path attributes were present in the model.
    #[error("View path is required: set _VIEW_PATH_OVERRIDE, _VIEW_FILE_PATH or _VIEW_PATH_KEY")]
    MissingViewPath,

    /// A named view path lookup key had no value in the property source.
    #[error("View path property '{key}' could not be resolved")]
    UnresolvedViewPathKey { key: String },

    /// The model carried neither structured nor pre-serialized JSON content.
    #[error("JSON content is required for template '{template_key}'")]
    MissingData { template_key: String },

    /// The model's JSON content could not be used.
    #[error("Invalid JSON content for template '{template_key}': {message}")]
    InvalidData {
        template_key: String,
        message: String,
    },

    /// The runtime wrote diagnostics to its error channel.
    #[error("Error while rendering template '{template_key}': {message}")]
    Render {
        template_key: String,
        message: String,
    },

    /// The execution context itself is unusable.
    #[error("Template engine execution failed: {message}")]
    EngineExecution { message: String },

    /// Invalid configuration value.
    #[error("Invalid view configuration: {0}")]
    Config(String),
}

impl DustViewError {
    pub fn engine_init(library: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EngineInit {
            library: library.into(),
            reason: reason.into(),
        }
    }

    pub fn compile(template_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            template_key: template_key.into(),
            message: message.into(),
        }
    }

    pub fn engine_execution(message: impl Into<String>) -> Self {
        Self::EngineExecution {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The template key this error is about, when it is tied to one template.
    pub fn template_key(&self) -> Option<&str> {
        match self {
            Self::Compile { template_key, .. }
            | Self::TemplateLoad { template_key, .. }
            | Self::MissingData { template_key }
            | Self::InvalidData { template_key, .. }
            | Self::Render { template_key, .. } => Some(template_key),
            _ => None,
        }
    }
}
