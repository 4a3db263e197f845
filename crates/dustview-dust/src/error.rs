//! Error types for the template language runtime.

/// Errors produced while compiling, registering or rendering templates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DustError {
    /// The raw markup could not be parsed.
    #[error("syntax error in template '{name}' at line {line}, column {column}: {message}")]
    Syntax {
        name: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// A template (or a partial referenced by one) is not registered.
    #[error("Template Not Found: {0}")]
    TemplateNotFound(String),

    /// A compiled form could not be decoded.
    #[error("invalid compiled template: {0}")]
    InvalidCompiled(String),

    /// Rendering failed for a reason other than a missing template.
    #[error("render error in template '{name}': {message}")]
    Render { name: String, message: String },
}

impl DustError {
    /// Create a render error.
    pub fn render(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_display() {
        let err = DustError::TemplateNotFound("master".to_string());
        assert_eq!(err.to_string(), "Template Not Found: master");
    }

    #[test]
    fn test_syntax_display_has_position() {
        let err = DustError::Syntax {
            name: "t1".into(),
            line: 2,
            column: 5,
            message: "unclosed section".into(),
        };
        let text = err.to_string();
        assert!(text.contains("line 2"));
        assert!(text.contains("column 5"));
        assert!(text.contains("'t1'"));
    }
}
