//! Template syntax tree.
//!
//! The tree is also the compiled form: [`Template`] serializes to a compact
//! JSON document, so two compiled forms are byte-identical exactly when the
//! templates are the same.

use serde::{Deserialize, Serialize};

/// A compiled template: the name it was compiled for and its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub body: Vec<Node>,
}

/// One node of a template body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Node {
    /// Literal text, already whitespace-compressed.
    Buffer { text: String },

    /// `{path|f1|f2}`
    Reference { path: KeyPath, filters: Vec<String> },

    /// `{#key}`, `{?key}` and `{^key}` with an optional `{:else}` body.
    Section {
        kind: SectionKind,
        key: KeyPath,
        params: Vec<Param>,
        body: Vec<Node>,
        else_body: Vec<Node>,
    },

    /// `{>name/}`, `{>name:path/}`, `{>name key=value/}`
    Partial {
        name: String,
        context: Option<KeyPath>,
        params: Vec<Param>,
    },

    /// `{+name}default{/name}`
    Block { name: String, body: Vec<Node> },

    /// `{<name}override{/name}`
    InlinePartial { name: String, body: Vec<Node> },
}

/// Which section sigil opened a [`Node::Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// `#`: iterate arrays, push objects, render truthy values.
    Section,
    /// `?`: render when the value is not empty.
    Exists,
    /// `^`: render when the value is empty.
    NotExists,
}

/// A dotted lookup path such as `user.name`, `.name` or `.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPath {
    /// Lookup starts at the current context head instead of searching outwards.
    pub current: bool,
    pub segments: Vec<String>,
}

impl KeyPath {
    /// The path `.`, the current context head itself.
    pub fn head() -> Self {
        Self {
            current: true,
            segments: Vec::new(),
        }
    }

    /// Source form of the path, used to match closing tags.
    pub fn display(&self) -> String {
        let joined = self.segments.join(".");
        if self.current {
            format!(".{}", joined)
        } else {
            joined
        }
    }
}

/// A `key=value` parameter on a section or partial tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub key: String,
    pub value: ParamValue,
}

/// Parameter value: a quoted literal or a context path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum ParamValue {
    Literal(String),
    Path(KeyPath),
}
