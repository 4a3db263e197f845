//! Template registry and renderer.
//!
//! [`Dust`] holds registered templates plus a global context. Rendering walks
//! the syntax tree against a stack of context frames: lookups search from
//! the innermost frame outwards and fall back to the globals.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::ast::{KeyPath, Node, Param, ParamValue, SectionKind, Template};
use crate::error::DustError;
use crate::filters;
use crate::parser;

/// Partials may nest this deep before rendering is aborted.
pub const MAX_PARTIAL_DEPTH: usize = 64;

/// A template registry and renderer.
///
/// # Example
///
/// ```rust
/// use dustview_dust::{compile, Dust};
/// use serde_json::json;
///
/// let mut dust = Dust::new();
/// let compiled = compile("hello", "Hello {name}!").unwrap();
/// dust.load_source(&compiled).unwrap();
///
/// let out = dust.render("hello", &json!({"name": "World"})).unwrap();
/// assert_eq!(out, "Hello World!");
/// ```
#[derive(Debug, Default, Clone)]
pub struct Dust {
    templates: HashMap<String, Arc<Template>>,
    globals: Map<String, Value>,
}

impl Dust {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compiled form under the name it was compiled for.
    ///
    /// Returns the registered name.
    pub fn load_source(&mut self, compiled: &str) -> Result<String, DustError> {
        let template: Template = serde_json::from_str(compiled)
            .map_err(|e| DustError::InvalidCompiled(e.to_string()))?;
        let name = template.name.clone();
        self.templates.insert(name.clone(), Arc::new(template));
        Ok(name)
    }

    /// Registers a compiled form under an explicit name instead of the
    /// name embedded in it.
    pub fn load_source_as(&mut self, name: &str, compiled: &str) -> Result<(), DustError> {
        let template: Template = serde_json::from_str(compiled)
            .map_err(|e| DustError::InvalidCompiled(e.to_string()))?;
        self.templates.insert(name.to_string(), Arc::new(template));
        Ok(())
    }

    /// Parses raw markup and registers it under `name`.
    pub fn register_markup(&mut self, name: &str, source: &str) -> Result<(), DustError> {
        let template = parser::parse(name, source)?;
        self.templates.insert(name.to_string(), Arc::new(template));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.templates.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sets a value visible to every render when no frame defines the key.
    pub fn set_global(&mut self, key: impl Into<String>, value: Value) {
        self.globals.insert(key.into(), value);
    }

    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    /// Renders a registered template with `data` as the base context.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, DustError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| DustError::TemplateNotFound(name.to_string()))?;

        let mut scope = Scope {
            dust: self,
            template: template.name.as_str(),
            frames: vec![Frame {
                value: data.clone(),
                index: None,
            }],
            blocks: HashMap::new(),
            depth: 0,
        };
        collect_blocks(&template.body, &mut scope.blocks);

        let mut out = String::new();
        scope.render_nodes(&template.body, &mut out)?;
        Ok(out)
    }
}

struct Frame {
    value: Value,
    /// `(index, length)` while iterating an array section.
    index: Option<(usize, usize)>,
}

struct Scope<'a> {
    dust: &'a Dust,
    template: &'a str,
    frames: Vec<Frame>,
    blocks: HashMap<&'a str, &'a [Node]>,
    depth: usize,
}

/// Collects `{<name}` definitions; the first definition seen wins, so a
/// calling template overrides the partials it includes.
fn collect_blocks<'a>(nodes: &'a [Node], blocks: &mut HashMap<&'a str, &'a [Node]>) {
    for node in nodes {
        match node {
            Node::InlinePartial { name, body } => {
                blocks.entry(name.as_str()).or_insert(body.as_slice());
                collect_blocks(body, blocks);
            }
            Node::Section {
                body, else_body, ..
            } => {
                collect_blocks(body, blocks);
                collect_blocks(else_body, blocks);
            }
            Node::Block { body, .. } => collect_blocks(body, blocks),
            _ => {}
        }
    }
}

fn resolve<'v>(value: &'v Value, segments: &[String]) -> Option<&'v Value> {
    let mut current = value;
    for part in segments {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) | Value::Object(_) => true,
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

impl<'a> Scope<'a> {
    fn lookup(&self, path: &KeyPath) -> Option<Value> {
        if path.current {
            let head = &self.frames.last()?.value;
            return resolve(head, &path.segments).cloned();
        }

        let (first, rest) = path.segments.split_first()?;
        if rest.is_empty() && (first == "$idx" || first == "$len") {
            let (idx, len) = self.frames.iter().rev().find_map(|f| f.index)?;
            return Some(Value::from(if first == "$idx" { idx } else { len }));
        }

        for frame in self.frames.iter().rev() {
            if let Value::Object(map) = &frame.value {
                if let Some(found) = map.get(first) {
                    return resolve(found, rest).cloned();
                }
            }
        }
        self.dust
            .globals
            .get(first)
            .and_then(|found| resolve(found, rest))
            .cloned()
    }

    fn push_params(&mut self, params: &[Param]) -> bool {
        if params.is_empty() {
            return false;
        }
        let mut map = Map::new();
        for param in params {
            let value = match &param.value {
                ParamValue::Literal(text) => Value::String(text.clone()),
                ParamValue::Path(path) => self.lookup(path).unwrap_or(Value::Null),
            };
            map.insert(param.key.clone(), value);
        }
        self.frames.push(Frame {
            value: Value::Object(map),
            index: None,
        });
        true
    }

    fn render_nodes(&mut self, nodes: &'a [Node], out: &mut String) -> Result<(), DustError> {
        for node in nodes {
            match node {
                Node::Buffer { text } => out.push_str(text),
                Node::Reference { path, filters } => {
                    if let Some(value) = self.lookup(path) {
                        out.push_str(&filters::apply(&value, filters));
                    }
                }
                Node::Section {
                    kind,
                    key,
                    params,
                    body,
                    else_body,
                } => self.render_section(*kind, key, params, body, else_body, out)?,
                Node::Partial {
                    name,
                    context,
                    params,
                } => self.render_partial(name, context.as_ref(), params, out)?,
                Node::Block { name, body } => {
                    let chosen = self.blocks.get(name.as_str()).copied().unwrap_or(body.as_slice());
                    self.render_nodes(chosen, out)?;
                }
                Node::InlinePartial { .. } => {}
            }
        }
        Ok(())
    }

    fn render_section(
        &mut self,
        kind: SectionKind,
        key: &KeyPath,
        params: &[Param],
        body: &'a [Node],
        else_body: &'a [Node],
        out: &mut String,
    ) -> Result<(), DustError> {
        let value = self.lookup(key);
        let pushed = self.push_params(params);

        let result = match kind {
            SectionKind::Section => self.render_section_value(value, body, else_body, out),
            SectionKind::Exists if is_empty(value.as_ref()) => self.render_nodes(else_body, out),
            SectionKind::Exists => self.render_nodes(body, out),
            SectionKind::NotExists if is_empty(value.as_ref()) => self.render_nodes(body, out),
            SectionKind::NotExists => self.render_nodes(else_body, out),
        };

        if pushed {
            self.frames.pop();
        }
        result
    }

    fn render_section_value(
        &mut self,
        value: Option<Value>,
        body: &'a [Node],
        else_body: &'a [Node],
        out: &mut String,
    ) -> Result<(), DustError> {
        match value {
            Some(Value::Array(items)) if !items.is_empty() => {
                let len = items.len();
                for (idx, item) in items.into_iter().enumerate() {
                    self.frames.push(Frame {
                        value: item,
                        index: Some((idx, len)),
                    });
                    let result = self.render_nodes(body, out);
                    self.frames.pop();
                    result?;
                }
                Ok(())
            }
            Some(Value::Bool(true)) => self.render_nodes(body, out),
            Some(value) if is_truthy(&value) => {
                self.frames.push(Frame { value, index: None });
                let result = self.render_nodes(body, out);
                self.frames.pop();
                result
            }
            _ => self.render_nodes(else_body, out),
        }
    }

    fn render_partial(
        &mut self,
        name: &str,
        context: Option<&KeyPath>,
        params: &[Param],
        out: &mut String,
    ) -> Result<(), DustError> {
        if self.depth >= MAX_PARTIAL_DEPTH {
            return Err(DustError::render(
                self.template,
                format!(
                    "partial '{}' nested deeper than {} levels",
                    name, MAX_PARTIAL_DEPTH
                ),
            ));
        }

        let dust = self.dust;
        let template: &'a Template = dust
            .templates
            .get(name)
            .ok_or_else(|| DustError::TemplateNotFound(name.to_string()))?;
        collect_blocks(&template.body, &mut self.blocks);

        let mut pushed = 0;
        if let Some(path) = context {
            let value = self.lookup(path).unwrap_or(Value::Null);
            self.frames.push(Frame { value, index: None });
            pushed += 1;
        }
        if self.push_params(params) {
            pushed += 1;
        }

        let previous = std::mem::replace(&mut self.template, template.name.as_str());
        self.depth += 1;
        let result = self.render_nodes(&template.body, out);
        self.depth -= 1;
        self.template = previous;

        for _ in 0..pushed {
            self.frames.pop();
        }
        result
    }
}
