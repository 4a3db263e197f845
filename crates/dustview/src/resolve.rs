//! View path and cache key resolution.
//!
//! The view path for a render comes from the model, first match wins:
//!
//! 1. `_VIEW_PATH_OVERRIDE`: used verbatim.
//! 2. `_VIEW_FILE_PATH`: composed as `prefix + path + suffix`.
//! 3. `_VIEW_PATH_KEY`: looked up in a [`PropertySource`], then composed
//!    like (2).
//!
//! Composition can be switched off with [`ViewPathResolver::merge_path`], in
//! which case base paths are used as they are.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DustViewError;
use crate::keys;
use crate::request::{Model, ViewRequest};

/// Which identity the raw source cache uses for a template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyStrategy {
    /// Cache under the template key.
    #[default]
    TemplateKey,
    /// Cache under the normalized view path, so different template keys
    /// backed by the same file share one entry.
    ViewPath,
}

/// Resolves named properties to values.
pub trait PropertySource: Send + Sync {
    fn property(&self, key: &str) -> Option<String>;
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// A property source with no properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProperties;

impl PropertySource for NoProperties {
    fn property(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Properties read from a YAML document.
///
/// Nested mappings are flattened with `.`, so
///
/// ```yaml
/// view:
///   order:
///     list: /orders/list
/// ```
///
/// provides `view.order.list`. Sequence items are addressed by index.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct YamlProperties {
    values: HashMap<String, String>,
}

impl YamlProperties {
    pub fn from_yaml(text: &str) -> Result<Self, DustViewError> {
        let document: serde_yaml::Value = serde_yaml::from_str(text)
            .map_err(|e| DustViewError::config(format!("invalid properties: {e}")))?;
        let mut values = HashMap::new();
        flatten(None, &document, &mut values);
        Ok(Self { values })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DustViewError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            DustViewError::config(format!("failed to read properties '{}': {e}", path.display()))
        })?;
        Self::from_yaml(&text)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertySource for YamlProperties {
    fn property(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn flatten(prefix: Option<&str>, value: &serde_yaml::Value, out: &mut HashMap<String, String>) {
    let join = |segment: &str| match prefix {
        Some(prefix) => format!("{prefix}.{segment}"),
        None => segment.to_string(),
    };

    match value {
        serde_yaml::Value::Mapping(mapping) => {
            for (key, child) in mapping {
                if let Some(segment) = scalar_text(key) {
                    flatten(Some(&join(&segment)), child, out);
                }
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(Some(&join(&index.to_string())), child, out);
            }
        }
        serde_yaml::Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
        scalar => {
            if let (Some(key), Some(text)) = (prefix, scalar_text(scalar)) {
                out.insert(key.to_string(), text);
            }
        }
    }
}

fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

enum BasePath<'a> {
    Override(&'a str),
    Base(String),
}

/// Resolves view paths and cache keys from a model.
#[derive(Clone)]
pub struct ViewPathResolver {
    prefix: String,
    suffix: String,
    merge_path: bool,
    properties: Arc<dyn PropertySource>,
}

impl Default for ViewPathResolver {
    fn default() -> Self {
        Self::new("", "")
    }
}

impl ViewPathResolver {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            merge_path: true,
            properties: Arc::new(NoProperties),
        }
    }

    pub fn with_properties(mut self, properties: Arc<dyn PropertySource>) -> Self {
        self.properties = properties;
        self
    }

    /// Whether base paths are wrapped in the prefix and suffix.
    pub fn merge_path(mut self, merge: bool) -> Self {
        self.merge_path = merge;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Resolves the view path to load for `model`.
    pub fn view_path(&self, model: &Model) -> Result<String, DustViewError> {
        Ok(match self.base_path(model)? {
            BasePath::Override(path) => path.to_string(),
            BasePath::Base(base) => self.compose(&base),
        })
    }

    /// Resolves the raw source cache key for `model`.
    pub fn cache_key_for(
        &self,
        model: &Model,
        template_key: &str,
        strategy: CacheKeyStrategy,
    ) -> Result<String, DustViewError> {
        match strategy {
            CacheKeyStrategy::TemplateKey => Ok(template_key.to_string()),
            CacheKeyStrategy::ViewPath => Ok(match self.base_path(model)? {
                BasePath::Override(path) => cache_key(path, ""),
                BasePath::Base(base) => cache_key(&base, &self.suffix),
            }),
        }
    }

    fn compose(&self, base: &str) -> String {
        if self.merge_path {
            format!("{}{}{}", self.prefix, base, self.suffix)
        } else {
            base.to_string()
        }
    }

    fn base_path<'m>(&self, model: &'m Model) -> Result<BasePath<'m>, DustViewError> {
        if let Some(path) = non_blank(model, keys::VIEW_PATH_OVERRIDE) {
            return Ok(BasePath::Override(path));
        }
        if let Some(base) = non_blank(model, keys::VIEW_FILE_PATH) {
            return Ok(BasePath::Base(base.to_string()));
        }
        if let Some(lookup) = non_blank(model, keys::VIEW_PATH_KEY) {
            let base = self
                .properties
                .property(lookup)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| DustViewError::UnresolvedViewPathKey {
                    key: lookup.to_string(),
                })?;
            return Ok(BasePath::Base(base));
        }
        Err(DustViewError::MissingViewPath)
    }
}

fn non_blank<'m>(model: &'m Model, key: &str) -> Option<&'m str> {
    model
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// The template key in `model`, if the view takes part in template rendering.
pub fn template_key(model: &Model) -> Option<&str> {
    non_blank(model, keys::TEMPLATE_KEY)
}

/// Normalizes `base_path + suffix` into a cache key.
///
/// Runs of `/` collapse into one and a single leading `/` is removed:
///
/// ```rust
/// use dustview::cache_key;
///
/// assert_eq!(cache_key("/path1/path2/", "/markup.js"), "path1/path2/markup.js");
/// ```
pub fn cache_key(base_path: &str, suffix: &str) -> String {
    let mut key = String::with_capacity(base_path.len() + suffix.len());
    let mut previous_slash = false;
    for c in base_path.chars().chain(suffix.chars()) {
        let slash = c == '/';
        if !(slash && previous_slash) {
            key.push(c);
        }
        previous_slash = slash;
    }
    match key.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => key,
    }
}

/// Whether this request loads a whole directory.
///
/// The `_MULTI_LOAD_REQUEST` attribute (a boolean, or the text `true` /
/// `false`) wins over the configured default.
pub fn is_multi_load(request: &ViewRequest, configured: bool) -> bool {
    match request.attribute(keys::MULTI_LOAD_REQUEST) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => parse_flag(text).unwrap_or(configured),
        _ => configured,
    }
}

/// Whether the request asks to bypass the source cache (`_refresh=Y`).
pub fn refresh_requested(request: &ViewRequest) -> bool {
    request
        .param(keys::REFRESH_PARAM)
        .is_some_and(|value| value.eq_ignore_ascii_case("y"))
}

/// Reads `true` / `false` in any letter case.
pub(crate) fn parse_flag(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
