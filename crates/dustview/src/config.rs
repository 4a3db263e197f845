//! Typed view configuration.
//!
//! [`ViewConfig`] can be built three ways:
//!
//! - in code, starting from `ViewConfig::default()`;
//! - from YAML with [`ViewConfig::from_yaml`];
//! - from a framework's string attribute map with
//!   [`ViewConfig::from_attributes`], which understands the attribute names
//!   in [`attributes`].
//!
//! ```yaml
//! prefix: /template
//! suffix: .html
//! source_mode: markup
//! multi_load: true
//! common_view_path: /template/common
//! engine:
//!   helper_library: /etc/views/helpers.yaml
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::{EngineSettings, LibrarySource};
use crate::error::DustViewError;
use crate::keys;
use crate::load::{LoaderSettings, SourceMode};
use crate::request::Model;
use crate::resolve::{parse_flag, CacheKeyStrategy};

/// Attribute names understood by [`ViewConfig::from_attributes`].
pub mod attributes {
    pub const VIEW_PATH_PREFIX: &str = "_VIEW_PATH_PREFIX";
    pub const VIEW_PATH_SUFFIX: &str = "_VIEW_PATH_SUFFIX";
    /// Renames the model key the rendered markup is exported under.
    pub const VIEW_SOURCE: &str = "_VIEW_SOURCE";
    /// Renames the model key the bound JSON is exported under.
    pub const VIEW_JSON: &str = "_VIEW_JSON";
    pub const VIEW_CACHE: &str = "_VIEW_CACHE";
    pub const VIEW_ENCODING: &str = "_VIEW_ENCODING";
    pub const DUST_COMPILED: &str = "_DUST_COMPILED";
    pub const MULTI_LOAD: &str = "_MULTI_LOAD";
    pub const DUST_JS_CORE_FILE_PATH: &str = "_DUST_JS_CORE_FILE_PATH";
    pub const DUST_JS_HELPER_FILE_PATH: &str = "_DUST_JS_HELPER_FILE_PATH";
    pub const DUST_EXTENSION_JS_FILE_PATH: &str = "_DUST_EXTENSION_JS_FILE_PATH";
    pub const COMMON_VIEW_PATH: &str = "_COMMON_VIEW_PATH";
}

/// Configuration of one [`DustView`](crate::DustView).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub prefix: String,
    pub suffix: String,
    /// Wrap base view paths in `prefix` and `suffix`.
    pub merge_path: bool,
    pub export_view_key: String,
    pub export_json_key: String,
    /// Response charset and the encoding used for error round trips.
    pub view_encoding: String,
    pub cache_enabled: bool,
    pub source_mode: SourceMode,
    pub multi_load: bool,
    /// Directory of shared partials preloaded at initialization.
    pub common_view_path: Option<String>,
    pub template_extension: String,
    pub excluded_extensions: Vec<String>,
    pub cache_key_strategy: CacheKeyStrategy,
    pub engine: EngineSettings,
    /// Merged under every model before rendering.
    pub static_attributes: Model,
}

impl Default for ViewConfig {
    fn default() -> Self {
        let loader = LoaderSettings::default();
        Self {
            prefix: String::new(),
            suffix: String::new(),
            merge_path: true,
            export_view_key: keys::DEFAULT_EXPORT_VIEW_KEY.to_string(),
            export_json_key: keys::DEFAULT_EXPORT_JSON_KEY.to_string(),
            view_encoding: "UTF-8".to_string(),
            cache_enabled: loader.cache_enabled,
            source_mode: loader.source_mode,
            multi_load: false,
            common_view_path: None,
            template_extension: loader.template_extension,
            excluded_extensions: loader.excluded_extensions,
            cache_key_strategy: loader.cache_key_strategy,
            engine: EngineSettings::default(),
            static_attributes: Model::new(),
        }
    }
}

impl ViewConfig {
    pub fn from_yaml(text: &str) -> Result<Self, DustViewError> {
        serde_yaml::from_str(text).map_err(|e| DustViewError::config(e.to_string()))
    }

    /// Builds a configuration from framework attributes on top of the defaults.
    pub fn from_attributes(values: &HashMap<String, String>) -> Self {
        let mut config = Self::default();
        config.apply_attributes(values);
        config
    }

    /// Applies recognised attributes. Unknown names are ignored; boolean
    /// attributes only take effect when they read `true` or `false`.
    pub fn apply_attributes(&mut self, values: &HashMap<String, String>) {
        for (name, value) in values {
            match name.as_str() {
                attributes::VIEW_PATH_PREFIX => self.prefix = value.clone(),
                attributes::VIEW_PATH_SUFFIX => self.suffix = value.clone(),
                attributes::VIEW_SOURCE => self.export_view_key = value.clone(),
                attributes::VIEW_JSON => self.export_json_key = value.clone(),
                attributes::VIEW_ENCODING => self.view_encoding = value.clone(),
                attributes::VIEW_CACHE => {
                    if let Some(flag) = flag_attribute(name, value) {
                        self.cache_enabled = flag;
                    }
                }
                attributes::DUST_COMPILED => {
                    if let Some(compiled) = flag_attribute(name, value) {
                        self.source_mode = if compiled {
                            SourceMode::Precompiled
                        } else {
                            SourceMode::Markup
                        };
                    }
                }
                attributes::MULTI_LOAD => {
                    if let Some(flag) = flag_attribute(name, value) {
                        self.multi_load = flag;
                    }
                }
                attributes::DUST_JS_CORE_FILE_PATH => {
                    self.engine.core_library = LibrarySource::from(value.as_str());
                }
                attributes::DUST_JS_HELPER_FILE_PATH => {
                    self.engine.helper_library = Some(LibrarySource::from(value.as_str()));
                }
                attributes::DUST_EXTENSION_JS_FILE_PATH => {
                    self.engine.extension_library = Some(LibrarySource::from(value.as_str()));
                }
                attributes::COMMON_VIEW_PATH => self.common_view_path = Some(value.clone()),
                _ => {}
            }
        }
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            cache_enabled: self.cache_enabled,
            source_mode: self.source_mode,
            template_extension: self.template_extension.clone(),
            excluded_extensions: self.excluded_extensions.clone(),
            cache_key_strategy: self.cache_key_strategy,
        }
    }
}

fn flag_attribute(name: &str, value: &str) -> Option<bool> {
    let flag = parse_flag(value.trim());
    if flag.is_none() {
        warn!(attribute = name, value, "ignoring non-boolean attribute value");
    }
    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ViewConfig::default();
        assert_eq!(config.export_view_key, "_view");
        assert_eq!(config.export_json_key, "_json");
        assert_eq!(config.view_encoding, "UTF-8");
        assert!(config.cache_enabled);
        assert_eq!(config.source_mode, SourceMode::Precompiled);
        assert!(!config.multi_load);
        assert_eq!(config.excluded_extensions, vec![".jsp"]);
    }

    #[test]
    fn test_from_attributes() {
        let config = ViewConfig::from_attributes(&attrs(&[
            ("_VIEW_PATH_PREFIX", "/template"),
            ("_VIEW_PATH_SUFFIX", ".html"),
            ("_VIEW_SOURCE", "html"),
            ("_VIEW_CACHE", "FALSE"),
            ("_DUST_COMPILED", "false"),
            ("_MULTI_LOAD", "True"),
            ("_DUST_JS_HELPER_FILE_PATH", "/opt/helpers.yaml"),
            ("_COMMON_VIEW_PATH", "/template/common"),
            ("_SOMETHING_ELSE", "x"),
        ]));

        assert_eq!(config.prefix, "/template");
        assert_eq!(config.suffix, ".html");
        assert_eq!(config.export_view_key, "html");
        assert!(!config.cache_enabled);
        assert_eq!(config.source_mode, SourceMode::Markup);
        assert!(config.multi_load);
        assert_eq!(
            config.engine.helper_library,
            Some(LibrarySource::Path(PathBuf::from("/opt/helpers.yaml")))
        );
        assert_eq!(config.common_view_path.as_deref(), Some("/template/common"));
    }

    #[test]
    fn test_non_boolean_flags_are_ignored() {
        let config = ViewConfig::from_attributes(&attrs(&[
            ("_VIEW_CACHE", "no"),
            ("_MULTI_LOAD", ""),
            ("_DUST_COMPILED", "1"),
        ]));
        assert!(config.cache_enabled);
        assert!(!config.multi_load);
        assert_eq!(config.source_mode, SourceMode::Precompiled);
    }

    #[test]
    fn test_from_yaml() {
        let config = ViewConfig::from_yaml(
            "prefix: /template\nsource_mode: markup\ncache_key_strategy: view_path\n\
             engine:\n  extension_library: /opt/ext.yaml\nstatic_attributes:\n  site: Example\n",
        )
        .unwrap();
        assert_eq!(config.prefix, "/template");
        assert_eq!(config.source_mode, SourceMode::Markup);
        assert_eq!(config.cache_key_strategy, CacheKeyStrategy::ViewPath);
        assert_eq!(config.engine.core_library, LibrarySource::Builtin);
        assert_eq!(config.static_attributes["site"], "Example");
        assert_eq!(config.export_view_key, "_view");
    }

    #[test]
    fn test_from_yaml_rejects_bad_types() {
        assert!(matches!(
            ViewConfig::from_yaml("multi_load: [1, 2]\n"),
            Err(DustViewError::Config(_))
        ));
    }

    #[test]
    fn test_loader_settings() {
        let config = ViewConfig {
            cache_enabled: false,
            template_extension: ".dust".into(),
            ..ViewConfig::default()
        };
        let settings = config.loader_settings();
        assert!(!settings.cache_enabled);
        assert_eq!(settings.template_extension, ".dust");
    }
}
