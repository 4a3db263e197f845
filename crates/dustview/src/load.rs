//! Single-template and directory loading.
//!
//! [`TemplateLoader`] moves raw template text from a [`SourceLoader`] through
//! a [`SourceCache`] into the [`TemplateEngine`].
//!
//! # Single load
//!
//! 1. With caching on, no refresh requested and the cache key present, the
//!    cached text is used (a "cache hit") and the cache is left as is.
//! 2. Otherwise the source loader fetches the text, which is cached when
//!    caching is on.
//! 3. Markup is compiled first when [`SourceMode::Markup`] is configured;
//!    the result is then loaded into the engine. The engine's own dedup
//!    decides whether anything is actually re-registered.
//!
//! With a presence-only cache there is no text to re-register on a hit, so
//! the engine registration is left untouched.
//!
//! # Directory load
//!
//! Every file of a directory (sorted by name) is loaded as its own template,
//! keyed by its file name without the template extension. The batch stops at
//! the first failure; templates registered before it stay registered.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::SourceCache;
use crate::engine::TemplateEngine;
use crate::error::DustViewError;
use crate::loader::SourceLoader;
use crate::resolve::{self, CacheKeyStrategy};

/// What the source loader returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Sources are already in the runtime's compiled form.
    #[default]
    Precompiled,
    /// Sources are raw markup and must be compiled before loading.
    Markup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    pub cache_enabled: bool,
    pub source_mode: SourceMode,
    /// Stripped from file names to form template keys in a directory load.
    pub template_extension: String,
    /// Files with these endings are skipped by directory loads.
    pub excluded_extensions: Vec<String>,
    pub cache_key_strategy: CacheKeyStrategy,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            source_mode: SourceMode::Precompiled,
            template_extension: ".html".to_string(),
            excluded_extensions: vec![".jsp".to_string()],
            cache_key_strategy: CacheKeyStrategy::TemplateKey,
        }
    }
}

/// One template to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleLoad<'a> {
    pub template_key: &'a str,
    pub view_path: &'a str,
    pub cache_key: &'a str,
    /// Skip the cache lookup and fetch fresh text.
    pub refresh: bool,
}

impl<'a> SingleLoad<'a> {
    /// A load cached under its template key, without refresh.
    pub fn new(template_key: &'a str, view_path: &'a str) -> Self {
        Self {
            template_key,
            view_path,
            cache_key: template_key,
            refresh: false,
        }
    }

    pub fn cache_key(mut self, cache_key: &'a str) -> Self {
        self.cache_key = cache_key;
        self
    }

    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Outcome of a directory load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryLoadResult {
    /// `false` when the path is not a directory resource.
    pub succeeded: bool,
    pub loaded_keys: BTreeSet<String>,
}

impl DirectoryLoadResult {
    fn absent() -> Self {
        Self::default()
    }
}

/// Loads templates into an engine through a cache.
pub struct TemplateLoader {
    engine: Arc<TemplateEngine>,
    source_loader: Arc<dyn SourceLoader>,
    cache: Arc<dyn SourceCache>,
    settings: LoaderSettings,
}

impl TemplateLoader {
    pub fn new(
        engine: Arc<TemplateEngine>,
        source_loader: Arc<dyn SourceLoader>,
        cache: Arc<dyn SourceCache>,
        settings: LoaderSettings,
    ) -> Self {
        Self {
            engine,
            source_loader,
            cache,
            settings,
        }
    }

    pub fn engine(&self) -> &Arc<TemplateEngine> {
        &self.engine
    }

    pub fn cache(&self) -> &Arc<dyn SourceCache> {
        &self.cache
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Loads one template. Returns `true` when the cached text was used.
    pub fn load_single(&self, request: &SingleLoad<'_>) -> Result<bool, DustViewError> {
        let SingleLoad {
            template_key,
            view_path,
            cache_key,
            refresh,
        } = *request;

        let cached = if self.settings.cache_enabled && !refresh && self.cache.is_cached(cache_key) {
            self.cache.get(cache_key)
        } else {
            None
        };

        let used_cache = cached.is_some();
        let source = match cached {
            Some(source) => {
                debug!(template_key, cache_key, "source cache hit");
                if !self.cache.retains_source() {
                    return Ok(true);
                }
                source
            }
            None => {
                debug!(template_key, view_path, refresh, "loading template source");
                let source = self.source_loader.load_template(view_path).map_err(|source| {
                    DustViewError::TemplateLoad {
                        template_key: template_key.to_string(),
                        path: view_path.to_string(),
                        source,
                    }
                })?;
                if self.settings.cache_enabled {
                    self.cache.add(cache_key, &source);
                }
                source
            }
        };

        self.register(template_key, &source)?;
        Ok(used_cache)
    }

    fn register(&self, template_key: &str, source: &str) -> Result<bool, DustViewError> {
        let compiled = match self.settings.source_mode {
            SourceMode::Precompiled => Cow::Borrowed(source),
            SourceMode::Markup => Cow::Owned(self.engine.compile(template_key, source)?),
        };
        self.engine.load(template_key, &compiled)
    }

    /// Loads every file in `directory` as its own template.
    pub fn load_directory(
        &self,
        directory: &str,
        refresh: bool,
    ) -> Result<DirectoryLoadResult, DustViewError> {
        let listed = self
            .source_loader
            .list_directory(directory)
            .map_err(|source| DustViewError::Directory {
                path: directory.to_string(),
                source,
            })?;
        let Some(mut entries) = listed else {
            debug!(directory, "not a directory resource");
            return Ok(DirectoryLoadResult::absent());
        };
        entries.sort();

        let mut loaded_keys = BTreeSet::new();
        for name in &entries {
            if self.is_excluded(name) {
                debug!(directory, file = %name, "skipping excluded file");
                continue;
            }

            let template_key = self.template_key_for(name);
            let view_path = join_path(directory, name);
            let cache_key = match self.settings.cache_key_strategy {
                CacheKeyStrategy::TemplateKey => template_key.to_string(),
                CacheKeyStrategy::ViewPath => resolve::cache_key(&view_path, ""),
            };

            self.load_single(&SingleLoad {
                template_key,
                view_path: &view_path,
                cache_key: &cache_key,
                refresh,
            })?;
            loaded_keys.insert(template_key.to_string());
        }

        info!(directory, templates = loaded_keys.len(), "loaded template directory");
        Ok(DirectoryLoadResult {
            succeeded: true,
            loaded_keys,
        })
    }

    /// Preloads a directory of shared partials.
    pub fn load_common(&self, directory: &str) -> Result<DirectoryLoadResult, DustViewError> {
        let result = self.load_directory(directory, false)?;
        if !result.succeeded {
            warn!(directory, "common view path is not a directory, nothing preloaded");
        }
        Ok(result)
    }

    fn is_excluded(&self, file_name: &str) -> bool {
        self.settings
            .excluded_extensions
            .iter()
            .any(|extension| file_name.ends_with(extension.as_str()))
    }

    fn template_key_for<'n>(&self, file_name: &'n str) -> &'n str {
        file_name
            .strip_suffix(self.settings.template_extension.as_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or(file_name)
    }
}

fn join_path(directory: &str, file_name: &str) -> String {
    if directory.ends_with('/') {
        format!("{directory}{file_name}")
    } else {
        format!("{directory}/{file_name}")
    }
}
