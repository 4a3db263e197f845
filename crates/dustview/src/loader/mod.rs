//! Source loaders: where raw template text comes from.
//!
//! A [`SourceLoader`] turns a view path into template text. Loaders may also
//! report directory listings so that a whole directory of partials can be
//! registered in one batch; loaders without a notion of directories keep the
//! default [`SourceLoader::list_directory`], which reports "not a directory".
//!
//! | Loader | Paths | Directories |
//! |--------|-------|-------------|
//! | [`FileSystemLoader`] | relative to a root directory | yes |
//! | [`HttpLoader`] (feature `http`) | `http://` / `https://` URLs | no |
//! | any `Fn(&str) -> Result<String, LoadError>` | caller defined | no |

mod fs;
#[cfg(feature = "http")]
mod http;

pub use fs::FileSystemLoader;
#[cfg(feature = "http")]
pub use http::HttpLoader;

use std::io;

/// Errors a source loader can report. Every variant carries the path.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Nothing exists at the path.
    #[error("Template source not found: {path}")]
    NotFound { path: String },

    /// The resource exists but reading it failed.
    #[error("Failed to read template source '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The loader cannot handle this kind of path.
    #[error("Unsupported template path '{path}': {reason}")]
    UnsupportedPath { path: String, reason: String },

    /// The HTTP request could not be completed.
    #[cfg(feature = "http")]
    #[error("HTTP request for '{path}' failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with something other than 200.
    #[error("Failed to load '{path}' (status code: {status}, reason: {body})")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
}

impl LoadError {
    pub fn path(&self) -> &str {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::UnsupportedPath { path, .. }
            | Self::Status { path, .. } => path,
            #[cfg(feature = "http")]
            Self::Http { path, .. } => path,
        }
    }
}

/// Supplies raw template text for a view path.
pub trait SourceLoader: Send + Sync {
    /// Loads the template text stored at `path`.
    fn load_template(&self, path: &str) -> Result<String, LoadError>;

    /// Lists the entry names of the directory at `path`.
    ///
    /// Returns `Ok(None)` when `path` is not a directory resource, which is a
    /// normal outcome: the caller falls back to loading `path` as one file.
    /// Implementations return plain file names, not full paths.
    fn list_directory(&self, path: &str) -> Result<Option<Vec<String>>, LoadError> {
        let _ = path;
        Ok(None)
    }
}

impl<F> SourceLoader for F
where
    F: Fn(&str) -> Result<String, LoadError> + Send + Sync,
{
    fn load_template(&self, path: &str) -> Result<String, LoadError> {
        self(path)
    }
}
