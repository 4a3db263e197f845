//! Local filesystem source loader.

use std::fs;
use std::path::{Path, PathBuf};

use super::{LoadError, SourceLoader};

/// Loads templates from files below a root directory.
///
/// View paths are interpreted relative to the root; a leading `/` is
/// allowed and ignored, so `/template/master.html` and
/// `template/master.html` name the same file. Carriage returns are stripped
/// from loaded text so that sources checked out with CRLF line endings
/// compile to the same form as their LF counterparts.
///
/// ```rust,no_run
/// use dustview::{FileSystemLoader, SourceLoader};
///
/// let loader = FileSystemLoader::new("./views");
/// let source = loader.load_template("/template/master.html")?;
/// # Ok::<(), dustview::LoadError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a view path onto the filesystem.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl SourceLoader for FileSystemLoader {
    fn load_template(&self, path: &str) -> Result<String, LoadError> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Err(LoadError::NotFound { path: path.into() });
        }

        let text = fs::read_to_string(&full).map_err(|source| LoadError::Io {
            path: path.into(),
            source,
        })?;

        Ok(text.replace('\r', ""))
    }

    fn list_directory(&self, path: &str) -> Result<Option<Vec<String>>, LoadError> {
        let full = self.resolve(path);
        if !full.is_dir() {
            return Ok(None);
        }

        let io_error = |source| LoadError::Io {
            path: path.into(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&full).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            if !entry.file_type().map_err(io_error)?.is_file() {
                continue;
            }
            // Non UTF-8 names cannot be addressed by a view path.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();

        Ok(Some(names))
    }
}
