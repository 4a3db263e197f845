//! Runtime library resources and engine settings.
//!
//! A library is a YAML document installed into a runtime when the engine
//! initializes:
//!
//! ```yaml
//! globals:          # merged into every render's base context
//!   site: { name: Example }
//! partials:         # raw markup, compiled and registered by name
//!   footer: "<footer>{site.name}</footer>"
//! ```
//!
//! The core library is embedded in the crate; helper and extension libraries
//! are optional and usually read from disk.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DustViewError;

/// The embedded core library.
pub const CORE_LIBRARY: &str = include_str!("../../resources/core-library.yaml");

/// Where a library resource lives.
///
/// Serialized as a string: `builtin` for the embedded core library, anything
/// else is a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LibrarySource {
    #[default]
    Builtin,
    Path(PathBuf),
}

impl From<String> for LibrarySource {
    fn from(value: String) -> Self {
        if value == "builtin" {
            LibrarySource::Builtin
        } else {
            LibrarySource::Path(PathBuf::from(value))
        }
    }
}

impl From<&str> for LibrarySource {
    fn from(value: &str) -> Self {
        LibrarySource::from(value.to_string())
    }
}

impl From<LibrarySource> for String {
    fn from(source: LibrarySource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::Builtin => f.write_str("builtin"),
            LibrarySource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Which libraries the engine installs, and how their files are encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub core_library: LibrarySource,
    pub helper_library: Option<LibrarySource>,
    pub extension_library: Option<LibrarySource>,
    pub encoding: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            core_library: LibrarySource::Builtin,
            helper_library: None,
            extension_library: None,
            encoding: "UTF-8".to_string(),
        }
    }
}

impl EngineSettings {
    /// Libraries in installation order: core, helper, extension.
    pub fn libraries(&self) -> impl Iterator<Item = &LibrarySource> {
        std::iter::once(&self.core_library)
            .chain(self.helper_library.as_ref())
            .chain(self.extension_library.as_ref())
    }
}

/// A parsed library resource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Library {
    pub globals: Map<String, Value>,
    pub partials: BTreeMap<String, String>,
}

impl Library {
    /// Parses library YAML. Blank text is an empty library.
    pub fn parse(name: &str, text: &str) -> Result<Self, DustViewError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| DustViewError::engine_init(name, e.to_string()))
    }

    /// Reads and parses the library at `source`, decoding files with `encoding`.
    pub fn read(source: &LibrarySource, encoding: &'static Encoding) -> Result<Self, DustViewError> {
        let name = source.to_string();
        match source {
            LibrarySource::Builtin => Self::parse(&name, CORE_LIBRARY),
            LibrarySource::Path(path) => {
                if !path.is_file() {
                    return Err(DustViewError::engine_init(
                        name,
                        "library resource does not exist",
                    ));
                }
                let bytes =
                    fs::read(path).map_err(|e| DustViewError::engine_init(&name, e.to_string()))?;
                let (text, _, had_errors) = encoding.decode(&bytes);
                if had_errors {
                    return Err(DustViewError::engine_init(
                        name,
                        format!("library is not valid {}", encoding.name()),
                    ));
                }
                Self::parse(&name, &text)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_library_parses() {
        let library = Library::read(&LibrarySource::Builtin, encoding_rs::UTF_8).unwrap();
        assert!(library.globals.contains_key("dustview"));
        assert!(library.partials.contains_key("dustview/raw"));
    }

    #[test]
    fn test_missing_library_is_engine_init_error() {
        let source = LibrarySource::from("/definitely/not/here.yaml");
        let err = Library::read(&source, encoding_rs::UTF_8).unwrap_err();
        assert!(matches!(err, DustViewError::EngineInit { ref library, .. } if library == "/definitely/not/here.yaml"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = Library::parse("bad", "helpers: {}\n").unwrap_err();
        assert!(matches!(err, DustViewError::EngineInit { .. }));
    }

    #[test]
    fn test_blank_library_is_empty() {
        assert_eq!(Library::parse("empty", "  \n").unwrap(), Library::default());
    }

    #[test]
    fn test_library_source_serde() {
        let settings: EngineSettings = serde_yaml::from_str(
            "core_library: builtin\nhelper_library: /opt/helpers.yaml\n",
        )
        .unwrap();
        assert_eq!(settings.core_library, LibrarySource::Builtin);
        assert_eq!(
            settings.helper_library,
            Some(LibrarySource::Path(PathBuf::from("/opt/helpers.yaml")))
        );
        assert_eq!(settings.encoding, "UTF-8");
        assert_eq!(settings.libraries().count(), 2);
    }

    #[test]
    fn test_reads_non_utf8_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helper.yaml");
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("globals:\n  greeting: 안녕\n");
        fs::write(&path, &bytes).unwrap();

        let library = Library::read(&LibrarySource::Path(path), encoding_rs::EUC_KR).unwrap();
        assert_eq!(library.globals["greeting"], "안녕");
    }
}
