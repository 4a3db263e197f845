//! Well-known model, request and parameter keys.

/// Model key holding the template key to render.
pub const TEMPLATE_KEY: &str = "_TEMPLATE_KEY";

/// Model key holding a base view path, composed with the configured prefix and suffix.
pub const VIEW_FILE_PATH: &str = "_VIEW_FILE_PATH";

/// Model key holding a complete view path, used verbatim.
pub const VIEW_PATH_OVERRIDE: &str = "_VIEW_PATH_OVERRIDE";

/// Model key naming a property whose value is the base view path.
pub const VIEW_PATH_KEY: &str = "_VIEW_PATH_KEY";

/// Model key holding structured JSON content.
pub const CONTENT_KEY: &str = "_CONTENT_KEY";

/// Model key holding pre-serialized JSON text.
pub const CONTENT_TEXT_KEY: &str = "_CONTENT_TEXT_KEY";

/// Request attribute that turns multi-load on or off for one request.
pub const MULTI_LOAD_REQUEST: &str = "_MULTI_LOAD_REQUEST";

/// Query parameter that bypasses the source cache when set to `Y` or `y`.
pub const REFRESH_PARAM: &str = "_refresh";

pub const DEFAULT_EXPORT_VIEW_KEY: &str = "_view";
pub const DEFAULT_EXPORT_JSON_KEY: &str = "_json";
