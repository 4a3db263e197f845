//! # dustview-dust - Logic-less Template Runtime
//!
//! A dust-compatible, logic-less template language. Markup is compiled into a
//! textual compiled form which is then loaded into a [`Dust`] registry and
//! rendered against JSON data.
//!
//! ## Pipeline
//!
//! | Step | Function | Input | Output |
//! |------|----------|-------|--------|
//! | Compile | [`compile`] | name + raw markup | compiled form (JSON text) |
//! | Load | [`Dust::load_source`] | compiled form | registered name |
//! | Render | [`Dust::render`] | name + JSON data | markup |
//!
//! Compilation is pure: it never touches a registry. The compiled form is
//! deterministic, so identical markup compiled under the same name always
//! yields byte-identical text.
//!
//! ## Syntax
//!
//! ```text
//! {name}  {user.name}  {items[0]}  {.}        references (HTML-escaped)
//! {name|s}  {name|j}  {name|u}  {name|uc}     filters
//! {#items}..{:else}..{/items}                 section
//! {?name}..{/name}  {^name}..{/name}          exists / not exists
//! {>partial/}  {>"a/b":ctx key="v"/}          partials
//! {+title}default{/title}  {<title}x{/title}  blocks / inline partials
//! {! comment !}  {~n} {~s} {~lb} {~rb}        comments and specials
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dustview_dust::{compile, Dust};
//! use serde_json::json;
//!
//! let mut dust = Dust::new();
//! dust.load_source(&compile("master", "<h1>{title}</h1>{>footer/}").unwrap()).unwrap();
//! dust.load_source(&compile("footer", "<p>{~lb}end{~rb}</p>").unwrap()).unwrap();
//!
//! let html = dust.render("master", &json!({"title": "Report"})).unwrap();
//! assert_eq!(html, "<h1>Report</h1><p>{end}</p>");
//! ```

pub mod ast;
mod error;
pub mod filters;
mod parser;
mod render;

pub use ast::{KeyPath, Node, Param, ParamValue, SectionKind, Template};
pub use error::DustError;
pub use parser::parse;
pub use render::{Dust, MAX_PARTIAL_DEPTH};

/// Compiles raw markup into its textual compiled form.
///
/// The result embeds `name`; [`Dust::load_source`] registers it under that name.
pub fn compile(name: &str, source: &str) -> Result<String, DustError> {
    let template = parser::parse(name, source)?;
    serde_json::to_string(&template).map_err(|e| DustError::InvalidCompiled(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_is_deterministic() {
        let a = compile("t1", "Hello {name} World!").unwrap();
        let b = compile("t1", "Hello {name} World!").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compile_embeds_name() {
        let a = compile("test1", "Hello").unwrap();
        let b = compile("test2", "Hello").unwrap();
        assert_ne!(a, b);
        assert!(a.contains("\"test1\""));
    }

    #[test]
    fn test_compile_reports_syntax_error() {
        let err = compile("broken", "{#open}").unwrap_err();
        assert!(matches!(err, DustError::Syntax { .. }));
    }
}
