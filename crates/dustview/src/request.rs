//! Framework-neutral request, response and model types.

use std::collections::HashMap;

use serde_json::Value;

/// The data handed to a view and returned from it.
pub type Model = serde_json::Map<String, Value>;

/// What a view needs to know about the incoming request.
#[derive(Debug, Clone, Default)]
pub struct ViewRequest {
    params: HashMap<String, String>,
    attributes: Model,
}

impl ViewRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a request attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }
}

/// Response side effects a view may produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewResponse {
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    character_encoding: Option<String>,
}

impl ViewResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// First value of the named header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_character_encoding(&mut self, encoding: impl Into<String>) {
        self.character_encoding = Some(encoding.into());
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_params_and_attributes() {
        let request = ViewRequest::new()
            .with_param("_refresh", "Y")
            .with_attribute("_MULTI_LOAD_REQUEST", true);
        assert_eq!(request.param("_refresh"), Some("Y"));
        assert_eq!(request.param("other"), None);
        assert_eq!(request.attribute("_MULTI_LOAD_REQUEST"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_set_attribute_overrides_value() {
        let mut request = ViewRequest::new().with_attribute("_MULTI_LOAD_REQUEST", true);
        request.set_attribute("_MULTI_LOAD_REQUEST", "false");
        assert_eq!(
            request.attribute("_MULTI_LOAD_REQUEST"),
            Some(&Value::String("false".into()))
        );
        assert!(!crate::resolve::is_multi_load(&request, true));
    }

    #[test]
    fn test_response_header_lookup_ignores_case() {
        let mut response = ViewResponse::new();
        response.add_header("Accept-Charset", "UTF-8");
        assert_eq!(response.header("accept-charset"), Some("UTF-8"));
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.content_type(), None);
    }
}
