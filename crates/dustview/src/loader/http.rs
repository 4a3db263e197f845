//! Remote source loader over HTTP.

use encoding_rs::Encoding;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;

use super::{LoadError, SourceLoader};

/// Fetches templates from `http://` and `https://` URLs.
///
/// Requests advertise the resource encoding through the `Accept` header.
/// By default the body is decoded the way the server's `Content-Type`
/// declares; [`HttpLoader::charset`] forces a specific charset instead, for
/// servers that mislabel their responses.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    resource_encoding: String,
    charset: Option<&'static Encoding>,
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpLoader {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            resource_encoding: "UTF-8".to_string(),
            charset: None,
        }
    }

    /// Sets the charset named in the `Accept` header.
    pub fn resource_encoding(mut self, label: impl Into<String>) -> Self {
        self.resource_encoding = label.into();
        self
    }

    /// Decodes every response body with `encoding`, ignoring the server's
    /// declared charset.
    pub fn charset(mut self, encoding: &'static Encoding) -> Self {
        self.charset = Some(encoding);
        self
    }
}

impl SourceLoader for HttpLoader {
    fn load_template(&self, path: &str) -> Result<String, LoadError> {
        if !(path.starts_with("http://") || path.starts_with("https://")) {
            return Err(LoadError::UnsupportedPath {
                path: path.into(),
                reason: "expected an http:// or https:// URL".into(),
            });
        }

        let http_error = |source| LoadError::Http {
            path: path.into(),
            source,
        };

        let response = self
            .client
            .get(path)
            .header(ACCEPT, format!("text/html;charset={}", self.resource_encoding))
            .send()
            .map_err(http_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(LoadError::Status {
                path: path.into(),
                status: status.as_u16(),
                body,
            });
        }

        match self.charset {
            Some(encoding) => {
                let bytes = response.bytes().map_err(http_error)?;
                let (text, _, _) = encoding.decode(&bytes);
                Ok(text.into_owned())
            }
            None => response.text().map_err(http_error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetches_template_with_accept_header() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/views/hello.html")
            .match_header("accept", "text/html;charset=UTF-8")
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("Hello {name}!")
            .create();

        let loader = HttpLoader::new();
        let source = loader
            .load_template(&format!("{}/views/hello.html", server.url()))
            .unwrap();

        assert_eq!(source, "Hello {name}!");
        mock.assert();
    }

    #[test]
    fn test_non_ok_status_is_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/missing.html")
            .with_status(404)
            .with_body("no such view")
            .create();

        let url = format!("{}/missing.html", server.url());
        let err = HttpLoader::new().load_template(&url).unwrap_err();
        match err {
            LoadError::Status { path, status, body } => {
                assert_eq!(path, url);
                assert_eq!(status, 404);
                assert_eq!(body, "no such view");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_charset_override_decodes_body() {
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("<p>안녕 {name}</p>");
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/ko.html")
            .match_header("accept", "text/html;charset=EUC-KR")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(bytes.into_owned())
            .create();

        let loader = HttpLoader::new()
            .resource_encoding("EUC-KR")
            .charset(encoding_rs::EUC_KR);
        let source = loader
            .load_template(&format!("{}/ko.html", server.url()))
            .unwrap();

        assert_eq!(source, "<p>안녕 {name}</p>");
    }

    #[test]
    fn test_rejects_non_http_paths() {
        let err = HttpLoader::new().load_template("/views/a.html").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedPath { .. }));
    }
}
