//! Turning the engine's error channel into errors.

use encoding_rs::Encoding;

use crate::error::DustViewError;

/// Inspects the runtime's error channel after every render.
pub trait ErrorHandler: Send + Sync {
    /// Returns `Err` if `error_text` describes a failed render.
    fn handle_error(
        &self,
        template_key: &str,
        error_text: &str,
        encoding: &'static Encoding,
    ) -> Result<(), DustViewError>;
}

impl<F> ErrorHandler for F
where
    F: Fn(&str, &str, &'static Encoding) -> Result<(), DustViewError> + Send + Sync,
{
    fn handle_error(
        &self,
        template_key: &str,
        error_text: &str,
        encoding: &'static Encoding,
    ) -> Result<(), DustViewError> {
        self(template_key, error_text, encoding)
    }
}

/// Raises [`DustViewError::Render`] whenever the error channel holds
/// anything besides whitespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle_error(
        &self,
        template_key: &str,
        error_text: &str,
        encoding: &'static Encoding,
    ) -> Result<(), DustViewError> {
        let message = round_trip(error_text, encoding);
        if message.trim().is_empty() {
            return Ok(());
        }
        Err(DustViewError::Render {
            template_key: template_key.to_string(),
            message,
        })
    }
}

/// Encodes `text` into `encoding` and decodes it back.
///
/// Characters the encoding cannot represent come back as HTML numeric
/// character references, which is what the response body will contain.
pub fn round_trip(text: &str, encoding: &'static Encoding) -> String {
    let (bytes, _, _) = encoding.encode(text);
    let (decoded, _) = encoding.decode_without_bom_handling(&bytes);
    decoded.into_owned()
}

/// Looks up an encoding by its WHATWG label (`UTF-8`, `euc-kr`, ...).
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, DustViewError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| DustViewError::config(format!("unknown encoding '{label}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{EUC_KR, UTF_8, WINDOWS_1252};

    #[test]
    fn test_empty_error_text_passes() {
        assert!(DefaultErrorHandler.handle_error("t1", "", UTF_8).is_ok());
        assert!(DefaultErrorHandler.handle_error("t1", " \n\t", UTF_8).is_ok());
    }

    #[test]
    fn test_error_text_raises_render_error() {
        let err = DefaultErrorHandler
            .handle_error("t1", "Template Not Found: t1", UTF_8)
            .unwrap_err();
        match err {
            DustViewError::Render {
                template_key,
                message,
            } => {
                assert_eq!(template_key, "t1");
                assert_eq!(message, "Template Not Found: t1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_keeps_representable_text() {
        assert_eq!(round_trip("안녕하세요", EUC_KR), "안녕하세요");
        assert_eq!(round_trip("café", WINDOWS_1252), "café");
    }

    #[test]
    fn test_round_trip_replaces_unmappable_characters() {
        assert_eq!(round_trip("a안b", WINDOWS_1252), "a&#50504;b");
    }

    #[test]
    fn test_encoding_labels() {
        assert_eq!(encoding_for_label("UTF-8").unwrap(), UTF_8);
        assert_eq!(encoding_for_label("euc-kr").unwrap(), EUC_KR);
        assert!(matches!(
            encoding_for_label("klingon"),
            Err(DustViewError::Config(_))
        ));
    }

    #[test]
    fn test_closure_handler() {
        let lenient = |_: &str, _: &str, _: &'static Encoding| -> Result<(), DustViewError> { Ok(()) };
        assert!(lenient.handle_error("t1", "boom", UTF_8).is_ok());
    }
}
