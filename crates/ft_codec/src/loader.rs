//! Source loading the way the host interpreter does it: read the encoding
//! declaration, look the codec up and decode through it.

use ft_ast::ErrorPolicy;

use crate::error::CodecError;
use crate::preamble::COOKIE_RE;
use crate::registry::CodecRegistry;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";
const DEFAULT_ENCODING: &str = "utf-8";

/// The encoding named by a cookie on the first or second line.
///
/// The second line only counts when the first is blank or a comment.
pub fn detect_encoding(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut lines = bytes.split_inclusive(|&b| b == b'\n');

    let first = String::from_utf8_lossy(lines.next()?);
    if let Some(caps) = COOKIE_RE.captures(&first) {
        return Some(caps[1].to_string());
    }

    let stripped = first.trim();
    if !(stripped.is_empty() || stripped.starts_with('#')) {
        return None;
    }

    let second = String::from_utf8_lossy(lines.next()?);
    COOKIE_RE.captures(&second).map(|caps| caps[1].to_string())
}

/// Decode a source file through the codec its cookie names, or UTF-8.
pub fn load_source(
    registry: &CodecRegistry,
    bytes: &[u8],
    errors: ErrorPolicy,
) -> Result<String, CodecError> {
    let encoding = detect_encoding(bytes).unwrap_or_else(|| DEFAULT_ENCODING.to_string());
    let codec = registry.lookup(&encoding)?;
    tracing::debug!(encoding = %encoding, codec = codec.name(), "loading source");

    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let (text, _) = codec.decode(bytes, errors)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_ast::RewriteOptions;
    use pretty_assertions::assert_eq;

    fn registry() -> CodecRegistry {
        let mut registry = CodecRegistry::with_standard();
        crate::register(&mut registry, RewriteOptions::default());
        registry
    }

    #[test]
    fn cookie_positions() {
        assert_eq!(
            detect_encoding(b"# -*- coding: future_typing -*-\nx = 1\n").as_deref(),
            Some("future_typing")
        );
        assert_eq!(
            detect_encoding(b"#!/usr/bin/env python\n# coding=latin-1\n").as_deref(),
            Some("latin-1")
        );
        assert_eq!(detect_encoding(b"import os\n# coding: latin-1\n"), None);
        assert_eq!(detect_encoding(b"x = 1\n\n# coding: latin-1\n"), None);
        assert_eq!(detect_encoding(b""), None);
    }

    #[test]
    fn bom_is_skipped() {
        assert_eq!(
            detect_encoding(b"\xef\xbb\xbf# coding: future_typing\n").as_deref(),
            Some("future_typing")
        );
    }

    #[test]
    fn loads_through_declared_codec() {
        let source = b"# -*- coding: future_typing -*-\ndef f(x: int | None) -> None: ...\n";
        let text = load_source(&registry(), source, ErrorPolicy::Strict).unwrap();
        assert_eq!(
            text,
            "# -*- coding: utf-8 -*-\nimport typing as typing___\ndef f(x: typing___.Union[int, None]) -> None: ...\n"
        );

        // The output names plain UTF-8, so loading it again is a no-op.
        let again = load_source(&registry(), text.as_bytes(), ErrorPolicy::Strict).unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn undeclared_files_are_plain_utf8() {
        let source = b"x: list[int] = []\n";
        let text = load_source(&registry(), source, ErrorPolicy::Strict).unwrap();
        assert_eq!(text, "x: list[int] = []\n");
    }

    #[test]
    fn unregistered_cookie_fails() {
        let source = b"# -*- coding: future_typing -*-\nx = 1\n";
        let err = load_source(&CodecRegistry::with_standard(), source, ErrorPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, CodecError::UnknownEncoding(name) if name == "future_typing"));
    }
}
