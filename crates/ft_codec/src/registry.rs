use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::CodecInfo;
use crate::error::CodecError;

/// Canonical form of an encoding name: lowercase, with `-` and spaces
/// replaced by `_`.
pub fn normalize_encoding(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Encodings known to the loader, keyed by normalized name.
#[derive(Debug, Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<CodecInfo>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with UTF-8 under its usual spellings.
    pub fn with_standard() -> Self {
        let mut registry = Self::new();
        let utf8 = Arc::new(CodecInfo::utf8());
        for name in ["utf_8", "utf8", "u8"] {
            registry
                .codecs
                .insert(normalize_encoding(name), Arc::clone(&utf8));
        }
        registry
    }

    /// Register `info` under `name`. The first registration wins; returns
    /// whether this call installed it.
    pub fn register(&mut self, name: &str, info: CodecInfo) -> bool {
        let key = normalize_encoding(name);
        if self.codecs.contains_key(&key) {
            tracing::debug!(codec = %key, "codec already registered");
            return false;
        }
        tracing::debug!(codec = %key, "registered codec");
        self.codecs.insert(key, Arc::new(info));
        true
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<CodecInfo>, CodecError> {
        self.codecs
            .get(&normalize_encoding(name))
            .cloned()
            .ok_or_else(|| CodecError::UnknownEncoding(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(&normalize_encoding(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::future_typing_codec;
    use ft_ast::{ErrorPolicy, RewriteOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn names_are_normalized() {
        assert_eq!(normalize_encoding("Future-Typing"), "future_typing");
        assert_eq!(normalize_encoding("UTF 8"), "utf_8");
        assert_eq!(normalize_encoding("future_typing"), "future_typing");
    }

    #[test]
    fn standard_registry_has_utf8() {
        let registry = CodecRegistry::with_standard();
        assert_eq!(registry.lookup("UTF-8").unwrap().name(), "utf_8");
        assert!(registry.contains("utf8"));
        assert!(!registry.contains("future_typing"));
    }

    #[test]
    fn register_is_idempotent() {
        let mut registry = CodecRegistry::with_standard();
        assert!(crate::register(&mut registry, RewriteOptions::default()));
        assert!(!crate::register(&mut registry, RewriteOptions::default()));
        assert!(!registry.register("Future-Typing", CodecInfo::utf8()));

        // The first registration is the one that stays.
        let codec = registry.lookup("future-typing").unwrap();
        let (text, _) = codec.decode(b"x: list[int]\n", ErrorPolicy::Strict).unwrap();
        assert_eq!(text, "import typing as typing___\nx: typing___.List[int]\n");
    }

    #[test]
    fn unknown_encoding() {
        let registry = CodecRegistry::new();
        let err = registry.lookup("latin-1").unwrap_err();
        assert!(matches!(err, CodecError::UnknownEncoding(name) if name == "latin-1"));
    }

    #[test]
    fn registries_are_independent() {
        let mut a = CodecRegistry::new();
        let b = CodecRegistry::new();
        a.register("future_typing", future_typing_codec(RewriteOptions::default()));
        assert!(a.contains("future_typing"));
        assert!(!b.contains("future_typing"));
    }
}
