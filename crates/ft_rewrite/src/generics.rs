//! Rewriting for subscripted builtin containers.
//!
//! `list[int]` → `typing___.List[int]`, applied only where the name is
//! immediately followed by a subscript and is not an attribute
//! (`obj.list[0]` stays as is).

use ft_ast::{Token, TokenKind};

/// Builtin (and `collections`) names and their compatibility-module equivalents.
pub const BUILTIN_GENERICS: &[(&str, &str)] = &[
    ("dict", "Dict"),
    ("frozenset", "FrozenSet"),
    ("list", "List"),
    ("set", "Set"),
    ("tuple", "Tuple"),
    ("type", "Type"),
    ("deque", "Deque"),
    ("defaultdict", "DefaultDict"),
];

/// Compatibility name for a builtin generic, if `name` is one.
pub fn compat_name(name: &str) -> Option<&'static str> {
    BUILTIN_GENERICS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, compat)| *compat)
}

/// Build `<alias>.<member>` in place of `original`, keeping its trivia and position.
pub fn qualified(alias: &str, member: &str, original: &Token) -> [Token; 3] {
    [
        Token::name(alias)
            .with_prefix(original.prefix.clone())
            .at(original.pos),
        Token::op(".").at(original.pos),
        Token::new(TokenKind::Name, member).at(original.pos),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_and_unknown_names() {
        assert_eq!(compat_name("list"), Some("List"));
        assert_eq!(compat_name("frozenset"), Some("FrozenSet"));
        assert_eq!(compat_name("List"), None);
        assert_eq!(compat_name("str"), None);
    }

    #[test]
    fn qualified_keeps_prefix() {
        let original = Token::name("dict").with_prefix(" ");
        let texts: Vec<(String, String)> = qualified("t_", "Dict", &original)
            .into_iter()
            .map(|t| (t.prefix, t.text))
            .collect();
        assert_eq!(
            texts,
            vec![
                (" ".to_string(), "t_".to_string()),
                (String::new(), ".".to_string()),
                (String::new(), "Dict".to_string()),
            ]
        );
    }
}
