//! The decode pipeline behind the `future_typing` codec.

use ft_ast::{ErrorPolicy, RewriteOptions, Token, ENCODING_NAME};
use ft_rewrite::{SpanRewriter, TypingRewriter};

use crate::charset::decode_bytes;
use crate::classify::{BracketDepthClassifier, Classifier, Step};
use crate::error::CodecError;
use crate::preamble::{split_lines, split_preamble};

/// Decode `content`, rewriting new-style annotations for `options.target`.
///
/// Returns the rewritten text and the length of the buffer that was
/// tokenized (preamble + injected import + body). The host loader advances
/// by that count, not by `content.len()`.
pub fn decode(
    content: &[u8],
    errors: ErrorPolicy,
    options: &RewriteOptions,
) -> Result<(String, usize), CodecError> {
    decode_with(
        content,
        errors,
        options,
        &TypingRewriter::for_target(options.target),
    )
}

/// [`decode`] with a caller-supplied span rewriter.
pub fn decode_with(
    content: &[u8],
    errors: ErrorPolicy,
    options: &RewriteOptions,
    rewriter: &dyn SpanRewriter,
) -> Result<(String, usize), CodecError> {
    if content.is_empty() {
        return Ok((String::new(), 0));
    }

    let mut preamble = split_preamble(split_lines(content), errors, ENCODING_NAME)?;
    let preserved = preamble.preserved.len();
    let inject = options.needs_import();
    if inject {
        preamble.inject_import(&options.import_line());
    }

    let buffer = preamble.into_buffer();
    let source = decode_bytes(&buffer, errors)?;
    let tokens = ft_lexer::tokenize(&source)?;

    let mut classifier = BracketDepthClassifier::new();
    let rewritten = rewrite_tokens(tokens, &mut classifier, rewriter, &options.typing_module);
    let text = ft_lexer::untokenize(&rewritten)?;

    tracing::debug!(
        preserved,
        inject,
        consumed = buffer.len(),
        target = %options.target,
        "decode"
    );
    Ok((text, buffer.len()))
}

/// Stream `tokens` through `classifier`, replacing each completed span with
/// the rewriter's output. A span still open at end of stream is rewritten too.
pub fn rewrite_tokens(
    tokens: Vec<Token>,
    classifier: &mut dyn Classifier,
    rewriter: &dyn SpanRewriter,
    typing_module: &str,
) -> Vec<Token> {
    let mut result = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Step::Flush { span, terminator } = classifier.push(token) {
            if let Some(span) = span {
                result.extend(rewriter.rewrite(&span, typing_module));
            }
            result.push(terminator);
        }
    }
    if let Some(span) = classifier.finish() {
        result.extend(rewriter.rewrite(&span, typing_module));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_ast::PythonVersion;
    use ft_lexer::LexError;
    use ft_rewrite::IdentityRewriter;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn options(target: PythonVersion) -> RewriteOptions {
        RewriteOptions {
            target,
            ..RewriteOptions::default()
        }
    }

    fn py38() -> RewriteOptions {
        options(PythonVersion::new(3, 8))
    }

    fn py310() -> RewriteOptions {
        options(PythonVersion::new(3, 10))
    }

    #[test]
    fn empty_input() {
        assert_eq!(
            decode(b"", ErrorPolicy::Strict, &py38()).unwrap(),
            (String::new(), 0)
        );
    }

    #[test]
    fn end_to_end_signature() {
        let source = "\"\"\"doc\"\"\"\nfrom __future__ import annotations\ndef f(x: int | None) -> list[int]: ...\n";
        let (text, consumed) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        let expected = "\"\"\"doc\"\"\"\nfrom __future__ import annotations\nimport typing as typing___\ndef f(x: typing___.Union[int, None]) -> typing___.List[int]: ...\n";
        assert_eq!(text, expected);
        assert_eq!(
            consumed,
            source.len() + "import typing as typing___\n".len()
        );
    }

    #[test]
    fn plain_source_roundtrips() {
        let source = "#!/usr/bin/env python\nimport os\n\n\ndef main(argv):\n    flags = os.O_RDONLY | os.O_CREAT\n    return argv[1:]  # slice\n";
        let (text, consumed) = decode(source.as_bytes(), ErrorPolicy::Strict, &py310()).unwrap();
        assert_eq!(text, source);
        assert_eq!(consumed, source.len());

        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        assert_eq!(
            text,
            source.replacen("import os\n", "import typing as typing___\nimport os\n", 1)
        );
    }

    #[test]
    fn identity_rewriter_only_injects() {
        let source = "x: dict[str, int | None] = {}\n";
        let (text, _) =
            decode_with(source.as_bytes(), ErrorPolicy::Strict, &py38(), &IdentityRewriter)
                .unwrap();
        assert_eq!(text, format!("import typing as typing___\n{source}"));
    }

    #[test]
    fn preamble_lines_stay_ahead_of_import() {
        let source = "# -*- coding: future_typing -*-\n\"\"\"Module\ndocs.\n\"\"\"\n\nfrom __future__ import annotations\nX = int | None\n";
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        assert_eq!(
            text,
            "# -*- coding: utf-8 -*-\n\"\"\"Module\ndocs.\n\"\"\"\n\nfrom __future__ import annotations\nimport typing as typing___\nX = typing___.Union[int, None]\n"
        );
    }

    #[test]
    fn line_numbers_are_kept_for_multiline_annotations() {
        let source = "def f(\n    a: dict[\n        str,\n        int | None,\n    ],\n) -> None: ...\n";
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py310()).unwrap();
        assert_eq!(text, source);

        let options = options(PythonVersion::new(3, 8));
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &options).unwrap();
        assert_eq!(
            text,
            "import typing as typing___\ndef f(\n    a: typing___.Dict[\n        str,\n        typing___.Union[int, None],\n    ],\n) -> None: ...\n"
        );
        assert_eq!(text.lines().count(), source.lines().count() + 1);
    }

    #[test]
    fn custom_alias_is_threaded_through() {
        let options = RewriteOptions {
            typing_module: "_t".into(),
            compat_module: "typing_extensions".into(),
            target: PythonVersion::new(3, 8),
        };
        let (text, _) = decode(b"y: set[int]\n", ErrorPolicy::Strict, &options).unwrap();
        assert_eq!(text, "import typing_extensions as _t\ny: _t.Set[int]\n");
    }

    #[test]
    fn lex_errors_propagate() {
        let err = decode(b"x = (\n", ErrorPolicy::Strict, &py310()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::Lex(LexError::UnclosedBracket { bracket: '(', .. })
        ));
    }

    #[test]
    fn decode_errors_follow_policy() {
        let source = b"x = 1  # \xff\n";
        let err = decode(source, ErrorPolicy::Strict, &py310()).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));

        let (text, _) = decode(source, ErrorPolicy::Replace, &py310()).unwrap();
        assert_eq!(text, "x = 1  # \u{fffd}\n");
        let (text, _) = decode(source, ErrorPolicy::Ignore, &py310()).unwrap();
        assert_eq!(text, "x = 1  # \n");
    }

    #[test]
    fn flag_arguments_are_not_unions() {
        let source = "from re import I, M, compile\npat = compile('x', I | M)\n\ndef f(x: T | None, y: KT | VT) -> None: ...\n";
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        assert_eq!(
            text,
            "import typing as typing___\nfrom re import I, M, compile\npat = compile('x', I | M)\n\ndef f(x: typing___.Union[T, None], y: typing___.Union[KT, VT]) -> None: ...\n"
        );
    }

    #[test]
    fn docstring_with_comment_keeps_import_at_module_level() {
        let source = "\"\"\"Doc.\"\"\"  # noqa\nimport os\n\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    return 1\n";
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        assert_eq!(
            text,
            "\"\"\"Doc.\"\"\"  # noqa\nimport typing as typing___\nimport os\n\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    return 1\n"
        );
    }

    #[test]
    fn parenthesized_future_import_stays_whole() {
        let source = "from __future__ import (absolute_import,\n                        division)\nx: list[int] = []\n";
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        assert_eq!(
            text,
            "from __future__ import (absolute_import,\n                        division)\nimport typing as typing___\nx: typing___.List[int] = []\n"
        );
    }

    #[test]
    fn large_subscripted_literal() {
        let items: Vec<String> = (0..20_000).map(|i| format!("\"s{i}\"")).collect();
        let source = format!("DATA = [{}]\n", items.join(", "));
        let started = std::time::Instant::now();
        let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
        assert_eq!(text, format!("import typing as typing___\n{source}"));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    /// Statement lines with no new-style annotation syntax.
    fn plain_line() -> impl Strategy<Value = String> {
        "v_[a-z0-9_]{0,6}( = [0-9]{1,3}| = \"[a-z ]{0,5}\"| = v_[a-z]{1,4} \\| v_[a-z]{1,4}| = v_[a-z]{1,4}\\[[0-9]\\])?( +# [a-z ]{0,8})?\n"
    }

    proptest! {
        #[test]
        fn sources_without_new_syntax_only_gain_the_import(
            lines in prop::collection::vec(
                prop_oneof![plain_line(), Just("\n".to_string()), Just("# note\n".to_string())],
                0..10,
            )
        ) {
            let source = lines.concat();
            let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
            prop_assert_eq!(text.replacen("import typing as typing___\n", "", 1), source.clone());

            let (text, consumed) = decode(source.as_bytes(), ErrorPolicy::Strict, &py310()).unwrap();
            prop_assert_eq!(consumed, source.len());
            prop_assert_eq!(text, source);
        }

        #[test]
        fn import_follows_the_preamble(
            shebang in any::<bool>(),
            docstring in prop_oneof![
                Just(String::new()),
                Just("\"\"\"Doc.\"\"\"\n".to_string()),
                Just("'''Doc\n\nmore.'''  # noqa\n".to_string()),
            ],
            future in prop_oneof![
                Just(String::new()),
                Just("from __future__ import annotations\n".to_string()),
                Just("from __future__ import (annotations,\n    division)\n".to_string()),
            ],
            body in prop::collection::vec(plain_line(), 1..6),
        ) {
            let mut preamble = String::new();
            if shebang {
                preamble.push_str("#!/usr/bin/env python\n");
            }
            preamble.push_str(&docstring);
            preamble.push_str(&future);
            let body = body.concat();

            let source = format!("{preamble}{body}");
            let (text, _) = decode(source.as_bytes(), ErrorPolicy::Strict, &py38()).unwrap();
            prop_assert_eq!(text, format!("{preamble}import typing as typing___\n{body}"));
        }
    }

    struct Unbalanced;

    impl SpanRewriter for Unbalanced {
        fn rewrite(&self, span: &ft_ast::TokenSpan, _: &str) -> Vec<Token> {
            let mut tokens = span.to_tokens();
            tokens.push(Token::op("["));
            tokens
        }
    }

    #[test]
    fn unlex_errors_propagate() {
        let err =
            decode_with(b"x = 1\n", ErrorPolicy::Strict, &py310(), &Unbalanced).unwrap_err();
        assert!(matches!(err, CodecError::Unlex(_)));
    }
}
