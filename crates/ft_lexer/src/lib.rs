//! Lossless Python tokenizer for future-typing.
//!
//! [`tokenize`] turns source text into [`Token`]s whose `prefix` carries all
//! trivia (whitespace, comments, continuations, newlines inside brackets), so
//! [`untokenize`] can reassemble the exact source by concatenation.
//!
//! Token kinds follow the host tokenizer: names, numbers, strings, operators,
//! logical newlines, non-logical newlines and an end marker.

use ft_ast::TokenKind;
use thiserror::Error;

mod lex;
mod unlex;

pub use ft_ast::Token;
pub use lex::tokenize;
pub use unlex::untokenize;

/// Every operator and delimiter the tokenizer recognises, longest first.
pub const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", ">>", "<<", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".", "=", "!",
];

/// Error produced when source text is not valid lexical input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("invalid character {ch:?} at line {line}, column {col}")]
    InvalidCharacter { ch: char, line: u32, col: u32 },
    #[error("unterminated string starting at line {line}, column {col}")]
    UnterminatedString { line: u32, col: u32 },
    #[error("unexpected character after line continuation at line {line}, column {col}")]
    BadContinuation { line: u32, col: u32 },
    #[error("unmatched '{bracket}' at line {line}, column {col}")]
    UnmatchedBracket { bracket: char, line: u32, col: u32 },
    #[error("'{bracket}' opened at line {line}, column {col} was never closed")]
    UnclosedBracket { bracket: char, line: u32, col: u32 },
}

/// Error produced when a token stream cannot be reassembled into source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnlexError {
    #[error("malformed {kind} token {text:?} at line {line}")]
    MalformedToken {
        kind: TokenKind,
        text: String,
        line: u32,
    },
    #[error("unmatched '{bracket}' at line {line}")]
    UnmatchedBracket { bracket: String, line: u32 },
    #[error("'{bracket}' opened at line {line} is never closed")]
    UnclosedBracket { bracket: String, line: u32 },
}

/// Whether `text` is a valid identifier.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_continue),
        _ => false,
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

pub(crate) fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
