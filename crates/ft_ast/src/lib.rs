//! Shared data model for the future-typing rewriter.
//!
//! - Lexical tokens with their leading trivia (`Token`, `TokenKind`)
//! - Classified token spans handed to span rewriters (`TokenSpan`)
//! - Rewrite configuration (`RewriteOptions`, `PythonVersion`, `ErrorPolicy`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name under which the rewriting codec is registered.
pub const ENCODING_NAME: &str = "future_typing";

/// Default alias the rewritten calls reference.
pub const DEFAULT_TYPING_MODULE: &str = "typing___";

/// Default module imported under [`DEFAULT_TYPING_MODULE`].
pub const DEFAULT_COMPAT_MODULE: &str = "typing";

/// First version that subscripts builtin containers natively (`list[int]`).
pub const NATIVE_GENERICS: PythonVersion = PythonVersion::new(3, 9);

/// First version with the `|` union operator between types.
pub const NATIVE_UNION: PythonVersion = PythonVersion::new(3, 10);

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Name,
    Number,
    String,
    /// Operator or delimiter.
    Op,
    /// End of a logical line. Empty text when the source lacks a final newline.
    Newline,
    /// Line break that does not end a logical line (blank or comment-only line).
    Nl,
    EndMarker,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Name => "NAME",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Op => "OP",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Nl => "NL",
            TokenKind::EndMarker => "ENDMARKER",
        };
        f.write_str(s)
    }
}

/// Start position of a token's text: 1-based line, 0-based column in chars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A lexical token.
///
/// `prefix` holds the trivia in front of `text`: whitespace, comments, line
/// continuations and newlines inside open brackets. Concatenating
/// `prefix + text` over a token stream reproduces the source exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub prefix: String,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            prefix: String::new(),
            pos: Pos::default(),
        }
    }

    pub fn name(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Name, text)
    }

    pub fn op(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Op, text)
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = pos;
        self
    }

    /// True for an operator token with exactly this text.
    pub fn is_op(&self, text: &str) -> bool {
        self.kind == TokenKind::Op && self.text == text
    }

    pub fn is_name(&self, text: &str) -> bool {
        self.kind == TokenKind::Name && self.text == text
    }

    /// Bracket depth contribution: `+1` for `[`, `-1` for `]`, `0` otherwise.
    pub fn bracket_delta(&self) -> i32 {
        if self.is_op("[") {
            1
        } else if self.is_op("]") {
            -1
        } else {
            0
        }
    }
}

/// A token absorbed into a span, with the span's bracket depth in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedToken {
    pub token: Token,
    /// Opens minus closes over the span's earlier tokens.
    pub depth: i32,
}

impl ClassifiedToken {
    /// Whether this token sits inside an unclosed subscript of its span.
    pub fn is_inside(&self) -> bool {
        self.depth > 0
    }
}

/// A contiguous run of tokens believed to form one generic type expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub tokens: Vec<ClassifiedToken>,
    /// The standalone token right before the span was `.`.
    pub follows_dot: bool,
    /// The token that closed the span was `.`.
    pub precedes_dot: bool,
    /// The standalone token right before the span was `:` or `->`.
    pub follows_annotation: bool,
    /// Running opens minus closes, kept in step with `tokens` by [`TokenSpan::push`].
    #[serde(skip)]
    depth: i32,
}

impl TokenSpan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Current bracket depth: opens minus closes over all absorbed tokens.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Append a token, recording the depth it was absorbed at.
    pub fn push(&mut self, token: Token) {
        let depth = self.depth;
        self.depth += token.bracket_delta();
        self.tokens.push(ClassifiedToken { token, depth });
    }

    /// The span's tokens without classification, in order.
    pub fn to_tokens(&self) -> Vec<Token> {
        self.tokens.iter().map(|t| t.token.clone()).collect()
    }
}

/// A `major.minor` interpreter version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PythonVersion {
    pub major: u8,
    pub minor: u8,
}

impl PythonVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Whether `list[int]` style subscripts must be rewritten for this version.
    pub fn needs_generic_rewrite(self) -> bool {
        self < NATIVE_GENERICS
    }

    /// Whether `X | Y` unions must be rewritten, and the compat import injected.
    pub fn needs_union_rewrite(self) -> bool {
        self < NATIVE_UNION
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        Self::new(3, 8)
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid python version `{0}`, expected MAJOR.MINOR")]
pub struct ParseVersionError(String);

impl FromStr for PythonVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(err)?;
        Ok(Self {
            major: major.parse().map_err(|_| err())?,
            minor: minor.parse().map_err(|_| err())?,
        })
    }
}

impl TryFrom<String> for PythonVersion {
    type Error = ParseVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PythonVersion> for String {
    fn from(value: PythonVersion) -> Self {
        value.to_string()
    }
}

/// How undecodable bytes are handled, mirroring the host's codec error modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Fail on the first invalid sequence.
    #[default]
    Strict,
    /// Substitute U+FFFD for each invalid sequence.
    Replace,
    /// Drop invalid sequences.
    Ignore,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorPolicy::Strict => "strict",
            ErrorPolicy::Replace => "replace",
            ErrorPolicy::Ignore => "ignore",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error policy `{0}`, expected strict, replace or ignore")]
pub struct ParsePolicyError(String);

impl FromStr for ErrorPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ErrorPolicy::Strict),
            "replace" => Ok(ErrorPolicy::Replace),
            "ignore" => Ok(ErrorPolicy::Ignore),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Configuration threaded through import injection and span rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Alias the injected import binds and rewritten calls reference.
    pub typing_module: String,
    /// Module imported under `typing_module`.
    pub compat_module: String,
    /// Interpreter version the output must run on.
    pub target: PythonVersion,
}

impl RewriteOptions {
    /// Whether the compatibility import is injected for this target.
    pub fn needs_import(&self) -> bool {
        self.target.needs_union_rewrite()
    }

    /// The injected line, terminator included.
    pub fn import_line(&self) -> String {
        format!("import {} as {}\n", self.compat_module, self.typing_module)
    }
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            typing_module: DEFAULT_TYPING_MODULE.to_string(),
            compat_module: DEFAULT_COMPAT_MODULE.to_string(),
            target: PythonVersion::default(),
        }
    }
}
