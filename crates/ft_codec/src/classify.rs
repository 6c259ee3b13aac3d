//! Generic-span classification over the live token stream.
//!
//! Without a parser, bracket depth is the only signal that tells a comma
//! between type arguments from a comma between unrelated expressions, and a
//! forward-reference string from an ordinary string constant.

use ft_ast::{Token, TokenKind, TokenSpan};

/// Outcome of feeding one token to a [`Classifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The token joined the current span.
    Absorbed,
    /// The token ended the current span. `span` is the completed span, if any
    /// tokens had been absorbed; `terminator` passes through unchanged.
    Flush {
        span: Option<TokenSpan>,
        terminator: Token,
    },
}

/// Groups a token stream into spans that may hold a generic type expression.
pub trait Classifier {
    fn push(&mut self, token: Token) -> Step;

    /// End of stream: hand back a span that no terminator closed.
    fn finish(&mut self) -> Option<TokenSpan>;
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Accumulating(TokenSpan),
}

/// Lexical classifier driven by `[`/`]` depth.
///
/// Names, numbers and strings are always absorbed; `|`, `[` and `]` are
/// absorbed; a `,` is absorbed only inside an unclosed `[`. Everything else
/// closes the span.
#[derive(Debug, Default)]
pub struct BracketDepthClassifier {
    state: State,
    /// The last standalone token was `.`.
    after_dot: bool,
    /// The last standalone token was `:` or `->`.
    after_annotation: bool,
}

impl BracketDepthClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bracket depth of the span being accumulated, `0` when idle.
    fn depth(&self) -> i32 {
        match &self.state {
            State::Accumulating(span) => span.depth(),
            State::Idle => 0,
        }
    }
}

impl Classifier for BracketDepthClassifier {
    fn push(&mut self, token: Token) -> Step {
        let absorb = matches!(
            token.kind,
            TokenKind::Name | TokenKind::Number | TokenKind::String
        ) || is_in_generic(&token, self.depth());

        if absorb {
            if let State::Accumulating(span) = &mut self.state {
                span.push(token);
            } else {
                let mut span = TokenSpan::new();
                span.follows_dot = self.after_dot;
                span.follows_annotation = self.after_annotation;
                span.push(token);
                self.state = State::Accumulating(span);
            }
            return Step::Absorbed;
        }

        let span = match std::mem::take(&mut self.state) {
            State::Accumulating(mut span) => {
                span.precedes_dot = token.is_op(".");
                Some(span)
            }
            State::Idle => None,
        };
        self.after_dot = token.is_op(".");
        self.after_annotation = token.is_op(":") || token.is_op("->");
        Step::Flush {
            span,
            terminator: token,
        }
    }

    fn finish(&mut self) -> Option<TokenSpan> {
        match std::mem::take(&mut self.state) {
            State::Accumulating(span) => Some(span),
            State::Idle => None,
        }
    }
}

/// Whether `token` continues a generic expression, given the bracket depth
/// of the span so far.
///
/// `|`, `[` and `]` always do. A `,` or a string literal does only while the
/// span has an unclosed `[`.
pub fn is_in_generic(token: &Token, depth: i32) -> bool {
    if token.kind == TokenKind::Op && matches!(token.text.as_str(), "|" | "[" | "]") {
        return true;
    }

    if token.kind == TokenKind::String || token.is_op(",") {
        return depth > 0;
    }

    false
}
