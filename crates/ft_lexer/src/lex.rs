use ft_ast::{Pos, Token, TokenKind};

use crate::{closing_for, is_ident_continue, is_ident_start, LexError, OPERATORS};

/// Tokenize Python source into a lossless token stream.
///
/// The stream always ends with an [`TokenKind::EndMarker`]; a logical line
/// left open at end of input is closed with an empty [`TokenKind::Newline`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Lexer::new(source).run()?;
    tracing::trace!(count = tokens.len(), "tokenize");
    Ok(tokens)
}

struct Lexer {
    chars: Vec<char>,
    i: usize,
    line: u32,
    col: u32,
    /// Open brackets with the position they were opened at.
    brackets: Vec<(char, Pos)>,
    /// Whether the current logical line has produced a token yet.
    line_has_tokens: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            i: 0,
            line: 1,
            col: 0,
            brackets: Vec::new(),
            line_has_tokens: false,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            let prefix = self.scan_trivia()?;
            let pos = self.pos();

            if self.at_end() {
                if let Some(&(bracket, at)) = self.brackets.last() {
                    return Err(LexError::UnclosedBracket {
                        bracket,
                        line: at.line,
                        col: at.col,
                    });
                }
                let mut end = Token::new(TokenKind::EndMarker, "").at(pos);
                if self.line_has_tokens {
                    self.tokens
                        .push(Token::new(TokenKind::Newline, "").with_prefix(prefix).at(pos));
                } else {
                    end.prefix = prefix;
                }
                self.tokens.push(end);
                return Ok(self.tokens);
            }

            let c = self.chars[self.i];
            let start = self.i;
            let kind = if c == '\n' || c == '\r' {
                self.bump_newline();
                let kind = if self.line_has_tokens {
                    TokenKind::Newline
                } else {
                    TokenKind::Nl
                };
                self.line_has_tokens = false;
                kind
            } else if let Some(prefix_len) = self.string_prefix_len() {
                self.scan_string(prefix_len, pos)?;
                TokenKind::String
            } else if c.is_ascii_digit() || (c == '.' && self.peek_is(1, |n| n.is_ascii_digit())) {
                self.scan_number();
                TokenKind::Number
            } else if is_ident_start(c) {
                while !self.at_end() && is_ident_continue(self.chars[self.i]) {
                    self.bump();
                }
                TokenKind::Name
            } else {
                self.scan_operator(pos)?;
                TokenKind::Op
            };

            if !matches!(kind, TokenKind::Newline | TokenKind::Nl) {
                self.line_has_tokens = true;
            }
            let text: String = self.chars[start..self.i].iter().collect();
            self.tokens.push(Token {
                kind,
                text,
                prefix,
                pos,
            });
        }
    }

    /// Consume whitespace, comments and continuations (and newlines while a
    /// bracket is open), returning them verbatim.
    fn scan_trivia(&mut self) -> Result<String, LexError> {
        let start = self.i;
        while !self.at_end() {
            match self.chars[self.i] {
                ' ' | '\t' | '\x0c' => self.bump(),
                '#' => {
                    while !self.at_end() && !matches!(self.chars[self.i], '\n' | '\r') {
                        self.bump();
                    }
                }
                '\\' => {
                    let pos = self.pos();
                    self.bump();
                    if self.at_end() || !matches!(self.chars[self.i], '\n' | '\r') {
                        return Err(LexError::BadContinuation {
                            line: pos.line,
                            col: pos.col,
                        });
                    }
                    self.bump_newline();
                }
                '\n' | '\r' if !self.brackets.is_empty() => self.bump_newline(),
                _ => break,
            }
        }
        Ok(self.chars[start..self.i].iter().collect())
    }

    /// Length of a string prefix (`r`, `b`, `rb`, `f`, ...) if a string literal
    /// starts here.
    fn string_prefix_len(&self) -> Option<usize> {
        let mut j = self.i;
        while j < self.chars.len() && j - self.i < 2 && "rRbBuUfF".contains(self.chars[j]) {
            j += 1;
        }
        if j >= self.chars.len() || !matches!(self.chars[j], '"' | '\'') {
            return None;
        }
        let prefix: String = self.chars[self.i..j]
            .iter()
            .map(|c| c.to_ascii_lowercase())
            .collect();
        matches!(
            prefix.as_str(),
            "" | "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
        )
        .then_some(j - self.i)
    }

    fn scan_string(&mut self, prefix_len: usize, start: Pos) -> Result<(), LexError> {
        let unterminated = || LexError::UnterminatedString {
            line: start.line,
            col: start.col,
        };

        for _ in 0..prefix_len {
            self.bump();
        }
        let quote = self.chars[self.i];
        let triple = self.peek_is(1, |c| c == quote) && self.peek_is(2, |c| c == quote);
        let opening = if triple { 3 } else { 1 };
        for _ in 0..opening {
            self.bump();
        }

        loop {
            if self.at_end() {
                return Err(unterminated());
            }
            let c = self.chars[self.i];
            if c == '\\' {
                self.bump();
                if self.at_end() {
                    return Err(unterminated());
                }
                if matches!(self.chars[self.i], '\n' | '\r') {
                    self.bump_newline();
                } else {
                    self.bump();
                }
                continue;
            }
            if triple {
                if c == quote && self.peek_is(1, |n| n == quote) && self.peek_is(2, |n| n == quote)
                {
                    for _ in 0..3 {
                        self.bump();
                    }
                    return Ok(());
                }
                if matches!(c, '\n' | '\r') {
                    self.bump_newline();
                } else {
                    self.bump();
                }
            } else {
                if matches!(c, '\n' | '\r') {
                    return Err(unterminated());
                }
                self.bump();
                if c == quote {
                    return Ok(());
                }
            }
        }
    }

    fn scan_number(&mut self) {
        let radix_prefix = self.chars[self.i] == '0'
            && self.peek_is(1, |c| matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        if radix_prefix {
            self.bump();
            self.bump();
            while !self.at_end() && (self.chars[self.i].is_ascii_alphanumeric() || self.chars[self.i] == '_') {
                self.bump();
            }
            return;
        }

        self.eat_digits();
        if self.peek_is(0, |c| c == '.') {
            self.bump();
            self.eat_digits();
        }
        if self.peek_is(0, |c| c == 'e' || c == 'E') {
            let signed = self.peek_is(1, |c| c == '+' || c == '-');
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_is(digit_at, |c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                self.eat_digits();
            }
        }
        if self.peek_is(0, |c| c == 'j' || c == 'J') {
            self.bump();
        }
    }

    fn eat_digits(&mut self) {
        while self.peek_is(0, |c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn scan_operator(&mut self, pos: Pos) -> Result<(), LexError> {
        let op = OPERATORS
            .iter()
            .find(|op| {
                op.chars()
                    .enumerate()
                    .all(|(k, oc)| self.peek_is(k, |c| c == oc))
            })
            .ok_or(LexError::InvalidCharacter {
                ch: self.chars[self.i],
                line: pos.line,
                col: pos.col,
            })?;

        match *op {
            "(" | "[" | "{" => {
                let open = self.chars[self.i];
                self.brackets.push((open, pos));
            }
            ")" | "]" | "}" => {
                let close = self.chars[self.i];
                match self.brackets.pop() {
                    Some((open, _)) if closing_for(open) == close => {}
                    _ => {
                        return Err(LexError::UnmatchedBracket {
                            bracket: close,
                            line: pos.line,
                            col: pos.col,
                        })
                    }
                }
            }
            _ => {}
        }

        for _ in 0..op.chars().count() {
            self.bump();
        }
        Ok(())
    }

    fn at_end(&self) -> bool {
        self.i >= self.chars.len()
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn peek_is(&self, offset: usize, pred: impl Fn(char) -> bool) -> bool {
        self.chars.get(self.i + offset).is_some_and(|&c| pred(c))
    }

    fn bump(&mut self) {
        self.i += 1;
        self.col += 1;
    }

    /// Consume one line terminator: `\n`, `\r\n` or a lone `\r`.
    fn bump_newline(&mut self) {
        if self.chars[self.i] == '\r' && self.peek_is(1, |c| c == '\n') {
            self.i += 1;
        }
        self.i += 1;
        self.line += 1;
        self.col = 0;
    }
}
