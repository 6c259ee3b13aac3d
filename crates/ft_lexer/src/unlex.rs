use ft_ast::{Token, TokenKind};

use crate::{is_identifier, UnlexError, OPERATORS};

/// Reassemble a token stream into source text.
///
/// Each token contributes `prefix + text`. The stream is checked on the way:
/// token texts must match their kind and brackets must balance, so a rewrite
/// that produced an impossible stream fails here instead of emitting broken
/// source.
pub fn untokenize(tokens: &[Token]) -> Result<String, UnlexError> {
    let mut out = String::with_capacity(tokens.iter().map(|t| t.prefix.len() + t.text.len()).sum());
    let mut open: Vec<&Token> = Vec::new();

    for token in tokens {
        check_token(token)?;

        if token.kind == TokenKind::Op {
            match token.text.as_str() {
                "(" | "[" | "{" => open.push(token),
                ")" | "]" | "}" => {
                    let matched = open
                        .pop()
                        .is_some_and(|o| closer(&o.text) == token.text.as_str());
                    if !matched {
                        return Err(UnlexError::UnmatchedBracket {
                            bracket: token.text.clone(),
                            line: token.pos.line,
                        });
                    }
                }
                _ => {}
            }
        }

        out.push_str(&token.prefix);
        out.push_str(&token.text);
    }

    if let Some(unclosed) = open.pop() {
        return Err(UnlexError::UnclosedBracket {
            bracket: unclosed.text.clone(),
            line: unclosed.pos.line,
        });
    }

    Ok(out)
}

fn closer(open: &str) -> &'static str {
    match open {
        "(" => ")",
        "[" => "]",
        _ => "}",
    }
}

fn check_token(token: &Token) -> Result<(), UnlexError> {
    let text = token.text.as_str();
    let ok = match token.kind {
        TokenKind::Name => is_identifier(text),
        TokenKind::Number => text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit() || c == '.'),
        TokenKind::String => text.len() >= 2 && (text.ends_with('"') || text.ends_with('\'')),
        TokenKind::Op => OPERATORS.contains(&text),
        TokenKind::Newline => matches!(text, "" | "\n" | "\r\n" | "\r"),
        TokenKind::Nl => matches!(text, "\n" | "\r\n" | "\r"),
        TokenKind::EndMarker => text.is_empty(),
    };
    if ok {
        Ok(())
    } else {
        Err(UnlexError::MalformedToken {
            kind: token.kind,
            text: token.text.clone(),
            line: token.pos.line,
        })
    }
}
