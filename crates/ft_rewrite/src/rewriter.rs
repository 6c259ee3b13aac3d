//! Top-level span rewriting entry point.

use ft_ast::{PythonVersion, Token, TokenKind, TokenSpan};

use crate::generics;
use crate::tree::{self, Node};
use crate::union::{self, make_union_call};

/// Turns one completed span into replacement tokens.
///
/// Implementations must return the span's tokens unchanged for anything that
/// is not a type expression, since spans are gathered lexically.
pub trait SpanRewriter {
    fn rewrite(&self, span: &TokenSpan, typing_module: &str) -> Vec<Token>;
}

/// Passes every span through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRewriter;

impl SpanRewriter for IdentityRewriter {
    fn rewrite(&self, span: &TokenSpan, _typing_module: &str) -> Vec<Token> {
        span.to_tokens()
    }
}

/// Rewrites builtin generics and `|` unions into compatibility-module calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingRewriter {
    pub generics: bool,
    pub unions: bool,
}

impl TypingRewriter {
    /// Enable only the rewrites `target` cannot run natively.
    pub fn for_target(target: PythonVersion) -> Self {
        Self {
            generics: target.needs_generic_rewrite(),
            unions: target.needs_union_rewrite(),
        }
    }
}

impl Default for TypingRewriter {
    fn default() -> Self {
        Self {
            generics: true,
            unions: true,
        }
    }
}

impl SpanRewriter for TypingRewriter {
    fn rewrite(&self, span: &TokenSpan, typing_module: &str) -> Vec<Token> {
        if !self.generics && !self.unions {
            return span.to_tokens();
        }

        let nodes = tree::build(span);
        let ctx = Ctx {
            alias: typing_module,
            rewriter: *self,
        };
        let mut out = Vec::with_capacity(span.len());
        ctx.emit_level(&nodes, span.follows_annotation, &mut out);

        if out.len() != span.len() {
            tracing::trace!(
                line = span.tokens.first().map(|t| t.token.pos.line),
                before = span.len(),
                after = out.len(),
                "rewrote span"
            );
        }
        out
    }
}

struct Ctx<'a> {
    alias: &'a str,
    rewriter: TypingRewriter,
}

impl Ctx<'_> {
    /// Emit one bracket level, rewriting each separator-delimited element.
    ///
    /// `annotation` is set after `:`/`->` and inside subscripts, where short
    /// uppercase names (`T`, `KT`) are taken as types.
    fn emit_level(&self, nodes: &[Node], annotation: bool, out: &mut Vec<Token>) {
        let mut start = 0;
        for (i, node) in nodes.iter().enumerate() {
            if node.is_separator() {
                self.emit_element(&nodes[start..i], annotation, out);
                self.emit_plain(std::slice::from_ref(node), out);
                start = i + 1;
            }
        }
        self.emit_element(&nodes[start..], annotation, out);
    }

    fn emit_element(&self, element: &[Node], annotation: bool, out: &mut Vec<Token>) {
        let operands = if self.rewriter.unions {
            union::union_operands(element, annotation)
        } else {
            None
        };
        let Some(operands) = operands else {
            self.emit_plain(element, out);
            return;
        };

        let rewritten = operands
            .into_iter()
            .map(|operand| {
                let mut tokens = Vec::new();
                self.emit_plain(operand.nodes, &mut tokens);
                (operand.pipe.cloned(), tokens)
            })
            .collect();
        out.extend(make_union_call(self.alias, rewritten));
    }

    /// Emit nodes in order, renaming builtin generics and recursing into groups.
    fn emit_plain(&self, nodes: &[Node], out: &mut Vec<Token>) {
        for (i, node) in nodes.iter().enumerate() {
            match node {
                Node::Leaf { token, attribute } => {
                    let subscripted = matches!(nodes.get(i + 1), Some(Node::Group { .. }));
                    let compat = if self.rewriter.generics
                        && subscripted
                        && !*attribute
                        && token.kind == TokenKind::Name
                    {
                        generics::compat_name(&token.text)
                    } else {
                        None
                    };
                    match compat {
                        Some(member) => out.extend(generics::qualified(self.alias, member, token)),
                        None => out.push(token.clone()),
                    }
                }
                Node::Group {
                    open,
                    children,
                    close,
                } => {
                    out.push(open.clone());
                    self.emit_level(children, true, out);
                    out.extend(close.iter().cloned());
                }
            }
        }
    }
}
