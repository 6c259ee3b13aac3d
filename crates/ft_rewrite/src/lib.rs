//! Span rewriting that turns new-style annotations into compatibility calls.
//!
//! Transforms, applied to one classified [`TokenSpan`](ft_ast::TokenSpan) at a time:
//! - `list[int]`   → `typing___.List[int]`
//! - `int | None`  → `typing___.Union[int, None]`
//!
//! Spans are built from a lexical heuristic and may hold ordinary code
//! (`a | b`, `y[0]`). Anything that does not look like a type expression is
//! passed through unchanged.

pub mod generics;
pub mod rewriter;
mod tree;
pub mod union;

pub use rewriter::{IdentityRewriter, SpanRewriter, TypingRewriter};
