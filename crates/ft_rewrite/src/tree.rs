//! Bracket grouping over a span's tokens.

use ft_ast::{Token, TokenKind, TokenSpan};

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf {
        token: Token,
        /// Token touches a `.` outside the span, so it is part of a dotted name.
        attribute: bool,
    },
    /// A `[` ... `]` group. `close` is `None` when the span ended inside it.
    Group {
        open: Token,
        children: Vec<Node>,
        close: Option<Token>,
    },
}

impl Node {
    pub(crate) fn leaf_token(&self) -> Option<&Token> {
        match self {
            Node::Leaf { token, .. } => Some(token),
            Node::Group { .. } => None,
        }
    }

    pub(crate) fn is_leaf_op(&self, text: &str) -> bool {
        self.leaf_token().is_some_and(|t| t.is_op(text))
    }

    /// Leaf `,` or a `]` with no matching `[` in the span.
    pub(crate) fn is_separator(&self) -> bool {
        self.is_leaf_op(",") || self.is_leaf_op("]")
    }

    pub(crate) fn is_closed_subscript(&self) -> bool {
        matches!(self, Node::Group { close: Some(_), .. })
    }

    pub(crate) fn is_attribute(&self) -> bool {
        match self {
            Node::Leaf { attribute, .. } => *attribute,
            Node::Group { children, .. } => children.iter().any(Node::is_attribute),
        }
    }

    /// Whether this node is a leaf of `kind`.
    pub(crate) fn is_leaf_kind(&self, kind: TokenKind) -> bool {
        self.leaf_token().is_some_and(|t| t.kind == kind)
    }
}

/// Fold a span into nested subscript groups.
pub(crate) fn build(span: &TokenSpan) -> Vec<Node> {
    let last = span.len().saturating_sub(1);
    let mut root: Vec<Node> = Vec::new();
    let mut frames: Vec<(Token, Vec<Node>)> = Vec::new();

    for (i, classified) in span.tokens.iter().enumerate() {
        let token = classified.token.clone();
        if token.is_op("[") {
            frames.push((token, Vec::new()));
            continue;
        }
        if token.is_op("]") {
            if let Some((open, children)) = frames.pop() {
                let group = Node::Group {
                    open,
                    children,
                    close: Some(token),
                };
                current(&mut root, &mut frames).push(group);
                continue;
            }
        }
        let attribute = (i == 0 && span.follows_dot) || (i == last && span.precedes_dot);
        current(&mut root, &mut frames).push(Node::Leaf { token, attribute });
    }

    while let Some((open, children)) = frames.pop() {
        let group = Node::Group {
            open,
            children,
            close: None,
        };
        current(&mut root, &mut frames).push(group);
    }

    root
}

fn current<'a>(root: &'a mut Vec<Node>, frames: &'a mut [(Token, Vec<Node>)]) -> &'a mut Vec<Node> {
    match frames.last_mut() {
        Some((_, children)) => children,
        None => root,
    }
}
