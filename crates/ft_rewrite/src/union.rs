//! Rewriting for the `|` union operator.
//!
//! `A | B | C` → `typing___.Union[A, B, C]`

use ft_ast::{Token, TokenKind};

use crate::tree::Node;

/// Builtin names that are types when used as union members.
const BUILTIN_TYPES: &[&str] = &[
    "bool", "bytearray", "bytes", "complex", "dict", "float", "frozenset", "int", "list",
    "memoryview", "object", "range", "set", "slice", "str", "tuple", "type",
];

/// One `|`-separated member of a union element.
pub(crate) struct Operand<'a> {
    /// The `|` in front of this operand, `None` for the first one.
    pub pipe: Option<&'a Token>,
    pub nodes: &'a [Node],
}

/// Split an element at top-level `|` and accept it as a union of types.
///
/// Every operand must be a name, a subscripted name or a string literal, none
/// of them part of a dotted name cut by the span edge. Then either all of
/// them look like types or one of them is `None` or a forward reference;
/// `a | b` between ordinary values is refused. `annotation` is set when the
/// element sits after `:`/`->` or inside a subscript, where short
/// uppercase names (`T`, `KT`) count as types.
pub(crate) fn union_operands(element: &[Node], annotation: bool) -> Option<Vec<Operand<'_>>> {
    if !element.iter().any(|n| n.is_leaf_op("|")) {
        return None;
    }

    let mut operands = Vec::new();
    let mut pipe = None;
    let mut start = 0;
    for (i, node) in element.iter().enumerate() {
        if node.is_leaf_op("|") {
            operands.push(Operand {
                pipe,
                nodes: &element[start..i],
            });
            pipe = node.leaf_token();
            start = i + 1;
        }
    }
    operands.push(Operand {
        pipe,
        nodes: &element[start..],
    });

    let mut all_types = true;
    let mut has_none_or_ref = false;
    for operand in &operands {
        let (type_like, none_or_ref) = classify_operand(operand.nodes, annotation)?;
        all_types &= type_like;
        has_none_or_ref |= none_or_ref;
    }

    (all_types || has_none_or_ref).then_some(operands)
}

/// `Some((looks_like_type, is_none_or_forward_ref))` for a well-formed operand.
fn classify_operand(nodes: &[Node], annotation: bool) -> Option<(bool, bool)> {
    if nodes.iter().any(Node::is_attribute) {
        return None;
    }
    match nodes {
        [leaf] if leaf.is_leaf_kind(TokenKind::String) => Some((true, true)),
        [leaf] if leaf.is_leaf_kind(TokenKind::Name) => {
            let name = leaf.leaf_token()?.text.as_str();
            Some((is_type_name(name, annotation), name == "None"))
        }
        [leaf, group] if leaf.is_leaf_kind(TokenKind::Name) && group.is_closed_subscript() => {
            Some((true, false))
        }
        _ => None,
    }
}

/// `None`, a builtin type, or a capitalized name that is not a constant.
///
/// Short all-caps names are types only in an annotation: `T | None` after
/// `:` is a union, `re.I | re.M` style flags passed as arguments are not.
fn is_type_name(name: &str, annotation: bool) -> bool {
    if name == "None" || BUILTIN_TYPES.contains(&name) {
        return true;
    }
    let starts_upper = name.chars().next().is_some_and(char::is_uppercase);
    let has_lower = name.chars().any(char::is_lowercase);
    // `T`, `KT`, `IO` are types, `MAX_SIZE` is a constant.
    starts_upper && (has_lower || (annotation && name.chars().count() <= 2))
}

/// Build `<alias>.Union[op1, op2, ...]`.
///
/// `operands` pairs each already-rewritten operand with the `|` that preceded
/// it. The first operand's prefix goes to the alias. A `|` prefix that spans
/// lines moves to the `,` replacing it, so line structure is unchanged.
pub fn make_union_call(alias: &str, operands: Vec<(Option<Token>, Vec<Token>)>) -> Vec<Token> {
    let mut out = Vec::new();
    let mut operands = operands.into_iter();
    let Some((_, mut first)) = operands.next() else {
        return out;
    };

    let (prefix, pos) = first
        .first_mut()
        .map(|t| (std::mem::take(&mut t.prefix), t.pos))
        .unwrap_or_default();
    out.push(Token::name(alias).with_prefix(prefix).at(pos));
    out.push(Token::op(".").at(pos));
    out.push(Token::name("Union").at(pos));
    out.push(Token::op("[").at(pos));
    out.extend(first);

    for (pipe, tokens) in operands {
        let comma = match pipe {
            Some(pipe) if pipe.prefix.contains(['\n', '\r']) => {
                Token::op(",").with_prefix(pipe.prefix).at(pipe.pos)
            }
            Some(pipe) => Token::op(",").at(pipe.pos),
            None => Token::op(","),
        };
        out.push(comma);
        out.extend(tokens);
    }

    let end = out.last().map(|t| t.pos).unwrap_or(pos);
    out.push(Token::op("]").at(end));
    out
}
