//! Green tree construction for the LR driver.
//!
//! Every stack entry of the parser owns a forest: the green elements
//! produced for the symbols it stands for. The sink creates those elements
//! from tokens and wraps forests into nodes on reduction.

use std::ops::Range;

use rowan::{GreenNode, GreenNodeData, GreenToken, NodeOrToken};

use crate::lexer::Token;
use crate::parser::source::Lookahead;
use crate::syntax::{EpochLanguage, GreenElement, SyntaxKind};

/// Builds green elements from tokens of one source text.
pub(crate) struct Sink<'t, 'src> {
    tokens: &'t [Token],
    source: &'src str,
}

impl<'t, 'src> Sink<'t, 'src> {
    /// Creates a new sink.
    pub(crate) fn new(tokens: &'t [Token], source: &'src str) -> Self {
        Self { tokens, source }
    }

    fn token(&self, token: &Token) -> GreenElement {
        NodeOrToken::Token(GreenToken::new(
            SyntaxKind::from(token.kind).into(),
            token.text(self.source),
        ))
    }

    /// Leaves for a range of token indices.
    pub(crate) fn tokens(&self, range: Range<usize>) -> Vec<GreenElement> {
        self.tokens[range].iter().map(|token| self.token(token)).collect()
    }

    /// Leaves for a lookahead: its trivia followed by the token itself.
    pub(crate) fn lookahead(&self, lookahead: &Lookahead) -> Vec<GreenElement> {
        let mut forest = self.tokens(lookahead.trivia.clone());
        forest.push(self.token(&lookahead.token));
        forest
    }

    /// Wraps `children` in a node of `kind`.
    ///
    /// Leading trivia stays outside the node so that nodes start at their
    /// first significant token.
    pub(crate) fn node(kind: SyntaxKind, mut children: Vec<GreenElement>) -> Vec<GreenElement> {
        let split = children
            .iter()
            .position(|element| !is_trivia(element))
            .unwrap_or(children.len());
        let inner = children.split_off(split);
        children.push(NodeOrToken::Node(GreenNode::new(kind.into(), inner)));
        children
    }
}

fn kind_of(raw: rowan::SyntaxKind) -> SyntaxKind {
    <EpochLanguage as rowan::Language>::kind_from_raw(raw)
}

/// Returns `true` for whitespace and comment leaves.
pub(crate) fn is_trivia(element: &GreenElement) -> bool {
    match element {
        NodeOrToken::Token(token) => kind_of(token.kind()).is_trivia(),
        NodeOrToken::Node(_) => false,
    }
}

/// `Indent` count minus `Dedent` count, including nested nodes.
pub(crate) fn layout_balance(forest: &[GreenElement]) -> i32 {
    forest
        .iter()
        .map(|element| match element {
            NodeOrToken::Token(token) => token_balance(kind_of(token.kind())),
            NodeOrToken::Node(node) => node_balance(node),
        })
        .sum()
}

fn node_balance(node: &GreenNodeData) -> i32 {
    node.children()
        .map(|child| match child {
            NodeOrToken::Token(token) => token_balance(kind_of(token.kind())),
            NodeOrToken::Node(node) => node_balance(node),
        })
        .sum()
}

fn token_balance(kind: SyntaxKind) -> i32 {
    match kind {
        SyntaxKind::Indent => 1,
        SyntaxKind::Dedent => -1,
        _ => 0,
    }
}

/// Kind of the last non-trivia leaf in `forest`.
pub(crate) fn last_significant(forest: &[GreenElement]) -> Option<SyntaxKind> {
    forest.iter().rev().find_map(|element| match element {
        NodeOrToken::Token(token) => {
            let kind = kind_of(token.kind());
            (!kind.is_trivia()).then_some(kind)
        }
        NodeOrToken::Node(node) => last_in_node(node),
    })
}

fn last_in_node(node: &GreenNodeData) -> Option<SyntaxKind> {
    node.children().rev().find_map(|child| match child {
        NodeOrToken::Token(token) => {
            let kind = kind_of(token.kind());
            (!kind.is_trivia()).then_some(kind)
        }
        NodeOrToken::Node(node) => last_in_node(node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    #[test]
    fn test_node_keeps_leading_trivia_outside() {
        let source = "a  b";
        let tokens = lex(source);
        let sink = Sink::new(&tokens, source);
        let leaves = sink.tokens(1..3);
        let forest = Sink::node(SyntaxKind::NameRef, leaves);
        assert_eq!(forest.len(), 2);
        assert!(is_trivia(&forest[0]));
        let NodeOrToken::Node(node) = &forest[1] else {
            panic!("expected a node");
        };
        assert_eq!(kind_of(node.kind()), SyntaxKind::NameRef);
        assert_eq!(node.text_len(), 1.into());
    }

    #[test]
    fn test_layout_helpers() {
        let source = "if a:\n    b\n";
        let tokens = lex(source);
        let sink = Sink::new(&tokens, source);
        let leaves = sink.tokens(0..tokens.len() - 1);
        assert_eq!(layout_balance(&leaves), 0);
        assert_eq!(layout_balance(&leaves[..7]), 1);
        assert_eq!(last_significant(&leaves), Some(SyntaxKind::Dedent));
        let wrapped = Sink::node(SyntaxKind::Error, leaves[..5].to_vec());
        assert_eq!(last_significant(&wrapped), Some(SyntaxKind::Newline));
    }
}
