//! Shared helpers for parser tests.
#![allow(dead_code, unused_imports)]

pub use epochscript_syntax::parser::parse;
pub use epochscript_syntax::syntax::{SyntaxKind, SyntaxNode};

use rowan::NodeOrToken;

/// Helper to format a parse result for snapshot testing.
pub fn snapshot_parse(source: &str) -> String {
    let parsed = parse(source);
    let syntax = parsed.syntax();

    let mut output = String::new();
    format_node(&syntax, &mut output, 0);

    if !parsed.ok() {
        output.push_str("\n---\nErrors:\n");
        for err in parsed.errors() {
            output.push_str(&format!("  - {}\n", err));
        }
    }

    output
}

fn format_node(node: &SyntaxNode, out: &mut String, depth: usize) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{}{:?}@{:?}\n",
        indent,
        node.kind(),
        node.text_range()
    ));

    for child in node.children_with_tokens() {
        match child {
            NodeOrToken::Node(n) => format_node(&n, out, depth + 1),
            NodeOrToken::Token(t) => {
                let kind = t.kind();
                if !kind.is_trivia() {
                    out.push_str(&format!(
                        "{}{:?}@{:?} {:?}\n",
                        "  ".repeat(depth + 1),
                        kind,
                        t.text_range(),
                        t.text()
                    ));
                }
            }
        }
    }
}

/// Asserts that the tree reproduces `source` byte for byte.
pub fn assert_lossless(source: &str) {
    let parsed = parse(source);
    assert_eq!(parsed.syntax().text().to_string(), source);
    assert_eq!(
        epochscript_syntax::tree::leaves_text(&parsed.syntax()),
        source
    );
}

/// Number of tokens of `kind` anywhere in the tree.
pub fn count_tokens(root: &SyntaxNode, kind: SyntaxKind) -> usize {
    root.descendants_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .filter(|token| token.kind() == kind)
        .count()
}

/// Kinds of the root's child nodes.
pub fn statement_kinds(source: &str) -> Vec<SyntaxKind> {
    parse(source).syntax().children().map(|n| n.kind()).collect()
}
