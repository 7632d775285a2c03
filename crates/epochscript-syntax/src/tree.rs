//! Read-only helpers over EpochScript syntax trees.
//!
//! Navigation itself (`kind`, `text_range`, `children`, `parent`,
//! `preorder`) comes from `rowan`. This module adds what the generic tree
//! does not know: field names, significant children and line positions.

use std::fmt::Write as _;

use rowan::NodeOrToken;
use text_size::TextSize;

use crate::language::language;
use crate::syntax::{SyntaxElement, SyntaxKind, SyntaxNode};

/// Children of `node` other than whitespace and comments.
///
/// Field positions index into this sequence.
pub fn significant_children(node: &SyntaxNode) -> impl Iterator<Item = SyntaxElement> {
    node.children_with_tokens()
        .filter(|element| !element.kind().is_trivia())
}

/// The child labelled `field` in the grammar, e.g. `"right"` of an
/// `AssignStmt`.
#[must_use]
pub fn child_by_field(node: &SyntaxNode, field: &str) -> Option<SyntaxElement> {
    let lang = language();
    let id = lang.field_id(field)?;
    let position = lang.field_position(node.kind(), id)?;
    significant_children(node).nth(position)
}

/// Like [`child_by_field`], for fields that hold a node.
#[must_use]
pub fn child_node_by_field(node: &SyntaxNode, field: &str) -> Option<SyntaxNode> {
    child_by_field(node, field)?.into_node()
}

/// All `Error` nodes under `root` (inclusive) in preorder.
#[must_use]
pub fn error_nodes(root: &SyntaxNode) -> Vec<SyntaxNode> {
    root.descendants()
        .filter(|node| node.kind() == SyntaxKind::Error)
        .collect()
}

/// Concatenated text of all leaves.
#[must_use]
pub fn leaves_text(root: &SyntaxNode) -> String {
    root.descendants_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .map(|token| token.text().to_string())
        .collect()
}

/// Debug rendering: one line per node and per significant token.
#[must_use]
pub fn dump(node: &SyntaxNode) -> String {
    let mut out = String::new();
    dump_node(node, &mut out, 0);
    out
}

fn dump_node(node: &SyntaxNode, out: &mut String, depth: usize) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{indent}{:?}@{:?}", node.kind(), node.text_range());
    for child in node.children_with_tokens() {
        match child {
            NodeOrToken::Node(n) => dump_node(&n, out, depth + 1),
            NodeOrToken::Token(t) => {
                if !t.kind().is_trivia() {
                    let _ = writeln!(
                        out,
                        "{}{:?}@{:?} {:?}",
                        "  ".repeat(depth + 1),
                        t.kind(),
                        t.text_range(),
                        t.text()
                    );
                }
            }
        }
    }
}

/// Zero-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    /// Zero-based line.
    pub line: u32,
    /// Byte offset from the start of the line.
    pub col: u32,
}

/// Maps byte offsets to line/column positions and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    /// Indexes the line starts of `text`.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        line_starts.extend(
            text.match_indices('\n')
                .map(|(i, _)| TextSize::from((i + 1) as u32)),
        );
        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    /// Number of lines; a trailing newline starts an empty last line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of `offset`, clamped to the end of the text.
    #[must_use]
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or_default();
        LineCol {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            col: u32::from(offset - start),
        }
    }

    /// Offset of a position, or `None` past the end of its line.
    #[must_use]
    pub fn offset(&self, position: LineCol) -> Option<TextSize> {
        let line = usize::try_from(position.line).ok()?;
        let start = *self.line_starts.get(line)?;
        let end = self.line_starts.get(line + 1).copied().unwrap_or(self.len);
        let offset = start + TextSize::from(position.col);
        (offset <= end).then_some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_child_by_field() {
        let parse = parse("x = a + b\n");
        let root = parse.syntax();
        let assign = root.first_child().unwrap();
        assert_eq!(assign.kind(), SyntaxKind::AssignStmt);

        let left = child_node_by_field(&assign, "left").unwrap();
        assert_eq!(left.kind(), SyntaxKind::Name);
        let right = child_node_by_field(&assign, "right").unwrap();
        assert_eq!(right.kind(), SyntaxKind::BinaryExpr);
        assert_eq!(right.text(), "a + b");

        let operator = child_by_field(&right, "operator").unwrap();
        assert_eq!(operator.kind(), SyntaxKind::Plus);
        assert!(child_by_field(&right, "function").is_none());
        assert!(child_by_field(&right, "no_such_field").is_none());
    }

    #[test]
    fn test_if_fields() {
        let parse = parse("if a:\n    b = 1\nelse:\n    b = 2\n");
        assert!(parse.ok(), "{:?}", parse.errors());
        let stmt = parse.syntax().first_child().unwrap();
        assert_eq!(stmt.kind(), SyntaxKind::IfStmt);
        assert_eq!(child_node_by_field(&stmt, "condition").unwrap().text(), "a");
        let block = child_node_by_field(&stmt, "consequence").unwrap();
        assert_eq!(block.kind(), SyntaxKind::Block);
        let else_clause = stmt.children().find(|n| n.kind() == SyntaxKind::ElseClause).unwrap();
        let body = child_node_by_field(&else_clause, "body").unwrap();
        assert!(body.text().to_string().contains("b = 2"));
    }

    #[test]
    fn test_leaves_text_and_error_nodes() {
        let source = "x = (1 +\ny = @\n";
        let parse = parse(source);
        assert_eq!(leaves_text(&parse.syntax()), source);
        assert!(!error_nodes(&parse.syntax()).is_empty());
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.line_col(0.into()), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(4.into()), LineCol { line: 1, col: 1 });
        assert_eq!(index.line_col(6.into()), LineCol { line: 2, col: 0 });
        assert_eq!(index.line_col(60.into()), LineCol { line: 2, col: 0 });
        assert_eq!(index.offset(LineCol { line: 1, col: 2 }), Some(5.into()));
        assert_eq!(index.offset(LineCol { line: 1, col: 4 }), None);
        assert_eq!(index.offset(LineCol { line: 7, col: 0 }), None);
    }
}
