//! Structural patterns over syntax trees.
//!
//! A pattern is written as an s-expression of kind names:
//!
//! ```text
//! (AssignStmt Name (CallExpr _ ArgList))
//! ```
//!
//! `_` matches any kind. A bare kind matches a node or token of that kind
//! regardless of its children. Child patterns must match an ordered
//! subsequence of the significant children (trivia excluded).

use smol_str::SmolStr;

use crate::syntax::{SyntaxElement, SyntaxKind, SyntaxNode};
use crate::tree::significant_children;

/// Errors from [`Pattern::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    /// The pattern text contains nothing.
    #[error("empty pattern")]
    Empty,
    /// The text ended inside a parenthesized pattern.
    #[error("unexpected end of pattern, expected `)`")]
    UnexpectedEnd,
    /// A character that cannot start a pattern.
    #[error("unexpected `{ch}` at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset in the pattern text.
        offset: usize,
    },
    /// A name that is not a [`SyntaxKind`].
    #[error("unknown syntax kind `{0}`")]
    UnknownKind(SmolStr),
    /// Text after a complete pattern.
    #[error("trailing input at offset {0}")]
    TrailingInput(usize),
}

/// A parsed structural pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Kind to match, or `None` for `_`.
    kind: Option<SyntaxKind>,
    children: Vec<Pattern>,
}

impl Pattern {
    /// Parses a pattern from text.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] describing the first problem found.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        let mut parser = PatternParser { text, pos: 0 };
        parser.skip_whitespace();
        if parser.at_end() {
            return Err(PatternError::Empty);
        }
        let pattern = parser.pattern()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(PatternError::TrailingInput(parser.pos));
        }
        Ok(pattern)
    }

    /// Kind this pattern matches, `None` for the wildcard.
    #[must_use]
    pub fn kind(&self) -> Option<SyntaxKind> {
        self.kind
    }

    /// Child patterns.
    #[must_use]
    pub fn children(&self) -> &[Pattern] {
        &self.children
    }

    /// Returns `true` if `node` matches.
    #[must_use]
    pub fn matches(&self, node: &SyntaxNode) -> bool {
        self.matches_element(&SyntaxElement::Node(node.clone()))
    }

    /// Returns `true` if `element` matches.
    #[must_use]
    pub fn matches_element(&self, element: &SyntaxElement) -> bool {
        if self.kind.is_some_and(|kind| kind != element.kind()) {
            return false;
        }
        if self.children.is_empty() {
            return true;
        }
        let Some(node) = element.as_node() else {
            return false;
        };
        let mut candidates = significant_children(node);
        self.children
            .iter()
            .all(|child| candidates.any(|candidate| child.matches_element(&candidate)))
    }
}

impl std::str::FromStr for Pattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// All nodes under `root` (inclusive) matching `pattern`, in preorder.
#[must_use]
pub fn find_all(root: &SyntaxNode, pattern: &Pattern) -> Vec<SyntaxNode> {
    root.descendants()
        .filter(|node| pattern.matches(node))
        .collect()
}

struct PatternParser<'a> {
    text: &'a str,
    pos: usize,
}

impl PatternParser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek().filter(|ch| ch.is_whitespace()) {
            self.pos += ch.len_utf8();
        }
    }

    fn pattern(&mut self) -> Result<Pattern, PatternError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(PatternError::UnexpectedEnd),
            Some('(') => {
                self.pos += 1;
                self.skip_whitespace();
                let kind = self.kind()?;
                let mut children = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        None => return Err(PatternError::UnexpectedEnd),
                        Some(')') => {
                            self.pos += 1;
                            return Ok(Pattern { kind, children });
                        }
                        Some(_) => children.push(self.pattern()?),
                    }
                }
            }
            Some(_) => Ok(Pattern {
                kind: self.kind()?,
                children: Vec::new(),
            }),
        }
    }

    fn kind(&mut self) -> Result<Option<SyntaxKind>, PatternError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        let name = &self.text[start..self.pos];
        if name.is_empty() {
            return match self.peek() {
                Some(ch) => Err(PatternError::UnexpectedChar { ch, offset: start }),
                None => Err(PatternError::UnexpectedEnd),
            };
        }
        if name == "_" {
            return Ok(None);
        }
        SyntaxKind::from_name(name)
            .map(Some)
            .ok_or_else(|| PatternError::UnknownKind(SmolStr::new(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_parse_patterns() {
        let pattern = Pattern::parse("(AssignStmt Name (CallExpr _ ArgList))").unwrap();
        assert_eq!(pattern.kind(), Some(SyntaxKind::AssignStmt));
        assert_eq!(pattern.children().len(), 2);
        assert_eq!(pattern.children()[1].children()[0].kind(), None);

        let bare: Pattern = "Ident".parse().unwrap();
        assert_eq!(bare.kind(), Some(SyntaxKind::Ident));
        assert!(bare.children().is_empty());
    }

    #[test]
    fn test_pattern_errors() {
        assert_eq!(Pattern::parse("  "), Err(PatternError::Empty));
        assert_eq!(Pattern::parse("(CallExpr"), Err(PatternError::UnexpectedEnd));
        assert_eq!(
            Pattern::parse("(ClassDef)"),
            Err(PatternError::UnknownKind("ClassDef".into()))
        );
        assert_eq!(
            Pattern::parse("(CallExpr))"),
            Err(PatternError::TrailingInput(10))
        );
        assert_eq!(
            Pattern::parse("(CallExpr ?)"),
            Err(PatternError::UnexpectedChar { ch: '?', offset: 10 })
        );
    }

    #[test]
    fn test_find_all() {
        let parse = parse("a = f(1)\nb = g(h(2))\n");
        let root = parse.syntax();

        let calls = find_all(&root, &Pattern::parse("CallExpr").unwrap());
        let texts: Vec<String> = calls.iter().map(|n| n.text().to_string()).collect();
        assert_eq!(texts, ["f(1)", "g(h(2))", "h(2)"]);

        let nested = Pattern::parse("(CallExpr NameRef (ArgList CallExpr))").unwrap();
        let found = find_all(&root, &nested);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(), "g(h(2))");

        let ordered = Pattern::parse("(AssignStmt Literal Name)").unwrap();
        assert!(find_all(&root, &ordered).is_empty());
    }

    #[test]
    fn test_tokens_match_bare_kinds() {
        let parse = parse("x = 1 + 2\n");
        let pattern = Pattern::parse("(BinaryExpr Literal Plus Literal)").unwrap();
        assert_eq!(find_all(&parse.syntax(), &pattern).len(), 1);
        let wrong = Pattern::parse("(BinaryExpr Literal Minus)").unwrap();
        assert!(find_all(&parse.syntax(), &wrong).is_empty());
    }
}
