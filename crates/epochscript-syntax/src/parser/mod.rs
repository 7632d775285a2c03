//! Parser for EpochScript.
//!
//! This module drives the LALR(1) tables compiled from the grammar and
//! builds a lossless concrete syntax tree (CST) using the `rowan` library.
//!
//! # Design
//!
//! The parser is designed for editor use:
//!
//! - **Error-tolerant**: Continues after errors, wrapping what it could not
//!   attribute to a rule in `Error` nodes
//! - **Lossless**: Preserves all source text including whitespace and comments
//! - **Incremental**: Trees can be updated after an edit with [`Parse::reparse`]
//!
//! # Architecture
//!
//! 1. **Lexing**: Tokenize source text with layout (see `lexer` module)
//! 2. **Parsing**: Shift/reduce over the compiled tables; each stack entry
//!    carries the green elements built for its symbol
//! 3. **Tree Building**: Reductions wrap or splice those elements; the root
//!    is built once the input is accepted

#![allow(clippy::module_inception)]

mod parser;
mod sink;
mod source;

use rowan::GreenNode;
use text_size::TextRange;

use crate::config::ParseConfig;
use crate::incremental::Edit;
use crate::language::language;
use crate::lexer::{LexError, LexErrorKind, Lexed, Lexer};
use crate::syntax::SyntaxNode;
use crate::tree::LineIndex;

pub(crate) use parser::Parser;

/// Result of parsing source text.
#[derive(Debug, Clone)]
pub struct Parse {
    /// The root syntax node.
    green_node: GreenNode,
    /// Lexical and syntax errors, sorted by position.
    errors: Vec<ParseError>,
    config: ParseConfig,
}

impl Parse {
    pub(crate) fn new(green_node: GreenNode, errors: Vec<ParseError>, config: ParseConfig) -> Self {
        Self {
            green_node,
            errors,
            config,
        }
    }

    /// Returns the root syntax node.
    #[must_use]
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green_node.clone())
    }

    /// Returns the green root shared with other trees.
    #[must_use]
    pub fn green(&self) -> &GreenNode {
        &self.green_node
    }

    /// Returns the parsing errors.
    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Returns `true` if parsing produced no errors.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The configuration the tree was parsed with.
    #[must_use]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Errors rendered as `line N: message`, one per error.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        if self.errors.is_empty() {
            return Vec::new();
        }
        let text = self.syntax().text().to_string();
        let index = LineIndex::new(&text);
        self.errors
            .iter()
            .map(|error| {
                let line = index.line_col(error.range.start()).line + 1;
                format!("line {line}: {}", error.message)
            })
            .collect()
    }

    /// All `Error` nodes of the tree in preorder.
    #[must_use]
    pub fn error_nodes(&self) -> Vec<SyntaxNode> {
        crate::tree::error_nodes(&self.syntax())
    }

    /// Parses `new_text`, reusing this tree where `edit` leaves it intact.
    ///
    /// `new_text` must be the old text with `edit` applied.
    #[must_use]
    pub fn reparse(&self, edit: &Edit, new_text: &str) -> Parse {
        crate::incremental::reparse(self, edit, new_text).parse
    }

    /// Debug rendering of the tree followed by its errors.
    #[must_use]
    pub fn debug_tree(&self) -> String {
        let mut out = crate::tree::dump(&self.syntax());
        if !self.ok() {
            out.push_str("---\nErrors:\n");
            for err in &self.errors {
                out.push_str(&format!("  - {err}\n"));
            }
        }
        out
    }
}

/// Where an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reported by the lexer.
    Lexical(LexErrorKind),
    /// Reported by the parser.
    Syntax,
}

/// A parsing error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Where the error came from.
    pub kind: ErrorKind,
    /// The error message.
    pub message: String,
    /// The byte range where the error occurred.
    pub range: TextRange,
}

impl ParseError {
    /// Returns the error moved by `delta` bytes.
    pub(crate) fn shifted(&self, delta: i64) -> Self {
        let start = i64::from(u32::from(self.range.start())) + delta;
        let end = i64::from(u32::from(self.range.end())) + delta;
        let clamp = |offset: i64| text_size::TextSize::from(u32::try_from(offset.max(0)).unwrap_or(u32::MAX));
        Self {
            kind: self.kind,
            message: self.message.clone(),
            range: TextRange::new(clamp(start), clamp(end)),
        }
    }
}

impl From<&LexError> for ParseError {
    fn from(error: &LexError) -> Self {
        Self {
            kind: ErrorKind::Lexical(error.kind),
            message: error.kind.to_string(),
            range: error.range,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message,
            u32::from(self.range.start()),
            u32::from(self.range.end())
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse source text into a syntax tree.
#[must_use]
pub fn parse(text: &str) -> Parse {
    parse_with(text, &ParseConfig::default())
}

/// Parse source text with the given configuration.
#[must_use]
pub fn parse_with(text: &str, config: &ParseConfig) -> Parse {
    let lexed = Lexer::with_config(text, config).finish();
    let (green_node, errors) = parse_lexed(&lexed, text);
    Parse::new(green_node, errors, config.clone())
}

/// Parses lexed tokens of `text`.
///
/// The tokens may cover only part of `text`, as produced by
/// [`Lexer::for_range`]; ranges stay absolute offsets into `text`.
pub(crate) fn parse_lexed(lexed: &Lexed, text: &str) -> (GreenNode, Vec<ParseError>) {
    let (green, syntax_errors) = Parser::new(language().table(), &lexed.tokens, text).parse();
    let mut errors: Vec<ParseError> = lexed.errors.iter().map(ParseError::from).collect();
    errors.extend(syntax_errors);
    errors.sort_by_key(|error| (error.range.start(), error.range.end()));
    (green, errors)
}
