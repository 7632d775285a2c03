//! Incremental reparsing.
//!
//! [`reparse`] builds the tree for an edited text from the tree of the old
//! text. Three strategies are tried in order:
//!
//! 1. **Token relex**: an edit inside one identifier, literal, builtin
//!    name or comment that still lexes as one token of the same kind only
//!    replaces that leaf. `rowan` copies the path to the root and shares
//!    every other subtree.
//! 2. **Statement reuse**: top-level statements that start at column 0
//!    after a logical line end are points where the lexer and the parser
//!    are in their initial state. Only the statements between the nearest
//!    such boundaries around the edit are lexed and parsed again; the old
//!    statements on both sides are shared.
//! 3. **Full parse**.
//!
//! Each strategy only applies when its result is identical to a full
//! parse of the new text; otherwise the next one is tried.

mod edit;

pub use edit::{Edit, Point};

use rowan::{GreenNode, GreenNodeData, GreenToken, GreenTokenData, NodeOrToken};
use text_size::{TextRange, TextSize};
use tracing::{debug, warn};

use crate::lexer::{lex_raw, Lexed, Lexer, TokenKind};
use crate::parser::{parse_lexed, parse_with, Parse, ParseError};
use crate::syntax::{GreenElement, SyntaxKind, SyntaxNode, SyntaxToken};

/// How a [`Reparse`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A single token was relexed in place.
    Token,
    /// Top-level statements around the edit were parsed again.
    Statements {
        /// Old top-level nodes shared with the new tree.
        reused: usize,
        /// Top-level nodes produced by the partial parse.
        reparsed: usize,
    },
    /// The whole text was parsed again.
    Full,
}

/// The result of [`reparse`].
#[derive(Debug, Clone)]
pub struct Reparse {
    /// The tree of the new text.
    pub parse: Parse,
    /// The strategy that produced it.
    pub strategy: Strategy,
}

/// Parses `new_text`, reusing `old` where `edit` leaves it intact.
///
/// `new_text` must be the old text with `edit` applied. An edit that does
/// not fit the old tree and the new text is answered with a full parse.
#[must_use]
pub fn reparse(old: &Parse, edit: &Edit, new_text: &str) -> Reparse {
    let config = old.config();
    let old_len = old.green().text_len();
    if !edit.is_valid_for(old_len, new_text) {
        warn!(
            start = u32::from(edit.start),
            deleted = u32::from(edit.deleted),
            inserted = u32::from(edit.inserted),
            old_len = u32::from(old_len),
            new_len = new_text.len(),
            "edit does not match the texts, parsing from scratch"
        );
        return full(new_text, old);
    }

    if config.incremental.relex_tokens {
        if let Some(parse) = relex_token(old, edit, new_text) {
            debug!(start = u32::from(edit.start), "reparse: relexed one token");
            return Reparse {
                parse,
                strategy: Strategy::Token,
            };
        }
    }

    if config.incremental.reuse_statements {
        if let Some((parse, reused, reparsed)) = reparse_statements(old, edit, new_text) {
            debug!(reused, reparsed, "reparse: reused top-level statements");
            return Reparse {
                parse,
                strategy: Strategy::Statements { reused, reparsed },
            };
        }
    }

    debug!("reparse: full parse");
    full(new_text, old)
}

fn full(new_text: &str, old: &Parse) -> Reparse {
    Reparse {
        parse: parse_with(new_text, old.config()),
        strategy: Strategy::Full,
    }
}

// =============================================================================
// Token relex
// =============================================================================

fn is_relexable(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::Ident
            | SyntaxKind::IntLiteral
            | SyntaxKind::FloatLiteral
            | SyntaxKind::TimeframeLiteral
            | SyntaxKind::StringLiteral
            | SyntaxKind::Comment
            | SyntaxKind::BuiltinFunction
            | SyntaxKind::BuiltinType
    )
}

fn edited_token(root: &SyntaxNode, range: TextRange) -> Option<SyntaxToken> {
    if range.is_empty() {
        // An insertion at a token border may extend either neighbour.
        return root
            .token_at_offset(range.start())
            .find(|token| is_relexable(token.kind()));
    }
    root.covering_element(range).into_token()
}

/// Tokens on either side of an edited token that are relexed with it.
///
/// A timeframe such as `1W-MON-Last` spans up to six tokens when it is not
/// read as one, so a change five tokens away can still join or split it.
const RELEX_WINDOW: usize = 5;

/// Up to [`RELEX_WINDOW`] non-empty tokens next to `token`, nearest first.
fn neighbours(token: &SyntaxToken, forward: bool) -> Vec<SyntaxToken> {
    let mut found = Vec::with_capacity(RELEX_WINDOW);
    let mut current = token.clone();
    while found.len() < RELEX_WINDOW {
        let Some(next) = (if forward {
            current.next_token()
        } else {
            current.prev_token()
        }) else {
            break;
        };
        if !next.text().is_empty() {
            found.push(next.clone());
        }
        current = next;
    }
    found
}

/// Compares raw tokens against tree leaves. Blank lines are `Newline` to
/// the raw lexer but `Whitespace` in the tree.
fn lexes_as(text: &str, expected: &[(SyntaxKind, usize)]) -> bool {
    let tokens = lex_raw(text);
    tokens.len() == expected.len()
        && tokens.iter().zip(expected).all(|(token, &(kind, len))| {
            let raw = SyntaxKind::from(token.kind);
            let same = raw == kind || (raw == SyntaxKind::Newline && kind == SyntaxKind::Whitespace);
            same && usize::from(token.len()) == len
        })
}

fn relex_token(old: &Parse, edit: &Edit, new_text: &str) -> Option<Parse> {
    let root = old.syntax();
    let token = edited_token(&root, edit.old_range())?;
    let kind = token.kind();
    if !is_relexable(kind) || token.text().contains(['\n', '\r']) {
        return None;
    }

    let old_range = token.text_range();
    let new_end = u32::from(old_range.end()) + u32::from(edit.inserted) - u32::from(edit.deleted);
    let new_range = TextRange::new(old_range.start(), TextSize::from(new_end));
    let text = new_text.get(usize::from(new_range.start())..usize::from(new_range.end()))?;
    if text.is_empty() || text.contains(['\n', '\r']) {
        return None;
    }

    if !lexes_as(text, &[(kind, text.len())]) {
        return None;
    }
    let before = neighbours(&token, false);
    let after = neighbours(&token, true);
    let mut joined = String::new();
    let mut expected = Vec::with_capacity(before.len() + after.len() + 1);
    for neighbour in before.iter().rev() {
        joined.push_str(neighbour.text());
        expected.push((neighbour.kind(), neighbour.text().len()));
    }
    joined.push_str(text);
    expected.push((kind, text.len()));
    for neighbour in &after {
        joined.push_str(neighbour.text());
        expected.push((neighbour.kind(), neighbour.text().len()));
    }
    if !lexes_as(&joined, &expected) {
        return None;
    }

    let delta = edit.delta();
    let mut errors = Vec::with_capacity(old.errors().len());
    for error in old.errors() {
        if error.range.end() <= old_range.start() {
            errors.push(error.clone());
        } else if error.range.start() >= old_range.end() {
            errors.push(error.shifted(delta));
        } else if error.range == old_range {
            errors.push(ParseError {
                range: new_range,
                ..error.clone()
            });
        } else {
            return None;
        }
    }

    let green = token.replace_with(GreenToken::new(kind.into(), text));
    Some(Parse::new(green, errors, old.config().clone()))
}

// =============================================================================
// Statement reuse
// =============================================================================

/// A top-level statement where parsing may restart.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    /// Index among the root's children.
    index: usize,
    offset: TextSize,
}

fn is_boundary(node: &SyntaxNode, old: &Parse) -> bool {
    let Some(first) = node.first_token() else {
        return false;
    };
    let kind = first.kind();
    if first.text().is_empty()
        || matches!(
            kind,
            SyntaxKind::KwElif | SyntaxKind::KwElse | SyntaxKind::Newline | SyntaxKind::Indent | SyntaxKind::Dedent
        )
    {
        return false;
    }
    let offset = first.text_range().start();
    if old.errors().iter().any(|error| error.range.start() == offset) {
        return false;
    }

    let mut prev = first.prev_token();
    while let Some(token) = prev.as_ref().filter(|token| token.kind().is_trivia()) {
        // Only whole-line trivia may separate the statement from its line start.
        if token.text().ends_with(['\n']) || token.kind() == SyntaxKind::Comment {
            prev = token.prev_token();
        } else {
            return false;
        }
    }
    match prev {
        None => true,
        Some(token) => match token.kind() {
            SyntaxKind::Newline => !token.text().is_empty(),
            SyntaxKind::Dedent => true,
            _ => false,
        },
    }
}

fn boundaries(root: &SyntaxNode, old: &Parse) -> Vec<Boundary> {
    root.children_with_tokens()
        .enumerate()
        .filter_map(|(index, element)| {
            let node = element.into_node()?;
            is_boundary(&node, old).then(|| Boundary {
                index,
                offset: node.text_range().start(),
            })
        })
        .collect()
}

/// Returns `true` if the region's tokens leave the lexer and parser in
/// the state a new file starts in.
fn region_is_closed(lexed: &Lexed) -> bool {
    let last = lexed.tokens.iter().rev().find(|token| {
        !token.kind.is_trivia() && !matches!(token.kind, TokenKind::Dedent | TokenKind::Eof)
    });
    matches!(last, Some(token) if token.kind == TokenKind::Newline && !token.is_empty())
}

fn starts_with_continuation(lexed: &Lexed) -> bool {
    lexed
        .tokens
        .iter()
        .find(|token| !token.kind.is_trivia())
        .is_some_and(|token| matches!(token.kind, TokenKind::KwElif | TokenKind::KwElse))
}

fn owned(child: NodeOrToken<&GreenNodeData, &GreenTokenData>) -> GreenElement {
    match child {
        NodeOrToken::Node(node) => NodeOrToken::Node(node.to_owned()),
        NodeOrToken::Token(token) => NodeOrToken::Token(token.to_owned()),
    }
}

fn reparse_statements(old: &Parse, edit: &Edit, new_text: &str) -> Option<(Parse, usize, usize)> {
    let root = old.syntax();
    let bounds = boundaries(&root, old);
    let old_children: Vec<GreenElement> = old.green().children().map(owned).collect();

    let edit_start = edit.start;
    let old_edit_end = edit.old_range().end();
    let delta = edit.delta();
    let shift = |offset: TextSize| TextSize::from((i64::from(u32::from(offset)) + delta) as u32);

    // Region start: the last boundary strictly before the edit, or the file start.
    let start = bounds.iter().rev().find(|b| b.offset < edit_start).copied();
    let (start_index, region_start) = start.map_or((0, TextSize::from(0)), |b| (b.index, b.offset));

    let ends = bounds.iter().filter(|b| b.offset > old_edit_end).map(Some).chain([None]);
    for end in ends {
        let (end_index, region_end) = match end {
            Some(b) => (b.index, shift(b.offset)),
            None => (old_children.len(), TextSize::of(new_text)),
        };
        if region_end < region_start {
            continue;
        }
        let range = TextRange::new(region_start, region_end);
        let lexed = Lexer::for_range(new_text, range, old.config()).finish();
        if start.is_some() && starts_with_continuation(&lexed) {
            return None;
        }
        if end.is_some() && !region_is_closed(&lexed) {
            continue;
        }

        let (region, region_errors) = parse_lexed(&lexed, new_text);
        if end.is_some() && region_errors.iter().any(|error| error.range.start() >= region_end) {
            continue;
        }

        let mut children: Vec<GreenElement> = Vec::with_capacity(old_children.len());
        children.extend(old_children[..start_index].iter().cloned());
        let reparsed = region.children().filter(|child| child.as_node().is_some()).count();
        children.extend(region.children().map(owned));
        children.extend(old_children[end_index..].iter().cloned());
        let reused = old_children[..start_index]
            .iter()
            .chain(&old_children[end_index..])
            .filter(|child| matches!(child, NodeOrToken::Node(_)))
            .count();

        let old_region_end = match end {
            Some(b) => b.offset,
            None => old.green().text_len(),
        };
        let mut errors: Vec<ParseError> = old
            .errors()
            .iter()
            .filter(|error| error.range.start() < region_start)
            .cloned()
            .collect();
        errors.extend(region_errors);
        errors.extend(
            old.errors()
                .iter()
                .filter(|error| error.range.start() >= old_region_end && end.is_some())
                .map(|error| error.shifted(delta)),
        );

        let green = GreenNode::new(old.green().kind(), children);
        return Some((Parse::new(green, errors, old.config().clone()), reused, reparsed));
    }
    None
}
