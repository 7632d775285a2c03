//! Table-driven LR parser.
//!
//! The parser runs the compiled LALR(1) tables over the layout tokens of
//! the lexer. Each stack entry owns the green forest built for its symbol;
//! reducing a visible rule wraps the popped forests in a node, reducing a
//! hidden rule splices them.
//!
//! # Error recovery
//!
//! When the lookahead has no action, the parser records an error and
//! resynchronizes at the next statement boundary:
//!
//! 1. pop entries until a state that can shift an error statement;
//! 2. skip input through the next `Newline` at indentation depth 0, or
//!    through the `Dedent` closing a skipped `Indent`;
//! 3. wrap popped and skipped material in an `Error` node and shift it.
//!
//! Recovery always makes progress, so every input yields a tree.

use rowan::GreenNode;
use tracing::trace;

use crate::grammar::{Action, ParseTable, StateId};
use crate::lexer::{Token, TokenKind};
use crate::parser::sink::{is_trivia, last_significant, layout_balance, Sink};
use crate::parser::source::{Lookahead, Source};
use crate::parser::{ErrorKind, ParseError};
use crate::syntax::{GreenElement, SyntaxKind};

const MAX_EXPECTED: usize = 6;

struct Entry {
    state: StateId,
    forest: Vec<GreenElement>,
}

/// The LR driver state for one parse.
pub(crate) struct Parser<'a> {
    table: &'a ParseTable,
    sink: Sink<'a, 'a>,
    source: Source<'a>,
    stack: Vec<Entry>,
    lookahead: Lookahead,
    errors: Vec<ParseError>,
    last_recovery: Option<(usize, usize)>,
}

/// Joins the forests of `entries` in order.
///
/// Later forests are appended to the first one's buffer, so reducing a
/// left-recursive list only moves the newly added elements.
fn concat(entries: impl IntoIterator<Item = Entry>) -> Vec<GreenElement> {
    let mut entries = entries.into_iter();
    let mut forest = entries.next().map(|entry| entry.forest).unwrap_or_default();
    for entry in entries {
        forest.extend(entry.forest);
    }
    forest
}

impl<'a> Parser<'a> {
    /// Creates a parser over lexed `tokens` of `text`.
    pub(crate) fn new(table: &'a ParseTable, tokens: &'a [Token], text: &'a str) -> Self {
        let mut source = Source::new(tokens);
        let lookahead = source.next();
        Self {
            table,
            sink: Sink::new(tokens, text),
            source,
            stack: vec![Entry {
                state: 0,
                forest: Vec::new(),
            }],
            lookahead,
            errors: Vec::new(),
            last_recovery: None,
        }
    }

    fn state(&self) -> StateId {
        self.stack.last().map_or(0, |entry| entry.state)
    }

    /// Runs the parser to completion.
    pub(crate) fn parse(mut self) -> (GreenNode, Vec<ParseError>) {
        loop {
            let state = self.state();
            let kind = self.lookahead.kind();
            let mut action = if kind == TokenKind::Error {
                Action::Error
            } else {
                self.table.action(state, kind)
            };
            if action == Action::Error {
                if let Some(production) = self.table.default_reduction(state) {
                    action = Action::Reduce(production);
                }
            }

            match action {
                Action::Shift(next) => self.shift(next),
                Action::Reduce(production) => {
                    if !self.reduce(production) {
                        self.abort();
                        break;
                    }
                }
                Action::Accept => break,
                Action::Error => {
                    if !self.recover() {
                        self.abort();
                        break;
                    }
                }
            }
        }
        self.finish()
    }

    fn shift(&mut self, next: StateId) {
        let forest = self.sink.lookahead(&self.lookahead);
        self.stack.push(Entry {
            state: next,
            forest,
        });
        self.lookahead = self.source.next();
    }

    fn reduce(&mut self, production: u32) -> bool {
        let info = self.table.production(production);
        if self.stack.len() <= info.len {
            return false;
        }
        let at = self.stack.len() - info.len;
        let children = concat(self.stack.drain(at..));
        let forest = match info.node {
            Some(kind) => Sink::node(kind, children),
            None => children,
        };
        let Some(next) = self.table.goto(self.state(), info.lhs) else {
            // Put the material back so `abort` keeps it in the tree.
            self.stack.push(Entry {
                state: self.state(),
                forest,
            });
            return false;
        };
        self.stack.push(Entry {
            state: next,
            forest,
        });
        true
    }

    fn report(&mut self) {
        if self.lookahead.kind() == TokenKind::Error {
            // Already reported by the lexer.
            return;
        }
        let state = self.state();
        let expected: Vec<TokenKind> = self.table.expected_tokens(state).collect();
        let mut message = format!("unexpected {}", self.lookahead.kind().describe());
        match expected.as_slice() {
            [] => {}
            [only] => {
                message.push_str(", expected ");
                message.push_str(only.describe());
            }
            many if many.len() <= MAX_EXPECTED => {
                let names: Vec<&str> = many.iter().map(|kind| kind.describe()).collect();
                message.push_str(", expected one of ");
                message.push_str(&names.join(", "));
            }
            _ => {}
        }
        self.errors.push(ParseError {
            kind: ErrorKind::Syntax,
            message,
            range: self.lookahead.token.range,
        });
    }

    fn recover(&mut self) -> bool {
        let Some(recovery) = self.table.recovery else {
            return false;
        };
        let position = (self.source.position(), self.stack.len());
        if self.last_recovery == Some(position) {
            return false;
        }
        self.last_recovery = Some(position);
        self.report();

        let mut content = Vec::new();
        while self.stack.len() > 1 && !self.table.is_recovery_state(self.state()) {
            if let Some(entry) = self.stack.pop() {
                content.splice(0..0, entry.forest);
            }
        }

        let mut depth = layout_balance(&content).max(0);
        let line_done = matches!(
            last_significant(&content),
            Some(SyntaxKind::Newline | SyntaxKind::Dedent)
        );
        if depth > 0 || !line_done {
            self.skip(&mut content, &mut depth);
        }

        if content.is_empty() {
            if self.stack.len() <= 1 {
                return false;
            }
            // At end of input: give up on the innermost statement list.
            while let Some(entry) = self.stack.pop() {
                content.splice(0..0, entry.forest);
                if self.stack.len() <= 1 || self.table.is_recovery_state(self.state()) {
                    break;
                }
            }
        }

        let state = self.state();
        trace!(
            state,
            token = ?self.lookahead.kind(),
            elements = content.len(),
            "recovering"
        );
        let Action::Shift(next) = self.table.action(state, recovery) else {
            self.stack.push(Entry {
                state,
                forest: content,
            });
            return false;
        };
        self.stack.push(Entry {
            state: next,
            forest: Sink::node(SyntaxKind::Error, content),
        });
        true
    }

    fn skip(&mut self, content: &mut Vec<GreenElement>, depth: &mut i32) {
        loop {
            match self.lookahead.kind() {
                TokenKind::Eof => break,
                TokenKind::Dedent if *depth == 0 => {
                    if content.iter().all(is_trivia) {
                        // Orphan dedent with nothing else to report.
                        self.consume(content);
                    }
                    break;
                }
                TokenKind::Indent => {
                    *depth += 1;
                    self.consume(content);
                }
                TokenKind::Dedent => {
                    *depth -= 1;
                    self.consume(content);
                    if *depth == 0 {
                        break;
                    }
                }
                TokenKind::Newline => {
                    self.consume(content);
                    if *depth == 0 {
                        break;
                    }
                }
                _ => self.consume(content),
            }
        }
    }

    fn consume(&mut self, content: &mut Vec<GreenElement>) {
        content.extend(self.sink.lookahead(&self.lookahead));
        self.lookahead = self.source.next();
    }

    /// Keeps everything left in the input inside one error node.
    fn abort(&mut self) {
        let mut rest = Vec::new();
        loop {
            let at_end = self.lookahead.kind() == TokenKind::Eof;
            if at_end {
                break;
            }
            self.consume(&mut rest);
        }
        if !rest.iter().all(is_trivia) {
            self.errors.push(ParseError {
                kind: ErrorKind::Syntax,
                message: "unexpected input".to_string(),
                range: self.lookahead.token.range,
            });
            if let Some(entry) = self.stack.last_mut() {
                entry.forest.extend(Sink::node(SyntaxKind::Error, rest));
            }
        } else if let Some(entry) = self.stack.last_mut() {
            entry.forest.extend(rest);
        }
    }

    fn finish(self) -> (GreenNode, Vec<ParseError>) {
        let mut children = concat(self.stack);
        children.extend(self.sink.tokens(self.lookahead.trivia.clone()));
        let root = GreenNode::new(self.table.root_kind().into(), children);
        (root, self.errors)
    }
}
