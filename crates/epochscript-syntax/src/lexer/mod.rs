//! Lexer for EpochScript.
//!
//! Tokenizing happens in two layers. `RawLexer` drives the `logos` scanner
//! and finishes tokens that need more context than a regular expression
//! (numeric suffixes, rejected string prefixes). `Lexer` sits on top and
//! turns physical lines into logical ones: it tracks bracket depth and the
//! indentation stack and synthesizes `Newline`, `Indent` and `Dedent`.

mod tokens;

pub use tokens::TokenKind;

use logos::Logos;
use std::collections::VecDeque;
use text_size::{TextRange, TextSize};

use crate::config::ParseConfig;

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The byte range of the token in the source text.
    pub range: TextRange,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(kind: TokenKind, range: TextRange) -> Self {
        Self { kind, range }
    }

    /// Returns the length of the token in bytes.
    #[must_use]
    pub fn len(&self) -> TextSize {
        self.range.len()
    }

    /// Returns true if the token has zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns the text of this token in `source`.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range]
    }
}

/// What went wrong while lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LexErrorKind {
    /// A character that starts no token.
    #[error("unrecognized character")]
    UnknownCharacter,
    /// A string literal without its closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// `f"..."`, `b'...'` and friends.
    #[error("string prefixes are not supported")]
    UnsupportedStringPrefix,
    /// A dedent to a column that matches no enclosing block.
    #[error("inconsistent dedent")]
    InconsistentDedent,
}

/// A lexical error with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct LexError {
    /// The kind of error.
    pub kind: LexErrorKind,
    /// The offending byte range.
    pub range: TextRange,
}

/// Tokens and errors for a lexed source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexed {
    /// All tokens, including trivia, ending with `Eof`.
    pub tokens: Vec<Token>,
    /// Lexical errors in source order.
    pub errors: Vec<LexError>,
}

fn to_range(span: std::ops::Range<usize>, base: usize) -> TextRange {
    TextRange::new(
        TextSize::from((span.start + base) as u32),
        TextSize::from((span.end + base) as u32),
    )
}

/// Physical tokens without layout processing.
///
/// Newlines come out as `Newline` regardless of bracket depth and no
/// `Indent`/`Dedent`/`Eof` tokens are produced.
pub struct RawLexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    base: usize,
    pending: VecDeque<Token>,
    errors: Vec<LexError>,
}

impl<'src> RawLexer<'src> {
    /// Creates a raw lexer over `source`, reporting ranges relative to `base`.
    #[must_use]
    pub fn new(source: &'src str, base: TextSize) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            base: usize::from(base),
            pending: VecDeque::new(),
            errors: Vec::new(),
        }
    }

    /// Returns the errors collected so far.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    fn error(&mut self, kind: LexErrorKind, range: TextRange) {
        self.errors.push(LexError { kind, range });
    }

    fn classify_error(text: &str) -> LexErrorKind {
        if text.starts_with(['\'', '"']) {
            LexErrorKind::UnterminatedString
        } else {
            LexErrorKind::UnknownCharacter
        }
    }

    /// Merges a prefix identifier with a directly following string.
    fn string_prefix(&mut self, prefix_end: usize) -> Option<Token> {
        let next = self.inner.next()?;
        let span = self.inner.span();
        let kind = next.unwrap_or(TokenKind::Error);
        let quoted = matches!(kind, TokenKind::StringLiteral | TokenKind::Error)
            && self.inner.slice().starts_with(['\'', '"']);
        if span.start == prefix_end && quoted {
            return Some(Token::new(kind, to_range(span, self.base)));
        }
        let token = Token::new(kind, to_range(span, self.base));
        self.push_raw(token, kind);
        None
    }

    fn push_raw(&mut self, token: Token, kind: TokenKind) {
        if kind == TokenKind::Error {
            let error = Self::classify_error(self.inner.slice());
            self.error(error, token.range);
        }
        self.pending.push_back(token);
    }
}

impl Iterator for RawLexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pending.pop_front() {
            return Some(token);
        }

        let kind = self.inner.next()?.unwrap_or(TokenKind::Error);
        let span = self.inner.span();

        match kind {
            TokenKind::IntLiteral => {
                let (kind, extra) = tokens::finish_number(self.inner.slice(), self.inner.remainder());
                self.inner.bump(extra);
                Some(Token::new(kind, to_range(self.inner.span(), self.base)))
            }
            TokenKind::FloatLiteral => {
                let extra = tokens::exponent_len(self.inner.remainder());
                self.inner.bump(extra);
                Some(Token::new(kind, to_range(self.inner.span(), self.base)))
            }
            TokenKind::Ident
                if tokens::is_string_prefix(self.inner.slice())
                    && self.inner.remainder().starts_with(['\'', '"']) =>
            {
                let start = span.start;
                match self.string_prefix(span.end) {
                    Some(literal) => {
                        let range = TextRange::new(
                            TextSize::from((start + self.base) as u32),
                            literal.range.end(),
                        );
                        self.error(LexErrorKind::UnsupportedStringPrefix, range);
                        Some(Token::new(TokenKind::Error, range))
                    }
                    None => Some(Token::new(TokenKind::Ident, to_range(span, self.base))),
                }
            }
            TokenKind::Error => {
                let range = to_range(span, self.base);
                let error = Self::classify_error(self.inner.slice());
                self.error(error, range);
                Some(Token::new(kind, range))
            }
            _ => Some(Token::new(kind, to_range(span, self.base))),
        }
    }
}

/// Lexer for EpochScript source code.
///
/// The lexer is an iterator over tokens, ending with a single `Eof`. It
/// handles all error recovery internally: unrecognized input is returned as
/// `TokenKind::Error` and reported through [`Lexer::finish`].
pub struct Lexer<'src> {
    raw: RawLexer<'src>,
    source: &'src str,
    start: usize,
    end: usize,
    tab_width: u32,
    indents: Vec<u32>,
    depth: u32,
    at_line_start: bool,
    held: Vec<Token>,
    pending: VecDeque<Token>,
    errors: Vec<LexError>,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source text.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self::with_config(source, &ParseConfig::default())
    }

    /// Creates a lexer using the layout options in `config`.
    #[must_use]
    pub fn with_config(source: &'src str, config: &ParseConfig) -> Self {
        Self::for_range(source, TextRange::up_to(TextSize::of(source)), config)
    }

    /// Creates a lexer for `range` of `source`.
    ///
    /// Lexing starts in a fresh line context: column zero, empty
    /// indentation stack, no open brackets. Token ranges are absolute
    /// offsets into `source`.
    #[must_use]
    pub fn for_range(source: &'src str, range: TextRange, config: &ParseConfig) -> Self {
        let start = usize::from(range.start());
        let end = usize::from(range.end());
        Self {
            raw: RawLexer::new(&source[start..end], range.start()),
            source,
            start,
            end,
            tab_width: config.tab_width.max(1),
            indents: vec![0],
            depth: 0,
            at_line_start: true,
            held: Vec::new(),
            pending: VecDeque::new(),
            errors: Vec::new(),
            finished: false,
        }
    }

    /// Returns the source text being lexed.
    #[must_use]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Drains the remaining tokens and returns everything that was lexed.
    #[must_use]
    pub fn finish(mut self) -> Lexed {
        let tokens: Vec<Token> = self.by_ref().collect();
        let mut errors = self.raw.take_errors();
        errors.append(&mut self.errors);
        errors.sort_by_key(|e| (e.range.start(), e.range.end()));
        Lexed { tokens, errors }
    }

    fn at(offset: usize) -> TextRange {
        TextRange::empty(TextSize::from(offset as u32))
    }

    fn indent_width(&self, token_start: usize) -> u32 {
        let line_start = self.source[self.start..token_start]
            .rfind('\n')
            .map_or(self.start, |i| self.start + i + 1);
        let mut width = 0u32;
        for ch in self.source[line_start..token_start].chars() {
            match ch {
                '\t' => width = (width / self.tab_width + 1) * self.tab_width,
                '\x0C' => width = 0,
                _ => width += 1,
            }
        }
        width
    }

    /// Emits layout for the first significant token of a logical line.
    fn begin_line(&mut self, first: Token) {
        let token_start = usize::from(first.range.start());
        let width = self.indent_width(token_start);
        let dedent_at = self.held.first().map_or(first.range.start(), |t| t.range.start());

        let mut top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.pending.extend(self.held.drain(..));
            self.indents.push(width);
            self.pending
                .push_back(Token::new(TokenKind::Indent, Self::at(token_start)));
            return;
        }

        while width < top {
            self.indents.pop();
            self.pending
                .push_back(Token::new(TokenKind::Dedent, TextRange::empty(dedent_at)));
            top = self.indents.last().copied().unwrap_or(0);
        }
        if width > top {
            // Treated as belonging to the enclosing block.
            self.errors.push(LexError {
                kind: LexErrorKind::InconsistentDedent,
                range: first.range,
            });
        }
        self.pending.extend(self.held.drain(..));
    }

    fn finish_input(&mut self) {
        if !self.at_line_start {
            self.pending
                .push_back(Token::new(TokenKind::Newline, Self::at(self.end)));
        }
        let dedent_at = self
            .held
            .first()
            .map_or(TextSize::from(self.end as u32), |t| t.range.start());
        while self.indents.len() > 1 {
            self.indents.pop();
            self.pending
                .push_back(Token::new(TokenKind::Dedent, TextRange::empty(dedent_at)));
        }
        self.pending.extend(self.held.drain(..));
        self.pending
            .push_back(Token::new(TokenKind::Eof, Self::at(self.end)));
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.finished {
                return None;
            }

            let Some(token) = self.raw.next() else {
                self.finish_input();
                self.finished = true;
                continue;
            };

            match token.kind {
                TokenKind::Whitespace | TokenKind::Comment => {
                    if self.at_line_start {
                        self.held.push(token);
                    } else {
                        return Some(token);
                    }
                }
                TokenKind::Newline => {
                    if self.at_line_start {
                        // Blank line.
                        self.held
                            .push(Token::new(TokenKind::Whitespace, token.range));
                    } else if self.depth > 0 {
                        return Some(Token::new(TokenKind::Whitespace, token.range));
                    } else {
                        self.at_line_start = true;
                        return Some(token);
                    }
                }
                kind => {
                    if self.at_line_start {
                        self.at_line_start = false;
                        self.begin_line(token);
                    }
                    if kind.is_open_bracket() {
                        self.depth += 1;
                    } else if kind.is_close_bracket() {
                        self.depth = self.depth.saturating_sub(1);
                    }
                    self.pending.push_back(token);
                }
            }
        }
    }
}

/// Lex the entire source and return all tokens.
///
/// This is a convenience function for testing and simple use cases.
/// For the parser, use [`tokenize`] which also returns lexical errors.
#[must_use]
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lex source and return tokens paired with their text.
///
/// Useful for debugging and testing.
#[must_use]
pub fn lex_with_text(source: &str) -> Vec<(Token, &str)> {
    Lexer::new(source)
        .map(|token| (token, token.text(source)))
        .collect()
}

/// Lex source with layout, returning tokens and lexical errors.
#[must_use]
pub fn tokenize(source: &str, config: &ParseConfig) -> Lexed {
    Lexer::with_config(source, config).finish()
}

/// Lex without layout processing.
///
/// Used to check whether a piece of text forms exactly one token.
#[must_use]
pub fn lex_raw(source: &str) -> Vec<Token> {
    RawLexer::new(source, TextSize::from(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::{expect, Expect};

    fn check(source: &str, expect: Expect) {
        let rendered: Vec<String> = lex(source)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .map(|t| format!("{:?}@{:?} {:?}", t.kind, t.range, t.text(source)))
            .collect();
        expect.assert_eq(&rendered.join("\n"));
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn test_lexer_basic() {
        let source = "x = 42";
        let tokens = lex(source);

        let non_trivia: Vec<_> = tokens.iter().filter(|t| !t.kind.is_trivia()).collect();
        assert_eq!(non_trivia.len(), 5);
        assert_eq!(non_trivia[0].kind, TokenKind::Ident);
        assert_eq!(non_trivia[1].kind, TokenKind::Assign);
        assert_eq!(non_trivia[2].kind, TokenKind::IntLiteral);
        assert_eq!(non_trivia[3].kind, TokenKind::Newline);
        assert_eq!(non_trivia[4].kind, TokenKind::Eof);
    }

    #[test]
    fn test_lexer_preserves_positions() {
        let source = "abc = 123";
        let tokens = lex(source);

        assert_eq!(tokens[0].range, TextRange::new(0.into(), 3.into()));
        assert_eq!(tokens[1].range, TextRange::new(3.into(), 4.into()));
        assert_eq!(tokens[2].range, TextRange::new(4.into(), 5.into()));
    }

    #[test]
    fn test_lex_with_text() {
        let source = "x = sma(period=20)(src.c)";
        let tokens = lex_with_text(source);

        let non_trivia: Vec<_> = tokens.iter().filter(|(t, _)| !t.kind.is_trivia()).collect();
        assert_eq!(non_trivia[0].1, "x");
        assert_eq!(non_trivia[1].1, "=");
        assert_eq!(non_trivia[2].1, "sma");
        assert_eq!(non_trivia[6].1, "20");
    }

    #[test]
    fn test_indented_block() {
        check(
            "if a:\n    b = 1\nc\n",
            expect![[r#"
                KwIf@0..2 "if"
                Ident@3..4 "a"
                Colon@4..5 ":"
                Newline@5..6 "\n"
                Indent@10..10 ""
                Ident@10..11 "b"
                Assign@12..13 "="
                IntLiteral@14..15 "1"
                Newline@15..16 "\n"
                Dedent@16..16 ""
                Ident@16..17 "c"
                Newline@17..18 "\n"
                Eof@18..18 """#]],
        );
    }

    #[test]
    fn test_dedent_precedes_blank_lines_and_comments() {
        check(
            "if a:\n  b\n\n# c\nd",
            expect![[r#"
                KwIf@0..2 "if"
                Ident@3..4 "a"
                Colon@4..5 ":"
                Newline@5..6 "\n"
                Indent@8..8 ""
                Ident@8..9 "b"
                Newline@9..10 "\n"
                Dedent@10..10 ""
                Ident@15..16 "d"
                Newline@16..16 ""
                Eof@16..16 """#]],
        );
    }

    #[test]
    fn test_unterminated_last_line_and_open_blocks() {
        assert_eq!(
            kinds("if a:\n  if b:\n    c"),
            vec![
                TokenKind::KwIf,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::KwIf,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Dedent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_trivia() {
        assert_eq!(
            kinds("f(a,\n      b)\n"),
            vec![
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_and_blank_sources() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("\n\n  # only a comment\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_tabs_advance_to_tab_stops() {
        // A tab and eight spaces are the same column with the default width.
        assert_eq!(
            kinds("if a:\n\tb\n        c\n")
                .iter()
                .filter(|k| matches!(k, TokenKind::Indent | TokenKind::Dedent))
                .count(),
            2
        );
    }

    #[test]
    fn test_inconsistent_dedent_is_reported() {
        let lexed = tokenize("if a:\n    b\n  c\n", &ParseConfig::default());
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::InconsistentDedent);
        let indents = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
        let dedents = lexed.tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn test_numbers_and_timeframes() {
        check(
            "1 2.5 .5 1e3 15Min 1W-MON 4H 0D",
            expect![[r#"
                IntLiteral@0..1 "1"
                FloatLiteral@2..5 "2.5"
                FloatLiteral@6..8 ".5"
                FloatLiteral@9..12 "1e3"
                TimeframeLiteral@13..18 "15Min"
                TimeframeLiteral@19..25 "1W-MON"
                TimeframeLiteral@26..28 "4H"
                IntLiteral@29..30 "0"
                Ident@30..31 "D"
                Newline@31..31 ""
                Eof@31..31 """#]],
        );
    }

    #[test]
    fn test_timeframe_before_identifier() {
        check(
            "1W-MONx 1MSx",
            expect![[r#"
                TimeframeLiteral@0..2 "1W"
                Minus@2..3 "-"
                Ident@3..7 "MONx"
                IntLiteral@8..9 "1"
                Ident@9..12 "MSx"
                Newline@12..12 ""
                Eof@12..12 """#]],
        );
    }

    #[test]
    fn test_prefixed_strings_are_errors() {
        let lexed = tokenize("x = f\"{a}\" + rb'b' + f(1)", &ParseConfig::default());
        let errors: Vec<_> = lexed
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Error)
            .map(|t| t.text("x = f\"{a}\" + rb'b' + f(1)"))
            .collect();
        assert_eq!(errors, vec!["f\"{a}\"", "rb'b'"]);
        assert!(lexed
            .errors
            .iter()
            .all(|e| e.kind == LexErrorKind::UnsupportedStringPrefix));
    }

    #[test]
    fn test_unknown_characters() {
        let lexed = tokenize("@decorator\n", &ParseConfig::default());
        assert_eq!(lexed.tokens[0].kind, TokenKind::Error);
        assert_eq!(lexed.errors[0].kind, LexErrorKind::UnknownCharacter);
        assert_eq!(lexed.errors[0].range, TextRange::new(0.into(), 1.into()));
    }

    #[test]
    fn test_lexing_a_range() {
        let source = "a = 1\nif b:\n    c\nd = 2\n";
        let range = TextRange::new(6.into(), 18.into());
        let kinds: Vec<_> = Lexer::for_range(source, range, &ParseConfig::default())
            .filter(|t| !t.kind.is_trivia())
            .map(|t| (t.kind, t.range.start()))
            .collect();
        assert_eq!(kinds.first(), Some(&(TokenKind::KwIf, 6.into())));
        assert_eq!(kinds.last(), Some(&(TokenKind::Eof, 18.into())));
        assert!(kinds.iter().any(|(k, _)| *k == TokenKind::Dedent));
    }

    #[test]
    fn test_lex_raw_keeps_physical_newlines() {
        let kinds: Vec<_> = lex_raw("(a\n)").into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::RParen,
            ]
        );
    }
}
