//! Token source for the parser.
//!
//! The LR driver only ever looks at one significant token. `Source` hands
//! out that token together with the trivia in front of it, so the trivia
//! can be attached to whatever the token ends up in.

use std::ops::Range;

use text_size::{TextRange, TextSize};

use crate::lexer::{Token, TokenKind};

/// A significant token and the trivia preceding it.
#[derive(Debug, Clone)]
pub(crate) struct Lookahead {
    /// Indices of the leading trivia tokens.
    pub(crate) trivia: Range<usize>,
    pub(crate) token: Token,
}

impl Lookahead {
    pub(crate) fn kind(&self) -> TokenKind {
        self.token.kind
    }
}

/// A cursor over lexed tokens that skips trivia.
pub(crate) struct Source<'t> {
    tokens: &'t [Token],
    cursor: usize,
}

impl<'t> Source<'t> {
    /// Creates a new source over `tokens`.
    pub(crate) fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, cursor: 0 }
    }

    /// Index of the next unconsumed token.
    pub(crate) fn position(&self) -> usize {
        self.cursor
    }

    /// Consumes trivia and the next significant token.
    ///
    /// Past the end, a zero-width `Eof` is synthesized after the last token.
    pub(crate) fn next(&mut self) -> Lookahead {
        let start = self.cursor;
        while self
            .tokens
            .get(self.cursor)
            .is_some_and(|token| token.kind.is_trivia())
        {
            self.cursor += 1;
        }
        let trivia = start..self.cursor;
        let token = match self.tokens.get(self.cursor) {
            Some(token) => {
                self.cursor += 1;
                *token
            }
            None => {
                let end = self
                    .tokens
                    .last()
                    .map_or(TextSize::from(0), |token| token.range.end());
                Token::new(TokenKind::Eof, TextRange::empty(end))
            }
        };
        Lookahead { trivia, token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    #[test]
    fn test_next_skips_trivia() {
        let tokens = lex("a  # note\n");
        let mut source = Source::new(&tokens);

        let first = source.next();
        assert_eq!(first.kind(), TokenKind::Ident);
        assert!(first.trivia.is_empty());

        let second = source.next();
        assert_eq!(second.kind(), TokenKind::Newline);
        assert_eq!(second.trivia.len(), 2);

        assert_eq!(source.next().kind(), TokenKind::Eof);
        assert_eq!(source.next().kind(), TokenKind::Eof);
        assert_eq!(source.position(), tokens.len());
    }
}
