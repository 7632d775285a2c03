//! Token definitions for EpochScript.
//!
//! Raw scanning is generated by `logos`. A few token classes need more than a
//! regular expression (numeric suffixes, prefixed strings, layout) and are
//! finished by the wrapper in the parent module using the helpers at the
//! bottom of this file.

use logos::Logos;

use crate::token_kinds::for_each_token_kind;

fn lex_triple_single(lex: &mut logos::Lexer<TokenKind>) -> bool {
    lex_triple_quoted(lex, b'\'')
}

fn lex_triple_double(lex: &mut logos::Lexer<TokenKind>) -> bool {
    lex_triple_quoted(lex, b'"')
}

fn lex_triple_quoted(lex: &mut logos::Lexer<TokenKind>, quote: u8) -> bool {
    let bytes = lex.remainder().as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 1;
                // Skip the escaped character as a whole so we never stop
                // inside a multi-byte sequence.
                while i < bytes.len() && !lex.remainder().is_char_boundary(i + 1) {
                    i += 1;
                }
                i += 1;
            }
            b if b == quote
                && bytes.get(i + 1) == Some(&quote)
                && bytes.get(i + 2) == Some(&quote) =>
            {
                lex.bump(i + 3);
                return true;
            }
            _ => i += 1,
        }
    }

    lex.bump(bytes.len());
    false
}

/// All token kinds in EpochScript.
///
/// Token kinds are divided into categories:
/// - Trivia (whitespace, comments, line continuations)
/// - Layout (newlines, indentation changes) synthesized by the lexer wrapper
/// - Punctuation and operators
/// - Keywords and builtin names
/// - Literals and identifiers
/// - Special tokens (errors, EOF)
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum TokenKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    /// Spaces, tabs, form feeds and `\` line continuations. Also carries
    /// newlines that do not end a logical line.
    #[regex(r"([ \t\x0C]|\\\r?\n)+")]
    Whitespace,

    /// Line comment: `# ...`
    #[regex(r"#[^\r\n]*", allow_greedy = true)]
    Comment,

    // =========================================================================
    // LAYOUT
    // =========================================================================
    /// End of a logical line.
    #[regex(r"\r?\n")]
    Newline,

    /// Increase of indentation (zero width).
    Indent,

    /// Decrease of indentation (zero width).
    Dedent,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `[`
    #[token("[")]
    LBracket,

    /// `]`
    #[token("]")]
    RBracket,

    /// `{`
    #[token("{")]
    LBrace,

    /// `}`
    #[token("}")]
    RBrace,

    /// `,`
    #[token(",")]
    Comma,

    /// `:`
    #[token(":")]
    Colon,

    /// `.`
    #[token(".")]
    Dot,

    // =========================================================================
    // OPERATORS
    // =========================================================================
    /// `=`
    #[token("=")]
    Assign,

    /// `|` (pipeline)
    #[token("|")]
    Pipe,

    /// `>>` (lag)
    #[token(">>")]
    Shr,

    /// `<<` (lead)
    #[token("<<")]
    Shl,

    /// `<`
    #[token("<")]
    Lt,

    /// `>`
    #[token(">")]
    Gt,

    /// `<=`
    #[token("<=")]
    LtEq,

    /// `>=`
    #[token(">=")]
    GtEq,

    /// `==`
    #[token("==")]
    EqEq,

    /// `!=`
    #[token("!=")]
    Neq,

    /// `+`
    #[token("+")]
    Plus,

    /// `-`
    #[token("-")]
    Minus,

    /// `*`
    #[token("*")]
    Star,

    /// `/`
    #[token("/")]
    Slash,

    /// `%`
    #[token("%")]
    Percent,

    /// `**`
    #[token("**")]
    Power,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    /// `if`
    #[token("if")]
    KwIf,

    /// `elif`
    #[token("elif")]
    KwElif,

    /// `else`
    #[token("else")]
    KwElse,

    /// `and`
    #[token("and")]
    KwAnd,

    /// `or`
    #[token("or")]
    KwOr,

    /// `not`
    #[token("not")]
    KwNot,

    /// `True`
    #[token("True")]
    KwTrue,

    /// `False`
    #[token("False")]
    KwFalse,

    /// `None`
    #[token("None")]
    KwNone,

    // =========================================================================
    // BUILTIN NAMES
    // =========================================================================
    /// Builtin math, series and selection functions.
    #[token("abs")]
    #[token("acos")]
    #[token("asin")]
    #[token("atan")]
    #[token("ceil")]
    #[token("cos")]
    #[token("cosh")]
    #[token("exp")]
    #[token("floor")]
    #[token("ln")]
    #[token("log10")]
    #[token("round")]
    #[token("sin")]
    #[token("sinh")]
    #[token("sqrt")]
    #[token("tan")]
    #[token("tanh")]
    #[token("todeg")]
    #[token("torad")]
    #[token("trunc")]
    #[token("ffill")]
    #[token("crossover")]
    #[token("crossunder")]
    #[token("crossany")]
    #[token("coalesce")]
    #[token("conditional_select")]
    BuiltinFunction,

    /// Builtin schema and time types.
    #[token("Time")]
    #[token("Duration")]
    #[token("Session")]
    #[token("SessionAnchor")]
    #[token("EventMarkerSchema")]
    #[token("SqlStatement")]
    #[token("TableReportSchema")]
    #[token("CardColumnSchema")]
    BuiltinType,

    // =========================================================================
    // LITERALS
    // =========================================================================
    /// Decimal integer: `42`
    #[regex(r"[0-9]+")]
    IntLiteral,

    /// Floating point number: `3.14`, `.5`, `1e-3`
    #[regex(r"\.[0-9]+")]
    FloatLiteral,

    /// Timeframe: `1D`, `15Min`, `1W-MON`, `1QE`
    TimeframeLiteral,

    /// String in single, double or triple quotes.
    #[regex(r#"'([^'\\\r\n]|\\[^\r\n])*'"#)]
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*""#)]
    #[token("'''", lex_triple_single)]
    #[token("\"\"\"", lex_triple_double)]
    StringLiteral,

    // =========================================================================
    // IDENTIFIERS
    // =========================================================================
    /// Identifier
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Unrecognized input, unterminated strings and rejected string prefixes.
    #[regex(r#"'([^'\\\r\n]|\\[^\r\n])*"#)]
    #[regex(r#""([^"\\\r\n]|\\[^\r\n])*"#)]
    Error,

    /// End of file (zero width).
    Eof,
}

macro_rules! define_all_token_kinds {
    ($($name:ident),* $(,)?) => {
        impl TokenKind {
            /// Every token kind, indexed by discriminant.
            pub const ALL: &'static [TokenKind] = &[$(TokenKind::$name,)*];
        }
    };
}

for_each_token_kind!(define_all_token_kinds);

impl TokenKind {
    /// Number of token kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the token kind with the given discriminant.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns `true` if this token is trivia (whitespace or comment).
    #[inline]
    #[must_use]
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }

    /// Returns `true` for tokens synthesized from indentation.
    #[inline]
    #[must_use]
    pub fn is_layout(self) -> bool {
        matches!(self, Self::Newline | Self::Indent | Self::Dedent | Self::Eof)
    }

    /// Returns `true` if this token is a keyword.
    #[must_use]
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            Self::KwIf
                | Self::KwElif
                | Self::KwElse
                | Self::KwAnd
                | Self::KwOr
                | Self::KwNot
                | Self::KwTrue
                | Self::KwFalse
                | Self::KwNone
        )
    }

    /// Returns `true` if this token is a literal value.
    #[must_use]
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IntLiteral
                | Self::FloatLiteral
                | Self::TimeframeLiteral
                | Self::StringLiteral
                | Self::KwTrue
                | Self::KwFalse
                | Self::KwNone
        )
    }

    /// Returns `true` for bracket tokens that open a nesting level.
    #[must_use]
    pub fn is_open_bracket(self) -> bool {
        matches!(self, Self::LParen | Self::LBracket | Self::LBrace)
    }

    /// Returns `true` for bracket tokens that close a nesting level.
    #[must_use]
    pub fn is_close_bracket(self) -> bool {
        matches!(self, Self::RParen | Self::RBracket | Self::RBrace)
    }

    /// Human readable name used in diagnostics.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::Comment => "comment",
            Self::Newline => "newline",
            Self::Indent => "indent",
            Self::Dedent => "dedent",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::Comma => "`,`",
            Self::Colon => "`:`",
            Self::Dot => "`.`",
            Self::Assign => "`=`",
            Self::Pipe => "`|`",
            Self::Shr => "`>>`",
            Self::Shl => "`<<`",
            Self::Lt => "`<`",
            Self::Gt => "`>`",
            Self::LtEq => "`<=`",
            Self::GtEq => "`>=`",
            Self::EqEq => "`==`",
            Self::Neq => "`!=`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Star => "`*`",
            Self::Slash => "`/`",
            Self::Percent => "`%`",
            Self::Power => "`**`",
            Self::KwIf => "`if`",
            Self::KwElif => "`elif`",
            Self::KwElse => "`else`",
            Self::KwAnd => "`and`",
            Self::KwOr => "`or`",
            Self::KwNot => "`not`",
            Self::KwTrue => "`True`",
            Self::KwFalse => "`False`",
            Self::KwNone => "`None`",
            Self::BuiltinFunction => "builtin function",
            Self::BuiltinType => "builtin type",
            Self::IntLiteral => "integer",
            Self::FloatLiteral => "float",
            Self::TimeframeLiteral => "timeframe",
            Self::StringLiteral => "string",
            Self::Ident => "identifier",
            Self::Error => "invalid token",
            Self::Eof => "end of file",
        }
    }
}

impl From<TokenKind> for rowan::SyntaxKind {
    fn from(kind: TokenKind) -> Self {
        Self(kind as u16)
    }
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];
const WEEK_ORDINALS: [&str; 5] = ["1st", "2nd", "3rd", "4th", "Last"];

fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Length of an exponent (`e10`, `E-3`) at the start of `rest`, or 0.
pub(crate) fn exponent_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let mut i = 1;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits = bytes[i.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        0
    } else {
        i + digits
    }
}

/// Length of a timeframe unit at the start of `rest`, or 0.
///
/// A unit must not run into an identifier (`1Mins` is not a timeframe).
/// When the longest unit does, the next shorter one is tried, so `1W-MONx`
/// reads as `1W`, `-`, `MONx`.
pub(crate) fn timeframe_unit_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let (anchored, weekly) = weekly_unit_len(rest);
    let minute = rest.starts_with("Min").then_some(3);
    let edge = (matches!(bytes.first(), Some(b'M' | b'Q' | b'Y'))
        && matches!(bytes.get(1), Some(b'S' | b'E')))
    .then_some(2);
    let single = matches!(
        bytes.first(),
        Some(b's' | b'H' | b'D' | b'W' | b'M' | b'Q' | b'Y')
    )
    .then_some(1);

    [anchored, weekly, minute, edge, single]
        .into_iter()
        .flatten()
        .find(|&len| !bytes.get(len).copied().is_some_and(is_ident_continue))
        .unwrap_or(0)
}

/// Lengths of `W-MON-2nd` and `W-MON` style units at the start of `rest`.
fn weekly_unit_len(rest: &str) -> (Option<usize>, Option<usize>) {
    let Some(day) = rest.strip_prefix("W-") else {
        return (None, None);
    };
    if !WEEKDAYS.iter().any(|weekday| day.starts_with(weekday)) {
        return (None, None);
    }
    let anchored = day[3..].strip_prefix('-').and_then(|ordinal| {
        WEEK_ORDINALS
            .iter()
            .find(|o| ordinal.starts_with(*o))
            .map(|o| 6 + o.len())
    });
    (anchored, Some(5))
}

/// Classifies a number whose leading digits have already been scanned.
///
/// Returns the final kind and how many bytes of `rest` belong to it.
pub(crate) fn finish_number(digits: &str, rest: &str) -> (TokenKind, usize) {
    let bytes = rest.as_bytes();
    let mut len = 0;
    let mut kind = TokenKind::IntLiteral;

    if bytes.first() == Some(&b'.') {
        kind = TokenKind::FloatLiteral;
        len = 1 + bytes[1..].iter().take_while(|b| b.is_ascii_digit()).count();
    }

    let exponent = exponent_len(&rest[len..]);
    if exponent > 0 {
        return (TokenKind::FloatLiteral, len + exponent);
    }

    if kind == TokenKind::IntLiteral && !digits.starts_with('0') {
        let unit = timeframe_unit_len(rest);
        if unit > 0 {
            return (TokenKind::TimeframeLiteral, unit);
        }
    }

    (kind, len)
}

/// Returns `true` for identifier text that Python would read as a string
/// prefix (`f`, `b`, `r`, `u` and their two-letter combinations).
pub(crate) fn is_string_prefix(text: &str) -> bool {
    (1..=2).contains(&text.len())
        && text
            .bytes()
            .all(|b| matches!(b.to_ascii_lowercase(), b'f' | b'b' | b'r' | b'u'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<(TokenKind, &str)> {
        TokenKind::lexer(input)
            .spanned()
            .map(|(tok, span)| (tok.unwrap_or(TokenKind::Error), &input[span]))
            .collect()
    }

    fn significant(input: &str) -> Vec<TokenKind> {
        lex(input)
            .into_iter()
            .map(|(k, _)| k)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            significant("if elif else and or not True False None"),
            vec![
                TokenKind::KwIf,
                TokenKind::KwElif,
                TokenKind::KwElse,
                TokenKind::KwAnd,
                TokenKind::KwOr,
                TokenKind::KwNot,
                TokenKind::KwTrue,
                TokenKind::KwFalse,
                TokenKind::KwNone,
            ]
        );
    }

    #[test]
    fn test_python_keywords_are_identifiers() {
        let kinds = significant("class def lambda for import iff true");
        assert!(kinds.iter().all(|k| *k == TokenKind::Ident));
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(
            significant("abs log10 conditional_select crossover absx"),
            vec![
                TokenKind::BuiltinFunction,
                TokenKind::BuiltinFunction,
                TokenKind::BuiltinFunction,
                TokenKind::BuiltinFunction,
                TokenKind::Ident,
            ]
        );
        assert_eq!(
            significant("Session SessionAnchor Sessions"),
            vec![
                TokenKind::BuiltinType,
                TokenKind::BuiltinType,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            significant("= | >> << < > <= >= == != + - * / % **"),
            vec![
                TokenKind::Assign,
                TokenKind::Pipe,
                TokenKind::Shr,
                TokenKind::Shl,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::EqEq,
                TokenKind::Neq,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Power,
            ]
        );
    }

    #[test]
    fn test_strings() {
        let tokens = lex(r##"'a' "b" 'it\'s' '''x'y''' """z"""##);
        let strings: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| !k.is_trivia())
            .map(|(k, text)| (*k, *text))
            .collect();
        assert_eq!(
            strings,
            vec![
                (TokenKind::StringLiteral, "'a'"),
                (TokenKind::StringLiteral, "\"b\""),
                (TokenKind::StringLiteral, r"'it\'s'"),
                (TokenKind::StringLiteral, "'''x'y'''"),
                (TokenKind::StringLiteral, "\"\"\"z\"\"\""),
            ]
        );
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let tokens = lex("'''a\nb'''");
        assert_eq!(tokens, vec![(TokenKind::StringLiteral, "'''a\nb'''")]);
    }

    #[test]
    fn test_unterminated_strings() {
        assert_eq!(lex("'abc"), vec![(TokenKind::Error, "'abc")]);
        assert_eq!(significant("\"abc\n"), vec![TokenKind::Error, TokenKind::Newline]);
        assert_eq!(significant("'''abc"), vec![TokenKind::Error]);
    }

    #[test]
    fn test_comments_and_continuations() {
        let tokens = lex("# note\nx \\\n  y");
        let kinds: Vec<_> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Comment,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Whitespace,
                TokenKind::Ident,
            ]
        );
    }

    #[test]
    fn test_raw_digits() {
        assert_eq!(lex("123"), vec![(TokenKind::IntLiteral, "123")]);
        assert_eq!(lex(".5"), vec![(TokenKind::FloatLiteral, ".5")]);
    }

    #[test]
    fn test_finish_number() {
        assert_eq!(finish_number("3", ".14 "), (TokenKind::FloatLiteral, 3));
        assert_eq!(finish_number("3", ". "), (TokenKind::FloatLiteral, 1));
        assert_eq!(finish_number("1", "e5"), (TokenKind::FloatLiteral, 2));
        assert_eq!(finish_number("2", ".5e-3"), (TokenKind::FloatLiteral, 5));
        assert_eq!(finish_number("1", "e"), (TokenKind::IntLiteral, 0));
        assert_eq!(finish_number("42", ")"), (TokenKind::IntLiteral, 0));
    }

    #[test]
    fn test_timeframe_units() {
        assert_eq!(finish_number("15", "Min"), (TokenKind::TimeframeLiteral, 3));
        assert_eq!(finish_number("1", "D)"), (TokenKind::TimeframeLiteral, 1));
        assert_eq!(finish_number("30", "s"), (TokenKind::TimeframeLiteral, 1));
        assert_eq!(finish_number("1", "ME"), (TokenKind::TimeframeLiteral, 2));
        assert_eq!(finish_number("1", "W-MON"), (TokenKind::TimeframeLiteral, 5));
        assert_eq!(
            finish_number("1", "W-FRI-Last"),
            (TokenKind::TimeframeLiteral, 10)
        );
        assert_eq!(
            finish_number("1", "W-MON-2nd"),
            (TokenKind::TimeframeLiteral, 9)
        );
        assert_eq!(finish_number("1", "Mins"), (TokenKind::IntLiteral, 0));
        assert_eq!(finish_number("0", "D"), (TokenKind::IntLiteral, 0));
        assert_eq!(finish_number("1", "W-XYZ"), (TokenKind::TimeframeLiteral, 1));
        assert_eq!(finish_number("1", "MSx"), (TokenKind::IntLiteral, 0));
    }

    #[test]
    fn test_timeframe_falls_back_to_shorter_unit() {
        assert_eq!(finish_number("1", "W-MONx"), (TokenKind::TimeframeLiteral, 1));
        assert_eq!(
            finish_number("1", "W-MON-Lastx"),
            (TokenKind::TimeframeLiteral, 5)
        );
    }

    #[test]
    fn test_string_prefixes() {
        assert!(is_string_prefix("f"));
        assert!(is_string_prefix("Rb"));
        assert!(is_string_prefix("u"));
        assert!(!is_string_prefix("x"));
        assert!(!is_string_prefix("fbr"));
    }

    #[test]
    fn test_token_kind_table_is_in_declaration_order() {
        for (index, kind) in TokenKind::ALL.iter().enumerate() {
            assert_eq!(*kind as usize, index);
        }
        assert_eq!(TokenKind::ALL.last(), Some(&TokenKind::Eof));
    }
}
