//! Single source of truth for the token half of `SyntaxKind`.
//!
//! The order here must match the declaration order of `TokenKind`, with
//! `Eof` last.

macro_rules! for_each_token_kind {
    ($mac:ident) => {
        $mac! {
            Whitespace,
            Comment,
            Newline,
            Indent,
            Dedent,
            LParen,
            RParen,
            LBracket,
            RBracket,
            LBrace,
            RBrace,
            Comma,
            Colon,
            Dot,
            Assign,
            Pipe,
            Shr,
            Shl,
            Lt,
            Gt,
            LtEq,
            GtEq,
            EqEq,
            Neq,
            Plus,
            Minus,
            Star,
            Slash,
            Percent,
            Power,
            KwIf,
            KwElif,
            KwElse,
            KwAnd,
            KwOr,
            KwNot,
            KwTrue,
            KwFalse,
            KwNone,
            BuiltinFunction,
            BuiltinType,
            IntLiteral,
            FloatLiteral,
            TimeframeLiteral,
            StringLiteral,
            Ident,
            Error,
            Eof,
        }
    };
}

pub(crate) use for_each_token_kind;
