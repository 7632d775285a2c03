//! Syntax tree types for EpochScript.
//!
//! This module provides the `rowan`-based syntax tree implementation,
//! including the `SyntaxKind` enum that covers both tokens and composite nodes.

use crate::lexer::TokenKind;
use crate::token_kinds::for_each_token_kind;

macro_rules! define_syntax_kind {
    ($($token:ident),* $(,)?) => {
        /// All syntax node and token kinds in EpochScript.
        ///
        /// This enum includes both token kinds (from the lexer) and composite
        /// node kinds (produced by the parser). `Error` doubles as the kind of
        /// error nodes built by parser recovery.
        // Variants mirror lexer/token names; documenting each would be noisy.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum SyntaxKind {
            // =========================================================================
            // TOKEN KINDS (mirrors TokenKind)
            // =========================================================================
            $($token,)*

            // =========================================================================
            // COMPOSITE NODE KINDS (produced by parser)
            // =========================================================================
            /// Root node of a source file
            SourceFile,

            // Statements
            /// `target = value`
            AssignStmt,

            /// An expression on its own line
            ExprStmt,

            /// `if cond:` block with optional `elif`/`else` clauses
            IfStmt,

            ElifClause,

            ElseClause,

            /// `NEWLINE INDENT statements DEDENT`
            Block,

            /// `a, b, c` on the left of an assignment
            TuplePattern,

            /// A name being bound
            Name,

            // Expressions
            /// `a | b`
            PipelineExpr,

            /// `a if cond else b`
            TernaryExpr,

            BinaryExpr,

            UnaryExpr,

            /// `series >> periods`
            LagExpr,

            /// `series << periods`
            LeadExpr,

            CallExpr,

            ArgList,

            /// `name=value` inside an argument list
            KeywordArg,

            /// `object.attribute`
            AttributeExpr,

            /// `value[index]`
            SubscriptExpr,

            ParenExpr,

            TupleExpr,

            ListExpr,

            DictExpr,

            DictEntry,

            /// A name being read
            NameRef,

            /// A builtin function or type name
            BuiltinRef,

            Literal,
        }
    };
}

for_each_token_kind!(define_syntax_kind);

impl SyntaxKind {
    /// Returns `true` for whitespace and comments.
    #[must_use]
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment)
    }

    /// Returns `true` for token (leaf) kinds.
    #[must_use]
    pub fn is_token(self) -> bool {
        (self as u16) <= (Self::Eof as u16)
    }

    /// Returns `true` for composite node kinds.
    #[must_use]
    pub fn is_node(self) -> bool {
        !self.is_token()
    }

    /// Returns the token kind this syntax kind mirrors, if any.
    #[must_use]
    pub fn to_token(self) -> Option<TokenKind> {
        TokenKind::from_index(self as usize)
    }

    /// Looks a kind up by its `Debug` name, e.g. `"CallExpr"`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        SYNTAX_KIND_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .and_then(|index| SYNTAX_KINDS.get(index).copied())
    }
}

macro_rules! map_token_kinds {
    ($($name:ident),* $(,)?) => {
        impl From<TokenKind> for SyntaxKind {
            fn from(kind: TokenKind) -> Self {
                match kind {
                    $(TokenKind::$name => SyntaxKind::$name,)*
                }
            }
        }
    };
}

for_each_token_kind!(map_token_kinds);

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Marker type tying `rowan` trees to [`SyntaxKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EpochLanguage {}

macro_rules! define_syntax_kinds {
    ($($token:ident),* $(,)?) => {
        const SYNTAX_KINDS: &[SyntaxKind] = &[
            $(SyntaxKind::$token,)*
            SyntaxKind::SourceFile,
            SyntaxKind::AssignStmt,
            SyntaxKind::ExprStmt,
            SyntaxKind::IfStmt,
            SyntaxKind::ElifClause,
            SyntaxKind::ElseClause,
            SyntaxKind::Block,
            SyntaxKind::TuplePattern,
            SyntaxKind::Name,
            SyntaxKind::PipelineExpr,
            SyntaxKind::TernaryExpr,
            SyntaxKind::BinaryExpr,
            SyntaxKind::UnaryExpr,
            SyntaxKind::LagExpr,
            SyntaxKind::LeadExpr,
            SyntaxKind::CallExpr,
            SyntaxKind::ArgList,
            SyntaxKind::KeywordArg,
            SyntaxKind::AttributeExpr,
            SyntaxKind::SubscriptExpr,
            SyntaxKind::ParenExpr,
            SyntaxKind::TupleExpr,
            SyntaxKind::ListExpr,
            SyntaxKind::DictExpr,
            SyntaxKind::DictEntry,
            SyntaxKind::NameRef,
            SyntaxKind::BuiltinRef,
            SyntaxKind::Literal,
        ];

        const SYNTAX_KIND_NAMES: &[&str] = &[
            $(stringify!($token),)*
            "SourceFile",
            "AssignStmt",
            "ExprStmt",
            "IfStmt",
            "ElifClause",
            "ElseClause",
            "Block",
            "TuplePattern",
            "Name",
            "PipelineExpr",
            "TernaryExpr",
            "BinaryExpr",
            "UnaryExpr",
            "LagExpr",
            "LeadExpr",
            "CallExpr",
            "ArgList",
            "KeywordArg",
            "AttributeExpr",
            "SubscriptExpr",
            "ParenExpr",
            "TupleExpr",
            "ListExpr",
            "DictExpr",
            "DictEntry",
            "NameRef",
            "BuiltinRef",
            "Literal",
        ];
    };
}

for_each_token_kind!(define_syntax_kinds);

impl rowan::Language for EpochLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        SYNTAX_KINDS
            .get(raw.0 as usize)
            .copied()
            .unwrap_or(SyntaxKind::Error)
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// A syntax node in the EpochScript syntax tree.
pub type SyntaxNode = rowan::SyntaxNode<EpochLanguage>;

/// A syntax token in the EpochScript syntax tree.
pub type SyntaxToken = rowan::SyntaxToken<EpochLanguage>;

/// A syntax element (either node or token) in the EpochScript syntax tree.
pub type SyntaxElement = rowan::SyntaxElement<EpochLanguage>;

/// An element of a green tree under construction.
pub type GreenElement = rowan::NodeOrToken<rowan::GreenNode, rowan::GreenToken>;
