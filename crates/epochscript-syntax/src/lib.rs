//! `epochscript-syntax` - Lexer, LALR(1) parser and incremental concrete syntax
//! tree for the EpochScript strategy language.
//!
//! This crate provides the syntactic analysis for EpochScript source code:
//!
//! - **Lexer**: Tokenizes source text, including Python-style layout tokens
//!   (`Newline`, `Indent`, `Dedent`)
//! - **Grammar**: Declares the language and compiles it into LALR(1) tables
//! - **Parser**: Drives the tables and builds a concrete syntax tree (CST)
//! - **Incremental reparsing**: Updates a tree after an edit, sharing the
//!   subtrees the edit did not touch
//! - **Queries**: Structural patterns over the tree
//!
//! # Design Principles
//!
//! The trees are `rowan` green/red trees, as in `rust-analyzer`:
//!
//! - **Lossless**: All source text is preserved, including whitespace and comments
//! - **Error-tolerant**: Parsing never fails; input no rule accepts ends up
//!   in `Error` nodes and in the error list
//! - **Incremental**: [`reparse`] reuses the old tree where it can
//!
//! # Example
//!
//! ```
//! use epochscript_syntax::{parse, SyntaxKind};
//!
//! let parse = parse("fast = ema(period=12)(src.c)\n");
//! assert!(parse.ok());
//!
//! let assign = parse.syntax().first_child().unwrap();
//! assert_eq!(assign.kind(), SyntaxKind::AssignStmt);
//! assert_eq!(assign.text().to_string(), "fast = ema(period=12)(src.c)");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod grammar;
pub mod incremental;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod syntax;
pub mod tree;
mod token_kinds;

pub use config::ParseConfig;
pub use incremental::{reparse, Edit, Reparse, Strategy};
pub use language::{language, Language};
pub use lexer::{lex, Lexer, Token, TokenKind};
pub use parser::{parse, parse_with, ErrorKind, Parse, ParseError};
pub use syntax::{EpochLanguage, SyntaxKind, SyntaxNode, SyntaxToken};
