//! The compiled EpochScript language handle.

use once_cell::sync::Lazy;

use crate::grammar::{epochscript_grammar, Action, FieldId, ParseTable, RuleId, StateId};
use crate::lexer::TokenKind;
use crate::parser::Parse;
use crate::syntax::SyntaxKind;

static LANGUAGE: Lazy<Language> = Lazy::new(|| {
    // Covered by the grammar tests; only a broken rule definition panics here.
    let table = epochscript_grammar()
        .compile()
        .unwrap_or_else(|err| panic!("EpochScript grammar does not compile: {err}"));
    Language { table }
});

/// Immutable parse tables, symbol names and field names for EpochScript.
///
/// Obtained through [`language`]. The tables are built on first use and
/// shared by all threads afterwards.
#[derive(Debug)]
pub struct Language {
    table: ParseTable,
}

/// Returns the EpochScript language handle.
#[must_use]
pub fn language() -> &'static Language {
    &LANGUAGE
}

impl Language {
    /// Name of the language, `"epochscript"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.table.name()
    }

    /// The compiled LALR(1) tables.
    #[must_use]
    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    /// Number of parser states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.table.state_count()
    }

    /// Number of grammar symbols: token kinds plus rules.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        TokenKind::COUNT + self.table.rule_count()
    }

    /// Names of all grammar symbols.
    pub fn symbol_names(&self) -> impl Iterator<Item = String> + '_ {
        self.table.symbol_names()
    }

    /// Names of all fields.
    #[must_use]
    pub fn field_names(&self) -> &[&'static str] {
        self.table.field_names()
    }

    /// Looks a field up by name.
    #[must_use]
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.table.field_id(name)
    }

    /// Significant-child index of `field` in nodes of `kind`.
    #[must_use]
    pub fn field_position(&self, kind: SyntaxKind, field: FieldId) -> Option<usize> {
        self.table.field_position(kind, field)
    }

    /// Parser action for `token` in `state`.
    #[must_use]
    pub fn action(&self, state: StateId, token: TokenKind) -> Action {
        self.table.action(state, token)
    }

    /// State reached from `state` after reducing to `rule`.
    #[must_use]
    pub fn goto(&self, state: StateId, rule: RuleId) -> Option<StateId> {
        self.table.goto(state, rule)
    }

    /// Tokens accepted in `state`.
    pub fn expected_tokens(&self, state: StateId) -> impl Iterator<Item = TokenKind> + '_ {
        self.table.expected_tokens(state)
    }

    /// Parses `text` with the default configuration.
    #[must_use]
    pub fn parse(&self, text: &str) -> Parse {
        crate::parser::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_is_shared() {
        let first = language();
        let second = language();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.name(), "epochscript");
        assert!(first.state_count() > 0);
        assert_eq!(first.symbol_names().count(), first.symbol_count());
    }

    #[test]
    fn test_field_lookup() {
        let lang = language();
        let right = lang.field_id("right").unwrap();
        assert_eq!(lang.field_position(SyntaxKind::AssignStmt, right), Some(2));
        assert_eq!(lang.field_position(SyntaxKind::Literal, right), None);
        assert!(lang.field_names().contains(&"function"));
        assert_eq!(lang.field_id("body_of_nothing"), None);
    }

    #[test]
    fn test_actions_from_the_start_state() {
        let lang = language();
        assert!(matches!(lang.action(0, TokenKind::Ident), Action::Shift(_)));
        assert_eq!(lang.action(0, TokenKind::RParen), Action::Error);
        assert!(lang.expected_tokens(0).any(|kind| kind == TokenKind::KwIf));
    }

    #[test]
    fn test_language_parse() {
        let parse = language().parse("x = 1\n");
        assert!(parse.ok());
        assert_eq!(parse.syntax().kind(), SyntaxKind::SourceFile);
    }
}
