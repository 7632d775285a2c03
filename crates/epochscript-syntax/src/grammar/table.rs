//! Compiled parse tables and field-position tables.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::lalr::{Lowered, Sym};
use super::{Grammar, GrammarError, Symbol};
use crate::lexer::TokenKind;
use crate::syntax::SyntaxKind;

/// Index of an LR state.
pub type StateId = u32;
/// Index of a rule in declaration order.
pub type RuleId = u32;
/// Index of a production. Production 0 is the augmented start.
pub type ProductionId = u32;
/// Index into the field name table.
pub type FieldId = u16;

/// Parser action for a state and lookahead token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Push the token and move to the state.
    Shift(StateId),
    /// Pop the production's symbols and push its rule.
    Reduce(ProductionId),
    /// The input is a complete start rule.
    Accept,
    /// No action; error recovery takes over.
    Error,
}

/// What the engine needs to know about a production at reduce time.
#[derive(Debug, Clone)]
pub(crate) struct ProductionInfo {
    pub(crate) lhs: RuleId,
    pub(crate) len: usize,
    /// Node to wrap the children in; `None` splices them into the parent.
    pub(crate) node: Option<SyntaxKind>,
    pub(crate) display: String,
}

/// Field positions per node kind.
#[derive(Debug, Clone, Default)]
pub(crate) struct FieldTable {
    pub(crate) names: Vec<&'static str>,
    pub(crate) positions: FxHashMap<SyntaxKind, Vec<(FieldId, usize)>>,
}

impl FieldTable {
    /// Computes the child index of every field and checks that it is fixed.
    ///
    /// Children are counted as significant elements of the node: tokens
    /// other than trivia and child nodes. A hidden rule occupies as many
    /// positions as all its alternatives agree on, or has no fixed width.
    pub(crate) fn compute(grammar: &Grammar, lowered: &Lowered) -> Result<Self, GrammarError> {
        let mut widths: Vec<Width> = vec![Width::Unknown; grammar.rules.len()];
        let mut table = Self::default();

        for rule in &grammar.rules {
            for alternative in &rule.alternatives {
                let node = alternative.node.or(rule.kind);
                let mut offset = Some(0usize);
                for slot in &alternative.slots {
                    if let Some(field) = slot.field {
                        let Some(kind) = node else {
                            return Err(GrammarError::FieldWithoutNode {
                                rule: rule.name.into(),
                                field: field.into(),
                            });
                        };
                        let Some(position) = offset else {
                            return Err(GrammarError::FieldPosition {
                                kind,
                                field: field.into(),
                            });
                        };
                        table.insert(kind, field, position)?;
                    }
                    let width = match slot.symbol {
                        Symbol::Token(_) => Some(1),
                        Symbol::Rule(name) => slot_width(grammar, lowered, name, &mut widths),
                    };
                    offset = offset.zip(width).map(|(a, b)| a + b);
                }
            }
        }

        Ok(table)
    }

    fn insert(&mut self, kind: SyntaxKind, field: &'static str, position: usize) -> Result<(), GrammarError> {
        let id = match self.names.iter().position(|name| *name == field) {
            Some(id) => id,
            None => {
                self.names.push(field);
                self.names.len() - 1
            }
        };
        let id = FieldId::try_from(id).unwrap_or(FieldId::MAX);
        let entries = self.positions.entry(kind).or_default();
        match entries.iter().find(|(existing, _)| *existing == id) {
            Some(&(_, existing)) if existing != position => Err(GrammarError::InconsistentField {
                kind,
                field: SmolStr::new(field),
            }),
            Some(_) => Ok(()),
            None => {
                entries.push((id, position));
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Unknown,
    InProgress,
    Fixed(usize),
    Variable,
}

fn slot_width(grammar: &Grammar, lowered: &Lowered, name: &str, widths: &mut [Width]) -> Option<usize> {
    let index = lowered.rule_index(name)?;
    if grammar.rules[index].kind.is_some() {
        return Some(1);
    }
    match widths[index] {
        Width::Fixed(width) => return Some(width),
        Width::Variable | Width::InProgress => return None,
        Width::Unknown => {}
    }

    widths[index] = Width::InProgress;
    let mut agreed: Option<Option<usize>> = None;
    for alternative in &grammar.rules[index].alternatives {
        let width = if alternative.node.is_some() {
            Some(1)
        } else {
            alternative.slots.iter().try_fold(0usize, |acc, slot| {
                let width = match slot.symbol {
                    Symbol::Token(_) => Some(1),
                    Symbol::Rule(name) => slot_width(grammar, lowered, name, widths),
                };
                width.map(|w| acc + w)
            })
        };
        agreed = match agreed {
            None => Some(width),
            Some(previous) if previous == width => Some(previous),
            Some(_) => Some(None),
        };
    }

    let width = agreed.flatten();
    widths[index] = width.map_or(Width::Variable, Width::Fixed);
    width
}

/// LALR(1) tables for a compiled grammar.
#[derive(Debug, Clone)]
pub struct ParseTable {
    pub(crate) name: &'static str,
    pub(crate) state_count: usize,
    pub(crate) actions: Vec<Action>,
    pub(crate) gotos: Vec<Option<StateId>>,
    pub(crate) default_reductions: Vec<Option<ProductionId>>,
    pub(crate) productions: Vec<ProductionInfo>,
    pub(crate) rule_names: Vec<&'static str>,
    pub(crate) root_kind: SyntaxKind,
    pub(crate) recovery: Option<TokenKind>,
    pub(crate) fields: FieldTable,
}

impl ParseTable {
    /// Name of the grammar the table was compiled from.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of LR states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// Number of productions, including the augmented start.
    #[must_use]
    pub fn production_count(&self) -> usize {
        self.productions.len()
    }

    /// Number of rules (nonterminal symbols).
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rule_names.len()
    }

    /// Action for `token` in `state`, without default reductions.
    #[must_use]
    pub fn action(&self, state: StateId, token: TokenKind) -> Action {
        self.actions
            .get(state as usize * TokenKind::COUNT + token as usize)
            .copied()
            .unwrap_or(Action::Error)
    }

    /// Target state after reducing to `rule` on top of `state`.
    #[must_use]
    pub fn goto(&self, state: StateId, rule: RuleId) -> Option<StateId> {
        self.gotos
            .get(state as usize * self.rule_names.len() + rule as usize)
            .copied()
            .flatten()
    }

    /// Production reduced in `state` when the lookahead has no action.
    #[must_use]
    pub fn default_reduction(&self, state: StateId) -> Option<ProductionId> {
        self.default_reductions.get(state as usize).copied().flatten()
    }

    /// Returns `true` if error recovery may resume in `state`.
    #[must_use]
    pub fn is_recovery_state(&self, state: StateId) -> bool {
        self.recovery
            .is_some_and(|token| matches!(self.action(state, token), Action::Shift(_)))
    }

    /// Tokens with an action in `state`.
    pub fn expected_tokens(&self, state: StateId) -> impl Iterator<Item = TokenKind> + '_ {
        TokenKind::ALL
            .iter()
            .copied()
            .filter(move |&token| Some(token) != self.recovery && self.action(state, token) != Action::Error)
    }

    /// Name of a rule.
    #[must_use]
    pub fn rule_name(&self, rule: RuleId) -> Option<&'static str> {
        self.rule_names.get(rule as usize).copied()
    }

    /// Human readable form of a production, e.g. `_expr -> _expr Plus _expr`.
    #[must_use]
    pub fn production_display(&self, production: ProductionId) -> Option<&str> {
        self.productions
            .get(production as usize)
            .map(|p| p.display.as_str())
    }

    /// Names of all symbols: token kinds first, then rules.
    pub fn symbol_names(&self) -> impl Iterator<Item = String> + '_ {
        TokenKind::ALL
            .iter()
            .map(|kind| format!("{kind:?}"))
            .chain(self.rule_names.iter().map(|name| (*name).to_string()))
    }

    /// All field names, indexed by [`FieldId`].
    #[must_use]
    pub fn field_names(&self) -> &[&'static str] {
        &self.fields.names
    }

    /// Looks up a field id by name.
    #[must_use]
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.fields
            .names
            .iter()
            .position(|candidate| *candidate == name)
            .and_then(|id| FieldId::try_from(id).ok())
    }

    /// Significant-child index of `field` in nodes of `kind`.
    #[must_use]
    pub fn field_position(&self, kind: SyntaxKind, field: FieldId) -> Option<usize> {
        self.fields
            .positions
            .get(&kind)?
            .iter()
            .find(|(id, _)| *id == field)
            .map(|(_, position)| *position)
    }

    /// Fields defined on nodes of `kind`.
    pub fn fields_of(&self, kind: SyntaxKind) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.fields
            .positions
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&(id, position)| (self.fields.names[id as usize], position))
    }

    /// Kind of the root node.
    #[must_use]
    pub fn root_kind(&self) -> SyntaxKind {
        self.root_kind
    }

    pub(crate) fn production(&self, production: ProductionId) -> &ProductionInfo {
        &self.productions[production as usize]
    }
}

/// Renders a lowered symbol for diagnostics.
pub(crate) fn symbol_display(lowered: &Lowered, symbol: Sym) -> String {
    match symbol {
        Sym::Term(t) => TokenKind::from_index(t as usize).map_or_else(|| format!("#{t}"), |k| format!("{k:?}")),
        Sym::Rule(r) => lowered.rule_name(r as usize).to_string(),
    }
}
