//! Declarative grammar definitions and their compilation to parse tables.
//!
//! A [`Grammar`] is a list of named rules. Each rule has ordered
//! alternatives made of [`Slot`]s, a slot being a token or a reference to
//! another rule, optionally labelled with a field name. Visible rules wrap
//! their children in a node of a fixed [`SyntaxKind`]; hidden rules (by
//! convention named with a leading `_`) splice their children into the
//! parent, unless an alternative names its own node kind.
//!
//! [`Grammar::compile`] validates the rules and builds LALR(1) action and
//! goto tables. Shift/reduce conflicts are settled with token and
//! alternative precedences; whatever precedence cannot settle must be
//! declared with [`Grammar::conflict`] or compilation fails.

mod epochscript;
mod lalr;
mod table;

pub use epochscript::epochscript_grammar;
pub use table::{Action, FieldId, ParseTable, ProductionId, RuleId, StateId};

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::lexer::TokenKind;
use crate::syntax::SyntaxKind;

/// Name of a grammar rule.
pub type RuleName = &'static str;

/// A grammar symbol as written in rule definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A terminal.
    Token(TokenKind),
    /// A reference to another rule.
    Rule(RuleName),
}

/// One position in an alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// What appears at this position.
    pub symbol: Symbol,
    /// Optional field label for child access.
    pub field: Option<&'static str>,
}

impl Slot {
    /// Labels this slot with a field name.
    #[must_use]
    pub fn field(mut self, name: &'static str) -> Self {
        self.field = Some(name);
        self
    }
}

/// A slot matching a single token.
#[must_use]
pub fn tok(kind: TokenKind) -> Slot {
    Slot {
        symbol: Symbol::Token(kind),
        field: None,
    }
}

/// A slot matching a rule.
#[must_use]
pub fn rule(name: RuleName) -> Slot {
    Slot {
        symbol: Symbol::Rule(name),
        field: None,
    }
}

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assoc {
    /// `a op b op c` groups as `(a op b) op c`.
    Left,
    /// `a op b op c` groups as `a op (b op c)`.
    Right,
    /// `a op b op c` is an error.
    NonAssoc,
}

/// Precedence level with associativity. Higher levels bind tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prec {
    /// Binding strength.
    pub level: u8,
    /// Tie-break between equal levels.
    pub assoc: Assoc,
}

impl Prec {
    /// Left-associative precedence.
    #[must_use]
    pub const fn left(level: u8) -> Self {
        Self {
            level,
            assoc: Assoc::Left,
        }
    }

    /// Right-associative precedence.
    #[must_use]
    pub const fn right(level: u8) -> Self {
        Self {
            level,
            assoc: Assoc::Right,
        }
    }

    /// Non-associative precedence.
    #[must_use]
    pub const fn none(level: u8) -> Self {
        Self {
            level,
            assoc: Assoc::NonAssoc,
        }
    }
}

/// One expansion of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    /// The symbols, in order. Empty for an epsilon alternative.
    pub slots: Vec<Slot>,
    /// Node kind produced by this alternative, overriding the rule's.
    pub node: Option<SyntaxKind>,
    /// Explicit precedence; defaults to that of the last token with one.
    pub prec: Option<Prec>,
}

impl Alternative {
    /// Wraps this alternative's children in a node of `kind`.
    #[must_use]
    pub fn node(mut self, kind: SyntaxKind) -> Self {
        self.node = Some(kind);
        self
    }

    /// Sets the alternative's precedence.
    #[must_use]
    pub fn prec(mut self, prec: Prec) -> Self {
        self.prec = Some(prec);
        self
    }
}

/// Creates an alternative from its slots.
pub fn alt(slots: impl IntoIterator<Item = Slot>) -> Alternative {
    Alternative {
        slots: slots.into_iter().collect(),
        node: None,
        prec: None,
    }
}

/// A named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique name.
    pub name: RuleName,
    /// Node kind for visible rules, `None` for hidden ones.
    pub kind: Option<SyntaxKind>,
    /// Ordered alternatives. Earlier alternatives win declared conflicts.
    pub alternatives: Vec<Alternative>,
}

impl Rule {
    /// A rule whose matches become nodes of `kind`.
    #[must_use]
    pub fn visible(name: RuleName, kind: SyntaxKind) -> Self {
        Self {
            name,
            kind: Some(kind),
            alternatives: Vec::new(),
        }
    }

    /// A rule whose children are spliced into the parent.
    #[must_use]
    pub fn hidden(name: RuleName) -> Self {
        Self {
            name,
            kind: None,
            alternatives: Vec::new(),
        }
    }

    /// Appends an alternative.
    #[must_use]
    pub fn alt(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(alternative);
        self
    }
}

/// Problems found while compiling a grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// Zero or several start rules were declared.
    #[error("grammar must declare exactly one start rule, found {0}")]
    StartRuleCount(usize),
    /// The start rule is hidden and would produce no root node.
    #[error("start rule `{0}` must be visible")]
    HiddenStartRule(SmolStr),
    /// Two rules share a name.
    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(SmolStr),
    /// A rule has no alternatives at all.
    #[error("rule `{0}` has no alternatives")]
    EmptyRule(SmolStr),
    /// A slot or the start declaration names a rule that does not exist.
    #[error("rule `{rule}` references undefined rule `{reference}`")]
    DanglingReference {
        /// The referencing rule.
        rule: SmolStr,
        /// The missing rule.
        reference: SmolStr,
    },
    /// A rule cannot be reached from the start rule.
    #[error("rule `{0}` is not reachable from the start rule")]
    UnreachableRule(SmolStr),
    /// A rule derives no finite token sequence.
    #[error("rule `{0}` cannot derive any finite token sequence")]
    NonProductiveRule(SmolStr),
    /// The grammar uses more token kinds than a terminal set can hold.
    #[error("grammar uses {0} token kinds, at most 128 are supported")]
    TooManyTerminals(usize),
    /// A field label on an alternative that produces no node.
    #[error("field `{field}` in rule `{rule}` is not inside a node")]
    FieldWithoutNode {
        /// The rule defining the alternative.
        rule: SmolStr,
        /// The field label.
        field: SmolStr,
    },
    /// A field follows a child of variable width.
    #[error("field `{field}` of {kind:?} does not have a fixed child position")]
    FieldPosition {
        /// Node kind carrying the field.
        kind: SyntaxKind,
        /// The field label.
        field: SmolStr,
    },
    /// Alternatives producing the same node kind place a field differently.
    #[error("alternatives of {kind:?} disagree on the position of field `{field}`")]
    InconsistentField {
        /// Node kind carrying the field.
        kind: SyntaxKind,
        /// The field label.
        field: SmolStr,
    },
    /// A conflict that neither precedence nor a conflict directive settles.
    #[error("unresolved conflict in state {state} on {lookahead}: {}", .candidates.join(" | "))]
    Conflict {
        /// LR state in which the conflict occurs.
        state: usize,
        /// The lookahead token.
        lookahead: SmolStr,
        /// The competing actions, rendered as `shift` or `rule -> symbols`.
        candidates: Vec<String>,
    },
}

/// A grammar under construction.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    name: &'static str,
    starts: Vec<RuleName>,
    rules: Vec<Rule>,
    token_precs: Vec<(TokenKind, Prec)>,
    conflicts: Vec<Vec<RuleName>>,
    recovery: Option<TokenKind>,
}

impl Grammar {
    /// Starts an empty grammar.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Declares the start rule.
    #[must_use]
    pub fn start(mut self, name: RuleName) -> Self {
        self.starts.push(name);
        self
    }

    /// Adds a rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Assigns a precedence to tokens used as operators.
    #[must_use]
    pub fn precedence(mut self, prec: Prec, tokens: &[TokenKind]) -> Self {
        self.token_precs
            .extend(tokens.iter().map(|&token| (token, prec)));
        self
    }

    /// Accepts conflicts among the given rules, resolved by preferring
    /// shift and then the earlier-declared alternative.
    #[must_use]
    pub fn conflict(mut self, rules: &[RuleName]) -> Self {
        self.conflicts.push(rules.to_vec());
        self
    }

    /// Declares the token that stands for a recovered error span. States
    /// that can shift it are where error recovery resumes.
    #[must_use]
    pub fn recovery(mut self, token: TokenKind) -> Self {
        self.recovery = Some(token);
        self
    }

    /// Grammar name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Validates the grammar and builds its LALR(1) tables.
    ///
    /// # Errors
    ///
    /// Returns the first [`GrammarError`] found.
    pub fn compile(&self) -> Result<ParseTable, GrammarError> {
        let start = self.validate()?;
        let lowered = lalr::Lowered::new(self, start);
        let fields = table::FieldTable::compute(self, &lowered)?;
        lalr::build(&lowered, fields)
    }

    /// Runs the structural checks and returns the index of the start rule.
    fn validate(&self) -> Result<usize, GrammarError> {
        if TokenKind::COUNT > 128 {
            return Err(GrammarError::TooManyTerminals(TokenKind::COUNT));
        }
        let &[start] = self.starts.as_slice() else {
            return Err(GrammarError::StartRuleCount(self.starts.len()));
        };

        let mut index: FxHashMap<RuleName, usize> = FxHashMap::default();
        for (i, rule) in self.rules.iter().enumerate() {
            if index.insert(rule.name, i).is_some() {
                return Err(GrammarError::DuplicateRule(rule.name.into()));
            }
            if rule.alternatives.is_empty() {
                return Err(GrammarError::EmptyRule(rule.name.into()));
            }
        }

        let Some(&start_index) = index.get(start) else {
            return Err(GrammarError::DanglingReference {
                rule: "<start>".into(),
                reference: start.into(),
            });
        };
        if self.rules[start_index].kind.is_none() {
            return Err(GrammarError::HiddenStartRule(start.into()));
        }

        for rule in &self.rules {
            for slot in rule.alternatives.iter().flat_map(|a| &a.slots) {
                if let Symbol::Rule(reference) = slot.symbol {
                    if !index.contains_key(reference) {
                        return Err(GrammarError::DanglingReference {
                            rule: rule.name.into(),
                            reference: reference.into(),
                        });
                    }
                }
            }
        }

        let mut reachable = FxHashSet::default();
        let mut stack = vec![start_index];
        while let Some(i) = stack.pop() {
            if !reachable.insert(i) {
                continue;
            }
            for slot in self.rules[i].alternatives.iter().flat_map(|a| &a.slots) {
                if let Symbol::Rule(reference) = slot.symbol {
                    stack.push(index[reference]);
                }
            }
        }
        if let Some(rule) = (0..self.rules.len()).find(|i| !reachable.contains(i)) {
            return Err(GrammarError::UnreachableRule(self.rules[rule].name.into()));
        }

        let mut productive = vec![false; self.rules.len()];
        let mut changed = true;
        while changed {
            changed = false;
            for (i, rule) in self.rules.iter().enumerate() {
                if productive[i] {
                    continue;
                }
                let derives = rule.alternatives.iter().any(|a| {
                    a.slots.iter().all(|slot| match slot.symbol {
                        Symbol::Token(_) => true,
                        Symbol::Rule(reference) => productive[index[reference]],
                    })
                });
                if derives {
                    productive[i] = true;
                    changed = true;
                }
            }
        }
        if let Some(rule) = productive.iter().position(|p| !p) {
            return Err(GrammarError::NonProductiveRule(self.rules[rule].name.into()));
        }

        Ok(start_index)
    }
}
