//! LALR(1) table construction.
//!
//! States are built from LR(1) items whose cores are merged as soon as they
//! are discovered: a state is identified by its kernel items, and reaching
//! it again with new lookaheads only widens those lookaheads and schedules
//! the state to propagate them. The result is the LALR(1) automaton without
//! ever materializing the canonical LR(1) one.

use std::collections::{BTreeMap, VecDeque};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use super::table::{symbol_display, Action, FieldTable, ParseTable, ProductionId, ProductionInfo, StateId};
use super::{Grammar, GrammarError, Prec, RuleName, Symbol};
use crate::lexer::TokenKind;
use crate::syntax::SyntaxKind;

/// A grammar symbol after rule names have been resolved to indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Sym {
    Term(u16),
    Rule(u32),
}

/// A set of terminals, one bit per token kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub(crate) struct TerminalSet([u64; 2]);

impl TerminalSet {
    fn single(terminal: u16) -> Self {
        let mut set = Self::default();
        set.insert(terminal);
        set
    }

    fn insert(&mut self, terminal: u16) -> bool {
        let (word, bit) = (usize::from(terminal / 64), terminal % 64);
        let before = self.0[word];
        self.0[word] |= 1 << bit;
        before != self.0[word]
    }

    fn contains(self, terminal: u16) -> bool {
        let (word, bit) = (usize::from(terminal / 64), terminal % 64);
        self.0[word] & (1 << bit) != 0
    }

    fn union_with(&mut self, other: Self) -> bool {
        let before = self.0;
        self.0[0] |= other.0[0];
        self.0[1] |= other.0[1];
        before != self.0
    }

    fn iter(self) -> impl Iterator<Item = u16> {
        (0..128u16).filter(move |&t| self.contains(t))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Production {
    pub(crate) lhs: usize,
    pub(crate) rhs: Vec<Sym>,
    pub(crate) node: Option<SyntaxKind>,
    pub(crate) prec: Option<Prec>,
}

/// The grammar with names resolved and the start rule augmented.
///
/// Rule indices follow declaration order; the augmented `$accept` rule comes
/// last. Production 0 is `$accept -> start`, the rest follow rule and
/// alternative declaration order so that "earlier production" means
/// "declared earlier".
pub(crate) struct Lowered {
    name: &'static str,
    rule_names: Vec<RuleName>,
    index: FxHashMap<RuleName, usize>,
    productions: Vec<Production>,
    rule_productions: Vec<Vec<usize>>,
    token_prec: Vec<Option<Prec>>,
    conflicts: Vec<Vec<usize>>,
    root_kind: SyntaxKind,
    recovery: Option<TokenKind>,
}

impl Lowered {
    pub(crate) fn new(grammar: &Grammar, start: usize) -> Self {
        let mut rule_names: Vec<RuleName> = grammar.rules.iter().map(|r| r.name).collect();
        let index: FxHashMap<RuleName, usize> =
            rule_names.iter().enumerate().map(|(i, name)| (*name, i)).collect();
        let accept = rule_names.len();
        rule_names.push("$accept");

        let resolve = |symbol: Symbol| match symbol {
            Symbol::Token(kind) => Sym::Term(kind as u16),
            Symbol::Rule(name) => Sym::Rule(index[name] as u32),
        };

        let mut productions = vec![Production {
            lhs: accept,
            rhs: vec![Sym::Rule(start as u32)],
            node: None,
            prec: None,
        }];
        let mut rule_productions = vec![Vec::new(); rule_names.len()];
        rule_productions[accept].push(0);

        for (lhs, rule) in grammar.rules.iter().enumerate() {
            for alternative in &rule.alternatives {
                // The root node is built by the engine once input is accepted.
                let node = if lhs == start {
                    None
                } else {
                    alternative.node.or(rule.kind)
                };
                rule_productions[lhs].push(productions.len());
                productions.push(Production {
                    lhs,
                    rhs: alternative.slots.iter().map(|slot| resolve(slot.symbol)).collect(),
                    node,
                    prec: alternative.prec,
                });
            }
        }

        let mut token_prec = vec![None; TokenKind::COUNT];
        for &(token, prec) in &grammar.token_precs {
            token_prec[token as usize] = Some(prec);
        }

        let conflicts = grammar
            .conflicts
            .iter()
            .map(|set| set.iter().filter_map(|name| index.get(name).copied()).collect())
            .collect();

        Self {
            name: grammar.name,
            rule_names,
            index,
            productions,
            rule_productions,
            token_prec,
            conflicts,
            root_kind: grammar.rules[start].kind.unwrap_or(SyntaxKind::SourceFile),
            recovery: grammar.recovery,
        }
    }

    pub(crate) fn rule_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub(crate) fn rule_name(&self, rule: usize) -> &'static str {
        self.rule_names.get(rule).copied().unwrap_or("?")
    }

    fn display(&self, production: usize) -> String {
        let production = &self.productions[production];
        let mut out = format!("{} ->", self.rule_name(production.lhs));
        if production.rhs.is_empty() {
            out.push_str(" <empty>");
        }
        for &symbol in &production.rhs {
            out.push(' ');
            out.push_str(&symbol_display(self, symbol));
        }
        out
    }

    /// Explicit precedence, or that of the last token that has one.
    fn production_prec(&self, production: usize) -> Option<Prec> {
        let production = &self.productions[production];
        production.prec.or_else(|| {
            production.rhs.iter().rev().find_map(|symbol| match symbol {
                Sym::Term(t) => self.token_prec[*t as usize],
                Sym::Rule(_) => None,
            })
        })
    }

    fn conflict_allowed(&self, productions: &[usize]) -> bool {
        self.conflicts.iter().any(|set| {
            productions
                .iter()
                .all(|&p| set.contains(&self.productions[p].lhs))
        })
    }
}

struct FirstSets {
    nullable: Vec<bool>,
    first: Vec<TerminalSet>,
}

impl FirstSets {
    fn compute(lowered: &Lowered) -> Self {
        let rules = lowered.rule_names.len();
        let mut sets = Self {
            nullable: vec![false; rules],
            first: vec![TerminalSet::default(); rules],
        };

        let mut changed = true;
        while changed {
            changed = false;
            for production in &lowered.productions {
                let mut all_nullable = true;
                for &symbol in &production.rhs {
                    match symbol {
                        Sym::Term(t) => {
                            changed |= sets.first[production.lhs].insert(t);
                            all_nullable = false;
                        }
                        Sym::Rule(r) => {
                            let first = sets.first[r as usize];
                            changed |= sets.first[production.lhs].union_with(first);
                            if !sets.nullable[r as usize] {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !sets.nullable[production.lhs] {
                    sets.nullable[production.lhs] = true;
                    changed = true;
                }
            }
        }

        sets
    }

    /// FIRST of `symbols` followed by `follow`.
    fn of(&self, symbols: &[Sym], follow: TerminalSet) -> TerminalSet {
        let mut out = TerminalSet::default();
        for &symbol in symbols {
            match symbol {
                Sym::Term(t) => {
                    out.insert(t);
                    return out;
                }
                Sym::Rule(r) => {
                    out.union_with(self.first[r as usize]);
                    if !self.nullable[r as usize] {
                        return out;
                    }
                }
            }
        }
        out.union_with(follow);
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Item {
    production: u32,
    dot: u32,
}

struct State {
    kernel: Vec<Item>,
    lookaheads: Vec<TerminalSet>,
    transitions: Vec<(Sym, StateId)>,
}

struct Builder<'a> {
    lowered: &'a Lowered,
    first: FirstSets,
    states: Vec<State>,
}

impl Builder<'_> {
    fn next_symbol(&self, item: Item) -> Option<Sym> {
        self.lowered.productions[item.production as usize]
            .rhs
            .get(item.dot as usize)
            .copied()
    }

    fn closure(&self, state: &State) -> Vec<(Item, TerminalSet)> {
        let mut items: Vec<(Item, TerminalSet)> = state
            .kernel
            .iter()
            .copied()
            .zip(state.lookaheads.iter().copied())
            .collect();
        let mut index: FxHashMap<Item, usize> =
            items.iter().enumerate().map(|(i, (item, _))| (*item, i)).collect();
        let mut work: Vec<usize> = (0..items.len()).collect();

        while let Some(i) = work.pop() {
            let (item, lookahead) = items[i];
            let Some(Sym::Rule(rule)) = self.next_symbol(item) else {
                continue;
            };
            let rest = &self.lowered.productions[item.production as usize].rhs[item.dot as usize + 1..];
            let follow = self.first.of(rest, lookahead);

            for &production in &self.lowered.rule_productions[rule as usize] {
                let candidate = Item {
                    production: production as u32,
                    dot: 0,
                };
                match index.get(&candidate) {
                    Some(&j) => {
                        if items[j].1.union_with(follow) {
                            work.push(j);
                        }
                    }
                    None => {
                        index.insert(candidate, items.len());
                        items.push((candidate, follow));
                        work.push(items.len() - 1);
                    }
                }
            }
        }

        items
    }

    fn build_states(&mut self) {
        let eof = TokenKind::Eof as u16;
        self.states.push(State {
            kernel: vec![Item { production: 0, dot: 0 }],
            lookaheads: vec![TerminalSet::single(eof)],
            transitions: Vec::new(),
        });

        let mut cores: FxHashMap<Vec<Item>, StateId> = FxHashMap::default();
        cores.insert(vec![Item { production: 0, dot: 0 }], 0);
        let mut queue: VecDeque<StateId> = VecDeque::from([0]);
        let mut queued = vec![true];

        while let Some(state) = queue.pop_front() {
            queued[state as usize] = false;
            let items = self.closure(&self.states[state as usize]);

            let mut groups: BTreeMap<Sym, Vec<(Item, TerminalSet)>> = BTreeMap::new();
            for (item, lookahead) in items {
                if let Some(symbol) = self.next_symbol(item) {
                    let advanced = Item {
                        production: item.production,
                        dot: item.dot + 1,
                    };
                    groups.entry(symbol).or_default().push((advanced, lookahead));
                }
            }

            let mut transitions = Vec::with_capacity(groups.len());
            for (symbol, mut kernel) in groups {
                kernel.sort_by_key(|(item, _)| *item);
                let core: Vec<Item> = kernel.iter().map(|(item, _)| *item).collect();

                let target = if let Some(&target) = cores.get(&core) {
                    let mut changed = false;
                    let lookaheads = &mut self.states[target as usize].lookaheads;
                    for (slot, (_, lookahead)) in lookaheads.iter_mut().zip(&kernel) {
                        changed |= slot.union_with(*lookahead);
                    }
                    if changed && !queued[target as usize] {
                        queued[target as usize] = true;
                        queue.push_back(target);
                    }
                    target
                } else {
                    let target = self.states.len() as StateId;
                    self.states.push(State {
                        kernel: core.clone(),
                        lookaheads: kernel.iter().map(|(_, lookahead)| *lookahead).collect(),
                        transitions: Vec::new(),
                    });
                    cores.insert(core, target);
                    queued.push(true);
                    queue.push_back(target);
                    target
                };
                transitions.push((symbol, target));
            }
            self.states[state as usize].transitions = transitions;
        }
    }

    fn conflict(&self, state: usize, terminal: u16, shift: bool, reduces: &[usize]) -> GrammarError {
        let mut candidates = Vec::new();
        if shift {
            candidates.push("shift".to_string());
        }
        candidates.extend(reduces.iter().map(|&p| self.lowered.display(p)));
        GrammarError::Conflict {
            state,
            lookahead: SmolStr::new(symbol_display(self.lowered, Sym::Term(terminal))),
            candidates,
        }
    }

    fn resolve(&self, state: usize, terminal: u16, shift: Option<StateId>, reduces: &[usize]) -> Result<Action, GrammarError> {
        let reduce = match reduces {
            [] => None,
            [production] => Some(*production),
            many => {
                if !self.lowered.conflict_allowed(many) {
                    return Err(self.conflict(state, terminal, shift.is_some(), many));
                }
                many.iter().min().copied()
            }
        };

        Ok(match (shift, reduce) {
            (None, None) => Action::Error,
            (Some(target), None) => Action::Shift(target),
            (None, Some(production)) => Action::Reduce(production as ProductionId),
            (Some(target), Some(production)) => {
                let production_prec = self.lowered.production_prec(production);
                let token_prec = self.lowered.token_prec[terminal as usize];
                match (production_prec, token_prec) {
                    (Some(p), Some(t)) if p.level > t.level => Action::Reduce(production as ProductionId),
                    (Some(p), Some(t)) if p.level < t.level => Action::Shift(target),
                    (Some(p), Some(_)) => match p.assoc {
                        super::Assoc::Left => Action::Reduce(production as ProductionId),
                        super::Assoc::Right => Action::Shift(target),
                        super::Assoc::NonAssoc => Action::Error,
                    },
                    _ if self.lowered.conflict_allowed(&[production]) => Action::Shift(target),
                    _ => return Err(self.conflict(state, terminal, true, &[production])),
                }
            }
        })
    }
}

/// Builds the LALR(1) tables for `lowered`.
pub(crate) fn build(lowered: &Lowered, fields: FieldTable) -> Result<ParseTable, GrammarError> {
    let mut builder = Builder {
        lowered,
        first: FirstSets::compute(lowered),
        states: Vec::new(),
    };
    builder.build_states();

    let terminals = TokenKind::COUNT;
    let rules = lowered.rule_names.len();
    let state_count = builder.states.len();
    let eof = TokenKind::Eof as u16;

    let mut actions = vec![Action::Error; state_count * terminals];
    let mut gotos = vec![None; state_count * rules];
    let mut default_reductions = vec![None; state_count];

    for (state_index, state) in builder.states.iter().enumerate() {
        let mut shifts: Vec<Option<StateId>> = vec![None; terminals];
        for &(symbol, target) in &state.transitions {
            match symbol {
                Sym::Term(t) => shifts[t as usize] = Some(target),
                Sym::Rule(r) => gotos[state_index * rules + r as usize] = Some(target),
            }
        }

        let mut reduces: Vec<Vec<usize>> = vec![Vec::new(); terminals];
        let mut accepts = false;
        for (item, lookahead) in builder.closure(state) {
            let production = &lowered.productions[item.production as usize];
            if item.dot as usize != production.rhs.len() {
                continue;
            }
            if item.production == 0 {
                accepts |= lookahead.contains(eof);
                continue;
            }
            for terminal in lookahead.iter() {
                reduces[terminal as usize].push(item.production as usize);
            }
        }

        for terminal in 0..terminals {
            let action = if accepts && terminal == eof as usize {
                Action::Accept
            } else {
                builder.resolve(state_index, terminal as u16, shifts[terminal], &reduces[terminal])?
            };
            actions[state_index * terminals + terminal] = action;
        }

        let row = &actions[state_index * terminals..(state_index + 1) * terminals];
        let recovers = lowered
            .recovery
            .is_some_and(|token| matches!(row[token as usize], Action::Shift(_)));
        if !recovers {
            let mut counts: BTreeMap<ProductionId, usize> = BTreeMap::new();
            for action in row {
                if let Action::Reduce(production) = action {
                    *counts.entry(*production).or_default() += 1;
                }
            }
            default_reductions[state_index] = counts
                .into_iter()
                .max_by(|(pa, ca), (pb, cb)| ca.cmp(cb).then(pb.cmp(pa)))
                .map(|(production, _)| production);
        }
    }

    let productions = (0..lowered.productions.len())
        .map(|p| {
            let production = &lowered.productions[p];
            ProductionInfo {
                lhs: production.lhs as u32,
                len: production.rhs.len(),
                node: production.node,
                display: lowered.display(p),
            }
        })
        .collect();

    debug!(
        grammar = lowered.name,
        states = state_count,
        productions = lowered.productions.len(),
        "compiled parse table"
    );

    Ok(ParseTable {
        name: lowered.name,
        state_count,
        actions,
        gotos,
        default_reductions,
        productions,
        rule_names: lowered.rule_names.clone(),
        root_kind: lowered.root_kind,
        recovery: lowered.recovery,
        fields,
    })
}
