use std::ops::{BitAnd, BitOr, BitOrAssign};

use llrec_lexer::{TerminalId, MAX_TERMINALS};

use crate::grammar::{Grammar, NodeId, NodeKind, RuleId};

// 64-bit token set: one bit per terminal id, bit 63 is the empty marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenSet(u64);

impl TokenSet {
    pub const EMPTY: TokenSet = TokenSet(0);
    pub const EPSILON: TokenSet = TokenSet(1 << 63);

    pub fn terminal(t: TerminalId) -> TokenSet {
        TokenSet(1 << t)
    }

    pub fn insert(&mut self, t: TerminalId) {
        self.0 |= 1 << t;
    }

    pub fn contains(&self, t: TerminalId) -> bool {
        self.0 & (1 << t) != 0
    }

    pub fn has_epsilon(&self) -> bool {
        self.0 & Self::EPSILON.0 != 0
    }

    pub fn without_epsilon(self) -> TokenSet {
        TokenSet(self.0 & !Self::EPSILON.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn terminals(self) -> impl Iterator<Item = TerminalId> {
        (0..MAX_TERMINALS as TerminalId).filter(move |t| self.contains(*t))
    }
}

impl BitOr for TokenSet {
    type Output = TokenSet;

    fn bitor(self, rhs: TokenSet) -> TokenSet {
        TokenSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for TokenSet {
    fn bitor_assign(&mut self, rhs: TokenSet) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TokenSet {
    type Output = TokenSet;

    fn bitand(self, rhs: TokenSet) -> TokenSet {
        TokenSet(self.0 & rhs.0)
    }
}

// the shape of a node, detached from the arena so set computations can
// recurse while holding the grammar mutably
enum Step {
    Terminal(TerminalId),
    Rule(RuleId),
    Choice(NodeId, NodeId),
    Concat(NodeId, NodeId),
    Loop(NodeId),
    Opt(NodeId),
    Silent,
}

fn step_of(grammar: &Grammar, node: NodeId) -> Step {
    match &grammar.nodes[node].kind {
        NodeKind::Terminal { terminal, .. } => Step::Terminal(*terminal),
        NodeKind::NonTerminal { rule, .. } => Step::Rule(*rule),
        NodeKind::Choice { left, right, .. } => Step::Choice(*left, *right),
        NodeKind::Concat { left, right } => Step::Concat(*left, *right),
        NodeKind::Repeat { inner } => Step::Loop(*inner),
        NodeKind::Opt { inner } => Step::Opt(*inner),
        NodeKind::Output { .. } | NodeKind::Control { .. } => Step::Silent,
    }
}

pub(crate) fn first_of(grammar: &mut Grammar, node: NodeId) -> TokenSet {
    let cached = grammar.nodes[node].first;
    if cached != TokenSet::EMPTY {
        return cached;
    }
    let first = match step_of(grammar, node) {
        Step::Terminal(t) => TokenSet::terminal(t),
        Step::Rule(r) => {
            let body = grammar.rules[r].body;
            first_of(grammar, body)
        }
        Step::Choice(left, right) => first_of(grammar, left) | first_of(grammar, right),
        Step::Concat(left, right) => {
            let left_first = first_of(grammar, left);
            if left_first.has_epsilon() {
                left_first.without_epsilon() | first_of(grammar, right)
            } else {
                left_first
            }
        }
        Step::Loop(inner) | Step::Opt(inner) => first_of(grammar, inner) | TokenSet::EPSILON,
        Step::Silent => TokenSet::EPSILON,
    };
    grammar.nodes[node].first = first;
    first
}

pub fn compute_first_sets(grammar: &mut Grammar) {
    if grammar.first_ready {
        return;
    }
    for rule in 0..grammar.rules.len() {
        let body = grammar.rules[rule].body;
        first_of(grammar, body);
        annotate_first(grammar, body);
    }
    grammar.first_ready = true;
}

// fill the caches of interior nodes that the top-down memoization skipped
fn annotate_first(grammar: &mut Grammar, node: NodeId) {
    first_of(grammar, node);
    match step_of(grammar, node) {
        Step::Choice(left, right) | Step::Concat(left, right) => {
            annotate_first(grammar, left);
            annotate_first(grammar, right);
        }
        Step::Loop(inner) | Step::Opt(inner) => annotate_first(grammar, inner),
        _ => {}
    }
}

fn propagate_follow(grammar: &mut Grammar, node: NodeId, inherited: TokenSet, changed: &mut bool) {
    match step_of(grammar, node) {
        Step::Terminal(_) | Step::Silent => {}
        Step::Rule(r) => {
            // FOLLOW sets hold real terminals only
            let merged = grammar.follows[r] | inherited.without_epsilon();
            if merged != grammar.follows[r] {
                grammar.follows[r] = merged;
                *changed = true;
            }
        }
        Step::Choice(left, right) => {
            propagate_follow(grammar, left, inherited, changed);
            propagate_follow(grammar, right, inherited, changed);
        }
        Step::Concat(left, right) => {
            let right_first = first_of(grammar, right);
            let left_context = if right_first.has_epsilon() {
                right_first.without_epsilon() | inherited
            } else {
                right_first
            };
            propagate_follow(grammar, left, left_context, changed);
            propagate_follow(grammar, right, inherited, changed);
        }
        Step::Loop(inner) => {
            let context = first_of(grammar, node) | inherited;
            propagate_follow(grammar, inner, context, changed);
        }
        Step::Opt(inner) => propagate_follow(grammar, inner, inherited, changed),
    }
    grammar.nodes[node].follow = inherited;
}

// fixed point over all rules, seeded with EOF after the start symbol
pub fn compute_follow_sets(grammar: &mut Grammar, eof: TerminalId) {
    if grammar.follow_ready {
        return;
    }
    compute_first_sets(grammar);
    grammar.follows[grammar.start] |= TokenSet::terminal(eof);
    let mut changed = true;
    while changed {
        changed = false;
        for rule in 0..grammar.rules.len() {
            let body = grammar.rules[rule].body;
            let inherited = grammar.follows[rule];
            propagate_follow(grammar, body, inherited, &mut changed);
        }
    }
    grammar.follow_ready = true;
}
