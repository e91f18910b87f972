use llrec_lexer::TerminalId;

use crate::sets::TokenSet;

pub type RuleId = usize;
pub type NodeId = usize;
pub type BufferId = usize;

pub const MAX_RULES: usize = 256;
pub const MAX_BUFFERS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSlot {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Push,
    Pop,
    EnableOutput,
    DisableOutput,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutOp {
    Text(String),
    LastToken,
    Label(LabelSlot),
    Buffer(BufferId),
    Newline,
    Indent,
    Dedent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Terminal {
        terminal: TerminalId,
        slot: Option<BufferId>,
    },
    NonTerminal {
        rule: RuleId,
        capture: Option<BufferId>,
    },
    Choice {
        left: NodeId,
        right: NodeId,
        backtracking: bool,
    },
    Concat {
        left: NodeId,
        right: NodeId,
    },
    Repeat {
        inner: NodeId,
    },
    Opt {
        inner: NodeId,
    },
    Output {
        ops: Vec<OutOp>,
    },
    Control {
        action: ControlAction,
    },
}

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    // lazily populated by the set engine; empty means "not yet computed"
    pub(crate) first: TokenSet,
    pub(crate) follow: TokenSet,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            first: TokenSet::EMPTY,
            follow: TokenSet::EMPTY,
        }
    }

    pub fn first(&self) -> TokenSet {
        self.first
    }

    pub fn follow(&self) -> TokenSet {
        self.follow
    }
}

#[derive(Debug)]
pub struct Rule {
    pub name: String,
    pub body: NodeId,
    pub uses_lab1: bool,
    pub uses_lab2: bool,
}

#[derive(Debug)]
pub struct Grammar {
    pub(crate) nodes: Vec<Node>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) start: RuleId,
    pub(crate) buffer_names: Vec<String>,
    pub(crate) terminals: TokenSet,
    pub(crate) follows: Vec<TokenSet>,
    pub(crate) first_ready: bool,
    pub(crate) follow_ready: bool,
}

impl Grammar {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn start(&self) -> RuleId {
        self.start
    }

    pub fn buffer_count(&self) -> usize {
        self.buffer_names.len()
    }

    pub fn buffer_name(&self, id: BufferId) -> &str {
        &self.buffer_names[id]
    }

    // the terminals referenced anywhere in the grammar
    pub fn terminals(&self) -> TokenSet {
        self.terminals
    }

    // valid once the FOLLOW fixed point has run
    pub fn follow_of(&self, rule: RuleId) -> TokenSet {
        self.follows[rule]
    }
}
