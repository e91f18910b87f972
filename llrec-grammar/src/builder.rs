use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use llrec_input::{Expr, GrammarFile, OutExpr, RuleDecl, Spanned};
use llrec_lexer::{TargetLexer, MAX_TERMINALS};

use crate::grammar::{
    BufferId, ControlAction, Grammar, LabelSlot, Node, NodeId, NodeKind, OutOp, Rule, RuleId,
    MAX_BUFFERS, MAX_RULES,
};
use crate::registry::{RegistryError, RuleRegistry};
use crate::sets::TokenSet;

#[derive(Debug, PartialEq)]
pub enum BuildError<'src> {
    TooManyRules { site: &'src str },
    TooManyTerminals { site: &'src str },
    TooManyBuffers { site: &'src str },
    RuleRedefined { name: &'src str, site: &'src str },
    UndefinedRules { names: Vec<String> },
    MultipleStartSymbols { site: &'src str },
    NoStartSymbol,
    UnknownTokenName { name: &'src str, site: &'src str },
    UnknownTokenLiteral { spelling: String, site: &'src str },
    UnknownAction { name: &'src str, site: &'src str },
    UndefinedBuffer { name: &'src str, site: &'src str },
    BufferRedefined { name: &'src str, site: &'src str },
    SlotReused { name: &'src str, site: &'src str },
    BadLabelNumber { site: &'src str },
}

impl<'src> BuildError<'src> {
    // the source text the diagnostic should point at, if any
    pub fn site(&self) -> Option<&'src str> {
        match self {
            BuildError::TooManyRules { site }
            | BuildError::TooManyTerminals { site }
            | BuildError::TooManyBuffers { site }
            | BuildError::RuleRedefined { site, .. }
            | BuildError::MultipleStartSymbols { site }
            | BuildError::UnknownTokenName { site, .. }
            | BuildError::UnknownTokenLiteral { site, .. }
            | BuildError::UnknownAction { site, .. }
            | BuildError::UndefinedBuffer { site, .. }
            | BuildError::BufferRedefined { site, .. }
            | BuildError::SlotReused { site, .. }
            | BuildError::BadLabelNumber { site } => Some(site),
            BuildError::UndefinedRules { .. } | BuildError::NoStartSymbol => None,
        }
    }
}

impl<'src> Error for BuildError<'src> {}

impl<'src> Display for BuildError<'src> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::TooManyRules { .. } => {
                write!(f, "too many rules (max: {})", MAX_RULES)
            }
            BuildError::TooManyTerminals { .. } => {
                write!(f, "too many terminals (max: {})", MAX_TERMINALS)
            }
            BuildError::TooManyBuffers { .. } => {
                write!(f, "too many named buffers (max: {})", MAX_BUFFERS)
            }
            BuildError::RuleRedefined { name, .. } => write!(f, "rule `{}' redefined", name),
            BuildError::UndefinedRules { names } => {
                let list: Vec<String> = names.iter().map(|n| format!("`{}'", n)).collect();
                write!(
                    f,
                    "the grammar contains the following undefined symbols: {}",
                    list.join(", ")
                )
            }
            BuildError::MultipleStartSymbols { .. } => write!(f, "more than one start symbol"),
            BuildError::NoStartSymbol => write!(f, "start symbol not defined"),
            BuildError::UnknownTokenName { name, .. } => {
                write!(f, "unknown token name `{}'", name)
            }
            BuildError::UnknownTokenLiteral { spelling, .. } => {
                write!(f, "unknown token spelling `{}'", spelling)
            }
            BuildError::UnknownAction { name, .. } => write!(f, "unknown action `{}'", name),
            BuildError::UndefinedBuffer { name, .. } => write!(f, "undefined buffer `{}'", name),
            BuildError::BufferRedefined { name, .. } => {
                write!(f, "buffer `{}' redefined in the same rule", name)
            }
            BuildError::SlotReused { name, .. } => {
                write!(f, "token slot `{}' re-used in the same rule", name)
            }
            BuildError::BadLabelNumber { .. } => write!(f, "`1' or `2' expected after `*'"),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum BufferRole {
    Capture,
    Slot,
}

pub struct GrammarBuilder<'src, 'lex, L: TargetLexer> {
    lexer: &'lex mut L,
    registry: RuleRegistry,
    nodes: Vec<Node>,
    buffer_names: Vec<String>,
    terminals: TokenSet,
    label_usage: BTreeMap<RuleId, (bool, bool)>,
    // state scoped to the rule currently being lowered
    rule_buffers: BTreeMap<&'src str, (BufferId, BufferRole)>,
    uses_lab1: bool,
    uses_lab2: bool,
}

pub fn build<'src, L: TargetLexer>(
    file: &GrammarFile<'src>,
    lexer: &mut L,
) -> Result<Grammar, BuildError<'src>> {
    let mut builder = GrammarBuilder {
        lexer,
        registry: RuleRegistry::new(),
        nodes: Vec::new(),
        buffer_names: Vec::new(),
        terminals: TokenSet::EMPTY,
        label_usage: BTreeMap::new(),
        rule_buffers: BTreeMap::new(),
        uses_lab1: false,
        uses_lab2: false,
    };
    for decl in &file.rules {
        builder.add_rule(decl)?;
    }
    builder.finish()
}

impl<'src, 'lex, L: TargetLexer> GrammarBuilder<'src, 'lex, L> {
    fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(kind));
        id
    }

    fn add_rule(&mut self, decl: &RuleDecl<'src>) -> Result<(), BuildError<'src>> {
        self.rule_buffers.clear();
        self.uses_lab1 = false;
        self.uses_lab2 = false;
        let body = self.lower(&decl.body)?;
        let id = self
            .registry
            .lookup(decl.name.inner, Some(body))
            .map_err(|e| match e {
                RegistryError::Redefined => BuildError::RuleRedefined {
                    name: decl.name.inner,
                    site: decl.name.site,
                },
                _ => BuildError::TooManyRules {
                    site: decl.name.site,
                },
            })?;
        if decl.is_start {
            self.registry.set_start(id).map_err(|_| {
                BuildError::MultipleStartSymbols {
                    site: decl.name.site,
                }
            })?;
        }
        let usage = self.label_usage.entry(id).or_insert((false, false));
        usage.0 |= self.uses_lab1;
        usage.1 |= self.uses_lab2;
        Ok(())
    }

    fn resolve_terminal(
        &mut self,
        id: Option<llrec_lexer::TerminalId>,
        missing: BuildError<'src>,
        site: &'src str,
    ) -> Result<llrec_lexer::TerminalId, BuildError<'src>> {
        let id = id.ok_or(missing)?;
        if id as usize >= MAX_TERMINALS {
            return Err(BuildError::TooManyTerminals { site });
        }
        self.terminals.insert(id);
        Ok(id)
    }

    fn define_buffer(
        &mut self,
        name: &Spanned<'src, &'src str>,
        role: BufferRole,
    ) -> Result<BufferId, BuildError<'src>> {
        if self.rule_buffers.contains_key(name.inner) {
            return Err(match role {
                BufferRole::Capture => BuildError::BufferRedefined {
                    name: name.inner,
                    site: name.site,
                },
                BufferRole::Slot => BuildError::SlotReused {
                    name: name.inner,
                    site: name.site,
                },
            });
        }
        if self.buffer_names.len() >= MAX_BUFFERS {
            return Err(BuildError::TooManyBuffers { site: name.site });
        }
        let id = self.buffer_names.len();
        self.buffer_names.push(name.inner.to_string());
        self.rule_buffers.insert(name.inner, (id, role));
        Ok(id)
    }

    fn lower(&mut self, expr: &Expr<'src>) -> Result<NodeId, BuildError<'src>> {
        match expr {
            Expr::RuleRef { name, capture } => {
                let rule = self
                    .registry
                    .lookup(name.inner, None)
                    .map_err(|_| BuildError::TooManyRules { site: name.site })?;
                let capture = match capture {
                    Some(buf) => Some(self.define_buffer(buf, BufferRole::Capture)?),
                    None => None,
                };
                Ok(self.add_node(NodeKind::NonTerminal { rule, capture }))
            }
            Expr::TokenName { name, slot } => {
                let id = self.lexer.name_to_id(name.inner);
                let terminal = self.resolve_terminal(
                    id,
                    BuildError::UnknownTokenName {
                        name: name.inner,
                        site: name.site,
                    },
                    name.site,
                )?;
                let slot = match slot {
                    Some(buf) => Some(self.define_buffer(buf, BufferRole::Slot)?),
                    None => None,
                };
                Ok(self.add_node(NodeKind::Terminal { terminal, slot }))
            }
            Expr::TokenLiteral { spelling, slot } => {
                let id = self.lexer.literal_to_id(&spelling.inner);
                let terminal = self.resolve_terminal(
                    id,
                    BuildError::UnknownTokenLiteral {
                        spelling: spelling.inner.clone(),
                        site: spelling.site,
                    },
                    spelling.site,
                )?;
                let slot = match slot {
                    Some(buf) => Some(self.define_buffer(buf, BufferRole::Slot)?),
                    None => None,
                };
                Ok(self.add_node(NodeKind::Terminal { terminal, slot }))
            }
            Expr::Alternation { arms, backtracking } => {
                let mut iter = arms.iter();
                // arms.len() >= 2 by construction
                let mut acc = self.lower(iter.next().expect("empty alternation"))?;
                for arm in iter {
                    let right = self.lower(arm)?;
                    acc = self.add_node(NodeKind::Choice {
                        left: acc,
                        right,
                        backtracking: *backtracking,
                    });
                }
                Ok(acc)
            }
            Expr::Sequence { elements } => {
                let mut iter = elements.iter();
                let mut acc = self.lower(iter.next().expect("empty sequence"))?;
                for element in iter {
                    let right = self.lower(element)?;
                    acc = self.add_node(NodeKind::Concat { left: acc, right });
                }
                Ok(acc)
            }
            Expr::Repetition { inner } => {
                let inner = self.lower(inner)?;
                Ok(self.add_node(NodeKind::Repeat { inner }))
            }
            Expr::Optional { inner } => {
                let inner = self.lower(inner)?;
                Ok(self.add_node(NodeKind::Opt { inner }))
            }
            Expr::Output { directives } => {
                let mut ops = Vec::with_capacity(directives.len());
                for directive in directives {
                    ops.push(self.lower_directive(directive)?);
                }
                Ok(self.add_node(NodeKind::Output { ops }))
            }
            Expr::Control { action } => {
                let action_kind = match action.inner {
                    "push" => ControlAction::Push,
                    "pop" => ControlAction::Pop,
                    "eout" => ControlAction::EnableOutput,
                    "dout" => ControlAction::DisableOutput,
                    other => {
                        return Err(BuildError::UnknownAction {
                            name: other,
                            site: action.site,
                        })
                    }
                };
                Ok(self.add_node(NodeKind::Control {
                    action: action_kind,
                }))
            }
        }
    }

    fn lower_directive(
        &mut self,
        directive: &Spanned<'src, OutExpr<'src>>,
    ) -> Result<OutOp, BuildError<'src>> {
        Ok(match &directive.inner {
            OutExpr::Verbatim(text) => OutOp::Text(text.clone()),
            OutExpr::LastToken => OutOp::LastToken,
            OutExpr::Label(1) => {
                self.uses_lab1 = true;
                OutOp::Label(LabelSlot::One)
            }
            OutExpr::Label(2) => {
                self.uses_lab2 = true;
                OutOp::Label(LabelSlot::Two)
            }
            OutExpr::Label(_) => {
                return Err(BuildError::BadLabelNumber {
                    site: directive.site,
                })
            }
            OutExpr::BufferRef(name) => {
                let (id, _) =
                    self.rule_buffers
                        .get(name)
                        .ok_or(BuildError::UndefinedBuffer {
                            name: *name,
                            site: directive.site,
                        })?;
                OutOp::Buffer(*id)
            }
            OutExpr::Newline => OutOp::Newline,
            OutExpr::Indent => OutOp::Indent,
            OutExpr::Dedent => OutOp::Dedent,
        })
    }

    fn finish(self) -> Result<Grammar, BuildError<'src>> {
        let start = self.registry.start().ok_or(BuildError::NoStartSymbol)?;
        let undefined = self.registry.undefined_names();
        if !undefined.is_empty() {
            return Err(BuildError::UndefinedRules { names: undefined });
        }
        let rule_count = self.registry.len();
        let mut rules = Vec::with_capacity(rule_count);
        for id in 0..rule_count {
            let (uses_lab1, uses_lab2) =
                self.label_usage.get(&id).copied().unwrap_or((false, false));
            rules.push(Rule {
                name: self.registry.name(id).to_string(),
                body: self.registry.body(id).expect("undefined rule survived"),
                uses_lab1,
                uses_lab2,
            });
        }
        Ok(Grammar {
            nodes: self.nodes,
            rules,
            start,
            buffer_names: self.buffer_names,
            terminals: self.terminals,
            follows: vec![TokenSet::EMPTY; rule_count],
            first_ready: false,
            follow_ready: false,
        })
    }
}
