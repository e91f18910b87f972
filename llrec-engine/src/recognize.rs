use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};

use llrec_grammar::grammar::{ControlAction, Grammar, NodeId, NodeKind};
use llrec_lexer::{TargetLexer, TerminalId};

use crate::output::{LabelSlots, OutputEngine, Sink};
use crate::state::{EngineSnapshot, InputState};
use crate::SAVE_STACK_DEPTH;

#[derive(Debug)]
pub enum RecognizeError {
    UnexpectedToken { print: String, line: u32 },
    SaveStackOverflow,
    SaveStackUnderflow,
    Io(io::Error),
}

impl From<io::Error> for RecognizeError {
    fn from(e: io::Error) -> Self {
        RecognizeError::Io(e)
    }
}

impl Error for RecognizeError {}

impl Display for RecognizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RecognizeError::UnexpectedToken { print, .. } => {
                write!(f, "unexpected `{}'", print)
            }
            RecognizeError::SaveStackOverflow => write!(f, "$push: stack overflow!"),
            RecognizeError::SaveStackUnderflow => write!(f, "$pop: stack underflow!"),
            RecognizeError::Io(e) => write!(f, "output error: {}", e),
        }
    }
}

// Single-token-lookahead walk over the production tree. Recognition failure
// is a value while inside a backtracking trial and a fatal error otherwise;
// the tree itself is never mutated.
pub struct Recognizer<'g, L: TargetLexer, W: Write> {
    grammar: &'g Grammar,
    lexer: &'g mut L,
    out: OutputEngine<W>,
    curr: TerminalId,
    last: String,
    save_stack: Vec<InputState<L::Snapshot>>,
    trace: bool,
    trace_depth: u32,
    input_name: String,
}

impl<'g, L: TargetLexer, W: Write> Recognizer<'g, L, W> {
    pub fn new(
        grammar: &'g Grammar,
        lexer: &'g mut L,
        writer: W,
        trace: bool,
        input_name: &str,
    ) -> Self {
        let buffer_count = grammar.buffer_count();
        Recognizer {
            grammar,
            lexer,
            out: OutputEngine::new(writer, buffer_count),
            curr: 0,
            last: String::new(),
            save_stack: Vec::new(),
            trace,
            trace_depth: 0,
            input_name: input_name.to_string(),
        }
    }

    pub fn run(&mut self) -> Result<(), RecognizeError> {
        self.curr = self.lexer.next_token();
        if self.trace {
            self.trace_line(">> replacing", self.grammar.start())?;
            self.trace_depth = 1;
        }
        let mut labels = LabelSlots::default();
        let body = self.grammar.rule(self.grammar.start()).body;
        self.walk(body, &mut labels, false, Sink::Default)?;
        self.out.finish()?;
        Ok(())
    }

    // consume the engine, handing back the writer (used by tests)
    pub fn into_writer(self) -> W {
        self.out.into_writer()
    }

    fn trace_line(&mut self, action: &str, rule: llrec_grammar::grammar::RuleId) -> io::Result<()> {
        let name = &self.grammar.rule(rule).name;
        let line = self.lexer.line();
        let depth = self.trace_depth as usize;
        writeln!(
            self.out.writer_mut(),
            "{}{} `{}' ({}:{})",
            "--".repeat(depth),
            action,
            name,
            self.input_name,
            line
        )
    }

    fn trace_match(&mut self) -> io::Result<()> {
        let print = self.lexer.id_to_print(self.curr).to_string();
        let line = self.lexer.line();
        let depth = self.trace_depth as usize;
        writeln!(
            self.out.writer_mut(),
            "{}<< matched `{}' ({}:{})",
            "--".repeat(depth),
            print,
            self.input_name,
            line
        )
    }

    fn input_state(&self) -> InputState<L::Snapshot> {
        InputState {
            token: self.curr,
            last: self.last.clone(),
            lexer: self.lexer.snapshot(),
        }
    }

    fn restore_input(&mut self, state: &InputState<L::Snapshot>) {
        self.lexer.restore(&state.lexer);
        self.curr = state.token;
        self.last = state.last.clone();
    }

    fn save(&self) -> EngineSnapshot<L::Snapshot> {
        EngineSnapshot {
            input: self.input_state(),
            committed: self.out.committed(),
            indent: self.out.indent,
            at_line_start: self.out.at_line_start,
            label_counter: self.out.label_counter,
            outputting: self.out.outputting,
            trace_depth: self.trace_depth,
            saved_inputs: self.save_stack.len(),
        }
    }

    fn restore(&mut self, snapshot: &EngineSnapshot<L::Snapshot>) {
        self.restore_input(&snapshot.input);
        self.out.truncate(snapshot.committed);
        self.out.indent = snapshot.indent;
        self.out.at_line_start = snapshot.at_line_start;
        self.out.label_counter = snapshot.label_counter;
        self.out.outputting = snapshot.outputting;
        self.trace_depth = snapshot.trace_depth;
        self.save_stack.truncate(snapshot.saved_inputs);
    }

    fn walk(
        &mut self,
        node: NodeId,
        labels: &mut LabelSlots,
        bt: bool,
        sink: Sink,
    ) -> Result<bool, RecognizeError> {
        let grammar = self.grammar;
        match &grammar.node(node).kind {
            NodeKind::Output { ops } => {
                if !self.out.outputting {
                    return Ok(true);
                }
                self.out.run_block(ops, labels, &self.last, sink);
                if !bt && sink == Sink::Default {
                    self.out.flush()?;
                }
                Ok(true)
            }
            NodeKind::Control { action } => {
                match action {
                    ControlAction::Push => {
                        if self.save_stack.len() >= SAVE_STACK_DEPTH {
                            return Err(RecognizeError::SaveStackOverflow);
                        }
                        let state = self.input_state();
                        self.save_stack.push(state);
                    }
                    ControlAction::Pop => {
                        let state = self
                            .save_stack
                            .pop()
                            .ok_or(RecognizeError::SaveStackUnderflow)?;
                        self.restore_input(&state);
                    }
                    ControlAction::EnableOutput => self.out.outputting = true,
                    ControlAction::DisableOutput => self.out.outputting = false,
                }
                Ok(true)
            }
            NodeKind::Terminal { terminal, slot } => {
                let (terminal, slot) = (*terminal, *slot);
                if self.curr != terminal {
                    if !bt {
                        return Err(RecognizeError::UnexpectedToken {
                            print: self.lexer.id_to_print(self.curr).to_string(),
                            line: self.lexer.line(),
                        });
                    }
                    return Ok(false);
                }
                if self.trace {
                    self.trace_match()?;
                }
                self.last = self.lexer.token_text().to_string();
                if let Some(buffer) = slot {
                    self.out.set_buffer(buffer, &self.last);
                }
                self.curr = self.lexer.next_token();
                Ok(true)
            }
            NodeKind::NonTerminal { rule, capture } => {
                let (rule, capture) = (*rule, *capture);
                if self.trace {
                    self.trace_line(">> replacing", rule)?;
                }
                self.trace_depth += 1;
                let inner_sink = match capture {
                    Some(buffer) => {
                        self.out.clear_buffer(buffer);
                        Sink::Buffer(buffer)
                    }
                    None => sink,
                };
                let mut inner_labels = LabelSlots::default();
                let body = grammar.rule(rule).body;
                let result = self.walk(body, &mut inner_labels, bt, inner_sink);
                self.trace_depth -= 1;
                result
            }
            NodeKind::Choice {
                left,
                right,
                backtracking: false,
            } => {
                let (left, right) = (*left, *right);
                if grammar.node(left).first().contains(self.curr) {
                    self.walk(left, labels, bt, sink)
                } else {
                    // without validation an overlap falls through to the
                    // second arm
                    self.walk(right, labels, bt, sink)
                }
            }
            NodeKind::Choice {
                left,
                right,
                backtracking: true,
            } => {
                let (left, right) = (*left, *right);
                let snapshot = self.save();
                let mut matched = false;
                if grammar.node(left).first().contains(self.curr) {
                    matched = self.walk(left, labels, true, sink)?;
                    if !matched {
                        self.restore(&snapshot);
                    }
                }
                if !matched {
                    matched = self.walk(right, labels, bt, sink)?;
                    if !matched {
                        self.restore(&snapshot);
                    }
                }
                Ok(matched)
            }
            NodeKind::Concat { left, right } => {
                let (left, right) = (*left, *right);
                if self.walk(left, labels, bt, sink)? {
                    self.walk(right, labels, bt, sink)
                } else {
                    Ok(false)
                }
            }
            NodeKind::Repeat { inner } => {
                let inner = *inner;
                let first = grammar.node(inner).first();
                let mut matched = true;
                while matched && first.contains(self.curr) {
                    matched = self.walk(inner, labels, bt, sink)?;
                }
                Ok(matched)
            }
            NodeKind::Opt { inner } => {
                let inner = *inner;
                if grammar.node(inner).first().contains(self.curr) {
                    self.walk(inner, labels, bt, sink)
                } else {
                    Ok(true)
                }
            }
        }
    }
}
