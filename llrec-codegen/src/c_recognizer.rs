use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};

use llrec_grammar::grammar::{Grammar, LabelSlot, NodeId, NodeKind, OutOp, RuleId};
use llrec_grammar::sets::TokenSet;
use llrec_lexer::TargetLexer;

use crate::templating::{Substitutions, Template};

#[derive(Debug)]
pub enum GenError {
    Unsupported { construct: &'static str },
    Io(io::Error),
}

impl From<io::Error> for GenError {
    fn from(e: io::Error) -> Self {
        GenError::Io(e)
    }
}

impl Error for GenError {}

impl Display for GenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Unsupported { construct } => {
                write!(f, "not implemented: -g and {}", construct)
            }
            GenError::Io(e) => write!(f, "write failed: {}", e),
        }
    }
}

// constructs the interpreter accepts but the generator cannot lower
fn reject_unsupported(grammar: &Grammar, node: NodeId) -> Result<(), GenError> {
    match &grammar.node(node).kind {
        NodeKind::Terminal { slot: Some(_), .. } => Err(GenError::Unsupported {
            construct: ">$buffer",
        }),
        NodeKind::Terminal { .. } => Ok(()),
        NodeKind::NonTerminal {
            capture: Some(_), ..
        } => Err(GenError::Unsupported {
            construct: ">$buffer",
        }),
        NodeKind::NonTerminal { .. } => Ok(()),
        NodeKind::Choice {
            backtracking: true, ..
        } => Err(GenError::Unsupported {
            construct: "[[...]]",
        }),
        NodeKind::Choice { left, right, .. } | NodeKind::Concat { left, right } => {
            let (left, right) = (*left, *right);
            reject_unsupported(grammar, left)?;
            reject_unsupported(grammar, right)
        }
        NodeKind::Repeat { inner } | NodeKind::Opt { inner } => {
            reject_unsupported(grammar, *inner)
        }
        NodeKind::Output { ops } => {
            if ops.iter().any(|op| matches!(op, OutOp::Buffer(_))) {
                Err(GenError::Unsupported {
                    construct: ">$buffer",
                })
            } else {
                Ok(())
            }
        }
        NodeKind::Control { .. } => Err(GenError::Unsupported {
            construct: "$action",
        }),
    }
}

struct CodeWriter<'a, L: TargetLexer> {
    grammar: &'a Grammar,
    lexer: &'a L,
}

fn pad(out: &mut dyn Write, indent: usize) -> io::Result<()> {
    for _ in 0..indent {
        write!(out, "    ")?;
    }
    Ok(())
}

fn escape_c(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl<'a, L: TargetLexer> CodeWriter<'a, L> {
    fn write_token_defines(&self, out: &mut dyn Write) -> io::Result<()> {
        for terminal in self.grammar.terminals().terminals() {
            writeln!(
                out,
                "#define T_{} {}",
                self.lexer.id_to_name(terminal),
                terminal
            )?;
        }
        Ok(())
    }

    fn write_forward_declarations(&self, out: &mut dyn Write) -> io::Result<()> {
        for rule in self.grammar.rules() {
            writeln!(out, "static void {}(void);", rule.name)?;
        }
        Ok(())
    }

    fn write_keyword_registration(&self, out: &mut dyn Write) -> io::Result<()> {
        for keyword in self.lexer.keywords() {
            writeln!(out, "    lex_keyword(\"{}\");", keyword)?;
        }
        Ok(())
    }

    fn write_start_call(&self, out: &mut dyn Write) -> io::Result<()> {
        write!(
            out,
            "{}();",
            self.grammar.rule(self.grammar.start()).name
        )
    }

    // the FIRST test as a disjunction in terminal-id order
    fn write_first_test(&self, set: TokenSet, out: &mut dyn Write) -> io::Result<()> {
        let mut first = true;
        for terminal in set.terminals() {
            if !first {
                write!(out, " || ")?;
            }
            write!(out, "LA(T_{})", self.lexer.id_to_name(terminal))?;
            first = false;
        }
        Ok(())
    }

    fn rule_first(&self, rule: RuleId) -> TokenSet {
        self.grammar.node(self.grammar.rule(rule).body).first()
    }

    fn write_rule_functions(&self, out: &mut dyn Write) -> io::Result<()> {
        for rule in self.grammar.rules() {
            writeln!(out, "void {}(void) {{", rule.name)?;
            match (rule.uses_lab1, rule.uses_lab2) {
                (true, true) => writeln!(out, "    int lab1 = -1, lab2 = -1;")?,
                (true, false) => writeln!(out, "    int lab1 = -1;")?,
                (false, true) => writeln!(out, "    int lab2 = -1;")?,
                (false, false) => {}
            }
            self.write_node(rule.body, false, false, 1, out)?;
            writeln!(out, "\n}}")?;
        }
        Ok(())
    }

    fn write_output_block(
        &self,
        ops: &[OutOp],
        in_alter: bool,
        in_else: bool,
        indent: usize,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let mut indent = indent;
        if in_alter {
            if !in_else {
                pad(out, indent)?;
            }
            write!(out, "if (1) {{\n")?;
            indent += 1;
        }
        let mut fmt = String::new();
        let mut args = String::new();
        let mut deferred_indent = 0i32;
        for (i, op) in ops.iter().enumerate() {
            match op {
                OutOp::Text(text) => fmt.push_str(&escape_c(text)),
                OutOp::LastToken => {
                    fmt.push_str("%s");
                    args.push_str(", last_tokstr");
                }
                OutOp::Label(LabelSlot::One) => {
                    fmt.push_str("L%d");
                    args.push_str(", getlab(&lab1)");
                }
                OutOp::Label(LabelSlot::Two) => {
                    fmt.push_str("L%d");
                    args.push_str(", getlab(&lab2)");
                }
                OutOp::Indent => {
                    if fmt.is_empty() {
                        pad(out, indent)?;
                        write!(out, "indent += 4;\n")?;
                    } else {
                        deferred_indent += 4;
                    }
                }
                OutOp::Dedent => {
                    if fmt.is_empty() {
                        pad(out, indent)?;
                        write!(out, "indent += -4;\n")?;
                    } else {
                        deferred_indent -= 4;
                    }
                }
                OutOp::Newline => {
                    pad(out, indent)?;
                    write!(
                        out,
                        "printf(\"%*s{}\\n\", get_indent(), \"\"{});",
                        fmt, args
                    )?;
                    if deferred_indent != 0 {
                        write!(out, "\n")?;
                        pad(out, indent)?;
                        write!(out, "indent += {};", deferred_indent)?;
                        deferred_indent = 0;
                    }
                    if i + 1 < ops.len() {
                        write!(out, "\n")?;
                    }
                    fmt.clear();
                    args.clear();
                }
                // rejected before emission starts
                OutOp::Buffer(_) => unreachable!(),
            }
        }
        if !fmt.is_empty() {
            pad(out, indent)?;
            write!(out, "printf(\"%*s{}\", get_indent(), \"\"{});", fmt, args)?;
        }
        if deferred_indent != 0 {
            write!(out, "\n")?;
            pad(out, indent)?;
            write!(out, "indent += {};", deferred_indent)?;
        }
        if in_alter {
            write!(out, "\n")?;
            pad(out, indent - 1)?;
            write!(out, "}}")?;
        }
        Ok(())
    }

    fn write_node(
        &self,
        node: NodeId,
        in_alter: bool,
        in_else: bool,
        indent: usize,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        match &self.grammar.node(node).kind {
            NodeKind::Output { ops } => {
                self.write_output_block(ops, in_alter, in_else, indent, out)
            }
            // validated away before rendering
            NodeKind::Control { .. } => unreachable!(),
            NodeKind::Terminal { terminal, .. } => {
                let name = self.lexer.id_to_name(*terminal);
                if in_alter {
                    if !in_else {
                        pad(out, indent)?;
                    }
                    write!(out, "if (LA(T_{})) {{\n", name)?;
                    pad(out, indent + 1)?;
                    write!(out, "match(T_{});\n", name)?;
                    pad(out, indent)?;
                    write!(out, "}}")
                } else {
                    pad(out, indent)?;
                    write!(out, "match(T_{});", name)
                }
            }
            NodeKind::NonTerminal { rule, .. } => {
                let rule = *rule;
                let name = &self.grammar.rule(rule).name;
                if in_alter {
                    if !in_else {
                        pad(out, indent)?;
                    }
                    write!(out, "if (")?;
                    self.write_first_test(self.rule_first(rule), out)?;
                    write!(out, ") {{\n")?;
                    pad(out, indent + 1)?;
                    write!(out, "{}();\n", name)?;
                    pad(out, indent)?;
                    write!(out, "}}")
                } else {
                    pad(out, indent)?;
                    write!(out, "{}();", name)
                }
            }
            NodeKind::Choice { left, right, .. } => {
                let (left, right) = (*left, *right);
                self.write_node(left, true, false, indent, out)?;
                if in_alter {
                    write!(out, " else ")?;
                    self.write_node(right, true, true, indent, out)
                } else {
                    write!(out, " else {{\n")?;
                    self.write_node(right, false, false, indent + 1, out)?;
                    write!(out, "\n")?;
                    pad(out, indent)?;
                    write!(out, "}}")
                }
            }
            NodeKind::Concat { left, right } => {
                let (left, right) = (*left, *right);
                if in_alter {
                    if !in_else {
                        pad(out, indent)?;
                    }
                    write!(out, "if (")?;
                    self.write_first_test(self.grammar.node(node).first(), out)?;
                    write!(out, ") {{\n")?;
                    self.write_node(left, false, false, indent + 1, out)?;
                    write!(out, "\n")?;
                    self.write_node(right, false, false, indent + 1, out)?;
                    write!(out, "\n")?;
                    pad(out, indent)?;
                    write!(out, "}}")
                } else {
                    self.write_node(left, false, false, indent, out)?;
                    write!(out, "\n")?;
                    self.write_node(right, false, false, indent, out)
                }
            }
            NodeKind::Repeat { inner } => {
                let inner = *inner;
                let inner_first = self.grammar.node(inner).first();
                if in_alter {
                    if !in_else {
                        pad(out, indent)?;
                    }
                    write!(out, "if (")?;
                    self.write_first_test(inner_first, out)?;
                    write!(out, ") {{\n")?;
                    pad(out, indent + 1)?;
                    write!(out, "while (")?;
                    self.write_first_test(inner_first, out)?;
                    write!(out, ") {{\n")?;
                    self.write_node(inner, false, false, indent + 2, out)?;
                    write!(out, "\n")?;
                    pad(out, indent + 1)?;
                    write!(out, "}}\n")?;
                    pad(out, indent)?;
                    write!(out, "}}")
                } else {
                    pad(out, indent)?;
                    write!(out, "while (")?;
                    self.write_first_test(inner_first, out)?;
                    write!(out, ") {{\n")?;
                    self.write_node(inner, false, false, indent + 1, out)?;
                    write!(out, "\n")?;
                    pad(out, indent)?;
                    write!(out, "}}")
                }
            }
            NodeKind::Opt { inner } => {
                let inner = *inner;
                if !in_else {
                    pad(out, indent)?;
                }
                write!(out, "if (")?;
                self.write_first_test(self.grammar.node(inner).first(), out)?;
                write!(out, ") {{\n")?;
                self.write_node(inner, false, false, indent + 1, out)?;
                write!(out, "\n")?;
                pad(out, indent)?;
                write!(out, "}}")
            }
        }
    }
}

// Lowers the analyzed grammar to a standalone recursive-descent recognizer
// in C against the same lex.h interface the interpreter drives.
pub fn generate<L: TargetLexer>(
    grammar: &Grammar,
    lexer: &L,
    out: &mut dyn Write,
) -> Result<(), GenError> {
    for rule in grammar.rules() {
        reject_unsupported(grammar, rule.body)?;
    }
    let writer = CodeWriter { grammar, lexer };
    let template = Template::new(include_str!("c_recognizer.tpl"));
    let mut subs = Substitutions::new();
    subs.set("token_defines", |out| writer.write_token_defines(out));
    subs.set("forward_declarations", |out| {
        writer.write_forward_declarations(out)
    });
    subs.set("rule_functions", |out| writer.write_rule_functions(out));
    subs.set("keyword_registration", |out| {
        writer.write_keyword_registration(out)
    });
    subs.set("start_call", |out| writer.write_start_call(out));
    template.render(&subs, out)?;
    Ok(())
}
