use std::fs;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use llrec_engine::{RecognizeError, Recognizer};
use llrec_grammar::analysis::AnalysisError;
use llrec_grammar::builder::build;
use llrec_grammar::grammar::Grammar;
use llrec_grammar::sets::{compute_first_sets, compute_follow_sets, TokenSet};
use llrec_input::{line_of, parse_grammar};
use llrec_lexer::{TargetLexer, TerminalId};

mod errors;

pub use errors::{Location, LlrecError, Severity};

#[derive(Debug, Default)]
pub struct Options {
    pub grammar_path: PathBuf,
    pub string_path: Option<PathBuf>,
    pub check: bool,
    pub print_first: bool,
    pub print_follow: bool,
    pub generate: bool,
    pub output_path: Option<PathBuf>,
    pub verbose: bool,
}

fn set_text<L: TargetLexer>(set: TokenSet, lexer: &L) -> String {
    let prints: Vec<&str> = set.terminals().map(|t| lexer.id_to_print(t)).collect();
    prints.join(", ")
}

fn analysis_message<L: TargetLexer>(error: &AnalysisError, lexer: &L) -> String {
    match error {
        AnalysisError::FirstFirst { rule, set } => format!(
            "Rule `{}': First/First conflict: {{ {} }}",
            rule,
            set_text(*set, lexer)
        ),
        AnalysisError::FirstFollow { rule, set } => format!(
            "Rule `{}': First/Follow conflict: {{ {} }}",
            rule,
            set_text(*set, lexer)
        ),
        other => other.to_string(),
    }
}

fn eof_terminal<L: TargetLexer>(
    options: &Options,
    lexer: &L,
) -> Result<TerminalId, Vec<LlrecError>> {
    lexer.name_to_id("EOF").ok_or_else(|| {
        vec![LlrecError::new(
            &options.grammar_path,
            None,
            "the target lexer does not define an `EOF' token".to_string(),
        )]
    })
}

fn print_first_sets<L: TargetLexer>(grammar: &Grammar, lexer: &L) {
    for rule in grammar.rules() {
        let set = grammar.node(rule.body).first();
        println!(
            "FIRST({}) = {{ {}{} }}",
            rule.name,
            set_text(set, lexer),
            if set.has_epsilon() { ", epsilon" } else { "" }
        );
    }
}

fn print_follow_sets<L: TargetLexer>(grammar: &Grammar, lexer: &L) {
    for (id, rule) in grammar.rules().iter().enumerate() {
        println!(
            "FOLLOW({}) = {{ {} }}",
            rule.name,
            set_text(grammar.follow_of(id), lexer)
        );
    }
}

// The whole pipeline behind the CLI: parse and build the grammar, then run
// whichever of validation, set dumps, generation and recognition were asked
// for, in that order.
pub fn process<L: TargetLexer>(options: &Options, lexer: &mut L) -> Result<(), Vec<LlrecError>> {
    let grammar_path = &options.grammar_path;
    let source =
        fs::read_to_string(grammar_path).map_err(|e| vec![LlrecError::io(grammar_path, e)])?;
    let file = parse_grammar(&source).map_err(|e| {
        vec![LlrecError::new(
            grammar_path,
            Some(line_of(&source, e.site)),
            e.to_string(),
        )]
    })?;
    let mut grammar = build(&file, lexer).map_err(|e| {
        let line = e.site().map(|site| line_of(&source, site));
        vec![LlrecError::new(grammar_path, line, e.to_string())]
    })?;

    if options.check {
        let eof = eof_terminal(options, lexer)?;
        llrec_grammar::analysis::validate(&mut grammar, eof).map_err(|errors| {
            errors
                .iter()
                .map(|e| LlrecError::new(grammar_path, None, analysis_message(e, lexer)))
                .collect::<Vec<_>>()
        })?;
    }
    compute_first_sets(&mut grammar);

    if options.print_first {
        print_first_sets(&grammar, lexer);
    }
    if options.print_follow {
        let eof = eof_terminal(options, lexer)?;
        compute_follow_sets(&mut grammar, eof);
        print_follow_sets(&grammar, lexer);
    }

    if options.generate {
        let result = match &options.output_path {
            Some(path) => {
                let file = fs::File::create(path)
                    .map_err(|e| vec![LlrecError::io(path, e)])?;
                let mut writer = BufWriter::new(file);
                llrec_codegen::generate(&grammar, lexer, &mut writer)
            }
            None => {
                let stdout = io::stdout();
                let mut writer = stdout.lock();
                llrec_codegen::generate(&grammar, lexer, &mut writer)
            }
        };
        result.map_err(|e| vec![LlrecError::new(grammar_path, None, e.to_string())])?;
    }

    if let Some(string_path) = &options.string_path {
        lexer
            .open(string_path)
            .map_err(|e| vec![LlrecError::io(string_path, e)])?;
        let input_name = string_path.display().to_string();
        let mut recognizer = Recognizer::new(
            &grammar,
            lexer,
            io::stdout(),
            options.verbose,
            &input_name,
        );
        recognizer.run().map_err(|e| {
            let line = match &e {
                RecognizeError::UnexpectedToken { line, .. } => Some(*line),
                _ => None,
            };
            vec![LlrecError::new(string_path, line, e.to_string())]
        })?;
    }
    Ok(())
}
