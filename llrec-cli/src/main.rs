use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use llrec::Options;
use llrec_lexer::BasicLexer;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "generic LL(1) recognizer, translator and recognizer generator",
    long_about = None
)]
struct CommandLine {
    #[arg(required = true, help = "grammar file")]
    grammar: PathBuf,
    #[arg(help = "string file to recognize against the grammar")]
    string: Option<PathBuf>,
    #[arg(short = 'c', help = "check the grammar for LL(1) conflicts")]
    check: bool,
    #[arg(short = 'f', help = "print first sets")]
    first: bool,
    #[arg(short = 'l', help = "print follow sets")]
    follow: bool,
    #[arg(short = 'g', help = "generate a recognizer in C")]
    generate: bool,
    #[arg(
        short = 'o',
        value_name = "file",
        help = "write the generated recognizer to <file> (default stdout)"
    )]
    output: Option<PathBuf>,
    #[arg(short = 'v', help = "verbose mode")]
    verbose: bool,
}

fn prog_name() -> String {
    std::env::args().next().unwrap_or_else(|| "llrec".to_string())
}

fn main() -> ExitCode {
    let _ = color_eyre::install();
    let cli = CommandLine::parse();
    if !(cli.check || cli.first || cli.follow || cli.generate || cli.string.is_some()) {
        eprintln!(
            "usage: {} [ options ] <grammar_file> [ <string_file> ]",
            prog_name()
        );
        return ExitCode::from(2);
    }
    let options = Options {
        grammar_path: cli.grammar,
        string_path: cli.string,
        check: cli.check,
        print_first: cli.first,
        print_follow: cli.follow,
        generate: cli.generate,
        output_path: cli.output,
        verbose: cli.verbose,
    };
    let mut lexer = BasicLexer::new();
    match llrec::process(&options, &mut lexer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(errors) => {
            for error in &errors {
                eprintln!("{}: {}", prog_name(), error);
            }
            ExitCode::FAILURE
        }
    }
}
