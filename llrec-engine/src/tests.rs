use llrec_grammar::builder::build;
use llrec_grammar::grammar::Grammar;
use llrec_grammar::sets::compute_first_sets;
use llrec_input::parse_grammar;
use llrec_lexer::BasicLexer;

use crate::{RecognizeError, Recognizer};

fn setup(grammar_source: &str, input: &str) -> (Grammar, BasicLexer) {
    let file = parse_grammar(grammar_source).unwrap();
    let mut lexer = BasicLexer::new();
    let mut grammar = build(&file, &mut lexer).unwrap();
    compute_first_sets(&mut grammar);
    lexer.load_source(input);
    (grammar, lexer)
}

fn translate(grammar_source: &str, input: &str) -> Result<String, RecognizeError> {
    let (grammar, mut lexer) = setup(grammar_source, input);
    let mut recognizer = Recognizer::new(&grammar, &mut lexer, Vec::new(), false, "input");
    recognizer.run()?;
    Ok(String::from_utf8(recognizer.into_writer()).unwrap())
}

#[test]
fn recognizes_an_expression() {
    let source = r#"
expr* = term { ("+" | "-") term };
term = factor { ("*" | "/") factor };
factor = #ident | #number | "(" expr ")";
.
"#;
    assert_eq!(translate(source, "1 + 2 * 3").unwrap(), "");
    assert_eq!(translate(source, "(a + b) / c - 2").unwrap(), "");
}

#[test]
fn reports_unexpected_token_with_line() {
    let source = r#"
expr* = term { ("+" | "-") term };
term = factor { ("*" | "/") factor };
factor = #ident | #number | "(" expr ")";
.
"#;
    match translate(source, "1 +\n+ 2") {
        Err(RecognizeError::UnexpectedToken { print, line }) => {
            assert_eq!(print, "+");
            assert_eq!(line, 2);
        }
        other => panic!("expected an unexpected-token error, got {:?}", other),
    }
}

#[test]
fn recognition_stops_at_the_recognized_prefix() {
    // trailing input after the start rule is not an error
    let source = r#"x* = #ident; ."#;
    assert_eq!(translate(source, "a b c").unwrap(), "");
}

#[test]
fn translation_emits_labels_and_text() {
    let source = r#"
stmt* = "if" #ident {{"if " * " goto L" *1 ";" ;}}
        "then" #ident {{"goto L" *2 ";" ; "L" *1 ":" ;}}
        "else" #ident {{"L" *2 ":" ;}};
.
"#;
    let output = translate(source, "if a then b else c").unwrap();
    assert_eq!(output, "if a goto L1;\ngoto L2;\nL1:\nL2:\n");
}

#[test]
fn labels_are_fresh_per_rule_invocation() {
    let source = r#"
prog* = { stmt };
stmt = "go" {{"L" *1 ";" ;}};
.
"#;
    let output = translate(source, "go go go").unwrap();
    assert_eq!(output, "L1;\nL2;\nL3;\n");
}

#[test]
fn indentation_applies_at_line_starts_only() {
    let source = r#"
x* = "a" {{ "head" ; + "one" "-two" ; - "tail" ; }};
.
"#;
    let output = translate(source, "a").unwrap();
    assert_eq!(output, "head\n    one-two\ntail\n");
}

#[test]
fn last_token_directive_uses_the_matched_lexeme() {
    let source = r#"
x* = #ident {{ * }} #number {{ " " * ; }};
.
"#;
    assert_eq!(translate(source, "count 42").unwrap(), "count 42\n");
}

#[test]
fn capture_redirects_rule_output_into_a_buffer() {
    let source = r#"
x* = item > $i "(" item ")" {{ "second " }} {{ $i ; }};
item = #ident {{ "got " * }};
.
"#;
    // the captured invocation writes into $i, the parenthesized one to the
    // default sink
    assert_eq!(
        translate(source, "a ( b )").unwrap(),
        "got bsecond got a\n"
    );
}

#[test]
fn capture_buffer_is_cleared_on_entry() {
    // each iteration re-enters the captured invocation, wiping the buffer
    let source = r#"
x* = { item > $i } {{ $i ; }};
item = #ident {{ * }};
.
"#;
    assert_eq!(translate(source, "a b c").unwrap(), "c\n");
}

#[test]
fn terminal_slot_binds_the_matched_lexeme() {
    let source = r#"
x* = #ident > $name ":=" #number {{ $name " gets " * ; }};
.
"#;
    assert_eq!(translate(source, "x := 7").unwrap(), "x gets 7\n");
}

#[test]
fn backtracking_tries_the_second_arm() {
    let source = r#"
x* = [[ "a" "b" {{ "ab" ; }} | "a" "c" {{ "ac" ; }} ]];
.
"#;
    assert_eq!(translate(source, "a b").unwrap(), "ab\n");
    assert_eq!(translate(source, "a c").unwrap(), "ac\n");
}

#[test]
fn backtracking_failure_outside_a_trial_is_fatal() {
    let source = r#"
x* = [[ "a" "b" | "a" "c" ]];
.
"#;
    match translate(source, "a d") {
        Err(RecognizeError::UnexpectedToken { print, .. }) => assert_eq!(print, "ident"),
        other => panic!("expected an unexpected-token error, got {:?}", other),
    }
}

#[test]
fn failed_trial_discards_its_output_and_labels() {
    let source = r#"
x* = [[ "a" {{ "first L" *1 ;}} "b" | "a" {{ "second L" *1 ;}} "c" ]];
.
"#;
    // the label allocated in the failed first trial is rolled back
    assert_eq!(translate(source, "a c").unwrap(), "second L1;\n");
}

#[test]
fn nested_backtracking_restores_lifo() {
    let source = r#"
x* = [[ inner "x" {{ "ix" ; }} | inner "y" {{ "iy" ; }} ]];
inner = [[ "a" "b" | "a" "c" ]];
.
"#;
    assert_eq!(translate(source, "a c y").unwrap(), "iy\n");
}

#[test]
fn push_pop_replays_input() {
    // scan the identifier once silently, rewind, emit it twice
    let source = r#"
x* = $push $dout #ident $pop $eout #ident {{ * " " * ; }};
.
"#;
    assert_eq!(translate(source, "twice").unwrap(), "twice twice\n");
}

#[test]
fn pop_without_push_is_fatal() {
    let source = r#"x* = $pop #ident; ."#;
    assert!(matches!(
        translate(source, "a"),
        Err(RecognizeError::SaveStackUnderflow)
    ));
}

#[test]
fn push_overflow_is_fatal() {
    let source = r#"
x* = p p p p p p p p p p p p p p p p p;
p = $push;
.
"#;
    assert!(matches!(
        translate(source, "a"),
        Err(RecognizeError::SaveStackOverflow)
    ));
}

#[test]
fn disabled_output_suppresses_directives() {
    let source = r#"
x* = $dout "a" {{ "silent" ; }} $eout "b" {{ "loud" ; }};
.
"#;
    assert_eq!(translate(source, "a b").unwrap(), "loud\n");
}

#[test]
fn repetition_is_guarded_by_first() {
    let source = r#"
list* = item { ";" item } {{ "done" ; }};
item = #ident {{ "." }};
.
"#;
    assert_eq!(translate(source, "a ; b ; c").unwrap(), "...done\n");
}

#[test]
fn option_is_taken_only_on_first_match() {
    let source = r#"
x* = [ "-" {{ "neg " }} ] #number {{ * ; }};
.
"#;
    assert_eq!(translate(source, "- 5").unwrap(), "neg 5\n");
    assert_eq!(translate(source, "5").unwrap(), "5\n");
}

#[test]
fn verbose_trace_reports_rules_and_matches() {
    let source = r#"
x* = y;
y = #ident;
.
"#;
    let (grammar, mut lexer) = setup(source, "a");
    let mut recognizer = Recognizer::new(&grammar, &mut lexer, Vec::new(), true, "in.txt");
    recognizer.run().unwrap();
    let trace = String::from_utf8(recognizer.into_writer()).unwrap();
    assert_eq!(
        trace,
        ">> replacing `x' (in.txt:1)\n\
         -->> replacing `y' (in.txt:1)\n\
         ----<< matched `ident' (in.txt:1)\n"
    );
}
