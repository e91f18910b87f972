use llrec_input::parse_grammar;
use llrec_lexer::{BasicLexer, TargetLexer};

use crate::analysis::{check_conflicts, check_left_recursion, validate, AnalysisError};
use crate::builder::build;
use crate::grammar::Grammar;
use crate::sets::{compute_first_sets, compute_follow_sets, TokenSet};

const EXPR_GRAMMAR: &str = r#"
expr* = term { ("+" | "-") term };
term = factor { ("*" | "/") factor };
factor = #ident | #number | "(" expr ")";
.
"#;

fn build_with(source: &str) -> (Grammar, BasicLexer) {
    let file = parse_grammar(source).unwrap();
    let mut lexer = BasicLexer::new();
    let grammar = build(&file, &mut lexer).unwrap();
    (grammar, lexer)
}

fn build_err(source: &str) -> String {
    let file = parse_grammar(source).unwrap();
    let mut lexer = BasicLexer::new();
    match build(&file, &mut lexer) {
        Ok(_) => panic!("grammar unexpectedly built"),
        Err(e) => e.to_string(),
    }
}

fn set_of(lexer: &BasicLexer, names: &[&str]) -> TokenSet {
    let mut set = TokenSet::EMPTY;
    for name in names {
        set.insert(lexer.name_to_id(name).unwrap());
    }
    set
}

#[test]
fn expression_grammar_first_sets() {
    let (mut grammar, lexer) = build_with(EXPR_GRAMMAR);
    compute_first_sets(&mut grammar);
    let leading = set_of(&lexer, &["ident", "number", "LPAREN"]);
    for rule in 0..3 {
        let body = grammar.rule(rule).body;
        assert_eq!(grammar.node(body).first(), leading);
    }
}

#[test]
fn expression_grammar_follow_sets() {
    let (mut grammar, lexer) = build_with(EXPR_GRAMMAR);
    let eof = lexer.name_to_id("EOF").unwrap();
    compute_follow_sets(&mut grammar, eof);
    // expr is followed by `)` and EOF
    assert_eq!(grammar.follow_of(0), set_of(&lexer, &["RPAREN", "EOF"]));
    // term additionally by `+` and `-`
    assert_eq!(
        grammar.follow_of(1),
        set_of(&lexer, &["PLUS", "MINUS", "RPAREN", "EOF"])
    );
    // factor additionally by `*` and `/`
    assert_eq!(
        grammar.follow_of(2),
        set_of(&lexer, &["PLUS", "MINUS", "MUL", "DIV", "RPAREN", "EOF"])
    );
}

#[test]
fn follow_fixed_point_is_stable() {
    let (mut grammar, lexer) = build_with(EXPR_GRAMMAR);
    let eof = lexer.name_to_id("EOF").unwrap();
    compute_follow_sets(&mut grammar, eof);
    let before: Vec<TokenSet> = (0..grammar.rule_count())
        .map(|r| grammar.follow_of(r))
        .collect();
    grammar.follow_ready = false;
    compute_follow_sets(&mut grammar, eof);
    let after: Vec<TokenSet> = (0..grammar.rule_count())
        .map(|r| grammar.follow_of(r))
        .collect();
    assert_eq!(before, after);
}

#[test]
fn valid_grammar_passes_validation() {
    let (mut grammar, lexer) = build_with(EXPR_GRAMMAR);
    let eof = lexer.name_to_id("EOF").unwrap();
    assert!(validate(&mut grammar, eof).is_ok());
}

#[test]
fn first_first_conflict_is_reported() {
    let source = r#"
expr* = term { "+" term };
term = #ident | #number;
bad = expr | term;
.
"#;
    let (mut grammar, lexer) = build_with(source);
    let eof = lexer.name_to_id("EOF").unwrap();
    let conflicts = check_conflicts(&mut grammar, eof);
    assert_eq!(conflicts.len(), 1);
    match &conflicts[0] {
        AnalysisError::FirstFirst { rule, set } => {
            assert_eq!(rule, "bad");
            assert_eq!(*set, set_of(&lexer, &["ident", "number"]));
        }
        other => panic!("expected First/First conflict, got {:?}", other),
    }
}

#[test]
fn first_follow_conflict_is_reported() {
    // the option's FIRST(`;`) collides with what follows it
    let source = r#"
stmt* = [ ";" ] ";";
.
"#;
    let (mut grammar, lexer) = build_with(source);
    let eof = lexer.name_to_id("EOF").unwrap();
    let conflicts = check_conflicts(&mut grammar, eof);
    assert!(matches!(
        conflicts.as_slice(),
        [AnalysisError::FirstFollow { rule, .. }] if rule == "stmt"
    ));
}

#[test]
fn left_recursion_is_reported() {
    let source = r#"
expr* = expr "+" term | term;
term = #ident;
.
"#;
    let (mut grammar, _) = build_with(source);
    match check_left_recursion(&mut grammar) {
        Err(AnalysisError::LeftRecursion { rule }) => assert_eq!(rule, "expr"),
        other => panic!("expected left recursion, got {:?}", other),
    }
}

#[test]
fn indirect_left_recursion_through_epsilon_prefix() {
    // the option can match nothing, so `b` is still leftmost in `a`
    let source = r#"
a* = [ "+" ] b;
b = a ";";
.
"#;
    let (mut grammar, _) = build_with(source);
    assert!(matches!(
        check_left_recursion(&mut grammar),
        Err(AnalysisError::LeftRecursion { .. })
    ));
}

#[test]
fn redefined_rule_is_rejected() {
    let err = build_err(r#"x* = "a"; x = "b"; ."#);
    assert_eq!(err, "rule `x' redefined");
}

#[test]
fn undefined_rules_are_listed() {
    let err = build_err(r#"x* = alpha beta; ."#);
    assert_eq!(
        err,
        "the grammar contains the following undefined symbols: `alpha', `beta'"
    );
}

#[test]
fn missing_start_symbol_is_rejected() {
    let err = build_err(r#"x = "a"; ."#);
    assert_eq!(err, "start symbol not defined");
}

#[test]
fn duplicate_start_symbol_is_rejected() {
    let err = build_err(r#"x* = "a"; y* = "b"; ."#);
    assert_eq!(err, "more than one start symbol");
}

#[test]
fn unknown_terminal_name_is_rejected() {
    let err = build_err(r#"x* = #nosuch; ."#);
    assert_eq!(err, "unknown token name `nosuch'");
}

#[test]
fn unknown_literal_spelling_is_rejected() {
    let err = build_err(r#"x* = "@@"; ."#);
    assert_eq!(err, "unknown token spelling `@@'");
}

#[test]
fn unknown_control_action_is_rejected() {
    let err = build_err(r#"x* = $frobnicate; ."#);
    assert_eq!(err, "unknown action `frobnicate'");
}

#[test]
fn buffer_reference_requires_prior_capture() {
    let err = build_err(r#"x* = "a" {{ $b }}; ."#);
    assert_eq!(err, "undefined buffer `b'");
}

#[test]
fn buffer_scope_is_per_rule() {
    // `b` captured in x is not visible in y
    let err = build_err(r#"x* = y > $b {{ $b }} y; y = "a" {{ $b }}; ."#);
    assert_eq!(err, "undefined buffer `b'");
}

#[test]
fn capture_redefinition_is_rejected() {
    let err = build_err(r#"x* = y > $b y > $b; y = "a"; ."#);
    assert_eq!(err, "buffer `b' redefined in the same rule");
}

#[test]
fn slot_reuse_is_rejected() {
    let err = build_err(r#"x* = #ident > $t #number > $t; ."#);
    assert_eq!(err, "token slot `t' re-used in the same rule");
}

#[test]
fn bad_label_number_is_rejected() {
    let err = build_err(r#"x* = "a" {{ "L" *3 }}; ."#);
    assert_eq!(err, "`1' or `2' expected after `*'");
}

#[test]
fn label_usage_flags_are_per_rule() {
    let source = r#"
x* = "a" {{ "L" *1 }} y;
y = "b" {{ "L" *2 }};
.
"#;
    let (grammar, _) = build_with(source);
    assert!(grammar.rule(0).uses_lab1);
    assert!(!grammar.rule(0).uses_lab2);
    assert!(!grammar.rule(1).uses_lab1);
    assert!(grammar.rule(1).uses_lab2);
}

#[test]
fn epsilon_membership_tracks_skippable_nodes() {
    let source = r#"
x* = { "+" } [ "-" ] {{ "out" }};
.
"#;
    let (mut grammar, _) = build_with(source);
    compute_first_sets(&mut grammar);
    let body = grammar.rule(0).body;
    assert!(grammar.node(body).first().has_epsilon());
}

#[test]
fn terminals_referenced_are_recorded() {
    let (grammar, lexer) = build_with(EXPR_GRAMMAR);
    let expected = set_of(
        &lexer,
        &["ident", "number", "PLUS", "MINUS", "MUL", "DIV", "LPAREN", "RPAREN"],
    );
    assert_eq!(grammar.terminals(), expected);
}
