use crate::{parse_grammar, Expr, OutExpr, SyntaxErrorKind};

#[test]
fn parse_expression_grammar() {
    let source = r#"
    ! three-level expression grammar
    expr* = term { ("+" | "-") term };
    term = factor { ("*" | "/") factor };
    factor = #ident | #number | "(" expr ")";
    .
    "#;
    let file = parse_grammar(source).unwrap();
    assert_eq!(file.rules.len(), 3);
    assert_eq!(file.rules[0].name.inner, "expr");
    assert!(file.rules[0].is_start);
    assert!(!file.rules[1].is_start);
    match &file.rules[2].body {
        Expr::Alternation { arms, backtracking } => {
            assert_eq!(arms.len(), 3);
            assert!(!backtracking);
            assert!(matches!(
                &arms[0],
                Expr::TokenName { name, .. } if name.inner == "ident"
            ));
        }
        other => panic!("expected alternation, got {:?}", other),
    }
}

#[test]
fn backtracking_group_marks_top_level_alternation() {
    let file = parse_grammar(r#"x* = [[ "a" "b" | "a" ("c" | "d") ]]; ."#).unwrap();
    match &file.rules[0].body {
        Expr::Alternation { arms, backtracking } => {
            assert!(backtracking);
            assert_eq!(arms.len(), 2);
            // nested group alternation stays non-backtracking
            match &arms[1] {
                Expr::Sequence { elements } => match &elements[1] {
                    Expr::Alternation { backtracking, .. } => assert!(!backtracking),
                    other => panic!("expected inner alternation, got {:?}", other),
                },
                other => panic!("expected sequence, got {:?}", other),
            }
        }
        other => panic!("expected alternation, got {:?}", other),
    }
}

#[test]
fn backtracking_group_without_alternation_is_transparent() {
    let file = parse_grammar(r#"x* = [[ "a" "b" ]]; ."#).unwrap();
    assert!(matches!(&file.rules[0].body, Expr::Sequence { .. }));
}

#[test]
fn adjacent_brackets_lex_as_digraph() {
    // `[[` is one token even where a nested option would otherwise parse
    assert!(parse_grammar(r#"x* = [ [ "a" ] "b" ]; ."#).is_ok());
    assert!(parse_grammar(r#"x* = [[ "a" ] "b" ]; ."#).is_err());
}

#[test]
fn output_block_directives() {
    let file =
        parse_grammar(r#"x* = "a" {{ "L" *1 ":" ; + * - $buf ;}}; ."#).unwrap();
    let directives = match &file.rules[0].body {
        Expr::Sequence { elements } => match &elements[1] {
            Expr::Output { directives } => directives,
            other => panic!("expected output block, got {:?}", other),
        },
        other => panic!("expected sequence, got {:?}", other),
    };
    let kinds: Vec<&OutExpr> = directives.iter().map(|d| &d.inner).collect();
    assert_eq!(
        kinds,
        vec![
            &OutExpr::Verbatim("L".to_string()),
            &OutExpr::Label(1),
            &OutExpr::Verbatim(":".to_string()),
            &OutExpr::Newline,
            &OutExpr::Indent,
            &OutExpr::LastToken,
            &OutExpr::Dedent,
            &OutExpr::BufferRef("buf"),
            &OutExpr::Newline,
        ]
    );
}

#[test]
fn captures_and_slots() {
    let file = parse_grammar(r#"x* = body > $b #ident > $t {{ $b $t }}; body = "a"; ."#).unwrap();
    match &file.rules[0].body {
        Expr::Sequence { elements } => {
            assert!(matches!(
                &elements[0],
                Expr::RuleRef { capture: Some(c), .. } if c.inner == "b"
            ));
            assert!(matches!(
                &elements[1],
                Expr::TokenName { slot: Some(s), .. } if s.inner == "t"
            ));
        }
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn control_actions() {
    let file = parse_grammar(r#"x* = $push "a" $pop "a" "b"; ."#).unwrap();
    match &file.rules[0].body {
        Expr::Sequence { elements } => {
            assert!(matches!(
                &elements[0],
                Expr::Control { action } if action.inner == "push"
            ));
        }
        other => panic!("expected sequence, got {:?}", other),
    }
}

#[test]
fn string_escapes_and_newlines() {
    let file = parse_grammar("x* = \"say \\\"hi\\\"\nbye\"; .").unwrap();
    match &file.rules[0].body {
        Expr::TokenLiteral { spelling, .. } => {
            assert_eq!(spelling.inner, "say \"hi\"\nbye");
        }
        other => panic!("expected literal, got {:?}", other),
    }
}

#[test]
fn unterminated_string_is_fatal() {
    let err = parse_grammar("x* = \"oops; .").unwrap_err();
    assert_eq!(err.kind, SyntaxErrorKind::UnterminatedString);
}

#[test]
fn text_after_final_dot_is_ignored() {
    assert!(parse_grammar("x* = \"a\"; . this is never read").is_ok());
}

#[test]
fn line_of_reports_the_right_line() {
    let source = "x* = \"a\";\ny = \"b\";\n.";
    let file = parse_grammar(source).unwrap();
    assert_eq!(crate::line_of(source, file.rules[0].name.site), 1);
    assert_eq!(crate::line_of(source, file.rules[1].name.site), 2);
}

#[test]
fn missing_semicolon_is_an_error() {
    assert!(parse_grammar("x* = \"a\" .").is_err());
}
