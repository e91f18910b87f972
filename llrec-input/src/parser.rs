use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{cut, map, opt, recognize, value},
    multi::{many0, many1},
    sequence::{pair, preceded, terminated},
    IResult,
};

use crate::{Expr, GrammarFile, OutExpr, RuleDecl, Spanned};

#[derive(Debug, PartialEq)]
pub(crate) struct InputError<'src> {
    pub site: &'src str,
    pub unterminated: bool,
}

impl<'src> InputError<'src> {
    fn at(site: &'src str) -> Self {
        InputError {
            site,
            unterminated: false,
        }
    }
}

impl<'src> nom::error::ParseError<&'src str> for InputError<'src> {
    fn from_error_kind(input: &'src str, _kind: nom::error::ErrorKind) -> Self {
        InputError::at(input)
    }

    fn append(_input: &'src str, _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'src, O> = IResult<&'src str, O, InputError<'src>>;

// whitespace and `!` line comments
fn sc(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), take_while1(|c: char| c.is_ascii_whitespace())),
            value((), pair(char('!'), take_while(|c| c != '\n'))),
        ))),
    )(input)
}

fn spanned<'src, O, F>(mut f: F) -> impl FnMut(&'src str) -> PResult<'src, Spanned<'src, O>>
where
    F: FnMut(&'src str) -> PResult<'src, O>,
{
    move |input: &'src str| {
        let (rest, inner) = f(input)?;
        let site = &input[..input.len() - rest.len()];
        Ok((rest, Spanned { inner, site }))
    }
}

// a punctuation token; single-char brackets never split a digraph
fn sym<'src>(s: &'static str) -> impl FnMut(&'src str) -> PResult<'src, &'src str> {
    move |input: &'src str| {
        let digraph = match s {
            "{" => "{{",
            "}" => "}}",
            "[" => "[[",
            "]" => "]]",
            _ => "",
        };
        if !digraph.is_empty() && input.starts_with(digraph) {
            return Err(nom::Err::Error(InputError::at(input)));
        }
        terminated(tag(s), sc)(input)
    }
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn name_tok(input: &str) -> PResult<'_, Spanned<'_, &str>> {
    terminated(spanned(identifier), sc)(input)
}

fn number(input: &str) -> PResult<'_, u32> {
    let (rest, digits) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    match digits.parse::<u32>() {
        Ok(n) => Ok((rest, n)),
        Err(_) => Err(nom::Err::Error(InputError::at(input))),
    }
}

// string body: `\"` yields a quote, any other byte is literal
fn string_literal(input: &str) -> PResult<'_, String> {
    let (body, _) = char('"')(input)?;
    let mut text = String::new();
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], text)),
            '\\' if matches!(chars.peek(), Some((_, '"'))) => {
                text.push('"');
                chars.next();
            }
            c => text.push(c),
        }
    }
    Err(nom::Err::Failure(InputError {
        site: input,
        unterminated: true,
    }))
}

fn buffer_suffix(input: &str) -> PResult<'_, Option<Spanned<'_, &str>>> {
    opt(preceded(
        sym(">"),
        cut(preceded(sym("$"), name_tok)),
    ))(input)
}

fn rule_ref(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, name) = name_tok(input)?;
    let (input, capture) = buffer_suffix(input)?;
    Ok((input, Expr::RuleRef { name, capture }))
}

fn token_name(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("#")(input)?;
    let (input, name) = cut(name_tok)(input)?;
    let (input, slot) = buffer_suffix(input)?;
    Ok((input, Expr::TokenName { name, slot }))
}

fn token_literal(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, spelling) = terminated(spanned(string_literal), sc)(input)?;
    let (input, slot) = buffer_suffix(input)?;
    Ok((input, Expr::TokenLiteral { spelling, slot }))
}

fn group(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("(")(input)?;
    let (input, e) = cut(expr)(input)?;
    let (input, _) = cut(sym(")"))(input)?;
    Ok((input, e))
}

fn repetition(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("{")(input)?;
    let (input, e) = cut(expr)(input)?;
    let (input, _) = cut(sym("}"))(input)?;
    Ok((
        input,
        Expr::Repetition {
            inner: Box::new(e),
        },
    ))
}

fn option(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("[")(input)?;
    let (input, e) = cut(expr)(input)?;
    let (input, _) = cut(sym("]"))(input)?;
    Ok((input, Expr::Optional { inner: Box::new(e) }))
}

fn backtrack_group(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("[[")(input)?;
    let (input, mut e) = cut(expr)(input)?;
    let (input, _) = cut(sym("]]"))(input)?;
    if let Expr::Alternation { backtracking, .. } = &mut e {
        *backtracking = true;
    }
    Ok((input, e))
}

fn out_expr(input: &str) -> PResult<'_, Spanned<'_, OutExpr<'_>>> {
    terminated(
        spanned(alt((
            map(string_literal, OutExpr::Verbatim),
            map(preceded(pair(char('*'), sc), number), OutExpr::Label),
            value(OutExpr::LastToken, char('*')),
            map(preceded(pair(char('$'), sc), identifier), OutExpr::BufferRef),
            value(OutExpr::Newline, char(';')),
            value(OutExpr::Indent, char('+')),
            value(OutExpr::Dedent, char('-')),
        ))),
        sc,
    )(input)
}

fn output_block(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("{{")(input)?;
    let (input, directives) = cut(many1(out_expr))(input)?;
    let (input, _) = cut(sym("}}"))(input)?;
    Ok((input, Expr::Output { directives }))
}

fn control(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, _) = sym("$")(input)?;
    let (input, action) = cut(name_tok)(input)?;
    Ok((input, Expr::Control { action }))
}

fn factor(input: &str) -> PResult<'_, Expr<'_>> {
    alt((
        output_block,
        backtrack_group,
        group,
        repetition,
        option,
        token_name,
        token_literal,
        control,
        rule_ref,
    ))(input)
}

fn term(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, mut elements) = many1(factor)(input)?;
    if elements.len() == 1 {
        Ok((input, elements.remove(0)))
    } else {
        Ok((input, Expr::Sequence { elements }))
    }
}

fn expr(input: &str) -> PResult<'_, Expr<'_>> {
    let (input, head) = term(input)?;
    let (input, tail) = many0(preceded(sym("|"), term))(input)?;
    if tail.is_empty() {
        Ok((input, head))
    } else {
        let mut arms = vec![head];
        arms.extend(tail);
        Ok((
            input,
            Expr::Alternation {
                arms,
                backtracking: false,
            },
        ))
    }
}

fn rule_decl(input: &str) -> PResult<'_, RuleDecl<'_>> {
    let (input, name) = name_tok(input)?;
    let (input, star) = opt(sym("*"))(input)?;
    let (input, _) = cut(sym("="))(input)?;
    let (input, body) = cut(expr)(input)?;
    let (input, _) = cut(sym(";"))(input)?;
    Ok((
        input,
        RuleDecl {
            name,
            is_start: star.is_some(),
            body,
        },
    ))
}

// text after the closing `.` is ignored
pub(crate) fn grammar_file(source: &str) -> PResult<'_, GrammarFile<'_>> {
    let (input, _) = sc(source)?;
    let (input, rules) = many1(rule_decl)(input)?;
    let (input, _) = sym(".")(input)?;
    Ok((input, GrammarFile { rules }))
}
