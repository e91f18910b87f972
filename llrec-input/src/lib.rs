/*
    Grammar-language syntax:

    grammar  = rule { rule } "." ;
    rule     = ID [ "*" ] "=" expr ";" ;
    expr     = term { "|" term } ;
    term     = factor { factor } ;
    factor   = ID [ ">" "$" ID ]
             | "#" ID [ ">" "$" ID ]
             | STR [ ">" "$" ID ]
             | "(" expr ")"
             | "{" expr "}"
             | "[" expr "]"
             | "[[" expr "]]"
             | "{{" outexpr { outexpr } "}}"
             | "$" ID ;
    outexpr  = STR | "*" [ NUM ] | "$" ID | ";" | "+" | "-" ;

    Comments start with `!` and run to end of line. Strings may span
    lines; `\"` is the only escape. `{{`, `}}`, `[[` and `]]` are
    single tokens when adjacent.
*/
use std::error::Error;
use std::fmt::{self, Display, Formatter};

mod parser;
#[cfg(test)]
mod tests;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'src, T> {
    pub inner: T,
    pub site: &'src str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrammarFile<'src> {
    pub rules: Vec<RuleDecl<'src>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecl<'src> {
    pub name: Spanned<'src, &'src str>,
    pub is_start: bool,
    pub body: Expr<'src>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'src> {
    Alternation {
        arms: Vec<Expr<'src>>,
        backtracking: bool,
    },
    Sequence {
        elements: Vec<Expr<'src>>,
    },
    Repetition {
        inner: Box<Expr<'src>>,
    },
    Optional {
        inner: Box<Expr<'src>>,
    },
    RuleRef {
        name: Spanned<'src, &'src str>,
        capture: Option<Spanned<'src, &'src str>>,
    },
    TokenName {
        name: Spanned<'src, &'src str>,
        slot: Option<Spanned<'src, &'src str>>,
    },
    TokenLiteral {
        spelling: Spanned<'src, String>,
        slot: Option<Spanned<'src, &'src str>>,
    },
    Output {
        directives: Vec<Spanned<'src, OutExpr<'src>>>,
    },
    Control {
        action: Spanned<'src, &'src str>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutExpr<'src> {
    Verbatim(String),
    LastToken,
    Label(u32),
    BufferRef(&'src str),
    Newline,
    Indent,
    Dedent,
}

#[derive(Debug, PartialEq)]
pub enum SyntaxErrorKind {
    Unexpected,
    UnterminatedString,
}

#[derive(Debug, PartialEq)]
pub struct SyntaxError<'src> {
    pub site: &'src str,
    pub kind: SyntaxErrorKind,
}

impl<'src> Error for SyntaxError<'src> {}

impl<'src> Display for SyntaxError<'src> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            SyntaxErrorKind::UnterminatedString => write!(f, "unterminated string"),
            SyntaxErrorKind::Unexpected => {
                let excerpt: String = self
                    .site
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .chars()
                    .take(16)
                    .collect();
                if excerpt.is_empty() {
                    write!(f, "unexpected end of file")
                } else {
                    write!(f, "unexpected `{}'", excerpt)
                }
            }
        }
    }
}

pub fn parse_grammar(source: &str) -> Result<GrammarFile<'_>, SyntaxError<'_>> {
    match parser::grammar_file(source) {
        Ok((_trailing, file)) => Ok(file),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SyntaxError {
            site: e.site,
            kind: if e.unterminated {
                SyntaxErrorKind::UnterminatedString
            } else {
                SyntaxErrorKind::Unexpected
            },
        }),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError {
            site: &source[source.len()..],
            kind: SyntaxErrorKind::Unexpected,
        }),
    }
}

pub fn offset_in(source: &str, site: &str) -> usize {
    (site.as_ptr() as usize).saturating_sub(source.as_ptr() as usize)
}

// 1-based line of a site previously returned inside `source`
pub fn line_of(source: &str, site: &str) -> u32 {
    let offset = offset_in(source, site).min(source.len());
    1 + source[..offset].bytes().filter(|&b| b == b'\n').count() as u32
}
