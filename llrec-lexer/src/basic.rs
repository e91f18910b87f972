use std::fs;
use std::io;
use std::path::Path;

use crate::{TargetLexer, TerminalId, MAX_TERMINALS};

pub const T_UNKNOWN: TerminalId = 0;
pub const T_IDENT: TerminalId = 1;
pub const T_NUMBER: TerminalId = 2;
pub const T_PLUS: TerminalId = 3;
pub const T_MINUS: TerminalId = 4;
pub const T_MUL: TerminalId = 5;
pub const T_DIV: TerminalId = 6;
pub const T_LPAREN: TerminalId = 7;
pub const T_RPAREN: TerminalId = 8;
pub const T_SEMI: TerminalId = 9;
pub const T_ASSIGN: TerminalId = 10;
pub const T_EOF: TerminalId = 11;

const FIRST_KEYWORD: TerminalId = 12;

// (name, print form, fixed spelling)
const FIXED: &[(&str, &str, Option<&str>)] = &[
    ("UNKNOWN", "unknown", None),
    ("ident", "ident", None),
    ("number", "number", None),
    ("PLUS", "+", Some("+")),
    ("MINUS", "-", Some("-")),
    ("MUL", "*", Some("*")),
    ("DIV", "/", Some("/")),
    ("LPAREN", "(", Some("(")),
    ("RPAREN", ")", Some(")")),
    ("SEMI", ";", Some(";")),
    ("ASSIGN", ":=", Some(":=")),
    ("EOF", "EOF", None),
];

#[derive(Debug, Clone)]
pub struct Cursor {
    pos: usize,
    line: u32,
    text: String,
    eof: bool,
}

// Example lexer backing the demo grammars and the tests. Identifier-shaped
// literals unknown to the fixed table become keywords on first sight.
pub struct BasicLexer {
    source: String,
    cursor: Cursor,
    keywords: Vec<String>,
}

impl BasicLexer {
    pub fn new() -> Self {
        BasicLexer {
            source: String::new(),
            cursor: Cursor {
                pos: 0,
                line: 1,
                text: String::new(),
                eof: false,
            },
            keywords: Vec::new(),
        }
    }

    pub fn with_source(source: impl Into<String>) -> Self {
        let mut lexer = BasicLexer::new();
        lexer.load_source(source);
        lexer
    }

    // swap in an input stream, keeping the registered keywords
    pub fn load_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.cursor = Cursor {
            pos: 0,
            line: 1,
            text: String::new(),
            eof: false,
        };
    }

    pub fn register_keyword(&mut self, spelling: &str) -> Option<TerminalId> {
        if let Some(i) = self.keywords.iter().position(|k| k == spelling) {
            return Some(FIRST_KEYWORD + i as TerminalId);
        }
        let id = FIRST_KEYWORD as usize + self.keywords.len();
        if id >= MAX_TERMINALS {
            return None;
        }
        self.keywords.push(spelling.to_string());
        Some(id as TerminalId)
    }

    fn rest(&self) -> &str {
        &self.source[self.cursor.pos..]
    }

    fn bump(&mut self, len: usize) {
        self.cursor.pos += len;
    }
}

impl Default for BasicLexer {
    fn default() -> Self {
        BasicLexer::new()
    }
}

impl TargetLexer for BasicLexer {
    type Snapshot = Cursor;

    fn open(&mut self, path: &Path) -> io::Result<()> {
        let source = fs::read_to_string(path)?;
        self.load_source(source);
        Ok(())
    }

    fn next_token(&mut self) -> TerminalId {
        if self.cursor.eof {
            self.cursor.text.clear();
            return T_EOF;
        }
        loop {
            match self.rest().chars().next() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' => self.bump(1),
                Some('\n') => {
                    self.cursor.line += 1;
                    self.bump(1);
                }
                _ => break,
            }
        }
        let rest = self.rest();
        let mut chars = rest.chars();
        let c = match chars.next() {
            None => {
                self.cursor.eof = true;
                self.cursor.text.clear();
                return T_EOF;
            }
            Some(c) => c,
        };
        if c.is_ascii_alphabetic() || c == '_' {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            let word = &rest[..len];
            let id = self
                .keywords
                .iter()
                .position(|k| k == word)
                .map(|i| FIRST_KEYWORD + i as TerminalId)
                .unwrap_or(T_IDENT);
            self.cursor.text = word.to_string();
            self.bump(len);
            return id;
        }
        if c.is_ascii_digit() {
            let len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            self.cursor.text = rest[..len].to_string();
            self.bump(len);
            return T_NUMBER;
        }
        let (id, len) = match c {
            '+' => (T_PLUS, 1),
            '-' => (T_MINUS, 1),
            '*' => (T_MUL, 1),
            '/' => (T_DIV, 1),
            '(' => (T_LPAREN, 1),
            ')' => (T_RPAREN, 1),
            ';' => (T_SEMI, 1),
            ':' if rest[1..].starts_with('=') => (T_ASSIGN, 2),
            _ => (T_UNKNOWN, c.len_utf8()),
        };
        self.cursor.text = rest[..len].to_string();
        self.bump(len);
        id
    }

    fn line(&self) -> u32 {
        self.cursor.line
    }

    fn token_text(&self) -> &str {
        &self.cursor.text
    }

    fn snapshot(&self) -> Cursor {
        self.cursor.clone()
    }

    fn restore(&mut self, snapshot: &Cursor) {
        self.cursor = snapshot.clone();
    }

    fn name_to_id(&self, name: &str) -> Option<TerminalId> {
        if let Some(i) = FIXED.iter().position(|(n, _, _)| *n == name) {
            return Some(i as TerminalId);
        }
        self.keywords
            .iter()
            .position(|k| k == name)
            .map(|i| FIRST_KEYWORD + i as TerminalId)
    }

    fn literal_to_id(&mut self, spelling: &str) -> Option<TerminalId> {
        if let Some(i) = FIXED.iter().position(|(_, _, s)| *s == Some(spelling)) {
            return Some(i as TerminalId);
        }
        let identifier_shaped = spelling
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
            && spelling
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if identifier_shaped {
            self.register_keyword(spelling)
        } else {
            None
        }
    }

    fn id_to_print(&self, id: TerminalId) -> &str {
        let i = id as usize;
        if i < FIXED.len() {
            return FIXED[i].1;
        }
        self.keywords
            .get(i - FIRST_KEYWORD as usize)
            .map(|k| k.as_str())
            .unwrap_or("?")
    }

    fn id_to_name(&self, id: TerminalId) -> &str {
        let i = id as usize;
        if i < FIXED.len() {
            return FIXED[i].0;
        }
        self.keywords
            .get(i - FIRST_KEYWORD as usize)
            .map(|k| k.as_str())
            .unwrap_or("?")
    }

    fn keywords(&self) -> Vec<String> {
        self.keywords.clone()
    }
}
