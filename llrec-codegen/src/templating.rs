use std::collections::HashMap;
use std::io::{self, Write};

use once_cell::sync::Lazy;
use regex::Regex;

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\*\{\s*([a-z_]+)\s*\}\*/").unwrap());

// A source template with `/*{ key }*/` markers. Rendering streams the text
// between markers and calls the registered substitution for each key.
pub struct Template<'src> {
    source: &'src str,
}

pub struct Substitutions<'writer> {
    entries: HashMap<&'static str, Box<dyn Fn(&mut dyn Write) -> io::Result<()> + 'writer>>,
}

impl<'writer> Substitutions<'writer> {
    pub fn new() -> Self {
        Substitutions {
            entries: HashMap::new(),
        }
    }

    pub fn set<F>(&mut self, key: &'static str, substitution: F)
    where
        F: Fn(&mut dyn Write) -> io::Result<()> + 'writer,
    {
        self.entries.insert(key, Box::new(substitution));
    }
}

impl<'writer> Default for Substitutions<'writer> {
    fn default() -> Self {
        Substitutions::new()
    }
}

impl<'src> Template<'src> {
    pub fn new(source: &'src str) -> Self {
        Template { source }
    }

    pub fn render(&self, subs: &Substitutions, out: &mut dyn Write) -> io::Result<()> {
        let mut written = 0;
        for captures in MARKER.captures_iter(self.source) {
            // group 0 always exists on a match
            let marker = captures.get(0).unwrap();
            let key = captures.get(1).unwrap().as_str();
            out.write_all(self.source[written..marker.start()].as_bytes())?;
            let substitution = subs.entries.get(key).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("no substitution registered for `{}'", key),
                )
            })?;
            substitution(out)?;
            written = marker.end();
        }
        out.write_all(self.source[written..].as_bytes())
    }
}
