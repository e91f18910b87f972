use std::io;
use std::path::Path;

mod basic;

pub use basic::{BasicLexer, Cursor};

pub type TerminalId = u8;

// terminal ids live in [0, MAX_TERMINALS); bit 63 of a set is the empty marker
pub const MAX_TERMINALS: usize = 63;

// The lexer that tokenizes the strings a grammar is matched against.
// Implementations must support a deep snapshot of their cursor state so
// the recognizer can backtrack and replay input.
pub trait TargetLexer {
    type Snapshot: Clone;

    fn open(&mut self, path: &Path) -> io::Result<()>;
    fn next_token(&mut self) -> TerminalId;
    fn line(&self) -> u32;
    fn token_text(&self) -> &str;

    fn snapshot(&self) -> Self::Snapshot;
    fn restore(&mut self, snapshot: &Self::Snapshot);

    fn name_to_id(&self, name: &str) -> Option<TerminalId>;
    // may auto-register identifier-shaped spellings as keywords
    fn literal_to_id(&mut self, spelling: &str) -> Option<TerminalId>;
    fn id_to_print(&self, id: TerminalId) -> &str;
    fn id_to_name(&self, id: TerminalId) -> &str;
    fn keywords(&self) -> Vec<String>;
}
