mod output;
mod recognize;
mod state;
#[cfg(test)]
mod tests;

pub use output::{LabelSlots, OutputEngine, Sink};
pub use recognize::{Recognizer, RecognizeError};

// capacity of the $push/$pop input-state stack
pub const SAVE_STACK_DEPTH: usize = 16;
