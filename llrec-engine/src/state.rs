use llrec_lexer::TerminalId;

// deep capture of the target lexer plus the recognizer's own lookahead
#[derive(Debug, Clone)]
pub(crate) struct InputState<S> {
    pub token: TerminalId,
    pub last: String,
    pub lexer: S,
}

// everything a failed backtracking trial must roll back
#[derive(Debug)]
pub(crate) struct EngineSnapshot<S> {
    pub input: InputState<S>,
    pub committed: usize,
    pub indent: i32,
    pub at_line_start: bool,
    pub label_counter: u32,
    pub outputting: bool,
    pub trace_depth: u32,
    pub saved_inputs: usize,
}
