use std::io::{self, Write};

use llrec_grammar::grammar::{BufferId, LabelSlot, OutOp};

// where directive output lands: the streaming default sink or a named buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Default,
    Buffer(BufferId),
}

// per-rule-invocation lazy label ids
#[derive(Debug, Default)]
pub struct LabelSlots {
    pub one: Option<u32>,
    pub two: Option<u32>,
}

// Materializes output directives. The default sink buffers text and flushes
// it to the writer only on committed progress, so a backtracking trial can
// be truncated away; named buffers are consumed by later splices and are
// never flushed.
pub struct OutputEngine<W: Write> {
    writer: W,
    out: String,
    flushed: usize,
    buffers: Vec<String>,
    pub indent: i32,
    pub at_line_start: bool,
    pub label_counter: u32,
    pub outputting: bool,
}

impl<W: Write> OutputEngine<W> {
    pub fn new(writer: W, buffer_count: usize) -> Self {
        OutputEngine {
            writer,
            out: String::new(),
            flushed: 0,
            buffers: vec![String::new(); buffer_count],
            indent: 0,
            at_line_start: true,
            label_counter: 1,
            outputting: true,
        }
    }

    fn write_str(&mut self, sink: Sink, text: &str) {
        let pad = if self.at_line_start && self.indent > 0 {
            self.indent as usize
        } else {
            0
        };
        let target = match sink {
            Sink::Default => &mut self.out,
            Sink::Buffer(b) => &mut self.buffers[b],
        };
        for _ in 0..pad {
            target.push(' ');
        }
        target.push_str(text);
        self.at_line_start = false;
    }

    pub fn run_block(&mut self, ops: &[OutOp], labels: &mut LabelSlots, last: &str, sink: Sink) {
        for op in ops {
            match op {
                OutOp::Text(text) => self.write_str(sink, text),
                OutOp::LastToken => self.write_str(sink, last),
                OutOp::Label(slot) => {
                    let cell = match slot {
                        LabelSlot::One => &mut labels.one,
                        LabelSlot::Two => &mut labels.two,
                    };
                    let id = *cell.get_or_insert_with(|| {
                        let id = self.label_counter;
                        self.label_counter += 1;
                        id
                    });
                    self.write_str(sink, &format!("L{}", id));
                }
                OutOp::Buffer(b) => {
                    let contents = self.buffers[*b].clone();
                    self.write_str(sink, &contents);
                    // a spliced buffer decides the line state by its tail
                    self.at_line_start = contents.ends_with('\n');
                }
                OutOp::Newline => {
                    let target = match sink {
                        Sink::Default => &mut self.out,
                        Sink::Buffer(b) => &mut self.buffers[b],
                    };
                    target.push('\n');
                    self.at_line_start = true;
                }
                OutOp::Indent => self.indent += 4,
                OutOp::Dedent => self.indent -= 4,
            }
        }
    }

    pub fn clear_buffer(&mut self, buffer: BufferId) {
        self.buffers[buffer].clear();
    }

    pub fn set_buffer(&mut self, buffer: BufferId, text: &str) {
        self.buffers[buffer].clear();
        self.buffers[buffer].push_str(text);
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.write_all(self.out[self.flushed..].as_bytes())?;
        self.flushed = self.out.len();
        Ok(())
    }

    pub fn finish(&mut self) -> io::Result<()> {
        self.flush()?;
        self.writer.flush()
    }

    pub(crate) fn committed(&self) -> usize {
        self.out.len()
    }

    // a trial never flushes, so truncation cannot cross the flush mark
    pub(crate) fn truncate(&mut self, committed: usize) {
        debug_assert!(committed >= self.flushed);
        self.out.truncate(committed);
    }

    pub(crate) fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub(crate) fn into_writer(self) -> W {
        self.writer
    }
}
