//! What happens between frames.
//!
//! The pipeline asks a [`FrameControl`] after every frame, found or not,
//! whether to go on.

use log::{debug, info, warn};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDecision {
    Continue,
    Quit,
}

pub trait FrameControl {
    fn after_frame(&mut self, frame_index: usize, detected: bool) -> FrameDecision;
}

/// Headless: never stops early.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunToEnd;

impl FrameControl for RunToEnd {
    fn after_frame(&mut self, _frame_index: usize, _detected: bool) -> FrameDecision {
        FrameDecision::Continue
    }
}

/// Shared flag another thread (or a signal handler) can raise.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl FrameControl for CancelToken {
    fn after_frame(&mut self, _frame_index: usize, _detected: bool) -> FrameDecision {
        if self.is_cancelled() {
            FrameDecision::Quit
        } else {
            FrameDecision::Continue
        }
    }
}

/// Blocks on a line of input after each frame.
///
/// An empty line continues; `q`, `Q` or ESC quits. Once the input is
/// exhausted the remaining frames run without pausing.
pub struct StdinStepper<R, W> {
    input: R,
    output: W,
    hinted: bool,
    exhausted: bool,
    prompt_failed: bool,
}

impl StdinStepper<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> StdinStepper<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            hinted: false,
            exhausted: false,
            prompt_failed: false,
        }
    }

    fn prompt(&mut self, text: &str) {
        let written = self
            .output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush());
        if let Err(e) = written {
            if !self.prompt_failed {
                debug!("cannot write the frame prompt: {e}");
                self.prompt_failed = true;
            }
        }
    }
}

impl<R: BufRead, W: Write> FrameControl for StdinStepper<R, W> {
    fn after_frame(&mut self, frame_index: usize, detected: bool) -> FrameDecision {
        if self.exhausted {
            return FrameDecision::Continue;
        }
        if !self.hinted {
            self.prompt("press Enter for the next frame, q or ESC to quit\n");
            self.hinted = true;
        }
        let status = if detected { "board found" } else { "no board" };
        self.prompt(&format!("frame {frame_index} ({status}) > "));

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                info!("input closed, running the remaining frames without pausing");
                self.exhausted = true;
                FrameDecision::Continue
            }
            Ok(_) => match line.trim_end_matches(['\r', '\n']).trim() {
                "q" | "Q" | "\u{1b}" => FrameDecision::Quit,
                _ => FrameDecision::Continue,
            },
            Err(e) => {
                warn!("cannot read from input ({e}), running the remaining frames");
                self.exhausted = true;
                FrameDecision::Continue
            }
        }
    }
}
