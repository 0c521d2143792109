//! The clean, human-readable record of a run.

use super::state::Seat;
use std::fmt;

/// One relayed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub seat: Seat,
    pub speaker: String,
    pub text: String,
}

/// What was said during a run, in order.
///
/// Renders as an `[Initial Prompt]` block followed by one
/// `"<speaker>: <text>"` paragraph per reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    initial_prompt: String,
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new(initial_prompt: impl Into<String>) -> Self {
        Self {
            initial_prompt: initial_prompt.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, seat: Seat, speaker: impl Into<String>, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            seat,
            speaker: speaker.into(),
            text: text.into(),
        });
    }

    pub fn initial_prompt(&self) -> &str {
        &self.initial_prompt
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the transcript as plain text.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Initial Prompt]\n{}\n\n", self.initial_prompt)?;
        for entry in &self.entries {
            write!(f, "{}: {}\n\n", entry.speaker, entry.text)?;
        }
        Ok(())
    }
}
