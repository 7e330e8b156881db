//! Fixed question list and cursor

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;

/// A single interview question. Immutable once the set is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Zero-based position in the interview
    pub index: usize,
    /// Prompt text shown to the interviewee
    pub prompt: String,
    /// Audio rendition of the prompt, addressed by index
    pub audio_prompt: PathBuf,
}

/// Result of advancing the question cursor.
#[derive(Debug, PartialEq, Eq)]
pub enum Advance<'a> {
    /// There is a next question; the cursor now points at it
    Next(&'a Question),
    /// The last question has been passed
    Exhausted,
}

/// Ordered, fixed set of questions with a monotonic cursor.
///
/// No skipping, no reordering, no back-navigation: the only operations are
/// reading the current question and stepping forward.
#[derive(Debug, Clone)]
pub struct QuestionSet {
    questions: Vec<Question>,
    cursor: usize,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        ensure!(!questions.is_empty(), "question list must not be empty");
        Ok(Self {
            questions,
            cursor: 0,
        })
    }

    /// Build the set from config: one question per configured prompt, with
    /// the audio prompt resolved as `<audio_prompt_dir>/audio<i>.wav`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let questions = config
            .interview
            .questions
            .iter()
            .enumerate()
            .map(|(index, prompt)| Question {
                index,
                prompt: prompt.clone(),
                audio_prompt: config
                    .interview
                    .audio_prompt_dir
                    .join(format!("audio{}.wav", index)),
            })
            .collect();

        Self::new(questions)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The question the cursor points at. After exhaustion this stays on the
    /// last question; callers gate on `advance` results, not on `current`.
    pub fn current(&self) -> &Question {
        let idx = self.cursor.min(self.questions.len() - 1);
        &self.questions[idx]
    }

    /// Step the cursor forward. Signals `Exhausted` once the cursor moves
    /// past the last question, and on every call after that.
    pub fn advance(&mut self) -> Advance<'_> {
        if self.cursor + 1 < self.questions.len() {
            self.cursor += 1;
            Advance::Next(&self.questions[self.cursor])
        } else {
            self.cursor = self.questions.len();
            Advance::Exhausted
        }
    }
}
