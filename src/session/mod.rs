//! Interview session state - screen machine and question sequencing

mod machine;
mod questions;

pub use machine::{Screen, Session, SessionError, SessionEvent};
pub use questions::{Advance, Question, QuestionSet};
