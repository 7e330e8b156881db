//! Interview screen state machine
//!
//! The session is a plain serializable value advanced through a pure
//! transition function. Each driver event maps to exactly one `apply` call
//! producing a new `Session`, so the whole screen flow can be unit tested
//! without a capture device or network in the loop.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The screen the interview is currently on.
///
/// Transitions are monotonic except for the per-question
/// Questions <-> Recording loop. Completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Initial screen; waiting for media access to be granted
    Instructions,
    /// Access granted; interviewee checks camera/microphone
    Preview,
    /// Showing the active question, waiting for recording to start
    Questions,
    /// Capturing an answer for the active question
    Recording,
    /// All questions answered; fixed delay before completion
    Processing,
    /// Terminal screen - no transition leaves it
    Completed,
}

/// Driver events that advance the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// Media access was granted and a stream is bound
    PermissionGranted,
    /// Media access was denied or no device was available
    PermissionDenied,
    /// Interviewee confirmed their setup on the preview screen
    SetupConfirmed,
    /// Recording started for the active question
    RecordingStarted,
    /// Recording stopped; payload handed to the upload dispatcher
    RecordingStopped,
    /// The post-interview processing delay elapsed
    ProcessingFinished,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The event is not legal on the current screen. This is a programming
    /// error in the caller: the engine's screen guards must prevent it.
    #[error("invalid transition: {event:?} while on {screen:?}")]
    InvalidTransition { screen: Screen, event: SessionEvent },
}

/// One interview pass: current screen, active question cursor, and whether
/// media access has been granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    screen: Screen,
    question_index: usize,
    question_count: usize,
    permissions_granted: bool,
}

impl Session {
    /// Create a fresh session on the Instructions screen.
    pub fn new(question_count: usize) -> Self {
        Self {
            screen: Screen::Instructions,
            question_index: 0,
            question_count,
            permissions_granted: false,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Index of the active question. Stays within [0, question_count) even
    /// after the last answer; Processing/Completed keep the final index.
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn permissions_granted(&self) -> bool {
        self.permissions_granted
    }

    pub fn is_terminal(&self) -> bool {
        self.screen == Screen::Completed
    }

    /// Pure transition function. Consumes the current session value and
    /// produces the next one, or a typed error for an event that is not
    /// legal on the current screen.
    pub fn apply(self, event: SessionEvent) -> Result<Session, SessionError> {
        use Screen::*;
        use SessionEvent::*;

        let next = match (self.screen, event) {
            (Instructions, PermissionGranted) => Session {
                screen: Preview,
                permissions_granted: true,
                ..self
            },
            // Denial halts progression; the session stays on Instructions
            // until access is granted manually.
            (Instructions, PermissionDenied) => Session {
                permissions_granted: false,
                ..self
            },
            (Preview, SetupConfirmed) => Session {
                screen: Questions,
                question_index: 0,
                ..self
            },
            (Questions, RecordingStarted) => Session {
                screen: Recording,
                ..self
            },
            (Recording, RecordingStopped) => {
                if self.question_index + 1 < self.question_count {
                    Session {
                        screen: Questions,
                        question_index: self.question_index + 1,
                        ..self
                    }
                } else {
                    Session {
                        screen: Processing,
                        ..self
                    }
                }
            }
            (Processing, ProcessingFinished) => Session {
                screen: Completed,
                ..self
            },
            (screen, event) => return Err(SessionError::InvalidTransition { screen, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_keeps_session_on_instructions() {
        let session = Session::new(5);
        let session = session.apply(SessionEvent::PermissionDenied).unwrap();
        assert_eq!(session.screen(), Screen::Instructions);
        assert!(!session.permissions_granted());

        // Denial can repeat; the session never leaves Instructions.
        let session = session.apply(SessionEvent::PermissionDenied).unwrap();
        assert_eq!(session.screen(), Screen::Instructions);
    }

    #[test]
    fn grant_advances_to_preview() {
        let session = Session::new(5).apply(SessionEvent::PermissionGranted).unwrap();
        assert_eq!(session.screen(), Screen::Preview);
        assert!(session.permissions_granted());
    }

    #[test]
    fn full_interview_walks_expected_screens() {
        let mut session = Session::new(5)
            .apply(SessionEvent::PermissionGranted)
            .unwrap()
            .apply(SessionEvent::SetupConfirmed)
            .unwrap();

        let mut visited = vec![(session.screen(), session.question_index())];
        for _ in 0..5 {
            session = session.apply(SessionEvent::RecordingStarted).unwrap();
            visited.push((session.screen(), session.question_index()));
            session = session.apply(SessionEvent::RecordingStopped).unwrap();
            visited.push((session.screen(), session.question_index()));
        }

        assert_eq!(
            visited,
            vec![
                (Screen::Questions, 0),
                (Screen::Recording, 0),
                (Screen::Questions, 1),
                (Screen::Recording, 1),
                (Screen::Questions, 2),
                (Screen::Recording, 2),
                (Screen::Questions, 3),
                (Screen::Recording, 3),
                (Screen::Questions, 4),
                (Screen::Recording, 4),
                (Screen::Processing, 4),
            ]
        );

        let session = session.apply(SessionEvent::ProcessingFinished).unwrap();
        assert_eq!(session.screen(), Screen::Completed);
        assert!(session.is_terminal());
    }

    #[test]
    fn question_index_stays_in_bounds() {
        let mut session = Session::new(2)
            .apply(SessionEvent::PermissionGranted)
            .unwrap()
            .apply(SessionEvent::SetupConfirmed)
            .unwrap();

        for _ in 0..2 {
            session = session.apply(SessionEvent::RecordingStarted).unwrap();
            session = session.apply(SessionEvent::RecordingStopped).unwrap();
            assert!(session.question_index() < session.question_count());
        }
        assert_eq!(session.screen(), Screen::Processing);
        assert_eq!(session.question_index(), 1);
    }

    #[test]
    fn completed_is_terminal() {
        let session = Session {
            screen: Screen::Completed,
            question_index: 4,
            question_count: 5,
            permissions_granted: true,
        };

        for event in [
            SessionEvent::PermissionGranted,
            SessionEvent::PermissionDenied,
            SessionEvent::SetupConfirmed,
            SessionEvent::RecordingStarted,
            SessionEvent::RecordingStopped,
            SessionEvent::ProcessingFinished,
        ] {
            assert!(matches!(
                session.apply(event),
                Err(SessionError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn misuse_is_a_typed_error() {
        let session = Session::new(5);
        let err = session.apply(SessionEvent::RecordingStopped).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                screen: Screen::Instructions,
                event: SessionEvent::RecordingStopped,
            }
        );
    }

    #[test]
    fn session_round_trips_through_json() {
        let session = Session::new(5)
            .apply(SessionEvent::PermissionGranted)
            .unwrap()
            .apply(SessionEvent::SetupConfirmed)
            .unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
    }
}
