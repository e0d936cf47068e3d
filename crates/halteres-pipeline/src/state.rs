//! Per-week retry state machine.
//!
//! The transition function is pure so the retry policy can be tested
//! without any I/O. The async controller in `retry` drives it: `Generating`
//! performs one upstream attempt, `Verifying` judges the attempt's content,
//! and both transport failure and an incomplete verdict count against the
//! same attempt ceiling.

/// State of one week's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekState {
    /// Not yet dispatched.
    Pending,
    /// An upstream attempt is in flight.
    Generating {
        /// One-based attempt ordinal.
        attempt: u32,
    },
    /// An attempt's content is being verified.
    Verifying {
        /// One-based attempt ordinal.
        attempt: u32,
    },
    /// The week passed verification.
    Complete,
    /// The attempt ceiling was exhausted.
    Failed,
}

/// Observable outcome driving a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    /// The first attempt is being dispatched.
    Dispatched,
    /// The attempt's stream ended normally.
    StreamEnded,
    /// The attempt failed at the transport layer.
    TransportFailed,
    /// The verifier returned its verdict.
    Verified {
        /// Whether the expected workout count was reached.
        complete: bool,
    },
}

impl WeekState {
    /// Pure transition function. Invalid (state, event) pairs do not move.
    pub fn advance(self, event: AttemptEvent, max_attempts: u32) -> Self {
        match (self, event) {
            (Self::Pending, AttemptEvent::Dispatched) => Self::Generating { attempt: 1 },
            (Self::Generating { attempt }, AttemptEvent::StreamEnded) => {
                Self::Verifying { attempt }
            }
            (Self::Generating { attempt }, AttemptEvent::TransportFailed)
            | (Self::Verifying { attempt }, AttemptEvent::Verified { complete: false }) => {
                if attempt < max_attempts {
                    Self::Generating { attempt: attempt + 1 }
                } else {
                    Self::Failed
                }
            }
            (Self::Verifying { .. }, AttemptEvent::Verified { complete: true }) => Self::Complete,
            (state, _) => state,
        }
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}
