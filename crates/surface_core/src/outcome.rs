use std::fmt;

/// Result of an operation that was allowed to reach a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

/// Why an operation was a no-op. No backend call is issued for any of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotDirty,
    AlreadyPending,
    AlreadyRunning,
    NotRunning,
    AlreadyFetched,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotDirty => "nothing to save",
            SkipReason::AlreadyPending => "a call is already pending",
            SkipReason::AlreadyRunning => "the reader is already running",
            SkipReason::NotRunning => "the reader is not running",
            SkipReason::AlreadyFetched => "devices were already listed",
        };
        f.write_str(text)
    }
}

/// Gate decision taken by a state machine before a backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<T> {
    Proceed(T),
    Skip(SkipReason),
}
