use std::time::{Duration, Instant};

/// Idle time after which a burst of input counts as finished.
pub const TYPING_IDLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingTransition {
    Started,
    Stopped,
}

/// Turns keystrokes into at most one `typing` per burst and a `stop_typing`
/// once input goes idle.
///
/// Time is passed in so the state machine stays deterministic.
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    idle: Duration,
    last_input: Option<Instant>,
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(TYPING_IDLE)
    }
}

impl TypingDebouncer {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            last_input: None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.last_input.is_some()
    }

    /// Record a keystroke. Returns `Started` for the first one of a burst.
    pub fn input(&mut self, now: Instant) -> Option<TypingTransition> {
        let started = self.last_input.is_none();
        self.last_input = Some(now);
        started.then_some(TypingTransition::Started)
    }

    /// Returns `Stopped` once input has been idle long enough.
    pub fn poll(&mut self, now: Instant) -> Option<TypingTransition> {
        match self.last_input {
            Some(last) if now.saturating_duration_since(last) >= self.idle => {
                self.last_input = None;
                Some(TypingTransition::Stopped)
            }
            _ => None,
        }
    }

    /// End the burst now, e.g. because the message was sent.
    pub fn stop(&mut self) -> Option<TypingTransition> {
        self.last_input
            .take()
            .map(|_| TypingTransition::Stopped)
    }

    /// When the current burst will go idle, if one is running.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_input.map(|last| last + self.idle)
    }
}
