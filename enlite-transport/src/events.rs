//! Session lifecycle events published by an adaptor

use std::fmt;

/// An event that can occur on the network session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// A PANA session is established
    Established,
    /// A PANA session end request has been received
    Ending,
    /// A PANA session is ended
    Ended,
    /// A PANA session is ended due to an error
    Error,
    /// A PANA session is ended due to a timeout
    Timeout,
    /// Transmission restriction of ARIB STD-T108 has started
    Arib108Start,
    /// Transmission restriction of ARIB STD-T108 has ended
    Arib108End,
}

impl SessionEvent {
    /// Get the event name
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Established => "session-established",
            SessionEvent::Ending => "session-ending",
            SessionEvent::Ended => "session-ended",
            SessionEvent::Error => "session-error",
            SessionEvent::Timeout => "session-timeout",
            SessionEvent::Arib108Start => "session-108-start",
            SessionEvent::Arib108End => "session-108-end",
        }
    }

    /// Whether the session is gone after this event
    pub fn is_termination(&self) -> bool {
        matches!(
            self,
            SessionEvent::Ended | SessionEvent::Error | SessionEvent::Timeout
        )
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
