// User-visible failure taxonomy. Everything here is either recovered
// locally or shown as a one-line status notice; nothing propagates to a
// crash.

use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("track {} has no samples to play", idx + 1)]
    EmptyTrack { idx: usize },
    #[error("nothing to play yet")]
    EmptyMix,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("no input device; recording disabled")]
    NoInputDevice,
}

const NOTICE_TTL: Duration = Duration::from_secs(3);

/// One-line status message with a short lifetime.
#[derive(Debug, Default)]
pub struct Notice {
    text: Option<(String, Instant)>,
}

impl Notice {
    pub fn set(&mut self, text: impl Into<String>, now: Instant) {
        self.text = Some((text.into(), now));
    }

    pub fn current(&self, now: Instant) -> Option<&str> {
        match &self.text {
            Some((text, at)) if now.duration_since(*at) < NOTICE_TTL => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_expire() {
        let mut notice = Notice::default();
        let now = Instant::now();
        notice.set("saved", now);
        assert_eq!(notice.current(now), Some("saved"));
        assert_eq!(notice.current(now + Duration::from_secs(4)), None);
    }

    #[test]
    fn empty_track_message_is_one_based() {
        let err = PlaybackError::EmptyTrack { idx: 0 };
        assert_eq!(err.to_string(), "track 1 has no samples to play");
    }
}
