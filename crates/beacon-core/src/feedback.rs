//! Timed visual feedback.
//!
//! Maps a code to a pattern over three indicator channels and turns it off
//! again after a duration. What happens when a new request arrives while a
//! pattern is still showing is decided by [`FeedbackPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{env::Timestamp, timer::Timers};

/// State of the three indicator channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedPattern {
    /// First channel
    pub red: bool,
    /// Second channel
    pub green: bool,
    /// Third channel
    pub blue: bool,
}

impl LedPattern {
    /// All channels off.
    pub const OFF: Self = Self { red: false, green: false, blue: false };

    /// Pattern for a feedback code. Unknown codes render as [`Self::OFF`].
    #[must_use]
    pub fn for_code(code: u8) -> Self {
        match code {
            1 => Self { red: true, ..Self::OFF },
            2 => Self { blue: true, ..Self::OFF },
            3 => Self { red: true, green: true, ..Self::OFF },
            4 => Self { green: true, ..Self::OFF },
            _ => Self::OFF,
        }
    }

    /// Whether any channel is lit.
    #[must_use]
    pub fn is_lit(&self) -> bool {
        self.red || self.green || self.blue
    }
}

/// Handling of `show` requests that arrive while a pattern is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackPolicy {
    /// Replace the displayed pattern and restart the clear timer.
    Retrigger,
    /// Same code restarts the clear timer with the new duration; any other
    /// code is ignored until the display clears.
    ExtendSameColor,
    /// Ignore every request until the display clears.
    IgnoreWhileBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedbackTimer {
    Clear,
}

/// Feedback display state machine.
///
/// Methods return the pattern to render when the display changes, and
/// `None` when it does not.
#[derive(Debug, Clone)]
pub struct Feedback<I> {
    policy: FeedbackPolicy,
    active: Option<u8>,
    timers: Timers<FeedbackTimer, I>,
}

impl<I: Timestamp> Feedback<I> {
    /// Create an idle display with the given busy policy.
    pub fn new(policy: FeedbackPolicy) -> Self {
        Self { policy, active: None, timers: Timers::new() }
    }

    /// Display `code` for `duration`.
    pub fn show(&mut self, code: u8, duration: Duration, now: I) -> Option<LedPattern> {
        if let Some(active) = self.active {
            match self.policy {
                FeedbackPolicy::Retrigger => {},
                FeedbackPolicy::ExtendSameColor if active == code => {
                    self.timers.arm(FeedbackTimer::Clear, now + duration);
                    tracing::trace!(code, ?duration, "feedback extended");
                    return None;
                },
                FeedbackPolicy::ExtendSameColor | FeedbackPolicy::IgnoreWhileBusy => {
                    tracing::trace!(code, active, "feedback busy, request ignored");
                    return None;
                },
            }
        }

        self.active = Some(code);
        self.timers.arm(FeedbackTimer::Clear, now + duration);
        Some(LedPattern::for_code(code))
    }

    /// Turn the display off now.
    pub fn clear(&mut self) -> Option<LedPattern> {
        self.timers.cancel(FeedbackTimer::Clear);
        self.active.take().map(|_| LedPattern::OFF)
    }

    /// Clear the display if its timer is due.
    pub fn tick(&mut self, now: I) -> Option<LedPattern> {
        let mut rendered = None;
        while let Some(FeedbackTimer::Clear) = self.timers.pop_expired(now) {
            self.active = None;
            rendered = Some(LedPattern::OFF);
        }
        rendered
    }

    /// Code currently displayed.
    #[must_use]
    pub fn active(&self) -> Option<u8> {
        self.active
    }

    /// Whether a pattern is displayed.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Busy policy in effect.
    #[must_use]
    pub fn policy(&self) -> FeedbackPolicy {
        self.policy
    }

    /// When the display will clear, if showing.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.timers.next_deadline()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn codes_map_to_distinct_patterns() {
        let patterns: Vec<_> = (1..=4).map(LedPattern::for_code).collect();
        for (i, a) in patterns.iter().enumerate() {
            assert!(a.is_lit());
            for b in &patterns[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(LedPattern::for_code(0), LedPattern::OFF);
        assert_eq!(LedPattern::for_code(9), LedPattern::OFF);
    }

    #[test]
    fn display_clears_after_duration() {
        let t0 = Instant::now();
        let mut feedback = Feedback::new(FeedbackPolicy::Retrigger);

        assert_eq!(feedback.show(3, secs(2), t0), Some(LedPattern::for_code(3)));
        assert_eq!(feedback.tick(t0 + secs(1)), None);
        assert_eq!(feedback.tick(t0 + secs(2)), Some(LedPattern::OFF));
        assert!(!feedback.is_busy());
    }

    #[test]
    fn retrigger_restarts_clear_timer() {
        let t0 = Instant::now();
        let mut feedback = Feedback::new(FeedbackPolicy::Retrigger);

        feedback.show(1, secs(2), t0);
        assert_eq!(feedback.show(4, secs(2), t0 + secs(1)), Some(LedPattern::for_code(4)));
        assert_eq!(feedback.tick(t0 + secs(2)), None);
        assert_eq!(feedback.active(), Some(4));
        assert_eq!(feedback.tick(t0 + secs(3)), Some(LedPattern::OFF));
    }

    #[test]
    fn extend_same_color_prolongs_display() {
        let t0 = Instant::now();
        let mut feedback = Feedback::new(FeedbackPolicy::ExtendSameColor);

        feedback.show(2, secs(20), t0);
        assert_eq!(feedback.show(2, secs(20), t0 + secs(10)), None);
        assert_eq!(feedback.tick(t0 + secs(20)), None);
        assert_eq!(feedback.tick(t0 + secs(30)), Some(LedPattern::OFF));
    }

    #[test]
    fn extend_same_color_ignores_other_colors() {
        let t0 = Instant::now();
        let mut feedback = Feedback::new(FeedbackPolicy::ExtendSameColor);

        feedback.show(2, secs(20), t0);
        assert_eq!(feedback.show(3, secs(20), t0 + secs(10)), None);
        assert_eq!(feedback.active(), Some(2));
        assert_eq!(feedback.tick(t0 + secs(20)), Some(LedPattern::OFF));

        // Idle again: a new color is accepted.
        assert_eq!(feedback.show(3, secs(20), t0 + secs(21)), Some(LedPattern::for_code(3)));
    }

    #[test]
    fn ignore_while_busy_keeps_first_request() {
        let t0 = Instant::now();
        let mut feedback = Feedback::new(FeedbackPolicy::IgnoreWhileBusy);

        feedback.show(1, secs(20), t0);
        assert_eq!(feedback.show(1, secs(20), t0 + secs(10)), None);
        assert_eq!(feedback.tick(t0 + secs(20)), Some(LedPattern::OFF));
    }

    #[test]
    fn clear_turns_off_and_cancels_timer() {
        let t0 = Instant::now();
        let mut feedback = Feedback::new(FeedbackPolicy::Retrigger);

        assert_eq!(feedback.clear(), None);
        feedback.show(1, secs(2), t0);
        assert_eq!(feedback.clear(), Some(LedPattern::OFF));
        assert_eq!(feedback.next_deadline(), None);
        assert_eq!(feedback.tick(t0 + secs(5)), None);
    }
}
