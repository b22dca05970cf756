//! Multi-click decoder.
//!
//! Turns debounced press/release edges into event codes. Short presses are
//! counted and decoded once the button has been quiet for the multi-click
//! window; every new click postpones the flush. A press held longer than the
//! long press threshold bypasses counting entirely and is reported at
//! release.
//!
//! ```text
//! click            ─┐_┌──────────────── flush → Single
//! click click      ─┐_┌─┐_┌──────────── flush → Double
//! hold > 1.5s      ─┐______________┌─── release → LongPress
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{env::Timestamp, timer::Timers};

/// Button gestures and the event codes they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventCode {
    /// One short click
    Single = 1,
    /// Two short clicks
    Double = 2,
    /// Three short clicks
    Triple = 3,
    /// Press held past the long press threshold
    LongPress = 4,
}

impl EventCode {
    /// Code carried in Event packets.
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire code. `None` outside 1-4.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            4 => Some(Self::LongPress),
            _ => None,
        }
    }

    fn from_click_count(count: u8) -> Option<Self> {
        match count {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            3 => Some(Self::Triple),
            _ => None,
        }
    }
}

/// Debounced button edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    /// Button went down
    Press,
    /// Button went up
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickTimer {
    Flush,
}

/// Press/release to event code decoder.
#[derive(Debug, Clone)]
pub struct ClickDecoder<I> {
    multi_click_window: Duration,
    long_press_threshold: Duration,
    press_start: Option<I>,
    click_count: u8,
    timers: Timers<ClickTimer, I>,
}

impl<I: Timestamp> ClickDecoder<I> {
    /// Create a decoder with the given windows.
    pub fn new(multi_click_window: Duration, long_press_threshold: Duration) -> Self {
        Self {
            multi_click_window,
            long_press_threshold,
            press_start: None,
            click_count: 0,
            timers: Timers::new(),
        }
    }

    /// Feed one edge. Returns a code if the edge completed a long press.
    pub fn handle_edge(&mut self, edge: ButtonEdge, now: I) -> Option<EventCode> {
        match edge {
            ButtonEdge::Press => {
                self.press(now);
                None
            },
            ButtonEdge::Release => self.release(now),
        }
    }

    /// Record the start of a press.
    pub fn press(&mut self, now: I) {
        self.press_start = Some(now);
    }

    /// Handle a release.
    ///
    /// A release without a recorded press is ignored.
    pub fn release(&mut self, now: I) -> Option<EventCode> {
        let start = self.press_start.take()?;
        let held = now - start;

        if held > self.long_press_threshold {
            self.reset();
            tracing::debug!(?held, "long press");
            return Some(EventCode::LongPress);
        }

        self.click_count = self.click_count.saturating_add(1);
        self.timers.arm(ClickTimer::Flush, now + self.multi_click_window);
        None
    }

    /// Fire the flush timer if due. Returns the decoded burst, if any.
    pub fn tick(&mut self, now: I) -> Option<EventCode> {
        let mut decoded = None;
        while let Some(ClickTimer::Flush) = self.timers.pop_expired(now) {
            let count = self.click_count;
            self.click_count = 0;
            decoded = EventCode::from_click_count(count);
            if decoded.is_none() {
                tracing::debug!(count, "click burst has no mapping");
            }
        }
        decoded
    }

    /// Deadline of the pending flush, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<I> {
        self.timers.next_deadline()
    }

    /// Clicks accumulated since the last flush.
    #[must_use]
    pub fn click_count(&self) -> u8 {
        self.click_count
    }

    fn reset(&mut self) {
        self.click_count = 0;
        self.press_start = None;
        self.timers.cancel(ClickTimer::Flush);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::config::{DEFAULT_LONG_PRESS_THRESHOLD, DEFAULT_MULTI_CLICK_WINDOW};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn decoder() -> ClickDecoder<Instant> {
        ClickDecoder::new(DEFAULT_MULTI_CLICK_WINDOW, DEFAULT_LONG_PRESS_THRESHOLD)
    }

    /// Click for `hold`, starting at `at`. Returns the release time.
    fn click(decoder: &mut ClickDecoder<Instant>, at: Instant, hold: Duration) -> Instant {
        decoder.press(at);
        assert_eq!(decoder.release(at + hold), None);
        at + hold
    }

    #[test]
    fn single_click_flushes_after_window() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        let released = click(&mut decoder, t0, ms(100));
        assert_eq!(decoder.tick(released + ms(399)), None);
        assert_eq!(decoder.tick(released + ms(400)), Some(EventCode::Single));
        assert_eq!(decoder.next_deadline(), None);
    }

    #[test]
    fn two_clicks_within_window_decode_as_double() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        let first = click(&mut decoder, t0, ms(100));
        // The first flush deadline passes without a tick in between: the
        // second click replaced it.
        let second = click(&mut decoder, first + ms(200), ms(100));
        assert_eq!(decoder.tick(first + ms(400)), None);
        assert_eq!(decoder.tick(second + ms(400)), Some(EventCode::Double));
        assert_eq!(decoder.tick(second + ms(5000)), None);
    }

    #[test]
    fn three_clicks_decode_as_triple() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        let mut at = t0;
        for _ in 0..3 {
            at = click(&mut decoder, at, ms(80)) + ms(150);
        }
        assert_eq!(decoder.tick(at + ms(400)), Some(EventCode::Triple));
    }

    #[test]
    fn four_clicks_emit_nothing() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        let mut at = t0;
        for _ in 0..4 {
            at = click(&mut decoder, at, ms(80)) + ms(150);
        }
        assert_eq!(decoder.click_count(), 4);
        assert_eq!(decoder.tick(at + ms(400)), None);
        assert_eq!(decoder.click_count(), 0);
    }

    #[test]
    fn long_press_emits_immediately() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        decoder.press(t0);
        assert_eq!(decoder.release(t0 + ms(2000)), Some(EventCode::LongPress));
        assert_eq!(decoder.next_deadline(), None);
        assert_eq!(decoder.tick(t0 + ms(10_000)), None);
    }

    #[test]
    fn long_press_discards_pending_clicks() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        let released = click(&mut decoder, t0, ms(100));
        decoder.press(released + ms(100));
        assert_eq!(decoder.release(released + ms(1700)), Some(EventCode::LongPress));
        assert_eq!(decoder.click_count(), 0);
        assert_eq!(decoder.tick(released + ms(10_000)), None);
    }

    #[test]
    fn threshold_itself_is_a_click() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        decoder.press(t0);
        assert_eq!(decoder.release(t0 + DEFAULT_LONG_PRESS_THRESHOLD), None);
        assert_eq!(decoder.click_count(), 1);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        assert_eq!(decoder.release(t0 + ms(5000)), None);
        assert_eq!(decoder.click_count(), 0);
        assert_eq!(decoder.next_deadline(), None);
    }

    #[test]
    fn handle_edge_dispatches() {
        let t0 = Instant::now();
        let mut decoder = decoder();

        assert_eq!(decoder.handle_edge(ButtonEdge::Press, t0), None);
        assert_eq!(decoder.handle_edge(ButtonEdge::Release, t0 + ms(1600)), Some(EventCode::LongPress));
    }

    #[test]
    fn event_codes_round_trip_wire_values() {
        for code in [EventCode::Single, EventCode::Double, EventCode::Triple, EventCode::LongPress] {
            assert_eq!(EventCode::from_u8(code.to_u8()), Some(code));
        }
        assert_eq!(EventCode::from_u8(0), None);
        assert_eq!(EventCode::from_u8(5), None);
    }
}
