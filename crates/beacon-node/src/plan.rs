//! Scripted button input for demo deployments.
//!
//! A click plan reads `<initiator>:<gesture>@<seconds>`, for example
//! `2:double@1.5` presses initiator 2's button twice starting 1.5 s into the
//! run. Initiators are numbered from 1 and the number is also the device's
//! origin id.

use std::{str::FromStr, time::Duration};

use beacon_core::{ButtonEdge, EventCode};
use thiserror::Error;

/// Hold time of a scripted short click.
pub const CLICK_HOLD: Duration = Duration::from_millis(100);

/// Gap between scripted clicks of one gesture.
pub const CLICK_GAP: Duration = Duration::from_millis(150);

/// Default hold time of a scripted long press.
pub const DEFAULT_LONG_PRESS_HOLD: Duration = Duration::from_secs(2);

/// Malformed click plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Not of the form `<initiator>:<gesture>@<seconds>`.
    #[error("expected <initiator>:<gesture>@<seconds>, got {0:?}")]
    Syntax(String),

    /// Initiator index is not a positive number below 256.
    #[error("invalid initiator {0:?}")]
    Initiator(String),

    /// Gesture is not single, double, triple or long.
    #[error("unknown gesture {0:?}")]
    Gesture(String),

    /// Start time is not a non-negative number of seconds.
    #[error("invalid start time {0:?}")]
    Time(String),
}

/// One scripted gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickPlan {
    /// 1-based initiator number
    pub initiator: u8,
    /// Gesture to perform
    pub code: EventCode,
    /// Offset of the first press from the start of the run
    pub at: Duration,
}

impl ClickPlan {
    /// Button edges performing this gesture, with their offsets from the
    /// start of the run.
    #[must_use]
    pub fn edges(&self, long_press_hold: Duration) -> Vec<(Duration, ButtonEdge)> {
        let (clicks, hold) = match self.code {
            EventCode::Single => (1, CLICK_HOLD),
            EventCode::Double => (2, CLICK_HOLD),
            EventCode::Triple => (3, CLICK_HOLD),
            EventCode::LongPress => (1, long_press_hold),
        };

        let mut edges = Vec::with_capacity(clicks * 2);
        let mut press = self.at;
        for _ in 0..clicks {
            edges.push((press, ButtonEdge::Press));
            edges.push((press + hold, ButtonEdge::Release));
            press += hold + CLICK_GAP;
        }
        edges
    }
}

impl FromStr for ClickPlan {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (initiator, rest) = s.split_once(':').ok_or_else(|| PlanError::Syntax(s.into()))?;
        let (gesture, at) = rest.split_once('@').ok_or_else(|| PlanError::Syntax(s.into()))?;

        let initiator = match initiator.trim().parse::<u8>() {
            Ok(n) if n > 0 => n,
            _ => return Err(PlanError::Initiator(initiator.into())),
        };

        let code = match gesture.trim().to_ascii_lowercase().as_str() {
            "single" | "1" => EventCode::Single,
            "double" | "2" => EventCode::Double,
            "triple" | "3" => EventCode::Triple,
            "long" | "long-press" | "4" => EventCode::LongPress,
            _ => return Err(PlanError::Gesture(gesture.into())),
        };

        // Millisecond resolution, the granularity of the button.
        let at = match at.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 && secs < 1e9 => {
                Duration::from_millis((secs * 1000.0).round() as u64)
            },
            _ => return Err(PlanError::Time(at.into())),
        };

        Ok(Self { initiator, code, at })
    }
}
