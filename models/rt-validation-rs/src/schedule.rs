use serde::{Deserialize, Serialize};

use crate::error::{RtError, RtResult};

/// A point where the basic reproduction number starts moving to a new level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangePoint {
    pub r0: f64,
    /// Day the ramp starts.
    pub start: f64,
    /// Days taken to reach `r0`; zero is a step change.
    pub ramp: f64,
}

/// Piecewise-linear R0(t).
///
/// The first change point sets the level before any later point starts. Each
/// later point moves linearly from the previous level to its own `r0` over
/// `ramp` days. Ramps may not overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChangePoint>", into = "Vec<ChangePoint>")]
pub struct TransmissionSchedule {
    points: Vec<ChangePoint>,
}

impl TransmissionSchedule {
    pub fn new(points: Vec<ChangePoint>) -> RtResult<Self> {
        if points.is_empty() {
            return Err(RtError::invalid("transmission schedule has no change points"));
        }
        for point in &points {
            if !point.r0.is_finite() || point.r0 < 0.0 {
                return Err(RtError::invalid(format!(
                    "R0 must be finite and nonnegative, got {}",
                    point.r0
                )));
            }
            if !point.start.is_finite() || !point.ramp.is_finite() || point.ramp < 0.0 {
                return Err(RtError::invalid(format!(
                    "change point at {} has ramp {}",
                    point.start, point.ramp
                )));
            }
        }
        for pair in points.windows(2) {
            let finished = pair[0].start + pair[0].ramp;
            if pair[1].start < finished {
                return Err(RtError::invalid(format!(
                    "change point at day {} starts before the previous ramp ends at day {}",
                    pair[1].start, finished
                )));
            }
        }
        Ok(Self { points })
    }

    pub fn constant(r0: f64) -> RtResult<Self> {
        Self::new(vec![ChangePoint {
            r0,
            start: 0.0,
            ramp: 0.0,
        }])
    }

    /// Three-phase intervention: `r0_pre` until `time_1`, down to `r0_min` over
    /// `days_to_min`, then up to `r0_post` over `days_to_rise` from `time_2`.
    pub fn intervention(
        r0_pre: f64,
        time_1: f64,
        days_to_min: f64,
        r0_min: f64,
        time_2: f64,
        days_to_rise: f64,
        r0_post: f64,
    ) -> RtResult<Self> {
        Self::new(vec![
            ChangePoint {
                r0: r0_pre,
                start: 0.0,
                ramp: 0.0,
            },
            ChangePoint {
                r0: r0_min,
                start: time_1,
                ramp: days_to_min,
            },
            ChangePoint {
                r0: r0_post,
                start: time_2,
                ramp: days_to_rise,
            },
        ])
    }

    pub fn points(&self) -> &[ChangePoint] {
        &self.points
    }

    /// First simulation day affected by the first change after the base level,
    /// `None` for a constant schedule.
    pub fn first_change_day(&self) -> Option<usize> {
        self.points.get(1).map(|p| p.start.max(0.0).ceil() as usize)
    }

    pub fn r0_at(&self, t: f64) -> f64 {
        let mut level = self.points[0].r0;
        for point in &self.points[1..] {
            if t < point.start {
                break;
            }
            let progress = if point.ramp > 0.0 {
                ((t - point.start) / point.ramp).min(1.0)
            } else {
                1.0
            };
            level += (point.r0 - level) * progress;
        }
        level
    }
}

impl TryFrom<Vec<ChangePoint>> for TransmissionSchedule {
    type Error = RtError;

    fn try_from(points: Vec<ChangePoint>) -> RtResult<Self> {
        Self::new(points)
    }
}

impl From<TransmissionSchedule> for Vec<ChangePoint> {
    fn from(schedule: TransmissionSchedule) -> Self {
        schedule.points
    }
}
