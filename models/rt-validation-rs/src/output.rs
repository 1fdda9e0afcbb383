use serde::{Deserialize, Serialize};

use crate::series::IncidenceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub time: usize,
    pub susceptible: f64,
    pub exposed: f64,
    pub infectious: f64,
    pub recovered: f64,
    /// New infections (S -> E) during the step ending at `time`.
    pub new_infections: f64,
    /// Schedule R0 used for the step.
    pub r0: f64,
    /// R0 scaled by the susceptible fraction.
    pub rt: f64,
}

impl TrajectoryRow {
    pub fn total(&self) -> f64 {
        self.susceptible + self.exposed + self.infectious + self.recovered
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationTrajectory {
    pub rows: Vec<TrajectoryRow>,
}

impl SimulationTrajectory {
    pub fn with_capacity(len: usize) -> SimulationTrajectory {
        SimulationTrajectory {
            rows: Vec::with_capacity(len),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Daily new infections as an incidence series starting at day 0.
    pub fn infections(&self, name: &str) -> IncidenceSeries {
        IncidenceSeries::from_counts(
            name,
            0,
            self.rows.iter().map(|r| r.new_infections).collect(),
        )
    }

    pub fn row_at(&self, time: usize) -> Option<&TrajectoryRow> {
        self.rows.get(time).filter(|r| r.time == time)
    }
}
