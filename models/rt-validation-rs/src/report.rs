use crate::{estimator::RtEstimate, output::SimulationTrajectory, series::IncidenceSeries};

/// Trajectory truth, incidence series and Rt estimates joined on day.
///
/// Estimates are placed on their window end day; days without a window are
/// left empty.
pub struct ComparisonTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ComparisonTable {
    pub fn build(
        trajectory: &SimulationTrajectory,
        series: &[&IncidenceSeries],
        estimates: &[&RtEstimate],
    ) -> Self {
        let mut headers: Vec<String> = ["time", "r0_true", "rt_true"].map(String::from).into();
        headers.extend(series.iter().map(|s| s.name().to_string()));
        for estimate in estimates {
            headers.extend(estimate.column_names());
        }

        let rows = trajectory
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    row.time.to_string(),
                    row.r0.to_string(),
                    row.rt.to_string(),
                ];
                cells.extend(series.iter().map(|s| s.get(row.time).to_string()));
                for estimate in estimates {
                    match estimate.at_end(row.time) {
                        Some(w) => {
                            cells.extend([w.mean, w.lower, w.upper].map(|v| v.to_string()))
                        }
                        None => cells.extend(std::iter::repeat_n(String::new(), 3)),
                    }
                }
                cells
            })
            .collect();
        Self { headers, rows }
    }

    pub fn header_refs(&self) -> Vec<&str> {
        self.headers.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{estimator::RtWindow, output::TrajectoryRow};

    fn row(time: usize) -> TrajectoryRow {
        TrajectoryRow {
            time,
            susceptible: 90.0,
            exposed: 5.0,
            infectious: 5.0,
            recovered: 0.0,
            new_infections: time as f64,
            r0: 2.0,
            rt: 1.8,
        }
    }

    #[test]
    fn test_join_on_window_end() {
        let trajectory = SimulationTrajectory {
            rows: (0..3).map(row).collect(),
        };
        let infections = trajectory.infections("infections");
        let estimate = RtEstimate {
            series: "infections".to_string(),
            window: 2,
            windows: vec![RtWindow {
                t_start: 1,
                t_end: 2,
                mean: 1.5,
                lower: 1.0,
                upper: 2.0,
            }],
        };
        let table = ComparisonTable::build(&trajectory, &[&infections], &[&estimate]);
        assert_eq!(
            table.header_refs(),
            vec![
                "time",
                "r0_true",
                "rt_true",
                "infections",
                "rt_infections_mean",
                "rt_infections_lower",
                "rt_infections_upper"
            ]
        );
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1], vec!["1", "2", "1.8", "1", "", "", ""]);
        assert_eq!(table.rows[2], vec!["2", "2", "1.8", "2", "1.5", "1", "2"]);
    }
}
