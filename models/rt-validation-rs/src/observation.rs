//! Forward simulation of the observation delay.
//!
//! Every infected individual on day `t` is counted as observed on day
//! `t + round(delay)`, one independent delay draw per individual. Individuals
//! are only moved, never redrawn, so the observed total equals the infection
//! total over the extended horizon. Offsets are capped at
//! [`MAX_DELAY_DAYS`]; draws past the cap are counted on the cap day.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{
    delay::{DelayDistribution, MAX_DELAY_DAYS, MEAN_DELAY_DRAWS},
    error::{RtError, RtResult},
    series::IncidenceSeries,
};

/// Default horizon extension, as a multiple of the mean delay.
pub const HORIZON_MEAN_MULTIPLE: f64 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationOptions {
    /// Days appended after the last infection day, at most
    /// [`MAX_DELAY_DAYS`]. Defaults to ceil(4 x sampled mean delay).
    pub horizon_extension: Option<usize>,
}

pub fn simulate_observations<D>(
    infections: &IncidenceSeries,
    delay: &D,
    options: &ObservationOptions,
    name: &str,
    rng: &mut StdRng,
) -> RtResult<IncidenceSeries>
where
    D: DelayDistribution + ?Sized,
{
    if infections.is_empty() {
        return Err(RtError::EmptyInput {
            series: infections.name().to_string(),
        });
    }
    let extension = match options.horizon_extension {
        Some(days) if days > MAX_DELAY_DAYS => {
            return Err(RtError::invalid(format!(
                "horizon extension of {days} days exceeds {MAX_DELAY_DAYS}"
            )));
        }
        Some(days) => days,
        None => {
            let mean = delay.sampled_mean(MEAN_DELAY_DRAWS, rng);
            ((HORIZON_MEAN_MULTIPLE * mean).ceil().max(0.0) as usize).min(MAX_DELAY_DAYS)
        }
    };
    let horizon = infections
        .len()
        .checked_add(extension)
        .ok_or_else(|| RtError::invalid("observation horizon overflows"))?;
    let mut counts = vec![0.0; horizon];
    if infections.is_all_zero() {
        tracing::debug!(series = infections.name(), "no infections to delay");
        return Ok(IncidenceSeries::from_counts(name, infections.start_day(), counts));
    }

    let mut clamped = 0usize;
    let mut truncated = 0usize;
    for (index, &count) in infections.counts().iter().enumerate() {
        // Fractional (deterministic) incidence is rounded to whole individuals
        let individuals = count.round() as usize;
        if individuals == 0 {
            continue;
        }
        for draw in delay.sample(individuals, rng) {
            let offset = match day_offset(draw) {
                DayOffset::Exact(days) => days,
                DayOffset::Invalid => {
                    clamped += 1;
                    0
                }
                DayOffset::Truncated => {
                    truncated += 1;
                    MAX_DELAY_DAYS
                }
            };
            let target = index
                .checked_add(offset)
                .ok_or_else(|| RtError::invalid("observation day overflows"))?;
            if target >= counts.len() {
                counts.resize(target + 1, 0.0);
            }
            counts[target] += 1.0;
        }
    }
    if clamped > 0 {
        let error = RtError::NumericalInstability {
            day: infections.start_day(),
            detail: format!("{clamped} negative or non-finite delay draws"),
        };
        tracing::warn!(%error, "clamped delays to zero days");
    }
    if truncated > 0 {
        let error = RtError::NumericalInstability {
            day: infections.start_day(),
            detail: format!("{truncated} delay draws longer than {MAX_DELAY_DAYS} days"),
        };
        tracing::warn!(%error, "truncated delays to the maximum delay");
    }
    tracing::debug!(
        series = name,
        days = counts.len(),
        extension,
        "simulated observation delays"
    );
    Ok(IncidenceSeries::from_counts(name, infections.start_day(), counts))
}

enum DayOffset {
    Exact(usize),
    /// Negative or non-finite draw.
    Invalid,
    /// Longer than [`MAX_DELAY_DAYS`].
    Truncated,
}

/// Whole-day offset of a delay draw, rounded to the nearest day.
fn day_offset(delay: f64) -> DayOffset {
    if !delay.is_finite() || delay < 0.0 {
        return DayOffset::Invalid;
    }
    let days = delay.round();
    if days > MAX_DELAY_DAYS as f64 {
        return DayOffset::Truncated;
    }
    DayOffset::Exact(days as usize)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        delay::{FixedDelay, GammaDelay},
        rng::make_rng,
    };

    fn infections(counts: Vec<f64>) -> IncidenceSeries {
        IncidenceSeries::from_counts("infections", 0, counts)
    }

    fn observe<D: DelayDistribution + ?Sized>(
        counts: Vec<f64>,
        delay: &D,
        horizon_extension: Option<usize>,
    ) -> RtResult<IncidenceSeries> {
        let options = ObservationOptions { horizon_extension };
        let mut rng = make_rng(Some(1));
        simulate_observations(&infections(counts), delay, &options, "observed", &mut rng)
    }

    #[test]
    fn test_fixed_delay_shifts_forward() {
        let delay = FixedDelay::new(2.4).unwrap();
        let observed = observe(vec![1.0, 2.0, 3.0], &delay, Some(3)).unwrap();
        assert_eq!(observed.name(), "observed");
        assert_eq!(observed.counts(), &[0.0, 0.0, 1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_default_extension_from_mean() {
        let delay = FixedDelay::new(2.0).unwrap();
        let observed = observe(vec![5.0; 10], &delay, None).unwrap();
        assert_eq!(observed.len(), 10 + 8);
        assert_eq!(observed.total(), 50.0);
    }

    #[test]
    fn test_tail_grows_horizon() {
        let delay = FixedDelay::new(9.0).unwrap();
        let observed = observe(vec![4.0], &delay, Some(1)).unwrap();
        assert_eq!(observed.len(), 10);
        assert_eq!(observed.get(9), 4.0);
    }

    #[test]
    fn test_all_zero_input() {
        let delay = GammaDelay::new(2.0, 3.0).unwrap();
        let observed = observe(vec![0.0; 4], &delay, Some(5)).unwrap();
        assert_eq!(observed.len(), 9);
        assert!(observed.is_all_zero());
    }

    #[test]
    fn test_empty_input() {
        let delay = FixedDelay::new(1.0).unwrap();
        let err = observe(vec![], &delay, None);
        assert!(matches!(err, Err(RtError::EmptyInput { .. })));
    }

    #[test]
    fn test_invalid_draws_stay_on_day() {
        let broken = |n: usize, _rng: &mut StdRng| vec![-3.0; n];
        let observed = observe(vec![2.0, 1.0], &broken, Some(0)).unwrap();
        assert_eq!(observed.counts(), &[2.0, 1.0]);
    }

    #[test]
    fn test_fractional_counts_are_rounded() {
        let delay = FixedDelay::new(0.0).unwrap();
        let observed = observe(vec![1.4, 2.6], &delay, Some(0)).unwrap();
        assert_eq!(observed.counts(), &[1.0, 3.0]);
    }

    #[test]
    fn test_huge_draws_land_on_max_delay() {
        let huge = |n: usize, _rng: &mut StdRng| vec![1e20; n];
        let observed = observe(vec![0.0, 1.0], &huge, Some(0)).unwrap();
        assert_eq!(observed.len(), 1 + MAX_DELAY_DAYS + 1);
        assert_eq!(observed.get(1 + MAX_DELAY_DAYS), 1.0);
        assert_eq!(observed.total(), 1.0);
    }

    #[test]
    fn test_default_extension_is_capped() {
        let huge = |n: usize, _rng: &mut StdRng| vec![f64::MAX; n];
        let observed = observe(vec![3.0; 2], &huge, None).unwrap();
        assert_eq!(observed.len(), 2 + MAX_DELAY_DAYS);
        assert_eq!(observed.total(), 6.0);
    }

    #[test]
    fn test_rejects_long_horizon_extension() {
        let delay = FixedDelay::new(1.0).unwrap();
        assert!(matches!(
            observe(vec![1.0], &delay, Some(usize::MAX)),
            Err(RtError::InvalidParameters { .. })
        ));
        assert!(observe(vec![1.0], &delay, Some(MAX_DELAY_DAYS)).is_ok());
    }

    proptest! {
        #[test]
        fn observed_total_matches_infections(
            counts in prop::collection::vec(0u32..60, 1..40),
            shape in 0.5f64..5.0,
            scale in 0.2f64..4.0,
            seed in any::<u64>(),
        ) {
            let counts: Vec<f64> = counts.into_iter().map(f64::from).collect();
            let series = infections(counts);
            let delay = GammaDelay::new(shape, scale).unwrap();
            let mut rng = make_rng(Some(seed));
            let observed = simulate_observations(
                &series,
                &delay,
                &ObservationOptions::default(),
                "observed",
                &mut rng,
            )
            .unwrap();
            prop_assert_eq!(observed.total(), series.total());
            prop_assert!(observed.len() >= series.len());
            prop_assert_eq!(observed.start_day(), series.start_day());
        }
    }
}
