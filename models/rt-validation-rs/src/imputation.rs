use rand::rngs::StdRng;

use crate::{
    delay::{DelayDistribution, MEAN_DELAY_DRAWS},
    error::{RtError, RtResult},
    series::IncidenceSeries,
};

/// Recovers infection days from observed counts and the delay that produced
/// them.
///
/// [`MeanShiftImputer`] is the crude baseline. A deconvolution imputer
/// (Richardson-Lucy style) takes the same inputs and can replace it wherever
/// an `InfectionTimeImputer` is accepted.
pub trait InfectionTimeImputer {
    fn impute(
        &self,
        observed: &IncidenceSeries,
        delay: &dyn DelayDistribution,
        rng: &mut StdRng,
    ) -> RtResult<IncidenceSeries>;
}

/// Moves every observed count back by the rounded mean delay.
#[derive(Debug, Clone)]
pub struct MeanShiftImputer {
    /// Draws averaged to estimate the mean delay.
    pub mean_draws: usize,
    /// Name given to the imputed series.
    pub name: String,
}

impl Default for MeanShiftImputer {
    fn default() -> Self {
        Self {
            mean_draws: MEAN_DELAY_DRAWS,
            name: "imputed".to_string(),
        }
    }
}

impl InfectionTimeImputer for MeanShiftImputer {
    fn impute(
        &self,
        observed: &IncidenceSeries,
        delay: &dyn DelayDistribution,
        rng: &mut StdRng,
    ) -> RtResult<IncidenceSeries> {
        if observed.is_empty() {
            return Err(RtError::EmptyInput {
                series: observed.name().to_string(),
            });
        }
        let mean_delay = delay.sampled_mean(self.mean_draws, rng);
        let shift = mean_delay.round().max(0.0) as usize;
        tracing::debug!(
            series = observed.name(),
            mean_delay,
            shift,
            "shifting observations back"
        );
        Ok(shift_back(observed, shift).renamed(&self.name))
    }
}

/// `result[t] = series[t + days]` over the days `series` covers, zero where
/// `t + days` falls outside it.
pub fn shift_back(series: &IncidenceSeries, days: usize) -> IncidenceSeries {
    let counts = series.days().map(|(day, _)| series.get(day + days)).collect();
    IncidenceSeries::from_counts(series.name(), series.start_day(), counts)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{delay::FixedDelay, rng::make_rng};

    #[test]
    fn test_shift_back() {
        let observed = IncidenceSeries::from_counts("observed", 2, vec![0.0, 1.0, 5.0, 7.0]);
        let shifted = shift_back(&observed, 2);
        assert_eq!(shifted.start_day(), 2);
        assert_eq!(shifted.counts(), &[5.0, 7.0, 0.0, 0.0]);
        assert_eq!(shift_back(&observed, 0), observed);
        assert!(shift_back(&observed, 10).is_all_zero());
    }

    #[test]
    fn test_mean_shift_uses_rounded_mean() {
        let counts = vec![0.0, 0.0, 0.0, 4.0, 6.0];
        let observed = IncidenceSeries::from_counts("observed", 0, counts);
        let delay = FixedDelay::new(2.6).unwrap();
        let mut rng = make_rng(Some(3));
        let imputed = MeanShiftImputer::default()
            .impute(&observed, &delay, &mut rng)
            .unwrap();
        assert_eq!(imputed.name(), "imputed");
        assert_eq!(imputed.counts(), &[0.0, 4.0, 6.0, 0.0, 0.0]);
    }

    #[test]
    fn test_imputer_is_swappable() {
        let imputers: Vec<Box<dyn InfectionTimeImputer>> = vec![Box::new(MeanShiftImputer {
            mean_draws: 10,
            name: "shifted".to_string(),
        })];
        let observed = IncidenceSeries::from_counts("observed", 0, vec![1.0, 2.0]);
        let delay = FixedDelay::new(1.0).unwrap();
        let mut rng = make_rng(Some(3));
        for imputer in &imputers {
            let imputed = imputer.impute(&observed, &delay, &mut rng).unwrap();
            assert_eq!(imputed.counts(), &[2.0, 0.0]);
        }
    }

    #[test]
    fn test_empty_observed() {
        let delay = FixedDelay::new(1.0).unwrap();
        let mut rng = make_rng(Some(3));
        let err = MeanShiftImputer::default().impute(
            &IncidenceSeries::zeros("observed", 0, 0),
            &delay,
            &mut rng,
        );
        assert!(matches!(err, Err(RtError::EmptyInput { .. })));
    }

    proptest! {
        #[test]
        fn shifts_compose(
            counts in prop::collection::vec(0.0f64..500.0, 0..60),
            start in 0usize..20,
            first in 0usize..30,
            second in 0usize..30,
        ) {
            let series = IncidenceSeries::from_counts("observed", start, counts);
            let twice = shift_back(&shift_back(&series, first), second);
            prop_assert_eq!(twice, shift_back(&series, first + second));
        }
    }
}
