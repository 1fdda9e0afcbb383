//! Instantaneous reproduction number over sliding windows (Cori et al. 2013).
//!
//! Incidence is modelled as Poisson with mean `R * Λ_t`, where `Λ_t` is the
//! incidence convolved with the discretised serial interval. With a
//! Gamma(shape 1, rate 0.2) prior, the posterior for a window `[s, e]` is
//! Gamma(1 + Σ I, rate 0.2 + Σ Λ).

use rand::{distr::Distribution, rngs::StdRng};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::{
    error::{RtError, RtResult},
    rng::make_rng,
    serial_interval::{SerialInterval, discretise_gamma},
    series::IncidenceSeries,
};

pub const PRIOR_SHAPE: f64 = 1.0;
pub const PRIOR_RATE: f64 = 0.2;
pub const LOWER_QUANTILE: f64 = 0.025;
pub const UPPER_QUANTILE: f64 = 0.975;

/// Incidence below this, up to the end of the first window, means the
/// estimates start too early in the epidemic.
const EARLY_INCIDENCE_THRESHOLD: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RtWindow {
    pub t_start: usize,
    pub t_end: usize,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RtEstimate {
    /// Name of the incidence series the estimate was computed from.
    pub series: String,
    pub window: usize,
    pub windows: Vec<RtWindow>,
}

impl RtEstimate {
    /// `rt_<series>_mean`, `rt_<series>_lower`, `rt_<series>_upper`.
    pub fn column_names(&self) -> [String; 3] {
        ["mean", "lower", "upper"].map(|suffix| format!("rt_{}_{suffix}", self.series))
    }

    pub fn at_end(&self, t_end: usize) -> Option<&RtWindow> {
        self.windows.iter().find(|w| w.t_end == t_end)
    }

    /// End day of the first window ending after `after_day` whose mean is
    /// below `threshold`.
    pub fn first_end_below(&self, threshold: f64, after_day: usize) -> Option<usize> {
        self.windows
            .iter()
            .find(|w| w.t_end > after_day && w.mean < threshold)
            .map(|w| w.t_end)
    }
}

#[derive(Debug, Clone)]
pub struct RtEstimator {
    pub window: usize,
    pub serial_interval: SerialInterval,
    /// Seed for serial interval and posterior sampling.
    pub seed: Option<u64>,
}

impl RtEstimator {
    pub fn new(window: usize, serial_interval: SerialInterval, seed: Option<u64>) -> Self {
        Self {
            window,
            serial_interval,
            seed,
        }
    }

    pub fn estimate(&self, incidence: &IncidenceSeries) -> RtResult<RtEstimate> {
        let window = self.window;
        let len = incidence.len();
        if window == 0 {
            return Err(RtError::insufficient("window width must be at least one day"));
        }
        if len < window + 1 {
            return Err(RtError::insufficient(format!(
                "series `{}` has {len} days, a {window}-day window needs at least {}",
                incidence.name(),
                window + 1
            )));
        }
        let counts = incidence.counts();
        // First window starts on the second day, last one ends on the last day
        let starts: Vec<usize> = (1..=len - window).collect();

        let early_incidence: f64 = counts[..window + 1].iter().sum();
        if early_incidence < EARLY_INCIDENCE_THRESHOLD {
            tracing::warn!(
                series = incidence.name(),
                early_incidence,
                "few cases before the first window ends, early estimates are unreliable"
            );
        }

        let mut rng = make_rng(self.seed);
        let pairs = self.serial_interval.sample_pairs(&mut rng)?;
        let shapes: Vec<f64> = starts
            .iter()
            .map(|&s| PRIOR_SHAPE + counts[s..s + window].iter().sum::<f64>())
            .collect();
        // rates[pair][window]
        let mut rates = Vec::with_capacity(pairs.len());
        for &(mean, std) in &pairs {
            let weights = discretise_gamma(len, mean, std)?;
            let infectivity = overall_infectivity(counts, &weights);
            rates.push(
                starts
                    .iter()
                    .map(|&s| PRIOR_RATE + infectivity[s..s + window].iter().sum::<f64>())
                    .collect::<Vec<f64>>(),
            );
        }

        let mut windows = Vec::with_capacity(starts.len());
        for (i, &s) in starts.iter().enumerate() {
            let t_start = incidence.start_day() + s;
            let t_end = t_start + window - 1;
            let summary = match self.serial_interval.draws_per_pair() {
                None => exact_posterior(shapes[i], rates[0][i]),
                Some(draws) => {
                    sampled_posterior(shapes[i], rates.iter().map(|r| r[i]), draws, &mut rng)
                }
            };
            match summary {
                Some((mean, lower, upper)) => windows.push(RtWindow {
                    t_start,
                    t_end,
                    mean,
                    lower,
                    upper,
                }),
                None => tracing::warn!(
                    series = incidence.name(),
                    t_start,
                    t_end,
                    "posterior undefined, skipping window"
                ),
            }
        }
        tracing::debug!(
            series = incidence.name(),
            window,
            windows = windows.len(),
            "estimated Rt"
        );
        Ok(RtEstimate {
            series: incidence.name().to_string(),
            window,
            windows,
        })
    }
}

/// `Λ[t] = Σ_{s=1..=t} I[t - s] w[s]`.
fn overall_infectivity(counts: &[f64], weights: &[f64]) -> Vec<f64> {
    (0..counts.len())
        .map(|t| {
            (1..=t)
                .filter_map(|s| weights.get(s).map(|w| counts[t - s] * w))
                .sum()
        })
        .collect()
}

fn exact_posterior(shape: f64, rate: f64) -> Option<(f64, f64, f64)> {
    let posterior = Gamma::new(shape, rate).ok()?;
    let summary = (
        shape / rate,
        posterior.inverse_cdf(LOWER_QUANTILE),
        posterior.inverse_cdf(UPPER_QUANTILE),
    );
    finite(summary)
}

/// Pools `draws` posterior samples per serial interval and summarises them.
fn sampled_posterior(
    shape: f64,
    rates: impl Iterator<Item = f64>,
    draws: usize,
    rng: &mut StdRng,
) -> Option<(f64, f64, f64)> {
    let mut samples = Vec::new();
    for rate in rates {
        let Ok(posterior) = rand_distr::Gamma::new(shape, 1.0 / rate) else {
            continue;
        };
        samples.extend((0..draws).map(|_| posterior.sample(rng)));
    }
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.total_cmp(b));
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    finite((
        mean,
        quantile(&samples, LOWER_QUANTILE),
        quantile(&samples, UPPER_QUANTILE),
    ))
}

fn finite(summary: (f64, f64, f64)) -> Option<(f64, f64, f64)> {
    let (mean, lower, upper) = summary;
    (mean.is_finite() && lower.is_finite() && upper.is_finite()).then_some(summary)
}

/// Linear interpolation between order statistics of a sorted sample.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial_interval::SerialIntervalMode;

    fn constant_incidence(days: usize, count: f64) -> IncidenceSeries {
        IncidenceSeries::from_counts("infections", 0, vec![count; days])
    }

    fn estimator(mode: SerialIntervalMode, window: usize) -> RtEstimator {
        RtEstimator::new(
            window,
            SerialInterval::from_moments(mode, 8.0, 32.0).unwrap(),
            Some(2024),
        )
    }

    #[test]
    fn test_constant_incidence_converges_to_one() {
        let estimate = estimator(SerialIntervalMode::Uncertain, 7)
            .estimate(&constant_incidence(60, 100.0))
            .unwrap();
        assert_eq!(estimate.windows.len(), 53);
        let last = estimate.windows.last().unwrap();
        assert_eq!((last.t_start, last.t_end), (53, 59));
        assert!((last.mean - 1.0).abs() < 0.02);
        assert!(last.lower < last.mean && last.mean < last.upper);
        for w in &estimate.windows[estimate.windows.len() - 10..] {
            assert!((w.mean - 1.0).abs() < 0.1);
        }
    }

    #[test]
    fn test_parametric_agrees_with_uncertain() {
        let incidence = constant_incidence(60, 100.0);
        let exact = estimator(SerialIntervalMode::Parametric, 7)
            .estimate(&incidence)
            .unwrap();
        let sampled = estimator(SerialIntervalMode::Uncertain, 7)
            .estimate(&incidence)
            .unwrap();
        let (a, b) = (exact.windows.last().unwrap(), sampled.windows.last().unwrap());
        assert!((a.mean - b.mean).abs() < 0.02);
        assert!(a.lower < a.mean && a.mean < a.upper);
    }

    #[test]
    fn test_exact_posterior_values() {
        // Σ I = 20 and Σ Λ = 10 over the window
        let (mean, lower, upper) =
            exact_posterior(PRIOR_SHAPE + 20.0, PRIOR_RATE + 10.0).unwrap();
        assert!((mean - 21.0 / 10.2).abs() < 1e-12);
        assert!(lower < mean && mean < upper);
    }

    #[test]
    fn test_seeded_estimates_are_identical() {
        let incidence = IncidenceSeries::from_counts(
            "infections",
            0,
            (0..40).map(|t| (10.0 + 3.0 * t as f64).round()).collect(),
        );
        let first = estimator(SerialIntervalMode::Uncertain, 7)
            .estimate(&incidence)
            .unwrap();
        let second = estimator(SerialIntervalMode::Uncertain, 7)
            .estimate(&incidence)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_window_larger_than_data() {
        let incidence = constant_incidence(20, 5.0);
        for window in [30, 20, 0] {
            let err = estimator(SerialIntervalMode::Parametric, window).estimate(&incidence);
            assert!(matches!(err, Err(RtError::InsufficientData { .. })));
        }
    }

    #[test]
    fn test_smallest_valid_series() {
        let estimate = estimator(SerialIntervalMode::Parametric, 7)
            .estimate(&constant_incidence(8, 50.0))
            .unwrap();
        assert_eq!(estimate.windows.len(), 1);
        assert_eq!((estimate.windows[0].t_start, estimate.windows[0].t_end), (1, 7));
    }

    #[test]
    fn test_windows_use_series_days() {
        let incidence = IncidenceSeries::from_counts("infections", 10, vec![20.0; 15]);
        let estimate = estimator(SerialIntervalMode::Parametric, 5)
            .estimate(&incidence)
            .unwrap();
        let first = estimate.windows.first().unwrap();
        assert_eq!((first.t_start, first.t_end), (11, 15));
        assert_eq!(estimate.windows.last().unwrap().t_end, 24);
        assert!(estimate.at_end(15).is_some());
        assert!(estimate.at_end(10).is_none());
    }

    #[test]
    fn test_column_names() {
        let estimate = RtEstimate {
            series: "imputed".to_string(),
            window: 7,
            windows: vec![],
        };
        assert_eq!(
            estimate.column_names(),
            ["rt_imputed_mean", "rt_imputed_lower", "rt_imputed_upper"]
        );
    }

    #[test]
    fn test_overall_infectivity() {
        let lambda = overall_infectivity(&[1.0, 2.0, 3.0], &[0.0, 0.5, 0.5]);
        assert_eq!(lambda, vec![0.0, 0.5, 1.5]);
    }

    #[test]
    fn test_quantile() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.0), 1.0);
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 1.0), 4.0);
        assert_eq!(quantile(&[7.0], 0.975), 7.0);
    }

    #[test]
    fn test_first_end_below() {
        let estimate = RtEstimate {
            series: "infections".to_string(),
            window: 2,
            windows: [(1, 2, 2.0), (2, 3, 0.9), (3, 4, 1.1), (4, 5, 0.7)]
                .into_iter()
                .map(|(t_start, t_end, mean)| RtWindow {
                    t_start,
                    t_end,
                    mean,
                    lower: mean - 0.1,
                    upper: mean + 0.1,
                })
                .collect(),
        };
        assert_eq!(estimate.first_end_below(1.0, 0), Some(3));
        assert_eq!(estimate.first_end_below(1.0, 3), Some(5));
        assert_eq!(estimate.first_end_below(0.5, 0), None);
    }
}
