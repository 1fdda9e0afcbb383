//! Serial interval assumptions for the Rt estimator.
//!
//! The serial interval is a gamma distribution shifted by one day and
//! discretised so that `w[0] = 0`. With an uncertain serial interval the
//! estimator integrates over sampled `(mean, std)` pairs.

use rand::{distr::Distribution, rngs::StdRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Gamma};

use crate::error::{RtError, RtResult};

/// Attempts allowed when drawing a `(mean, std)` pair inside its bounds.
const MAX_PAIR_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertainSerialInterval {
    pub mean_si: f64,
    pub std_mean_si: f64,
    pub min_mean_si: f64,
    pub max_mean_si: f64,
    pub std_si: f64,
    pub std_std_si: f64,
    pub min_std_si: f64,
    pub max_std_si: f64,
    /// Number of sampled serial interval distributions.
    pub n1: usize,
    /// Posterior draws per sampled distribution and window.
    pub n2: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerialIntervalMode {
    #[default]
    Uncertain,
    Parametric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SerialInterval {
    /// One known gamma serial interval.
    Parametric { mean: f64, std: f64 },
    Uncertain(UncertainSerialInterval),
}

impl SerialInterval {
    pub fn from_moments(mode: SerialIntervalMode, mean: f64, variance: f64) -> RtResult<Self> {
        match mode {
            SerialIntervalMode::Parametric => Self::parametric(mean, variance),
            SerialIntervalMode::Uncertain => Self::uncertain(mean, variance),
        }
    }

    pub fn parametric(mean: f64, variance: f64) -> RtResult<Self> {
        let std = checked_std(mean, variance)?;
        Ok(SerialInterval::Parametric { mean, std })
    }

    /// Mean uncertain within one day (sd 1.5), std within 20% (sd 1.5),
    /// integrated over 50 x 100 draws.
    pub fn uncertain(mean: f64, variance: f64) -> RtResult<Self> {
        let std = checked_std(mean, variance)?;
        if mean - 1.0 <= 1.0 {
            return Err(RtError::insufficient(format!(
                "uncertain serial interval needs a mean above 2 days, got {mean}"
            )));
        }
        Ok(SerialInterval::Uncertain(UncertainSerialInterval {
            mean_si: mean,
            std_mean_si: 1.5,
            min_mean_si: mean - 1.0,
            max_mean_si: mean + 1.0,
            std_si: std,
            std_std_si: 1.5,
            min_std_si: 0.8 * std,
            max_std_si: 1.2 * std,
            n1: 50,
            n2: 100,
        }))
    }

    /// The `(mean, std)` pairs to integrate over.
    pub fn sample_pairs(&self, rng: &mut StdRng) -> RtResult<Vec<(f64, f64)>> {
        match self {
            SerialInterval::Parametric { mean, std } => Ok(vec![(*mean, *std)]),
            SerialInterval::Uncertain(config) => {
                if config.max_mean_si <= config.min_std_si {
                    return Err(RtError::invalid(
                        "serial interval std bounds leave no draw below the mean",
                    ));
                }
                let mean_draw = normal(config.mean_si, config.std_mean_si)?;
                let std_draw = normal(config.std_si, config.std_std_si)?;
                (0..config.n1)
                    .map(|_| {
                        for _ in 0..MAX_PAIR_ATTEMPTS {
                            let mean = mean_draw.sample(rng);
                            let std = std_draw.sample(rng);
                            let in_bounds = (config.min_mean_si..=config.max_mean_si)
                                .contains(&mean)
                                && (config.min_std_si..=config.max_std_si).contains(&std);
                            if in_bounds && std < mean && std > 0.0 {
                                return Ok((mean, std));
                            }
                        }
                        Err(RtError::insufficient(
                            "could not draw a serial interval inside its bounds",
                        ))
                    })
                    .collect()
            }
        }
    }

    /// Posterior draws per pair and window, `None` for the exact posterior.
    pub fn draws_per_pair(&self) -> Option<usize> {
        match self {
            SerialInterval::Parametric { .. } => None,
            SerialInterval::Uncertain(config) => Some(config.n2),
        }
    }
}

fn checked_std(mean: f64, variance: f64) -> RtResult<f64> {
    if !variance.is_finite() || variance <= 0.0 {
        return Err(RtError::insufficient(format!(
            "serial interval variance must be positive, got {variance}"
        )));
    }
    if !mean.is_finite() || mean <= 1.0 {
        return Err(RtError::insufficient(format!(
            "serial interval mean must exceed one day, got {mean}"
        )));
    }
    Ok(variance.sqrt())
}

fn normal(mean: f64, std: f64) -> RtResult<Normal<f64>> {
    Normal::new(mean, std)
        .map_err(|e| RtError::invalid(format!("normal({mean}, {std}): {e}")))
}

/// Discretised serial interval `w[0..len]` for a gamma with the given mean
/// and std, shifted by one day. Normalised to sum to one.
pub fn discretise_gamma(len: usize, mean: f64, std: f64) -> RtResult<Vec<f64>> {
    if !(mean.is_finite() && mean > 1.0 && std.is_finite() && std > 0.0) {
        return Err(RtError::insufficient(format!(
            "cannot discretise serial interval with mean {mean} and std {std}"
        )));
    }
    let shape = ((mean - 1.0) / std).powi(2);
    let scale = std.powi(2) / (mean - 1.0);
    let base = gamma(shape, scale)?;
    let raised = gamma(shape + 1.0, scale)?;
    let cdf = |dist: &Gamma, x: f64| if x <= 0.0 { 0.0 } else { dist.cdf(x) };

    let mut weights: Vec<f64> = (0..len)
        .map(|k| {
            let k = k as f64;
            let w = k * cdf(&base, k) + (k - 2.0) * cdf(&base, k - 2.0)
                - 2.0 * (k - 1.0) * cdf(&base, k - 1.0)
                + shape
                    * scale
                    * (2.0 * cdf(&raised, k - 1.0) - cdf(&raised, k - 2.0) - cdf(&raised, k));
            w.max(0.0)
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter_mut().for_each(|w| *w /= total);
    }
    Ok(weights)
}

fn gamma(shape: f64, scale: f64) -> RtResult<Gamma> {
    Gamma::new(shape, 1.0 / scale)
        .map_err(|e| RtError::invalid(format!("gamma(shape {shape}, scale {scale}): {e}")))
}
