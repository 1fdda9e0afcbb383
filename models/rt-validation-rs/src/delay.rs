use rand::{distr::Distribution, rngs::StdRng};
use rand_distr::{Gamma, LogNormal};
use serde::{Deserialize, Serialize};

use crate::error::{RtError, RtResult};

/// Draws used when a delay mean has to be estimated by sampling.
pub const MEAN_DELAY_DRAWS: usize = 1000;

/// Longest infection-to-observation delay, in days. Longer draws are counted
/// on this day.
pub const MAX_DELAY_DAYS: usize = 365;

/// Source of infection-to-observation delays, in days.
///
/// Any `Fn(usize, &mut StdRng) -> Vec<f64>` closure is a delay distribution.
pub trait DelayDistribution {
    /// Draws `n` delays.
    fn sample(&self, n: usize, rng: &mut StdRng) -> Vec<f64>;

    /// Mean of `n` draws. Non-finite draws are ignored.
    fn sampled_mean(&self, n: usize, rng: &mut StdRng) -> f64 {
        let draws: Vec<f64> = self
            .sample(n, rng)
            .into_iter()
            .filter(|d| d.is_finite())
            .collect();
        if draws.is_empty() {
            return 0.0;
        }
        draws.iter().sum::<f64>() / draws.len() as f64
    }
}

impl<F> DelayDistribution for F
where
    F: Fn(usize, &mut StdRng) -> Vec<f64>,
{
    fn sample(&self, n: usize, rng: &mut StdRng) -> Vec<f64> {
        self(n, rng)
    }
}

#[derive(Debug, Clone)]
pub struct GammaDelay {
    distribution: Gamma<f64>,
}

impl GammaDelay {
    pub fn new(shape: f64, scale: f64) -> RtResult<Self> {
        let distribution = Gamma::new(shape, scale).map_err(|e| {
            RtError::invalid(format!("gamma delay shape {shape} scale {scale}: {e}"))
        })?;
        Ok(Self { distribution })
    }
}

impl DelayDistribution for GammaDelay {
    fn sample(&self, n: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..n).map(|_| self.distribution.sample(rng)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct LogNormalDelay {
    distribution: LogNormal<f64>,
}

impl LogNormalDelay {
    pub fn new(meanlog: f64, sdlog: f64) -> RtResult<Self> {
        let distribution = LogNormal::new(meanlog, sdlog).map_err(|e| {
            RtError::invalid(format!("log-normal delay meanlog {meanlog} sdlog {sdlog}: {e}"))
        })?;
        Ok(Self { distribution })
    }
}

impl DelayDistribution for LogNormalDelay {
    fn sample(&self, n: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..n).map(|_| self.distribution.sample(rng)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDelay {
    days: f64,
}

impl FixedDelay {
    pub fn new(days: f64) -> RtResult<Self> {
        if !days.is_finite() || days < 0.0 || days > MAX_DELAY_DAYS as f64 {
            return Err(RtError::invalid(format!(
                "fixed delay must be between 0 and {MAX_DELAY_DAYS} days, got {days}"
            )));
        }
        Ok(Self { days })
    }
}

impl DelayDistribution for FixedDelay {
    fn sample(&self, n: usize, _rng: &mut StdRng) -> Vec<f64> {
        vec![self.days; n]
    }
}

/// Delay distribution as written in a run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelayModel {
    Gamma { shape: f64, scale: f64 },
    LogNormal { meanlog: f64, sdlog: f64 },
    Fixed { days: f64 },
}

impl Default for DelayModel {
    fn default() -> Self {
        DelayModel::Gamma {
            shape: 2.0,
            scale: 3.0,
        }
    }
}

impl DelayModel {
    pub fn sampler(&self) -> RtResult<Box<dyn DelayDistribution>> {
        Ok(match *self {
            DelayModel::Gamma { shape, scale } => Box::new(GammaDelay::new(shape, scale)?),
            DelayModel::LogNormal { meanlog, sdlog } => {
                Box::new(LogNormalDelay::new(meanlog, sdlog)?)
            }
            DelayModel::Fixed { days } => Box::new(FixedDelay::new(days)?),
        })
    }
}
