use serde::{Deserialize, Serialize};

use crate::error::{RtError, RtResult};
use crate::schedule::TransmissionSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationMethod {
    /// Binomial draws for every compartment flow.
    #[default]
    Stochastic,
    /// Expected flows, no randomness.
    Deterministic,
}

impl SimulationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationMethod::Stochastic => "stochastic",
            SimulationMethod::Deterministic => "deterministic",
        }
    }
}

/// Validated inputs of one SEIR run. Built through [`SimulationParameters::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationParameters {
    population: u64,
    initial_exposed: u64,
    initial_infectious: u64,
    /// Mean days spent exposed (t_E).
    latent_period: f64,
    /// Mean days spent infectious (t_I).
    infectious_period: f64,
    n_steps: usize,
    method: SimulationMethod,
    schedule: TransmissionSchedule,
}

impl SimulationParameters {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        population: u64,
        initial_exposed: u64,
        initial_infectious: u64,
        latent_period: f64,
        infectious_period: f64,
        n_steps: usize,
        method: SimulationMethod,
        schedule: TransmissionSchedule,
    ) -> RtResult<Self> {
        if population == 0 {
            return Err(RtError::invalid("population size must be positive"));
        }
        for (name, period) in [("latent", latent_period), ("infectious", infectious_period)] {
            if !period.is_finite() || period <= 0.0 {
                return Err(RtError::invalid(format!(
                    "mean {name} period must be positive, got {period}"
                )));
            }
        }
        let seeded = initial_exposed.saturating_add(initial_infectious);
        if seeded > population {
            return Err(RtError::invalid(format!(
                "{seeded} initial exposed and infectious exceed population {population}"
            )));
        }
        Ok(Self {
            population,
            initial_exposed,
            initial_infectious,
            latent_period,
            infectious_period,
            n_steps,
            method,
            schedule,
        })
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn initial_exposed(&self) -> u64 {
        self.initial_exposed
    }

    pub fn initial_infectious(&self) -> u64 {
        self.initial_infectious
    }

    pub fn latent_period(&self) -> f64 {
        self.latent_period
    }

    pub fn infectious_period(&self) -> f64 {
        self.infectious_period
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn method(&self) -> SimulationMethod {
        self.method
    }

    pub fn schedule(&self) -> &TransmissionSchedule {
        &self.schedule
    }

    /// Transmission rate β(t) = R0(t) / t_I.
    pub fn beta_at(&self, t: f64) -> f64 {
        self.schedule.r0_at(t) / self.infectious_period
    }

    /// Mean generation interval, t_E + t_I.
    pub fn serial_interval_mean(&self) -> f64 {
        self.latent_period + self.infectious_period
    }

    /// Variance of the sum of the exposed and infectious residence times.
    pub fn serial_interval_variance(&self) -> f64 {
        self.latent_period.powi(2) + self.infectious_period.powi(2)
    }
}
