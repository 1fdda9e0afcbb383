use mrp::RunKey;
use serde::{Deserialize, Serialize};

use crate::{
    delay::DelayModel,
    error::RtResult,
    parameters::{SimulationMethod, SimulationParameters},
    schedule::{ChangePoint, TransmissionSchedule},
    serial_interval::SerialIntervalMode,
};

/// Model input read from the run record. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunInput {
    pub population: u64,
    pub initial_exposed: u64,
    pub initial_infectious: u64,
    /// Mean days exposed (t_E).
    pub latent_period: f64,
    /// Mean days infectious (t_I).
    pub infectious_period: f64,
    pub n_steps: usize,
    pub method: SimulationMethod,

    pub r0_pre: f64,
    pub intervention_time_1: f64,
    pub days_intervention_to_min: f64,
    pub r0_min: f64,
    pub intervention_time_2: f64,
    pub days_to_rt_rise: f64,
    pub r0_post: f64,
    /// Explicit change points, used instead of the intervention fields.
    pub schedule: Option<Vec<ChangePoint>>,

    pub delay: DelayModel,
    pub horizon_extension: Option<usize>,

    pub window: usize,
    pub serial_interval: SerialIntervalMode,
    /// Reuse a stored trajectory with the same key instead of simulating.
    pub cache_trajectory: bool,
}

impl Default for RunInput {
    fn default() -> Self {
        Self {
            population: 2_000_000,
            initial_exposed: 100,
            initial_infectious: 100,
            latent_period: 4.0,
            infectious_period: 4.0,
            n_steps: 150,
            method: SimulationMethod::Stochastic,
            r0_pre: 2.0,
            intervention_time_1: 40.0,
            days_intervention_to_min: 5.0,
            r0_min: 0.7,
            intervention_time_2: 90.0,
            days_to_rt_rise: 10.0,
            r0_post: 1.2,
            schedule: None,
            delay: DelayModel::default(),
            horizon_extension: None,
            window: 7,
            serial_interval: SerialIntervalMode::Uncertain,
            cache_trajectory: true,
        }
    }
}

impl RunInput {
    pub fn transmission_schedule(&self) -> RtResult<TransmissionSchedule> {
        match &self.schedule {
            Some(points) => TransmissionSchedule::new(points.clone()),
            None => TransmissionSchedule::intervention(
                self.r0_pre,
                self.intervention_time_1,
                self.days_intervention_to_min,
                self.r0_min,
                self.intervention_time_2,
                self.days_to_rt_rise,
                self.r0_post,
            ),
        }
    }

    pub fn simulation_parameters(&self) -> RtResult<SimulationParameters> {
        SimulationParameters::new(
            self.population,
            self.initial_exposed,
            self.initial_infectious,
            self.latent_period,
            self.infectious_period,
            self.n_steps,
            self.method,
            self.transmission_schedule()?,
        )
    }

    /// Store key of the simulated trajectory. Labelled by the scenario, with a
    /// fingerprint of the full parameters and seed.
    pub fn trajectory_key(
        &self,
        parameters: &SimulationParameters,
        seed: Option<u64>,
    ) -> RtResult<RunKey> {
        Ok(RunKey::new()
            .with("R0", self.r0_pre)
            .with("method", self.method.as_str())
            .with("t1", self.intervention_time_1)
            .with("dmin", self.days_intervention_to_min)
            .with_fingerprint(&(parameters, seed))?)
    }
}
