use mrp::ResultStore;

use crate::{
    config::RunInput,
    error::RtResult,
    estimator::{RtEstimate, RtEstimator},
    imputation::{InfectionTimeImputer, MeanShiftImputer},
    observation::{ObservationOptions, simulate_observations},
    output::{SimulationTrajectory, TrajectoryRow},
    parameters::SimulationParameters,
    rng::{make_rng, stream_seed},
    seir::SeirModel,
    serial_interval::SerialInterval,
    series::IncidenceSeries,
};

pub const INFECTIONS: &str = "infections";
pub const OBSERVED: &str = "observed";
pub const IMPUTED: &str = "imputed";

const SIMULATION_STREAM: u64 = 0;
const DELAY_STREAM: u64 = 1;
const ESTIMATOR_STREAM: u64 = 2;

/// Everything one validation run produces.
pub struct ValidationRun {
    pub trajectory: SimulationTrajectory,
    pub infections: IncidenceSeries,
    /// Observed counts within the simulated horizon.
    pub observed: IncidenceSeries,
    pub imputed: IncidenceSeries,
    pub rt_infections: RtEstimate,
    pub rt_imputed: RtEstimate,
    pub rt_observed: RtEstimate,
    /// First day affected by the first change in transmission.
    pub change_day: Option<usize>,
}

impl ValidationRun {
    /// Days by which `estimate` drops below one later than the estimate on
    /// true infections, after `change_day`. Negative when it drops first.
    pub fn detection_lag(&self, estimate: &RtEstimate, change_day: usize) -> Option<i64> {
        let truth = self.rt_infections.first_end_below(1.0, change_day)?;
        let other = estimate.first_end_below(1.0, change_day)?;
        Some(other as i64 - truth as i64)
    }

    /// Detection lag of the observed and imputed estimates after the first
    /// change in transmission, labelled by series.
    pub fn detection_lags(&self) -> Vec<(&str, Option<i64>)> {
        [&self.rt_observed, &self.rt_imputed]
            .into_iter()
            .map(|estimate| {
                let lag = self
                    .change_day
                    .and_then(|day| self.detection_lag(estimate, day));
                (estimate.series.as_str(), lag)
            })
            .collect()
    }

    pub fn series(&self) -> [&IncidenceSeries; 3] {
        [&self.infections, &self.observed, &self.imputed]
    }

    pub fn estimates(&self) -> [&RtEstimate; 3] {
        [&self.rt_infections, &self.rt_imputed, &self.rt_observed]
    }
}

pub fn run(
    input: &RunInput,
    seed: Option<u64>,
    store: Option<&ResultStore>,
) -> RtResult<ValidationRun> {
    run_with_imputer(input, seed, store, &MeanShiftImputer::default())
}

pub fn run_with_imputer(
    input: &RunInput,
    seed: Option<u64>,
    store: Option<&ResultStore>,
    imputer: &dyn InfectionTimeImputer,
) -> RtResult<ValidationRun> {
    let parameters = input.simulation_parameters()?;
    let trajectory = load_or_simulate(input, &parameters, seed, store)?;
    let last_day = trajectory.len().saturating_sub(1);
    let infections = trajectory.infections(INFECTIONS);

    let delay = input.delay.sampler()?;
    let mut delay_rng = make_rng(stream_seed(seed, DELAY_STREAM));
    let observed = simulate_observations(
        &infections,
        delay.as_ref(),
        &ObservationOptions {
            horizon_extension: input.horizon_extension,
        },
        OBSERVED,
        &mut delay_rng,
    )?;
    let imputed = imputer
        .impute(&observed, delay.as_ref(), &mut delay_rng)?
        .renamed(IMPUTED)
        .restrict(0, last_day);
    let observed = observed.restrict(0, last_day);

    let serial_interval = SerialInterval::from_moments(
        input.serial_interval,
        parameters.serial_interval_mean(),
        parameters.serial_interval_variance(),
    )?;
    let estimator = RtEstimator::new(
        input.window,
        serial_interval,
        stream_seed(seed, ESTIMATOR_STREAM),
    );
    let rt_infections = estimator.estimate(&infections)?;
    let rt_imputed = estimator.estimate(&imputed)?;
    let rt_observed = estimator.estimate(&observed)?;

    tracing::info!(
        days = trajectory.len(),
        infections = infections.total(),
        observed = observed.total(),
        "validation run complete"
    );
    Ok(ValidationRun {
        trajectory,
        infections,
        observed,
        imputed,
        rt_infections,
        rt_imputed,
        rt_observed,
        change_day: parameters.schedule().first_change_day(),
    })
}

fn load_or_simulate(
    input: &RunInput,
    parameters: &SimulationParameters,
    seed: Option<u64>,
    store: Option<&ResultStore>,
) -> RtResult<SimulationTrajectory> {
    let simulation_seed = stream_seed(seed, SIMULATION_STREAM);
    let Some(store) = store.filter(|_| input.cache_trajectory) else {
        return Ok(SeirModel::simulate(parameters, simulation_seed));
    };
    let key = input.trajectory_key(parameters, seed)?;
    if let Some(rows) = store.load::<TrajectoryRow>(&key)? {
        tracing::info!(key = %key.file_stem(), "loaded stored trajectory");
        return Ok(SimulationTrajectory { rows });
    }
    let trajectory = SeirModel::simulate(parameters, simulation_seed);
    let path = store.save(&key, &trajectory.rows)?;
    tracing::info!(path = %path.display(), "stored trajectory");
    Ok(trajectory)
}
