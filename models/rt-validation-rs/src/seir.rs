use rand::{distr::Distribution, rngs::StdRng};
use rand_distr::Binomial;

use crate::{
    error::RtError,
    output::{SimulationTrajectory, TrajectoryRow},
    parameters::{SimulationMethod, SimulationParameters},
    rng::make_rng,
};

pub struct SeirModel {}

impl SeirModel {
    pub fn simulate(parameters: &SimulationParameters, seed: Option<u64>) -> SimulationTrajectory {
        let population = parameters.population() as f64;
        let mut rng = make_rng(seed);
        let mut output = SimulationTrajectory::with_capacity(parameters.n_steps() + 1);

        let mut exposed = parameters.initial_exposed() as f64;
        let mut infectious = parameters.initial_infectious() as f64;
        let mut susceptible = population - exposed - infectious;
        let mut recovered = 0.0;

        let r0 = parameters.schedule().r0_at(0.0);
        output.rows.push(TrajectoryRow {
            time: 0,
            susceptible,
            exposed,
            infectious,
            recovered,
            new_infections: 0.0,
            r0,
            rt: r0 * susceptible / population,
        });

        let progress_probability = f64::min(1.0 / parameters.latent_period(), 1.0);
        let recovery_probability = f64::min(1.0 / parameters.infectious_period(), 1.0);

        for step in 1..=parameters.n_steps() {
            let r0 = parameters.schedule().r0_at(step as f64);
            let infection_probability = checked_probability(
                parameters.beta_at(step as f64) * infectious / population,
                step,
                "infection",
            );

            // All flows are computed from the state at the start of the step
            let (new_exposed, new_infectious, new_recovered) = match parameters.method() {
                SimulationMethod::Stochastic => (
                    draw(susceptible, infection_probability, &mut rng),
                    draw(exposed, progress_probability, &mut rng),
                    draw(infectious, recovery_probability, &mut rng),
                ),
                SimulationMethod::Deterministic => (
                    susceptible * infection_probability,
                    exposed * progress_probability,
                    infectious * recovery_probability,
                ),
            };
            let rt = r0 * susceptible / population;

            susceptible = (susceptible - new_exposed).max(0.0);
            exposed = (exposed + new_exposed - new_infectious).max(0.0);
            infectious = (infectious + new_infectious - new_recovered).max(0.0);
            recovered += new_recovered;

            output.rows.push(TrajectoryRow {
                time: step,
                susceptible,
                exposed,
                infectious,
                recovered,
                new_infections: new_exposed,
                r0,
                rt,
            });
        }
        tracing::debug!(
            steps = parameters.n_steps(),
            method = parameters.method().as_str(),
            total_infections = population - susceptible - parameters.initial_exposed() as f64
                - parameters.initial_infectious() as f64,
            "simulated SEIR trajectory"
        );
        output
    }
}

/// Clamps a per-step probability to [0, 1]. A non-finite value is logged and
/// treated as no flow.
fn checked_probability(probability: f64, step: usize, flow: &str) -> f64 {
    if probability.is_finite() {
        return probability.clamp(0.0, 1.0);
    }
    let error = RtError::NumericalInstability {
        day: step,
        detail: format!("{flow} probability is {probability}"),
    };
    tracing::warn!(%error, "treating flow as zero");
    0.0
}

fn draw(count: f64, probability: f64, rng: &mut StdRng) -> f64 {
    let trials = count.round() as u64;
    if trials == 0 || probability == 0.0 {
        return 0.0;
    }
    match Binomial::new(trials, probability) {
        Ok(binomial) => binomial.sample(rng) as f64,
        Err(e) => {
            tracing::warn!(trials, probability, error = %e, "binomial draw rejected, using zero");
            0.0
        }
    }
}
