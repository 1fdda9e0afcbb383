use std::process::ExitCode;

use rt_validation::{config::RunInput, error::RtResult, pipeline, report::ComparisonTable};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // stdout carries CSV output when no output dir is configured
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> RtResult<()> {
    let ctx = mrp::Environment::<RunInput>::load()?;
    let input = ctx.input.clone().unwrap_or_default();
    tracing::info!(seed = ?ctx.seed, replicate = ctx.replicate, "starting validation run");

    let store = ctx.result_store();
    let result = pipeline::run(&input, ctx.seed, store.as_ref())?;

    for (series, lag) in result.detection_lags() {
        match lag {
            Some(lag_days) => {
                tracing::info!(series, change_day = ?result.change_day, lag_days, "detection lag")
            }
            None => tracing::info!(series, change_day = ?result.change_day, "no detection lag"),
        }
    }

    let table =
        ComparisonTable::build(&result.trajectory, &result.series(), &result.estimates());
    ctx.write_csv("rt_comparison.csv", &table.header_refs(), &table.rows)?;

    // The full trajectory only goes to an output directory, never to stdout
    if ctx.output_dir().is_some() {
        let rows: Vec<Vec<String>> = result
            .trajectory
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.time.to_string(),
                    r.susceptible.to_string(),
                    r.exposed.to_string(),
                    r.infectious.to_string(),
                    r.recovered.to_string(),
                    r.new_infections.to_string(),
                    r.r0.to_string(),
                    r.rt.to_string(),
                ]
            })
            .collect();
        ctx.write_csv(
            "trajectory.csv",
            &["time", "S", "E", "I", "R", "new_infections", "r0", "rt"],
            &rows,
        )?;
    }
    Ok(())
}
