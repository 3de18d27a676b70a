use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use rumor::data_management::{DataError, ModelDataStore, ModelParameters};
use rumor::logging::{self, LoggingError};
use rumor::{path_length_sweep, sweep, Simulation};
use tracing::{error, info, info_span};

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    // process command line arguments (for now just the model root directory location)
    let model_root = match env::args_os().nth(1) {
        Some(root) => PathBuf::from(root),
        None => {
            error!("no model location specified");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = run_model(model_root) {
        error!(error = %err, "model run failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run_model(model_root: PathBuf) -> Result<(), DataError> {
    // The model data store handles all models inputs and outputs
    let store = ModelDataStore::new(&model_root)?;
    let parms = store.get_model_parms()?;
    info!("\n{}", parms);

    run_scenarios(&store, &parms)?;

    for sweep_parms in &parms.sweeps {
        let result = sweep(sweep_parms)?;
        store.save_sweep(&result)?;
    }

    if let Some(path_length) = &parms.path_length {
        let samples = path_length_sweep(path_length)?;
        store.save_path_lengths(&samples)?;
    }

    info!(results = %store.results_dir().display(), "model run complete");
    Ok(())
}

// the baseline run followed by one run per scenario value, each restarted from the same seeds
fn run_scenarios(store: &ModelDataStore, parms: &ModelParameters) -> Result<(), DataError> {
    let mut simulation = Simulation::new(
        &parms.network,
        parms.seeds,
        parms.graph_seed,
        parms.state_seed,
    )?
    .with_policy(parms.policy);

    let summary = simulation.network().summary();
    info!(
        nodes = summary.nodes,
        edges = summary.edges,
        mean_degree = summary.mean_degree,
        min_degree = summary.min_degree,
        max_degree = summary.max_degree,
        average_clustering = simulation.metrics().average_clustering(),
        "network generated"
    );

    let baseline = simulation.run(parms.coefficients, parms.steps)?;
    info!(
        peak_infected = baseline.peak_infected(),
        peak_step = baseline.peak_infected_step(),
        "baseline finished"
    );
    store.save_series("baseline", &baseline)?;

    for (index, coefficients) in parms.scenarios().enumerate() {
        let scenario_number = index + 1;
        let _span = info_span!("scenario", scenario_number).entered();
        simulation.reset(parms.seeds, parms.state_seed)?;
        let series = simulation.run(coefficients, parms.steps)?;
        info!(
            alpha = coefficients.alpha,
            beta = coefficients.beta,
            peak_infected = series.peak_infected(),
            "scenario finished"
        );
        store.save_series(&format!("scenario_{:04}", scenario_number), &series)?;
    }
    Ok(())
}

fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
