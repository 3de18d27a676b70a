//! Rumour spreading on small-world networks.
//!
//! A Watts–Strogatz network is generated, each node is weighted by its clustering
//! coefficient and betweenness centrality, and a susceptible / infected / recovered
//! epidemic is stepped over it. Sweeps over the infection and recovery coefficients fit a
//! line through the peak number of infected nodes, and a separate sweep measures how the
//! average path length falls as the rewiring probability grows.
//!
//! ```no_run
//! use rumor::{compute_metrics, generate_network, init_state, run, Seed};
//!
//! # fn main() -> rumor::Result<()> {
//! let network = generate_network(1000, 10, 0.029_473_68, Seed::from_label("nsll"))?;
//! let metrics = compute_metrics(&network);
//! let mut state = init_state(&network, 4, 1, Seed::from_label("nsll"))?;
//! let series = run(&mut state, &network, &metrics, 3.9, 5.2, 250)?;
//! println!("peak infected {}", series.peak_infected());
//! # Ok(())
//! # }
//! ```

pub mod data_management;
pub mod epidemic;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod network;
pub mod simulation;
pub mod stats;
pub mod sweep;
pub mod utilities;

pub use epidemic::{
    init_state, step, Coefficients, CompartmentCounts, EpidemicState, InitialSeeds, Label,
    ProbabilityPolicy,
};
pub use error::{Result, SimError};
pub use metrics::{compute_metrics, NodeMetrics, NodeWeights};
pub use network::{generate_network, ContactNetwork, NetworkParms, NetworkSummary};
pub use simulation::{run, Simulation, TimeSeries};
pub use stats::{linear_fit, LinearFit};
pub use sweep::{
    path_length_sweep, sweep, Coefficient, PathLengthParms, PathLengthSample, SampleOutcome,
    SeedPolicy, SweepParms, SweepResult, SweepSample,
};
pub use utilities::Seed;
