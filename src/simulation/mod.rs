/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// simulation module
//
// drives the transition engine for a number of steps and records the size of each
// compartment after every step
//
////////////////////////////////////////////////////////////////////////////////////

use crate::epidemic::{
    Coefficients, CompartmentCounts, EpidemicState, InitialSeeds, ProbabilityPolicy, SpreadRates,
};
use crate::error::Result;
use crate::metrics::{compute_metrics, NodeMetrics};
use crate::network::{ContactNetwork, NetworkParms};
use crate::utilities::Seed;
use serde::Serialize;
use tracing::debug;

// Time series -------------------------------------------------------------------------------------
// counts of S, I and R at steps 0..=T; entry 0 is the state before the first step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    susceptible: Vec<usize>,
    infected: Vec<usize>,
    recovered: Vec<usize>,
}

// one line of a time series file
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRow {
    pub step: usize,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl TimeSeries {
    fn with_capacity(points: usize) -> TimeSeries {
        TimeSeries {
            susceptible: Vec::with_capacity(points),
            infected: Vec::with_capacity(points),
            recovered: Vec::with_capacity(points),
        }
    }

    fn record(&mut self, counts: CompartmentCounts) {
        debug_assert!(
            self.susceptible.is_empty() || counts.total() == self.at(0).map_or(0, |c| c.total()),
            "compartments must always add up to the node count"
        );
        self.susceptible.push(counts.susceptible);
        self.infected.push(counts.infected);
        self.recovered.push(counts.recovered);
    }

    // number of recorded points, steps + 1
    pub fn len(&self) -> usize {
        self.infected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infected.is_empty()
    }

    pub fn steps(&self) -> usize {
        self.len().saturating_sub(1)
    }

    pub fn susceptible(&self) -> &[usize] {
        &self.susceptible
    }

    pub fn infected(&self) -> &[usize] {
        &self.infected
    }

    pub fn recovered(&self) -> &[usize] {
        &self.recovered
    }

    pub fn at(&self, step: usize) -> Option<CompartmentCounts> {
        Some(CompartmentCounts {
            susceptible: *self.susceptible.get(step)?,
            infected: *self.infected.get(step)?,
            recovered: *self.recovered.get(step)?,
        })
    }

    pub fn final_counts(&self) -> Option<CompartmentCounts> {
        self.at(self.steps())
    }

    pub fn peak_infected(&self) -> usize {
        self.infected.iter().copied().max().unwrap_or(0)
    }

    // first step at which the infected count peaks
    pub fn peak_infected_step(&self) -> Option<usize> {
        let peak = self.peak_infected();
        self.infected.iter().position(|&count| count == peak)
    }

    pub fn rows(&self) -> impl Iterator<Item = SeriesRow> + '_ {
        (0..self.len()).map(move |step| SeriesRow {
            step,
            susceptible: self.susceptible[step],
            infected: self.infected[step],
            recovered: self.recovered[step],
        })
    }
}

// Driver ------------------------------------------------------------------------------------------
/// Run `steps` steps on `state` and return the counts before the first step and after each
/// one.
///
/// The state is not reset: a second call carries on from where the first stopped, both in
/// the epidemic and in the random stream. Probabilities are worked out once for the whole
/// call.
pub fn run(
    state: &mut EpidemicState,
    network: &ContactNetwork,
    metrics: &NodeMetrics,
    alpha: f64,
    beta: f64,
    steps: usize,
) -> Result<TimeSeries> {
    state.check_sizes(network, metrics)?;
    let coefficients = Coefficients::new(alpha, beta);
    let rates = SpreadRates::new(metrics, coefficients, state.policy())?;
    rates.report(coefficients);

    let mut series = TimeSeries::with_capacity(steps + 1);
    series.record(state.counts());
    for _ in 0..steps {
        state.advance(network, &rates);
        series.record(state.counts());
    }
    debug!(
        steps,
        alpha,
        beta,
        peak_infected = series.peak_infected(),
        "simulation run finished"
    );
    Ok(series)
}

// Simulation --------------------------------------------------------------------------------------
// a network, its metrics and an epidemic state kept together for the life of a run
#[derive(Debug, Clone)]
pub struct Simulation {
    network: ContactNetwork,
    metrics: NodeMetrics,
    state: EpidemicState,
}

impl Simulation {
    pub fn new(
        parms: &NetworkParms,
        seeds: InitialSeeds,
        graph_seed: Seed,
        state_seed: Seed,
    ) -> Result<Simulation> {
        let network = parms.generate(graph_seed)?;
        let metrics = compute_metrics(&network);
        let state = EpidemicState::new(&network, seeds, state_seed)?;
        Ok(Simulation {
            network,
            metrics,
            state,
        })
    }

    pub fn from_parts(
        network: ContactNetwork,
        metrics: NodeMetrics,
        state: EpidemicState,
    ) -> Result<Simulation> {
        state.check_sizes(&network, &metrics)?;
        Ok(Simulation {
            network,
            metrics,
            state,
        })
    }

    pub fn with_policy(mut self, policy: ProbabilityPolicy) -> Simulation {
        self.state = self.state.with_policy(policy);
        self
    }

    pub fn network(&self) -> &ContactNetwork {
        &self.network
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn state(&self) -> &EpidemicState {
        &self.state
    }

    // continues from the current state
    pub fn run(&mut self, coefficients: Coefficients, steps: usize) -> Result<TimeSeries> {
        run(
            &mut self.state,
            &self.network,
            &self.metrics,
            coefficients.alpha,
            coefficients.beta,
            steps,
        )
    }

    // new seed nodes on the same network; metrics are kept
    pub fn reset(&mut self, seeds: InitialSeeds, state_seed: Seed) -> Result<()> {
        self.state.reinitialize(&self.network, seeds, state_seed)
    }
}
