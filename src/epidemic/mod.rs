/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// epidemic module
//
// every node carries one label - Susceptible, Infected or Recovered.
// In each step infected nodes spread the rumour to susceptible neighbours, then recovered
// nodes talk their susceptible and infected neighbours round.  Both passes read the labels
// as they stood at the start of the step.
//
////////////////////////////////////////////////////////////////////////////////////

use crate::error::{Result, SimError};
use crate::metrics::NodeMetrics;
use crate::network::ContactNetwork;
use crate::utilities::{check_coefficient, Seed};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

// Labels -------------------------------------------------------------------------------------------
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum Label {
    Susceptible,
    Infected,
    Recovered,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize)]
pub struct CompartmentCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl CompartmentCounts {
    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered
    }
}

// Parameters --------------------------------------------------------------------------------------
// how many nodes start infected and recovered
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct InitialSeeds {
    pub infected: usize,
    pub recovered: usize,
}

impl InitialSeeds {
    pub const fn new(infected: usize, recovered: usize) -> InitialSeeds {
        InitialSeeds {
            infected,
            recovered,
        }
    }

    // one recovered node per thousand (at least one) and four infected, never fewer
    // infected than recovered
    pub fn scaled_to(nodes: usize) -> InitialSeeds {
        let recovered = (nodes / 1000).max(1);
        let mut infected = 4;
        if infected < recovered {
            infected += 1;
        }
        InitialSeeds::new(infected, recovered)
    }
}

impl Default for InitialSeeds {
    fn default() -> InitialSeeds {
        InitialSeeds::new(4, 1)
    }
}

// infection-rate (alpha) and recovery-rate (beta) coefficients
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Coefficients {
    pub alpha: f64,
    pub beta: f64,
}

impl Coefficients {
    pub const fn new(alpha: f64, beta: f64) -> Coefficients {
        Coefficients { alpha, beta }
    }

    pub fn validate(&self) -> Result<()> {
        check_coefficient("alpha", self.alpha)?;
        check_coefficient("beta", self.beta)?;
        Ok(())
    }
}

impl Default for Coefficients {
    fn default() -> Coefficients {
        Coefficients::new(3.9, 5.2)
    }
}

/// What to do with a spreading probability `coefficient * clustering * betweenness`
/// that exceeds 1.
///
/// Probabilities are worked out for every node when a step or run starts, whatever its
/// current label, so the check covers the whole network and not only the nodes that
/// happen to be spreading. The outcome therefore depends on the network and the
/// coefficients alone.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ProbabilityPolicy {
    /// Clamp to 1 and report the number of clamped nodes at warn level.
    #[default]
    Clamp,
    /// Fail the step with `SimError::NumericDegeneracy`.
    Strict,
}

impl fmt::Display for ProbabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProbabilityPolicy::Clamp => write!(f, "clamp"),
            ProbabilityPolicy::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for ProbabilityPolicy {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<ProbabilityPolicy, ()> {
        match s {
            "clamp" => Ok(ProbabilityPolicy::Clamp),
            "strict" => Ok(ProbabilityPolicy::Strict),
            _ => Err(()),
        }
    }
}

// Spread rates ------------------------------------------------------------------------------------
// per node probabilities for one pair of coefficients.  A node's probability only depends on
// the node itself so it is worked out once per step (or once per run) rather than per edge.
#[derive(Debug, Clone)]
pub(crate) struct SpreadRates {
    infection: Vec<f64>,
    recovery: Vec<f64>,
    clamped: usize,
}

impl SpreadRates {
    pub(crate) fn new(
        metrics: &NodeMetrics,
        coefficients: Coefficients,
        policy: ProbabilityPolicy,
    ) -> Result<SpreadRates> {
        coefficients.validate()?;
        let mut clamped = 0usize;
        let mut infection = Vec::with_capacity(metrics.node_count());
        let mut recovery = Vec::with_capacity(metrics.node_count());
        for (node, weights) in metrics.iter().enumerate() {
            let weight = weights.spread_weight();
            infection.push(bounded(node, coefficients.alpha * weight, policy, &mut clamped)?);
            recovery.push(bounded(node, coefficients.beta * weight, policy, &mut clamped)?);
        }
        Ok(SpreadRates {
            infection,
            recovery,
            clamped,
        })
    }

    pub(crate) fn report(&self, coefficients: Coefficients) {
        if self.clamped > 0 {
            warn!(
                clamped = self.clamped,
                alpha = coefficients.alpha,
                beta = coefficients.beta,
                "transition probabilities above 1 clamped"
            );
        }
    }
}

fn bounded(
    node: usize,
    probability: f64,
    policy: ProbabilityPolicy,
    clamped: &mut usize,
) -> Result<f64> {
    if (0.0..=1.0).contains(&probability) {
        return Ok(probability);
    }
    match policy {
        ProbabilityPolicy::Clamp if !probability.is_nan() => {
            *clamped += 1;
            Ok(probability.max(0.0).min(1.0))
        }
        _ => Err(SimError::NumericDegeneracy { node, probability }),
    }
}

// Epidemic state ----------------------------------------------------------------------------------
// Owns its random stream, so repeated calls to step/run continue both the epidemic and the
// stream.  reinitialize starts over.
#[derive(Debug, Clone)]
pub struct EpidemicState {
    labels: Vec<Label>,
    infected: Vec<usize>,  // bucket, ascending node ids
    recovered: Vec<usize>, // bucket, ascending node ids
    rng: StdRng,
    policy: ProbabilityPolicy,
}

impl EpidemicState {
    pub fn new(network: &ContactNetwork, seeds: InitialSeeds, seed: Seed) -> Result<EpidemicState> {
        EpidemicState::with_rng(network, seeds, seed.rng())
    }

    // Seed nodes are drawn from the state's own stream, without replacement and disjoint:
    // the first `infected` draws are infected, the next `recovered` draws are recovered.
    pub fn with_rng(
        network: &ContactNetwork,
        seeds: InitialSeeds,
        mut rng: StdRng,
    ) -> Result<EpidemicState> {
        let n = network.node_count();
        let wanted = seeds.infected + seeds.recovered;
        if wanted > n {
            return Err(SimError::invalid(
                "initial seeds",
                format!(
                    "{} infected plus {} recovered exceed the {} nodes",
                    seeds.infected, seeds.recovered, n
                ),
            ));
        }

        let mut labels = vec![Label::Susceptible; n];
        let picks = index::sample(&mut rng, n, wanted).into_vec();
        for (draw, node) in picks.into_iter().enumerate() {
            labels[node] = if draw < seeds.infected {
                Label::Infected
            } else {
                Label::Recovered
            };
        }

        let mut state = EpidemicState {
            labels,
            infected: Vec::new(),
            recovered: Vec::new(),
            rng,
            policy: ProbabilityPolicy::default(),
        };
        state.recompute_buckets();
        debug!(
            nodes = n,
            infected = state.infected.len(),
            recovered = state.recovered.len(),
            "epidemic state seeded"
        );
        Ok(state)
    }

    pub fn with_policy(mut self, policy: ProbabilityPolicy) -> EpidemicState {
        self.policy = policy;
        self
    }

    // throw away all progress and seed again; the policy is kept
    pub fn reinitialize(
        &mut self,
        network: &ContactNetwork,
        seeds: InitialSeeds,
        seed: Seed,
    ) -> Result<()> {
        let policy = self.policy;
        *self = EpidemicState::new(network, seeds, seed)?.with_policy(policy);
        Ok(())
    }

    pub fn policy(&self) -> ProbabilityPolicy {
        self.policy
    }

    pub fn node_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, node: usize) -> Label {
        self.labels[node]
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn infected(&self) -> &[usize] {
        &self.infected
    }

    pub fn recovered(&self) -> &[usize] {
        &self.recovered
    }

    pub fn counts(&self) -> CompartmentCounts {
        CompartmentCounts {
            susceptible: self.labels.len() - self.infected.len() - self.recovered.len(),
            infected: self.infected.len(),
            recovered: self.recovered.len(),
        }
    }

    // rebuild the infected and recovered buckets from the labels
    pub fn recompute_buckets(&mut self) {
        self.infected.clear();
        self.recovered.clear();
        for (node, label) in self.labels.iter().enumerate() {
            match label {
                Label::Infected => self.infected.push(node),
                Label::Recovered => self.recovered.push(node),
                Label::Susceptible => (),
            }
        }
    }

    /// Apply one step with coefficients `alpha` and `beta`.
    ///
    /// # Errors
    /// `InvalidParameters` when the sizes of state, network and metrics disagree or a
    /// coefficient is negative or not finite; `NumericDegeneracy` under the strict policy.
    pub fn step(
        &mut self,
        network: &ContactNetwork,
        metrics: &NodeMetrics,
        alpha: f64,
        beta: f64,
    ) -> Result<()> {
        self.check_sizes(network, metrics)?;
        let coefficients = Coefficients::new(alpha, beta);
        let rates = SpreadRates::new(metrics, coefficients, self.policy)?;
        rates.report(coefficients);
        self.advance(network, &rates);
        Ok(())
    }

    pub(crate) fn check_sizes(&self, network: &ContactNetwork, metrics: &NodeMetrics) -> Result<()> {
        let n = self.labels.len();
        if network.node_count() != n || metrics.node_count() != n {
            return Err(SimError::invalid(
                "network",
                format!(
                    "state has {} nodes but network has {} and metrics {}",
                    n,
                    network.node_count(),
                    metrics.node_count()
                ),
            ));
        }
        Ok(())
    }

    // the transition engine proper.  Every trial reads `before`; writes go to the live
    // labels, infection first and recovery second, so a node infected and recovered in the
    // same step ends the step recovered.
    pub(crate) fn advance(&mut self, network: &ContactNetwork, rates: &SpreadRates) {
        let before = self.labels.clone();

        for &u in &self.infected {
            let probability = rates.infection[u];
            if probability <= 0.0 {
                continue;
            }
            for &v in network.neighbours(u) {
                if before[v] == Label::Susceptible && self.rng.gen::<f64>() < probability {
                    self.labels[v] = Label::Infected;
                }
            }
        }

        for &u in &self.recovered {
            let probability = rates.recovery[u];
            if probability <= 0.0 {
                continue;
            }
            for &v in network.neighbours(u) {
                if before[v] != Label::Recovered && self.rng.gen::<f64>() < probability {
                    self.labels[v] = Label::Recovered;
                }
            }
        }

        self.recompute_buckets();
    }
}

/// Seed a fresh state over `network` with `infected_count` infected and `recovered_count`
/// recovered nodes drawn from the stream of `seed`.
pub fn init_state(
    network: &ContactNetwork,
    infected_count: usize,
    recovered_count: usize,
    seed: Seed,
) -> Result<EpidemicState> {
    EpidemicState::new(
        network,
        InitialSeeds::new(infected_count, recovered_count),
        seed,
    )
}

// one discrete step, mutating the state in place
pub fn step(
    state: &mut EpidemicState,
    network: &ContactNetwork,
    metrics: &NodeMetrics,
    alpha: f64,
    beta: f64,
) -> Result<()> {
    state.step(network, metrics, alpha, beta)
}
