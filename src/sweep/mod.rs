/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// sweep module
//
// sensitivity runs - one coefficient is stepped across a range, every value gets a fresh
// network, metrics and state, and the peak infected count of each run is regressed on the
// coefficient.  A companion sweep measures the average path length of the network against
// the rewiring probability.
//
////////////////////////////////////////////////////////////////////////////////////

use crate::epidemic::{Coefficients, InitialSeeds, ProbabilityPolicy};
use crate::error::{Result, SimError};
use crate::network::NetworkParms;
use crate::simulation::Simulation;
use crate::stats::{linear_fit, spread, LinearFit, Spread};
use crate::utilities::{check_coefficient, linspace, Seed};
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;
use tracing::{info, instrument, warn};

// Swept coefficient -------------------------------------------------------------------------------
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Coefficient {
    Infection, // alpha
    Recovery,  // beta
}

impl Coefficient {
    // the swept value in its slot, the fixed one in the other
    pub fn coefficients(self, value: f64, fixed_other: f64) -> Coefficients {
        match self {
            Coefficient::Infection => Coefficients::new(value, fixed_other),
            Coefficient::Recovery => Coefficients::new(fixed_other, value),
        }
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Coefficient::Infection => write!(f, "alpha"),
            Coefficient::Recovery => write!(f, "beta"),
        }
    }
}

impl FromStr for Coefficient {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Coefficient, ()> {
        match s {
            "alpha" | "infection" => Ok(Coefficient::Infection),
            "beta" | "recovery" => Ok(Coefficient::Recovery),
            _ => Err(()),
        }
    }
}

// Fixed reuses the graph and state seeds for every sample so only the coefficient changes;
// PerSample offsets both seeds by the sample index
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SeedPolicy {
    #[default]
    Fixed,
    PerSample,
}

// Parameters --------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct SweepParms {
    pub coefficient: Coefficient,
    pub range: (f64, f64),
    pub samples: usize,
    pub fixed_other: f64,
    pub steps: usize,
    pub network: NetworkParms,
    pub seeds: InitialSeeds,
    pub graph_seed: Seed,
    pub state_seed: Seed,
    pub seed_policy: SeedPolicy,
    pub policy: ProbabilityPolicy,
}

impl SweepParms {
    pub fn new(
        coefficient: Coefficient,
        range: (f64, f64),
        samples: usize,
        fixed_other: f64,
        steps: usize,
    ) -> SweepParms {
        SweepParms {
            coefficient,
            range,
            samples,
            fixed_other,
            steps,
            network: NetworkParms::default(),
            seeds: InitialSeeds::default(),
            graph_seed: Seed::default(),
            state_seed: Seed::default(),
            seed_policy: SeedPolicy::default(),
            policy: ProbabilityPolicy::default(),
        }
    }

    // experiment 1: alpha from 1.9 to 5.1 in steps of 0.05, beta held at 5.2
    pub fn infection_experiment() -> SweepParms {
        SweepParms::new(Coefficient::Infection, (1.9, 5.1), 65, 5.2, 250)
    }

    // experiment 2: beta from 5.2 to 8.4 in steps of 0.05, alpha held at 3.9
    pub fn recovery_experiment() -> SweepParms {
        SweepParms::new(Coefficient::Recovery, (5.2, 8.4), 65, 3.9, 250)
    }

    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.range;
        check_coefficient("range", lo)?;
        check_coefficient("range", hi)?;
        if lo >= hi {
            return Err(SimError::invalid(
                "range",
                format!("lower end {} must be below upper end {}", lo, hi),
            ));
        }
        if self.samples < 2 {
            return Err(SimError::invalid(
                "samples",
                format!("a fit needs at least two samples, got {}", self.samples),
            ));
        }
        check_coefficient("fixed_other", self.fixed_other)?;
        self.network.validate()
    }

    pub fn values(&self) -> Vec<f64> {
        linspace(self.range.0, self.range.1, self.samples)
    }

    fn seeds_for(&self, index: usize) -> (Seed, Seed) {
        match self.seed_policy {
            SeedPolicy::Fixed => (self.graph_seed, self.state_seed),
            SeedPolicy::PerSample => (self.graph_seed.offset(index), self.state_seed.offset(index)),
        }
    }
}

// Results -----------------------------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Peak(usize),
    Aborted(SimError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepSample {
    pub value: f64,
    pub outcome: SampleOutcome,
}

impl SweepSample {
    pub fn peak(&self) -> Option<usize> {
        match self.outcome {
            SampleOutcome::Peak(peak) => Some(peak),
            SampleOutcome::Aborted(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SimError> {
        match &self.outcome {
            SampleOutcome::Peak(_) => None,
            SampleOutcome::Aborted(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    coefficient: Coefficient,
    samples: Vec<SweepSample>,
    fit: Option<LinearFit>,
}

impl SweepResult {
    pub fn coefficient(&self) -> Coefficient {
        self.coefficient
    }

    pub fn samples(&self) -> &[SweepSample] {
        &self.samples
    }

    // (value, peak infected) for every sample that ran to completion
    pub fn points(&self) -> Vec<(f64, usize)> {
        self.samples
            .iter()
            .filter_map(|sample| sample.peak().map(|peak| (sample.value, peak)))
            .collect()
    }

    pub fn aborted(&self) -> usize {
        self.samples.iter().filter(|s| s.peak().is_none()).count()
    }

    // None when fewer than two samples completed
    pub fn fit(&self) -> Option<LinearFit> {
        self.fit
    }

    // coefficient value where the fitted trend crosses `peak_threshold`
    pub fn critical_value(&self, peak_threshold: f64) -> Option<f64> {
        self.fit?.solve_for(peak_threshold)
    }
}

// Sweep -------------------------------------------------------------------------------------------
/// Step the chosen coefficient across its range and regress the peak infected count on it.
///
/// Samples are independent and run in parallel. A sample that fails is kept as
/// `SampleOutcome::Aborted` and left out of the fit; the sweep itself only fails when its
/// parameters are malformed.
#[instrument(
    name = "sweep",
    skip(parms),
    fields(coefficient = %parms.coefficient, samples = parms.samples)
)]
pub fn sweep(parms: &SweepParms) -> Result<SweepResult> {
    parms.validate()?;

    let samples: Vec<SweepSample> = parms
        .values()
        .into_par_iter()
        .enumerate()
        .map(|(index, value)| {
            let outcome = match run_sample(parms, index, value) {
                Ok(peak) => SampleOutcome::Peak(peak),
                Err(err) => {
                    warn!(index, value, error = %err, "sweep sample aborted");
                    SampleOutcome::Aborted(err)
                }
            };
            SweepSample { value, outcome }
        })
        .collect();

    let points: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|sample| sample.peak().map(|peak| (sample.value, peak as f64)))
        .collect();
    let fit = match linear_fit(&points) {
        Ok(fit) => Some(fit),
        Err(err) => {
            warn!(completed = points.len(), error = %err, "sweep has no fitted trend");
            None
        }
    };

    let result = SweepResult {
        coefficient: parms.coefficient,
        samples,
        fit,
    };
    info!(
        completed = points.len(),
        aborted = result.aborted(),
        slope = result.fit.map(|f| f.slope),
        intercept = result.fit.map(|f| f.intercept),
        "sweep finished"
    );
    Ok(result)
}

fn run_sample(parms: &SweepParms, index: usize, value: f64) -> Result<usize> {
    let (graph_seed, state_seed) = parms.seeds_for(index);
    let mut simulation = Simulation::new(&parms.network, parms.seeds, graph_seed, state_seed)?
        .with_policy(parms.policy);
    let coefficients = parms.coefficient.coefficients(value, parms.fixed_other);
    let series = simulation.run(coefficients, parms.steps)?;
    Ok(series.peak_infected())
}

// Path length sweep -------------------------------------------------------------------------------
// used to pick the rewiring probability: the average path length of several independently
// seeded networks for each sampled p
#[derive(Debug, Clone, PartialEq)]
pub struct PathLengthParms {
    pub nodes: usize,
    pub degree: usize,
    pub range: (f64, f64),
    pub samples: usize,
    pub replicates: Vec<Seed>,
}

impl Default for PathLengthParms {
    fn default() -> PathLengthParms {
        PathLengthParms {
            nodes: 1000,
            degree: 10,
            range: (0.02, 0.04),
            samples: 20,
            replicates: Seed::replicates("nsll", 5),
        }
    }
}

impl PathLengthParms {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.range;
        NetworkParms::new(self.nodes, self.degree, lo).validate()?;
        NetworkParms::new(self.nodes, self.degree, hi).validate()?;
        if lo > hi {
            return Err(SimError::invalid(
                "range",
                format!("lower end {} is above upper end {}", lo, hi),
            ));
        }
        if self.samples == 0 {
            return Err(SimError::invalid("samples", "at least one sample is needed"));
        }
        if self.replicates.is_empty() {
            return Err(SimError::invalid(
                "replicates",
                "at least one replicate seed is needed",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PathLengthSample {
    pub rewiring: f64,
    pub spread: Option<Spread>, // None when every replicate failed
    pub replicates: usize,      // replicates measured
    pub failed: usize,          // replicates that could not be measured
}

#[instrument(name = "path_length_sweep", skip(parms), fields(samples = parms.samples))]
pub fn path_length_sweep(parms: &PathLengthParms) -> Result<Vec<PathLengthSample>> {
    parms.validate()?;

    let samples: Vec<PathLengthSample> = linspace(parms.range.0, parms.range.1, parms.samples)
        .into_par_iter()
        .map(|rewiring| {
            let network_parms = NetworkParms::new(parms.nodes, parms.degree, rewiring);
            let lengths: Vec<Result<f64>> = parms
                .replicates
                .par_iter()
                .map(|&seed| network_parms.generate(seed)?.average_shortest_path_length())
                .collect();
            let mut measured = Vec::with_capacity(lengths.len());
            let mut failed = 0usize;
            for length in lengths {
                match length {
                    Ok(length) => measured.push(length),
                    Err(err) => {
                        warn!(rewiring, error = %err, "replicate network not measured");
                        failed += 1;
                    }
                }
            }
            PathLengthSample {
                rewiring,
                spread: spread(&measured),
                replicates: measured.len(),
                failed,
            }
        })
        .collect();

    info!(samples = samples.len(), "path length sweep finished");
    Ok(samples)
}
