/////////////////////////////////////////////////////////////////////////////////////
//
// Rumor model
//
// data_management module
//
// functions to read and write from file system
//
////////////////////////////////////////////////////////////////////////////////////

use crate::epidemic::{Coefficients, InitialSeeds, ProbabilityPolicy};
use crate::error::SimError;
use crate::network::NetworkParms;
use crate::simulation::TimeSeries;
use crate::sweep::{
    Coefficient, PathLengthParms, PathLengthSample, SeedPolicy, SweepParms, SweepResult,
};
use crate::utilities::Seed;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use yaml_rust::{ScanError, Yaml, YamlLoader};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed parameter file: {0}")]
    Yaml(#[from] ScanError),
    #[error("parameter file holds no document")]
    EmptyDocument,
    #[error("parameter `{key}` is missing or has the wrong type")]
    Parameter { key: String },
    #[error("unknown value `{value}` for parameter `{key}`")]
    UnknownValue { key: String, value: String },
    #[error("could not write {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error(transparent)]
    Simulation(#[from] SimError),
}

type Result<T> = std::result::Result<T, DataError>;

// -------------------------------- File paths -------------------------------------------------------------
pub struct ModelDataStore {
    parameter_file: PathBuf,
    results_dir: PathBuf,
}

impl ModelDataStore {
    // parameters are read from <model_root>/parms.yaml and results go to
    // <model_root>/Results, which is emptied first
    pub fn new(model_root: &Path) -> Result<ModelDataStore> {
        let parameter_file = model_root.join("parms.yaml");
        let results_dir = model_root.join("Results");

        if results_dir.exists() {
            fs::remove_dir_all(&results_dir).map_err(|source| DataError::Io {
                path: results_dir.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&results_dir).map_err(|source| DataError::Io {
            path: results_dir.clone(),
            source,
        })?;
        debug!(root = %model_root.display(), "model data store ready");

        Ok(ModelDataStore {
            parameter_file,
            results_dir,
        })
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn get_model_parms(&self) -> Result<ModelParameters> {
        let text = fs::read_to_string(&self.parameter_file).map_err(|source| DataError::Io {
            path: self.parameter_file.clone(),
            source,
        })?;
        parse_model_parms(&text)
    }

    pub fn save_series(&self, name: &str, series: &TimeSeries) -> Result<PathBuf> {
        let path = self.results_dir.join(format!("{}_series.csv", name));
        write_rows(&path, series.rows())?;
        Ok(path)
    }

    pub fn save_sweep(&self, result: &SweepResult) -> Result<PathBuf> {
        let path = self
            .results_dir
            .join(format!("sweep_{}.csv", result.coefficient()));
        write_rows(
            &path,
            result.samples().iter().map(|sample| SweepRow {
                value: sample.value,
                peak_infected: sample.peak(),
                error: sample.error().map(ToString::to_string),
            }),
        )?;

        if let Some(fit) = result.fit() {
            let fit_path = self
                .results_dir
                .join(format!("sweep_{}_fit.csv", result.coefficient()));
            write_rows(&fit_path, std::iter::once(fit))?;
        }
        Ok(path)
    }

    pub fn save_path_lengths(&self, samples: &[PathLengthSample]) -> Result<PathBuf> {
        let path = self.results_dir.join("path_length.csv");
        write_rows(
            &path,
            samples.iter().map(|sample| PathLengthRow {
                rewiring: sample.rewiring,
                mean: sample.spread.map(|s| s.mean),
                max: sample.spread.map(|s| s.max),
                min: sample.spread.map(|s| s.min),
                replicates: sample.replicates,
                failed: sample.failed,
            }),
        )?;
        Ok(path)
    }
}

// ----------------------------- Model parameters ----------------------------------------------------------
#[derive(Debug)]
pub struct ModelParameters {
    pub model_name: String,
    pub model_description: String,
    pub steps: usize,
    pub policy: ProbabilityPolicy,
    pub network: NetworkParms,
    pub graph_seed: Seed,
    pub seeds: InitialSeeds,
    pub state_seed: Seed,
    pub coefficients: Coefficients,
    pub scenario_variable: Option<Coefficient>,
    pub scenario_values: Vec<f64>,
    pub sweeps: Vec<SweepParms>,
    pub path_length: Option<PathLengthParms>,
}

impl fmt::Display for ModelParameters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Model name {}\nModel description {}\nNetwork {} nodes, degree {}, rewiring {}\nalpha {} beta {} over {} steps",
            self.model_name,
            self.model_description,
            self.network.nodes,
            self.network.degree,
            self.network.rewiring,
            self.coefficients.alpha,
            self.coefficients.beta,
            self.steps
        )
    }
}

impl ModelParameters {
    // one set of coefficients per scenario value, the scenario variable taking that value
    pub fn scenarios(&self) -> Scenarios<'_> {
        Scenarios {
            parms: self,
            current_increment: 0,
        }
    }
}

// the scenario iterator issues a sequence of coefficient pairs each one differing only by
// the value of the variable being sensitivity tested
pub struct Scenarios<'a> {
    parms: &'a ModelParameters,
    current_increment: usize,
}

impl<'a> Iterator for Scenarios<'a> {
    type Item = Coefficients;

    fn next(&mut self) -> Option<Coefficients> {
        let variable = self.parms.scenario_variable?;
        let value = *self.parms.scenario_values.get(self.current_increment)?;
        self.current_increment += 1;
        let base = self.parms.coefficients;
        Some(match variable {
            Coefficient::Infection => Coefficients::new(value, base.beta),
            Coefficient::Recovery => Coefficients::new(base.alpha, value),
        })
    }
}

pub fn parse_model_parms(text: &str) -> Result<ModelParameters> {
    // the loader creates an array of yaml documents; only the first one interests us
    let docs = YamlLoader::load_from_str(text)?;
    let doc = docs.first().ok_or(DataError::EmptyDocument)?;

    let model_name = optional_str(doc, &["model_name"])?.unwrap_or("rumor").to_owned();
    let model_description = optional_str(doc, &["model_description"])?
        .unwrap_or("")
        .to_owned();
    let steps = optional_usize(doc, &["steps"])?.unwrap_or(250);
    let policy = match optional_str(doc, &["probability_policy"])? {
        Some(name) => name
            .parse::<ProbabilityPolicy>()
            .map_err(|_| unknown("probability_policy", name))?,
        None => ProbabilityPolicy::default(),
    };

    // parse network parms ----------------------------------------------------
    let default_network = NetworkParms::default();
    let network = NetworkParms::new(
        optional_usize(doc, &["network", "nodes"])?.unwrap_or(default_network.nodes),
        optional_usize(doc, &["network", "degree"])?.unwrap_or(default_network.degree),
        optional_f64(doc, &["network", "rewiring"])?.unwrap_or(default_network.rewiring),
    );
    network.validate()?;
    let graph_seed = optional_seed(doc, &["network", "seed"])?.unwrap_or_default();

    // parse state parms ------------------------------------------------------
    let seeds = if optional_bool(doc, &["state", "scaled"])?.unwrap_or(false) {
        InitialSeeds::scaled_to(network.nodes)
    } else {
        let default_seeds = InitialSeeds::default();
        InitialSeeds::new(
            optional_usize(doc, &["state", "infected"])?.unwrap_or(default_seeds.infected),
            optional_usize(doc, &["state", "recovered"])?.unwrap_or(default_seeds.recovered),
        )
    };
    let state_seed = optional_seed(doc, &["state", "seed"])?.unwrap_or_default();

    let default_coefficients = Coefficients::default();
    let coefficients = Coefficients::new(
        optional_f64(doc, &["coefficients", "alpha"])?.unwrap_or(default_coefficients.alpha),
        optional_f64(doc, &["coefficients", "beta"])?.unwrap_or(default_coefficients.beta),
    );
    coefficients.validate()?;

    // parse scenario parms ---------------------------------------------------
    let scenario_variable = match optional_str(doc, &["scenario_parms", "scenario_variable"])? {
        Some(name) => Some(
            name.parse::<Coefficient>()
                .map_err(|_| unknown("scenario_parms.scenario_variable", name))?,
        ),
        None => None,
    };
    let scenario_values = optional_f64_list(doc, &["scenario_parms", "scenario_values"])?;

    // parse sweeps -----------------------------------------------------------
    let mut sweeps = Vec::new();
    if let Some(entries) = lookup(doc, &["sweeps"]).and_then(Yaml::as_vec) {
        for entry in entries {
            let name = required_str(entry, &["coefficient"], "sweeps.coefficient")?;
            let coefficient = name
                .parse::<Coefficient>()
                .map_err(|_| unknown("sweeps.coefficient", name))?;
            let defaults = match coefficient {
                Coefficient::Infection => SweepParms::infection_experiment(),
                Coefficient::Recovery => SweepParms::recovery_experiment(),
            };
            let mut sweep = SweepParms::new(
                coefficient,
                (
                    optional_f64(entry, &["from"])?.unwrap_or(defaults.range.0),
                    optional_f64(entry, &["to"])?.unwrap_or(defaults.range.1),
                ),
                optional_usize(entry, &["samples"])?.unwrap_or(defaults.samples),
                optional_f64(entry, &["fixed_other"])?.unwrap_or(defaults.fixed_other),
                steps,
            );
            sweep.network = network;
            sweep.seeds = seeds;
            sweep.graph_seed = graph_seed;
            sweep.state_seed = state_seed;
            sweep.policy = policy;
            if optional_bool(entry, &["per_sample_seeds"])?.unwrap_or(false) {
                sweep.seed_policy = SeedPolicy::PerSample;
            }
            sweep.validate()?;
            sweeps.push(sweep);
        }
    }

    // parse path length sweep ------------------------------------------------
    let path_length = match lookup(doc, &["path_length"]) {
        Some(section) => {
            let defaults = PathLengthParms::default();
            let label = optional_str(section, &["seed"])?.unwrap_or("nsll");
            let replicates = optional_usize(section, &["replicates"])?.unwrap_or(5);
            let parms = PathLengthParms {
                nodes: network.nodes,
                degree: network.degree,
                range: (
                    optional_f64(section, &["from"])?.unwrap_or(defaults.range.0),
                    optional_f64(section, &["to"])?.unwrap_or(defaults.range.1),
                ),
                samples: optional_usize(section, &["samples"])?.unwrap_or(defaults.samples),
                replicates: Seed::replicates(label, replicates),
            };
            parms.validate()?;
            Some(parms)
        }
        None => None,
    };

    Ok(ModelParameters {
        model_name,
        model_description,
        steps,
        policy,
        network,
        graph_seed,
        seeds,
        state_seed,
        coefficients,
        scenario_variable,
        scenario_values,
        sweeps,
        path_length,
    })
}

// yaml lookups - a missing key is None, a key with the wrong type is an error

fn lookup<'a>(doc: &'a Yaml, path: &[&str]) -> Option<&'a Yaml> {
    let mut node = doc;
    for key in path {
        node = &node[*key];
    }
    if node.is_badvalue() || matches!(node, Yaml::Null) {
        None
    } else {
        Some(node)
    }
}

fn parameter(path: &[&str]) -> DataError {
    DataError::Parameter {
        key: path.join("."),
    }
}

fn unknown(key: &str, value: &str) -> DataError {
    DataError::UnknownValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn optional_str<'a>(doc: &'a Yaml, path: &[&str]) -> Result<Option<&'a str>> {
    lookup(doc, path)
        .map(|node| node.as_str().ok_or_else(|| parameter(path)))
        .transpose()
}

fn required_str<'a>(doc: &'a Yaml, path: &[&str], key: &str) -> Result<&'a str> {
    optional_str(doc, path)?.ok_or_else(|| DataError::Parameter {
        key: key.to_owned(),
    })
}

fn optional_bool(doc: &Yaml, path: &[&str]) -> Result<Option<bool>> {
    lookup(doc, path)
        .map(|node| node.as_bool().ok_or_else(|| parameter(path)))
        .transpose()
}

fn optional_usize(doc: &Yaml, path: &[&str]) -> Result<Option<usize>> {
    lookup(doc, path)
        .map(|node| {
            node.as_i64()
                .filter(|value| *value >= 0)
                .map(|value| value as usize)
                .ok_or_else(|| parameter(path))
        })
        .transpose()
}

// integers are accepted where reals are expected, "5" is as good as "5.0"
fn as_number(node: &Yaml) -> Option<f64> {
    match node {
        Yaml::Integer(value) => Some(*value as f64),
        _ => node.as_f64(),
    }
}

fn optional_f64(doc: &Yaml, path: &[&str]) -> Result<Option<f64>> {
    lookup(doc, path)
        .map(|node| as_number(node).ok_or_else(|| parameter(path)))
        .transpose()
}

fn optional_f64_list(doc: &Yaml, path: &[&str]) -> Result<Vec<f64>> {
    match lookup(doc, path) {
        None => Ok(Vec::new()),
        Some(node) => node
            .as_vec()
            .ok_or_else(|| parameter(path))?
            .iter()
            .map(|value| as_number(value).ok_or_else(|| parameter(path)))
            .collect(),
    }
}

// seeds are labels ("nsll") or non-negative integers
fn optional_seed(doc: &Yaml, path: &[&str]) -> Result<Option<Seed>> {
    lookup(doc, path)
        .map(|node| match node {
            Yaml::String(label) => Ok(Seed::from_label(label)),
            Yaml::Integer(value) if *value >= 0 => Ok(Seed::new(*value as u64)),
            _ => Err(parameter(path)),
        })
        .transpose()
}

// ----------------------------- Output model results ------------------------------------------------------
#[derive(Debug, Serialize)]
struct SweepRow {
    value: f64,
    peak_infected: Option<usize>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PathLengthRow {
    rewiring: f64,
    mean: Option<f64>,
    max: Option<f64>,
    min: Option<f64>,
    replicates: usize,
    failed: usize,
}

fn write_rows<T, I>(path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let csv_error = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_error)?;
    for row in rows {
        wtr.serialize(row).map_err(csv_error)?;
    }
    wtr.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(file = %path.display(), "results written");
    Ok(())
}
