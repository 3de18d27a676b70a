//! Runs the binary against a parameter file and checks what lands in `Results`.

use std::fs;
use std::path::Path;
use std::process::Command;

const PARMS: &str = "
model_name: small
model_description: short run over a small network
steps: 30
network:
  nodes: 60
  degree: 4
  rewiring: 0.1
  seed: nsll
state:
  infected: 3
  recovered: 1
  seed: nsll
coefficients:
  alpha: 20
  beta: 10
scenario_parms:
  scenario_variable: alpha
  scenario_values: [5, 40]
sweeps:
  - coefficient: beta
    from: 5
    to: 25
    samples: 3
    fixed_other: 20
path_length:
  from: 0.1
  to: 0.2
  samples: 3
  seed: nsll
  replicates: 2
";

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("{} unreadable: {}", path.display(), err))
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn model_run_writes_every_result_file() {
    let root = tempfile::tempdir().expect("temporary directory");
    fs::write(root.path().join("parms.yaml"), PARMS).expect("parameter file written");
    // stale output from an earlier run is cleared
    fs::create_dir(root.path().join("Results")).expect("results directory");
    fs::write(root.path().join("Results").join("stale.csv"), "x").expect("stale file");

    let status = Command::new(env!("CARGO_BIN_EXE_rumor"))
        .arg(root.path())
        .env("RUST_LOG", "warn")
        .status()
        .expect("binary runs");
    assert!(status.success());

    let results = root.path().join("Results");
    assert!(!results.join("stale.csv").exists());

    let baseline = read_lines(&results.join("baseline_series.csv"));
    assert_eq!(baseline[0], "step,susceptible,infected,recovered");
    assert_eq!(baseline[1], "0,56,3,1");
    assert_eq!(baseline.len(), 32);

    for name in ["scenario_0001_series.csv", "scenario_0002_series.csv"] {
        let scenario = read_lines(&results.join(name));
        assert_eq!(scenario.len(), 32);
        assert_eq!(scenario[1], "0,56,3,1");
    }
    assert!(!results.join("scenario_0003_series.csv").exists());

    let sweep = read_lines(&results.join("sweep_beta.csv"));
    assert_eq!(sweep[0], "value,peak_infected,error");
    assert_eq!(sweep.len(), 4);
    let fit = read_lines(&results.join("sweep_beta_fit.csv"));
    assert_eq!(fit[0], "slope,intercept,r_squared");
    assert_eq!(fit.len(), 2);

    let path_length = read_lines(&results.join("path_length.csv"));
    assert_eq!(path_length[0], "rewiring,mean,max,min,replicates,failed");
    assert_eq!(path_length.len(), 4);
}

#[test]
fn missing_model_root_fails() {
    let status = Command::new(env!("CARGO_BIN_EXE_rumor"))
        .env("RUST_LOG", "off")
        .status()
        .expect("binary runs");
    assert!(!status.success());
}

#[test]
fn bad_parameters_fail_the_run() {
    let root = tempfile::tempdir().expect("temporary directory");
    fs::write(root.path().join("parms.yaml"), "network:\n  degree: 5\n").expect("written");
    let status = Command::new(env!("CARGO_BIN_EXE_rumor"))
        .arg(root.path())
        .env("RUST_LOG", "off")
        .status()
        .expect("binary runs");
    assert!(!status.success());
}
