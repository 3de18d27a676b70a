//! End-to-end runs of the generator, metrics and transition engine on known networks.

use proptest::prelude::*;
use rumor::{
    compute_metrics, generate_network, init_state, run, step, sweep, Coefficient, NetworkParms,
    ProbabilityPolicy, Seed, SimError, SweepParms,
};

#[test]
fn ring_lattice_without_rewiring() {
    let network = generate_network(20, 4, 0.0, Seed::from_label("nsll")).expect("valid lattice");
    assert_eq!(network.edge_count(), 40);
    for node in 0..20 {
        assert_eq!(network.degree(node), 4);
    }
    let length = network.average_shortest_path_length().expect("connected");
    assert!((length - 55.0 / 19.0).abs() < 1e-12);

    let metrics = compute_metrics(&network);
    for node in 0..20 {
        assert!((metrics.clustering(node) - 0.5).abs() < 1e-12);
        assert!((metrics.betweenness(node) - 2.0 / 19.0).abs() < 1e-12);
    }
}

#[test]
fn default_small_world_has_short_paths() {
    let parms = NetworkParms::default();
    let network = parms
        .generate(Seed::from_label("nsll"))
        .expect("valid parameters");
    assert_eq!(network.node_count(), 1000);
    assert_eq!(network.edge_count(), 5000);
    let length = network.average_shortest_path_length().expect("connected");
    // the unrewired lattice sits near 50
    assert!(length > 3.0 && length < 6.0, "average path length {}", length);
}

#[test]
fn zero_coefficients_freeze_the_epidemic() {
    let network = generate_network(200, 6, 0.1, Seed::new(3)).expect("valid parameters");
    let metrics = compute_metrics(&network);
    let mut state = init_state(&network, 4, 1, Seed::new(3)).expect("valid seeds");
    let start = state.counts();
    let series = run(&mut state, &network, &metrics, 0.0, 0.0, 30).expect("valid run");
    for row in series.rows() {
        assert_eq!(row.susceptible, start.susceptible);
        assert_eq!(row.infected, start.infected);
        assert_eq!(row.recovered, start.recovered);
    }
}

#[test]
fn strong_infection_saturates_a_small_ring() {
    let network = generate_network(8, 4, 0.0, Seed::new(0)).expect("valid lattice");
    let metrics = compute_metrics(&network);
    let mut state = init_state(&network, 1, 0, Seed::new(11)).expect("valid seeds");
    step(&mut state, &network, &metrics, 50.0, 0.0).expect("valid step");
    assert_eq!(state.infected().len(), 5);
    step(&mut state, &network, &metrics, 50.0, 0.0).expect("valid step");
    assert_eq!(state.infected().len(), 8);
    assert!(state.recovered().is_empty());
}

#[test]
fn strict_policy_rejects_probabilities_above_one() {
    let network = generate_network(8, 4, 0.0, Seed::new(0)).expect("valid lattice");
    let metrics = compute_metrics(&network);
    let mut state = init_state(&network, 1, 0, Seed::new(11))
        .expect("valid seeds")
        .with_policy(ProbabilityPolicy::Strict);
    let before = state.labels().to_vec();
    match step(&mut state, &network, &metrics, 50.0, 0.0) {
        Err(SimError::NumericDegeneracy { probability, .. }) => assert!(probability > 1.0),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(state.labels(), before.as_slice());
}

#[test]
fn small_sweep_fits_a_line() {
    let mut parms = SweepParms::new(Coefficient::Infection, (1.9, 5.1), 5, 5.2, 60);
    parms.network = NetworkParms::new(150, 6, 0.05);
    let result = sweep(&parms).expect("valid sweep");
    assert_eq!(result.samples().len(), 5);
    assert_eq!(result.aborted(), 0);
    let fit = result.fit().expect("every sample completed");
    assert!(fit.slope.is_finite());
    assert!(fit.intercept.is_finite());
    assert!((0.0..=1.0 + 1e-12).contains(&fit.r_squared));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn compartments_are_conserved_and_recovery_is_absorbing(
        graph_seed in any::<u64>(),
        state_seed in any::<u64>(),
        alpha in 0.0f64..60.0,
        beta in 0.0f64..60.0,
    ) {
        let network = generate_network(60, 4, 0.2, Seed::new(graph_seed)).expect("valid parameters");
        let metrics = compute_metrics(&network);
        let mut state = init_state(&network, 3, 1, Seed::new(state_seed)).expect("valid seeds");
        let series = run(&mut state, &network, &metrics, alpha, beta, 20).expect("valid run");

        for row in series.rows() {
            prop_assert_eq!(row.susceptible + row.infected + row.recovered, 60);
        }
        for pair in series.recovered().windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
        for pair in series.susceptible().windows(2) {
            prop_assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn identical_seeds_replay_identically(seed in any::<u64>()) {
        let network = generate_network(60, 4, 0.2, Seed::new(seed)).expect("valid parameters");
        let metrics = compute_metrics(&network);
        let mut first = init_state(&network, 3, 1, Seed::new(seed)).expect("valid seeds");
        let mut second = init_state(&network, 3, 1, Seed::new(seed)).expect("valid seeds");
        let a = run(&mut first, &network, &metrics, 20.0, 10.0, 15).expect("valid run");
        let b = run(&mut second, &network, &metrics, 20.0, 10.0, 15).expect("valid run");
        prop_assert_eq!(a, b);
        prop_assert_eq!(first.labels(), second.labels());
    }
}
