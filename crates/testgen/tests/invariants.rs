use acssi_testgen::{checker, generate_stream};

#[test]
fn generated_streams_never_violate_the_checkable_invariants() {
    for seed in 100..116 {
        let lines = generate_stream(seed, 10, 20, 400);
        let report = checker::check(&lines);
        assert!(
            report.violations.is_empty(),
            "seed {seed} produced violations: {:?}",
            report.violations
        );
        assert!(report.transactions_seen > 0, "seed {seed} began no transactions");
    }
}

#[test]
fn a_small_deterministic_single_site_run_is_clean() {
    let lines = generate_stream(1, 1, 4, 60);
    let report = checker::check(&lines);
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}

#[test]
fn a_failure_heavy_run_still_respects_down_site_silence() {
    let lines = generate_stream(9, 3, 6, 250);
    let report = checker::check(&lines);
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}
