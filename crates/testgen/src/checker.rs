//! Replays a generated command stream through a fresh
//! [`TransactionManager`] and asserts the invariants that are checkable
//! without a reference linearizer: atomicity, monotone commit ticks,
//! first-committer-wins, and down-site silence. Snapshot correctness,
//! recovery gating, and SSI soundness are exercised instead by
//! `acssi-core`'s own integration tests, which replay fixed scenarios with
//! known-correct outcomes.

use std::collections::{HashMap, HashSet};

use acssi_core::{Event, SiteId, Tick, TmError, TransactionManager, TxId, VarId};
use acssi_parser::{parse_line, Command};

/// The result of [`check`]: how many transactions were observed, and a
/// human-readable violation per failed invariant (empty means PASS).
#[derive(Debug, Default)]
pub struct InvariantReport {
    pub transactions_seen: usize,
    pub violations: Vec<String>,
}

#[derive(Default)]
struct TxFacts {
    start_tick: Option<Tick>,
    commit_tick: Option<Tick>,
    aborted: bool,
    writes: HashSet<VarId>,
}

/// Runs `lines` through a fresh [`TransactionManager`] and checks
/// invariants 1 (atomicity), 2 (monotone commit tick), 4
/// (first-committer-wins) and 7 (down-site silence).
#[must_use]
pub fn check(lines: &[String]) -> InvariantReport {
    let mut tm = TransactionManager::new();
    let mut facts: HashMap<TxId, TxFacts> = HashMap::new();

    for line in lines {
        for ev in tm.advance() {
            record(&mut facts, &ev);
        }
        if let Ok(Some(cmd)) = parse_line(line) {
            if let Ok(events) = dispatch(&mut tm, cmd) {
                for ev in &events {
                    record(&mut facts, ev);
                }
            }
        }
    }

    let mut violations = Vec::new();
    check_atomicity_and_monotonicity(&tm, &facts, &mut violations);
    check_first_committer_wins(&facts, &mut violations);
    check_down_site_silence(&tm, &mut violations);

    InvariantReport {
        transactions_seen: facts.len(),
        violations,
    }
}

fn record(facts: &mut HashMap<TxId, TxFacts>, ev: &Event) {
    match ev {
        Event::Begin { tx, tick } => facts.entry(*tx).or_default().start_tick = Some(*tick),
        Event::WriteAck { tx, var, .. } => {
            facts.entry(*tx).or_default().writes.insert(*var);
        }
        Event::Commit { tx, tick } => facts.entry(*tx).or_default().commit_tick = Some(*tick),
        Event::Abort { tx, .. } => facts.entry(*tx).or_default().aborted = true,
        Event::Read { .. } | Event::Wait { .. } | Event::SiteFail { .. } | Event::SiteRecover { .. } | Event::Dump(_) => {}
    }
}

fn dispatch(tm: &mut TransactionManager, cmd: Command) -> Result<Vec<Event>, TmError> {
    match cmd {
        Command::Begin(tx) => tm.begin(tx),
        Command::Read(tx, var) => tm.read(tx, var),
        Command::Write(tx, var, value) => tm.write(tx, var, value),
        Command::End(tx) => tm.end(tx),
        Command::Fail(site) => tm.fail(site),
        Command::Recover(site) => tm.recover(site),
        Command::Dump => Ok(tm.dump()),
    }
}

fn each_site_var() -> impl Iterator<Item = (SiteId, VarId)> {
    (1..=acssi_core::NUM_SITES)
        .flat_map(|s| (1..=acssi_core::NUM_VARIABLES).map(move |v| (SiteId(s), VarId::new(v))))
}

/// Invariant 1: no aborted transaction's id appears as a writer in any
/// site's chain. Invariant 2: within one site's chain, `commit_tick` is
/// strictly increasing.
fn check_atomicity_and_monotonicity(
    tm: &TransactionManager,
    facts: &HashMap<TxId, TxFacts>,
    violations: &mut Vec<String>,
) {
    for (site, var) in each_site_var() {
        let chain = tm.site_chain(site, var);
        for version in chain {
            if facts.get(&version.writer).is_some_and(|f| f.aborted) {
                violations.push(format!(
                    "atomicity: site {site} {var} carries a version written by aborted {}",
                    version.writer
                ));
            }
        }
        for pair in chain.windows(2) {
            if pair[0].commit_tick >= pair[1].commit_tick {
                violations.push(format!(
                    "monotonicity: site {site} {var} has non-increasing commit ticks ({} then {})",
                    pair[0].commit_tick, pair[1].commit_tick
                ));
            }
        }
    }
}

/// Invariant 4: no two committed transactions with overlapping
/// `[start_tick, commit_tick]` lifetimes both wrote the same variable.
fn check_first_committer_wins(facts: &HashMap<TxId, TxFacts>, violations: &mut Vec<String>) {
    let mut by_var: HashMap<VarId, Vec<(Tick, Tick, TxId)>> = HashMap::new();
    for (&id, f) in facts {
        let Some(commit) = f.commit_tick else { continue };
        let start = f.start_tick.unwrap_or(0);
        for &var in &f.writes {
            by_var.entry(var).or_default().push((start, commit, id));
        }
    }
    for (var, writers) in by_var {
        for i in 0..writers.len() {
            for j in (i + 1)..writers.len() {
                let (s1, c1, t1) = writers[i];
                let (s2, c2, t2) = writers[j];
                if s1 < c2 && s2 < c1 {
                    violations.push(format!(
                        "first-committer-wins: {t1} and {t2} both committed writes to {var} with overlapping lifetimes"
                    ));
                }
            }
        }
    }
}

/// Invariant 7: no version's `commit_tick` falls inside a fail interval
/// for the site that carries it.
fn check_down_site_silence(tm: &TransactionManager, violations: &mut Vec<String>) {
    for (site, var) in each_site_var() {
        let history = tm.site_fail_history(site);
        for version in tm.site_chain(site, var) {
            for interval in history {
                let still_down = interval.recover_tick.is_none_or(|r| version.commit_tick < r);
                if version.commit_tick >= interval.fail_tick && still_down {
                    violations.push(format!(
                        "down-site-silence: site {site} {var} committed at tick {} while down",
                        version.commit_tick
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate_stream;

    #[test]
    fn a_generated_stream_never_violates_the_checkable_invariants() {
        for seed in 0..8 {
            let lines = generate_stream(seed, 10, 20, 300);
            let report = check(&lines);
            assert!(
                report.violations.is_empty(),
                "seed {seed} produced violations: {:?}",
                report.violations
            );
        }
    }

    #[test]
    fn a_clean_run_with_no_commands_reports_no_transactions() {
        let lines: Vec<String> = vec![String::new(); 5];
        let report = check(&lines);
        assert_eq!(report.transactions_seen, 0);
        assert!(report.violations.is_empty());
    }
}
