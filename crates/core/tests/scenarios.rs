//! Replays the end-to-end scenarios against the public
//! [`TransactionManager`] API directly, one command per simulated tick.

use acssi_core::{AbortReason, Event, SiteId, TransactionManager, TxId, TxStatus, VarId, NUM_SITES};

fn tx(n: u32) -> TxId {
    TxId(n)
}

fn var(n: u8) -> VarId {
    VarId::new(n)
}

fn status(tm: &TransactionManager, id: TxId) -> TxStatus {
    tm.transaction(id).expect("transaction exists").status
}

fn abort_reason(tm: &TransactionManager, id: TxId) -> AbortReason {
    tm.transaction(id)
        .expect("transaction exists")
        .abort_reason
        .expect("transaction aborted")
}

fn read_value(events: &[Event]) -> i64 {
    match events.first() {
        Some(Event::Read { value, .. }) => *value,
        other => panic!("expected a Read event, got {other:?}"),
    }
}

fn dump_value(tm: &TransactionManager, site: SiteId, var: VarId) -> i64 {
    for event in tm.dump() {
        let Event::Dump(sites) = event else { continue };
        for d in sites {
            if d.site == site {
                return d
                    .values
                    .iter()
                    .find(|(v, _)| *v == var)
                    .map(|(_, val)| *val)
                    .unwrap_or_else(|| panic!("{site} dump has no entry for {var}"));
            }
        }
        panic!("dump missing {site}");
    }
    panic!("dump() produced no Dump event");
}

/// First-committer-wins: T2 commits first, T1's overlapping writes
/// to the same variables then abort on `ww-conflict`.
#[test]
fn first_committer_wins_aborts_the_overlapping_writer() {
    let mut tm = TransactionManager::new();
    tm.advance();
    tm.begin(tx(1)).unwrap();
    tm.advance();
    tm.begin(tx(2)).unwrap();
    tm.advance();
    tm.write(tx(1), var(1), 101).unwrap();
    tm.advance();
    tm.write(tx(2), var(2), 202).unwrap();
    tm.advance();
    tm.write(tx(1), var(2), 102).unwrap();
    tm.advance();
    tm.write(tx(2), var(1), 201).unwrap();

    tm.advance();
    tm.end(tx(2)).unwrap();
    tm.advance();
    tm.end(tx(1)).unwrap();

    assert_eq!(status(&tm, tx(2)), TxStatus::Committed);
    assert_eq!(status(&tm, tx(1)), TxStatus::Aborted);
    assert_eq!(abort_reason(&tm, tx(1)), AbortReason::WwConflict);

    assert_eq!(dump_value(&tm, var(1).home_site(), var(1)), 201);
    for site in 1..=NUM_SITES {
        assert_eq!(dump_value(&tm, SiteId(site), var(2)), 202);
    }
}

/// Two transactions read the same stale value and write disjoint
/// variables afterwards; the RW edge this creates is a single edge, not
/// a cycle, so both commit.
#[test]
fn benign_rw_order_lets_both_commit() {
    let mut tm = TransactionManager::new();
    tm.advance();
    tm.begin(tx(1)).unwrap();
    tm.advance();
    tm.begin(tx(2)).unwrap();

    tm.advance();
    let ev = tm.read(tx(1), var(2)).unwrap();
    assert_eq!(read_value(&ev), 20);

    tm.advance();
    let ev = tm.read(tx(2), var(2)).unwrap();
    assert_eq!(read_value(&ev), 20);

    tm.advance();
    tm.end(tx(1)).unwrap();

    tm.advance();
    tm.write(tx(2), var(2), 10).unwrap();

    tm.advance();
    tm.end(tx(2)).unwrap();

    assert_eq!(status(&tm, tx(1)), TxStatus::Committed);
    assert_eq!(status(&tm, tx(2)), TxStatus::Committed);
    for site in 1..=NUM_SITES {
        assert_eq!(dump_value(&tm, SiteId(site), var(2)), 10);
    }
}

/// T1 and T2 each read what the other is about to overwrite,
/// closing a two-edge RW cycle. The second committer, T2, aborts.
#[test]
fn ssi_rw_rw_cycle_aborts_the_second_committer() {
    let mut tm = TransactionManager::new();
    tm.advance();
    tm.begin(tx(1)).unwrap();
    tm.advance();
    tm.begin(tx(2)).unwrap();

    tm.advance();
    let ev = tm.read(tx(1), var(2)).unwrap();
    assert_eq!(read_value(&ev), 20);

    tm.advance();
    let ev = tm.read(tx(2), var(4)).unwrap();
    assert_eq!(read_value(&ev), 40);

    tm.advance();
    tm.write(tx(1), var(4), 30).unwrap();
    tm.advance();
    tm.write(tx(2), var(2), 90).unwrap();

    tm.advance();
    tm.end(tx(1)).unwrap();
    tm.advance();
    tm.end(tx(2)).unwrap();

    assert_eq!(status(&tm, tx(1)), TxStatus::Committed);
    assert_eq!(status(&tm, tx(2)), TxStatus::Aborted);
    assert_eq!(abort_reason(&tm, tx(2)), AbortReason::SsiRwRwCycle);
}

/// A site targeted by a buffered write fails before `end`, so the
/// commit cannot be confirmed durable there.
#[test]
fn write_then_site_fails_aborts_the_writer() {
    let mut tm = TransactionManager::new();
    tm.advance();
    tm.begin(tx(1)).unwrap();

    tm.advance();
    let ev = tm.write(tx(1), var(6), 66).unwrap();
    let Event::WriteAck { sites, .. } = &ev[0] else {
        panic!("expected WriteAck");
    };
    assert!(sites.contains(&SiteId(2)), "site 2 must be a target for a replicated variable with every site up");

    tm.advance();
    tm.fail(SiteId(2)).unwrap();

    tm.advance();
    tm.end(tx(1)).unwrap();

    assert_eq!(status(&tm, tx(1)), TxStatus::Aborted);
    assert_eq!(abort_reason(&tm, tx(1)), AbortReason::SiteFailedAfterWrite);
}

/// Every copy of a replicated variable fails; one recovers with no
/// fresh commit behind it, so the continuity rule still dooms any read.
#[test]
fn snapshot_unavailable_after_every_copy_fails() {
    let mut tm = TransactionManager::new();

    tm.advance();
    tm.begin(tx(5)).unwrap();
    tm.advance();
    tm.write(tx(5), var(8), 800).unwrap();
    tm.advance();
    tm.end(tx(5)).unwrap();
    assert_eq!(status(&tm, tx(5)), TxStatus::Committed);

    for site in 1..=NUM_SITES {
        tm.advance();
        tm.fail(SiteId(site)).unwrap();
    }

    tm.advance();
    tm.recover(SiteId(1)).unwrap();

    tm.advance();
    tm.begin(tx(9)).unwrap();

    tm.advance();
    tm.read(tx(9), var(8)).unwrap();

    assert_eq!(status(&tm, tx(9)), TxStatus::Aborted);
    assert_eq!(abort_reason(&tm, tx(9)), AbortReason::SnapshotUnavailable);
}

/// A non-replicated variable's only site is down; the read waits,
/// and is retried (and served) automatically once that site recovers.
#[test]
fn wait_for_unreplicated_on_down_site_then_succeeds_on_recovery() {
    let mut tm = TransactionManager::new();
    let home = var(3).home_site();
    assert_eq!(home, SiteId(4));

    tm.advance();
    tm.fail(home).unwrap();

    tm.advance();
    tm.begin(tx(1)).unwrap();

    tm.advance();
    let ev = tm.read(tx(1), var(3)).unwrap();
    assert!(matches!(ev.first(), Some(Event::Wait { tx: t, var: v }) if *t == tx(1) && *v == var(3)));

    tm.advance();
    tm.recover(home).unwrap();

    let retried = tm.advance();
    assert!(retried
        .iter()
        .any(|e| matches!(e, Event::Read { tx: t, var: v, value: 30 } if *t == tx(1) && *v == var(3))));
}
