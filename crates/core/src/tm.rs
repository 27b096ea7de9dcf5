//! The Transaction Manager: the single entry point the driver calls once
//! per tick. Owns every site, every transaction (live and historical),
//! the commit-order history used for first-committer-wins, and the
//! serialization graph.

use hashbrown::HashMap;

use alloc::vec::Vec;

use crate::error::{AbortReason, TmError};
use crate::event::{Event, SiteDump};
use crate::graph::SerializationGraph;
use crate::ids::{SiteId, Tick, TxId, VarId, NUM_SITES, NUM_VARIABLES};
use crate::site::{FailInterval, Site};
use crate::txn::{PendingWrite, ReadRecord, Transaction, TxStatus};
use crate::version::Version;

/// The live simulation kernel.
pub struct TransactionManager {
    sites: Vec<Site>,
    transactions: HashMap<TxId, Transaction>,
    graph: SerializationGraph,
    /// `(commit_tick, writer)` pairs per variable, in commit order —
    /// the history first-committer-wins is checked against.
    committed_writers: HashMap<VarId, Vec<(Tick, TxId)>>,
    next_tx: u32,
    tick: Tick,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    #[must_use]
    pub fn new() -> Self {
        let mut sites = Vec::with_capacity(NUM_SITES as usize);
        for s in 1..=NUM_SITES {
            let site_id = SiteId(s);
            let vars: Vec<VarId> = (1..=NUM_VARIABLES)
                .map(VarId::new)
                .filter(|v| v.is_replicated() || v.home_site() == site_id)
                .collect();
            sites.push(Site::new(site_id, &vars));
        }
        Self {
            sites,
            transactions: HashMap::new(),
            graph: SerializationGraph::default(),
            committed_writers: HashMap::new(),
            next_tx: 0,
            tick: 0,
        }
    }

    #[must_use]
    pub const fn tick(&self) -> Tick {
        self.tick
    }

    #[must_use]
    pub fn transaction(&self, id: TxId) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    fn site(&self, id: SiteId) -> &Site {
        &self.sites[(id.0 - 1) as usize]
    }

    fn site_mut(&mut self, id: SiteId) -> &mut Site {
        &mut self.sites[(id.0 - 1) as usize]
    }

    /// Requires `site_id` to name one of the fixed `1..=NUM_SITES` sites.
    /// Every public entry point that takes a bare `SiteId` from the input
    /// grammar must call this before it ever reaches `site`/`site_mut`,
    /// which index straight into `self.sites` and would panic otherwise.
    fn require_known_site(site_id: SiteId) -> Result<(), TmError> {
        if site_id.0 == 0 || site_id.0 > NUM_SITES {
            Err(TmError::UnknownSite(site_id))
        } else {
            Ok(())
        }
    }

    /// Requires `var` to name one of the fixed `1..=NUM_VARIABLES`
    /// variables.
    fn require_known_var(var: VarId) -> Result<(), TmError> {
        if var.0 == 0 || var.0 > NUM_VARIABLES {
            Err(TmError::UnknownVariable(var))
        } else {
            Ok(())
        }
    }

    fn holder_site_ids(var: VarId) -> Vec<SiteId> {
        if var.is_replicated() {
            (1..=NUM_SITES).map(SiteId).collect()
        } else {
            alloc::vec![var.home_site()]
        }
    }

    /// Advances the logical clock by one tick and retries every
    /// transaction currently blocked on a read. Called once per input
    /// line, blank or not, before that line's command (if any) runs.
    pub fn advance(&mut self) -> Vec<Event> {
        self.tick += 1;
        let waiting: Vec<(TxId, VarId)> = self
            .transactions
            .values()
            .filter(|t| t.status == TxStatus::Active)
            .filter_map(|t| t.blocked_on.map(|v| (t.id, v)))
            .collect();
        let mut events = Vec::new();
        for (tx_id, var) in waiting {
            if let Ok(mut ev) = self.read(tx_id, var) {
                events.append(&mut ev);
            }
        }
        events
    }

    /// Begins a transaction under the caller-supplied id (the `Ti` named
    /// in `begin(Ti)`). Errors if that id already names a transaction in
    /// this run, active or not — ids are never reused.
    pub fn begin(&mut self, tx_id: TxId) -> Result<Vec<Event>, TmError> {
        if self.transactions.contains_key(&tx_id) {
            return Err(TmError::ProtocolViolation(alloc::format!(
                "{tx_id} already used"
            )));
        }
        self.transactions
            .insert(tx_id, Transaction::new(tx_id, self.tick));
        tracing::debug!(tx = tx_id.0, tick = self.tick, "began");
        Ok(alloc::vec![Event::Begin {
            tx: tx_id,
            tick: self.tick,
        }])
    }

    /// Requires the transaction to exist and be active.
    fn require_active(&self, tx_id: TxId) -> Result<(), TmError> {
        match self.transactions.get(&tx_id) {
            None => Err(TmError::UnknownTransaction(tx_id)),
            Some(tx) if tx.status != TxStatus::Active => Err(TmError::ProtocolViolation(
                alloc::format!("{tx_id} is not active"),
            )),
            Some(_) => Ok(()),
        }
    }

    pub fn read(&mut self, tx_id: TxId, var: VarId) -> Result<Vec<Event>, TmError> {
        Self::require_known_var(var)?;
        self.require_active(tx_id)?;
        let start = self.transactions.get(&tx_id).unwrap().start_tick;

        if let Some(pw) = self.transactions.get(&tx_id).unwrap().writes.get(&var) {
            let value = pw.value;
            let tick = self.tick;
            let tx = self.transactions.get_mut(&tx_id).unwrap();
            tx.blocked_on = None;
            tx.reads.push(ReadRecord {
                var,
                site: None,
                value,
                version_commit_tick: tick,
            });
            return Ok(alloc::vec![Event::Read { tx: tx_id, var, value }]);
        }

        let holders = Self::holder_site_ids(var);
        let served = holders.iter().find_map(|&site_id| {
            let site = self.site(site_id);
            let found = if var.is_replicated() {
                site.read_replicated(var, start)
            } else {
                site.read_nonreplicated(var, start)
            };
            found.map(|(value, commit_tick, writer)| (site_id, value, commit_tick, writer))
        });

        if let Some((site_id, value, commit_tick, writer)) = served {
            self.graph.add_wr(writer, tx_id);
            let tx = self.transactions.get_mut(&tx_id).unwrap();
            tx.blocked_on = None;
            tx.reads.push(ReadRecord {
                var,
                site: Some(site_id),
                value,
                version_commit_tick: commit_tick,
            });
            return Ok(alloc::vec![Event::Read { tx: tx_id, var, value }]);
        }

        if var.is_replicated() {
            let doomed = holders.iter().all(|&s| self.site(s).doomed_for(var, start));
            if doomed {
                return Ok(self.abort(tx_id, AbortReason::SnapshotUnavailable));
            }
        }

        let tx = self.transactions.get_mut(&tx_id).unwrap();
        tx.blocked_on = Some(var);
        Ok(alloc::vec![Event::Wait { tx: tx_id, var }])
    }

    pub fn write(&mut self, tx_id: TxId, var: VarId, value: i64) -> Result<Vec<Event>, TmError> {
        Self::require_known_var(var)?;
        self.require_active(tx_id)?;
        let tick = self.tick;
        let target_sites: Vec<SiteId> = Self::holder_site_ids(var)
            .into_iter()
            .filter(|&s| self.site(s).is_up())
            .collect();
        let tx = self.transactions.get_mut(&tx_id).unwrap();
        tx.writes.insert(
            var,
            PendingWrite {
                value,
                tick,
                target_sites: target_sites.clone(),
            },
        );
        Ok(alloc::vec![Event::WriteAck {
            tx: tx_id,
            var,
            sites: target_sites,
        }])
    }

    pub fn end(&mut self, tx_id: TxId) -> Result<Vec<Event>, TmError> {
        self.require_active(tx_id)?;
        let now = self.tick;
        tracing::debug!(tx = tx_id.0, tick = now, "validating commit");
        let (start_tick, writes): (Tick, Vec<(VarId, PendingWrite)>) = {
            let tx = self.transactions.get(&tx_id).unwrap();
            (
                tx.start_tick,
                tx.writes.iter().map(|(&v, pw)| (v, pw.clone())).collect(),
            )
        };

        for (_, pw) in &writes {
            if pw.target_sites.is_empty() {
                return Ok(self.abort(tx_id, AbortReason::AvailableCopiesNoTarget));
            }
            for &site_id in &pw.target_sites {
                if self.site(site_id).failed_during(pw.tick, now) {
                    return Ok(self.abort(tx_id, AbortReason::SiteFailedAfterWrite));
                }
            }
        }

        for (var, _) in &writes {
            if let Some(writers) = self.committed_writers.get(var) {
                if writers.iter().any(|&(c, _)| c > start_tick && c <= now) {
                    return Ok(self.abort(tx_id, AbortReason::WwConflict));
                }
            }
        }

        for (var, _) in &writes {
            if let Some(writers) = self.committed_writers.get(var) {
                for &(_, writer) in writers {
                    tracing::trace!(from = writer.0, to = tx_id.0, ?var, "ww edge");
                    self.graph.add_ww(writer, tx_id);
                }
            }
        }

        // RW anti-dependency: any other live transaction that read a
        // version of `var` is about to have that version overwritten by
        // this commit, so it read something `tx_id` "later" overwrote.
        for (var, _) in &writes {
            let readers: Vec<TxId> = self
                .transactions
                .values()
                .filter(|t| t.id != tx_id && t.status != TxStatus::Aborted)
                .filter(|t| t.reads.iter().any(|r| r.var == *var && r.site.is_some()))
                .map(|t| t.id)
                .collect();
            for reader in readers {
                tracing::trace!(from = reader.0, to = tx_id.0, ?var, "rw edge");
                self.graph.add_rw(reader, tx_id);
            }
        }

        if self.graph.find_rw_rw_violation_involving(tx_id).is_some() {
            tracing::debug!(tx = tx_id.0, "ssi cycle detected, aborting");
            return Ok(self.abort(tx_id, AbortReason::SsiRwRwCycle));
        }

        for (var, pw) in &writes {
            for &site_id in Self::holder_site_ids(*var).iter() {
                if self.site(site_id).is_up() {
                    self.site_mut(site_id).apply_commit(tx_id, now, *var, pw.value);
                }
            }
            self.committed_writers.entry(*var).or_default().push((now, tx_id));
        }

        let tx = self.transactions.get_mut(&tx_id).unwrap();
        tx.status = TxStatus::Committed;
        tx.commit_tick = Some(now);
        tx.writes.clear();

        self.gc_graph();
        tracing::debug!(tx = tx_id.0, tick = now, "committed");
        Ok(alloc::vec![Event::Commit { tx: tx_id, tick: now }])
    }

    fn abort(&mut self, tx_id: TxId, reason: AbortReason) -> Vec<Event> {
        self.graph.remove_transaction(tx_id);
        if let Some(tx) = self.transactions.get_mut(&tx_id) {
            tx.status = TxStatus::Aborted;
            tx.abort_reason = Some(reason);
            tx.writes.clear();
            tx.blocked_on = None;
        }
        tracing::debug!(tx = tx_id.0, %reason, "aborted");
        alloc::vec![Event::Abort { tx: tx_id, reason }]
    }

    /// Drops committed transactions from the graph once no remaining
    /// Active transaction's snapshot could still need to see them in a
    /// WR/WW/RW edge (i.e. once every Active transaction started after
    /// they committed).
    fn gc_graph(&mut self) {
        let min_active_start = self
            .transactions
            .values()
            .filter(|t| t.status == TxStatus::Active)
            .map(|t| t.start_tick)
            .min();
        let stale: Vec<TxId> = self
            .transactions
            .values()
            .filter(|t| t.status == TxStatus::Committed)
            .filter(|t| match min_active_start {
                Some(m) => t.commit_tick.is_some_and(|c| c < m),
                None => true,
            })
            .map(|t| t.id)
            .collect();
        for id in stale {
            self.graph.remove_transaction(id);
        }
    }

    pub fn fail(&mut self, site_id: SiteId) -> Result<Vec<Event>, TmError> {
        Self::require_known_site(site_id)?;
        let now = self.tick;
        if self.site_mut(site_id).fail(now) {
            Ok(alloc::vec![Event::SiteFail { site: site_id }])
        } else {
            Err(TmError::ProtocolViolation(alloc::format!(
                "site {site_id} is already down"
            )))
        }
    }

    pub fn recover(&mut self, site_id: SiteId) -> Result<Vec<Event>, TmError> {
        Self::require_known_site(site_id)?;
        let now = self.tick;
        if self.site_mut(site_id).recover(now) {
            Ok(alloc::vec![Event::SiteRecover { site: site_id }])
        } else {
            Err(TmError::ProtocolViolation(alloc::format!(
                "site {site_id} is already up"
            )))
        }
    }

    /// The full version chain for `(site, var)`, oldest first. Exposed for
    /// invariant checking (`acssi-testgen`'s `check` subcommand); the
    /// read/write/commit paths above never need more than the latest
    /// visible version.
    #[must_use]
    pub fn site_chain(&self, site: SiteId, var: VarId) -> &[Version] {
        self.site(site).chain(var)
    }

    /// `site`'s fail/recover history, oldest first.
    #[must_use]
    pub fn site_fail_history(&self, site: SiteId) -> &[FailInterval] {
        self.site(site).fail_history()
    }

    #[must_use]
    pub fn dump(&self) -> Vec<Event> {
        let dumps: Vec<SiteDump> = (1..=NUM_SITES)
            .map(|s| {
                let site = self.site(SiteId(s));
                SiteDump {
                    site: site.id(),
                    values: site.dump(),
                }
            })
            .collect();
        alloc::vec![Event::Dump(dumps)]
    }
}
