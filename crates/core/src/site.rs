//! Per-site data manager: the version chains a site holds, its up/down
//! status, and the failure history that gates replicated reads.

use hashbrown::HashMap;

use alloc::vec::Vec;

use crate::ids::{SiteId, Tick, TxId, VarId};
use crate::version::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Up,
    Down,
}

/// One `[fail_tick, recover_tick)` window during which a site was down.
/// `recover_tick` is `None` while the site is still down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailInterval {
    pub fail_tick: Tick,
    pub recover_tick: Option<Tick>,
}

/// A single site's data manager.
///
/// Holds every replicated variable plus whichever non-replicated
/// variables are homed here. `readable` gates replicated reads per the
/// continuity rule: a site that fails loses `readable` for every
/// replicated variable it holds, and does not regain it on recovery until
/// a fresh write commits there.
#[derive(Debug, Clone)]
pub struct Site {
    id: SiteId,
    status: SiteStatus,
    chains: HashMap<VarId, Vec<Version>>,
    readable: HashMap<VarId, bool>,
    fail_history: Vec<FailInterval>,
}

impl Site {
    #[must_use]
    pub fn new(id: SiteId, vars: &[VarId]) -> Self {
        let mut chains = HashMap::new();
        let mut readable = HashMap::new();
        for &v in vars {
            chains.insert(v, alloc::vec![Version::genesis(v.initial_value())]);
            readable.insert(v, true);
        }
        Self {
            id,
            status: SiteStatus::Up,
            chains,
            readable,
            fail_history: Vec::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SiteId {
        self.id
    }

    #[must_use]
    pub const fn status(&self) -> SiteStatus {
        self.status
    }

    #[must_use]
    pub const fn is_up(&self) -> bool {
        matches!(self.status, SiteStatus::Up)
    }

    #[must_use]
    pub fn holds(&self, x: VarId) -> bool {
        self.chains.contains_key(&x)
    }

    /// Marks the site down. Returns `false` (a protocol violation) if it
    /// was already down.
    pub fn fail(&mut self, tick: Tick) -> bool {
        if !self.is_up() {
            return false;
        }
        self.status = SiteStatus::Down;
        self.fail_history.push(FailInterval {
            fail_tick: tick,
            recover_tick: None,
        });
        for readable in self.readable.values_mut() {
            *readable = false;
        }
        tracing::debug!(site = self.id.0, tick, "site down");
        true
    }

    /// Marks the site up. Returns `false` (a protocol violation) if it was
    /// already up. Non-replicated variables become immediately readable;
    /// replicated variables stay unreadable until a fresh commit.
    pub fn recover(&mut self, tick: Tick) -> bool {
        if self.is_up() {
            return false;
        }
        self.status = SiteStatus::Up;
        if let Some(open) = self.fail_history.last_mut() {
            open.recover_tick = Some(tick);
        }
        for (&var, readable) in &mut self.readable {
            if !var.is_replicated() {
                *readable = true;
            }
        }
        tracing::debug!(site = self.id.0, tick, "site up");
        true
    }

    /// The latest version with `commit_tick <= start_tick`, if any.
    fn visible_version(&self, x: VarId, start_tick: Tick) -> Option<&Version> {
        self.chains
            .get(&x)?
            .iter()
            .rev()
            .find(|v| v.commit_tick <= start_tick)
    }

    /// Serves a read of a non-replicated variable: the only gate is
    /// whether the site is up.
    #[must_use]
    pub fn read_nonreplicated(&self, x: VarId, start_tick: Tick) -> Option<(i64, Tick, TxId)> {
        if !self.is_up() {
            return None;
        }
        self.visible_version(x, start_tick)
            .map(|v| (v.value, v.commit_tick, v.writer))
    }

    /// Serves a read of a replicated variable, gated by the continuity
    /// rule: the site must be up, `readable[x]` must be true (i.e. no
    /// unresolved recovery is pending for this variable), and the site
    /// must have been continuously up from the chosen version's commit
    /// tick through the reader's start tick — `readable[x]` alone only
    /// tracks whether *some* commit has landed since the site's *most
    /// recent* recovery, not whether a failure fell inside the specific
    /// span this read depends on.
    #[must_use]
    pub fn read_replicated(&self, x: VarId, start_tick: Tick) -> Option<(i64, Tick, TxId)> {
        if !self.is_up() || !*self.readable.get(&x)? {
            return None;
        }
        let version = self.visible_version(x, start_tick)?;
        if !self.continuously_up_over(version.commit_tick, start_tick) {
            return None;
        }
        Some((version.value, version.commit_tick, version.writer))
    }

    /// Whether the site was continuously up over `[from, to]` — no fail
    /// interval (half-open `[fail_tick, recover_tick)`) intersects that
    /// span.
    fn continuously_up_over(&self, from: Tick, to: Tick) -> bool {
        !self.fail_history.iter().any(|iv| {
            let recovered_by = iv.recover_tick.unwrap_or(Tick::MAX);
            iv.fail_tick <= to && recovered_by > from
        })
    }

    /// Whether this site can *never* serve a replicated read for a
    /// transaction whose snapshot begins at `start_tick`.
    ///
    /// The version `visible_version` would hand back for `start_tick` is
    /// fixed forever once computed: the chain only grows forward, and
    /// nothing with a `commit_tick <= start_tick` can ever be appended
    /// after `now > start_tick`. So whether this site can ever serve `x`
    /// to this transaction reduces to whether it was continuously up
    /// across that version's `[commit_tick, start_tick]` span — exactly
    /// [`continuously_up_over`]. Current `is_up`/`readable` state is not
    /// itself decisive: a site can be up and readable right now because
    /// of a commit that postdates `start_tick`, while still being
    /// permanently unable to bridge the older version this transaction
    /// actually needs.
    #[must_use]
    pub fn doomed_for(&self, x: VarId, start_tick: Tick) -> bool {
        let doomed = match self.visible_version(x, start_tick) {
            None => true,
            Some(v) => !self.continuously_up_over(v.commit_tick, start_tick),
        };
        tracing::trace!(site = self.id.0, ?x, start_tick, doomed, "continuity check");
        doomed
    }

    /// Whether this site failed at any tick in `[from, to]`, i.e. after a
    /// write was issued and before (or at) the current tick — the
    /// available-copies write-side abort condition.
    #[must_use]
    pub fn failed_during(&self, from: Tick, to: Tick) -> bool {
        self.fail_history
            .iter()
            .any(|iv| iv.fail_tick >= from && iv.fail_tick <= to)
    }

    /// Applies a committed write, appending a new version and
    /// re-establishing `readable[x]` (relevant after a recovery).
    pub fn apply_commit(&mut self, writer: TxId, tick: Tick, x: VarId, value: i64) {
        if let Some(chain) = self.chains.get_mut(&x) {
            chain.push(Version {
                value,
                commit_tick: tick,
                writer,
            });
        }
        if let Some(readable) = self.readable.get_mut(&x) {
            *readable = true;
        }
        tracing::trace!(site = self.id.0, ?x, tick, value, writer = writer.0, "version committed");
    }

    /// The full version chain for `x` at this site, oldest first. Exposed
    /// for invariant checking (atomicity, monotone commit ticks) — not
    /// used by the read/write/commit paths themselves, which only ever
    /// need the latest visible version.
    #[must_use]
    pub fn chain(&self, x: VarId) -> &[Version] {
        self.chains.get(&x).map_or(&[], Vec::as_slice)
    }

    /// This site's fail/recover history, oldest first.
    #[must_use]
    pub fn fail_history(&self) -> &[FailInterval] {
        &self.fail_history
    }

    /// The last known value of every variable this site holds, in
    /// ascending variable order — reported even while the site is down.
    #[must_use]
    pub fn dump(&self) -> Vec<(VarId, i64)> {
        let mut vars: Vec<VarId> = self.chains.keys().copied().collect();
        vars.sort_unstable();
        vars.into_iter()
            .map(|v| {
                let value = self.chains[&v].last().map_or(0, |ver| ver.value);
                (v, value)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_with(vars: &[u8]) -> Site {
        let vars: Vec<VarId> = vars.iter().map(|&n| VarId(n)).collect();
        Site::new(SiteId(1), &vars)
    }

    #[test]
    fn genesis_is_readable_immediately() {
        let s = site_with(&[2]);
        assert_eq!(s.read_replicated(VarId(2), 0), Some((20, 0, TxId::genesis())));
    }

    #[test]
    fn fail_blocks_all_reads() {
        let mut s = site_with(&[2]);
        assert!(s.fail(3));
        assert_eq!(s.read_replicated(VarId(2), 5), None);
        assert_eq!(s.read_nonreplicated(VarId(2), 5), None);
    }

    #[test]
    fn double_fail_is_rejected() {
        let mut s = site_with(&[2]);
        assert!(s.fail(1));
        assert!(!s.fail(2));
    }

    #[test]
    fn recover_reopens_nonreplicated_but_not_replicated() {
        let mut s = site_with(&[2, 3]);
        s.fail(1);
        s.recover(2);
        assert_eq!(s.read_replicated(VarId(2), 5), None);
        assert!(s.read_nonreplicated(VarId(3), 5).is_some());
    }

    #[test]
    fn fresh_commit_reopens_replicated_reads() {
        let mut s = site_with(&[2]);
        s.fail(1);
        s.recover(2);
        s.apply_commit(TxId(7), 3, VarId(2), 99);
        assert_eq!(s.read_replicated(VarId(2), 5), Some((99, 3, TxId(7))));
    }

    /// A later commit can make `readable` true and leave only an older
    /// version visible to an earlier snapshot; if that older version's
    /// commit tick falls before a failure window that was still open at
    /// the reader's start tick, the read must be rejected even though the
    /// site is up and `readable` is true right now.
    #[test]
    fn stale_version_behind_a_closed_failure_window_is_rejected() {
        let mut s = site_with(&[2]);
        s.fail(2);
        s.recover(4);
        s.apply_commit(TxId(9), 7, VarId(2), 77);
        assert_eq!(s.read_replicated(VarId(2), 5), None);
    }

    #[test]
    fn doomed_when_break_precedes_start() {
        let mut s = site_with(&[2]);
        s.fail(1);
        assert!(s.doomed_for(VarId(2), 5));
    }

    /// Mirrors `stale_version_behind_a_closed_failure_window_is_rejected`:
    /// the site is up and currently readable, but that is only because a
    /// commit after the reader's start tick reopened it. The version the
    /// reader would actually get still sits behind a closed failure
    /// window, so this site can never serve it.
    #[test]
    fn doomed_for_an_old_snapshot_even_when_currently_readable() {
        let mut s = site_with(&[2]);
        s.fail(2);
        s.recover(4);
        s.apply_commit(TxId(9), 7, VarId(2), 77);
        assert!(s.is_up());
        assert!(s.doomed_for(VarId(2), 5));
    }

    #[test]
    fn not_doomed_when_break_follows_start() {
        let mut s = site_with(&[2]);
        s.fail(10);
        assert!(!s.doomed_for(VarId(2), 5));
    }

    #[test]
    fn dump_reports_last_known_value_even_when_down() {
        let mut s = site_with(&[2]);
        s.apply_commit(TxId(1), 1, VarId(2), 42);
        s.fail(2);
        assert_eq!(s.dump(), alloc::vec![(VarId(2), 42)]);
    }
}
