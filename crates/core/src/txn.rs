//! Transaction bookkeeping: status, buffered writes, and the read set the
//! serialization graph is built from.

use hashbrown::HashMap;

use alloc::vec::Vec;

use crate::error::AbortReason;
use crate::ids::{SiteId, Tick, TxId, VarId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Active,
    Committed,
    Aborted,
}

/// A write buffered by `W(T, x, v)` until `T` ends.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub value: i64,
    /// Tick at which this write (or its most recent overwrite) was issued.
    pub tick: Tick,
    /// Sites that were Up and held `x` when the write was issued. Empty
    /// means "no Up copy existed" and `end` must abort this transaction.
    pub target_sites: Vec<SiteId>,
}

/// One served read, kept so a later commit elsewhere can materialize the
/// RW anti-dependency edge it creates.
#[derive(Debug, Clone)]
pub struct ReadRecord {
    pub var: VarId,
    /// `None` when the value came from this transaction's own write
    /// buffer rather than a committed site version.
    pub site: Option<SiteId>,
    pub value: i64,
    /// The `commit_tick` of the version actually read (irrelevant, but
    /// harmless, when `site` is `None`).
    pub version_commit_tick: Tick,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TxId,
    pub start_tick: Tick,
    pub status: TxStatus,
    pub commit_tick: Option<Tick>,
    pub writes: HashMap<VarId, PendingWrite>,
    pub reads: Vec<ReadRecord>,
    /// The variable this transaction is currently blocked waiting to read,
    /// if any.
    pub blocked_on: Option<VarId>,
    pub abort_reason: Option<AbortReason>,
}

impl Transaction {
    #[must_use]
    pub fn new(id: TxId, start_tick: Tick) -> Self {
        Self {
            id,
            start_tick,
            status: TxStatus::Active,
            commit_tick: None,
            writes: HashMap::new(),
            reads: Vec::new(),
            blocked_on: None,
            abort_reason: None,
        }
    }
}
