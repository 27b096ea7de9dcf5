//! Events emitted by the [`crate::tm::TransactionManager`] in response to a
//! command. The driver formats these to stdout per the command grammar's
//! output table.

use alloc::vec::Vec;

use crate::error::AbortReason;
use crate::ids::{SiteId, Tick, TxId, VarId};

/// A single site's final known values, as reported by `dump()`.
#[derive(Debug, Clone)]
pub struct SiteDump {
    pub site: SiteId,
    /// `(variable, value)` pairs in ascending variable order.
    pub values: Vec<(VarId, i64)>,
}

/// Something worth telling the outside world about.
#[derive(Debug, Clone)]
pub enum Event {
    /// A transaction was created.
    Begin { tx: TxId, tick: Tick },
    /// A read was served immediately.
    Read { tx: TxId, var: VarId, value: i64 },
    /// A read (or the implicit read inside a write's target search) could
    /// not be served this tick and the transaction is now blocked.
    Wait { tx: TxId, var: VarId },
    /// A write was buffered against the given target sites.
    WriteAck {
        tx: TxId,
        var: VarId,
        sites: Vec<SiteId>,
    },
    /// The transaction committed.
    Commit { tx: TxId, tick: Tick },
    /// The transaction aborted.
    Abort { tx: TxId, reason: AbortReason },
    /// A site went down.
    SiteFail { site: SiteId },
    /// A site came back up.
    SiteRecover { site: SiteId },
    /// The result of a `dump` command.
    Dump(Vec<SiteDump>),
}
