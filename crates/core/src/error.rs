//! Error and abort-reason taxonomy.
//!
//! Two enums, composed with `derive_more::From` rather than `thiserror`
//! (the latter needs `std`; this crate does not).

use core::fmt;

use alloc::string::String;

use crate::ids::{SiteId, TxId, VarId};

/// Why a transaction's `end` failed the commit-time validation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// A concurrent transaction committed a write to a variable this
    /// transaction also wrote, after this transaction's snapshot began.
    WwConflict,
    /// This transaction sits on a cycle in the serialization graph formed
    /// by two consecutive RW edges.
    SsiRwRwCycle,
    /// A site this transaction wrote to failed before the write could be
    /// confirmed committed.
    SiteFailedAfterWrite,
    /// No currently-servable copy of a replicated variable can ever
    /// satisfy this transaction's read, by the continuity rule.
    SnapshotUnavailable,
    /// A write found no Up site to apply to at write time.
    AvailableCopiesNoTarget,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::WwConflict => "ww-conflict",
            Self::SsiRwRwCycle => "ssi-rw-rw-cycle",
            Self::SiteFailedAfterWrite => "site-failed-after-write",
            Self::SnapshotUnavailable => "snapshot-unavailable",
            Self::AvailableCopiesNoTarget => "available-copies-no-target",
        };
        f.write_str(s)
    }
}

/// Errors raised by a call into the [`crate::tm::TransactionManager`] that
/// does not correspond to a transaction abort: an unknown id, or a
/// protocol violation (e.g. `fail` on a site already down). The driver
/// reports these to stderr and moves on to the next tick.
#[derive(Debug, Clone, PartialEq, Eq, ::derive_more::From)]
pub enum TmError {
    UnknownTransaction(TxId),
    UnknownSite(SiteId),
    UnknownVariable(VarId),
    ProtocolViolation(String),
}

impl fmt::Display for TmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTransaction(tx) => write!(f, "unknown transaction {tx}"),
            Self::UnknownSite(site) => write!(f, "unknown site {site}"),
            Self::UnknownVariable(var) => write!(f, "unknown variable {var}"),
            Self::ProtocolViolation(msg) => write!(f, "protocol violation: {msg}"),
        }
    }
}
