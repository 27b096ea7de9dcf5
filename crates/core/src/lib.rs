//! Simulation kernel for a replicated, in-memory key-value store enforcing
//! Serializable Snapshot Isolation under an Available Copies replication
//! protocol, driven by a deterministic logical clock.
//!
//! This crate is the Transaction Manager and the per-site Data Managers.
//! It knows nothing about text: parsing a command stream into
//! [`TransactionManager`] calls is `acssi-parser`'s job, and driving the
//! tick loop from stdin/a file is `acssi-cli`'s job. Kept `no_std` (with
//! `alloc`) so the kernel has no opinion on I/O or threading.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod event;
pub mod graph;
pub mod ids;
pub mod site;
pub mod tm;
pub mod txn;
pub mod version;

pub use error::{AbortReason, TmError};
pub use event::{Event, SiteDump};
pub use ids::{SiteId, Tick, TxId, VarId, NUM_SITES, NUM_VARIABLES};
pub use site::{FailInterval, SiteStatus};
pub use tm::TransactionManager;
pub use txn::{Transaction, TxStatus};
pub use version::Version;
