//! Newtype identifiers shared across the simulation kernel.
//!
//! Kept distinct (rather than bare integers) so a variable index, a site
//! index, and a transaction id can never be passed to the wrong parameter
//! by accident.

use core::fmt;

/// Number of variables in the system: `x1..=x20`.
pub const NUM_VARIABLES: u8 = 20;
/// Number of sites: `1..=10`.
pub const NUM_SITES: u8 = 10;

/// A variable index, `1..=20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct VarId(pub u8);

/// A site index, `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct SiteId(pub u8);

/// A transaction identifier, named by the `Ti` in its `begin(Ti)` command.
/// `TxId(0)` is reserved for the synthetic genesis writer and is never
/// assigned to a real transaction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct TxId(pub u32);

impl TxId {
    /// The synthetic writer of every variable's initial version.
    #[must_use]
    pub const fn genesis() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn is_genesis(self) -> bool {
        self.0 == 0
    }
}

/// The logical tick: the 1-based index of the input line being processed.
/// Tick 0 is reserved for the genesis state that exists before any command
/// runs.
pub type Tick = u64;

impl VarId {
    #[must_use]
    pub const fn new(n: u8) -> Self {
        Self(n)
    }

    /// Even-indexed variables are replicated on every site; odd-indexed
    /// variables live on exactly one site.
    #[must_use]
    pub const fn is_replicated(self) -> bool {
        self.0 % 2 == 0
    }

    /// The unique site that holds a non-replicated variable: `1 + (i mod 10)`.
    /// Meaningless (but harmless) for replicated variables.
    #[must_use]
    pub const fn home_site(self) -> SiteId {
        SiteId(1 + self.0 % 10)
    }

    /// The value committed at tick 0 by the genesis writer: `10 * i`.
    #[must_use]
    pub const fn initial_value(self) -> i64 {
        10 * self.0 as i64
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
