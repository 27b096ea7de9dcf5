//! The live serialization graph the TM validates against at commit time.
//!
//! Three typed edge sets — write-read (WR), write-write (WW), and
//! read-write anti-dependency (RW) — are kept as separate [`DiGraph`]s
//! rather than one multigraph, so each kind can be queried without
//! filtering by a tag on every lookup.
//!
//! # Algorithm
//!
//! A transaction `T` must abort if it sits on a cycle formed by two
//! *consecutive* RW edges (`A -RW-> B -RW-> C`, plus any path, of any edge
//! kind, closing the cycle back from `C` to `A`). This is the standard SSI
//! "dangerous structure" rule: a cycle built purely from WR/WW edges, or
//! from a single RW edge, cannot make an otherwise-serializable history
//! non-serializable, but two adjacent RW edges on a cycle can.
//!
//! # Reference
//!
//! Cahill, Röhm & Fekete, "Serializable Isolation for Snapshot Databases"
//! (SIGMOD 2008), the dangerous-structure theorem for SSI.

use alloc::vec::Vec;

use crate::graph::digraph::DiGraph;
use crate::ids::TxId;

#[derive(Debug, Clone, Default)]
pub struct SerializationGraph {
    wr: DiGraph<TxId>,
    ww: DiGraph<TxId>,
    rw: DiGraph<TxId>,
}

impl SerializationGraph {
    pub fn add_wr(&mut self, from: TxId, to: TxId) {
        self.wr.add_edge(from, to);
    }

    pub fn add_ww(&mut self, from: TxId, to: TxId) {
        self.ww.add_edge(from, to);
    }

    pub fn add_rw(&mut self, from: TxId, to: TxId) {
        self.rw.add_edge(from, to);
    }

    /// Drops a transaction (and every edge touching it) from the graph —
    /// used both on abort and on garbage collection of old committed
    /// transactions.
    pub fn remove_transaction(&mut self, tx: TxId) {
        self.wr.remove_vertex(&tx);
        self.ww.remove_vertex(&tx);
        self.rw.remove_vertex(&tx);
    }

    fn merged(&self) -> DiGraph<TxId> {
        let mut m = self.wr.clone();
        m.union(&self.ww);
        m.union(&self.rw);
        m
    }

    /// Searches for a dangerous structure (`A -RW-> B -RW-> C`, with `C`
    /// able to reach `A` by any edge kind, including `C == A`) that `t`
    /// participates in as `A`, `B`, or `C`. Per the commit-time tie-break
    /// rule, only the transaction currently attempting to commit is ever
    /// aborted for this reason — a dangerous structure that exists
    /// entirely among other transactions is not `t`'s problem.
    #[must_use]
    pub fn find_rw_rw_violation_involving(&self, t: TxId) -> Option<(TxId, TxId, TxId)> {
        let closure = self.merged().closure();
        for (b, succs) in &self.rw.adj_map {
            let preds = self.rw.predecessors(b);
            if preds.is_empty() {
                continue;
            }
            for a in &preds {
                for c in succs {
                    let closes = a == c || closure.has_edge(c, a);
                    if closes && (*a == t || *b == t || *c == t) {
                        return Some((*a, *b, *c));
                    }
                }
            }
        }
        None
    }

    #[cfg(test)]
    fn find_any_rw_rw_violation(&self) -> Option<(TxId, TxId, TxId)> {
        let closure = self.merged().closure();
        for (b, succs) in &self.rw.adj_map {
            let preds = self.rw.predecessors(b);
            for a in &preds {
                for c in succs {
                    if a == c || closure.has_edge(c, a) {
                        return Some((*a, *b, *c));
                    }
                }
            }
        }
        None
    }

    #[must_use]
    pub fn wr_edges(&self) -> Vec<(TxId, TxId)> {
        self.wr.to_edge_list()
    }

    #[must_use]
    pub fn ww_edges(&self) -> Vec<(TxId, TxId)> {
        self.ww.to_edge_list()
    }

    #[must_use]
    pub fn rw_edges(&self) -> Vec<(TxId, TxId)> {
        self.rw.to_edge_list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_rw_edges_on_a_cycle_are_dangerous() {
        let mut g = SerializationGraph::default();
        g.add_rw(TxId(1), TxId(2));
        g.add_rw(TxId(2), TxId(3));
        g.add_wr(TxId(3), TxId(1));
        assert_eq!(
            g.find_any_rw_rw_violation(),
            Some((TxId(1), TxId(2), TxId(3)))
        );
        assert!(g.find_rw_rw_violation_involving(TxId(2)).is_some());
        assert!(g.find_rw_rw_violation_involving(TxId(99)).is_none());
    }

    #[test]
    fn single_rw_edge_alone_is_not_dangerous() {
        let mut g = SerializationGraph::default();
        g.add_rw(TxId(1), TxId(2));
        g.add_wr(TxId(2), TxId(1));
        assert_eq!(g.find_any_rw_rw_violation(), None);
    }

    #[test]
    fn two_rw_edges_without_a_closing_path_are_not_dangerous() {
        let mut g = SerializationGraph::default();
        g.add_rw(TxId(1), TxId(2));
        g.add_rw(TxId(2), TxId(3));
        assert_eq!(g.find_any_rw_rw_violation(), None);
    }

    #[test]
    fn removing_a_transaction_clears_its_edges() {
        let mut g = SerializationGraph::default();
        g.add_rw(TxId(1), TxId(2));
        g.add_rw(TxId(2), TxId(3));
        g.add_wr(TxId(3), TxId(1));
        g.remove_transaction(TxId(2));
        assert_eq!(g.find_any_rw_rw_violation(), None);
    }
}
