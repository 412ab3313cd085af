//! Directed-edge index over the finished rings
//!
//! One pass maps every directed ring edge `(u, v)` to its owning ring. Two
//! rings adjoin exactly when one holds `(u, v)` and the other `(v, u)`; a
//! direction present alone is a boundary edge of the manifold.

use manifold_common::{Error, Result, TimerCategory};

use crate::manifold::{BuildState, WalkManifold};

impl WalkManifold {
    /// Indexes every directed ring edge and completes the build.
    ///
    /// Legal once pairing has run and no partial rings remain queued.
    pub fn partial_update_connect(&mut self) -> Result<()> {
        if !self.pending_partials.is_empty() {
            return Err(Error::InvalidOrder(format!(
                "{} partial rings still await reconstruction",
                self.pending_partials.len()
            )));
        }
        self.enter_state(BuildState::ConnectingEdges)?;
        self.context.start_timer(TimerCategory::EdgeConnection);

        self.edge_rings.clear();
        for (index, ring) in self.rings.iter().enumerate() {
            for edge in ring.edges() {
                self.edge_rings.insert(edge, index as u32);
            }
        }

        self.context.stop_timer(TimerCategory::EdgeConnection);
        self.context.log_debug(format!(
            "connectivity: {} directed edges over {} rings",
            self.edge_rings.len(),
            self.rings.len(),
        ));
        self.enter_state(BuildState::Complete)
    }

    /// The ring owning a directed edge, if any
    pub fn ring_of_edge(&self, from: u32, to: u32) -> Option<u32> {
        self.edge_rings.get(&(from, to)).copied()
    }

    /// Returns true when the edge is held by two rings in opposing
    /// directions, making it interior to the manifold
    pub fn is_shared_edge(&self, from: u32, to: u32) -> Result<bool> {
        self.ensure_complete()?;
        Ok(self.edge_rings.contains_key(&(from, to)) && self.edge_rings.contains_key(&(to, from)))
    }
}
