//! Walkable surface manifold construction for cylindrical agents
//!
//! From an arbitrary collision scene, reached only through a small physics
//! query port, this crate builds a 2D polygonal mesh embedded in 3D on a
//! regular XZ grid: exactly the places a cylinder of the configured radius
//! and height can stand, with bounded slope and bounded step-up
//! connectivity. The mesh answers closest-point queries for locomotion and
//! supports flood-fill reachability marking.
//!
//! The pipeline has four steps, driven as a state machine:
//!
//! 1. **Pole sampling** — per grid corner, a descending chain of downward
//!    rays collects every height the agent can stand at.
//! 2. **Partial-ring pairing** — per cell, corner poles are greedily paired
//!    by height into ring candidates, bounded by the step height.
//! 3. **Ring reconstruction** — incomplete candidates get their boundary
//!    recovered by bisection ray probes along the open cell edges.
//! 4. **Edge connection** — a directed-edge index makes neighbor traversal
//!    and reachability possible.
//!
//! Builds run atomically with [`WalkManifold::update`], cooperatively with
//! [`WalkManifold::update_async`], or step by step through the
//! `partial_update_*` primitives.

mod connectivity;
mod manifold;
mod partial_ring;
mod physics;
mod pole_sampler;
mod query;
mod reconstruction;
mod ring;
mod scene;
mod settings;

pub use manifold::{BuildState, CancelToken, Pole, WalkManifold};
pub use partial_ring::{PartialRing, RingShape};
pub use physics::{ColliderFrames, ColliderId, LayerMask, PhysicsPort, RaycastHit};
pub use query::ClosestPoint;
pub use ring::{CellCoord, Ring, CORNER_OFFSETS, MAX_RING_VERTICES};
pub use scene::{SceneCollider, SceneShape, SyntheticScene};
pub use settings::{ManifoldSettings, MAX_RECONSTRUCTION_ITERATIONS, MIN_CELL_SIZE};
