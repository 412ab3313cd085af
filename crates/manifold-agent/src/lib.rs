//! Character locomotion over a walkable surface manifold
//!
//! This crate moves a cylindrical agent across scenes by rebuilding a small
//! manifold patch around every step and snapping to the closest reachable
//! point on it. Because the answer is restricted to rings reachable from
//! where the agent already stands, a move can never land somewhere the
//! agent could not walk back from.
//!
//! The controller also carries the agent along moving floors, rotates it
//! with turning floors, and keeps a geometrically sampled history of past
//! positions to rewind to when the ground disappears entirely.

mod controller;
mod position_history;

pub use controller::ManifoldCharacterController;
pub use position_history::{
    PositionHistory, DEFAULT_CARRY_THRESHOLD, DEFAULT_RADIX, HISTORY_LENGTH,
};
