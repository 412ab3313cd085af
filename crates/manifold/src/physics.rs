//! Physics query port consumed by the manifold pipeline
//!
//! The pipeline never talks to a physics engine directly; it issues downward
//! rays and vertical capsule overlap tests through [`PhysicsPort`]. Any
//! backend works: a game engine scene, or the in-memory
//! [`crate::SyntheticScene`]. Trigger volumes must never be reported.
//!
//! The port is a shared scene-global resource. It is consulted only during
//! pole sampling and boundary reconstruction, from the single logical owner
//! of the manifold; other subsystems must not use it concurrently during a
//! build. That is a documented precondition, not a lock.

use manifold_common::Vec3;

/// Opaque collider handle issued by the physics backend.
///
/// The manifold stores these next to pole vertices and never dereferences
/// them; only the backend can interpret one.
pub type ColliderId = u64;

/// Bitmask of physics layers
pub type LayerMask = u32;

/// Result of a downward ray query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Surface point hit by the ray
    pub point: Vec3,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// Handle of the collider that was hit
    pub collider: ColliderId,
    /// Layer bit of the collider that was hit
    pub layer: LayerMask,
}

/// Downward ray and capsule occupancy queries against a collision scene.
///
/// Implementations must be thread-confined to the caller unless they
/// document otherwise.
pub trait PhysicsPort {
    /// Casts a ray straight down from `origin` over at most `max_distance`
    /// and returns the nearest surface on a layer in `layers`.
    fn raycast_down(&self, origin: Vec3, max_distance: f32, layers: LayerMask)
        -> Option<RaycastHit>;

    /// Returns true when any collider on a layer in `layers` overlaps the
    /// capsule spanning `point_a` to `point_b` with the given radius.
    fn capsule_occupied(&self, point_a: Vec3, point_b: Vec3, radius: f32, layers: LayerMask)
        -> bool;

    /// Forces the backend to finalise pending transform updates.
    ///
    /// Called at most once per build, before any query. Backends with a
    /// pending-transform queue should flush it here through interior
    /// mutability; the default does nothing.
    fn sync_transforms(&self) {}
}

/// Collider-space transforms for floor-relative agent state.
///
/// The character controller anchors an agent to the collider it stands on
/// and needs to map points and directions between that collider's local
/// frame and world space. Every accessor returns `None` when the handle no
/// longer names a live collider.
pub trait ColliderFrames {
    /// Maps a point from the collider's local frame to world space
    fn local_to_world_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3>;

    /// Maps a world-space point into the collider's local frame
    fn world_to_local_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3>;

    /// Maps a direction from the collider's local frame to world space
    fn local_to_world_dir(&self, collider: ColliderId, dir: Vec3) -> Option<Vec3>;

    /// Maps a world-space direction into the collider's local frame
    fn world_to_local_dir(&self, collider: ColliderId, dir: Vec3) -> Option<Vec3>;

    /// Returns true when the collider does not move.
    ///
    /// Unknown handles count as static so stale anchors do not suppress
    /// position-history sampling.
    fn is_static(&self, collider: ColliderId) -> bool;
}
