//! Closest-point character controller with platform carry and rewind
//!
//! Every move rebuilds a manifold patch around the step, marks what is
//! reachable from the agent's current position, and teleports to the
//! closest marked point to the requested destination. When no surface
//! remains under the agent at all, progressively older history positions
//! are retried until one still has ground beneath it.

use manifold::{
    ClosestPoint, ColliderFrames, ColliderId, ManifoldSettings, PhysicsPort, WalkManifold,
};
use manifold_common::{rotate_y, signed_angle_xz, Error, Result, Vec3};
use web_time::Instant;

use crate::position_history::PositionHistory;

/// The collider the agent currently stands on, with the agent's pose in
/// that collider's local frame
#[derive(Debug, Clone)]
struct FloorAnchor {
    collider: ColliderId,
    local_pos: Vec3,
    local_forward: Vec3,
}

/// Moves a cylindrical agent across the walkable surface of a scene
#[derive(Debug)]
pub struct ManifoldCharacterController {
    settings: ManifoldSettings,
    manifold: WalkManifold,
    history: PositionHistory,
    position: Vec3,
    world_forward: Vec3,
    floor: Option<FloorAnchor>,
    last_step: Option<Instant>,
}

impl ManifoldCharacterController {
    /// Creates a controller at `position`, facing +Z
    pub fn new(settings: ManifoldSettings, position: Vec3) -> Result<Self> {
        let settings = settings.clamped();
        settings.validate()?;
        let manifold = WalkManifold::new(settings.clone());

        let mut history = PositionHistory::new();
        history.reset(position);

        Ok(Self {
            settings,
            manifold,
            history,
            position,
            world_forward: Vec3::Z,
            floor: None,
            last_step: None,
        })
    }

    /// The agent's current position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The agent's facing direction in world space
    pub fn world_forward(&self) -> Vec3 {
        self.world_forward
    }

    /// The position history used for failure recovery
    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    /// The manifold patch built by the most recent move
    pub fn manifold(&self) -> &WalkManifold {
        &self.manifold
    }

    /// Refills the position history with the current position
    pub fn reset_position_history(&mut self) {
        self.history.reset(self.position);
    }

    /// Teleports the agent, dropping the floor anchor and refilling the
    /// history at the new position
    pub fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.floor = None;
        self.history.reset(position);
    }

    /// Scales `direction` by the wall time elapsed since the previous call
    /// and moves by the result
    pub fn simple_move<P>(&mut self, port: &P, direction: Vec3) -> Result<Vec3>
    where
        P: PhysicsPort + ColliderFrames,
    {
        let now = Instant::now();
        let elapsed = self
            .last_step
            .map(|earlier| (now - earlier).as_secs_f32())
            .unwrap_or(0.0);
        self.last_step = Some(now);
        self.move_by(port, direction * elapsed)
    }

    /// Moves the agent by `delta`, constrained to the walkable surface.
    ///
    /// The vertical component of `delta` is ignored; height always comes
    /// from the surface. Fails with [`Error::NoSurface`] when neither the
    /// current position nor any history position has ground around it.
    pub fn move_by<P>(&mut self, port: &P, mut delta: Vec3) -> Result<Vec3>
    where
        P: PhysicsPort + ColliderFrames,
    {
        delta.y = 0.0;

        // Moving-platform carry: the authoritative source position is where
        // the floor collider has taken the agent, not where it last stood.
        let src = match &self.floor {
            Some(anchor) if self.settings.translate_with_colliders => port
                .local_to_world_point(anchor.collider, anchor.local_pos)
                .unwrap_or(self.position),
            _ => self.position,
        };

        if self.settings.rotate_with_colliders {
            if let Some(anchor) = &self.floor {
                if let Some(floor_forward) =
                    port.local_to_world_dir(anchor.collider, anchor.local_forward)
                {
                    let angle = signed_angle_xz(self.world_forward, floor_forward);
                    self.world_forward = rotate_y(self.world_forward, angle);
                }
            }
        }

        let dst = src + delta;
        if let Some(answer) = self.try_find_next_position(port, src, dst, 1)? {
            return self.arrive(port, answer);
        }

        // The ground is gone; rewind through progressively newer history.
        let rewind: Vec<Vec3> = self.history.iter_oldest_first().collect();
        for historical in rewind {
            if let Some(answer) = self.try_find_next_position(port, historical, historical, 0)? {
                return self.arrive(port, answer);
            }
        }

        Err(Error::NoSurface)
    }

    /// Builds a manifold patch covering `src` to `dst` and answers with the
    /// closest reachable point to `dst`, or `None` when the patch holds no
    /// surface reachable from `src`.
    fn try_find_next_position<P: PhysicsPort>(
        &mut self,
        port: &P,
        src: Vec3,
        dst: Vec3,
        extrude: i32,
    ) -> Result<Option<ClosestPoint>> {
        let cell_size = self.settings.cell_size;
        let lo = src.min(dst);
        let hi = src.max(dst);

        let cell_min = (
            (lo.x / cell_size).floor() as i32 - extrude,
            (lo.z / cell_size).floor() as i32 - extrude,
        );
        let cell_max = (
            (hi.x / cell_size).floor() as i32 + 1 + extrude,
            (hi.z / cell_size).floor() as i32 + 1 + extrude,
        );

        // Generous vertical band: the step could climb or drop anywhere
        // along the travelled distance.
        let max_height_delta = src.distance(dst) / cell_size + 1.0 + self.settings.step_height;
        let y_min = lo.y - max_height_delta;
        let y_max = hi.y + max_height_delta;

        self.manifold.update(port, cell_min, cell_max, y_min, y_max)?;

        let Some(start_ring) = self.manifold.find_closest_ring_index(src)? else {
            return Ok(None);
        };
        self.manifold.mark_reachable(start_ring)?;
        self.manifold.find_closest_point(dst, true)
    }

    /// Commits a successful move: teleport, re-anchor to the floor, and
    /// sample the history
    fn arrive<P>(&mut self, port: &P, answer: ClosestPoint) -> Result<Vec3>
    where
        P: PhysicsPort + ColliderFrames,
    {
        self.position = answer.point;

        self.floor = answer.pole_vertex.and_then(|vertex| {
            let collider = self.manifold.vertex_colliders()[vertex];
            let local_pos = port.world_to_local_point(collider, self.position)?;
            let local_forward = port.world_to_local_dir(collider, self.world_forward)?;
            Some(FloorAnchor {
                collider,
                local_pos,
                local_forward,
            })
        });

        // Only static ground is worth rewinding to; a moving platform will
        // not be there when the agent comes back.
        let static_floor = self
            .floor
            .as_ref()
            .map_or(false, |anchor| port.is_static(anchor.collider));
        if static_floor && self.position.distance(self.history.latest()) > self.settings.cell_size
        {
            self.history.push(self.position);
        }

        Ok(self.position)
    }
}
