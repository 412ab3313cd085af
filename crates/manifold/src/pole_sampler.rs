//! Pole sampling: per-corner columns of valid stand heights
//!
//! Each grid corner is probed with a descending chain of downward rays.
//! Every accepted hit is a point where the agent cylinder can stand: the
//! surface is shallow enough, on a walkable layer, clear of the previous
//! ceiling by at least the step height, and the standing capsule above it is
//! unoccupied. Rejected hits still advance the scan so lower floors behind
//! them are found.

use manifold_common::{Result, TimerCategory, Vec3};

use crate::manifold::{BuildState, Pole, WalkManifold};
use crate::physics::{PhysicsPort, RaycastHit};
use crate::ring::CellCoord;

impl WalkManifold {
    /// Samples poles for every grid corner in `[cell_min ..= cell_max]`
    /// within the vertical band `[y_min, y_max]`.
    ///
    /// Corners already sampled in this build are left untouched, so corner
    /// rows shared between adjacent rectangles are sampled exactly once.
    /// Legal from `Cleared` or between other pole updates.
    pub fn partial_update_poles<P: PhysicsPort>(
        &mut self,
        port: &P,
        cell_min: CellCoord,
        cell_max: CellCoord,
        y_min: f32,
        y_max: f32,
    ) -> Result<()> {
        self.enter_state(BuildState::CreatingPoles)?;
        self.context.start_timer(TimerCategory::PoleSampling);

        let vertices_before = self.vertices.len();
        for z in cell_min.1..=cell_max.1 {
            for x in cell_min.0..=cell_max.0 {
                if self.cell_poles.contains_key(&(x, z)) {
                    continue;
                }
                self.sample_corner(port, (x, z), y_min, y_max);
            }
        }

        self.context.stop_timer(TimerCategory::PoleSampling);
        self.context.log_debug(format!(
            "poles: {} vertices over corners {:?}..{:?}",
            self.vertices.len() - vertices_before,
            cell_min,
            cell_max,
        ));
        Ok(())
    }

    fn sample_corner<P: PhysicsPort>(
        &mut self,
        port: &P,
        corner: CellCoord,
        y_min: f32,
        y_max: f32,
    ) {
        let cell_size = self.settings.cell_size;
        let step_height = self.settings.step_height;
        let agent_height = self.settings.agent_height;
        let relevant = self.settings.relevant_layers();

        let world_x = corner.0 as f32 * cell_size;
        let world_z = corner.1 as f32 * cell_size;

        let first_vertex = self.vertices.len() as u32;
        let mut y = y_max;
        loop {
            // Biasing the start upward lets a surface sitting right at the
            // ceiling of the remaining band still be sampled.
            y += step_height;
            let max_distance = y - y_min;
            if max_distance <= 0.0 {
                break;
            }

            let origin = Vec3::new(world_x, y, world_z);
            let Some(hit) = port.raycast_down(origin, max_distance, relevant) else {
                break;
            };

            let travelled = y - hit.point.y;
            if travelled >= step_height && self.can_stand_on(port, &hit) {
                self.vertices.push(hit.point);
                self.vertex_colliders.push(hit.collider);
            }

            // The next floor must leave full agent height below this hit.
            y = hit.point.y - agent_height;
        }

        let count = self.vertices.len() as u32 - first_vertex;
        self.cell_poles.insert(corner, Pole { first_vertex, count });
    }

    /// Slope, layer, and standing-capsule checks shared by pole sampling and
    /// boundary reconstruction probes
    pub(crate) fn can_stand_on<P: PhysicsPort>(&self, port: &P, hit: &RaycastHit) -> bool {
        let settings = &self.settings;
        if hit.normal.y < settings.surface_normal_y_threshold() {
            return false;
        }
        if hit.layer & settings.walkable_layers == 0 {
            return false;
        }

        let capsule_bottom = hit.point + Vec3::Y * (settings.step_height + settings.agent_radius);
        let capsule_top = hit.point + Vec3::Y * (settings.agent_height - settings.agent_radius);
        !port.capsule_occupied(
            capsule_bottom,
            capsule_top,
            settings.agent_radius,
            settings.relevant_layers(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SyntheticScene;
    use crate::settings::ManifoldSettings;

    fn settings() -> ManifoldSettings {
        ManifoldSettings {
            agent_radius: 0.2,
            agent_height: 1.0,
            step_height: 0.35,
            cell_size: 1.0,
            ..Default::default()
        }
    }

    fn sample(scene: &SyntheticScene, y_min: f32, y_max: f32) -> WalkManifold {
        let mut manifold = WalkManifold::new(settings());
        manifold
            .partial_update_poles(scene, (0, 0), (0, 0), y_min, y_max)
            .unwrap();
        manifold
    }

    #[test]
    fn test_flat_surface_yields_one_vertex() {
        let mut scene = SyntheticScene::new();
        scene.add_ground(0.0, 1);

        let manifold = sample(&scene, -1.0, 1.0);
        let pole = manifold.pole_at((0, 0)).unwrap();
        assert_eq!(pole.count, 1);
        assert_eq!(manifold.vertices()[0], Vec3::ZERO);
        assert_eq!(manifold.pole_vertices_count(), 1);
    }

    #[test]
    fn test_surface_at_band_ceiling_is_sampled() {
        // The start bias reaches a floor sitting exactly at y_max.
        let mut scene = SyntheticScene::new();
        scene.add_ground(1.0, 1);

        let manifold = sample(&scene, -1.0, 1.0);
        assert_eq!(manifold.pole_at((0, 0)).unwrap().count, 1);
        assert_eq!(manifold.vertices()[0].y, 1.0);
    }

    #[test]
    fn test_stacked_floors_descend_strictly() {
        let mut scene = SyntheticScene::new();
        scene.add_ground(0.0, 1);
        scene.add_block(Vec3::new(-5.0, 2.8, -5.0), Vec3::new(5.0, 3.0, 5.0), 1);

        let manifold = sample(&scene, -1.0, 4.0);
        let pole = manifold.pole_at((0, 0)).unwrap();
        assert_eq!(pole.count, 2);
        assert_eq!(manifold.vertices()[0].y, 3.0);
        assert_eq!(manifold.vertices()[1].y, 0.0);
    }

    #[test]
    fn test_floor_too_close_below_ceiling_rejected() {
        // Upper floor at 3.0, lower floor only 0.8 below it: the agent does
        // not fit, so only the upper floor is standable.
        let mut scene = SyntheticScene::new();
        scene.add_block(Vec3::new(-5.0, 2.0, -5.0), Vec3::new(5.0, 2.2, 5.0), 1);
        scene.add_block(Vec3::new(-5.0, 2.8, -5.0), Vec3::new(5.0, 3.0, 5.0), 1);

        let manifold = sample(&scene, -1.0, 4.0);
        let pole = manifold.pole_at((0, 0)).unwrap();
        assert_eq!(pole.count, 1);
        assert_eq!(manifold.vertices()[0].y, 3.0);
    }

    #[test]
    fn test_steep_surface_rejected() {
        let mut scene = SyntheticScene::new();
        scene.add_ramp(Vec3::ZERO, 5.0, 5.0, 50.0, 1);

        let manifold = sample(&scene, -1.0, 1.0);
        assert_eq!(manifold.pole_at((0, 0)).unwrap().count, 0);
    }

    #[test]
    fn test_non_walkable_layer_rejected() {
        // A blocking-only surface is seen by the ray but never standable.
        let mut scene = SyntheticScene::new();
        scene.add_ground(0.0, 2);

        let mut manifold = WalkManifold::new(ManifoldSettings {
            walkable_layers: 1,
            blocking_layers: 2,
            ..settings()
        });
        manifold
            .partial_update_poles(&scene, (0, 0), (0, 0), -1.0, 1.0)
            .unwrap();
        assert_eq!(manifold.pole_at((0, 0)).unwrap().count, 0);
    }

    #[test]
    fn test_capsule_obstruction_rejected() {
        // A floating post over the corner leaves the floor visible to the
        // ray but occupies the standing capsule above it.
        let mut scene = SyntheticScene::new();
        scene.add_ground(0.0, 1);
        scene.add_block(Vec3::new(-0.05, 0.4, -0.05), Vec3::new(0.05, 2.0, 0.05), 1);

        let manifold = sample(&scene, -1.0, 1.0);
        assert_eq!(manifold.pole_at((0, 0)).unwrap().count, 0);
    }
}
