//! In-memory collision scene implementing the physics port
//!
//! The scene holds axis-aligned (optionally yawed) blocks and bounded ramp
//! plates. Because the pipeline only ever issues vertical rays and vertical
//! capsules, and rotation about Y preserves verticality, both queries are
//! answered exactly by transforming into each collider's local frame.
//!
//! Colliders carry a layer bit, a kinematic flag, and a mutable
//! translation/yaw, which is enough to stage every construction scenario
//! including moving platforms.

use manifold_common::{rotate_y, Vec3};
use serde::{Deserialize, Serialize};

use crate::physics::{ColliderFrames, ColliderId, LayerMask, PhysicsPort, RaycastHit};

/// Collision shape of a scene collider, defined in its local frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum SceneShape {
    /// A box centred on the collider origin
    Block {
        /// Half extents along each local axis
        half_extents: Vec3,
    },
    /// A thin plate through the collider origin, rising along local +X
    Ramp {
        /// Half extent along local X
        half_x: f32,
        /// Half extent along local Z
        half_z: f32,
        /// Incline of the plate in degrees
        slope_deg: f32,
    },
}

/// One collider of the synthetic scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneCollider {
    /// Handle reported in raycast hits
    pub id: ColliderId,
    /// Layer bit of the collider
    pub layer: LayerMask,
    /// Kinematic colliders move; static ones never do
    pub kinematic: bool,
    /// World translation of the local frame
    pub translation: Vec3,
    /// Rotation of the local frame about Y, radians
    pub yaw: f32,
    /// Collision shape
    pub shape: SceneShape,
}

impl SceneCollider {
    fn to_local(&self, point: Vec3) -> Vec3 {
        rotate_y(point - self.translation, -self.yaw)
    }

    fn to_world(&self, point: Vec3) -> Vec3 {
        self.translation + rotate_y(point, self.yaw)
    }

    /// Distance down to this collider's surface from `origin`, with the hit
    /// point and normal in world space. Rays starting inside or below a
    /// surface miss it, like engine raycasts against backfaces.
    fn raycast_down(&self, origin: Vec3) -> Option<(f32, Vec3, Vec3)> {
        let local = self.to_local(origin);
        match self.shape {
            SceneShape::Block { half_extents: h } => {
                if local.x.abs() > h.x || local.z.abs() > h.z || local.y < h.y {
                    return None;
                }
                let point = self.to_world(Vec3::new(local.x, h.y, local.z));
                Some((local.y - h.y, point, Vec3::Y))
            }
            SceneShape::Ramp {
                half_x,
                half_z,
                slope_deg,
            } => {
                if local.x.abs() > half_x || local.z.abs() > half_z {
                    return None;
                }
                let grade = slope_deg.to_radians().tan();
                let surface_y = local.x * grade;
                if local.y < surface_y {
                    return None;
                }
                let point = self.to_world(Vec3::new(local.x, surface_y, local.z));
                let normal = rotate_y(Vec3::new(-grade, 1.0, 0.0).normalize(), self.yaw);
                Some((local.y - surface_y, point, normal))
            }
        }
    }

    /// Exact overlap test between this collider and a vertical capsule.
    /// Both endpoints share their XZ position by construction.
    fn overlaps_vertical_capsule(&self, a: Vec3, b: Vec3, radius: f32) -> bool {
        let la = self.to_local(a);
        let lb = self.to_local(b);
        let (y_lo, y_hi) = if la.y <= lb.y {
            (la.y, lb.y)
        } else {
            (lb.y, la.y)
        };

        match self.shape {
            SceneShape::Block { half_extents: h } => {
                let dx = (la.x.abs() - h.x).max(0.0);
                let dz = (la.z.abs() - h.z).max(0.0);
                let dy = if y_hi < -h.y {
                    -h.y - y_hi
                } else if y_lo > h.y {
                    y_lo - h.y
                } else {
                    0.0
                };
                dx * dx + dy * dy + dz * dz < radius * radius
            }
            SceneShape::Ramp {
                half_x,
                half_z,
                slope_deg,
            } => {
                if la.x.abs() > half_x + radius || la.z.abs() > half_z + radius {
                    return false;
                }
                let grade = slope_deg.to_radians().tan();
                let normal = Vec3::new(-grade, 1.0, 0.0).normalize();
                let da = normal.dot(Vec3::new(la.x, y_lo, la.z));
                let db = normal.dot(Vec3::new(la.x, y_hi, la.z));
                if da.signum() != db.signum() {
                    return true;
                }
                da.abs().min(db.abs()) < radius
            }
        }
    }
}

/// An in-memory collision scene
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SyntheticScene {
    colliders: Vec<SceneCollider>,
    next_id: ColliderId,
}

impl SyntheticScene {
    /// Creates an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collider and returns its handle
    pub fn add_collider(
        &mut self,
        shape: SceneShape,
        translation: Vec3,
        layer: LayerMask,
        kinematic: bool,
    ) -> ColliderId {
        self.next_id += 1;
        let id = self.next_id;
        self.colliders.push(SceneCollider {
            id,
            layer,
            kinematic,
            translation,
            yaw: 0.0,
            shape,
        });
        id
    }

    /// Adds a static block spanning `min` to `max` in world space
    pub fn add_block(&mut self, min: Vec3, max: Vec3, layer: LayerMask) -> ColliderId {
        let center = (min + max) * 0.5;
        let half = (max - min) * 0.5;
        self.add_collider(SceneShape::Block { half_extents: half }, center, layer, false)
    }

    /// Adds a kinematic block spanning `min` to `max` in world space
    pub fn add_kinematic_block(&mut self, min: Vec3, max: Vec3, layer: LayerMask) -> ColliderId {
        let center = (min + max) * 0.5;
        let half = (max - min) * 0.5;
        self.add_collider(SceneShape::Block { half_extents: half }, center, layer, true)
    }

    /// Adds a practically unbounded static floor with its top surface at `y`
    pub fn add_ground(&mut self, y: f32, layer: LayerMask) -> ColliderId {
        const EXTENT: f32 = 1.0e4;
        self.add_block(
            Vec3::new(-EXTENT, y - 20.0, -EXTENT),
            Vec3::new(EXTENT, y, EXTENT),
            layer,
        )
    }

    /// Adds a static ramp plate centred at `center`, rising along +X
    pub fn add_ramp(
        &mut self,
        center: Vec3,
        half_x: f32,
        half_z: f32,
        slope_deg: f32,
        layer: LayerMask,
    ) -> ColliderId {
        self.add_collider(
            SceneShape::Ramp {
                half_x,
                half_z,
                slope_deg,
            },
            center,
            layer,
            false,
        )
    }

    /// Removes a collider from the scene
    pub fn remove_collider(&mut self, id: ColliderId) -> bool {
        let before = self.colliders.len();
        self.colliders.retain(|c| c.id != id);
        self.colliders.len() != before
    }

    /// Looks up a collider by handle
    pub fn collider(&self, id: ColliderId) -> Option<&SceneCollider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    fn collider_mut(&mut self, id: ColliderId) -> Option<&mut SceneCollider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    /// Replaces a collider's world translation
    pub fn set_translation(&mut self, id: ColliderId, translation: Vec3) {
        if let Some(collider) = self.collider_mut(id) {
            collider.translation = translation;
        }
    }

    /// Moves a collider by `delta` in world space
    pub fn translate(&mut self, id: ColliderId, delta: Vec3) {
        if let Some(collider) = self.collider_mut(id) {
            collider.translation += delta;
        }
    }

    /// Replaces a collider's yaw, radians
    pub fn set_yaw(&mut self, id: ColliderId, yaw: f32) {
        if let Some(collider) = self.collider_mut(id) {
            collider.yaw = yaw;
        }
    }
}

impl PhysicsPort for SyntheticScene {
    fn raycast_down(
        &self,
        origin: Vec3,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RaycastHit> {
        let mut best: Option<(f32, RaycastHit)> = None;
        for collider in &self.colliders {
            if collider.layer & layers == 0 {
                continue;
            }
            let Some((distance, point, normal)) = collider.raycast_down(origin) else {
                continue;
            };
            if distance > max_distance {
                continue;
            }
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((
                    distance,
                    RaycastHit {
                        point,
                        normal,
                        collider: collider.id,
                        layer: collider.layer,
                    },
                ));
            }
        }
        best.map(|(_, hit)| hit)
    }

    fn capsule_occupied(
        &self,
        point_a: Vec3,
        point_b: Vec3,
        radius: f32,
        layers: LayerMask,
    ) -> bool {
        self.colliders.iter().any(|collider| {
            collider.layer & layers != 0
                && collider.overlaps_vertical_capsule(point_a, point_b, radius)
        })
    }
}

impl ColliderFrames for SyntheticScene {
    fn local_to_world_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3> {
        self.collider(collider).map(|c| c.to_world(point))
    }

    fn world_to_local_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3> {
        self.collider(collider).map(|c| c.to_local(point))
    }

    fn local_to_world_dir(&self, collider: ColliderId, dir: Vec3) -> Option<Vec3> {
        self.collider(collider).map(|c| rotate_y(dir, c.yaw))
    }

    fn world_to_local_dir(&self, collider: ColliderId, dir: Vec3) -> Option<Vec3> {
        self.collider(collider).map(|c| rotate_y(dir, -c.yaw))
    }

    fn is_static(&self, collider: ColliderId) -> bool {
        self.collider(collider).map_or(true, |c| !c.kinematic)
    }
}
