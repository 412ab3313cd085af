//! Queries over a complete manifold
//!
//! All queries require the `Complete` state and fail with
//! [`Error::NotReady`] otherwise. The guarantees the character controller
//! relies on live here: a closest-point answer restricted to marked rings
//! can only land somewhere the agent can also leave again.

use std::collections::VecDeque;

use manifold_common::{
    closest_point_on_segment, dist_sqr_xz, lerp, perp_xz, Error, Result, Vec3,
};

use crate::manifold::{BuildState, WalkManifold};
use crate::ring::{CellCoord, Ring};

/// Answer of a closest-point query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// The closest position on the manifold; Y comes from ring geometry,
    /// never from the query point
    pub point: Vec3,
    /// Index of the ring the position lies on
    pub ring: usize,
    /// The ring's pole vertex closest to the query point, usable to look up
    /// the collider beneath the agent; `None` when the ring has no pole
    /// vertices
    pub pole_vertex: Option<usize>,
}

impl WalkManifold {
    pub(crate) fn ensure_complete(&self) -> Result<()> {
        if self.state != BuildState::Complete {
            return Err(Error::NotReady);
        }
        Ok(())
    }

    /// The grid cell containing a world position
    pub fn get_cell(&self, position: Vec3) -> CellCoord {
        let cs = self.settings.cell_size;
        (
            (position.x / cs).floor() as i32,
            (position.z / cs).floor() as i32,
        )
    }

    /// Index of the ring nearest to `position`, or `None` when the manifold
    /// holds no rings.
    ///
    /// Rings are ranked by distance to their vertex-bounds centre.
    pub fn find_closest_ring_index(&self, position: Vec3) -> Result<Option<usize>> {
        self.ensure_complete()?;

        let mut best = None;
        let mut best_dist = f32::INFINITY;
        for (index, ring) in self.rings.iter().enumerate() {
            let center = ring.bounds_center(&self.vertices);
            let dist = position.distance_squared(center);
            if dist < best_dist {
                best_dist = dist;
                best = Some(index);
            }
        }
        Ok(best)
    }

    /// Closest position on the manifold to `position`, compared in XZ.
    ///
    /// With `only_marked` set, only rings flagged by
    /// [`WalkManifold::mark_reachable`] are considered. Returns `None` when
    /// no candidate ring exists.
    pub fn find_closest_point(
        &self,
        position: Vec3,
        only_marked: bool,
    ) -> Result<Option<ClosestPoint>> {
        self.ensure_complete()?;

        let query_cell = self.get_cell(position);
        let mut best: Option<(Vec3, usize)> = None;
        let mut best_dist = f32::INFINITY;

        for (index, ring) in self.rings.iter().enumerate() {
            if only_marked && !ring.marked {
                continue;
            }

            if ring.cell == query_cell {
                if let Some(point) = self.interpolate_interior(ring, position) {
                    let dist = dist_sqr_xz(position, point);
                    if dist < best_dist {
                        best_dist = dist;
                        best = Some((point, index));
                    }
                }
            }

            for (from, to) in ring.edges() {
                let (point, _) = closest_point_on_segment(
                    position,
                    self.vertices[from as usize],
                    self.vertices[to as usize],
                );
                let dist = dist_sqr_xz(position, point);
                if dist < best_dist {
                    best_dist = dist;
                    best = Some((point, index));
                }
            }
        }

        let Some((point, ring_index)) = best else {
            return Ok(None);
        };

        let pole_count = self.vertex_colliders.len() as u32;
        let pole_vertex = self.rings[ring_index]
            .vertex_indices()
            .iter()
            .copied()
            .filter(|&index| index < pole_count)
            .min_by(|&a, &b| {
                let da = self.vertices[a as usize].distance_squared(position);
                let db = self.vertices[b as usize].distance_squared(position);
                da.total_cmp(&db)
            })
            .map(|index| index as usize);

        Ok(Some(ClosestPoint {
            point,
            ring: ring_index,
            pole_vertex,
        }))
    }

    /// Interpolates the ring surface at the query point's XZ position.
    ///
    /// Walks the edges for the pair whose X ranges straddle the query: the
    /// descending-X edge bounds the ring on one side, the ascending-X edge
    /// on the other. Both are sampled at the query X and blended in Z. Any
    /// negative perpendicular proves the point outside; near-degenerate
    /// rings fail the interpolation rather than erroring.
    fn interpolate_interior(&self, ring: &Ring, position: Vec3) -> Option<Vec3> {
        let mut descending: Option<Vec3> = None;
        let mut ascending: Option<Vec3> = None;

        for (from, to) in ring.edges() {
            let a = self.vertices[from as usize];
            let b = self.vertices[to as usize];

            if position.x < a.x.min(b.x) || position.x > a.x.max(b.x) {
                continue;
            }
            if perp_xz(b - a, position - a) < 0.0 {
                return None;
            }

            if a.x > b.x {
                descending = Some(lerp(a, b, (a.x - position.x) / (a.x - b.x)));
            } else if a.x < b.x {
                ascending = Some(lerp(a, b, (position.x - a.x) / (b.x - a.x)));
            }
        }

        // CCW winding puts the ascending-X edge on the low-Z side.
        let far = descending?;
        let near = ascending?;
        let dz = far.z - near.z;
        if dz.abs() <= f32::EPSILON {
            return None;
        }
        let t = (position.z - near.z) / dz;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        Some(Vec3::new(
            position.x,
            near.y + (far.y - near.y) * t,
            position.z,
        ))
    }

    /// Flood-fills the reachability flag from `start_ring` across shared
    /// edges.
    ///
    /// Marks accumulate; marking from a ring already reachable from an
    /// earlier mark changes nothing. Unreached rings stay unmarked.
    pub fn mark_reachable(&mut self, start_ring: usize) -> Result<()> {
        self.ensure_complete()?;
        if start_ring >= self.rings.len() {
            return Err(Error::BadInput(format!(
                "ring index {start_ring} out of range ({} rings)",
                self.rings.len()
            )));
        }

        let mut queue = VecDeque::new();
        if !self.rings[start_ring].marked {
            self.rings[start_ring].marked = true;
            queue.push_back(start_ring as u32);
        }

        while let Some(index) = queue.pop_front() {
            let ring = &self.rings[index as usize];
            let mut neighbors = [None; 6];
            for (slot, (from, to)) in ring.edges().enumerate() {
                neighbors[slot] = self.edge_rings.get(&(to, from)).copied();
            }

            for neighbor in neighbors.into_iter().flatten() {
                let ring = &mut self.rings[neighbor as usize];
                if !ring.marked {
                    ring.marked = true;
                    queue.push_back(neighbor);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::WalkManifold;
    use crate::ring::Ring;
    use crate::settings::ManifoldSettings;

    /// Builds a manifold directly in the `Complete` state from raw
    /// geometry, bypassing the physics pipeline.
    fn manifold_with_ring(vertices: Vec<Vec3>, indices: &[u32]) -> WalkManifold {
        let mut manifold = WalkManifold::new(ManifoldSettings {
            cell_size: 1.0,
            ..Default::default()
        });
        manifold.vertices = vertices;
        manifold.rings.push(Ring::new((0, 0), indices));
        manifold.state = BuildState::Complete;
        manifold
    }

    #[test]
    fn test_queries_fail_before_complete() {
        let manifold = WalkManifold::new(ManifoldSettings::default());
        assert!(matches!(
            manifold.find_closest_ring_index(Vec3::ZERO),
            Err(Error::NotReady)
        ));
        assert!(matches!(
            manifold.find_closest_point(Vec3::ZERO, false),
            Err(Error::NotReady)
        ));
        assert!(matches!(manifold.is_shared_edge(0, 1), Err(Error::NotReady)));
    }

    #[test]
    fn test_closest_ring_on_empty_manifold() {
        let mut manifold = WalkManifold::new(ManifoldSettings::default());
        manifold.state = BuildState::Complete;
        assert_eq!(manifold.find_closest_ring_index(Vec3::ZERO).unwrap(), None);
        assert_eq!(manifold.find_closest_point(Vec3::ZERO, false).unwrap(), None);
    }

    #[test]
    fn test_interior_interpolation_on_sloped_quad() {
        // Unit cell quad rising from y=0 at z=0 to y=1 at z=1.
        let manifold = manifold_with_ring(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            &[0, 1, 2, 3],
        );

        let answer = manifold
            .find_closest_point(Vec3::new(0.5, 5.0, 0.25), false)
            .unwrap()
            .unwrap();
        assert!((answer.point - Vec3::new(0.5, 0.25, 0.25)).length() < 1e-5);
    }

    #[test]
    fn test_point_outside_projects_to_edge() {
        let manifold = manifold_with_ring(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            &[0, 1, 2, 3],
        );

        let answer = manifold
            .find_closest_point(Vec3::new(0.5, 0.0, -2.0), false)
            .unwrap()
            .unwrap();
        assert!((answer.point - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_degenerate_ring_interpolation_fails_silently() {
        // All vertices collinear in XZ: interior interpolation must fail
        // and the edge projection must answer instead.
        let manifold = manifold_with_ring(
            vec![
                Vec3::new(0.0, 0.0, 0.5),
                Vec3::new(0.5, 0.0, 0.5),
                Vec3::new(1.0, 0.0, 0.5),
            ],
            &[0, 1, 2],
        );

        let answer = manifold
            .find_closest_point(Vec3::new(0.5, 0.0, 0.5), false)
            .unwrap()
            .unwrap();
        assert!((answer.point - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_pole_vertex_restricted_to_pole_segment() {
        let mut manifold = manifold_with_ring(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            &[0, 1, 2, 3],
        );
        // Only the first two vertices are poles.
        manifold.vertex_colliders = vec![7, 8];

        let answer = manifold
            .find_closest_point(Vec3::new(0.9, 0.0, 0.9), false)
            .unwrap()
            .unwrap();
        // Vertex 2 is closest overall but is not a pole; vertex 1 wins.
        assert_eq!(answer.pole_vertex, Some(1));

        manifold.vertex_colliders.clear();
        let answer = manifold
            .find_closest_point(Vec3::new(0.9, 0.0, 0.9), false)
            .unwrap()
            .unwrap();
        assert_eq!(answer.pole_vertex, None);
    }

    #[test]
    fn test_mark_reachable_rejects_bad_index() {
        let mut manifold = WalkManifold::new(ManifoldSettings::default());
        manifold.state = BuildState::Complete;
        assert!(matches!(
            manifold.mark_reachable(0),
            Err(Error::BadInput(_))
        ));
    }
}
