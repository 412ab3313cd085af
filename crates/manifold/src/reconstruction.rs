//! Boundary reconstruction: completing partial rings by ray probing
//!
//! A partial ring knows which corners of its cell can stand but not where
//! the walkable surface actually ends between them. A bisection search
//! along each open cell edge recovers that boundary: probe rays drop from
//! just above the chord and the furthest accepted hit becomes a
//! reconstructed boundary vertex. Vertices on edges shared by two partial
//! rings are deduplicated through a cache keyed by source vertex and probe
//! direction.

use manifold_common::{sin_angle_xz, tri_area_xz, Result, TimerCategory, Vec3};

use crate::manifold::{BuildState, WalkManifold};
use crate::partial_ring::{PartialRing, RingShape};
use crate::physics::PhysicsPort;
use crate::ring::CellCoord;

/// Sine of the 3 degree guard below which the corner-refinement lines count
/// as parallel
const CORNER_PARALLEL_SIN: f32 = 0.052_336;

fn offset_dir(from: (i32, i32), to: (i32, i32)) -> (i32, i32) {
    (to.0 - from.0, to.1 - from.1)
}

impl WalkManifold {
    /// Completes up to `max_rings` queued partial rings into full rings and
    /// returns how many remain queued.
    ///
    /// Legal after partial-ring pairing; call repeatedly with a bounded
    /// count to slice the work.
    pub fn partial_update_reconstruct<P: PhysicsPort>(
        &mut self,
        port: &P,
        max_rings: usize,
    ) -> Result<usize> {
        self.enter_state(BuildState::Reconstructing)?;
        self.context.start_timer(TimerCategory::Reconstruction);

        let mut processed = 0usize;
        while processed < max_rings {
            let Some(partial) = self.pending_partials.pop_front() else {
                break;
            };
            self.complete_partial_ring(port, &partial);
            processed += 1;
        }

        self.context.stop_timer(TimerCategory::Reconstruction);
        if processed > 0 {
            self.context.log_debug(format!(
                "reconstruction: {} rings completed, {} pending",
                processed,
                self.pending_partials.len(),
            ));
        }
        Ok(self.pending_partials.len())
    }

    fn complete_partial_ring<P: PhysicsPort>(&mut self, port: &P, partial: &PartialRing) {
        let corners = partial.corners;
        let mut indices = [0u32; 6];

        match partial.shape {
            RingShape::Corner => {
                let Some(v0) = partial.verts[0] else { return };
                let e03 = self.boundary_vertex(port, v0, offset_dir(corners[0], corners[3]));
                let e01 = self.boundary_vertex(port, v0, offset_dir(corners[0], corners[1]));
                indices[..3].copy_from_slice(&[e03, v0, e01]);
                let mut count = 3;

                if self.settings.corner_reconstruction {
                    if let Some(refined) =
                        self.corner_intersection(port, partial.cell, v0, e01, e03, corners)
                    {
                        indices[3] = refined;
                        count = 4;
                    }
                }
                self.push_ring(partial.cell, &indices[..count]);
            }
            RingShape::Edge => {
                let (Some(v0), Some(v1)) = (partial.verts[0], partial.verts[1]) else {
                    return;
                };
                let e03 = self.boundary_vertex(port, v0, offset_dir(corners[0], corners[3]));
                let e12 = self.boundary_vertex(port, v1, offset_dir(corners[1], corners[2]));
                indices[..4].copy_from_slice(&[e03, v0, v1, e12]);
                self.push_ring(partial.cell, &indices[..4]);
            }
            RingShape::InvertedCorner => {
                let (Some(v0), Some(v1), Some(v2)) =
                    (partial.verts[0], partial.verts[1], partial.verts[2])
                else {
                    return;
                };
                let e03 = self.boundary_vertex(port, v0, offset_dir(corners[0], corners[3]));
                let e23 = self.boundary_vertex(port, v2, offset_dir(corners[2], corners[3]));
                indices[..5].copy_from_slice(&[e23, e03, v0, v1, v2]);
                self.push_ring(partial.cell, &indices[..5]);
            }
            RingShape::Diagonal => {
                let (Some(v0), Some(v2)) = (partial.verts[0], partial.verts[2]) else {
                    return;
                };
                let e01 = self.boundary_vertex(port, v0, offset_dir(corners[0], corners[1]));
                let e21 = self.boundary_vertex(port, v2, offset_dir(corners[2], corners[1]));
                let e23 = self.boundary_vertex(port, v2, offset_dir(corners[2], corners[3]));
                let e03 = self.boundary_vertex(port, v0, offset_dir(corners[0], corners[3]));
                indices.copy_from_slice(&[v0, e01, e21, v2, e23, e03]);
                self.push_ring(partial.cell, &indices);
            }
            // Complete rings were emitted during pairing; Invalid never
            // reaches the queue.
            RingShape::Complete | RingShape::Invalid => {}
        }
    }

    /// Cached lookup of the reconstructed boundary vertex reached from
    /// `source` along the grid offset `dir`
    fn boundary_vertex<P: PhysicsPort>(
        &mut self,
        port: &P,
        source: u32,
        dir: (i32, i32),
    ) -> u32 {
        if let Some(&index) = self.true_edge_cache.get(&(source, dir)) {
            return index;
        }

        let cell_size = self.settings.cell_size;
        let origin = self.vertices[source as usize];
        let target = origin + Vec3::new(dir.0 as f32 * cell_size, 0.0, dir.1 as f32 * cell_size);
        let point = self.true_edge(port, origin, target);

        let index = self.vertices.len() as u32;
        self.vertices.push(point);
        self.true_edge_cache.insert((source, dir), index);
        index
    }

    /// Bisection search for the furthest standable point along the segment
    /// from `src` to `dst`.
    ///
    /// `src` is a known-good surface point, so it is the fallback answer
    /// when every probe fails.
    pub(crate) fn true_edge<P: PhysicsPort>(&self, port: &P, src: Vec3, dst: Vec3) -> Vec3 {
        let step_height = self.settings.step_height;
        let relevant = self.settings.relevant_layers();

        let mut best = src;
        let mut fraction = 0.5f32;
        let mut step = 0.25f32;
        for _ in 0..self.settings.reconstruction_iterations {
            let probe = src + (dst - src) * fraction + Vec3::Y * step_height;
            let accepted = port
                .raycast_down(probe, 2.0 * step_height, relevant)
                .filter(|hit| self.can_stand_on(port, hit));

            match accepted {
                Some(hit) => {
                    best = hit.point;
                    fraction += step;
                }
                None => fraction -= step,
            }
            step *= 0.5;
        }
        best
    }

    /// Attempts the corner-intersection refinement for a single-pole ring.
    ///
    /// Two exploratory probes offset from the pole intersect, in the XZ
    /// plane, the lines through the two reconstructed edge vertices; a
    /// strictly interior, strictly convex intersection becomes the ring's
    /// fourth vertex.
    fn corner_intersection<P: PhysicsPort>(
        &mut self,
        port: &P,
        cell: CellCoord,
        v0: u32,
        e01: u32,
        e03: u32,
        corners: [(i32, i32); 4],
    ) -> Option<u32> {
        let cell_size = self.settings.cell_size;
        let origin = self.vertices[v0 as usize];
        let v1 = self.vertices[e01 as usize];
        let v3 = self.vertices[e03 as usize];

        let a_dir = offset_dir(corners[0], corners[1]);
        let b_dir = offset_dir(corners[0], corners[3]);
        let dir_a = Vec3::new(a_dir.0 as f32, 0.0, a_dir.1 as f32);
        let dir_b = Vec3::new(b_dir.0 as f32, 0.0, b_dir.1 as f32);

        let d1 = (v1 - origin).length();
        let d3 = (v3 - origin).length();

        let a0 = origin + dir_a * (0.5 * d1);
        let b = self.true_edge(port, a0, a0 + dir_b * cell_size);
        let c0 = origin + dir_b * (0.5 * d3);
        let d = self.true_edge(port, c0, c0 + dir_a * cell_size);

        let u = b - v1;
        let w = d - v3;
        if sin_angle_xz(u, w) < CORNER_PARALLEL_SIN {
            return None;
        }

        let (t, _) = manifold_common::intersect_lines_xz(v1, u, v3, w)?;
        let point = v1 + u * t;

        let min_x = cell.0 as f32 * cell_size;
        let min_z = cell.1 as f32 * cell_size;
        let max_x = min_x + cell_size;
        let max_z = min_z + cell_size;
        let inside = point.x > min_x && point.x < max_x && point.z > min_z && point.z < max_z;
        if !inside {
            return None;
        }

        // Collinear intersections would degenerate the ring; exact zero is
        // rejected.
        if tri_area_xz(v1, point, v3) <= 0.0 {
            return None;
        }

        let index = self.vertices.len() as u32;
        self.vertices.push(point);
        Some(index)
    }
}
