//! Per-cell pairing of corner poles into ring candidates
//!
//! Each cell reads the pole at each of its four corners and repeatedly
//! pulls the highest remaining vertices into a candidate ring, bounded by
//! the step height between consecutive picks. The occupancy mask of the
//! contributing corners classifies the candidate: a full mask becomes a
//! finished ring immediately, anything else is queued for boundary
//! reconstruction.

use manifold_common::{Result, TimerCategory};

use crate::manifold::{BuildState, WalkManifold};
use crate::ring::{CellCoord, CORNER_OFFSETS};

/// Topological classification of a ring candidate by which corners of its
/// cell contributed a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingShape {
    /// No corner contributed; cannot occur for a seeded candidate
    Invalid,
    /// A single corner
    Corner,
    /// Two adjacent corners
    Edge,
    /// Two opposite corners
    Diagonal,
    /// Three corners
    InvertedCorner,
    /// All four corners
    Complete,
}

/// Classifies a 4-bit corner occupancy mask, bit `i` for corner `i`
pub(crate) fn classify_mask(mask: u8) -> RingShape {
    match mask & 0b1111 {
        0b0000 => RingShape::Invalid,
        0b1111 => RingShape::Complete,
        0b0101 | 0b1010 => RingShape::Diagonal,
        m if m.count_ones() == 1 => RingShape::Corner,
        m if m.count_ones() == 2 => RingShape::Edge,
        _ => RingShape::InvertedCorner,
    }
}

/// An incomplete ring candidate awaiting boundary reconstruction.
///
/// Slot `i` holds the vertex contributed by the cell corner at
/// `corners[i]`, rotated so that slot 0 is always occupied and slot 3 is
/// always vacant. The rotation preserves the CCW corner cycle.
#[derive(Debug, Clone)]
pub struct PartialRing {
    /// The cell the candidate belongs to
    pub cell: CellCoord,
    /// Vertex index per aligned corner slot
    pub verts: [Option<u32>; 4],
    /// Local corner offset per aligned slot
    pub corners: [(i32, i32); 4],
    /// Topological classification of the candidate
    pub shape: RingShape,
}

impl PartialRing {
    /// Builds an aligned partial ring from per-corner vertices
    pub(crate) fn aligned(cell: CellCoord, verts: [Option<u32>; 4], shape: RingShape) -> Self {
        let mut rotation = 0;
        for r in 0..4 {
            if verts[r].is_some() && verts[(r + 3) % 4].is_none() {
                rotation = r;
                break;
            }
        }

        let mut aligned_verts = [None; 4];
        let mut aligned_corners = [(0, 0); 4];
        for slot in 0..4 {
            aligned_verts[slot] = verts[(slot + rotation) % 4];
            aligned_corners[slot] = CORNER_OFFSETS[(slot + rotation) % 4];
        }

        Self {
            cell,
            verts: aligned_verts,
            corners: aligned_corners,
            shape,
        }
    }
}

impl WalkManifold {
    /// Pairs corner poles into ring candidates for every cell in
    /// `[cell_min, cell_max)`.
    ///
    /// Complete candidates are emitted as finished rings immediately, which
    /// keeps them contiguous at the front of the ring list; the rest are
    /// queued for reconstruction when `edge_reconstruction` is enabled.
    /// Legal after pole sampling.
    pub fn partial_update_partial_rings(
        &mut self,
        cell_min: CellCoord,
        cell_max: CellCoord,
    ) -> Result<()> {
        self.enter_state(BuildState::CreatingPartials)?;
        self.context.start_timer(TimerCategory::PartialRings);

        let rings_before = self.rings.len();
        for z in cell_min.1..cell_max.1 {
            for x in cell_min.0..cell_max.0 {
                self.build_cell_candidates((x, z));
            }
        }

        self.context.stop_timer(TimerCategory::PartialRings);
        self.context.log_debug(format!(
            "partial rings: {} complete, {} pending over cells {:?}..{:?}",
            self.rings.len() - rings_before,
            self.pending_partials.len(),
            cell_min,
            cell_max,
        ));
        Ok(())
    }

    fn build_cell_candidates(&mut self, cell: CellCoord) {
        let step_height = self.settings.step_height;
        let emit_partials = self.settings.edge_reconstruction;

        // Consumable (next_vertex, remaining) slice per corner.
        let mut slices: [(u32, u32); 4] = [(0, 0); 4];
        for (slot, offset) in CORNER_OFFSETS.iter().enumerate() {
            let corner = (cell.0 + offset.0, cell.1 + offset.1);
            if let Some(pole) = self.cell_poles.get(&corner) {
                slices[slot] = (pole.first_vertex, pole.count);
            }
        }

        loop {
            let key: [f32; 4] = std::array::from_fn(|i| {
                if slices[i].1 == 0 {
                    f32::NEG_INFINITY
                } else {
                    self.vertices[slices[i].0 as usize].y
                }
            });

            // 4-element sorting network, highest top vertex first; exhausted
            // slices sink to the back.
            let mut order = [0usize, 1, 2, 3];
            for &(a, b) in &[(0usize, 1usize), (2, 3), (0, 2), (1, 3), (1, 2)] {
                if key[order[a]] < key[order[b]] {
                    order.swap(a, b);
                }
            }

            let seed = order[0];
            if slices[seed].1 == 0 {
                break;
            }

            let mut verts: [Option<u32>; 4] = [None; 4];
            verts[seed] = Some(slices[seed].0);
            let mut mask = 1u8 << seed;
            let mut prev_y = key[seed];

            // The gate compares against the previous accepted vertex, not
            // the seed, so three cumulative in-range drops can chain within
            // one cell.
            for &corner in &order[1..] {
                if slices[corner].1 == 0 {
                    break;
                }
                let next_y = key[corner];
                if prev_y - next_y > step_height {
                    break;
                }
                verts[corner] = Some(slices[corner].0);
                mask |= 1 << corner;
                prev_y = next_y;
                slices[corner].0 += 1;
                slices[corner].1 -= 1;
            }

            slices[seed].0 += 1;
            slices[seed].1 -= 1;

            match classify_mask(mask) {
                RingShape::Complete => {
                    if let [Some(v0), Some(v1), Some(v2), Some(v3)] = verts {
                        self.push_ring(cell, &[v0, v1, v2, v3]);
                    }
                }
                RingShape::Invalid => break,
                shape => {
                    if emit_partials {
                        self.pending_partials
                            .push_back(PartialRing::aligned(cell, verts, shape));
                    }
                }
            }
        }
    }

    /// Number of partial rings queued for reconstruction
    pub fn pending_partial_rings(&self) -> usize {
        self.pending_partials.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mask() {
        assert_eq!(classify_mask(0b0000), RingShape::Invalid);
        assert_eq!(classify_mask(0b0010), RingShape::Corner);
        assert_eq!(classify_mask(0b0011), RingShape::Edge);
        assert_eq!(classify_mask(0b1001), RingShape::Edge);
        assert_eq!(classify_mask(0b0101), RingShape::Diagonal);
        assert_eq!(classify_mask(0b1010), RingShape::Diagonal);
        assert_eq!(classify_mask(0b1110), RingShape::InvertedCorner);
        assert_eq!(classify_mask(0b1111), RingShape::Complete);
    }

    #[test]
    fn test_alignment_rotates_to_slot_zero() {
        // Corners 2 and 3 occupied: slot 0 must land on corner 2 so that
        // slot 3 is vacant.
        let verts = [None, None, Some(5), Some(6)];
        let partial = PartialRing::aligned((0, 0), verts, RingShape::Edge);

        assert_eq!(partial.verts[0], Some(5));
        assert_eq!(partial.verts[1], Some(6));
        assert_eq!(partial.verts[2], None);
        assert_eq!(partial.verts[3], None);
        assert_eq!(partial.corners[0], CORNER_OFFSETS[2]);
        assert_eq!(partial.corners[1], CORNER_OFFSETS[3]);
    }

    #[test]
    fn test_alignment_preserves_corner_cycle() {
        let verts = [Some(1), None, Some(3), None];
        let partial = PartialRing::aligned((0, 0), verts, RingShape::Diagonal);

        // Slot 0 occupied, slot 3 vacant, and the corner offsets still walk
        // the CCW cycle.
        assert!(partial.verts[0].is_some());
        assert!(partial.verts[3].is_none());
        let start = CORNER_OFFSETS
            .iter()
            .position(|&c| c == partial.corners[0])
            .unwrap();
        for slot in 0..4 {
            assert_eq!(partial.corners[slot], CORNER_OFFSETS[(start + slot) % 4]);
        }
    }
}
