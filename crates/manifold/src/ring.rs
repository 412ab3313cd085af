//! Ring polygons and the cell grid they live on

use manifold_common::Vec3;

/// Integer coordinate of a grid cell (or cell corner) on the XZ plane.
///
/// Cell `(x, z)` covers `[x*cell_size, (x+1)*cell_size)` by
/// `[z*cell_size, (z+1)*cell_size)` in world space, Y up, right-handed.
pub type CellCoord = (i32, i32);

/// Local offsets of the four cell corners in counter-clockwise order seen
/// from above
pub const CORNER_OFFSETS: [(i32, i32); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Maximum number of vertices a ring can carry
pub const MAX_RING_VERTICES: usize = 6;

/// A convex polygon occupying one grid cell of the manifold.
///
/// Vertices are indices into the shared vertex list, wound counter-clockwise
/// seen from above. Edge `i` is the directed pair
/// `(indices[i], indices[(i + 1) % count])`.
#[derive(Debug, Clone)]
pub struct Ring {
    /// The cell this ring occupies
    pub cell: CellCoord,
    /// Number of vertices in use, between 3 and 6
    pub count: u8,
    /// Vertex indices; slots past `count` are unused
    pub indices: [u32; MAX_RING_VERTICES],
    /// Reachability flag set by flood fill
    pub marked: bool,
}

impl Ring {
    /// Creates a ring from 3 to 6 vertex indices in CCW order
    pub fn new(cell: CellCoord, vertex_indices: &[u32]) -> Self {
        debug_assert!((3..=MAX_RING_VERTICES).contains(&vertex_indices.len()));
        let mut indices = [0u32; MAX_RING_VERTICES];
        indices[..vertex_indices.len()].copy_from_slice(vertex_indices);
        Self {
            cell,
            count: vertex_indices.len() as u8,
            indices,
            marked: false,
        }
    }

    /// The vertex indices in use
    pub fn vertex_indices(&self) -> &[u32] {
        &self.indices[..self.count as usize]
    }

    /// Iterates the directed edges of the ring in CCW order
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let count = self.count as usize;
        (0..count).map(move |i| (self.indices[i], self.indices[(i + 1) % count]))
    }

    /// Centre of the ring's vertex bounding box.
    ///
    /// This is the reference point `find_closest_ring_index` ranks by.
    pub fn bounds_center(&self, vertices: &[Vec3]) -> Vec3 {
        let mut min = vertices[self.indices[0] as usize];
        let mut max = min;
        for &index in &self.vertex_indices()[1..] {
            let v = vertices[index as usize];
            min = min.min(v);
            max = max.max(v);
        }
        (min + max) * 0.5
    }
}
