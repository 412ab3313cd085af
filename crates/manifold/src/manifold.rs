//! The walkable surface manifold and its build orchestrator
//!
//! A [`WalkManifold`] owns every bulk container of one build: the vertex
//! arena (pole vertices first, reconstructed boundary vertices after), the
//! ring arena, and the auxiliary maps that cross-reference them by cell,
//! directed edge, and probe source. Indices are the sole cross-reference;
//! no pointers between records exist.
//!
//! Construction is a four-step state machine, `Cleared` through `Complete`,
//! driven either atomically by [`WalkManifold::update`], cooperatively by
//! [`WalkManifold::update_async`], or manually through the
//! `partial_update_*` primitives. Queries are legal only in `Complete`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use manifold_common::{BuildContext, Error, Result, TimerCategory, Vec3};

use crate::partial_ring::PartialRing;
use crate::physics::{ColliderId, PhysicsPort};
use crate::ring::{CellCoord, Ring};
use crate::settings::ManifoldSettings;

/// Construction progress of a manifold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// No build data; the starting and post-clear state
    Cleared,
    /// Pole sampling is in progress
    CreatingPoles,
    /// Partial-ring pairing is in progress
    CreatingPartials,
    /// Boundary reconstruction is in progress
    Reconstructing,
    /// The edge index pass is in progress
    ConnectingEdges,
    /// The manifold is built; queries are legal
    Complete,
}

/// Cooperative cancellation signal for [`WalkManifold::update_async`].
///
/// Cloning shares the flag; cancelling any clone cancels the build at its
/// next yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The vertices one sampled cell corner contributed: a slice of the vertex
/// arena, strictly descending in Y
#[derive(Debug, Clone, Copy)]
pub struct Pole {
    /// Index of the pole's highest vertex in the vertex arena
    pub first_vertex: u32,
    /// Number of vertices in the pole
    pub count: u32,
}

/// A walkable surface manifold for one cylindrical agent.
///
/// All containers are retained across builds; [`WalkManifold::clear`] resets
/// lengths without releasing capacity, so steady-state rebuilds allocate
/// nothing.
#[derive(Debug)]
pub struct WalkManifold {
    pub(crate) settings: ManifoldSettings,
    pub(crate) state: BuildState,
    /// Pole vertices first, reconstructed boundary vertices after
    pub(crate) vertices: Vec<Vec3>,
    /// Collider handle per pole vertex; its length is the pole vertex count
    pub(crate) vertex_colliders: Vec<ColliderId>,
    pub(crate) cell_poles: HashMap<CellCoord, Pole>,
    pub(crate) rings: Vec<Ring>,
    pub(crate) cell_rings: HashMap<CellCoord, Vec<u32>>,
    pub(crate) edge_rings: HashMap<(u32, u32), u32>,
    pub(crate) pending_partials: VecDeque<PartialRing>,
    pub(crate) true_edge_cache: HashMap<(u32, (i32, i32)), u32>,
    pub(crate) context: BuildContext,
}

impl WalkManifold {
    /// Creates an empty manifold with the given settings, clamped at ingest
    pub fn new(settings: ManifoldSettings) -> Self {
        Self {
            settings: settings.clamped(),
            state: BuildState::Cleared,
            vertices: Vec::new(),
            vertex_colliders: Vec::new(),
            cell_poles: HashMap::new(),
            rings: Vec::new(),
            cell_rings: HashMap::new(),
            edge_rings: HashMap::new(),
            pending_partials: VecDeque::new(),
            true_edge_cache: HashMap::new(),
            context: BuildContext::new(),
        }
    }

    /// The settings this manifold builds with
    pub fn settings(&self) -> &ManifoldSettings {
        &self.settings
    }

    /// Current construction state
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// All vertices of the current build
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Number of pole vertices; indices below this have a collider handle
    pub fn pole_vertices_count(&self) -> usize {
        self.vertex_colliders.len()
    }

    /// Collider handle per pole vertex, parallel to the first
    /// `pole_vertices_count` vertices
    pub fn vertex_colliders(&self) -> &[ColliderId] {
        &self.vertex_colliders
    }

    /// All rings of the current build
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Ring indices registered for a cell
    pub fn rings_in_cell(&self, cell: CellCoord) -> &[u32] {
        self.cell_rings.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The pole sampled at a grid corner, if that corner has been sampled
    pub fn pole_at(&self, corner: CellCoord) -> Option<Pole> {
        self.cell_poles.get(&corner).copied()
    }

    /// Number of sampled grid corners
    pub fn sampled_corner_count(&self) -> usize {
        self.cell_poles.len()
    }

    /// Build log and timing context
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Mutable build log and timing context
    pub fn context_mut(&mut self) -> &mut BuildContext {
        &mut self.context
    }

    /// Destroys all build data and returns to `Cleared`.
    ///
    /// Container capacity is retained for the next build.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.vertex_colliders.clear();
        self.cell_poles.clear();
        self.rings.clear();
        self.cell_rings.clear();
        self.edge_rings.clear();
        self.pending_partials.clear();
        self.true_edge_cache.clear();
        self.state = BuildState::Cleared;
    }

    /// Runs one atomic build over the cell rectangle `[cell_min, cell_max)`
    /// and the vertical band `[y_min, y_max)`.
    ///
    /// An empty rectangle or band completes immediately with no surface.
    pub fn update<P: PhysicsPort>(
        &mut self,
        port: &P,
        cell_min: CellCoord,
        cell_max: CellCoord,
        y_min: f32,
        y_max: f32,
    ) -> Result<()> {
        self.settings.validate()?;
        validate_band(y_min, y_max)?;

        self.clear();
        if self.settings.sync_physics_on_update {
            port.sync_transforms();
        }

        self.context.start_timer(TimerCategory::Total);
        let result = self.run_build_steps(port, cell_min, cell_max, y_min, y_max);
        self.context.stop_timer(TimerCategory::Total);
        result
    }

    fn run_build_steps<P: PhysicsPort>(
        &mut self,
        port: &P,
        cell_min: CellCoord,
        cell_max: CellCoord,
        y_min: f32,
        y_max: f32,
    ) -> Result<()> {
        if is_empty_range(cell_min, cell_max, y_min, y_max) {
            self.context
                .log_debug("empty build range; completing with no surface");
            self.enter_state(BuildState::CreatingPoles)?;
            self.enter_state(BuildState::CreatingPartials)?;
            return self.partial_update_connect();
        }

        self.partial_update_poles(port, cell_min, cell_max, y_min, y_max)?;
        self.partial_update_partial_rings(cell_min, cell_max)?;
        self.partial_update_reconstruct(port, usize::MAX)?;
        self.partial_update_connect()
    }

    /// Runs one cooperative build, yielding between pole-sampling tiles of
    /// `chunk_size x chunk_size` corners and between reconstruction slices.
    ///
    /// Cancellation is observed at every yield; on cancel the manifold is
    /// cleared and [`Error::Cancelled`] is returned, never leaving an
    /// intermediate state behind.
    pub async fn update_async<P: PhysicsPort>(
        &mut self,
        port: &P,
        cell_min: CellCoord,
        cell_max: CellCoord,
        y_min: f32,
        y_max: f32,
        chunk_size: u32,
        cancel: &CancelToken,
    ) -> Result<()> {
        self.settings.validate()?;
        validate_band(y_min, y_max)?;

        self.clear();
        if self.settings.sync_physics_on_update {
            port.sync_transforms();
        }

        if is_empty_range(cell_min, cell_max, y_min, y_max) {
            self.context
                .log_debug("empty build range; completing with no surface");
            self.enter_state(BuildState::CreatingPoles)?;
            self.enter_state(BuildState::CreatingPartials)?;
            return self.partial_update_connect();
        }

        self.context.start_timer(TimerCategory::Total);
        let chunk = chunk_size.max(1) as i32;

        let mut tile_z = cell_min.1;
        while tile_z <= cell_max.1 {
            let tile_z_end = (tile_z + chunk - 1).min(cell_max.1);
            let mut tile_x = cell_min.0;
            while tile_x <= cell_max.0 {
                let tile_x_end = (tile_x + chunk - 1).min(cell_max.0);
                self.partial_update_poles(
                    port,
                    (tile_x, tile_z),
                    (tile_x_end, tile_z_end),
                    y_min,
                    y_max,
                )?;

                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    return self.cancel_build();
                }
                tile_x = tile_x_end + 1;
            }
            tile_z = tile_z_end + 1;
        }

        self.partial_update_partial_rings(cell_min, cell_max)?;

        let slice = ((chunk * chunk) as usize
            / (1 + self.settings.reconstruction_iterations as usize))
            .max(1);
        loop {
            let remaining = self.partial_update_reconstruct(port, slice)?;

            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return self.cancel_build();
            }
            if remaining == 0 {
                break;
            }
        }

        let result = self.partial_update_connect();
        self.context.stop_timer(TimerCategory::Total);
        result
    }

    fn cancel_build(&mut self) -> Result<()> {
        self.context.stop_timer(TimerCategory::Total);
        self.context.log_info("build cancelled; clearing manifold");
        self.clear();
        Err(Error::Cancelled)
    }

    pub(crate) fn push_ring(&mut self, cell: CellCoord, vertex_indices: &[u32]) {
        let index = self.rings.len() as u32;
        self.rings.push(Ring::new(cell, vertex_indices));
        self.cell_rings.entry(cell).or_default().push(index);
    }

    /// Monotone state transition; every step enters through here
    pub(crate) fn enter_state(&mut self, next: BuildState) -> Result<()> {
        use BuildState::*;
        let legal = matches!(
            (self.state, next),
            (Cleared, CreatingPoles)
                | (CreatingPoles, CreatingPoles)
                | (CreatingPoles, CreatingPartials)
                | (CreatingPartials, CreatingPartials)
                | (CreatingPartials, Reconstructing)
                | (Reconstructing, Reconstructing)
                | (CreatingPartials, ConnectingEdges)
                | (Reconstructing, ConnectingEdges)
                | (ConnectingEdges, Complete)
        );
        if !legal {
            return Err(Error::InvalidOrder(format!(
                "cannot move from {:?} to {:?}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}

fn validate_band(y_min: f32, y_max: f32) -> Result<()> {
    if !y_min.is_finite() || !y_max.is_finite() {
        return Err(Error::BadInput(format!(
            "vertical band [{y_min}, {y_max}] is not finite"
        )));
    }
    Ok(())
}

fn is_empty_range(cell_min: CellCoord, cell_max: CellCoord, y_min: f32, y_max: f32) -> bool {
    cell_max.0 <= cell_min.0 || cell_max.1 <= cell_min.1 || y_max <= y_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SyntheticScene;

    fn flat_scene() -> SyntheticScene {
        let mut scene = SyntheticScene::new();
        scene.add_ground(0.0, 1);
        scene
    }

    fn test_settings() -> ManifoldSettings {
        ManifoldSettings {
            agent_radius: 0.2,
            agent_height: 1.0,
            step_height: 0.35,
            cell_size: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_range_completes_with_no_surface() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());

        manifold.update(&scene, (0, 0), (0, 0), -1.0, 1.0).unwrap();

        assert_eq!(manifold.state(), BuildState::Complete);
        assert!(manifold.rings().is_empty());
        assert!(manifold.vertices().is_empty());
    }

    #[test]
    fn test_inverted_band_completes_with_no_surface() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());

        manifold.update(&scene, (-1, -1), (1, 1), 1.0, -1.0).unwrap();

        assert_eq!(manifold.state(), BuildState::Complete);
        assert!(manifold.rings().is_empty());
    }

    #[test]
    fn test_non_finite_band_is_bad_input() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());

        let result = manifold.update(&scene, (-1, -1), (1, 1), f32::NAN, 1.0);
        assert!(matches!(result, Err(Error::BadInput(_))));
    }

    #[test]
    fn test_invalid_settings_rejected_at_build() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(ManifoldSettings {
            agent_radius: -1.0,
            ..test_settings()
        });

        let result = manifold.update(&scene, (-1, -1), (1, 1), -1.0, 1.0);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_out_of_order_steps_rejected() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());

        // Pairing before sampling.
        let result = manifold.partial_update_partial_rings((-1, -1), (1, 1));
        assert!(matches!(result, Err(Error::InvalidOrder(_))));

        // Connecting before anything.
        let result = manifold.partial_update_connect();
        assert!(matches!(result, Err(Error::InvalidOrder(_))));

        // Sampling after a completed build requires a clear first.
        manifold.update(&scene, (-1, -1), (1, 1), -1.0, 1.0).unwrap();
        let result = manifold.partial_update_poles(&scene, (2, 2), (3, 3), -1.0, 1.0);
        assert!(matches!(result, Err(Error::InvalidOrder(_))));

        manifold.clear();
        assert!(manifold
            .partial_update_poles(&scene, (2, 2), (3, 3), -1.0, 1.0)
            .is_ok());
    }

    #[test]
    fn test_clear_resets_and_retains_settings() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());
        manifold.update(&scene, (-1, -1), (1, 1), -1.0, 1.0).unwrap();
        assert!(!manifold.rings().is_empty());

        manifold.clear();
        assert_eq!(manifold.state(), BuildState::Cleared);
        assert!(manifold.rings().is_empty());
        assert_eq!(manifold.pole_vertices_count(), 0);

        // A second build over the same region reproduces the first.
        manifold.update(&scene, (-1, -1), (1, 1), -1.0, 1.0).unwrap();
        assert_eq!(manifold.rings().len(), 4);
    }

    #[test]
    fn test_partial_updates_compose_disjoint_rectangles() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());

        // Two disjoint cell rectangles built through the step primitives.
        manifold
            .partial_update_poles(&scene, (-3, -1), (-1, 1), -1.0, 1.0)
            .unwrap();
        manifold
            .partial_update_poles(&scene, (2, -1), (4, 1), -1.0, 1.0)
            .unwrap();
        manifold.partial_update_partial_rings((-3, -1), (-1, 1)).unwrap();
        manifold.partial_update_partial_rings((2, -1), (4, 1)).unwrap();
        manifold.partial_update_reconstruct(&scene, usize::MAX).unwrap();
        manifold.partial_update_connect().unwrap();

        assert_eq!(manifold.state(), BuildState::Complete);
        // 2x2 complete cells per rectangle on an infinite plane.
        let complete = manifold
            .rings()
            .iter()
            .filter(|r| r.count == 4)
            .count();
        assert_eq!(complete, 8);
    }

    #[tokio::test]
    async fn test_async_build_matches_sync() {
        let scene = flat_scene();

        let mut sync_manifold = WalkManifold::new(test_settings());
        sync_manifold
            .update(&scene, (-2, -2), (2, 2), -1.0, 1.0)
            .unwrap();

        let mut async_manifold = WalkManifold::new(test_settings());
        async_manifold
            .update_async(&scene, (-2, -2), (2, 2), -1.0, 1.0, 2, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(async_manifold.state(), BuildState::Complete);
        assert_eq!(async_manifold.rings().len(), sync_manifold.rings().len());
        assert_eq!(
            async_manifold.pole_vertices_count(),
            sync_manifold.pole_vertices_count()
        );
    }

    #[tokio::test]
    async fn test_async_cancellation_clears_manifold() {
        let scene = flat_scene();
        let mut manifold = WalkManifold::new(test_settings());

        let cancel = CancelToken::new();
        cancel.cancel();

        let result = manifold
            .update_async(&scene, (-2, -2), (2, 2), -1.0, 1.0, 2, &cancel)
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(manifold.state(), BuildState::Cleared);
        assert!(manifold.vertices().is_empty());
        assert!(manifold.rings().is_empty());
    }
}
