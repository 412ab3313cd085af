//! Configuration for manifold construction

use manifold_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::physics::LayerMask;

/// Smallest permitted cell size; smaller values are clamped up at ingest
pub const MIN_CELL_SIZE: f32 = 0.01;

/// Largest useful bisection depth; beyond this the fraction step is below
/// f32 resolution, so higher values are clamped down at ingest
pub const MAX_RECONSTRUCTION_ITERATIONS: u32 = 24;

/// Configuration parameters for one manifold build.
///
/// A settings value is immutable for the duration of a build. The capsule
/// used for headroom tests has its endpoints at `step_height + agent_radius`
/// and `agent_height - agent_radius` above the ground point, with radius
/// `agent_radius`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifoldSettings {
    /// Radius of the agent cylinder
    pub agent_radius: f32,
    /// Height of the agent cylinder
    pub agent_height: f32,
    /// The maximum height difference the agent can step across
    pub step_height: f32,
    /// The maximum surface slope in degrees that is considered walkable
    pub max_surface_angle: f32,
    /// Horizontal resolution of the sampling grid
    pub cell_size: f32,
    /// Whether partial rings are completed by boundary reconstruction
    pub edge_reconstruction: bool,
    /// Whether single-pole rings attempt the corner-intersection refinement
    pub corner_reconstruction: bool,
    /// Number of bisection steps per reconstructed boundary vertex
    pub reconstruction_iterations: u32,
    /// Layers the agent can stand on
    pub walkable_layers: LayerMask,
    /// Layers that obstruct the agent without being standable
    pub blocking_layers: LayerMask,
    /// Whether to flush pending physics transforms at the start of a build
    pub sync_physics_on_update: bool,
    /// Whether the character controller is carried by a moving floor
    pub translate_with_colliders: bool,
    /// Whether the character controller is rotated by a turning floor
    pub rotate_with_colliders: bool,
}

impl Default for ManifoldSettings {
    fn default() -> Self {
        Self {
            agent_radius: 0.2,
            agent_height: 1.8,
            step_height: 0.35,
            max_surface_angle: 45.0,
            cell_size: 0.5,
            edge_reconstruction: true,
            corner_reconstruction: true,
            reconstruction_iterations: 4,
            walkable_layers: 1,
            blocking_layers: 0,
            sync_physics_on_update: false,
            translate_with_colliders: true,
            rotate_with_colliders: true,
        }
    }
}

impl ManifoldSettings {
    /// Creates settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the ingest clamps and returns the result
    pub fn clamped(mut self) -> Self {
        self.cell_size = self.cell_size.max(MIN_CELL_SIZE);
        self.reconstruction_iterations = self
            .reconstruction_iterations
            .min(MAX_RECONSTRUCTION_ITERATIONS);
        self
    }

    /// Union of walkable and blocking layers; everything a build ray must see
    pub fn relevant_layers(&self) -> LayerMask {
        self.walkable_layers | self.blocking_layers
    }

    /// Minimum Y component a surface normal needs to count as walkable
    pub fn surface_normal_y_threshold(&self) -> f32 {
        self.max_surface_angle.to_radians().cos()
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        let finite = self.agent_radius.is_finite()
            && self.agent_height.is_finite()
            && self.step_height.is_finite()
            && self.max_surface_angle.is_finite()
            && self.cell_size.is_finite();
        if !finite {
            return Err(Error::InvalidConfig(
                "settings contain non-finite values".to_string(),
            ));
        }

        if self.agent_radius <= 0.0 {
            return Err(Error::InvalidConfig("agent_radius must be positive".to_string()));
        }

        if self.agent_height <= 0.0 {
            return Err(Error::InvalidConfig("agent_height must be positive".to_string()));
        }

        if self.step_height < 0.0 {
            return Err(Error::InvalidConfig("step_height must not be negative".to_string()));
        }

        if !(0.0..=90.0).contains(&self.max_surface_angle) {
            return Err(Error::InvalidConfig(
                "max_surface_angle must lie in [0, 90] degrees".to_string(),
            ));
        }

        if self.cell_size < MIN_CELL_SIZE {
            return Err(Error::InvalidConfig(format!(
                "cell_size must be at least {MIN_CELL_SIZE}"
            )));
        }

        // The headroom capsule inverts when the agent is not taller than a
        // step plus both cap radii.
        if self.agent_height <= self.step_height + 2.0 * self.agent_radius {
            return Err(Error::InvalidConfig(
                "agent_height must exceed step_height plus twice agent_radius".to_string(),
            ));
        }

        Ok(())
    }
}
