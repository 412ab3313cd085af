//! Common utilities and data structures shared by the walkable-manifold crates

mod context;
mod math;

pub use context::{BuildContext, LogEntry, LogLevel, TimerCategory, TimerEntry};
pub use math::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("build step out of order: {0}")]
    InvalidOrder(String),

    #[error("manifold is not complete; queries require a finished build")]
    NotReady,

    #[error("no walkable surface reachable from the current or any historical position")]
    NoSurface,

    #[error("build was cancelled; manifold has been cleared")]
    Cancelled,

    #[error("bad input: {0}")]
    BadInput(String),
}

/// Result type for manifold operations
pub type Result<T> = std::result::Result<T, Error>;
