//! Error types for scene construction and sampling.

use thiserror::Error;

/// Errors reported by the acceleration structure and the scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Area sampling was requested on a BVH built from zero primitives.
    #[error("cannot sample an empty BVH")]
    EmptyBvh,

    /// A triangle mesh was constructed without triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,

    /// An object references a material slot that does not exist.
    #[error("object {object} references missing material {material}")]
    MissingMaterial { object: usize, material: u32 },

    /// Integrator or render settings are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for path tracer operations.
pub type Result<T> = std::result::Result<T, Error>;
