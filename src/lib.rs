//! Waterman Polyhedron Meshing Library
//!
//! Computes Waterman polyhedra: the convex hull of the face-centered-cubic
//! lattice points inside a sphere of a given radius, exported as a polygon
//! mesh (flat vertex coordinate buffer plus self-delimiting face index
//! buffer).
//!
//! The pipeline per call is radius → lattice candidates → incremental 3D
//! convex hull → coplanar face merging → flat export. Each call is pure
//! and strictly sequential; identical radii produce bit-identical meshes.
//!
//! # Example
//! ```
//! use math_waterman::compute_mesh;
//!
//! // radius 2 (Waterman root 2) is the regular octahedron
//! let mesh = compute_mesh(2.0).unwrap();
//! assert_eq!(mesh.vertex_count(), 6);
//! assert_eq!(mesh.face_count(), 8);
//! ```

pub mod capi;
mod export;
mod geometry;
mod lattice;
mod merge;
mod quickhull;
mod types;

// Make testdata publicly available for tests
pub mod testdata;

pub use export::{Faces, Mesh, export_mesh};
pub use lattice::{waterman_points, waterman_points_centered};
pub use merge::merge_coplanar_faces;
pub use types::{ConvexHull3D, Face, Polygon, Vertex};

use rayon::prelude::*;

/// Error types for Waterman mesh computation
#[derive(Debug, thiserror::Error)]
pub enum WatermanError {
    /// Radius too small, or the candidate points do not span 3D
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Tolerance-driven bookkeeping broke down beyond the retry budget
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// A merge or manifold-integrity violation; always fatal
    #[error("topology error: {0}")]
    TopologyError(String),
}

pub type Result<T> = std::result::Result<T, WatermanError>;

/// Numerical tolerance for floating-point comparisons
/// Used throughout the library for:
/// - Point-vs-plane classification
/// - Degeneracy detection
/// - Vertex deduplication (scaled by input extent)
pub(crate) const EPSILON: f64 = 1e-10;

/// Unit-normal agreement tolerance for coplanar face merging
pub(crate) const EPSILON_NORMAL: f64 = 1e-9;

/// Scale `EPSILON` by the input extent so tolerances track coordinate
/// magnitude
pub(crate) fn compute_relative_epsilon(vertices: &[Vertex]) -> f64 {
    let max_abs = vertices
        .iter()
        .map(|v| v.x.abs().max(v.y.abs()).max(v.z.abs()))
        .fold(0.0, f64::max);
    EPSILON * max_abs.max(1.0)
}

/// Drop duplicate vertices (within `epsilon`), keeping first occurrences
/// in input order
pub(crate) fn deduplicate_vertices(vertices: &[Vertex], epsilon: f64) -> Vec<Vertex> {
    let mut seen = std::collections::HashSet::with_capacity(vertices.len());
    let mut unique = Vec::with_capacity(vertices.len());
    let inv = 1.0 / epsilon;

    for v in vertices {
        let key = (
            (v.x * inv).round() as i64,
            (v.y * inv).round() as i64,
            (v.z * inv).round() as i64,
        );
        if seen.insert(key) {
            unique.push(*v);
        }
    }

    unique
}

/// Compute the Waterman polyhedron mesh for a sphere of `radius` centered
/// on the lattice origin
pub fn compute_mesh(radius: f64) -> Result<Mesh> {
    compute_mesh_centered(radius, Vertex::new(0.0, 0.0, 0.0))
}

/// Compute the Waterman polyhedron mesh for a sphere centered on an
/// arbitrary point (the Waterman origin families); output coordinates are
/// relative to the center
pub fn compute_mesh_centered(radius: f64, center: Vertex) -> Result<Mesh> {
    let candidates = lattice::waterman_points_centered(radius, center)?;
    let hull = ConvexHull3D::build(&candidates)?;

    let triangles: Vec<Polygon> = hull.faces().iter().map(|&f| Polygon::from(f)).collect();
    let merged = merge::merge_coplanar_faces(hull.vertices(), &triangles)?;

    log::debug!(
        "radius {radius}: {} hull triangles merged into {} faces",
        triangles.len(),
        merged.len()
    );

    Ok(export::export_mesh(hull.vertices(), &merged))
}

/// Compute meshes for a batch of radii, parallelized across calls
///
/// Each call stays internally sequential; results are in input order and
/// identical to calling [`compute_mesh`] element-wise.
pub fn compute_meshes(radii: &[f64]) -> Vec<Result<Mesh>> {
    radii.par_iter().map(|&r| compute_mesh(r)).collect()
}
