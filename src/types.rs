//! Core data types for Waterman polyhedron meshing

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3D vertex/point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    /// Create a new vertex
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product with another vertex
    pub fn dot(&self, other: &Vertex) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product with another vertex
    pub fn cross(&self, other: &Vertex) -> Vertex {
        Vertex {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Subtract another vertex
    pub fn sub(&self, other: &Vertex) -> Vertex {
        Vertex {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    /// Add another vertex
    pub fn add(&self, other: &Vertex) -> Vertex {
        Vertex {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    /// Scale by a scalar
    pub fn scale(&self, s: f64) -> Vertex {
        Vertex {
            x: self.x * s,
            y: self.y * s,
            z: self.z * s,
        }
    }

    /// Compute the magnitude/length
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize to unit length, or `None` for a near-zero vector
    pub fn try_normalize(&self) -> Option<Vertex> {
        let mag = self.magnitude();
        if mag > 1e-12 {
            Some(self.scale(1.0 / mag))
        } else {
            None
        }
    }

    /// Distance to another vertex
    pub fn distance(&self, other: &Vertex) -> f64 {
        self.sub(other).magnitude()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

/// A triangular face of the working hull (3 vertex indices, outward winding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub v0: usize,
    pub v1: usize,
    pub v2: usize,
}

impl Face {
    /// Create a new face from three vertex indices
    pub fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self { v0, v1, v2 }
    }

    /// Get vertex indices as an array
    pub fn indices(&self) -> [usize; 3] {
        [self.v0, self.v1, self.v2]
    }

    /// Compute the unit normal vector of this face
    pub fn normal(&self, vertices: &[Vertex]) -> Vertex {
        let v0 = &vertices[self.v0];
        let v1 = &vertices[self.v1];
        let v2 = &vertices[self.v2];

        let e1 = v1.sub(v0);
        let e2 = v2.sub(v0);
        e1.cross(&e2)
            .try_normalize()
            .unwrap_or(Vertex::new(0.0, 0.0, 0.0))
    }
}

/// A planar polygonal face (cyclic vertex indices, outward winding)
///
/// Variable-arity faces only exist downstream of the face merger; the
/// working hull stays triangulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    indices: Vec<usize>,
}

impl Polygon {
    /// Create a polygon from a cyclic index list
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Number of vertices in the polygon
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when the polygon has no vertices
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Get the vertex indices in cyclic order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Iterate over the directed boundary edges (vᵢ, vᵢ₊₁), wrapping around
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.indices.len();
        (0..n).map(move |i| (self.indices[i], self.indices[(i + 1) % n]))
    }
}

impl From<Face> for Polygon {
    fn from(face: Face) -> Self {
        Polygon {
            indices: vec![face.v0, face.v1, face.v2],
        }
    }
}

/// The result of a convex hull computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvexHull3D {
    /// Deduplicated input vertices (hull faces index into this list)
    vertices: Vec<Vertex>,
    /// Faces of the convex hull (each face is a triangle)
    faces: Vec<Face>,
}

impl ConvexHull3D {
    /// Create a new convex hull from vertices and faces
    pub(crate) fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Self {
        Self { vertices, faces }
    }

    /// Build a convex hull from vertices using the incremental quickhull algorithm
    pub fn build(vertices: &[Vertex]) -> crate::Result<Self> {
        crate::quickhull::quickhull_3d(vertices)
    }

    /// Get the vertices
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Get the faces
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Get the number of faces
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Compute the volume of the convex hull
    ///
    /// Signed sum of origin-apex tetrahedra; exact for any closed oriented
    /// surface regardless of where the origin sits.
    pub fn volume(&self) -> f64 {
        let mut volume = 0.0;

        for face in &self.faces {
            let v0 = &self.vertices[face.v0];
            let v1 = &self.vertices[face.v1];
            let v2 = &self.vertices[face.v2];

            volume += v0.dot(&v1.cross(v2)) / 6.0;
        }

        volume.abs()
    }

    /// Compute the surface area of the convex hull
    pub fn surface_area(&self) -> f64 {
        let mut area = 0.0;

        for face in &self.faces {
            let v0 = &self.vertices[face.v0];
            let v1 = &self.vertices[face.v1];
            let v2 = &self.vertices[face.v2];

            let e1 = v1.sub(v0);
            let e2 = v2.sub(v0);
            area += e1.cross(&e2).magnitude() / 2.0;
        }

        area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;

    #[test]
    fn test_cube_metrics() {
        let hull = ConvexHull3D::build(&testdata::cube_vertices(2.0)).unwrap();
        assert!((hull.volume() - 8.0).abs() < 1e-9);
        assert!((hull.surface_area() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_edges_wrap() {
        let poly = Polygon::new(vec![3, 5, 9, 2]);
        let edges: Vec<_> = poly.edges().collect();
        assert_eq!(edges, vec![(3, 5), (5, 9), (9, 2), (2, 3)]);
    }

    #[test]
    fn test_face_normal_is_unit() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(2.0, 0.0, 0.0),
            Vertex::new(0.0, 2.0, 0.0),
        ];
        let n = Face::new(0, 1, 2).normal(&vertices);
        assert!((n.magnitude() - 1.0).abs() < 1e-12);
        assert!(n.z > 0.0);
    }
}
