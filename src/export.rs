//! Flat mesh export
//!
//! The terminal artifact of the pipeline: a vertex coordinate buffer
//! (x,y,z interleaved) plus a self-delimiting face buffer holding
//! `[size, idx_0, ..., idx_{size-1}]` per face, so consumers need no
//! separate offset table. Vertex indices are renumbered contiguously from
//! 0 in order of first appearance among the faces; vertices no face
//! references are dropped.

use crate::types::{Polygon, Vertex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A polygon mesh in flat-buffer form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    vertex_coords: Vec<f64>,
    face_data: Vec<i32>,
}

impl Mesh {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertex_coords.len() / 3
    }

    /// Number of faces
    pub fn face_count(&self) -> usize {
        self.faces().count()
    }

    /// Interleaved x,y,z vertex coordinates (length = 3 × vertex count)
    pub fn vertex_coords(&self) -> &[f64] {
        &self.vertex_coords
    }

    /// The raw face buffer: `[size, idx...]` runs, one per face
    pub fn face_data(&self) -> &[i32] {
        &self.face_data
    }

    /// Reconstruct vertex `i` from the coordinate buffer
    pub fn vertex(&self, i: usize) -> Vertex {
        Vertex::new(
            self.vertex_coords[3 * i],
            self.vertex_coords[3 * i + 1],
            self.vertex_coords[3 * i + 2],
        )
    }

    /// Iterate over faces as index slices (without the size prefix)
    pub fn faces(&self) -> Faces<'_> {
        Faces {
            data: &self.face_data,
        }
    }

    /// Consume the mesh, yielding `(vertex_coords, face_data)`
    pub fn into_buffers(self) -> (Vec<f64>, Vec<i32>) {
        (self.vertex_coords, self.face_data)
    }
}

/// Iterator over the `[size, idx...]` runs of a face buffer
pub struct Faces<'a> {
    data: &'a [i32],
}

impl<'a> Iterator for Faces<'a> {
    type Item = &'a [i32];

    fn next(&mut self) -> Option<&'a [i32]> {
        if self.data.is_empty() {
            return None;
        }
        let size = self.data[0] as usize;
        let (face, rest) = self.data[1..].split_at(size);
        self.data = rest;
        Some(face)
    }
}

/// Flatten faces and vertices into a `Mesh`
///
/// Pure and deterministic: face emission order is the input order, vertex
/// ids are assigned by first appearance.
pub fn export_mesh(vertices: &[Vertex], faces: &[Polygon]) -> Mesh {
    let mut remap: HashMap<usize, i32> = HashMap::new();
    let mut order: Vec<usize> = Vec::new();

    let buffer_len: usize = faces.iter().map(|f| f.len() + 1).sum();
    let mut face_data = Vec::with_capacity(buffer_len);

    for face in faces {
        face_data.push(face.len() as i32);
        for &idx in face.indices() {
            let fresh_id = remap.len() as i32;
            let id = *remap.entry(idx).or_insert_with(|| {
                order.push(idx);
                fresh_id
            });
            face_data.push(id);
        }
    }

    let mut vertex_coords = Vec::with_capacity(order.len() * 3);
    for &idx in &order {
        let v = vertices[idx];
        vertex_coords.extend_from_slice(&[v.x, v.y, v.z]);
    }

    Mesh {
        vertex_coords,
        face_data,
    }
}
