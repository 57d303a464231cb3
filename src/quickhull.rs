//! Incremental (quickhull) 3D convex hull construction
//!
//! Based on:
//! - Barber, C.B., Dobkin, D.P., and Huhdanpaa, H.T., "The Quickhull algorithm
//!   for convex hulls," ACM Trans. on Mathematical Software, 22(4):469-483, 1996.
//!
//! Faces live in an index arena with tombstone deletion, so face ids stay
//! stable while the horizon is carved out; the arena is compacted when the
//! deleted ratio grows. Every step (candidate scan, apex selection, horizon
//! walk, orphan redistribution) visits faces and points in ascending index
//! order, so identical input produces an identical hull, face order
//! included. A single construction is strictly sequential.

use crate::geometry::{Plane, find_extreme_points};
use crate::types::{ConvexHull3D, Face, Vertex};
use crate::{Result, WatermanError, compute_relative_epsilon, deduplicate_vertices};
use std::collections::HashMap;

const MAX_ITERATIONS: usize = 100_000;

/// Bounded budget for outside-set bookkeeping corrections before the
/// attempt is declared unstable
const CORRECTION_BUDGET: usize = 32;

/// Tolerance coarsening factor for the single retry after an unstable
/// attempt
const RETRY_EPSILON_FACTOR: f64 = 100.0;

/// Internal representation of a face during hull construction
#[derive(Debug, Clone)]
struct HullFace {
    vertices: [usize; 3],
    plane: Plane,
    outside_points: Vec<usize>,
    furthest_point: Option<usize>,
    furthest_distance: f64,
    deleted: bool,
}

impl HullFace {
    fn new(v0: usize, v1: usize, v2: usize, vertices: &[Vertex]) -> Self {
        let plane = Plane::from_triangle(&vertices[v0], &vertices[v1], &vertices[v2])
            .unwrap_or(Plane {
                normal: Vertex::new(0.0, 0.0, 1.0),
                offset: 0.0,
            });

        Self {
            vertices: [v0, v1, v2],
            plane,
            outside_points: Vec::new(),
            furthest_point: None,
            furthest_distance: 0.0,
            deleted: false,
        }
    }

    #[inline]
    fn signed_distance(&self, point: &Vertex) -> f64 {
        self.plane.signed_distance(point)
    }

    #[inline]
    fn is_visible_from(&self, point: &Vertex, epsilon: f64) -> bool {
        self.plane.is_above(point, epsilon)
    }

    fn assign_point(&mut self, point_idx: usize, distance: f64) {
        self.outside_points.push(point_idx);
        if distance > self.furthest_distance {
            self.furthest_point = Some(point_idx);
            self.furthest_distance = distance;
        }
    }

    /// Drop the cached farthest point (used when a correction removes it)
    fn invalidate_furthest(&mut self) {
        self.furthest_point = None;
        self.furthest_distance = 0.0;
    }

    fn furthest_point(&self, vertices: &[Vertex]) -> Option<(usize, f64)> {
        if let Some(idx) = self.furthest_point {
            return Some((idx, self.furthest_distance));
        }

        let mut max_distance = 0.0;
        let mut max_idx = None;

        for &idx in &self.outside_points {
            let distance = self.signed_distance(&vertices[idx]);
            if distance > max_distance {
                max_distance = distance;
                max_idx = Some(idx);
            }
        }

        max_idx.map(|idx| (idx, max_distance))
    }

    fn to_face(&self) -> Face {
        Face::new(self.vertices[0], self.vertices[1], self.vertices[2])
    }
}

/// Edge representation for horizon computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    v0: usize,
    v1: usize,
}

impl Edge {
    /// Canonical (direction-normalized) edge for consistent hashing
    #[inline]
    fn new(v0: usize, v1: usize) -> Self {
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }

    /// Create with explicit orientation (don't normalize)
    #[inline]
    fn oriented(v0: usize, v1: usize) -> Self {
        Self { v0, v1 }
    }
}

/// Scratch buffers to avoid allocations in the hot loop
struct ScratchBuffers {
    visible_face_indices: Vec<usize>,
    orphaned_points: Vec<usize>,
    new_faces: Vec<HullFace>,
    edge_to_face: HashMap<Edge, usize>,
    horizon_edges: Vec<Edge>,
}

impl ScratchBuffers {
    fn new() -> Self {
        Self {
            visible_face_indices: Vec::with_capacity(64),
            orphaned_points: Vec::with_capacity(256),
            new_faces: Vec::with_capacity(64),
            edge_to_face: HashMap::with_capacity(128),
            horizon_edges: Vec::with_capacity(64),
        }
    }

    fn clear(&mut self) {
        self.visible_face_indices.clear();
        self.orphaned_points.clear();
        self.new_faces.clear();
        self.edge_to_face.clear();
        self.horizon_edges.clear();
    }
}

/// Build a convex hull using the incremental quickhull algorithm
///
/// Retries once with a coarsened tolerance if the outside-set bookkeeping
/// turns inconsistent, then surfaces `NumericalInstability`.
pub fn quickhull_3d(vertices: &[Vertex]) -> Result<ConvexHull3D> {
    if vertices.len() < 4 {
        return Err(WatermanError::DegenerateInput(format!(
            "{} input points, need at least 4",
            vertices.len()
        )));
    }

    let relative_eps = compute_relative_epsilon(vertices);
    let unique_vertices = deduplicate_vertices(vertices, relative_eps);

    if unique_vertices.len() < 4 {
        return Err(WatermanError::DegenerateInput(format!(
            "{} distinct points after deduplication, need at least 4",
            unique_vertices.len()
        )));
    }

    match hull_attempt(&unique_vertices, relative_eps) {
        Err(WatermanError::NumericalInstability(reason)) => {
            let coarse_eps = relative_eps * RETRY_EPSILON_FACTOR;
            log::warn!(
                "hull attempt unstable ({reason}), retrying with tolerance {coarse_eps:.3e}"
            );
            hull_attempt(&unique_vertices, coarse_eps)
        }
        result => result,
    }
}

/// One full hull construction at a fixed tolerance
fn hull_attempt(unique_vertices: &[Vertex], epsilon: f64) -> Result<ConvexHull3D> {
    let initial_simplex = find_initial_simplex(unique_vertices, epsilon)?;

    // Centroid of the initial simplex, guaranteed interior for the whole run
    let simplex_centroid = centroid4(unique_vertices, &initial_simplex);

    let mut hull_faces = create_initial_hull(&initial_simplex, unique_vertices);

    let mut in_simplex = vec![false; unique_vertices.len()];
    for &idx in &initial_simplex {
        in_simplex[idx] = true;
    }

    let unprocessed_points: Vec<usize> = (0..unique_vertices.len())
        .filter(|&i| !in_simplex[i])
        .collect();

    assign_points(&mut hull_faces, unique_vertices, &unprocessed_points, epsilon);

    let mut scratch = ScratchBuffers::new();
    let mut active_face_count = hull_faces.len();
    let mut corrections = 0;
    let mut iterations = 0;

    loop {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return Err(WatermanError::NumericalInstability(format!(
                "no convergence after {iterations} iterations with {active_face_count} faces \
                 at tolerance {epsilon:.3e}"
            )));
        }

        // Compact when the tombstone ratio gets large
        let deleted_count = hull_faces.len() - active_face_count;
        if deleted_count > 0 && (deleted_count as f64 / hull_faces.len() as f64) > 0.3 {
            compact_faces(&mut hull_faces);

            let total_outside_points: usize =
                hull_faces.iter().map(|f| f.outside_points.len()).sum();
            log::debug!(
                "iteration {iterations}: {active_face_count} faces, \
                 {total_outside_points} outside points remaining"
            );
        }

        // Face with the globally farthest outside point
        let (face_idx, point_idx) =
            match find_face_with_furthest_point(&hull_faces, unique_vertices) {
                Some((face_idx, point_idx, _)) => (face_idx, point_idx),
                None => break,
            };

        let point = unique_vertices[point_idx];

        scratch.clear();

        for (i, face) in hull_faces.iter().enumerate() {
            if !face.deleted && face.is_visible_from(&point, epsilon) {
                scratch.visible_face_indices.push(i);
            }
        }

        if scratch.visible_face_indices.is_empty() {
            // The apex was booked as outside a face it can no longer see:
            // the bookkeeping is inconsistent. Drop the point and charge
            // the correction budget.
            corrections += 1;
            if corrections > CORRECTION_BUDGET {
                return Err(WatermanError::NumericalInstability(format!(
                    "outside-set bookkeeping required more than {CORRECTION_BUDGET} corrections \
                     at tolerance {epsilon:.3e}"
                )));
            }
            let face = &mut hull_faces[face_idx];
            face.outside_points.retain(|&p| p != point_idx);
            face.invalidate_furthest();
            continue;
        }

        find_horizon(
            &hull_faces,
            &scratch.visible_face_indices,
            &mut scratch.edge_to_face,
            &mut scratch.horizon_edges,
        );

        // Collect orphaned points from visible faces
        for &visible_idx in &scratch.visible_face_indices {
            scratch
                .orphaned_points
                .extend(hull_faces[visible_idx].outside_points.iter().copied());
        }
        scratch.orphaned_points.retain(|&p| p != point_idx);

        // Tombstone the visible faces
        for &visible_idx in &scratch.visible_face_indices {
            hull_faces[visible_idx].deleted = true;
            hull_faces[visible_idx].outside_points.clear();
            active_face_count -= 1;
        }

        // New triangles from horizon edges to the apex, oriented outward
        for edge in &scratch.horizon_edges {
            let face = HullFace::new(edge.v0, edge.v1, point_idx, unique_vertices);

            let to_interior = simplex_centroid.sub(&unique_vertices[face.vertices[0]]);
            if face.plane.normal.dot(&to_interior) < 0.0 {
                scratch.new_faces.push(face);
            } else {
                scratch
                    .new_faces
                    .push(HullFace::new(edge.v1, edge.v0, point_idx, unique_vertices));
            }
        }

        // Reassign orphans, preferring the freshly created faces
        for &orphan_idx in &scratch.orphaned_points {
            let orphan = &unique_vertices[orphan_idx];
            let mut assigned = false;

            for face in &mut scratch.new_faces {
                if face.is_visible_from(orphan, epsilon) {
                    let distance = face.signed_distance(orphan);
                    face.assign_point(orphan_idx, distance);
                    assigned = true;
                    break;
                }
            }

            if !assigned {
                for face in hull_faces.iter_mut().filter(|f| !f.deleted) {
                    if face.is_visible_from(orphan, epsilon) {
                        let distance = face.signed_distance(orphan);
                        face.assign_point(orphan_idx, distance);
                        break;
                    }
                }
            }
        }

        active_face_count += scratch.new_faces.len();
        hull_faces.append(&mut scratch.new_faces);
    }

    compact_faces(&mut hull_faces);

    let faces: Vec<Face> = hull_faces.iter().map(|f| f.to_face()).collect();

    Ok(ConvexHull3D::new(unique_vertices.to_vec(), faces))
}

/// Assign points to the first face they are visible from
fn assign_points(
    hull_faces: &mut [HullFace],
    vertices: &[Vertex],
    points: &[usize],
    epsilon: f64,
) {
    for &point_idx in points {
        let vertex = &vertices[point_idx];
        for face in hull_faces.iter_mut() {
            if face.is_visible_from(vertex, epsilon) {
                let distance = face.signed_distance(vertex);
                face.assign_point(point_idx, distance);
                break;
            }
        }
    }
}

/// Find the initial simplex (tetrahedron) to start the algorithm
fn find_initial_simplex(vertices: &[Vertex], epsilon: f64) -> Result<[usize; 4]> {
    let extremes = find_extreme_points(vertices);

    // Farthest pair among the extremes
    let mut max_distance = 0.0;
    let mut v0 = 0;
    let mut v1 = 0;

    for i in 0..6 {
        for j in (i + 1)..6 {
            let dist = vertices[extremes[i]].distance(&vertices[extremes[j]]);
            if dist > max_distance {
                max_distance = dist;
                v0 = extremes[i];
                v1 = extremes[j];
            }
        }
    }

    if max_distance < epsilon {
        return Err(WatermanError::DegenerateInput(
            "all points coincide within tolerance".to_string(),
        ));
    }

    // Point farthest from the line v0-v1
    let line_dir = vertices[v1].sub(&vertices[v0]).scale(1.0 / max_distance);

    let mut max_distance = 0.0;
    let mut v2 = 0;

    for (i, vertex) in vertices.iter().enumerate() {
        if i == v0 || i == v1 {
            continue;
        }

        let to_point = vertex.sub(&vertices[v0]);
        let projection = line_dir.scale(to_point.dot(&line_dir));
        let dist = to_point.sub(&projection).magnitude();

        if dist > max_distance {
            max_distance = dist;
            v2 = i;
        }
    }

    if max_distance < epsilon {
        return Err(WatermanError::DegenerateInput(
            "points are collinear within tolerance".to_string(),
        ));
    }

    // Point farthest from the plane v0-v1-v2, either side
    let normal = match vertices[v1]
        .sub(&vertices[v0])
        .cross(&vertices[v2].sub(&vertices[v0]))
        .try_normalize()
    {
        Some(n) => n,
        None => {
            return Err(WatermanError::DegenerateInput(
                "points are collinear within tolerance".to_string(),
            ));
        }
    };

    let mut pos_dist = 0.0;
    let mut neg_dist = 0.0;
    let mut pos_idx = 0;
    let mut neg_idx = 0;

    for (i, vertex) in vertices.iter().enumerate() {
        if i == v0 || i == v1 || i == v2 {
            continue;
        }

        let dist = normal.dot(&vertex.sub(&vertices[v0]));

        if dist > pos_dist {
            pos_dist = dist;
            pos_idx = i;
        }
        if -dist > neg_dist {
            neg_dist = -dist;
            neg_idx = i;
        }
    }

    let (v3, max_distance) = if pos_dist >= neg_dist {
        (pos_idx, pos_dist)
    } else {
        (neg_idx, neg_dist)
    };

    if max_distance < epsilon {
        return Err(WatermanError::DegenerateInput(
            "points are coplanar within tolerance".to_string(),
        ));
    }

    Ok([v0, v1, v2, v3])
}

/// Create the initial hull from the simplex
fn create_initial_hull(simplex: &[usize; 4], vertices: &[Vertex]) -> Vec<HullFace> {
    let [v0, v1, v2, v3] = *simplex;

    let mut faces = vec![
        HullFace::new(v0, v1, v2, vertices),
        HullFace::new(v0, v2, v3, vertices),
        HullFace::new(v0, v3, v1, vertices),
        HullFace::new(v1, v3, v2, vertices),
    ];

    // Ensure all normals point outward from the centroid
    let centroid = centroid4(vertices, simplex);

    for face in &mut faces {
        let to_centroid = centroid.sub(&vertices[face.vertices[0]]);

        if face.plane.normal.dot(&to_centroid) > 0.0 {
            face.vertices.swap(1, 2);
            face.plane.flip();
        }
    }

    faces
}

fn centroid4(vertices: &[Vertex], simplex: &[usize; 4]) -> Vertex {
    simplex
        .iter()
        .fold(Vertex::new(0.0, 0.0, 0.0), |acc, &i| acc.add(&vertices[i]))
        .scale(0.25)
}

/// Find the face with the farthest outside point
fn find_face_with_furthest_point(
    hull_faces: &[HullFace],
    vertices: &[Vertex],
) -> Option<(usize, usize, f64)> {
    let mut max_distance = 0.0;
    let mut result = None;

    for (face_idx, face) in hull_faces.iter().enumerate() {
        if face.deleted {
            continue;
        }

        if let Some((point_idx, distance)) = face.furthest_point(vertices)
            && distance > max_distance
        {
            max_distance = distance;
            result = Some((face_idx, point_idx, distance));
        }
    }

    result
}

/// Find the horizon edges around the visible region
///
/// An edge of a visible face is on the horizon when its canonical form is
/// not shared with another visible face. Horizon edges are collected by
/// re-walking the visible faces in ascending order, never by iterating the
/// hash map, so their sequence is reproducible.
fn find_horizon(
    hull_faces: &[HullFace],
    visible_faces: &[usize],
    edge_to_face: &mut HashMap<Edge, usize>,
    horizon: &mut Vec<Edge>,
) {
    edge_to_face.clear();
    horizon.clear();

    for &face_idx in visible_faces {
        let face = &hull_faces[face_idx];
        let [a, b, c] = face.vertices;

        for (v0, v1) in [(a, b), (b, c), (c, a)] {
            let normalized = Edge::new(v0, v1);
            match edge_to_face.entry(normalized) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(face_idx);
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    // Shared by two visible faces: interior, not horizon
                    e.remove();
                }
            }
        }
    }

    for &face_idx in visible_faces {
        let face = &hull_faces[face_idx];
        let [a, b, c] = face.vertices;

        for (v0, v1) in [(a, b), (b, c), (c, a)] {
            if edge_to_face.get(&Edge::new(v0, v1)) == Some(&face_idx) {
                horizon.push(Edge::oriented(v0, v1));
            }
        }
    }
}

/// Remove tombstoned faces, preserving arena order
fn compact_faces(hull_faces: &mut Vec<HullFace>) {
    hull_faces.retain(|f| !f.deleted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;

    #[test]
    fn test_simple_tetrahedron() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(0.0, 0.0, 1.0),
        ];

        let hull = quickhull_3d(&vertices).unwrap();
        assert_eq!(hull.num_faces(), 4);
        assert_eq!(hull.num_vertices(), 4);
    }

    #[test]
    fn test_cube() {
        let hull = quickhull_3d(&testdata::cube_vertices(2.0)).unwrap();
        // 8 vertices, 12 triangles (2 per square side)
        assert_eq!(hull.num_vertices(), 8);
        assert_eq!(hull.num_faces(), 12);
    }

    #[test]
    fn test_octahedron() {
        let hull = quickhull_3d(&testdata::octahedron_vertices()).unwrap();
        assert_eq!(hull.num_vertices(), 6);
        assert_eq!(hull.num_faces(), 8);
    }

    #[test]
    fn test_interior_points_are_not_hull_faces() {
        let mut vertices = testdata::cube_vertices(2.0);
        vertices.push(Vertex::new(0.0, 0.0, 0.0));
        vertices.push(Vertex::new(0.2, -0.3, 0.1));

        let hull = quickhull_3d(&vertices).unwrap();
        // interior points survive in the vertex list but no face touches them
        assert_eq!(hull.num_faces(), 12);
        for face in hull.faces() {
            for idx in face.indices() {
                assert!(idx < 8, "face references interior point {idx}");
            }
        }
    }

    #[test]
    fn test_on_edge_points_are_coplanar_not_vertices() {
        // octahedron plus its edge midpoints: midpoints sit on the hull
        // boundary and must never become face corners
        let mut vertices = testdata::octahedron_vertices();
        let n_extreme = vertices.len();
        vertices.push(Vertex::new(0.5, 0.5, 0.0));
        vertices.push(Vertex::new(0.0, 0.5, 0.5));
        vertices.push(Vertex::new(0.5, 0.0, -0.5));

        let hull = quickhull_3d(&vertices).unwrap();
        assert_eq!(hull.num_faces(), 8);
        for face in hull.faces() {
            for idx in face.indices() {
                assert!(idx < n_extreme);
            }
        }
    }

    #[test]
    fn test_insufficient_vertices() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];

        let result = quickhull_3d(&vertices);
        assert!(matches!(result, Err(WatermanError::DegenerateInput(_))));
    }

    #[test]
    fn test_coplanar_input_is_degenerate() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(1.0, 1.0, 0.0),
            Vertex::new(0.3, 0.7, 0.0),
        ];

        let result = quickhull_3d(&vertices);
        assert!(matches!(result, Err(WatermanError::DegenerateInput(_))));
    }

    #[test]
    fn test_duplicate_points_collapse() {
        let mut vertices = testdata::cube_vertices(2.0);
        vertices.extend(testdata::cube_vertices(2.0));

        let hull = quickhull_3d(&vertices).unwrap();
        assert_eq!(hull.num_vertices(), 8);
        assert_eq!(hull.num_faces(), 12);
    }

    #[test]
    fn test_deterministic_face_order() {
        let vertices = testdata::cuboctahedron_vertices();
        let a = quickhull_3d(&vertices).unwrap();
        let b = quickhull_3d(&vertices).unwrap();
        assert_eq!(a.faces(), b.faces());
        assert_eq!(a.vertices(), b.vertices());
    }
}
