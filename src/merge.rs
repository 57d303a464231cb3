//! Coplanar face merging
//!
//! Collapses edge-adjacent faces whose unit normals agree within tolerance
//! into single polygons, so a cube side comes out as one quadrilateral
//! instead of two triangles. Only topology decides mergeability: coplanar
//! faces that are not edge-connected stay separate.
//!
//! The pass doubles as the watertightness gate. Every edge of the input
//! must border exactly two faces with opposite traversal, and every merged
//! boundary must close into a single simple cycle; anything else is an
//! upstream hull defect and surfaces as `TopologyError` instead of being
//! patched over.

use crate::geometry::Plane;
use crate::types::{Polygon, Vertex};
use crate::{EPSILON_NORMAL, Result, WatermanError};
use std::collections::{HashMap, HashSet};

/// Sine-of-angle threshold under which three consecutive boundary
/// vertices count as collinear
const EPSILON_COLLINEAR: f64 = 1e-9;

/// Merge edge-adjacent coplanar faces until none remain
///
/// Shared edges are processed in ascending canonical order, so face
/// identity in the output is reproducible. Winding order of the inputs is
/// preserved. Running the merger on an already-merged face set is a no-op.
pub fn merge_coplanar_faces(vertices: &[Vertex], faces: &[Polygon]) -> Result<Vec<Polygon>> {
    if faces.is_empty() {
        return Ok(Vec::new());
    }

    let mut normals = Vec::with_capacity(faces.len());
    for (i, face) in faces.iter().enumerate() {
        let plane = Plane::from_polygon(vertices, face.indices()).ok_or_else(|| {
            WatermanError::TopologyError(format!("face {i} is degenerate (zero area)"))
        })?;
        normals.push(plane.normal);
    }

    // Canonical edge -> the two incident faces; directed edges must be unique
    let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
    let mut directed_seen: HashSet<(usize, usize)> = HashSet::new();

    for (i, face) in faces.iter().enumerate() {
        for (a, b) in face.edges() {
            if a == b {
                return Err(WatermanError::TopologyError(format!(
                    "face {i} repeats vertex {a} on an edge"
                )));
            }
            if !directed_seen.insert((a, b)) {
                return Err(WatermanError::TopologyError(format!(
                    "edge ({a}, {b}) traversed twice in the same direction"
                )));
            }
            let key = if a < b { (a, b) } else { (b, a) };
            edge_faces.entry(key).or_default().push(i);
        }
    }

    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(edge_faces.len());
    for (&edge, incident) in &edge_faces {
        if incident.len() != 2 {
            return Err(WatermanError::TopologyError(format!(
                "edge ({}, {}) borders {} faces, expected exactly 2",
                edge.0,
                edge.1,
                incident.len()
            )));
        }
        edges.push(edge);
    }
    edges.sort_unstable();

    // Union coplanar neighbours across shared edges, in edge order
    let mut parent: Vec<usize> = (0..faces.len()).collect();
    for &edge in &edges {
        let incident = &edge_faces[&edge];
        let (f, g) = (incident[0], incident[1]);
        if normals[f].dot(&normals[g]) >= 1.0 - EPSILON_NORMAL {
            union(&mut parent, f, g);
        }
    }

    let roots: Vec<usize> = (0..faces.len())
        .map(|i| find(&mut parent, i))
        .collect();

    // Emit groups in order of their first member face
    let mut members_by_root: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut root_order: Vec<usize> = Vec::new();
    for (i, &root) in roots.iter().enumerate() {
        let members = members_by_root.entry(root).or_default();
        if members.is_empty() {
            root_order.push(root);
        }
        members.push(i);
    }

    let mut merged = Vec::with_capacity(root_order.len());
    for root in root_order {
        let members = &members_by_root[&root];
        if members.len() == 1 {
            merged.push(faces[members[0]].clone());
        } else {
            merged.push(stitch_boundary(vertices, faces, members, &roots, &edge_faces)?);
        }
    }

    Ok(merged)
}

/// Re-stitch the outer boundary of a merged coplanar group into one cycle
///
/// The boundary consists of the group's directed edges whose partner face
/// lies outside the group. Each boundary vertex must have exactly one
/// outgoing edge (more means a pinched, non-simple polygon) and the walk
/// must close covering every boundary edge.
fn stitch_boundary(
    vertices: &[Vertex],
    faces: &[Polygon],
    members: &[usize],
    roots: &[usize],
    edge_faces: &HashMap<(usize, usize), Vec<usize>>,
) -> Result<Polygon> {
    let root = roots[members[0]];
    let mut next: HashMap<usize, usize> = HashMap::new();

    for &fi in members {
        for (a, b) in faces[fi].edges() {
            let key = if a < b { (a, b) } else { (b, a) };
            let incident = &edge_faces[&key];
            let other = if incident[0] == fi {
                incident[1]
            } else {
                incident[0]
            };
            if roots[other] == root {
                continue; // interior edge of the group
            }
            if next.insert(a, b).is_some() {
                return Err(WatermanError::TopologyError(format!(
                    "merged face is not simple: vertex {a} pinches the boundary"
                )));
            }
        }
    }

    if next.len() < 3 {
        return Err(WatermanError::TopologyError(format!(
            "merged face boundary degenerated to {} edges",
            next.len()
        )));
    }

    let start = *next.keys().min().expect("boundary is non-empty");
    let mut cycle = vec![start];
    let mut current = next[&start];

    while current != start {
        if cycle.len() > next.len() {
            return Err(WatermanError::TopologyError(
                "merged face boundary does not close".to_string(),
            ));
        }
        cycle.push(current);
        current = match next.get(&current) {
            Some(&n) => n,
            None => {
                return Err(WatermanError::TopologyError(format!(
                    "merged face boundary is open at vertex {current}"
                )));
            }
        };
    }

    if cycle.len() != next.len() {
        return Err(WatermanError::TopologyError(
            "merged face boundary is disconnected".to_string(),
        ));
    }

    let cycle = drop_collinear(vertices, cycle)?;
    Ok(Polygon::new(cycle))
}

/// Remove boundary vertices collinear with their cyclic neighbours
///
/// A lattice point sitting in the interior of a hull edge can survive
/// triangulation as a corner of coplanar slivers; after stitching it shows
/// up as a straight-angle vertex on the merged boundary. Such a point is
/// not an extreme point of the hull and must not reach the mesh. Repeats
/// until stable so straight runs of several points collapse fully.
fn drop_collinear(vertices: &[Vertex], mut cycle: Vec<usize>) -> Result<Vec<usize>> {
    loop {
        let n = cycle.len();
        if n < 3 {
            return Err(WatermanError::TopologyError(
                "merged face boundary collapsed to a line".to_string(),
            ));
        }

        let mut keep = Vec::with_capacity(n);
        for i in 0..n {
            let u = &vertices[cycle[(i + n - 1) % n]];
            let v = &vertices[cycle[i]];
            let w = &vertices[cycle[(i + 1) % n]];

            let e1 = v.sub(u);
            let e2 = w.sub(v);
            let straight =
                e1.cross(&e2).magnitude() <= EPSILON_COLLINEAR * e1.magnitude() * e2.magnitude();
            if !straight {
                keep.push(cycle[i]);
            }
        }

        if keep.len() == n {
            return Ok(cycle);
        }
        cycle = keep;
    }
}

fn find(parent: &mut [usize], x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    // path compression
    let mut cursor = x;
    while parent[cursor] != root {
        let up = parent[cursor];
        parent[cursor] = root;
        cursor = up;
    }
    root
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // smaller root wins, keeping group identity tied to first face
        if ra < rb {
            parent[rb] = ra;
        } else {
            parent[ra] = rb;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata;
    use crate::types::ConvexHull3D;

    fn hull_polygons(vertices: &[Vertex]) -> (ConvexHull3D, Vec<Polygon>) {
        let hull = ConvexHull3D::build(vertices).unwrap();
        let polygons = hull.faces().iter().map(|&f| Polygon::from(f)).collect();
        (hull, polygons)
    }

    #[test]
    fn test_cube_merges_to_six_quads() {
        let (hull, triangles) = hull_polygons(&testdata::cube_vertices(2.0));
        assert_eq!(triangles.len(), 12);

        let merged = merge_coplanar_faces(hull.vertices(), &triangles).unwrap();
        assert_eq!(merged.len(), 6);
        for face in &merged {
            assert_eq!(face.len(), 4);
        }
    }

    #[test]
    fn test_octahedron_is_a_fixed_point() {
        let (hull, triangles) = hull_polygons(&testdata::octahedron_vertices());
        let merged = merge_coplanar_faces(hull.vertices(), &triangles).unwrap();
        assert_eq!(merged, triangles);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (hull, triangles) = hull_polygons(&testdata::cuboctahedron_vertices());
        let merged = merge_coplanar_faces(hull.vertices(), &triangles).unwrap();
        let merged_again = merge_coplanar_faces(hull.vertices(), &merged).unwrap();
        assert_eq!(merged, merged_again);
    }

    #[test]
    fn test_merged_winding_is_preserved() {
        let (hull, triangles) = hull_polygons(&testdata::cube_vertices(2.0));
        let merged = merge_coplanar_faces(hull.vertices(), &triangles).unwrap();

        // Newell normal of every merged face must still point away from
        // the cube center (the origin)
        for face in &merged {
            let plane = Plane::from_polygon(hull.vertices(), face.indices()).unwrap();
            assert!(plane.offset > 0.0, "face winding flipped: {face:?}");
        }
    }

    #[test]
    fn test_edge_midpoint_vertex_is_dropped() {
        // square pyramid whose base edge carries a midpoint vertex: the
        // midpoint is collinear on every boundary it appears on and must
        // not survive merging
        let vertices = vec![
            Vertex::new(-1.0, -1.0, 0.0), // 0
            Vertex::new(1.0, -1.0, 0.0),  // 1
            Vertex::new(1.0, 1.0, 0.0),   // 2
            Vertex::new(-1.0, 1.0, 0.0),  // 3
            Vertex::new(0.0, 0.0, 2.0),   // 4 apex
            Vertex::new(0.0, -1.0, 0.0),  // 5 midpoint of edge 0-1
        ];
        let faces = vec![
            Polygon::new(vec![3, 2, 1]),
            Polygon::new(vec![3, 1, 5]),
            Polygon::new(vec![3, 5, 0]),
            Polygon::new(vec![0, 5, 4]),
            Polygon::new(vec![5, 1, 4]),
            Polygon::new(vec![1, 2, 4]),
            Polygon::new(vec![2, 3, 4]),
            Polygon::new(vec![3, 0, 4]),
        ];

        let merged = merge_coplanar_faces(&vertices, &faces).unwrap();
        assert_eq!(merged.len(), 5);
        for face in &merged {
            assert!(
                !face.indices().contains(&5),
                "midpoint survived merging: {face:?}"
            );
        }
    }

    #[test]
    fn test_open_surface_is_rejected() {
        // one lonely triangle: every edge borders a single face
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![Polygon::new(vec![0, 1, 2])];

        let result = merge_coplanar_faces(&vertices, &faces);
        assert!(matches!(result, Err(WatermanError::TopologyError(_))));
    }

    #[test]
    fn test_inconsistent_orientation_is_rejected() {
        // two triangles sharing edge (1, 2) traversed the same way
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(1.0, 1.0, 1.0),
        ];
        let faces = vec![Polygon::new(vec![0, 1, 2]), Polygon::new(vec![3, 1, 2])];

        let result = merge_coplanar_faces(&vertices, &faces);
        assert!(matches!(result, Err(WatermanError::TopologyError(_))));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(merge_coplanar_faces(&[], &[]).unwrap(), Vec::<Polygon>::new());
    }
}
