//! Candidate point generation for Waterman polyhedra
//!
//! The generating lattice is the face-centered-cubic family: integer
//! triples (x, y, z) with x + y + z even. A candidate set for radius r is
//! every such lattice point whose distance to the sphere center is at most
//! r, emitted relative to the center in ascending (x, y, z) scan order, so
//! identical inputs always yield the identical sequence.
//!
//! The classic Waterman roots map onto this rule as radius = sqrt(2·root):
//! root 1 is the cuboctahedron, root 2 the octahedron, root 10 the
//! truncated octahedron. Off-lattice centers select the other Waterman
//! origin families (a center on the all-even sublattice yields the cube).

use crate::types::Vertex;
use crate::{Result, WatermanError};

/// Sphere-inclusion slack relative to r², so radii like √6 whose square
/// rounds just below the integer shell still pick the shell up.
const RADIUS_SLACK: f64 = 1e-9;

/// Generate the candidate set for a sphere of `radius` centered on the
/// lattice origin.
pub fn waterman_points(radius: f64) -> Result<Vec<Vertex>> {
    waterman_points_centered(radius, Vertex::new(0.0, 0.0, 0.0))
}

/// Generate the candidate set for a sphere of `radius` centered on an
/// arbitrary point, with output coordinates relative to that center.
pub fn waterman_points_centered(radius: f64, center: Vertex) -> Result<Vec<Vertex>> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(WatermanError::DegenerateInput(format!(
            "radius {radius} is not a positive finite number"
        )));
    }

    let r2 = radius * radius * (1.0 + RADIUS_SLACK);

    let x_range = axis_range(center.x, radius);
    let y_range = axis_range(center.y, radius);
    let z_range = axis_range(center.z, radius);

    let mut points = Vec::new();
    for x in x_range.clone() {
        for y in y_range.clone() {
            for z in z_range.clone() {
                if (x + y + z) & 1 != 0 {
                    continue;
                }
                let dx = x as f64 - center.x;
                let dy = y as f64 - center.y;
                let dz = z as f64 - center.z;
                if dx * dx + dy * dy + dz * dz <= r2 {
                    points.push(Vertex::new(dx, dy, dz));
                }
            }
        }
    }

    log::debug!(
        "radius {radius}: {} candidate lattice points",
        points.len()
    );

    if points.len() < 4 {
        return Err(WatermanError::DegenerateInput(format!(
            "radius {radius} yields only {} lattice points, need at least 4 to span a solid",
            points.len()
        )));
    }

    Ok(points)
}

/// Integer lattice coordinates intersecting `[c - r, c + r]` on one axis
fn axis_range(c: f64, r: f64) -> std::ops::RangeInclusive<i64> {
    ((c - r).ceil() as i64)..=((c + r).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_one_is_origin_plus_twelve() {
        // norm² ≤ 2, even parity: the origin and the 12 fcc neighbours
        let points = waterman_points(2.0_f64.sqrt()).unwrap();
        assert_eq!(points.len(), 13);
        assert!(points.contains(&Vertex::new(0.0, 0.0, 0.0)));
        assert!(points.contains(&Vertex::new(-1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_root_two_point_count() {
        // shells norm² ∈ {0, 2, 4}: 1 + 12 + 6 points
        let points = waterman_points(2.0).unwrap();
        assert_eq!(points.len(), 19);
    }

    #[test]
    fn test_parity_and_radius_honored() {
        let radius = 4.3;
        for p in waterman_points(radius).unwrap() {
            let (x, y, z) = (p.x as i64, p.y as i64, p.z as i64);
            assert_eq!(x as f64, p.x);
            assert_eq!(y as f64, p.y);
            assert_eq!(z as f64, p.z);
            assert_eq!((x + y + z) & 1, 0, "odd-parity point {p} generated");
            assert!(p.magnitude() <= radius + 1e-9);
        }
    }

    #[test]
    fn test_boundary_shell_included() {
        // r = √6 squares to slightly below 6.0; the 24-point shell must
        // survive the float rounding
        let points = waterman_points(6.0_f64.sqrt()).unwrap();
        assert!(points.contains(&Vertex::new(2.0, 1.0, 1.0)));
        assert_eq!(points.len(), 1 + 12 + 6 + 24);
    }

    #[test]
    fn test_deterministic_order() {
        let a = waterman_points(5.7).unwrap();
        let b = waterman_points(5.7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_centered_cube_candidates() {
        // center on the all-even sublattice: 8 cube corners + 6 face centers
        let points = waterman_points_centered(3.0_f64.sqrt(), Vertex::new(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(points.len(), 14);
        assert!(points.contains(&Vertex::new(-1.0, -1.0, -1.0)));
        assert!(points.contains(&Vertex::new(1.0, 1.0, 1.0)));
        assert!(points.contains(&Vertex::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_degenerate_radii_rejected() {
        for radius in [0.0, -2.0, 0.9, f64::NAN, f64::INFINITY] {
            let result = waterman_points(radius);
            assert!(
                matches!(result, Err(WatermanError::DegenerateInput(_))),
                "radius {radius} should be degenerate"
            );
        }
    }
}
