//! Reference point sets for tests
//!
//! Small closed-form polyhedra with known hull/merge outcomes, plus random
//! clouds for robustness tests.

use crate::types::Vertex;
use rand::Rng;

/// Generate a cube's vertices
pub fn cube_vertices(size: f64) -> Vec<Vertex> {
    let s = size / 2.0;
    vec![
        Vertex::new(-s, -s, -s),
        Vertex::new(s, -s, -s),
        Vertex::new(s, s, -s),
        Vertex::new(-s, s, -s),
        Vertex::new(-s, -s, s),
        Vertex::new(s, -s, s),
        Vertex::new(s, s, s),
        Vertex::new(-s, s, s),
    ]
}

/// Generate vertices for a regular octahedron
pub fn octahedron_vertices() -> Vec<Vertex> {
    vec![
        Vertex::new(1.0, 0.0, 0.0),
        Vertex::new(-1.0, 0.0, 0.0),
        Vertex::new(0.0, 1.0, 0.0),
        Vertex::new(0.0, -1.0, 0.0),
        Vertex::new(0.0, 0.0, 1.0),
        Vertex::new(0.0, 0.0, -1.0),
    ]
}

/// Generate vertices for a cuboctahedron (the 12 fcc nearest neighbours)
pub fn cuboctahedron_vertices() -> Vec<Vertex> {
    vec![
        Vertex::new(1.0, 1.0, 0.0),
        Vertex::new(1.0, -1.0, 0.0),
        Vertex::new(-1.0, 1.0, 0.0),
        Vertex::new(-1.0, -1.0, 0.0),
        Vertex::new(1.0, 0.0, 1.0),
        Vertex::new(1.0, 0.0, -1.0),
        Vertex::new(-1.0, 0.0, 1.0),
        Vertex::new(-1.0, 0.0, -1.0),
        Vertex::new(0.0, 1.0, 1.0),
        Vertex::new(0.0, 1.0, -1.0),
        Vertex::new(0.0, -1.0, 1.0),
        Vertex::new(0.0, -1.0, -1.0),
    ]
}

/// Generate a simple tetrahedron
pub fn tetrahedron_vertices() -> Vec<Vertex> {
    vec![
        Vertex::new(0.0, 0.0, 0.0),
        Vertex::new(1.0, 0.0, 0.0),
        Vertex::new(0.5, (3.0_f64).sqrt() / 2.0, 0.0),
        Vertex::new(0.5, (3.0_f64).sqrt() / 6.0, (2.0 / 3.0_f64).sqrt()),
    ]
}

/// Generate vertices for an icosahedron
pub fn icosahedron_vertices() -> Vec<Vertex> {
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0; // Golden ratio

    vec![
        Vertex::new(-1.0, phi, 0.0),
        Vertex::new(1.0, phi, 0.0),
        Vertex::new(-1.0, -phi, 0.0),
        Vertex::new(1.0, -phi, 0.0),
        Vertex::new(0.0, -1.0, phi),
        Vertex::new(0.0, 1.0, phi),
        Vertex::new(0.0, -1.0, -phi),
        Vertex::new(0.0, 1.0, -phi),
        Vertex::new(phi, 0.0, -1.0),
        Vertex::new(phi, 0.0, 1.0),
        Vertex::new(-phi, 0.0, -1.0),
        Vertex::new(-phi, 0.0, 1.0),
    ]
}

/// Generate random points on a sphere (with some radial jitter)
pub fn random_sphere_points(n: usize, radius: f64) -> Vec<Vertex> {
    let mut rng = rand::rng();
    let mut vertices = Vec::with_capacity(n);

    for _ in 0..n {
        let azimuth = rng.random::<f64>() * 2.0 * std::f64::consts::PI;
        let elevation = (rng.random::<f64>() * 2.0 - 1.0).asin();
        let r = radius * (0.9 + 0.2 * rng.random::<f64>());

        vertices.push(Vertex::new(
            r * elevation.cos() * azimuth.cos(),
            r * elevation.cos() * azimuth.sin(),
            r * elevation.sin(),
        ));
    }

    vertices
}

/// A cube plus random interior points (interior points never reach the hull)
pub fn cube_with_interior_points(size: f64, n_interior: usize) -> Vec<Vertex> {
    let mut vertices = cube_vertices(size);
    let mut rng = rand::rng();
    let s = size / 2.0;

    for _ in 0..n_interior {
        let x = rng.random::<f64>() * size - s;
        let y = rng.random::<f64>() * size - s;
        let z = rng.random::<f64>() * size - s;
        vertices.push(Vertex::new(x, y, z));
    }

    vertices
}
