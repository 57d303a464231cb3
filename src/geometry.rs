//! Geometric predicates shared by the hull builder, face merger and
//! manifold checks
//!
//! Point-vs-plane classification is the most error-prone operation in the
//! whole pipeline, so it lives behind a single `Plane` type with one
//! tolerance convention: a point is *above* a plane only when its signed
//! distance exceeds the given epsilon; anything within epsilon is coplanar.

use crate::types::Vertex;

/// An oriented plane in Hessian normal form (`normal · p == offset`)
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub normal: Vertex,
    pub offset: f64,
}

impl Plane {
    /// Plane through three points, normal following right-hand winding.
    /// `None` when the points are collinear within working precision.
    pub fn from_triangle(p0: &Vertex, p1: &Vertex, p2: &Vertex) -> Option<Plane> {
        let normal = p1.sub(p0).cross(&p2.sub(p0)).try_normalize()?;
        Some(Plane {
            normal,
            offset: normal.dot(p0),
        })
    }

    /// Best-fit plane of a planar polygon via Newell's method.
    /// `None` for degenerate (zero-area) polygons.
    pub fn from_polygon(vertices: &[Vertex], indices: &[usize]) -> Option<Plane> {
        let n = indices.len();
        if n < 3 {
            return None;
        }

        let mut normal = Vertex::new(0.0, 0.0, 0.0);
        for i in 0..n {
            let a = &vertices[indices[i]];
            let b = &vertices[indices[(i + 1) % n]];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }

        let normal = normal.try_normalize()?;
        Some(Plane {
            normal,
            offset: normal.dot(&vertices[indices[0]]),
        })
    }

    /// Signed distance from a point to the plane (positive = above)
    #[inline]
    pub fn signed_distance(&self, point: &Vertex) -> f64 {
        self.normal.dot(point) - self.offset
    }

    /// Whether a point lies strictly above the plane under tolerance `epsilon`
    #[inline]
    pub fn is_above(&self, point: &Vertex, epsilon: f64) -> bool {
        self.signed_distance(point) > epsilon
    }

    /// Flip the plane orientation in place
    pub fn flip(&mut self) {
        self.normal = self.normal.scale(-1.0);
        self.offset = -self.offset;
    }
}

/// Compute the volume of a tetrahedron formed by 4 points
pub fn tetrahedron_volume(p0: &Vertex, p1: &Vertex, p2: &Vertex, p3: &Vertex) -> f64 {
    let v1 = p1.sub(p0);
    let v2 = p2.sub(p0);
    let v3 = p3.sub(p0);

    v1.dot(&v2.cross(&v3)).abs() / 6.0
}

/// Check if 4 points are coplanar
pub fn are_coplanar(p0: &Vertex, p1: &Vertex, p2: &Vertex, p3: &Vertex, epsilon: f64) -> bool {
    tetrahedron_volume(p0, p1, p2, p3) < epsilon
}

/// Find the extreme points (min/max in each dimension)
pub fn find_extreme_points(vertices: &[Vertex]) -> [usize; 6] {
    let mut min_x_idx = 0;
    let mut max_x_idx = 0;
    let mut min_y_idx = 0;
    let mut max_y_idx = 0;
    let mut min_z_idx = 0;
    let mut max_z_idx = 0;

    for (i, v) in vertices.iter().enumerate() {
        if v.x < vertices[min_x_idx].x {
            min_x_idx = i;
        }
        if v.x > vertices[max_x_idx].x {
            max_x_idx = i;
        }
        if v.y < vertices[min_y_idx].y {
            min_y_idx = i;
        }
        if v.y > vertices[max_y_idx].y {
            max_y_idx = i;
        }
        if v.z < vertices[min_z_idx].z {
            min_z_idx = i;
        }
        if v.z > vertices[max_z_idx].z {
            max_z_idx = i;
        }
    }

    [
        min_x_idx, max_x_idx, min_y_idx, max_y_idx, min_z_idx, max_z_idx,
    ]
}
