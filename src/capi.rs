//! C ABI for the Waterman mesh pipeline
//!
//! Thin marshalling layer over [`compute_mesh`](crate::compute_mesh):
//! buffers are handed to the caller as heap allocations owned by this
//! library, and must be released through the matching `*_free` function
//! with the lengths the caller received. Geometry errors never cross the
//! boundary; they collapse to a null pointer (`waterman_mesh`) or a
//! `false` return (`waterman_poly`) and are logged on the Rust side.

use crate::compute_mesh;
use core::ffi::{c_double, c_int};
use std::ptr;

/// A mesh in C layout: `faces` holds `[size, idx...]` runs (`n_faces`
/// total entries), `coords` holds x,y,z interleaved (`n_coords` doubles).
#[repr(C)]
pub struct RawMesh {
    pub n_faces: c_int,
    pub n_coords: c_int,
    pub faces: *mut c_int,
    pub coords: *mut c_double,
}

/// Compute the Waterman polyhedron mesh for `radius`.
///
/// Returns a heap-allocated [`RawMesh`], or null if the radius is
/// degenerate or hull construction fails. Release with
/// [`waterman_mesh_free`].
#[unsafe(no_mangle)]
pub extern "C" fn waterman_mesh(radius: c_double) -> *mut RawMesh {
    match compute_mesh(radius) {
        Ok(mesh) => {
            let (coords, faces) = mesh.into_buffers();
            let raw = RawMesh {
                n_faces: faces.len() as c_int,
                n_coords: coords.len() as c_int,
                faces: Box::leak(faces.into_boxed_slice()).as_mut_ptr(),
                coords: Box::leak(coords.into_boxed_slice()).as_mut_ptr(),
            };
            Box::into_raw(Box::new(raw))
        }
        Err(err) => {
            log::warn!("waterman_mesh({radius}): {err}");
            ptr::null_mut()
        }
    }
}

/// Release a mesh obtained from [`waterman_mesh`]. Null is a no-op.
///
/// # Safety
///
/// `mesh` must be a pointer returned by [`waterman_mesh`] that has not
/// been freed already, with its fields unmodified.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn waterman_mesh_free(mesh: *mut RawMesh) {
    if mesh.is_null() {
        return;
    }
    unsafe {
        let raw = Box::from_raw(mesh);
        free_buffers(raw.faces, raw.n_faces, raw.coords, raw.n_coords);
    }
}

/// Compute the mesh for `radius`, writing the buffers to out-parameters.
///
/// On success writes the face buffer length, coordinate count and buffer
/// pointers, and returns `true`. On failure writes zero lengths and null
/// pointers and returns `false`. Release with [`waterman_poly_free`].
///
/// # Safety
///
/// All four out-pointers must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn waterman_poly(
    radius: c_double,
    n_faces: *mut c_int,
    n_coords: *mut c_int,
    faces: *mut *mut c_int,
    coords: *mut *mut c_double,
) -> bool {
    if n_faces.is_null() || n_coords.is_null() || faces.is_null() || coords.is_null() {
        return false;
    }

    match compute_mesh(radius) {
        Ok(mesh) => {
            let (coord_buf, face_buf) = mesh.into_buffers();
            unsafe {
                *n_faces = face_buf.len() as c_int;
                *n_coords = coord_buf.len() as c_int;
                *faces = Box::leak(face_buf.into_boxed_slice()).as_mut_ptr();
                *coords = Box::leak(coord_buf.into_boxed_slice()).as_mut_ptr();
            }
            true
        }
        Err(err) => {
            log::warn!("waterman_poly({radius}): {err}");
            unsafe {
                *n_faces = 0;
                *n_coords = 0;
                *faces = ptr::null_mut();
                *coords = ptr::null_mut();
            }
            false
        }
    }
}

/// Release buffers obtained from [`waterman_poly`]. Null buffers are a
/// no-op.
///
/// # Safety
///
/// The pointers and lengths must be exactly the values written by a
/// single successful [`waterman_poly`] call, freed at most once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn waterman_poly_free(
    faces: *mut c_int,
    n_faces: c_int,
    coords: *mut c_double,
    n_coords: c_int,
) {
    unsafe {
        free_buffers(faces, n_faces, coords, n_coords);
    }
}

unsafe fn free_buffers(faces: *mut c_int, n_faces: c_int, coords: *mut c_double, n_coords: c_int) {
    unsafe {
        if !faces.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                faces,
                n_faces as usize,
            )));
        }
        if !coords.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                coords,
                n_coords as usize,
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_matches_rust_api() {
        let expected = compute_mesh(2.0).unwrap();

        let raw = waterman_mesh(2.0);
        assert!(!raw.is_null());

        unsafe {
            let mesh = &*raw;
            assert_eq!(mesh.n_faces as usize, expected.face_data().len());
            assert_eq!(mesh.n_coords as usize, expected.vertex_coords().len());

            let faces = std::slice::from_raw_parts(mesh.faces, mesh.n_faces as usize);
            let coords = std::slice::from_raw_parts(mesh.coords, mesh.n_coords as usize);
            assert_eq!(faces, expected.face_data());
            assert_eq!(coords, expected.vertex_coords());

            waterman_mesh_free(raw);
        }
    }

    #[test]
    fn test_mesh_null_on_degenerate_radius() {
        assert!(waterman_mesh(0.5).is_null());
        assert!(waterman_mesh(-1.0).is_null());
    }

    #[test]
    fn test_poly_out_params() {
        let mut n_faces: c_int = -1;
        let mut n_coords: c_int = -1;
        let mut faces: *mut c_int = ptr::null_mut();
        let mut coords: *mut c_double = ptr::null_mut();

        let ok = unsafe {
            waterman_poly(
                2.0,
                &mut n_faces,
                &mut n_coords,
                &mut faces,
                &mut coords,
            )
        };
        assert!(ok);
        // octahedron: 8 triangles -> 8 * 4 buffer entries, 6 vertices
        assert_eq!(n_faces, 32);
        assert_eq!(n_coords, 18);
        assert!(!faces.is_null());
        assert!(!coords.is_null());

        unsafe { waterman_poly_free(faces, n_faces, coords, n_coords) };
    }

    #[test]
    fn test_poly_failure_zeroes_out_params() {
        let mut n_faces: c_int = -1;
        let mut n_coords: c_int = -1;
        let mut faces: *mut c_int = ptr::null_mut();
        let mut coords: *mut c_double = ptr::null_mut();

        let ok = unsafe {
            waterman_poly(
                0.1,
                &mut n_faces,
                &mut n_coords,
                &mut faces,
                &mut coords,
            )
        };
        assert!(!ok);
        assert_eq!(n_faces, 0);
        assert_eq!(n_coords, 0);
        assert!(faces.is_null());
        assert!(coords.is_null());

        unsafe { waterman_poly_free(faces, n_faces, coords, n_coords) };
    }
}
