//! # Frustum Module
//!
//! View-frustum planes extracted from a view-projection matrix, and a
//! conservative box test used to skip chunks that cannot be on screen.

use cgmath::{Matrix4, Vector3, Vector4};

/// Six clip planes `(nx, ny, nz, d)`; a point is inside when
/// `nx * x + ny * y + nz * z + d >= 0` for every plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Vector4<f32>; 6],
}

impl Frustum {
    /// Extracts the planes of `view_projection` (Gribb-Hartmann).
    ///
    /// The near plane uses the `-w <= z` clip range, which is never tighter
    /// than wgpu's `0 <= z`, so nothing visible gets culled.
    pub fn from_view_projection(view_projection: Matrix4<f32>) -> Self {
        let m = view_projection;
        let row = |i: usize| Vector4::new(m[0][i], m[1][i], m[2][i], m[3][i]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Frustum {
            planes: [
                r3 + r0, // left
                r3 - r0, // right
                r3 + r1, // bottom
                r3 - r1, // top
                r3 + r2, // near
                r3 - r2, // far
            ],
        }
    }

    /// A frustum that contains everything.
    pub fn everything() -> Self {
        Frustum {
            planes: [Vector4::new(0.0, 0.0, 0.0, 1.0); 6],
        }
    }

    /// Whether any part of the box `min..max` may be inside the frustum.
    ///
    /// Tests the corner furthest along each plane normal. Boxes straddling
    /// a frustum corner can pass even if they are outside; that only costs a
    /// wasted draw.
    pub fn intersects_aabb(&self, min: Vector3<f32>, max: Vector3<f32>) -> bool {
        self.planes.iter().all(|plane| {
            let px = if plane.x >= 0.0 { max.x } else { min.x };
            let py = if plane.y >= 0.0 { max.y } else { min.y };
            let pz = if plane.z >= 0.0 { max.z } else { min.z };
            plane.x * px + plane.y * py + plane.z * pz + plane.w >= 0.0
        })
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::everything()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{ortho, perspective, Deg, Point3};

    use super::*;

    fn unit_box(x: f32, y: f32, z: f32, size: f32) -> (Vector3<f32>, Vector3<f32>) {
        (
            Vector3::new(x, y, z),
            Vector3::new(x + size, y + size, z + size),
        )
    }

    #[test]
    fn orthographic_culls_boxes_beside_the_view() {
        let frustum = Frustum::from_view_projection(ortho(0.0, 16.0, 0.0, 16.0, -100.0, 100.0));
        let (min, max) = unit_box(0.0, 0.0, 0.0, 16.0);
        assert!(frustum.intersects_aabb(min, max));
        let (min, max) = unit_box(32.0, 0.0, 0.0, 16.0);
        assert!(!frustum.intersects_aabb(min, max));
        let (min, max) = unit_box(0.0, -48.0, 0.0, 16.0);
        assert!(!frustum.intersects_aabb(min, max));
    }

    #[test]
    fn perspective_culls_boxes_behind_the_camera() {
        let projection = perspective(Deg(60.0), 1.0, 0.1, 500.0);
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        let frustum = Frustum::from_view_projection(projection * view);

        let (min, max) = unit_box(-8.0, -8.0, -40.0, 16.0);
        assert!(frustum.intersects_aabb(min, max));
        let (min, max) = unit_box(-8.0, -8.0, 40.0, 16.0);
        assert!(!frustum.intersects_aabb(min, max));
        let (min, max) = unit_box(-8.0, -8.0, -1000.0, 16.0);
        assert!(!frustum.intersects_aabb(min, max));
    }

    #[test]
    fn everything_accepts_any_box() {
        let (min, max) = unit_box(1.0e6, -1.0e6, 3.0, 1.0);
        assert!(Frustum::everything().intersects_aabb(min, max));
    }
}
