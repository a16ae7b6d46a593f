use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

/// Analytic ray–sphere intersection. `dir` must be normalized. Returns the
/// nearest non-negative hit distance, or None when the ray misses (a ray
/// starting inside the sphere reports the exit distance).
pub fn ray_sphere_intersect(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t0 = -b - sqrt_disc;
    let t1 = -b + sqrt_disc;
    if t1 < 0.0 {
        return None;
    }
    Some(if t0 >= 0.0 { t0 } else { t1 })
}

/// Hermite smoothstep over t ∈ [0, 1].
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let len = v.xyz().length().max(1e-12);
        Self {
            normal: v.xyz() / len,
            d: v.w / len,
        }
    }

    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }
}

/// View frustum as six inward-facing planes, extracted from a
/// view-projection matrix (Gribb–Hartmann; glam's perspective uses 0..1
/// clip depth, so the near plane is row 2 alone).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);
        Self {
            planes: [
                Plane::from_vec4(r3 + r0), // left
                Plane::from_vec4(r3 - r0), // right
                Plane::from_vec4(r3 + r1), // bottom
                Plane::from_vec4(r3 - r1), // top
                Plane::from_vec4(r2),      // near
                Plane::from_vec4(r3 - r2), // far
            ],
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|pl| pl.signed_distance(p) >= 0.0)
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|pl| pl.signed_distance(center) >= -radius)
    }

    /// Conservative AABB test for octant pruning: never rejects a box that
    /// touches the frustum (may accept some that do not).
    pub fn intersects_aabb(&self, center: Vec3, half: Vec3) -> bool {
        self.planes.iter().all(|pl| {
            let r = half.x * pl.normal.x.abs()
                + half.y * pl.normal.y.abs()
                + half.z * pl.normal.z.abs();
            pl.signed_distance(center) >= -r
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_sphere_head_on() {
        let d = ray_sphere_intersect(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 10.0), 2.0);
        assert_eq!(d, Some(8.0));
    }

    #[test]
    fn ray_misses_offset_sphere() {
        let d = ray_sphere_intersect(Vec3::ZERO, Vec3::Z, Vec3::new(5.0, 0.0, 10.0), 2.0);
        assert!(d.is_none());
    }

    #[test]
    fn ray_behind_sphere_misses() {
        let d = ray_sphere_intersect(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, -10.0), 2.0);
        assert!(d.is_none());
    }

    #[test]
    fn origin_inside_sphere_reports_exit() {
        let d = ray_sphere_intersect(Vec3::ZERO, Vec3::Z, Vec3::ZERO, 3.0).expect("hit");
        assert!((d - 3.0).abs() < 1e-5);
    }

    #[test]
    fn smoothstep_ends_and_midpoint() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(smoothstep(-2.0), 0.0);
        assert_eq!(smoothstep(7.0), 1.0);
    }

    fn test_frustum() -> Frustum {
        // Camera at +Z looking down -Z at the origin.
        let proj = Mat4::perspective_rh(50f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 55.0), Vec3::ZERO, Vec3::Y);
        Frustum::from_view_projection(&(proj * view))
    }

    #[test]
    fn frustum_contains_look_target_not_behind() {
        let f = test_frustum();
        assert!(f.contains_point(Vec3::ZERO));
        assert!(f.contains_point(Vec3::new(5.0, 3.0, 10.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 80.0))); // behind the camera
        assert!(!f.contains_point(Vec3::new(300.0, 0.0, 0.0))); // far off to the side
    }

    #[test]
    fn frustum_sphere_is_conservative_superset_of_point() {
        let f = test_frustum();
        // A point just outside a side plane is still accepted as a sphere.
        let p = Vec3::new(26.0, 0.0, 0.0);
        if !f.contains_point(p) {
            assert!(f.intersects_sphere(p, 30.0));
        }
        assert!(f.intersects_aabb(Vec3::ZERO, Vec3::splat(10.0)));
        assert!(!f.intersects_aabb(Vec3::new(0.0, 0.0, 400.0), Vec3::splat(1.0)));
    }
}
