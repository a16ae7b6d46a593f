use glam::{Mat4, Vec3};

use crate::geom::Frustum;

pub const MIN_RADIUS: f32 = 15.0;
pub const MAX_RADIUS: f32 = 120.0;
pub const BASE_RADIUS: f32 = 55.0;
const MIN_PHI: f32 = 0.2;
const FOV_Y_DEG: f32 = 50.0;
const NEAR: f32 = 0.1;
const FAR: f32 = 500.0;

const DRAG_SENSITIVITY_MOUSE: f32 = 0.005;
const DRAG_SENSITIVITY_TOUCH: f32 = 0.008;
const WHEEL_SENSITIVITY: f32 = 0.04;
const AUTO_ROTATE_SPEED: f32 = 0.02;
const AUTO_ROTATE_RESUME_DELAY: f32 = 3.0;
const SPHERICAL_LERP: f32 = 0.12;
const ORBIT_TARGET_LERP: f32 = 0.09;

const EPS_ANGLE: f32 = 1e-4;
const EPS_RADIUS: f32 = 1e-3;
const EPS_TARGET: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub theta: f32,
    pub phi: f32,
    pub radius: f32,
}

impl Default for Spherical {
    fn default() -> Self {
        Self {
            theta: std::f32::consts::PI * 0.35,
            phi: std::f32::consts::PI * 0.30,
            radius: BASE_RADIUS,
        }
    }
}

/// Spherical-orbit camera. Current values chase targets by a fixed fraction
/// each tick; they are only ever set directly on hard resets.
#[derive(Debug, Clone)]
pub struct CameraRig {
    pub spherical: Spherical,
    pub target_spherical: Spherical,
    pub orbit_target: Vec3,
    pub target_orbit_target: Vec3,
    pub auto_rotate: bool,
    resume_at: Option<f32>,
    width: f32,
    height: f32,
}

impl CameraRig {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            spherical: Spherical::default(),
            target_spherical: Spherical::default(),
            orbit_target: Vec3::ZERO,
            target_orbit_target: Vec3::ZERO,
            auto_rotate: true,
            resume_at: None,
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width.max(1.0);
        self.height = height.max(1.0);
    }

    pub fn viewport(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    // ----- input mapping -----

    pub fn apply_drag(&mut self, dx: f32, dy: f32, touch: bool) {
        let s = if touch {
            DRAG_SENSITIVITY_TOUCH
        } else {
            DRAG_SENSITIVITY_MOUSE
        };
        self.target_spherical.theta -= dx * s;
        self.target_spherical.phi = (self.target_spherical.phi + dy * s)
            .clamp(MIN_PHI, std::f32::consts::PI - MIN_PHI);
    }

    pub fn apply_wheel(&mut self, delta_y: f32) {
        self.target_spherical.radius =
            (self.target_spherical.radius + delta_y * WHEEL_SENSITIVITY).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    pub fn apply_pinch(&mut self, start_radius: f32, scale: f32) {
        self.target_spherical.radius = (start_radius * scale).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    pub fn focus(&mut self, position: Vec3, zoom: f32) {
        self.target_orbit_target = position;
        if zoom > 0.0 {
            self.target_spherical.radius = (BASE_RADIUS / zoom).clamp(MIN_RADIUS, MAX_RADIUS);
        }
    }

    // ----- auto-rotation -----

    pub fn stop_auto_rotate(&mut self) {
        self.auto_rotate = false;
        self.resume_at = None;
    }

    /// Arm (or re-arm) the resume deadline. Always replaces a pending one —
    /// deadlines never stack.
    pub fn schedule_auto_rotate_resume(&mut self, now: f32) {
        self.resume_at = Some(now + AUTO_ROTATE_RESUME_DELAY);
    }

    pub fn cancel_auto_rotate_resume(&mut self) {
        self.resume_at = None;
    }

    /// Returns true when auto-rotation resumed this tick (the caller marks
    /// dirty). `idle` means: no drag, no hover, no selection, no flythrough.
    pub fn maybe_resume_auto_rotate(&mut self, now: f32, idle: bool) -> bool {
        if let Some(at) = self.resume_at {
            if now >= at {
                self.resume_at = None;
                if idle {
                    self.auto_rotate = true;
                    return true;
                }
            }
        }
        false
    }

    /// One tick: idle rotation, then fixed-fraction convergence toward
    /// targets. Not physically simulated — fraction-per-tick on purpose.
    pub fn tick(&mut self, dt: f32, auto_rotating: bool) {
        if auto_rotating {
            // Both current and target advance so convergence is unaffected.
            self.target_spherical.theta += AUTO_ROTATE_SPEED * dt;
            self.spherical.theta += AUTO_ROTATE_SPEED * dt;
        }
        self.spherical.theta +=
            (self.target_spherical.theta - self.spherical.theta) * SPHERICAL_LERP;
        self.spherical.phi += (self.target_spherical.phi - self.spherical.phi) * SPHERICAL_LERP;
        self.spherical.radius +=
            (self.target_spherical.radius - self.spherical.radius) * SPHERICAL_LERP;
        self.orbit_target = self
            .orbit_target
            .lerp(self.target_orbit_target, ORBIT_TARGET_LERP);
    }

    pub fn converged(&self) -> bool {
        (self.target_spherical.theta - self.spherical.theta).abs() < EPS_ANGLE
            && (self.target_spherical.phi - self.spherical.phi).abs() < EPS_ANGLE
            && (self.target_spherical.radius - self.spherical.radius).abs() < EPS_RADIUS
            && self.orbit_target.distance(self.target_orbit_target) < EPS_TARGET
    }

    /// Hard reset of current values onto targets (view reset / panel close).
    pub fn snap_to_targets(&mut self) {
        self.spherical = self.target_spherical;
        self.orbit_target = self.target_orbit_target;
    }

    // ----- derived pose / projection -----

    pub fn position(&self) -> Vec3 {
        let s = &self.spherical;
        Vec3::new(
            s.radius * s.phi.sin() * s.theta.sin() + self.orbit_target.x,
            s.radius * s.phi.cos() + self.orbit_target.y,
            s.radius * s.phi.sin() * s.theta.cos() + self.orbit_target.z,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(
            FOV_Y_DEG.to_radians(),
            self.width / self.height,
            NEAR,
            FAR,
        );
        let view = Mat4::look_at_rh(self.position(), self.orbit_target, Vec3::Y);
        proj * view
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }

    /// World point → screen pixels (origin top-left). None when the point is
    /// behind the camera.
    pub fn project_to_screen(&self, pos: Vec3) -> Option<(f32, f32)> {
        let clip = self.view_projection() * pos.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip / clip.w;
        Some((
            (ndc.x * 0.5 + 0.5) * self.width,
            (-ndc.y * 0.5 + 0.5) * self.height,
        ))
    }

    /// Screen pixels → world-space ray (origin, normalized direction).
    pub fn screen_ray(&self, x: f32, y: f32) -> (Vec3, Vec3) {
        let ndc_x = (x / self.width) * 2.0 - 1.0;
        let ndc_y = -((y / self.height) * 2.0 - 1.0);
        let inv = self.view_projection().inverse();
        let near = inv.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        (near, (far - near).normalize_or_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_clamps_phi_and_wheel_clamps_radius() {
        let mut rig = CameraRig::new(1280.0, 720.0);
        for _ in 0..10_000 {
            rig.apply_drag(0.0, 100.0, false);
        }
        assert!(rig.target_spherical.phi <= std::f32::consts::PI - MIN_PHI + 1e-6);
        for _ in 0..1_000 {
            rig.apply_wheel(500.0);
        }
        assert_eq!(rig.target_spherical.radius, MAX_RADIUS);
        for _ in 0..1_000 {
            rig.apply_wheel(-500.0);
        }
        assert_eq!(rig.target_spherical.radius, MIN_RADIUS);
    }

    #[test]
    fn tick_converges_toward_targets() {
        let mut rig = CameraRig::new(1280.0, 720.0);
        rig.target_spherical.theta += 1.0;
        rig.target_orbit_target = Vec3::new(10.0, 0.0, 0.0);
        assert!(!rig.converged());
        for _ in 0..300 {
            rig.tick(1.0 / 60.0, false);
        }
        assert!(rig.converged());
        assert!((rig.spherical.theta - rig.target_spherical.theta).abs() < 1e-3);
        assert!(rig.orbit_target.distance(rig.target_orbit_target) < 1e-2);
    }

    #[test]
    fn focus_zoom_divides_base_radius() {
        let mut rig = CameraRig::new(1280.0, 720.0);
        rig.focus(Vec3::new(1.0, 2.0, 3.0), 2.0);
        assert_eq!(rig.target_orbit_target, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(rig.target_spherical.radius, BASE_RADIUS / 2.0);
        // Extreme zoom still clamps.
        rig.focus(Vec3::ZERO, 100.0);
        assert_eq!(rig.target_spherical.radius, MIN_RADIUS);
    }

    #[test]
    fn auto_rotate_resume_honors_deadline_and_idleness() {
        let mut rig = CameraRig::new(1280.0, 720.0);
        rig.stop_auto_rotate();
        rig.schedule_auto_rotate_resume(10.0);
        assert!(!rig.maybe_resume_auto_rotate(11.0, true));
        assert!(!rig.auto_rotate);
        rig.schedule_auto_rotate_resume(11.0);
        // Deadline reached but not idle: consumed without resuming.
        assert!(!rig.maybe_resume_auto_rotate(14.5, false));
        assert!(!rig.auto_rotate);
        rig.schedule_auto_rotate_resume(15.0);
        assert!(rig.maybe_resume_auto_rotate(18.5, true));
        assert!(rig.auto_rotate);
    }

    #[test]
    fn renewed_interaction_replaces_pending_resume() {
        let mut rig = CameraRig::new(1280.0, 720.0);
        rig.stop_auto_rotate();
        rig.schedule_auto_rotate_resume(0.0);
        // New interaction re-arms the timer; the old deadline must not fire.
        rig.schedule_auto_rotate_resume(2.0);
        assert!(!rig.maybe_resume_auto_rotate(3.5, true));
        assert!(rig.maybe_resume_auto_rotate(5.1, true));
    }

    #[test]
    fn projection_roundtrips_through_screen_ray() {
        let rig = CameraRig::new(1280.0, 720.0);
        let world = Vec3::new(3.0, -2.0, 5.0);
        let (sx, sy) = rig.project_to_screen(world).expect("in front of camera");
        let (origin, dir) = rig.screen_ray(sx, sy);
        // The ray through the projected pixel passes (nearly) through the point.
        let t = (world - origin).dot(dir);
        let closest = origin + dir * t;
        assert!(closest.distance(world) < 0.05, "distance {}", closest.distance(world));
    }

    #[test]
    fn auto_rotation_advances_theta_without_breaking_convergence() {
        let mut rig = CameraRig::new(1280.0, 720.0);
        let before = rig.spherical.theta;
        for _ in 0..60 {
            rig.tick(1.0 / 60.0, true);
        }
        assert!(rig.spherical.theta > before);
        assert!(rig.converged());
    }
}
