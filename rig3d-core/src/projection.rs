//! Camera and projection utilities
use std::f32::consts::FRAC_PI_2;

use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: width as f32 / height.max(1) as f32,
            near: 0.1,
            far: 100.0,
            mode: ProjectionMode::Perspective,
        }
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a 3D point to 2D screen space
    ///
    /// Returns screen x, screen y and normalized depth in `[-1, 1]`, or
    /// `None` when the point is behind the camera or outside the frustum.
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        project_with(&(self.view_projection() * model_matrix), point, width, height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Project through a precomputed model-view-projection matrix
pub fn project_with(
    mvp: &Matrix4<f32>,
    point: &Point3<f32>,
    width: u32,
    height: u32,
) -> Option<(f32, f32, f32)> {
    let clip = mvp * point.to_homogeneous();

    // Behind the eye, or too close to divide safely
    if clip.w < 1e-6 {
        return None;
    }

    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let depth = clip.z / clip.w;

    // Clip test
    if !(-1.0..=1.0).contains(&ndc_x) || !(-1.0..=1.0).contains(&ndc_y) || !(-1.0..=1.0).contains(&depth) {
        return None;
    }

    Some(clip_to_screen(&clip, width, height))
}

/// Perspective divide and viewport mapping for a clip-space point with
/// positive `w`. Nothing is rejected: results may lie off screen.
pub fn clip_to_screen(clip: &Vector4<f32>, width: u32, height: u32) -> (f32, f32, f32) {
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
    let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;
    (screen_x, screen_y, clip.z / clip.w)
}

/// A camera controller that orbits around a target point.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Point the camera orbits around.
    pub target: Point3<f32>,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle in radians, measured from +Z towards +X.
    pub azimuth: f32,
    /// Vertical angle in radians, clamped short of the poles.
    pub elevation: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Point3::origin(),
            distance: 500.0,
            azimuth: 0.0,
            elevation: 0.3,
            fov: 40f32.to_radians(),
            near: 1.0,
            far: 10_000.0,
            min_distance: 10.0,
            max_distance: 5_000.0,
        }
    }
}

impl OrbitCamera {
    const ELEVATION_LIMIT: f32 = FRAC_PI_2 - 0.01;

    pub fn new() -> Self {
        Self::default()
    }

    /// Orbit that starts with the eye at `position`, looking at `target`
    pub fn looking_at(position: Point3<f32>, target: Point3<f32>) -> Self {
        let offset = position - target;
        let distance = offset.norm();
        let mut orbit = Self {
            target,
            ..Self::default()
        };
        if distance > f32::EPSILON {
            orbit.distance = distance.clamp(orbit.min_distance, orbit.max_distance);
            orbit.azimuth = offset.x.atan2(offset.z);
            orbit.elevation = (offset.y / distance)
                .clamp(-1.0, 1.0)
                .asin()
                .clamp(-Self::ELEVATION_LIMIT, Self::ELEVATION_LIMIT);
        }
        orbit
    }

    /// Set the field of view in degrees.
    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn orbit(&mut self, d_azimuth: f32, d_elevation: f32) {
        self.azimuth += d_azimuth;
        self.elevation = (self.elevation + d_elevation)
            .clamp(-Self::ELEVATION_LIMIT, Self::ELEVATION_LIMIT);
    }

    /// Scale the distance; factors below 1 move closer
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
    }

    pub fn position(&self) -> Point3<f32> {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        self.target + Vector3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.distance
    }

    /// Perspective camera for a viewport of the given aspect ratio
    pub fn camera(&self, aspect: f32) -> Camera {
        Camera {
            position: self.position(),
            target: self.target,
            up: Vector3::y(),
            fov: self.fov,
            aspect,
            near: self.near,
            far: self.far,
            mode: ProjectionMode::Perspective,
        }
    }
}
