//! Segment alignment: place a canonical cylinder so it spans two endpoints.
//!
//! The canonical cylinder has its axis along [`CANONICAL_UP`] and is centered
//! on its local origin, with its "top" end at `+length / 2`.
use nalgebra::{Isometry3, Matrix4, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use thiserror::Error;
use tracing::debug;

/// Default axis of the canonical cylinder.
pub const CANONICAL_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// Rotation axis used when the segment is parallel to [`CANONICAL_UP`].
/// Must be orthogonal to it.
pub const FALLBACK_AXIS: Vector3<f32> = Vector3::new(1.0, 0.0, 0.0);

/// Minimum segment length, and the threshold below which the rotation axis
/// is treated as zero.
pub const EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AlignError {
    #[error("Degenerate segment: endpoints are {distance} apart, rotation axis is undefined")]
    DegenerateSegment { distance: f32 },
    #[error("Segment endpoint is not finite: ({x}, {y}, {z})")]
    NonFinitePoint { x: f32, y: f32, z: f32 },
}

/// An ordered pair of endpoints a cylinder must connect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub top: Point3<f32>,
    pub bottom: Point3<f32>,
}

impl Segment {
    pub fn new(top: Point3<f32>, bottom: Point3<f32>) -> Self {
        Self { top, bottom }
    }

    pub fn length(&self) -> f32 {
        nalgebra::distance(&self.top, &self.bottom)
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.top, &self.bottom)
    }

    /// Unnormalized direction from `bottom` towards `top`
    pub fn direction(&self) -> Vector3<f32> {
        self.top - self.bottom
    }

    pub fn reversed(&self) -> Self {
        Self {
            top: self.bottom,
            bottom: self.top,
        }
    }

    pub fn align(&self) -> Result<SegmentTransform, AlignError> {
        align(self.top, self.bottom)
    }
}

/// Rigid placement of a canonical cylinder: translate to the segment center,
/// then rotate in the cylinder's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTransform {
    pub rotation: UnitQuaternion<f32>,
    pub translation: Translation3<f32>,
    /// Distance between the two endpoints; the height the cylinder must have.
    pub length: f32,
}

impl SegmentTransform {
    pub fn isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(self.translation, self.rotation)
    }

    /// Homogeneous matrix, `T * R`
    pub fn matrix(&self) -> Matrix4<f32> {
        self.isometry().to_homogeneous()
    }

    /// Map a point from the cylinder's local frame into the world.
    pub fn apply(&self, point: &Point3<f32>) -> Point3<f32> {
        self.isometry().transform_point(point)
    }

    pub fn center(&self) -> Point3<f32> {
        Point3::from(self.translation.vector)
    }

    pub fn canonical_top(&self) -> Point3<f32> {
        Point3::from(CANONICAL_UP * (self.length / 2.0))
    }

    pub fn canonical_bottom(&self) -> Point3<f32> {
        Point3::from(CANONICAL_UP * (-self.length / 2.0))
    }

    pub fn canonical_center(&self) -> Point3<f32> {
        Point3::origin()
    }
}

/// Compute the transform that makes a canonical cylinder of height
/// `distance(top, bottom)` span from `bottom` to `top`.
///
/// Fails with [`AlignError::DegenerateSegment`] when the endpoints are closer
/// than [`EPSILON`], and with [`AlignError::NonFinitePoint`] when either
/// endpoint has a NaN or infinite coordinate.
pub fn align(top: Point3<f32>, bottom: Point3<f32>) -> Result<SegmentTransform, AlignError> {
    for p in [&top, &bottom] {
        if !p.iter().all(|c| c.is_finite()) {
            return Err(AlignError::NonFinitePoint { x: p.x, y: p.y, z: p.z });
        }
    }

    let direction = top - bottom;
    let length = direction.norm();
    // also catches a difference that overflows to infinity
    if !(length > EPSILON && length.is_finite()) {
        return Err(AlignError::DegenerateSegment { distance: length });
    }

    let axis = Unit::new_unchecked(direction / length);
    let rotation = rotation_from_up(&axis);
    let center = nalgebra::center(&top, &bottom);

    debug!(
        top = ?[top.x, top.y, top.z],
        bottom = ?[bottom.x, bottom.y, bottom.z],
        length,
        angle = rotation.angle(),
        "aligned segment"
    );

    Ok(SegmentTransform {
        rotation,
        translation: Translation3::from(center.coords),
        length,
    })
}

/// Rotation taking [`CANONICAL_UP`] onto `axis`.
///
/// The fallback axis only yields a correct 0 or PI rotation because the
/// reference vector is always `CANONICAL_UP`; callers may not pass another
/// reference direction.
fn rotation_from_up(axis: &Unit<Vector3<f32>>) -> UnitQuaternion<f32> {
    let cross = axis.cross(&CANONICAL_UP);
    let rotation_axis = if cross.norm() < EPSILON {
        Unit::new_unchecked(FALLBACK_AXIS)
    } else {
        Unit::new_normalize(cross)
    };

    // Same angle as acos(dot), without the precision loss near 0 and PI.
    let theta = -cross.norm().atan2(axis.dot(&CANONICAL_UP));
    UnitQuaternion::from_axis_angle(&rotation_axis, theta)
}
