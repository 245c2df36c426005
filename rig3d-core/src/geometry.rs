//! Geometry primitives for 3D rendering
//!
//! Every primitive is built in its own local frame, centered on the origin,
//! with Y up. Place it with a node transform or bake a matrix in with
//! [`Mesh::transformed`].
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use thiserror::Error;

use crate::align::{self, AlignError};

/// Faces with a smaller doubled area than this are dropped.
const DEGENERATE_AREA: f32 = 1e-10;

/// Upper bound on any segment count a primitive accepts.
pub const MAX_SEGMENTS: u32 = 512;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{primitive} needs at least {min} segments, got {got}")]
    TooFewSegments {
        primitive: &'static str,
        min: u32,
        got: u32,
    },
    #[error("{primitive} allows at most {max} segments, got {got}")]
    TooManySegments {
        primitive: &'static str,
        max: u32,
        got: u32,
    },
    #[error("Negative dimension for {primitive}: {value}")]
    NegativeDimension { primitive: &'static str, value: f32 },
    #[error("Spacing for {primitive} must be positive, got {value}")]
    InvalidSpacing { primitive: &'static str, value: f32 },
    #[error(transparent)]
    Align(#[from] AlignError),
}

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }

    pub fn at(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).normalize()
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Add a flat-shaded face, wound so that its normal points along
    /// `outward`. Degenerate faces (cone apexes, sphere poles) are skipped.
    pub fn push_face(
        &mut self,
        p0: Point3<f32>,
        p1: Point3<f32>,
        p2: Point3<f32>,
        outward: Vector3<f32>,
    ) {
        let cross = (p1 - p0).cross(&(p2 - p0));
        if cross.norm() < DEGENERATE_AREA {
            return;
        }

        let (p1, p2, normal) = if cross.dot(&outward) < 0.0 {
            (p2, p1, -cross.normalize())
        } else {
            (p1, p2, cross.normalize())
        };

        self.add_triangle(Triangle::new(
            Vertex::at(p0, normal),
            Vertex::at(p1, normal),
            Vertex::at(p2, normal),
        ));
    }

    pub fn extend(&mut self, other: Mesh) {
        self.triangles.extend(other.triangles);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Copy of the mesh with positions mapped through `matrix` and normals
    /// through its inverse transpose.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Mesh {
        let linear: Matrix3<f32> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|inverse| inverse.transpose())
            .unwrap_or(linear);

        let triangles = self
            .triangles
            .iter()
            .map(|triangle| {
                let [a, b, c] = triangle.vertices.map(|v| Vertex {
                    position: matrix.transform_point(&v.position),
                    normal: (normal_matrix * v.normal)
                        .try_normalize(f32::EPSILON)
                        .unwrap_or(v.normal),
                });
                Triangle::new(a, b, c)
            })
            .collect();

        Mesh { triangles }
    }

    /// Axis-aligned bounding box, `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut positions = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| v.position));
        let first = positions.next()?;

        Some(positions.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }

    /// Create a simple cube mesh for testing
    pub fn cube(size: f32) -> Self {
        Self::cuboid(size, size, size)
    }

    /// Box with the given extents along X, Y and Z
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        let mut mesh = Self::with_capacity(12);

        let faces: [(Vector3<f32>, [Point3<f32>; 4]); 6] = [
            // Front
            (
                Vector3::z(),
                [
                    Point3::new(-hx, -hy, hz),
                    Point3::new(hx, -hy, hz),
                    Point3::new(hx, hy, hz),
                    Point3::new(-hx, hy, hz),
                ],
            ),
            // Back
            (
                -Vector3::z(),
                [
                    Point3::new(hx, -hy, -hz),
                    Point3::new(-hx, -hy, -hz),
                    Point3::new(-hx, hy, -hz),
                    Point3::new(hx, hy, -hz),
                ],
            ),
            // Top
            (
                Vector3::y(),
                [
                    Point3::new(-hx, hy, hz),
                    Point3::new(hx, hy, hz),
                    Point3::new(hx, hy, -hz),
                    Point3::new(-hx, hy, -hz),
                ],
            ),
            // Bottom
            (
                -Vector3::y(),
                [
                    Point3::new(-hx, -hy, -hz),
                    Point3::new(hx, -hy, -hz),
                    Point3::new(hx, -hy, hz),
                    Point3::new(-hx, -hy, hz),
                ],
            ),
            // Right
            (
                Vector3::x(),
                [
                    Point3::new(hx, -hy, hz),
                    Point3::new(hx, -hy, -hz),
                    Point3::new(hx, hy, -hz),
                    Point3::new(hx, hy, hz),
                ],
            ),
            // Left
            (
                -Vector3::x(),
                [
                    Point3::new(-hx, -hy, -hz),
                    Point3::new(-hx, -hy, hz),
                    Point3::new(-hx, hy, hz),
                    Point3::new(-hx, hy, -hz),
                ],
            ),
        ];

        for (normal, [a, b, c, d]) in faces {
            mesh.push_face(a, b, c, normal);
            mesh.push_face(a, c, d, normal);
        }

        mesh
    }

    /// Cylinder (or cone) along +Y, `radius_top` at `+height / 2`
    pub fn cylinder(params: &CylinderParams) -> Result<Self, GeometryError> {
        params.validate()?;

        let CylinderParams {
            radius_top,
            radius_bottom,
            height,
            radial_segments,
            open_ended,
        } = *params;
        let half = height / 2.0;
        let slope = if height > 0.0 {
            (radius_bottom - radius_top) / height
        } else {
            0.0
        };

        let ring = |radius: f32, y: f32, i: u32| {
            let theta = TAU * i as f32 / radial_segments as f32;
            Point3::new(radius * theta.sin(), y, radius * theta.cos())
        };

        let mut mesh = Self::with_capacity(radial_segments as usize * 4);
        for i in 0..radial_segments {
            let theta = TAU * (i as f32 + 0.5) / radial_segments as f32;
            let outward = Vector3::new(theta.sin(), slope, theta.cos());

            let top0 = ring(radius_top, half, i);
            let top1 = ring(radius_top, half, i + 1);
            let bottom0 = ring(radius_bottom, -half, i);
            let bottom1 = ring(radius_bottom, -half, i + 1);

            mesh.push_face(top0, bottom0, bottom1, outward);
            mesh.push_face(top0, bottom1, top1, outward);

            if !open_ended {
                mesh.push_face(Point3::new(0.0, half, 0.0), top0, top1, Vector3::y());
                mesh.push_face(
                    Point3::new(0.0, -half, 0.0),
                    bottom0,
                    bottom1,
                    -Vector3::y(),
                );
            }
        }

        Ok(mesh)
    }

    /// Cylinder whose +Y end sits at `top` and -Y end at `bottom`.
    /// `params.height` is replaced by the distance between the endpoints.
    pub fn cylinder_from_ends(
        params: &CylinderParams,
        top: Point3<f32>,
        bottom: Point3<f32>,
    ) -> Result<Self, GeometryError> {
        let placement = align::align(top, bottom)?;
        let canonical = Self::cylinder(&CylinderParams {
            height: placement.length,
            ..*params
        })?;
        Ok(canonical.transformed(&placement.matrix()))
    }

    /// UV sphere with poles on the Y axis
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Result<Self, GeometryError> {
        check_segments("sphere", width_segments, 3)?;
        check_segments("sphere", height_segments, 2)?;
        check_dimension("sphere", radius)?;

        let point = |ring: u32, seg: u32| {
            let phi = PI * ring as f32 / height_segments as f32;
            let theta = TAU * seg as f32 / width_segments as f32;
            Point3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.cos(),
                radius * phi.sin() * theta.sin(),
            )
        };

        let mut mesh = Self::with_capacity(width_segments as usize * height_segments as usize * 2);
        for ring in 0..height_segments {
            for seg in 0..width_segments {
                let a = point(ring, seg);
                let b = point(ring + 1, seg);
                let c = point(ring + 1, seg + 1);
                let d = point(ring, seg + 1);
                let outward = (a.coords + b.coords + c.coords + d.coords) / 4.0;

                mesh.push_face(a, b, c, outward);
                mesh.push_face(a, c, d, outward);
            }
        }

        Ok(mesh)
    }

    /// Torus around the Z axis: ring of `radius` in the XY plane, tube of
    /// radius `tube`.
    pub fn torus(
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    ) -> Result<Self, GeometryError> {
        check_segments("torus", radial_segments, 3)?;
        check_segments("torus", tubular_segments, 3)?;
        check_dimension("torus", radius)?;
        check_dimension("torus", tube)?;

        let point = |j: u32, i: u32| {
            let u = TAU * i as f32 / tubular_segments as f32;
            let v = TAU * j as f32 / radial_segments as f32;
            let center = Point3::new(radius * u.cos(), radius * u.sin(), 0.0);
            let position = Point3::new(
                (radius + tube * v.cos()) * u.cos(),
                (radius + tube * v.cos()) * u.sin(),
                tube * v.sin(),
            );
            (position, position - center)
        };

        let mut mesh = Self::with_capacity(radial_segments as usize * tubular_segments as usize * 2);
        for j in 0..radial_segments {
            for i in 0..tubular_segments {
                let (a, na) = point(j, i);
                let (b, nb) = point(j + 1, i);
                let (c, nc) = point(j + 1, i + 1);
                let (d, nd) = point(j, i + 1);
                let outward = na + nb + nc + nd;

                mesh.push_face(a, b, c, outward);
                mesh.push_face(a, c, d, outward);
            }
        }

        Ok(mesh)
    }

    /// Quarter-turn about X, used to lay Y-axis primitives on their side
    pub fn rotated_quarter_x(&self) -> Mesh {
        self.transformed(&Matrix4::new_rotation(Vector3::new(FRAC_PI_2, 0.0, 0.0)))
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters for [`Mesh::cylinder`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylinderParams {
    pub radius_top: f32,
    pub radius_bottom: f32,
    pub height: f32,
    pub radial_segments: u32,
    /// Skip the end caps
    pub open_ended: bool,
}

impl CylinderParams {
    pub const DEFAULT_SEGMENTS: u32 = 32;

    pub fn new(radius_top: f32, radius_bottom: f32, height: f32) -> Self {
        Self {
            radius_top,
            radius_bottom,
            height,
            radial_segments: Self::DEFAULT_SEGMENTS,
            open_ended: false,
        }
    }

    pub fn radial_segments(mut self, segments: u32) -> Self {
        self.radial_segments = segments;
        self
    }

    pub fn open_ended(mut self, open_ended: bool) -> Self {
        self.open_ended = open_ended;
        self
    }

    fn validate(&self) -> Result<(), GeometryError> {
        check_segments("cylinder", self.radial_segments, 3)?;
        check_dimension("cylinder", self.radius_top)?;
        check_dimension("cylinder", self.radius_bottom)?;
        check_dimension("cylinder", self.height)
    }
}

pub(crate) fn check_segments(primitive: &'static str, got: u32, min: u32) -> Result<(), GeometryError> {
    if got < min {
        return Err(GeometryError::TooFewSegments { primitive, min, got });
    }
    if got > MAX_SEGMENTS {
        return Err(GeometryError::TooManySegments {
            primitive,
            max: MAX_SEGMENTS,
            got,
        });
    }
    Ok(())
}

pub(crate) fn check_dimension(primitive: &'static str, value: f32) -> Result<(), GeometryError> {
    if value < 0.0 || !value.is_finite() {
        return Err(GeometryError::NegativeDimension { primitive, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all_normals_outward(mesh: &Mesh) -> bool {
        mesh.triangles.iter().all(|t| {
            let centroid = (t.vertices[0].position.coords
                + t.vertices[1].position.coords
                + t.vertices[2].position.coords)
                / 3.0;
            t.calculate_normal().dot(&centroid) >= -1e-4
        })
    }

    #[test]
    fn test_cuboid_bounds() {
        let mesh = Mesh::cuboid(4.0, 120.0, 18.0);
        assert_eq!(mesh.triangles.len(), 12);
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min, Point3::new(-2.0, -60.0, -9.0));
        assert_relative_eq!(max, Point3::new(2.0, 60.0, 9.0));
        assert!(all_normals_outward(&mesh));
    }

    #[test]
    fn test_cylinder_triangle_count() {
        let closed = Mesh::cylinder(&CylinderParams::new(22.0, 22.0, 6.0)).unwrap();
        assert_eq!(closed.triangles.len(), 32 * 4);

        let open = Mesh::cylinder(&CylinderParams::new(22.0, 22.0, 6.0).open_ended(true)).unwrap();
        assert_eq!(open.triangles.len(), 32 * 2);
        assert!(all_normals_outward(&closed));
    }

    #[test]
    fn test_cone_drops_apex_faces() {
        let cone = Mesh::cylinder(&CylinderParams::new(50.0, 0.0, 300.0).radial_segments(8)).unwrap();
        // one side face per segment plus the top cap
        assert_eq!(cone.triangles.len(), 8 * 2);
        let (min, max) = cone.bounds().unwrap();
        assert_relative_eq!(max.y, 150.0);
        assert_relative_eq!(min.y, -150.0);
    }

    #[test]
    fn test_cylinder_rejects_few_segments() {
        let result = Mesh::cylinder(&CylinderParams::new(1.0, 1.0, 1.0).radial_segments(2));
        assert!(matches!(
            result,
            Err(GeometryError::TooFewSegments { min: 3, got: 2, .. })
        ));
    }

    #[test]
    fn test_cylinder_rejects_too_many_segments() {
        let result =
            Mesh::cylinder(&CylinderParams::new(1.0, 1.0, 1.0).radial_segments(4_000_000_000));
        assert!(matches!(
            result,
            Err(GeometryError::TooManySegments { max: MAX_SEGMENTS, got: 4_000_000_000, .. })
        ));
        let largest = CylinderParams::new(1.0, 1.0, 1.0).radial_segments(MAX_SEGMENTS);
        assert!(Mesh::cylinder(&largest).is_ok());
    }

    #[test]
    fn test_cylinder_from_ends_spans_endpoints() {
        let params = CylinderParams::new(5.0, 5.0, 0.0);
        let top = Point3::new(250.0, 300.0, -200.0);
        let bottom = Point3::new(-150.0, 100.0, 0.0);
        let mesh = Mesh::cylinder_from_ends(&params, top, bottom).unwrap();

        let positions: Vec<_> = mesh
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| v.position))
            .collect();
        let nearest = |target: Point3<f32>| {
            positions
                .iter()
                .map(|p| nalgebra::distance(p, &target))
                .fold(f32::INFINITY, f32::min)
        };
        // cap centers sit exactly on the endpoints
        assert!(nearest(top) < 1e-2);
        assert!(nearest(bottom) < 1e-2);
    }

    #[test]
    fn test_cylinder_from_ends_degenerate() {
        let p = Point3::new(1.0, 1.0, 1.0);
        let result = Mesh::cylinder_from_ends(&CylinderParams::new(1.0, 1.0, 0.0), p, p);
        assert!(matches!(
            result,
            Err(GeometryError::Align(AlignError::DegenerateSegment { .. }))
        ));
    }

    #[test]
    fn test_sphere_is_closed_and_outward() {
        let sphere = Mesh::sphere(20.0, 32, 16).unwrap();
        assert!(!sphere.is_empty());
        assert!(all_normals_outward(&sphere));
        let (min, max) = sphere.bounds().unwrap();
        assert_relative_eq!(max.y, 20.0, epsilon = 1e-4);
        assert_relative_eq!(min.y, -20.0, epsilon = 1e-4);
    }

    #[test]
    fn test_sphere_rejects_bad_arguments() {
        assert!(matches!(
            Mesh::sphere(1.0, 2, 8),
            Err(GeometryError::TooFewSegments { primitive: "sphere", min: 3, got: 2 })
        ));
        assert!(matches!(
            Mesh::sphere(1.0, 8, 1),
            Err(GeometryError::TooFewSegments { primitive: "sphere", min: 2, got: 1 })
        ));
        assert!(matches!(
            Mesh::sphere(1.0, 100_000, 100_000),
            Err(GeometryError::TooManySegments { primitive: "sphere", .. })
        ));
        assert!(matches!(
            Mesh::sphere(-1.0, 8, 8),
            Err(GeometryError::NegativeDimension { primitive: "sphere", .. })
        ));
    }

    #[test]
    fn test_torus_rejects_bad_arguments() {
        assert!(matches!(
            Mesh::torus(10.0, 2.0, 2, 8),
            Err(GeometryError::TooFewSegments { primitive: "torus", min: 3, got: 2 })
        ));
        assert!(matches!(
            Mesh::torus(10.0, 2.0, 8, u32::MAX),
            Err(GeometryError::TooManySegments { primitive: "torus", .. })
        ));
        assert!(matches!(
            Mesh::torus(-10.0, 2.0, 8, 8),
            Err(GeometryError::NegativeDimension { primitive: "torus", .. })
        ));
        assert!(matches!(
            Mesh::torus(10.0, f32::NAN, 8, 8),
            Err(GeometryError::NegativeDimension { primitive: "torus", .. })
        ));
    }

    #[test]
    fn test_torus_lies_in_xy_plane() {
        let torus = Mesh::torus(22.0, 15.0, 32, 32).unwrap();
        let (min, max) = torus.bounds().unwrap();
        assert_relative_eq!(max.x, 37.0, epsilon = 1e-3);
        assert_relative_eq!(max.z, 15.0, epsilon = 1e-3);
        assert_relative_eq!(min.z, -15.0, epsilon = 1e-3);

        let flat = torus.rotated_quarter_x();
        let (_, max) = flat.bounds().unwrap();
        assert_relative_eq!(max.y, 15.0, epsilon = 1e-3);
    }

    #[test]
    fn test_transformed_rotates_normals() {
        let mesh = Mesh::cuboid(2.0, 2.0, 2.0);
        let rotated = mesh.rotated_quarter_x();
        for triangle in &rotated.triangles {
            for vertex in &triangle.vertices {
                assert_relative_eq!(vertex.normal.norm(), 1.0, epsilon = 1e-5);
            }
            assert_relative_eq!(
                triangle.calculate_normal(),
                triangle.vertices[0].normal,
                epsilon = 1e-4
            );
        }
    }
}
