//! Reference geometry: grids, a ground slab, and coordinate axes
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::geometry::{check_dimension, CylinderParams, GeometryError, Mesh, MAX_SEGMENTS};
use crate::scene::{Color, Material, NodeId, Scene, SceneError};

pub const HELPERS_NODE: &str = "helpers";

/// Which helpers to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelperOptions {
    pub grid_xz: bool,
    pub grid_yz: bool,
    pub grid_xy: bool,
    pub ground: bool,
    pub axes: bool,
}

impl Default for HelperOptions {
    fn default() -> Self {
        Self {
            grid_xz: false,
            grid_yz: false,
            grid_xy: false,
            ground: true,
            axes: true,
        }
    }
}

impl HelperOptions {
    pub fn none() -> Self {
        Self {
            grid_xz: false,
            grid_yz: false,
            grid_xy: false,
            ground: false,
            axes: false,
        }
    }
}

/// Sizes used when building helpers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelperDimensions {
    /// Half-extent of grids and ground
    pub extent: f32,
    pub grid_spacing: f32,
    pub axis_length: f32,
    pub axis_radius: f32,
}

impl Default for HelperDimensions {
    fn default() -> Self {
        Self {
            extent: 500.0,
            grid_spacing: 100.0,
            axis_length: 200.0,
            axis_radius: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPlane {
    XZ,
    YZ,
    XY,
}

/// Line segments of a square grid centered on the origin.
///
/// `spacing` must be positive, and at most [`MAX_SEGMENTS`] lines may fit
/// on either side of the origin.
pub fn grid_lines(
    plane: GridPlane,
    extent: f32,
    spacing: f32,
) -> Result<Vec<(Point3<f32>, Point3<f32>)>, GeometryError> {
    check_dimension("grid", extent)?;
    if !(spacing > 0.0 && spacing.is_finite()) {
        return Err(GeometryError::InvalidSpacing {
            primitive: "grid",
            value: spacing,
        });
    }
    let steps = (extent / spacing).floor();
    if steps > MAX_SEGMENTS as f32 {
        return Err(GeometryError::TooManySegments {
            primitive: "grid",
            max: MAX_SEGMENTS,
            got: steps as u32,
        });
    }
    let steps = steps as i32;
    let place = |u: f32, v: f32| match plane {
        GridPlane::XZ => Point3::new(u, 0.0, v),
        GridPlane::YZ => Point3::new(0.0, u, v),
        GridPlane::XY => Point3::new(u, v, 0.0),
    };

    Ok((-steps..=steps)
        .flat_map(|i| {
            let offset = i as f32 * spacing;
            [
                (place(offset, -extent), place(offset, extent)),
                (place(-extent, offset), place(extent, offset)),
            ]
        })
        .collect())
}

/// (Re)build the helper subtree under the root to match `options`
pub fn install_helpers(
    scene: &mut Scene,
    options: &HelperOptions,
    dimensions: &HelperDimensions,
) -> Result<NodeId, SceneError> {
    let helpers = match scene.find(HELPERS_NODE) {
        Some(id) => {
            scene.clear_children(id)?;
            id
        }
        None => scene.add_node(scene.root(), HELPERS_NODE)?,
    };

    let grid_material = Material::new(Color(0x000000));
    let grids = [
        (options.grid_xz, GridPlane::XZ, "grid.xz"),
        (options.grid_yz, GridPlane::YZ, "grid.yz"),
        (options.grid_xy, GridPlane::XY, "grid.xy"),
    ];
    for (enabled, plane, name) in grids {
        if enabled {
            let lines = grid_lines(plane, dimensions.extent, dimensions.grid_spacing)?;
            scene.add_lines(helpers, name, lines, grid_material)?;
        }
    }

    if options.ground {
        let ground = scene.add_mesh(
            helpers,
            "ground",
            Mesh::cuboid(dimensions.extent * 2.0, 1.0, dimensions.extent * 2.0),
            Material::new(Color(0xA0A0A0)),
        )?;
        scene.set_position(ground, Vector3::new(0.0, -1.0, 0.0))?;
    }

    if options.axes {
        let params = CylinderParams::new(dimensions.axis_radius, dimensions.axis_radius, 0.0)
            .radial_segments(8);
        let axes = [
            ("axis.x", Vector3::x(), Color::RED),
            ("axis.y", Vector3::y(), Color::GREEN),
            ("axis.z", Vector3::z(), Color::BLUE),
        ];
        for (name, direction, color) in axes {
            let tip = Point3::from(direction * dimensions.axis_length);
            let mesh = Mesh::cylinder_from_ends(&params, tip, Point3::origin())?;
            scene.add_mesh(helpers, name, mesh, Material::new(color))?;
        }
    }

    debug!(?options, "installed helpers");
    Ok(helpers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_line_count() {
        let lines = grid_lines(GridPlane::XZ, 500.0, 100.0).unwrap();
        // 11 lines each way
        assert_eq!(lines.len(), 22);
        assert!(lines.iter().all(|(a, b)| a.y == 0.0 && b.y == 0.0));
    }

    #[test]
    fn test_grid_rejects_bad_spacing() {
        for spacing in [0.0, -100.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                grid_lines(GridPlane::XY, 500.0, spacing),
                Err(GeometryError::InvalidSpacing { .. })
            ));
        }
        assert!(matches!(
            grid_lines(GridPlane::XY, 500.0, 1e-6),
            Err(GeometryError::TooManySegments { primitive: "grid", .. })
        ));
        assert!(matches!(
            grid_lines(GridPlane::XY, -1.0, 10.0),
            Err(GeometryError::NegativeDimension { .. })
        ));
    }

    #[test]
    fn test_install_rejects_zero_grid_spacing() {
        let mut scene = Scene::new();
        let options = HelperOptions {
            grid_xz: true,
            ..HelperOptions::none()
        };
        let dims = HelperDimensions {
            grid_spacing: 0.0,
            ..HelperDimensions::default()
        };
        assert!(matches!(
            install_helpers(&mut scene, &options, &dims),
            Err(SceneError::Geometry(GeometryError::InvalidSpacing { .. }))
        ));
    }

    #[test]
    fn test_install_and_toggle() {
        let mut scene = Scene::new();
        let dims = HelperDimensions::default();
        let helpers = install_helpers(&mut scene, &HelperOptions::default(), &dims).unwrap();
        // ground + three axes
        assert_eq!(scene.node(helpers).unwrap().children().len(), 4);

        let mut options = HelperOptions::default();
        options.grid_xz = true;
        options.axes = false;
        let again = install_helpers(&mut scene, &options, &dims).unwrap();
        assert_eq!(again, helpers);
        assert_eq!(scene.node(helpers).unwrap().children().len(), 2);
        assert!(scene.find("axis.x").is_none());
        assert!(scene.find("grid.xz").is_some());
    }

    #[test]
    fn test_no_helpers() {
        let mut scene = Scene::new();
        let helpers =
            install_helpers(&mut scene, &HelperOptions::none(), &HelperDimensions::default()).unwrap();
        assert!(scene.node(helpers).unwrap().children().is_empty());
        assert!(scene.drawables().is_empty());
    }
}
