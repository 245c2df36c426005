//! Ready-made demo scenes
use std::fmt;
use std::str::FromStr;

use nalgebra::Point3;
use tracing::info;

use crate::geometry::CylinderParams;
use crate::helpers::HelperOptions;
use crate::projection::OrbitCamera;
use crate::robot::{RobotArm, RobotDimensions, RobotMaterials};
use crate::scene::{Color, Material, NodeId, Scene, SceneError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Robot,
    Cylinders,
}

impl SceneKind {
    pub fn title(self) -> &'static str {
        match self {
            SceneKind::Robot => "Robot arm",
            SceneKind::Cylinders => "Cylinders from ends",
        }
    }

    /// Starting viewpoint
    pub fn orbit_camera(self) -> OrbitCamera {
        match self {
            SceneKind::Robot => {
                OrbitCamera::looking_at(Point3::new(-102.0, 177.0, 20.0), Point3::new(-13.0, 60.0, 2.0))
                    .fov(38.0)
            }
            SceneKind::Cylinders => {
                OrbitCamera::looking_at(Point3::new(-528.0, 513.0, 92.0), Point3::new(0.0, 200.0, 0.0))
                    .fov(40.0)
            }
        }
    }

    pub fn default_helpers(self) -> HelperOptions {
        match self {
            SceneKind::Robot => HelperOptions::default(),
            SceneKind::Cylinders => HelperOptions {
                grid_xz: true,
                ..HelperOptions::default()
            },
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneKind::Robot => write!(f, "robot"),
            SceneKind::Cylinders => write!(f, "cylinders"),
        }
    }
}

impl FromStr for SceneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "robot" => Ok(SceneKind::Robot),
            "cylinders" => Ok(SceneKind::Cylinders),
            other => Err(format!("unknown scene '{other}', expected 'robot' or 'cylinders'")),
        }
    }
}

/// The seven test cylinders: cones with a 50 unit base at `top` and a point
/// at `bottom`.
pub fn showcase_segments() -> Vec<(Color, Point3<f32>, Point3<f32>)> {
    vec![
        // along Y axis
        (Color::GREEN, Point3::new(0.0, 300.0, 0.0), Point3::new(0.0, 0.0, 0.0)),
        // along X axis
        (Color::RED, Point3::new(300.0, 0.0, 0.0), Point3::new(0.0, 0.0, 0.0)),
        // along Z axis
        (Color::BLUE, Point3::new(0.0, 0.0, 300.0), Point3::new(0.0, 0.0, 0.0)),
        // along XYZ diagonal
        (Color::GRAY, Point3::new(200.0, 200.0, 200.0), Point3::new(0.0, 0.0, 0.0)),
        // along -Y, translated
        (Color::YELLOW, Point3::new(50.0, 100.0, -200.0), Point3::new(50.0, 300.0, -200.0)),
        // along X, from the top of the previous one
        (Color::CYAN, Point3::new(50.0, 300.0, -200.0), Point3::new(250.0, 300.0, -200.0)),
        // from the end of the previous one
        (Color::MAGENTA, Point3::new(250.0, 300.0, -200.0), Point3::new(-150.0, 100.0, 0.0)),
    ]
}

pub fn cylinder_showcase(scene: &mut Scene) -> Result<Vec<NodeId>, SceneError> {
    let params = CylinderParams::new(50.0, 0.0, 0.0).radial_segments(32);
    let group = scene.add_node(scene.root(), "cylinders")?;

    let ids = showcase_segments()
        .into_iter()
        .enumerate()
        .map(|(i, (color, top, bottom))| {
            scene.add_cylinder_from_ends(
                group,
                format!("cylinder.{i}"),
                &params,
                top,
                bottom,
                Material::new(color),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(count = ids.len(), "built cylinder showcase");
    Ok(ids)
}

pub fn robot_scene(scene: &mut Scene) -> Result<RobotArm, SceneError> {
    RobotArm::build(scene, RobotDimensions::default(), &RobotMaterials::default())
}
