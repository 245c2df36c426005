//! Segmented robot arm: base, body, upper arm ("crane") and forearm
//! ("extender"), each part built in its own frame with Y along the part.
use nalgebra::{Point3, Vector3};
use tracing::{info, warn};

use crate::geometry::{CylinderParams, GeometryError, Mesh};
use crate::scene::{Color, Material, NodeId, Scene, SceneError};
use crate::transform::RotationState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotDimensions {
    pub forearm_length: f32,
    pub upper_arm_length: f32,
    pub body_length: f32,
}

impl Default for RobotDimensions {
    fn default() -> Self {
        Self {
            forearm_length: 80.0,
            upper_arm_length: 120.0,
            body_length: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotMaterials {
    pub base: Material,
    pub forearm: Material,
    pub upper_arm: Material,
    pub body: Material,
}

impl Default for RobotMaterials {
    fn default() -> Self {
        Self {
            base: Material::new(Color(0x6E23BB)),
            forearm: Material::new(Color(0xF4C154)),
            upper_arm: Material::new(Color(0x95E4FB)),
            body: Material::new(Color(0x279933)),
        }
    }
}

/// A controllable joint of the arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    BodyY,
    UpperArmY,
    UpperArmZ,
    ForearmY,
    ForearmZ,
}

impl Joint {
    pub const ALL: [Joint; 5] = [
        Joint::BodyY,
        Joint::UpperArmY,
        Joint::UpperArmZ,
        Joint::ForearmY,
        Joint::ForearmZ,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Joint::BodyY => "Body y",
            Joint::UpperArmY => "Upper arm y",
            Joint::UpperArmZ => "Upper arm z",
            Joint::ForearmY => "Forearm y",
            Joint::ForearmZ => "Forearm z",
        }
    }

    /// Allowed range in degrees
    pub fn range(self) -> (f32, f32) {
        match self {
            Joint::BodyY | Joint::UpperArmY | Joint::ForearmY => (-180.0, 180.0),
            Joint::UpperArmZ => (-45.0, 45.0),
            Joint::ForearmZ => (-120.0, 120.0),
        }
    }

    /// Next joint, wrapping around
    pub fn next(self) -> Joint {
        let index = Self::ALL.iter().position(|&j| j == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// Joint angles in degrees. Y is yaw, Z is roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngles {
    pub body_y: f32,
    pub upper_arm_y: f32,
    pub upper_arm_z: f32,
    pub forearm_y: f32,
    pub forearm_z: f32,
}

impl Default for JointAngles {
    fn default() -> Self {
        Self {
            body_y: 0.0,
            upper_arm_y: 70.0,
            upper_arm_z: -15.0,
            forearm_y: 10.0,
            forearm_z: 60.0,
        }
    }
}

impl JointAngles {
    pub fn get(&self, joint: Joint) -> f32 {
        match joint {
            Joint::BodyY => self.body_y,
            Joint::UpperArmY => self.upper_arm_y,
            Joint::UpperArmZ => self.upper_arm_z,
            Joint::ForearmY => self.forearm_y,
            Joint::ForearmZ => self.forearm_z,
        }
    }

    /// Set a joint, clamped to its range. Returns the stored value.
    pub fn set(&mut self, joint: Joint, degrees: f32) -> f32 {
        let (min, max) = joint.range();
        let clamped = degrees.clamp(min, max);
        if clamped != degrees {
            warn!(joint = joint.label(), requested = degrees, clamped, "joint angle out of range");
        }

        let slot = match joint {
            Joint::BodyY => &mut self.body_y,
            Joint::UpperArmY => &mut self.upper_arm_y,
            Joint::UpperArmZ => &mut self.upper_arm_z,
            Joint::ForearmY => &mut self.forearm_y,
            Joint::ForearmZ => &mut self.forearm_z,
        };
        *slot = clamped;
        clamped
    }

    pub fn nudge(&mut self, joint: Joint, delta: f32) -> f32 {
        self.set(joint, self.get(joint) + delta)
    }
}

/// Node handles of a built arm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotArm {
    pub base: NodeId,
    pub body: NodeId,
    pub arm: NodeId,
    pub forearm: NodeId,
    pub dimensions: RobotDimensions,
}

impl RobotArm {
    /// Build the arm under the scene root: body on the ground, upper arm on
    /// top of the body, forearm at the end of the upper arm.
    pub fn build(
        scene: &mut Scene,
        dimensions: RobotDimensions,
        materials: &RobotMaterials,
    ) -> Result<Self, SceneError> {
        let root = scene.root();

        let base = scene.add_mesh(
            root,
            "base",
            Mesh::torus(22.0, 15.0, 32, 32)?.rotated_quarter_x(),
            materials.base,
        )?;

        let body = scene.add_node(root, "body")?;
        add_body(scene, body, dimensions.body_length, materials.body)?;

        let arm = scene.add_node(body, "arm")?;
        add_crane(scene, arm, dimensions.upper_arm_length, materials.upper_arm)?;
        scene.set_position(arm, Vector3::new(0.0, dimensions.body_length, 0.0))?;

        let forearm = scene.add_node(arm, "forearm")?;
        add_extender(scene, forearm, dimensions.forearm_length, materials.forearm)?;
        scene.set_position(forearm, Vector3::new(0.0, dimensions.upper_arm_length, 0.0))?;

        info!(nodes = scene.len(), "built robot arm");
        Ok(Self {
            base,
            body,
            arm,
            forearm,
            dimensions,
        })
    }

    pub fn pose(&self, scene: &mut Scene, angles: &JointAngles) -> Result<(), SceneError> {
        scene.set_rotation(self.body, RotationState::from_degrees(0.0, angles.body_y, 0.0))?;
        scene.set_rotation(
            self.arm,
            RotationState::from_degrees(0.0, angles.upper_arm_y, angles.upper_arm_z),
        )?;
        scene.set_rotation(
            self.forearm,
            RotationState::from_degrees(0.0, angles.forearm_y, angles.forearm_z),
        )
    }

    /// World position of the forearm's far end
    pub fn forearm_tip(&self, scene: &Scene) -> Result<Point3<f32>, SceneError> {
        scene.world_point(
            self.forearm,
            &Point3::new(0.0, self.dimensions.forearm_length, 0.0),
        )
    }
}

fn add_part(
    scene: &mut Scene,
    parent: NodeId,
    name: &str,
    mesh: Result<Mesh, GeometryError>,
    material: Material,
    position: Vector3<f32>,
) -> Result<NodeId, SceneError> {
    let id = scene.add_mesh(parent, name, mesh?, material)?;
    scene.set_position(id, position)?;
    Ok(id)
}

/// Forearm: a flat disc, four struts, and a crosswise cylinder at the end
fn add_extender(scene: &mut Scene, part: NodeId, length: f32, material: Material) -> Result<(), SceneError> {
    add_part(
        scene,
        part,
        "forearm.disc",
        Mesh::cylinder(&CylinderParams::new(22.0, 22.0, 6.0)),
        material,
        Vector3::zeros(),
    )?;

    for i in 0..4 {
        let x = if i < 2 { -8.0 } else { 8.0 };
        let z = if i % 2 == 1 { -8.0 } else { 8.0 };
        add_part(
            scene,
            part,
            "forearm.strut",
            Ok(Mesh::cuboid(4.0, length, 4.0)),
            material,
            Vector3::new(x, length / 2.0, z),
        )?;
    }

    add_part(
        scene,
        part,
        "forearm.hand",
        Mesh::cylinder(&CylinderParams::new(15.0, 15.0, 40.0)).map(|m| m.rotated_quarter_x()),
        material,
        Vector3::new(0.0, length, 0.0),
    )?;
    Ok(())
}

/// Upper arm: a square beam with a ball joint at the end
fn add_crane(scene: &mut Scene, part: NodeId, length: f32, material: Material) -> Result<(), SceneError> {
    add_part(
        scene,
        part,
        "arm.beam",
        Ok(Mesh::cuboid(18.0, length, 18.0)),
        material,
        Vector3::new(0.0, length / 2.0, 0.0),
    )?;
    add_part(
        scene,
        part,
        "arm.joint",
        Mesh::sphere(20.0, 32, 16),
        material,
        Vector3::new(0.0, length, 0.0),
    )?;
    Ok(())
}

/// Body: two opposed cones, a crossbar, and a ball joint on top
fn add_body(scene: &mut Scene, part: NodeId, length: f32, material: Material) -> Result<(), SceneError> {
    add_part(
        scene,
        part,
        "body.lower",
        Mesh::cylinder(&CylinderParams::new(50.0, 12.0, length / 2.0).radial_segments(18)),
        material,
        Vector3::new(0.0, length / 4.0, 0.0),
    )?;
    add_part(
        scene,
        part,
        "body.upper",
        Mesh::cylinder(&CylinderParams::new(12.0, 50.0, length / 2.0).radial_segments(18)),
        material,
        Vector3::new(0.0, 3.0 * length / 4.0, 0.0),
    )?;
    add_part(
        scene,
        part,
        "body.bar",
        Ok(Mesh::cuboid(12.0, length / 4.0, 110.0)),
        material,
        Vector3::new(0.0, length / 2.0, 0.0),
    )?;
    add_part(
        scene,
        part,
        "body.joint",
        Mesh::sphere(20.0, 32, 16),
        material,
        Vector3::new(0.0, length, 0.0),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_joint_clamping() {
        let mut angles = JointAngles::default();
        assert_eq!(angles.set(Joint::UpperArmZ, 90.0), 45.0);
        assert_eq!(angles.nudge(Joint::ForearmZ, -500.0), -120.0);
        assert_eq!(angles.set(Joint::BodyY, 30.0), 30.0);
        assert_eq!(angles.get(Joint::BodyY), 30.0);
    }

    #[test]
    fn test_joint_cycle() {
        let mut joint = Joint::BodyY;
        for _ in 0..Joint::ALL.len() {
            joint = joint.next();
        }
        assert_eq!(joint, Joint::BodyY);
        assert_eq!(Joint::UpperArmZ.next(), Joint::ForearmY);
    }

    #[test]
    fn test_build_hierarchy() {
        let mut scene = Scene::new();
        let robot = RobotArm::build(&mut scene, RobotDimensions::default(), &RobotMaterials::default())
            .unwrap();

        assert_eq!(scene.node(robot.arm).unwrap().parent(), Some(robot.body));
        assert_eq!(scene.node(robot.forearm).unwrap().parent(), Some(robot.arm));
        assert_eq!(scene.node(robot.base).unwrap().parent(), Some(scene.root()));
        // torus + 4 body parts + 2 arm parts + 6 forearm parts
        assert_eq!(scene.drawables().len(), 13);
    }

    #[test]
    fn test_straight_arm_tip() {
        let mut scene = Scene::new();
        let robot = RobotArm::build(&mut scene, RobotDimensions::default(), &RobotMaterials::default())
            .unwrap();
        let straight = JointAngles {
            body_y: 0.0,
            upper_arm_y: 0.0,
            upper_arm_z: 0.0,
            forearm_y: 0.0,
            forearm_z: 0.0,
        };
        robot.pose(&mut scene, &straight).unwrap();

        let tip = robot.forearm_tip(&scene).unwrap();
        assert_relative_eq!(tip, Point3::new(0.0, 260.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_roll_bends_forearm() {
        let mut scene = Scene::new();
        let robot = RobotArm::build(&mut scene, RobotDimensions::default(), &RobotMaterials::default())
            .unwrap();
        let mut angles = JointAngles {
            body_y: 0.0,
            upper_arm_y: 0.0,
            upper_arm_z: 0.0,
            forearm_y: 0.0,
            forearm_z: 0.0,
        };
        angles.set(Joint::ForearmZ, 90.0);
        robot.pose(&mut scene, &angles).unwrap();

        // forearm rolled onto -X at the top of the upper arm
        let tip = robot.forearm_tip(&scene).unwrap();
        assert_relative_eq!(tip, Point3::new(-80.0, 180.0, 0.0), epsilon = 1e-3);

        // body yaw swings the whole arm around Y
        angles.set(Joint::BodyY, 90.0);
        robot.pose(&mut scene, &angles).unwrap();
        let tip = robot.forearm_tip(&scene).unwrap();
        assert_relative_eq!(tip, Point3::new(0.0, 180.0, 80.0), epsilon = 1e-3);
    }
}
