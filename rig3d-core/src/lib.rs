//! rig3d core library - segment alignment, primitives and scene graph
//!
//! This library provides the stateless core of the viewer: placing a
//! cylinder between two points, building primitive meshes, composing them in
//! a hierarchical scene, and projecting that scene through a camera.

pub mod align;
pub mod geometry;
pub mod helpers;
pub mod projection;
pub mod robot;
pub mod scene;
pub mod scenes;
pub mod segfile;
pub mod transform;

// Re-export commonly used types
pub use align::{align, AlignError, Segment, SegmentTransform};
pub use geometry::{CylinderParams, GeometryError, Mesh, Triangle, Vertex};
pub use helpers::{install_helpers, HelperDimensions, HelperOptions};
pub use projection::{Camera, OrbitCamera, ProjectionMode};
pub use robot::{Joint, JointAngles, RobotArm, RobotDimensions, RobotMaterials};
pub use scene::{Color, Content, Drawable, Material, NodeId, Scene, SceneError};
pub use scenes::SceneKind;
pub use segfile::{load_segment_file, parse_segment_file, SegmentFileError, SegmentSpec};
pub use transform::{RotationState, Transform};
