//! Hierarchical scene graph.
//!
//! A [`Scene`] is a plain owned value: build it, hand it to a renderer by
//! reference, and mutate it between frames. Nodes live in an arena and are
//! addressed by [`NodeId`]; a node's world matrix is the product of the local
//! matrices on the path from the root.
use std::fmt;

use nalgebra::{Matrix4, Point3, Vector3};
use thiserror::Error;
use tracing::debug;

use crate::align;
use crate::geometry::{CylinderParams, GeometryError, Mesh};
use crate::transform::{RotationState, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("Unknown scene node {0}")]
    UnknownNode(NodeId),
    #[error("The scene root cannot be moved or removed")]
    RootImmutable,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// 24-bit RGB color, `0xRRGGBB`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const RED: Color = Color(0xFF0000);
    pub const GREEN: Color = Color(0x00FF00);
    pub const BLUE: Color = Color(0x0000FF);
    pub const GRAY: Color = Color(0x808080);
    pub const YELLOW: Color = Color(0xFFFF00);
    pub const CYAN: Color = Color(0x00FFFF);
    pub const MAGENTA: Color = Color(0xFF00FF);

    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Color,
}

impl Material {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

/// What a node draws, if anything
#[derive(Debug, Clone)]
pub enum Content {
    Mesh { mesh: Mesh, material: Material },
    Lines {
        segments: Vec<(Point3<f32>, Point3<f32>)>,
        material: Material,
    },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub position: Vector3<f32>,
    pub rotation: RotationState,
    /// When set, used as the local matrix instead of position and rotation
    pub matrix_override: Option<Matrix4<f32>>,
    pub content: Option<Content>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            position: Vector3::zeros(),
            rotation: RotationState::zero(),
            matrix_override: None,
            content: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn local_matrix(&self) -> Matrix4<f32> {
        self.matrix_override
            .unwrap_or_else(|| Transform::compose(&self.position, &self.rotation))
    }
}

/// A drawable node flattened into world space
#[derive(Debug, Clone, Copy)]
pub struct Drawable<'a> {
    pub node: NodeId,
    pub world: Matrix4<f32>,
    pub content: &'a Content,
}

#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new("root", None))],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SceneError::UnknownNode(id))
    }

    /// First live node with the given name, in insertion order
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.as_ref().is_some_and(|n| n.name == name))
            .map(NodeId)
    }

    /// Add an empty grouping node under `parent`
    pub fn add_node(&mut self, parent: NodeId, name: impl Into<String>) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(name, Some(parent))));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    pub fn add_mesh(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        mesh: Mesh,
        material: Material,
    ) -> Result<NodeId, SceneError> {
        let id = self.add_node(parent, name)?;
        self.node_mut(id)?.content = Some(Content::Mesh { mesh, material });
        Ok(id)
    }

    pub fn add_lines(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        segments: Vec<(Point3<f32>, Point3<f32>)>,
        material: Material,
    ) -> Result<NodeId, SceneError> {
        let id = self.add_node(parent, name)?;
        self.node_mut(id)?.content = Some(Content::Lines { segments, material });
        Ok(id)
    }

    /// Add a canonical cylinder whose local matrix places it between `top`
    /// and `bottom`. `params.height` is replaced by the segment length.
    pub fn add_cylinder_from_ends(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        params: &CylinderParams,
        top: Point3<f32>,
        bottom: Point3<f32>,
        material: Material,
    ) -> Result<NodeId, SceneError> {
        let placement = align::align(top, bottom).map_err(GeometryError::from)?;
        let mesh = Mesh::cylinder(&CylinderParams {
            height: placement.length,
            ..*params
        })?;

        let id = self.add_mesh(parent, name, mesh, material)?;
        self.set_matrix(id, placement.matrix())?;
        Ok(id)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vector3<f32>) -> Result<(), SceneError> {
        self.mutable_node(id)?.position = position;
        Ok(())
    }

    pub fn set_rotation(&mut self, id: NodeId, rotation: RotationState) -> Result<(), SceneError> {
        self.mutable_node(id)?.rotation = rotation;
        Ok(())
    }

    /// Pin the local matrix; position and rotation are ignored afterwards
    pub fn set_matrix(&mut self, id: NodeId, matrix: Matrix4<f32>) -> Result<(), SceneError> {
        self.mutable_node(id)?.matrix_override = Some(matrix);
        Ok(())
    }

    pub fn local_matrix(&self, id: NodeId) -> Result<Matrix4<f32>, SceneError> {
        Ok(self.node(id)?.local_matrix())
    }

    pub fn world_matrix(&self, id: NodeId) -> Result<Matrix4<f32>, SceneError> {
        let mut matrix = Matrix4::identity();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            matrix = node.local_matrix() * matrix;
            current = node.parent;
        }
        Ok(matrix)
    }

    /// World-space position of a point given in the node's local frame
    pub fn world_point(&self, id: NodeId, local: &Point3<f32>) -> Result<Point3<f32>, SceneError> {
        Ok(self.world_matrix(id)?.transform_point(local))
    }

    /// Remove `id` and everything below it
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root() {
            return Err(SceneError::RootImmutable);
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|&child| child != id);
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        debug!(node = %id, "removed subtree");
        Ok(())
    }

    pub fn clear_children(&mut self, id: NodeId) -> Result<(), SceneError> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.remove_subtree(child)?;
        }
        Ok(())
    }

    /// All nodes with content, with their world matrices, parents before
    /// children
    pub fn drawables(&self) -> Vec<Drawable<'_>> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root(), Matrix4::identity())];

        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get(id.0).and_then(Option::as_ref) else {
                continue;
            };
            let world = parent_world * node.local_matrix();
            if let Some(content) = &node.content {
                out.push(Drawable {
                    node: id,
                    world,
                    content,
                });
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }

        out
    }

    fn mutable_node(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        if id == self.root() {
            return Err(SceneError::RootImmutable);
        }
        self.node_mut(id)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignError;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_matrix_chains_parents() {
        let mut scene = Scene::new();
        let arm = scene.add_node(scene.root(), "arm").unwrap();
        let forearm = scene.add_node(arm, "forearm").unwrap();
        scene.set_position(forearm, Vector3::new(0.0, 120.0, 0.0)).unwrap();
        scene
            .set_rotation(arm, RotationState::from_degrees(0.0, 0.0, 90.0))
            .unwrap();

        let tip = scene
            .world_point(forearm, &Point3::new(0.0, 80.0, 0.0))
            .unwrap();
        assert_relative_eq!(tip, Point3::new(-200.0, 0.0, 0.0), epsilon = 1e-3);
    }

    #[test]
    fn test_matrix_override_ignores_position() {
        let mut scene = Scene::new();
        let node = scene.add_node(scene.root(), "pinned").unwrap();
        scene.set_matrix(node, Transform::translation_matrix(1.0, 2.0, 3.0)).unwrap();
        scene.set_position(node, Vector3::new(100.0, 0.0, 0.0)).unwrap();

        let p = scene.world_point(node, &Point3::origin()).unwrap();
        assert_relative_eq!(p, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_root_is_immutable() {
        let mut scene = Scene::new();
        let root = scene.root();
        assert_eq!(
            scene.set_position(root, Vector3::x()),
            Err(SceneError::RootImmutable)
        );
        assert_eq!(scene.remove_subtree(root), Err(SceneError::RootImmutable));
    }

    #[test]
    fn test_remove_subtree() {
        let mut scene = Scene::new();
        let group = scene.add_node(scene.root(), "group").unwrap();
        let child = scene
            .add_mesh(group, "box", Mesh::cube(1.0), Material::new(Color::RED))
            .unwrap();
        assert_eq!(scene.len(), 3);

        scene.remove_subtree(group).unwrap();
        assert_eq!(scene.len(), 1);
        assert!(scene.is_empty());
        assert_eq!(scene.node(child).unwrap_err(), SceneError::UnknownNode(child));
        assert!(scene.find("group").is_none());
        assert!(scene.drawables().is_empty());
    }

    #[test]
    fn test_clear_children_keeps_parent() {
        let mut scene = Scene::new();
        let helpers = scene.add_node(scene.root(), "helpers").unwrap();
        scene.add_node(helpers, "a").unwrap();
        scene.add_node(helpers, "b").unwrap();

        scene.clear_children(helpers).unwrap();
        assert!(scene.node(helpers).unwrap().children().is_empty());
        assert_eq!(scene.find("helpers"), Some(helpers));
    }

    #[test]
    fn test_drawables_parent_first() {
        let mut scene = Scene::new();
        let material = Material::new(Color::GRAY);
        let parent = scene
            .add_mesh(scene.root(), "parent", Mesh::cube(1.0), material)
            .unwrap();
        scene.set_position(parent, Vector3::new(0.0, 10.0, 0.0)).unwrap();
        let child = scene.add_mesh(parent, "child", Mesh::cube(1.0), material).unwrap();
        scene.set_position(child, Vector3::new(5.0, 0.0, 0.0)).unwrap();

        let drawables = scene.drawables();
        assert_eq!(drawables.len(), 2);
        assert_eq!(drawables[0].node, parent);
        assert_eq!(drawables[1].node, child);
        let origin = drawables[1].world.transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(5.0, 10.0, 0.0));
    }

    #[test]
    fn test_cylinder_from_ends_node() {
        let mut scene = Scene::new();
        let params = CylinderParams::new(50.0, 0.0, 0.0);
        let id = scene
            .add_cylinder_from_ends(
                scene.root(),
                "red",
                &params,
                Point3::new(300.0, 0.0, 0.0),
                Point3::origin(),
                Material::new(Color::RED),
            )
            .unwrap();

        let tip = scene.world_point(id, &Point3::new(0.0, 150.0, 0.0)).unwrap();
        assert_relative_eq!(tip, Point3::new(300.0, 0.0, 0.0), epsilon = 1e-3);

        let p = Point3::new(1.0, 1.0, 1.0);
        let err = scene
            .add_cylinder_from_ends(scene.root(), "bad", &params, p, p, Material::new(Color::RED))
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::Geometry(GeometryError::Align(AlignError::DegenerateSegment { .. }))
        ));
    }
}
