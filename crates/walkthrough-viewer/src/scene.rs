//! Scene graph: an arena of parented nodes.
//!
//! Freed slots are reused, but every reuse bumps the slot generation, so a
//! stale id simply resolves to nothing.

use glam::{Affine3A, Quat, Vec3};
use walkthrough_xr::Pose;

use crate::assets::EnvironmentMap;
use crate::resources::{GeometryId, MaterialId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    pub fn from_array(position: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from_array(position),
            ..Self::IDENTITY
        }
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Self {
            translation: Vec3::from_array(pose.position),
            rotation: Quat::from_array(pose.orientation).normalize(),
            scale: Vec3::ONE,
        }
    }

    pub fn matrix(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraParams {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky: u32,
    pub ground: u32,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group,
    Camera(CameraParams),
    Light(HemisphereLight),
    Mesh {
        geometry: GeometryId,
        material: MaterialId,
    },
    Line {
        geometry: GeometryId,
    },
    /// Visual model of a tracked controller; `profile` is filled in once
    /// the device reports what it is.
    ControllerModel {
        profile: Option<String>,
    },
    Panel,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A ray in world space. `direction` is normalised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    environment: Option<EnvironmentMap>,
}

impl SceneGraph {
    pub fn new() -> Self {
        let root = Node {
            name: "Scene".to_string(),
            kind: NodeKind::Group,
            transform: Transform::IDENTITY,
            visible: true,
            parent: None,
            children: Vec::new(),
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(root),
            }],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            environment: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn add(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        kind: NodeKind,
        transform: Transform,
    ) -> NodeId {
        let node = Node {
            name: name.into(),
            kind,
            transform,
            visible: true,
            parent: None,
            children: Vec::new(),
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };
        self.attach(id, parent);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// Move `child` under `parent`, detaching it from any previous parent.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) {
        if child == parent || !self.contains(parent) || self.is_descendant_of(parent, child) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        } else {
            return;
        }
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(child);
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(old_parent) = self.parent(child) else {
            return;
        };
        if let Some(parent_node) = self.node_mut(old_parent) {
            parent_node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
    }

    /// Remove a node and its subtree. Returns the removed nodes so the caller
    /// can release whatever resources they referenced.
    pub fn remove(&mut self, id: NodeId) -> Vec<Node> {
        if id == self.root || !self.contains(id) {
            return Vec::new();
        }
        self.detach(id);
        let mut removed = Vec::new();
        for node_id in self.descendants(id) {
            let slot = &mut self.slots[node_id.index as usize];
            if let Some(node) = slot.node.take() {
                self.free.push(node_id.index);
                removed.push(node);
            }
        }
        removed
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.node(next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find_in(self.root, name)
    }

    pub fn find_in(&self, subtree: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(subtree)
            .into_iter()
            .find(|id| self.node(*id).is_some_and(|n| n.name == name))
    }

    pub fn world_matrix(&self, id: NodeId) -> Affine3A {
        let mut matrix = Affine3A::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.node(node_id) else {
                break;
            };
            matrix = node.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id).transform_point3(Vec3::ZERO)
    }

    /// Ray from the node's world origin along its local -Z.
    pub fn forward_ray(&self, id: NodeId) -> Ray {
        let matrix = self.world_matrix(id);
        Ray::new(
            matrix.transform_point3(Vec3::ZERO),
            matrix.transform_vector3(Vec3::NEG_Z),
        )
    }

    /// Visible only if the node and every ancestor are visible.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.node(node_id) {
                Some(node) if node.visible => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(node) = self.node_mut(id) {
            node.visible = visible;
        }
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Transform) {
        if let Some(node) = self.node_mut(id) {
            node.transform = transform;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn environment(&self) -> Option<&EnvironmentMap> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, environment: EnvironmentMap) {
        self.environment = Some(environment);
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut scene = SceneGraph::new();
        let dolly = scene.add(scene.root(), "dolly", NodeKind::Group, Transform::at(0.0, 0.0, 10.0));
        let camera = scene.add(dolly, "camera", NodeKind::Group, Transform::at(0.0, 1.6, 0.0));
        assert!(approx(scene.world_position(camera), Vec3::new(0.0, 1.6, 10.0)));
    }

    #[test]
    fn test_attach_reparents() {
        let mut scene = SceneGraph::new();
        let a = scene.add(scene.root(), "a", NodeKind::Group, Transform::IDENTITY);
        let b = scene.add(scene.root(), "b", NodeKind::Group, Transform::IDENTITY);
        let child = scene.add(a, "child", NodeKind::Group, Transform::IDENTITY);

        scene.attach(child, b);
        assert_eq!(scene.parent(child), Some(b));
        assert!(scene.children(a).is_empty());
        assert_eq!(scene.children(b), &[child]);
    }

    #[test]
    fn test_attach_refuses_cycles() {
        let mut scene = SceneGraph::new();
        let a = scene.add(scene.root(), "a", NodeKind::Group, Transform::IDENTITY);
        let b = scene.add(a, "b", NodeKind::Group, Transform::IDENTITY);
        scene.attach(a, b);
        assert_eq!(scene.parent(a), Some(scene.root()));
    }

    #[test]
    fn test_remove_takes_subtree() {
        let mut scene = SceneGraph::new();
        let a = scene.add(scene.root(), "a", NodeKind::Group, Transform::IDENTITY);
        let b = scene.add(a, "b", NodeKind::Group, Transform::IDENTITY);
        let before = scene.len();

        let removed = scene.remove(a);
        assert_eq!(removed.len(), 2);
        assert!(!scene.contains(b));
        assert_eq!(scene.len(), before - 2);
        assert!(scene.remove(a).is_empty());
    }

    #[test]
    fn test_removed_slots_are_reused_with_fresh_ids() {
        let mut scene = SceneGraph::new();
        let old = scene.add(scene.root(), "label", NodeKind::Group, Transform::IDENTITY);
        let capacity = scene.slots.len();

        for _ in 0..5 {
            let label = scene.find_by_name("label").unwrap();
            scene.remove(label);
            scene.add(scene.root(), "label", NodeKind::Group, Transform::IDENTITY);
        }
        assert_eq!(scene.slots.len(), capacity);

        let current = scene.find_by_name("label").unwrap();
        assert_ne!(current, old);
        assert!(!scene.contains(old));
        assert!(scene.node(old).is_none());
        assert_eq!(scene.children(scene.root()), &[current]);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        assert!(scene.remove(root).is_empty());
        assert!(scene.contains(root));
    }

    #[test]
    fn test_visibility_inherits() {
        let mut scene = SceneGraph::new();
        let a = scene.add(scene.root(), "a", NodeKind::Group, Transform::IDENTITY);
        let b = scene.add(a, "b", NodeKind::Group, Transform::IDENTITY);
        scene.set_visible(a, false);
        assert!(!scene.is_visible(b));
        scene.set_visible(a, true);
        assert!(scene.is_visible(b));
    }

    #[test]
    fn test_forward_ray_points_down_negative_z() {
        let mut scene = SceneGraph::new();
        let eye = scene.add(scene.root(), "eye", NodeKind::Group, Transform::at(1.0, 2.0, 3.0));
        let ray = scene.forward_ray(eye);
        assert!(approx(ray.origin, Vec3::new(1.0, 2.0, 3.0)));
        assert!(approx(ray.direction, Vec3::NEG_Z));
        assert!(approx(ray.at(2.0), Vec3::new(1.0, 2.0, 1.0)));
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = SceneGraph::new();
        let a = scene.add(scene.root(), "LobbyShop", NodeKind::Group, Transform::IDENTITY);
        assert_eq!(scene.find_by_name("LobbyShop"), Some(a));
        assert_eq!(scene.find_by_name("missing"), None);
    }
}
