//! Controller registry: the two fixed tracked-controller slots.

use glam::Vec3;
use tracing::{debug, info};
use walkthrough_xr::{
    ControllerHandle, ControllerIndex, GripHandle, Pose, XrRuntime, CONTROLLER_COUNT,
};

use crate::resources::{Geometry, GeometryId, ResourceRegistry};
use crate::scene::{NodeId, NodeKind, Ray, SceneGraph, Transform};

#[derive(Debug, Clone)]
pub struct ControllerSlot {
    pub index: ControllerIndex,
    pub controller: ControllerHandle,
    pub grip: GripHandle,
    /// Aim-space node; the ray visual hangs off it.
    pub node: NodeId,
    pub ray: NodeId,
    pub grip_node: NodeId,
    pub grip_model: NodeId,
    pub select_pressed: bool,
    pub connected: bool,
    pub profile: Option<String>,
}

#[derive(Debug)]
pub struct ControllerRegistry {
    slots: [ControllerSlot; CONTROLLER_COUNT],
    ray_geometry: GeometryId,
}

/// Ray visual pointing down -Z with unit length; node scale sets its extent.
fn ray_transform(length: f32) -> Transform {
    let mut transform = Transform::IDENTITY;
    transform.scale.z = length;
    transform
}

/// Acquire both controller slots from the runtime and parent their visuals
/// under `parent`.
///
/// Slots whose device never connects stay inert.
pub fn build_controllers(
    runtime: &mut dyn XrRuntime,
    scene: &mut SceneGraph,
    resources: &mut ResourceRegistry,
    parent: NodeId,
) -> ControllerRegistry {
    let ray_geometry = resources.add_geometry(Geometry::Line {
        points: vec![Vec3::ZERO, Vec3::NEG_Z],
    });

    let slots = ControllerIndex::ALL.map(|index| {
        let controller = runtime.controller(index);
        let node = scene.add(
            parent,
            format!("controller-{}", index.as_usize()),
            NodeKind::Group,
            Transform::IDENTITY,
        );
        let ray = scene.add(
            node,
            "ray",
            NodeKind::Line {
                geometry: ray_geometry,
            },
            ray_transform(0.0),
        );

        let grip = runtime.controller_grip(index);
        let grip_node = scene.add(
            parent,
            format!("controller-grip-{}", index.as_usize()),
            NodeKind::Group,
            Transform::IDENTITY,
        );
        let grip_model = scene.add(
            grip_node,
            "controller-model",
            NodeKind::ControllerModel { profile: None },
            Transform::IDENTITY,
        );

        ControllerSlot {
            index,
            controller,
            grip,
            node,
            ray,
            grip_node,
            grip_model,
            select_pressed: false,
            connected: false,
            profile: None,
        }
    });

    debug!("built {} controller slots", slots.len());
    ControllerRegistry {
        slots,
        ray_geometry,
    }
}

impl ControllerRegistry {
    pub fn slot(&self, index: ControllerIndex) -> &ControllerSlot {
        &self.slots[index.as_usize()]
    }

    fn slot_mut(&mut self, index: ControllerIndex) -> &mut ControllerSlot {
        &mut self.slots[index.as_usize()]
    }

    pub fn slots(&self) -> &[ControllerSlot; CONTROLLER_COUNT] {
        &self.slots
    }

    pub fn ray_geometry(&self) -> GeometryId {
        self.ray_geometry
    }

    pub fn any_connected(&self) -> bool {
        self.slots.iter().any(|slot| slot.connected)
    }

    pub fn on_select_start(&mut self, index: ControllerIndex) {
        self.slot_mut(index).select_pressed = true;
    }

    pub fn on_select_end(&mut self, index: ControllerIndex) {
        self.slot_mut(index).select_pressed = false;
    }

    /// Mark a slot connected and resolve its grip model from the reported
    /// profile. Returns `true` on the slot's transition to connected.
    pub fn on_connected(
        &mut self,
        index: ControllerIndex,
        profile: Option<String>,
        scene: &mut SceneGraph,
    ) -> bool {
        let slot = self.slot_mut(index);
        let newly = !slot.connected;
        slot.connected = true;
        slot.profile = profile.clone();
        if let Some(node) = scene.node_mut(slot.grip_model) {
            node.kind = NodeKind::ControllerModel { profile };
        }
        if newly {
            info!(
                "controller {} connected ({})",
                index.as_usize(),
                slot.profile.as_deref().unwrap_or("unknown profile")
            );
        }
        newly
    }

    pub fn on_disconnected(&mut self, index: ControllerIndex, scene: &mut SceneGraph) {
        let slot = self.slot_mut(index);
        if slot.connected {
            info!("controller {} disconnected", index.as_usize());
        }
        slot.connected = false;
        slot.select_pressed = false;
        let ray = slot.ray;
        scene.set_transform(ray, ray_transform(0.0));
    }

    pub fn set_aim_pose(&self, index: ControllerIndex, pose: &Pose, scene: &mut SceneGraph) {
        scene.set_transform(self.slot(index).node, Transform::from_pose(pose));
    }

    pub fn set_grip_pose(&self, index: ControllerIndex, pose: &Pose, scene: &mut SceneGraph) {
        scene.set_transform(self.slot(index).grip_node, Transform::from_pose(pose));
    }

    pub fn set_ray_length(&self, index: ControllerIndex, length: f32, scene: &mut SceneGraph) {
        scene.set_transform(self.slot(index).ray, ray_transform(length.max(0.0)));
    }

    pub fn aim_ray(&self, index: ControllerIndex, scene: &SceneGraph) -> Ray {
        scene.forward_ray(self.slot(index).node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walkthrough_xr::HeadlessRuntime;

    fn registry() -> (ControllerRegistry, SceneGraph, NodeId) {
        let (mut runtime, _handle) = HeadlessRuntime::new();
        let mut scene = SceneGraph::new();
        let mut resources = ResourceRegistry::new();
        let dolly = scene.add(scene.root(), "dolly", NodeKind::Group, Transform::IDENTITY);
        let registry = build_controllers(&mut runtime, &mut scene, &mut resources, dolly);
        (registry, scene, dolly)
    }

    #[test]
    fn test_two_slots_parented_under_dolly() {
        let (registry, scene, dolly) = registry();
        assert_eq!(registry.slots().len(), 2);
        for slot in registry.slots() {
            assert_eq!(scene.parent(slot.node), Some(dolly));
            assert_eq!(scene.parent(slot.grip_node), Some(dolly));
            assert_eq!(scene.parent(slot.ray), Some(slot.node));
            assert!(!slot.connected);
            assert!(!slot.select_pressed);
        }
        assert_eq!(registry.slot(ControllerIndex::Secondary).index, ControllerIndex::Secondary);
    }

    #[test]
    fn test_ray_visual_starts_zero_length() {
        let (registry, scene, _) = registry();
        let ray = scene.node(registry.slot(ControllerIndex::Primary).ray).unwrap();
        assert_eq!(ray.transform.scale.z, 0.0);
        assert!(matches!(ray.kind, NodeKind::Line { geometry } if geometry == registry.ray_geometry()));
    }

    #[test]
    fn test_select_only_touches_addressed_slot() {
        let (mut registry, _, _) = registry();
        registry.on_select_start(ControllerIndex::Primary);
        assert!(registry.slot(ControllerIndex::Primary).select_pressed);
        assert!(!registry.slot(ControllerIndex::Secondary).select_pressed);

        registry.on_select_start(ControllerIndex::Secondary);
        registry.on_select_end(ControllerIndex::Primary);
        assert!(!registry.slot(ControllerIndex::Primary).select_pressed);
        assert!(registry.slot(ControllerIndex::Secondary).select_pressed);
    }

    #[test]
    fn test_connect_resolves_grip_model() {
        let (mut registry, mut scene, _) = registry();
        assert!(registry.on_connected(
            ControllerIndex::Secondary,
            Some("oculus-touch".to_string()),
            &mut scene
        ));
        assert!(registry.any_connected());

        let slot = registry.slot(ControllerIndex::Secondary);
        let model = scene.node(slot.grip_model).unwrap();
        assert_eq!(
            model.kind,
            NodeKind::ControllerModel {
                profile: Some("oculus-touch".to_string())
            }
        );

        // A repeated connect is not a new transition.
        assert!(!registry.on_connected(
            ControllerIndex::Secondary,
            Some("oculus-touch".to_string()),
            &mut scene
        ));
    }

    #[test]
    fn test_disconnect_clears_press() {
        let (mut registry, mut scene, _) = registry();
        registry.on_connected(ControllerIndex::Primary, None, &mut scene);
        registry.on_select_start(ControllerIndex::Primary);
        registry.set_ray_length(ControllerIndex::Primary, 2.5, &mut scene);

        registry.on_disconnected(ControllerIndex::Primary, &mut scene);
        let slot = registry.slot(ControllerIndex::Primary);
        assert!(!slot.connected);
        assert!(!slot.select_pressed);
        assert_eq!(scene.node(slot.ray).unwrap().transform.scale.z, 0.0);
    }

    #[test]
    fn test_aim_ray_follows_pose() {
        let (registry, mut scene, _) = registry();
        registry.set_aim_pose(ControllerIndex::Primary, &Pose::at(0.2, 1.0, -0.3), &mut scene);
        let ray = registry.aim_ray(ControllerIndex::Primary, &scene);
        assert!((ray.origin - Vec3::new(0.2, 1.0, -0.3)).length() < 1e-5);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
    }
}
