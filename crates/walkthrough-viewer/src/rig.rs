use tracing::debug;
use walkthrough_xr::Pose;

use crate::config::RigConfig;
use crate::scene::{CameraParams, HemisphereLight, NodeId, NodeKind, SceneGraph, Transform};

const AMBIENT_SKY: u32 = 0xFFFFFF;
const AMBIENT_GROUND: u32 = 0xAAAAAA;
const AMBIENT_INTENSITY: f32 = 0.8;

/// Viewer rig: a dolly carrying the camera, and a forward proxy on the camera
/// that gaze interaction aims from.
#[derive(Debug, Clone, Copy)]
pub struct CameraRig {
    pub dolly: NodeId,
    pub camera: NodeId,
    pub proxy: NodeId,
    pub light: NodeId,
    camera_height: f32,
}

impl CameraRig {
    pub fn build(scene: &mut SceneGraph, config: &RigConfig) -> Self {
        let root = scene.root();
        let dolly = scene.add(
            root,
            "dolly",
            NodeKind::Group,
            Transform::from_array(config.dolly_position),
        );
        let camera = scene.add(
            dolly,
            "camera",
            NodeKind::Camera(CameraParams {
                fov_deg: config.fov_deg,
                near: config.near,
                far: config.far,
            }),
            Transform::at(0.0, config.camera_height, 0.0),
        );
        let proxy = scene.add(camera, "dummyCam", NodeKind::Group, Transform::IDENTITY);
        let light = scene.add(
            root,
            "ambient",
            NodeKind::Light(HemisphereLight {
                sky: AMBIENT_SKY,
                ground: AMBIENT_GROUND,
                intensity: AMBIENT_INTENSITY,
            }),
            Transform::IDENTITY,
        );
        debug!("camera rig built at {:?}", config.dolly_position);

        Self {
            dolly,
            camera,
            proxy,
            light,
            camera_height: config.camera_height,
        }
    }

    /// Head pose from the runtime, relative to the dolly.
    pub fn apply_head_pose(&self, scene: &mut SceneGraph, pose: &Pose) {
        scene.set_transform(self.camera, Transform::from_pose(pose));
    }

    /// Back to the standing, non-tracked camera placement.
    pub fn reset_head(&self, scene: &mut SceneGraph) {
        scene.set_transform(self.camera, Transform::at(0.0, self.camera_height, 0.0));
    }
}
