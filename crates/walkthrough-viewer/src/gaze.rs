//! Gaze interaction, used when no controller shows up in time.

use std::time::Duration;

use tracing::{debug, info};

use crate::config::GazeConfig;
use crate::panel::TextEntryPanel;
use crate::scene::{NodeId, SceneGraph};

/// A completed dwell on a panel control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GazeActivation {
    pub control: usize,
}

pub trait GazeController {
    /// Called once per presenting frame while gaze is the active modality.
    fn update(
        &mut self,
        scene: &SceneGraph,
        panel: &TextEntryPanel,
        delta: Duration,
    ) -> Option<GazeActivation>;
}

/// Builds the gaze controller once the fallback activates. Receives the scene
/// and the camera's forward proxy node; `None` means gaze interaction is
/// unavailable on this device.
pub type GazeFactory = Box<dyn FnMut(&SceneGraph, NodeId) -> Option<Box<dyn GazeController>>>;

pub fn dwell_gaze_factory(config: GazeConfig) -> GazeFactory {
    Box::new(move |scene: &SceneGraph, proxy: NodeId| {
        if !scene.contains(proxy) {
            return None;
        }
        Some(Box::new(DwellGazeController::new(proxy, &config)) as Box<dyn GazeController>)
    })
}

/// Activates whatever panel control the head ray rests on for `dwell`.
#[derive(Debug)]
pub struct DwellGazeController {
    proxy: NodeId,
    dwell: Duration,
    max_distance: f32,
    hovered: Option<usize>,
    elapsed: Duration,
    activated: bool,
}

impl DwellGazeController {
    pub fn new(proxy: NodeId, config: &GazeConfig) -> Self {
        info!("gaze controller active (dwell {:?})", config.dwell());
        Self {
            proxy,
            dwell: config.dwell(),
            max_distance: config.max_distance,
            hovered: None,
            elapsed: Duration::ZERO,
            activated: false,
        }
    }

    /// Control currently under the head ray.
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }
}

impl GazeController for DwellGazeController {
    fn update(
        &mut self,
        scene: &SceneGraph,
        panel: &TextEntryPanel,
        delta: Duration,
    ) -> Option<GazeActivation> {
        let ray = scene.forward_ray(self.proxy);
        let target = panel
            .hit_test(scene, &ray)
            .filter(|hit| hit.distance <= self.max_distance)
            .map(|hit| hit.control);

        if target != self.hovered {
            debug!("gaze target {:?} -> {:?}", self.hovered, target);
            self.hovered = target;
            self.elapsed = Duration::ZERO;
            self.activated = false;
            return None;
        }

        let control = target?;
        if self.activated {
            return None;
        }
        self.elapsed += delta;
        if self.elapsed >= self.dwell {
            self.activated = true;
            return Some(GazeActivation { control });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelConfig;
    use crate::scene::{NodeKind, Transform};
    use glam::Vec3;

    fn setup(eye_y: f32) -> (SceneGraph, TextEntryPanel, NodeId) {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let panel = TextEntryPanel::new(PanelConfig::default(), &mut scene, root);
        let proxy = scene.add(root, "proxy", NodeKind::Group, Transform::at(0.0, eye_y, 10.0));
        (scene, panel, proxy)
    }

    fn config() -> GazeConfig {
        GazeConfig {
            dwell_ms: 1000,
            max_distance: 10.0,
        }
    }

    #[test]
    fn test_dwell_activates_once() {
        let (scene, panel, proxy) = setup(1.48);
        let mut gaze = DwellGazeController::new(proxy, &config());
        let frame = Duration::from_millis(250);

        // First frame only acquires the target.
        assert_eq!(gaze.update(&scene, &panel, frame), None);
        let submit = panel.control_index("submit").unwrap();
        assert_eq!(gaze.hovered(), Some(submit));

        let mut activations = Vec::new();
        for _ in 0..10 {
            if let Some(a) = gaze.update(&scene, &panel, frame) {
                activations.push(a);
            }
        }
        assert_eq!(activations, vec![GazeActivation { control: submit }]);
    }

    #[test]
    fn test_looking_away_resets_dwell() {
        let (mut scene, panel, proxy) = setup(1.48);
        let mut gaze = DwellGazeController::new(proxy, &config());
        let frame = Duration::from_millis(400);

        gaze.update(&scene, &panel, frame);
        gaze.update(&scene, &panel, frame);
        scene.set_transform(proxy, Transform::at(5.0, 1.48, 10.0));
        assert_eq!(gaze.update(&scene, &panel, frame), None);
        assert_eq!(gaze.hovered(), None);

        scene.set_transform(proxy, Transform::at(0.0, 1.48, 10.0));
        gaze.update(&scene, &panel, frame);
        gaze.update(&scene, &panel, frame);
        assert_eq!(gaze.update(&scene, &panel, frame), None);
        assert!(gaze.update(&scene, &panel, frame).is_some());
    }

    #[test]
    fn test_factory_needs_proxy() {
        let (mut scene, _panel, proxy) = setup(1.48);
        let mut factory = dwell_gaze_factory(config());
        assert!(factory(&scene, proxy).is_some());
        scene.remove(proxy);
        assert!(factory(&scene, proxy).is_none());
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let (scene, panel, proxy) = setup(1.48);
        let near = GazeConfig {
            max_distance: 1.0,
            ..config()
        };
        let mut gaze = DwellGazeController::new(proxy, &near);
        for _ in 0..10 {
            assert_eq!(gaze.update(&scene, &panel, Duration::from_secs(1)), None);
        }
        assert_eq!(gaze.hovered(), None);
        assert!(scene.world_position(proxy).distance(Vec3::new(0.0, 1.48, 8.5)) > 1.0);
    }
}
