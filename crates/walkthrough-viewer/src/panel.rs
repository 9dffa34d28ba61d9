//! In-world text entry panel: a text field plus a submit control.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scene::{NodeId, NodeKind, Ray, SceneGraph, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Input,
    Button,
}

/// What selecting a control does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelAction {
    Focus,
    Submit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ControlKind,
    #[serde(default)]
    pub label: Option<String>,
    pub font_size: f32,
    pub width: f32,
    pub height: f32,
    /// Centre of the control in panel space (metres, y up).
    pub position: [f32; 2],
    #[serde(default = "default_background")]
    pub background_color: u32,
    #[serde(default = "default_font_color")]
    pub font_color: u32,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub on_select: Option<PanelAction>,
}

fn default_background() -> u32 {
    0x000000
}

fn default_font_color() -> u32 {
    0xffffff
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub width: f32,
    pub height: f32,
    /// World position of the panel centre. The panel faces +Z.
    pub position: [f32; 3],
    pub visible: bool,
    pub controls: Vec<ControlConfig>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: 1.2,
            height: 0.5,
            position: [0.0, 1.6, 8.5],
            visible: true,
            controls: vec![
                ControlConfig {
                    id: "name".to_string(),
                    kind: ControlKind::Input,
                    label: None,
                    font_size: 0.06,
                    width: 1.0,
                    height: 0.15,
                    position: [0.0, 0.1],
                    background_color: 0xffffff,
                    font_color: 0x000000,
                    placeholder: Some("Enter your name".to_string()),
                    on_select: Some(PanelAction::Focus),
                },
                ControlConfig {
                    id: "submit".to_string(),
                    kind: ControlKind::Button,
                    label: Some("Submit".to_string()),
                    font_size: 0.05,
                    width: 0.4,
                    height: 0.12,
                    position: [0.0, -0.12],
                    background_color: 0x1bf5af,
                    font_color: 0x000000,
                    placeholder: None,
                    on_select: Some(PanelAction::Submit),
                },
            ],
        }
    }
}

/// Keystroke-level edits to the text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput {
    Char(char),
    Backspace,
    Clear,
    /// Replace the whole value, e.g. from a system keyboard.
    Set(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextEntryState {
    pub current_value: String,
    pub visible: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelHit {
    pub control: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOutcome {
    Ignored,
    Focused,
    Committed(String),
}

#[derive(Debug)]
pub struct TextEntryPanel {
    config: PanelConfig,
    node: NodeId,
    state: TextEntryState,
}

impl TextEntryPanel {
    pub fn new(config: PanelConfig, scene: &mut SceneGraph, parent: NodeId) -> Self {
        let node = scene.add(
            parent,
            "text-entry-panel",
            NodeKind::Panel,
            Transform::from_array(config.position),
        );
        scene.set_visible(node, config.visible);
        let state = TextEntryState {
            visible: config.visible,
            ..TextEntryState::default()
        };
        Self {
            config,
            node,
            state,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn state(&self) -> &TextEntryState {
        &self.state
    }

    pub fn value(&self) -> &str {
        &self.state.current_value
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn set_visible(&mut self, scene: &mut SceneGraph, visible: bool) {
        self.state.visible = visible;
        if !visible {
            self.state.focused = false;
        }
        scene.set_visible(self.node, visible);
    }

    pub fn toggle_visible(&mut self, scene: &mut SceneGraph) {
        let visible = !self.state.visible;
        self.set_visible(scene, visible);
    }

    fn input_control(&self) -> Option<&ControlConfig> {
        self.config
            .controls
            .iter()
            .find(|c| c.kind == ControlKind::Input)
    }

    /// Field text as drawn: the value, or the placeholder while empty.
    pub fn display_text(&self) -> &str {
        if self.state.current_value.is_empty() {
            self.input_control()
                .and_then(|c| c.placeholder.as_deref())
                .unwrap_or("")
        } else {
            &self.state.current_value
        }
    }

    /// Keystrokes only land while the field is focused; `Set` always does.
    pub fn apply_input(&mut self, input: TextInput) {
        match input {
            TextInput::Set(value) => self.state.current_value = value,
            _ if !(self.state.focused && self.state.visible) => {
                debug!("dropping keystroke, text field not focused");
            }
            TextInput::Char(c) => self.state.current_value.push(c),
            TextInput::Backspace => {
                self.state.current_value.pop();
            }
            TextInput::Clear => self.state.current_value.clear(),
        }
    }

    /// Run a control's `on_select` action.
    pub fn activate(&mut self, control: usize, scene: &mut SceneGraph) -> PanelOutcome {
        if !self.state.visible {
            return PanelOutcome::Ignored;
        }
        let action = self.config.controls.get(control).and_then(|c| c.on_select);
        match action {
            Some(PanelAction::Focus) => {
                self.state.focused = true;
                PanelOutcome::Focused
            }
            Some(PanelAction::Submit) => match self.submit(scene) {
                Some(text) => PanelOutcome::Committed(text),
                None => PanelOutcome::Ignored,
            },
            None => PanelOutcome::Ignored,
        }
    }

    /// Commit the field. Blank input commits nothing and leaves the panel up.
    pub fn submit(&mut self, scene: &mut SceneGraph) -> Option<String> {
        let text = self.state.current_value.trim();
        if text.is_empty() {
            debug!("ignoring empty panel submit");
            return None;
        }
        let text = text.to_string();
        info!("panel committed {:?}", text);
        self.set_visible(scene, false);
        Some(text)
    }

    /// Intersect a world ray with the panel's controls.
    pub fn hit_test(&self, scene: &SceneGraph, ray: &Ray) -> Option<PanelHit> {
        if !self.state.visible || !scene.is_visible(self.node) {
            return None;
        }
        let world = scene.world_matrix(self.node);
        let inverse = world.inverse();
        let origin = inverse.transform_point3(ray.origin);
        let direction = inverse.transform_vector3(ray.direction);
        if direction.z.abs() < 1e-6 {
            return None;
        }
        let t = -origin.z / direction.z;
        if t < 0.0 {
            return None;
        }
        let local = origin + direction * t;
        if local.x.abs() > self.config.width / 2.0 || local.y.abs() > self.config.height / 2.0 {
            return None;
        }

        let control = self.config.controls.iter().position(|c| {
            (local.x - c.position[0]).abs() <= c.width / 2.0
                && (local.y - c.position[1]).abs() <= c.height / 2.0
        })?;
        let distance = (world.transform_point3(Vec3::new(local.x, local.y, 0.0)) - ray.origin)
            .length();
        Some(PanelHit { control, distance })
    }

    pub fn control_index(&self, id: &str) -> Option<usize> {
        self.config.controls.iter().position(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> (TextEntryPanel, SceneGraph) {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let panel = TextEntryPanel::new(PanelConfig::default(), &mut scene, root);
        (panel, scene)
    }

    fn ray_at(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn test_placeholder_when_empty() {
        let (mut panel, _) = panel();
        assert_eq!(panel.display_text(), "Enter your name");
        panel.apply_input(TextInput::Set("Ada".to_string()));
        assert_eq!(panel.display_text(), "Ada");
    }

    #[test]
    fn test_keystrokes_require_focus() {
        let (mut panel, mut scene) = panel();
        panel.apply_input(TextInput::Char('A'));
        assert_eq!(panel.value(), "");

        let field = panel.control_index("name").unwrap();
        assert_eq!(panel.activate(field, &mut scene), PanelOutcome::Focused);
        for c in "Adx".chars() {
            panel.apply_input(TextInput::Char(c));
        }
        panel.apply_input(TextInput::Backspace);
        assert_eq!(panel.value(), "Ad");
        panel.apply_input(TextInput::Clear);
        assert_eq!(panel.value(), "");
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let (mut panel, mut scene) = panel();
        panel.apply_input(TextInput::Set("   \t".to_string()));
        assert_eq!(panel.submit(&mut scene), None);
        assert!(panel.is_visible());
        assert!(scene.is_visible(panel.node()));
    }

    #[test]
    fn test_submit_trims_and_hides() {
        let (mut panel, mut scene) = panel();
        panel.apply_input(TextInput::Set("  Ada ".to_string()));
        assert_eq!(panel.submit(&mut scene), Some("Ada".to_string()));
        assert!(!panel.is_visible());
        assert!(!scene.is_visible(panel.node()));
    }

    #[test]
    fn test_activate_submit_button() {
        let (mut panel, mut scene) = panel();
        let submit = panel.control_index("submit").unwrap();
        assert_eq!(panel.activate(submit, &mut scene), PanelOutcome::Ignored);
        assert!(panel.is_visible());

        panel.apply_input(TextInput::Set("Grace".to_string()));
        assert_eq!(
            panel.activate(submit, &mut scene),
            PanelOutcome::Committed("Grace".to_string())
        );
        // Hidden panels take no further activations.
        assert_eq!(panel.activate(submit, &mut scene), PanelOutcome::Ignored);
    }

    #[test]
    fn test_toggle_visibility() {
        let (mut panel, mut scene) = panel();
        panel.toggle_visible(&mut scene);
        assert!(!panel.is_visible());
        panel.toggle_visible(&mut scene);
        assert!(panel.is_visible());
    }

    #[test]
    fn test_hit_test_finds_controls() {
        let (panel, scene) = panel();
        let field = panel.hit_test(&scene, &ray_at(0.0, 1.7)).unwrap();
        assert_eq!(field.control, panel.control_index("name").unwrap());
        assert!((field.distance - 1.5).abs() < 1e-4);

        let button = panel.hit_test(&scene, &ray_at(0.0, 1.48)).unwrap();
        assert_eq!(button.control, panel.control_index("submit").unwrap());
    }

    #[test]
    fn test_hit_test_misses() {
        let (mut panel, mut scene) = panel();
        // Off the panel entirely.
        assert!(panel.hit_test(&scene, &ray_at(2.0, 1.6)).is_none());
        // Pointing away.
        let away = Ray::new(Vec3::new(0.0, 1.6, 10.0), Vec3::Z);
        assert!(panel.hit_test(&scene, &away).is_none());
        // Hidden.
        panel.set_visible(&mut scene, false);
        assert!(panel.hit_test(&scene, &ray_at(0.0, 1.7)).is_none());
    }
}
