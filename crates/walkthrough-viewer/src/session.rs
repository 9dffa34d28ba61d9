//! Session context: the single owner of mutable viewer state.
//!
//! Nothing here blocks or awaits. Each event is resolved against the current
//! state and may return [`Effect`]s for the driver to carry out.

use std::time::Duration;

use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkthrough_xr::{ControllerIndex, XrEvent, XrRuntime};

use crate::assets::{import_model, ImportedModel};
use crate::config::ViewerConfig;
use crate::controllers::{build_controllers, ControllerRegistry};
use crate::events::{Effect, ViewerEvent};
use crate::gaze::{GazeController, GazeFactory};
use crate::label::NameLabelRenderer;
use crate::modality::{InputModality, ModalityCell};
use crate::panel::{PanelOutcome, TextEntryPanel};
use crate::render::{FrameRenderer, FrameStats};
use crate::resources::ResourceRegistry;
use crate::rig::CameraRig;
use crate::scene::SceneGraph;
use crate::watchdog::Watchdog;

/// Pluggable pieces the session drives but does not implement.
pub struct Collaborators {
    pub runtime: Box<dyn XrRuntime>,
    pub gaze: GazeFactory,
    pub renderer: Box<dyn FrameRenderer>,
}

/// End-of-session snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub modality: InputModality,
    pub gaze_controllers: usize,
    pub frames: u64,
    pub label: Option<String>,
    pub connected: [bool; 2],
    pub panel_visible: bool,
}

pub struct SessionContext {
    id: Uuid,
    config: ViewerConfig,
    scene: SceneGraph,
    resources: ResourceRegistry,
    rig: CameraRig,
    runtime: Box<dyn XrRuntime>,
    controllers: Option<ControllerRegistry>,
    watchdog: Watchdog,
    modality: ModalityCell,
    gaze_factory: GazeFactory,
    gaze: Option<Box<dyn GazeController>>,
    gaze_constructed: usize,
    panel: TextEntryPanel,
    label: NameLabelRenderer,
    renderer: Box<dyn FrameRenderer>,
    stats: FrameStats,
    model: Option<ImportedModel>,
    loading: bool,
    animation_armed: bool,
}

impl SessionContext {
    pub fn new(config: ViewerConfig, collaborators: Collaborators) -> Self {
        let mut scene = SceneGraph::new();
        let rig = CameraRig::build(&mut scene, &config.rig);
        let root = scene.root();
        let panel = TextEntryPanel::new(config.panel.clone(), &mut scene, root);
        let id = Uuid::new_v4();
        info!("session {} created", id);

        Self {
            id,
            watchdog: Watchdog::new(config.xr.controller_timeout()),
            label: NameLabelRenderer::new(config.label.clone()),
            config,
            scene,
            resources: ResourceRegistry::new(),
            rig,
            runtime: collaborators.runtime,
            controllers: None,
            modality: ModalityCell::default(),
            gaze_factory: collaborators.gaze,
            gaze: None,
            gaze_constructed: 0,
            panel,
            renderer: collaborators.renderer,
            stats: FrameStats::new(),
            model: None,
            loading: false,
            animation_armed: false,
        }
    }

    /// Kick off asset loading.
    pub fn start(&mut self) -> Vec<Effect> {
        self.loading = true;
        vec![
            Effect::LoadEnvironment(self.config.assets.environment_path()),
            Effect::LoadModel(self.config.assets.model_path()),
        ]
    }

    pub fn dispatch(&mut self, event: ViewerEvent) -> Vec<Effect> {
        match event {
            ViewerEvent::EnvironmentLoaded(Ok(map)) => {
                info!("environment map {} applied", map.source.display());
                self.scene.set_environment(map);
                Vec::new()
            }
            ViewerEvent::EnvironmentLoaded(Err(err)) => {
                error!("An error occurred setting the environment: {}", err);
                Vec::new()
            }
            ViewerEvent::ModelLoaded(result) => {
                self.loading = false;
                match result {
                    Ok(data) => {
                        let model = import_model(&mut self.scene, &mut self.resources, &data);
                        self.model = Some(model);
                    }
                    Err(err) => error!("walkthrough model failed to load: {}", err),
                }
                self.setup_xr()
            }
            ViewerEvent::Xr(event) => self.on_xr_event(event),
            ViewerEvent::WatchdogFired { generation } => self.on_watchdog_fired(generation),
            ViewerEvent::PanelInput(input) => {
                self.panel.apply_input(input);
                Vec::new()
            }
            ViewerEvent::PanelSubmit => self.submit_panel(),
            ViewerEvent::PanelVisible(visible) => {
                self.panel.set_visible(&mut self.scene, visible);
                Vec::new()
            }
            ViewerEvent::TogglePanel => {
                self.panel.toggle_visible(&mut self.scene);
                Vec::new()
            }
            ViewerEvent::DisplayNameClicked { input } => self.on_display_name(input),
            ViewerEvent::LabelBuilt { request, result } => {
                let outcome = self.label.complete(
                    request,
                    result,
                    &mut self.scene,
                    &mut self.resources,
                    self.rig.camera,
                );
                debug!("label build {} -> {:?}", request, outcome);
                Vec::new()
            }
            ViewerEvent::Shutdown => {
                debug!("shutdown reached the session");
                Vec::new()
            }
        }
    }

    /// Wire controllers, arm the watchdog and start the animation loop.
    /// Runs once; later calls are no-ops.
    fn setup_xr(&mut self) -> Vec<Effect> {
        if self.controllers.is_some() {
            return Vec::new();
        }
        let registry = build_controllers(
            self.runtime.as_mut(),
            &mut self.scene,
            &mut self.resources,
            self.rig.dolly,
        );
        self.controllers = Some(registry);
        self.animation_armed = true;

        let mut effects = Vec::new();
        if let Some(generation) = self.watchdog.arm() {
            info!(
                "waiting {:?} for a controller before falling back to gaze",
                self.watchdog.deadline()
            );
            effects.push(Effect::ArmWatchdog {
                generation,
                deadline: self.watchdog.deadline(),
            });
        }
        effects
    }

    fn on_xr_event(&mut self, event: XrEvent) -> Vec<Effect> {
        let Some(controllers) = self.controllers.as_mut() else {
            debug!("runtime event before controller setup: {:?}", event);
            return Vec::new();
        };

        match event {
            XrEvent::Connected { index, profile } => {
                controllers.on_connected(index, profile, &mut self.scene);
                let mut effects = Vec::new();
                if self.watchdog.cancel() {
                    effects.push(Effect::CancelWatchdog);
                }
                if self.modality.decide(InputModality::Controller) {
                    info!("input modality: {}", InputModality::Controller);
                } else if self.modality.get() == InputModality::Gaze {
                    info!("controller {} connected after gaze fallback", index.as_usize());
                }
                effects
            }
            XrEvent::Disconnected { index } => {
                controllers.on_disconnected(index, &mut self.scene);
                Vec::new()
            }
            XrEvent::SelectStart { index } => {
                controllers.on_select_start(index);
                self.select_panel(index)
            }
            XrEvent::SelectEnd { index } => {
                controllers.on_select_end(index);
                Vec::new()
            }
            XrEvent::ControllerPose { index, pose } => {
                controllers.set_aim_pose(index, &pose, &mut self.scene);
                let ray = controllers.aim_ray(index, &self.scene);
                let length = self
                    .panel
                    .hit_test(&self.scene, &ray)
                    .map_or(0.0, |hit| hit.distance);
                controllers.set_ray_length(index, length, &mut self.scene);
                Vec::new()
            }
            XrEvent::GripPose { index, pose } => {
                controllers.set_grip_pose(index, &pose, &mut self.scene);
                Vec::new()
            }
            XrEvent::HeadPose { pose } => {
                self.rig.apply_head_pose(&mut self.scene, &pose);
                Vec::new()
            }
            XrEvent::PresentationChanged { presenting } => {
                info!("presentation {}", if presenting { "started" } else { "ended" });
                if !presenting {
                    self.rig.reset_head(&mut self.scene);
                }
                Vec::new()
            }
        }
    }

    fn select_panel(&mut self, index: ControllerIndex) -> Vec<Effect> {
        let Some(controllers) = self.controllers.as_ref() else {
            return Vec::new();
        };
        let ray = controllers.aim_ray(index, &self.scene);
        match self.panel.hit_test(&self.scene, &ray) {
            Some(hit) => self.activate_control(hit.control),
            None => Vec::new(),
        }
    }

    fn activate_control(&mut self, control: usize) -> Vec<Effect> {
        match self.panel.activate(control, &mut self.scene) {
            PanelOutcome::Committed(text) => vec![Effect::BuildLabel(self.label.request(text))],
            PanelOutcome::Focused | PanelOutcome::Ignored => Vec::new(),
        }
    }

    fn submit_panel(&mut self) -> Vec<Effect> {
        if !self.panel.is_visible() {
            return Vec::new();
        }
        match self.panel.submit(&mut self.scene) {
            Some(text) => vec![Effect::BuildLabel(self.label.request(text))],
            None => Vec::new(),
        }
    }

    /// A connect the runtime already delivered must cancel the watchdog
    /// before the fire is evaluated, so drain pending runtime events first.
    fn on_watchdog_fired(&mut self, generation: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        for event in self.poll_runtime() {
            effects.extend(self.on_xr_event(event));
        }

        let Some(elapsed) = self.watchdog.fire(generation) else {
            debug!("ignoring watchdog fire for generation {}", generation);
            return effects;
        };
        if !self.modality.decide(InputModality::Gaze) {
            return effects;
        }
        info!("no controller after {:?}; input modality: {}", elapsed, InputModality::Gaze);
        if self.gaze.is_some() {
            return effects;
        }
        self.gaze = (self.gaze_factory)(&self.scene, self.rig.proxy);
        if self.gaze.is_some() {
            self.gaze_constructed += 1;
        } else {
            warn!("gaze interaction unavailable");
        }
        effects
    }

    fn on_display_name(&mut self, input: Option<String>) -> Vec<Effect> {
        let Some(input) = input else {
            return Vec::new();
        };
        let text = input.trim();
        if text.is_empty() {
            return Vec::new();
        }
        vec![Effect::BuildLabel(self.label.request(text))]
    }

    /// One animation frame: drain runtime events, then tick.
    pub fn frame(&mut self, delta: Duration) -> Vec<Effect> {
        let mut effects = Vec::new();
        for event in self.poll_runtime() {
            effects.extend(self.on_xr_event(event));
        }
        effects.extend(self.tick(delta));
        effects
    }

    fn poll_runtime(&mut self) -> Vec<XrEvent> {
        match self.runtime.poll_events() {
            Ok(events) => events,
            Err(err) => {
                warn!("runtime poll failed: {}", err);
                Vec::new()
            }
        }
    }

    /// Per-frame update: gaze (when presenting in gaze mode), stats, and
    /// exactly one render.
    pub fn tick(&mut self, delta: Duration) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.runtime.is_presenting() && self.modality.get() == InputModality::Gaze {
            let activation = match self.gaze.as_mut() {
                Some(gaze) => gaze.update(&self.scene, &self.panel, delta),
                None => None,
            };
            if let Some(activation) = activation {
                effects = self.activate_control(activation.control);
            }
        }
        self.stats.update(delta);
        self.renderer.render(&self.scene, self.rig.camera);
        effects
    }

    /// Release what the session still holds.
    pub fn shutdown(&mut self) {
        self.label.release(&mut self.scene, &mut self.resources);
        info!("session {} closed after {} frames", self.id, self.renderer.frames());
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn controllers(&self) -> Option<&ControllerRegistry> {
        self.controllers.as_ref()
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn modality(&self) -> InputModality {
        self.modality.get()
    }

    pub fn gaze_constructed(&self) -> usize {
        self.gaze_constructed
    }

    pub fn panel(&self) -> &TextEntryPanel {
        &self.panel
    }

    pub fn label(&self) -> &NameLabelRenderer {
        &self.label
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn model(&self) -> Option<&ImportedModel> {
        self.model.as_ref()
    }

    /// True until the model load resolves either way.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn animation_armed(&self) -> bool {
        self.animation_armed
    }

    pub fn summary(&self) -> SessionSummary {
        let connected = self
            .controllers
            .as_ref()
            .map(|c| ControllerIndex::ALL.map(|index| c.slot(index).connected))
            .unwrap_or([false; 2]);
        SessionSummary {
            session_id: self.id,
            modality: self.modality.get(),
            gaze_controllers: self.gaze_constructed,
            frames: self.renderer.frames(),
            label: self.label.current().map(|l| l.text.clone()),
            connected,
            panel_visible: self.panel.is_visible(),
        }
    }
}
