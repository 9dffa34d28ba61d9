use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use walkthrough_viewer::assets::{EnvironmentMap, ModelData};
use walkthrough_viewer::gaze::GazeActivation;
use walkthrough_viewer::panel::TextEntryPanel;
use walkthrough_viewer::scene::{NodeId, SceneGraph};
use walkthrough_viewer::{
    dwell_gaze_factory, AssetLoader, BlockTextBuilder, Collaborators, Effect, GazeController,
    GazeFactory, HeadlessRenderer, InputModality, SessionContext, SessionSummary, TextInput,
    Viewer, ViewerConfig, ViewerError, ViewerEvent, ViewerResult,
};
use walkthrough_xr::{ControllerIndex, HeadlessHandle, HeadlessRuntime, Pose, XrEvent};

struct MemoryAssets {
    model: Option<ModelData>,
}

impl AssetLoader for MemoryAssets {
    fn load_environment(&self, path: &Path) -> ViewerResult<EnvironmentMap> {
        Ok(EnvironmentMap {
            source: path.to_path_buf(),
            byte_len: 0,
        })
    }

    fn load_model(&self, _path: &Path) -> ViewerResult<ModelData> {
        self.model
            .clone()
            .ok_or_else(|| ViewerError::Asset("model unavailable".to_string()))
    }
}

struct IdleGaze;

impl GazeController for IdleGaze {
    fn update(
        &mut self,
        _scene: &SceneGraph,
        _panel: &TextEntryPanel,
        _delta: Duration,
    ) -> Option<GazeActivation> {
        None
    }
}

fn counting_factory() -> (GazeFactory, Rc<Cell<usize>>) {
    let built = Rc::new(Cell::new(0));
    let counter = built.clone();
    let factory: GazeFactory = Box::new(move |_scene: &SceneGraph, _proxy: NodeId| {
        counter.set(counter.get() + 1);
        Some(Box::new(IdleGaze) as Box<dyn GazeController>)
    });
    (factory, built)
}

fn config(timeout_ms: u64) -> ViewerConfig {
    let mut config = ViewerConfig::default();
    config.xr.controller_timeout_ms = timeout_ms;
    config
}

fn viewer(
    config: ViewerConfig,
    runtime: HeadlessRuntime,
    gaze: GazeFactory,
    model: Option<ModelData>,
) -> Viewer {
    let session = SessionContext::new(
        config,
        Collaborators {
            runtime: Box::new(runtime),
            gaze,
            renderer: Box::new(HeadlessRenderer::new()),
        },
    );
    Viewer::new(
        session,
        Arc::new(MemoryAssets { model }),
        Arc::new(BlockTextBuilder),
    )
}

async fn run_for(viewer: Viewer, duration: Duration) -> SessionSummary {
    let handle = viewer.handle();
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        handle.shutdown();
    });
    viewer.run().await
}

fn headless() -> (HeadlessRuntime, HeadlessHandle) {
    HeadlessRuntime::new()
}

#[tokio::test]
async fn test_connect_before_deadline_selects_controllers() {
    let (runtime, xr) = headless();
    let (gaze, built) = counting_factory();
    xr.connect(ControllerIndex::Primary);

    let summary = run_for(
        viewer(config(200), runtime, gaze, Some(ModelData::default())),
        Duration::from_millis(500),
    )
    .await;

    assert_eq!(summary.modality, InputModality::Controller);
    assert_eq!(summary.connected, [true, false]);
    assert_eq!(built.get(), 0);
    assert_eq!(summary.gaze_controllers, 0);
}

#[tokio::test]
async fn test_connect_between_frames_wins_over_deadline() {
    let (runtime, xr) = headless();
    let (gaze, built) = counting_factory();
    // One frame per second: after the first frame, nothing polls the runtime
    // again before the deadline passes.
    let mut config = config(100);
    config.xr.frame_rate = 1;

    let viewer = viewer(config, runtime, gaze, Some(ModelData::default()));
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        xr.connect(ControllerIndex::Primary);
    });
    let summary = run_for(viewer, Duration::from_millis(400)).await;

    assert_eq!(summary.modality, InputModality::Controller);
    assert_eq!(built.get(), 0);
    assert_eq!(summary.gaze_controllers, 0);
    assert_eq!(summary.connected, [true, false]);
}

#[test]
fn test_fire_dispatched_before_any_frame_sees_delivered_connect() {
    let (runtime, xr) = headless();
    let (gaze, built) = counting_factory();
    let mut session = SessionContext::new(
        config(2000),
        Collaborators {
            runtime: Box::new(runtime),
            gaze,
            renderer: Box::new(HeadlessRenderer::new()),
        },
    );
    session.start();
    let generation = match session
        .dispatch(ViewerEvent::ModelLoaded(Ok(ModelData::default())))
        .as_slice()
    {
        [Effect::ArmWatchdog { generation, .. }] => *generation,
        other => panic!("expected watchdog arm, got {other:?}"),
    };

    xr.connect(ControllerIndex::Primary);
    let effects = session.dispatch(ViewerEvent::WatchdogFired { generation });

    assert_eq!(effects, vec![Effect::CancelWatchdog]);
    assert_eq!(session.modality(), InputModality::Controller);
    assert_eq!(built.get(), 0);
    assert_eq!(session.summary().connected, [true, false]);
}

#[tokio::test]
async fn test_no_connect_falls_back_to_gaze_once() {
    let (runtime, xr) = headless();
    let (gaze, built) = counting_factory();

    let viewer = viewer(config(50), runtime, gaze, Some(ModelData::default()));
    // A controller that shows up after the deadline does not undo the fallback.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        xr.connect(ControllerIndex::Secondary);
    });
    let summary = run_for(viewer, Duration::from_millis(400)).await;

    assert_eq!(summary.modality, InputModality::Gaze);
    assert_eq!(built.get(), 1);
    assert_eq!(summary.connected, [false, true]);
    assert!(summary.frames > 0);
}

#[tokio::test]
async fn test_modality_undecided_before_deadline() {
    let (runtime, _xr) = headless();
    let (gaze, built) = counting_factory();

    let summary = run_for(
        viewer(config(400), runtime, gaze, Some(ModelData::default())),
        Duration::from_millis(150),
    )
    .await;

    assert_eq!(summary.modality, InputModality::Undecided);
    assert_eq!(built.get(), 0);
}

#[tokio::test]
async fn test_model_failure_still_runs_render_loop() {
    let (runtime, _xr) = headless();
    let (gaze, built) = counting_factory();

    let summary = run_for(viewer(config(50), runtime, gaze, None), Duration::from_millis(300)).await;

    assert!(summary.frames > 0);
    assert_eq!(summary.modality, InputModality::Gaze);
    assert_eq!(built.get(), 1);
}

#[tokio::test]
async fn test_rapid_names_keep_latest_label() {
    let (runtime, _xr) = headless();
    let (gaze, _) = counting_factory();
    let viewer = viewer(config(2000), runtime, gaze, Some(ModelData::default()));

    let handle = viewer.handle();
    handle.display_name(Some("Ada".to_string()));
    handle.display_name(Some("Grace".to_string()));
    let summary = run_for(viewer, Duration::from_millis(300)).await;

    assert_eq!(summary.label.as_deref(), Some("Grace"));
    assert!(summary.panel_visible);
}

#[tokio::test]
async fn test_blank_names_are_ignored() {
    let (runtime, _xr) = headless();
    let (gaze, _) = counting_factory();
    let viewer = viewer(config(2000), runtime, gaze, Some(ModelData::default()));

    let handle = viewer.handle();
    handle.display_name(None);
    handle.display_name(Some(" \t ".to_string()));
    handle.panel_input(TextInput::Set("   ".to_string()));
    let summary = run_for(viewer, Duration::from_millis(200)).await;

    assert_eq!(summary.label, None);
    assert!(summary.panel_visible);
}

#[tokio::test]
async fn test_gaze_dwell_submits_panel() {
    let (runtime, xr) = HeadlessRuntime::presenting();
    let mut config = config(50);
    config.gaze.dwell_ms = 100;
    let gaze = dwell_gaze_factory(config.gaze.clone());
    let viewer = viewer(config, runtime, gaze, Some(ModelData::default()));

    // Look straight at the submit button from the dolly.
    xr.push(XrEvent::HeadPose {
        pose: Pose::at(0.0, 1.48, 0.0),
    });
    viewer.handle().panel_input(TextInput::Set("Ada".to_string()));
    let summary = run_for(viewer, Duration::from_millis(800)).await;

    assert_eq!(summary.modality, InputModality::Gaze);
    assert_eq!(summary.label.as_deref(), Some("Ada"));
    assert!(!summary.panel_visible);
}

#[tokio::test]
async fn test_controller_select_submits_panel() {
    let (runtime, xr) = headless();
    let (gaze, _) = counting_factory();
    let viewer = viewer(config(2000), runtime, gaze, Some(ModelData::default()));

    xr.connect(ControllerIndex::Primary);
    xr.push(XrEvent::ControllerPose {
        index: ControllerIndex::Primary,
        pose: Pose::at(0.0, 1.48, 0.0),
    });
    xr.press(ControllerIndex::Primary);
    xr.release(ControllerIndex::Primary);
    viewer.handle().panel_input(TextInput::Set("Grace".to_string()));
    let summary = run_for(viewer, Duration::from_millis(300)).await;

    assert_eq!(summary.modality, InputModality::Controller);
    assert_eq!(summary.label.as_deref(), Some("Grace"));
    assert!(!summary.panel_visible);
}
