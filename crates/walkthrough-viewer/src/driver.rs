//! Async driver: one loop, one session.
//!
//! Runtime events, timer fires, background results and frame ticks all reach
//! the [`SessionContext`] through this loop, so the session is never touched
//! from two places at once. Decoding and label building run on blocking
//! workers and report back over the event channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::assets::AssetLoader;
use crate::events::{Effect, ViewerEvent};
use crate::label::LabelBuilder;
use crate::panel::TextInput;
use crate::session::{SessionContext, SessionSummary};
use crate::{ViewerError, ViewerResult};

/// Sends events into a running [`Viewer`].
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    tx: mpsc::UnboundedSender<ViewerEvent>,
}

impl ViewerHandle {
    /// Returns `false` once the viewer has stopped.
    pub fn send(&self, event: ViewerEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.send(ViewerEvent::Shutdown)
    }

    /// Screen-button submit with the current text input contents.
    pub fn display_name(&self, input: Option<String>) -> bool {
        self.send(ViewerEvent::DisplayNameClicked { input })
    }

    pub fn panel_input(&self, input: TextInput) -> bool {
        self.send(ViewerEvent::PanelInput(input))
    }

    pub fn panel_submit(&self) -> bool {
        self.send(ViewerEvent::PanelSubmit)
    }
}

pub struct Viewer {
    session: SessionContext,
    rx: mpsc::UnboundedReceiver<ViewerEvent>,
    effects: EffectRunner,
}

/// Carries out session effects on the runtime.
struct EffectRunner {
    tx: mpsc::UnboundedSender<ViewerEvent>,
    assets: Arc<dyn AssetLoader>,
    labels: Arc<dyn LabelBuilder>,
    watchdog: Option<AbortHandle>,
}

impl Viewer {
    pub fn new(
        session: SessionContext,
        assets: Arc<dyn AssetLoader>,
        labels: Arc<dyn LabelBuilder>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session,
            rx,
            effects: EffectRunner {
                tx,
                assets,
                labels,
                watchdog: None,
            },
        }
    }

    pub fn handle(&self) -> ViewerHandle {
        ViewerHandle {
            tx: self.effects.tx.clone(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Run until [`ViewerEvent::Shutdown`].
    pub async fn run(self) -> SessionSummary {
        let Viewer {
            mut session,
            mut rx,
            mut effects,
        } = self;

        let frame_interval = session.config().xr.frame_interval();
        let mut frames = time::interval(frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_frame: Option<Instant> = None;

        info!("viewer {} starting", session.id());
        effects.apply(session.start());

        loop {
            tokio::select! {
                biased;

                event = rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    if matches!(event, ViewerEvent::Shutdown) {
                        info!("viewer shutdown requested");
                        break;
                    }
                    effects.apply(session.dispatch(event));
                }

                now = frames.tick(), if session.animation_armed() => {
                    let delta = last_frame.map_or(frame_interval, |last| now - last);
                    last_frame = Some(now);
                    effects.apply(session.frame(delta));
                }
            }
        }

        effects.cancel_watchdog();
        let summary = session.summary();
        session.shutdown();
        summary
    }
}

impl EffectRunner {
    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::LoadEnvironment(path) => {
                    let loader = self.assets.clone();
                    self.spawn_job(
                        move || loader.load_environment(&path),
                        ViewerEvent::EnvironmentLoaded,
                    );
                }
                Effect::LoadModel(path) => {
                    let loader = self.assets.clone();
                    self.spawn_job(move || loader.load_model(&path), ViewerEvent::ModelLoaded);
                }
                Effect::BuildLabel(request) => {
                    let builder = self.labels.clone();
                    let id = request.id;
                    self.spawn_job(
                        move || builder.build(&request.text, &request.style),
                        move |result| ViewerEvent::LabelBuilt {
                            request: id,
                            result,
                        },
                    );
                }
                Effect::ArmWatchdog {
                    generation,
                    deadline,
                } => self.arm_watchdog(generation, deadline),
                Effect::CancelWatchdog => self.cancel_watchdog(),
            }
        }
    }

    /// Run `job` on a blocking worker and post its result back to the loop.
    fn spawn_job<T, F, W>(&self, job: F, wrap: W)
    where
        T: Send + 'static,
        F: FnOnce() -> ViewerResult<T> + Send + 'static,
        W: FnOnce(ViewerResult<T>) -> ViewerEvent + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(job).await {
                Ok(result) => result,
                Err(err) => Err(ViewerError::Task(err.to_string())),
            };
            if tx.send(wrap(result)).is_err() {
                debug!("viewer stopped before background job finished");
            }
        });
    }

    fn arm_watchdog(&mut self, generation: u64, deadline: Duration) {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            time::sleep(deadline).await;
            let _ = tx.send(ViewerEvent::WatchdogFired { generation });
        });
        if let Some(previous) = self.watchdog.replace(task.abort_handle()) {
            warn!("replacing a live watchdog timer");
            previous.abort();
        }
    }

    fn cancel_watchdog(&mut self) {
        if let Some(timer) = self.watchdog.take() {
            timer.abort();
            debug!("watchdog timer aborted");
        }
    }
}
