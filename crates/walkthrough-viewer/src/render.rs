//! Frame rendering seam and the stats overlay.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use crate::scene::{NodeId, SceneGraph};

const SAMPLE_COUNT: usize = 60;
const LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Draws the scene from `camera`. Called exactly once per tick.
pub trait FrameRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: NodeId);

    fn frames(&self) -> u64;
}

/// Renderer with no output device. Counts frames and what would be drawn.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    last_visible: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible nodes in the most recent frame.
    pub fn last_visible(&self) -> usize {
        self.last_visible
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn render(&mut self, scene: &SceneGraph, camera: NodeId) {
        self.frames += 1;
        self.last_visible = scene
            .descendants(scene.root())
            .into_iter()
            .filter(|id| scene.is_visible(*id))
            .count();
        trace!(
            "frame {} from camera {:?}: {} visible nodes",
            self.frames,
            camera,
            self.last_visible
        );
    }

    fn frames(&self) -> u64 {
        self.frames
    }
}

/// Rolling frame-time statistics.
#[derive(Debug)]
pub struct FrameStats {
    frame_times: VecDeque<Duration>,
    since_log: Duration,
    frames: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(SAMPLE_COUNT),
            since_log: Duration::ZERO,
            frames: 0,
        }
    }

    pub fn update(&mut self, delta: Duration) {
        self.frames += 1;
        self.frame_times.push_back(delta);
        if self.frame_times.len() > SAMPLE_COUNT {
            self.frame_times.pop_front();
        }

        self.since_log += delta;
        if self.since_log >= LOG_INTERVAL {
            self.since_log = Duration::ZERO;
            debug!(
                "fps {:.1} (avg frame {:.2}ms)",
                self.fps(),
                self.average().as_secs_f32() * 1000.0
            );
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn average(&self) -> Duration {
        if self.frame_times.is_empty() {
            return Duration::ZERO;
        }
        self.frame_times.iter().sum::<Duration>() / self.frame_times.len() as u32
    }

    pub fn fps(&self) -> f32 {
        let avg = self.average().as_secs_f32();
        if avg > 0.0 {
            1.0 / avg
        } else {
            0.0
        }
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
