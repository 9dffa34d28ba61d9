//! Viewer configuration.
//!
//! Every field has a default matching the stock walkthrough, so a config file
//! only needs to name what it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::label::LabelStyle;
use crate::panel::PanelConfig;
use crate::ViewerResult;

/// Default wait for a controller before falling back to gaze.
pub const DEFAULT_CONTROLLER_TIMEOUT_MS: u64 = 2000;
const DEFAULT_FRAME_RATE: u32 = 72;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    pub rig: RigConfig,
    pub xr: XrConfig,
    pub label: LabelStyle,
    pub gaze: GazeConfig,
    pub panel: PanelConfig,
}

impl ViewerConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> ViewerResult<Self> {
        match path {
            Some(path) => Ok(walkthrough_common::config::load_json(path)?),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: PathBuf,
    pub environment: PathBuf,
    pub model: PathBuf,
}

impl AssetConfig {
    pub fn environment_path(&self) -> PathBuf {
        self.root.join(&self.environment)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(&self.model)
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./assets/"),
            environment: PathBuf::from("hdr/venice_sunset_1k.hdr"),
            model: PathBuf::from("college.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub dolly_position: [f32; 3],
    pub camera_height: f32,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            dolly_position: [0.0, 0.0, 10.0],
            camera_height: 1.6,
            fov_deg: 60.0,
            near: 0.01,
            far: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XrConfig {
    /// How long to wait for a controller before switching to gaze.
    pub controller_timeout_ms: u64,
    pub frame_rate: u32,
}

impl XrConfig {
    pub fn controller_timeout(&self) -> Duration {
        Duration::from_millis(self.controller_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

impl Default for XrConfig {
    fn default() -> Self {
        Self {
            controller_timeout_ms: DEFAULT_CONTROLLER_TIMEOUT_MS,
            frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Time the gaze must rest on a control before it activates.
    pub dwell_ms: u64,
    pub max_distance: f32,
}

impl GazeConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 1500,
            max_distance: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.xr.controller_timeout(), Duration::from_millis(2000));
        assert_eq!(
            config.assets.environment_path(),
            PathBuf::from("./assets/hdr/venice_sunset_1k.hdr")
        );
        assert_eq!(config.rig.dolly_position, [0.0, 0.0, 10.0]);
        assert_eq!(config.label.size, 0.2);
    }

    #[test]
    fn test_partial_override() {
        let config: ViewerConfig = walkthrough_common::config::parse_json(
            r#"{"xr": {"controller_timeout_ms": 500}, "assets": {"root": "/srv/tour"}}"#,
        )
        .unwrap();
        assert_eq!(config.xr.controller_timeout(), Duration::from_millis(500));
        assert_eq!(config.xr.frame_rate, 72);
        assert_eq!(config.assets.model_path(), PathBuf::from("/srv/tour/college.json"));
    }

    #[test]
    fn test_frame_interval_guards_zero_rate() {
        let xr = XrConfig {
            frame_rate: 0,
            ..XrConfig::default()
        };
        assert_eq!(xr.frame_interval(), Duration::from_secs(1));
    }
}
