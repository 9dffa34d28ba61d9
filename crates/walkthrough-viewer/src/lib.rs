//! Walkthrough viewer core.
//!
//! A [`SessionContext`] owns every piece of mutable session state (scene,
//! controllers, watchdog, modality, panel, label) and is only mutated through
//! [`SessionContext::dispatch`] and [`SessionContext::tick`]. The async
//! [`Viewer`] driver serialises runtime events, timer fires, background asset
//! results and frame ticks onto that one context.

#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod controllers;
pub mod driver;
pub mod error;
pub mod events;
pub mod gaze;
pub mod label;
pub mod modality;
pub mod panel;
pub mod render;
pub mod resources;
pub mod rig;
pub mod scene;
pub mod session;
pub mod watchdog;

pub use assets::{AssetLoader, FsAssetLoader};
pub use config::ViewerConfig;
pub use driver::{Viewer, ViewerHandle};
pub use error::{ViewerError, ViewerResult};
pub use events::{Effect, ViewerEvent};
pub use gaze::{dwell_gaze_factory, GazeController, GazeFactory};
pub use label::{BlockTextBuilder, LabelBuilder, LabelStyle};
pub use modality::InputModality;
pub use panel::{PanelConfig, TextInput};
pub use render::{FrameRenderer, HeadlessRenderer};
pub use session::{Collaborators, SessionContext, SessionSummary};
