use std::path::PathBuf;
use std::time::Duration;

use walkthrough_xr::XrEvent;

use crate::assets::{EnvironmentMap, ModelData};
use crate::label::{LabelRequest, TextGeometry};
use crate::panel::TextInput;
use crate::ViewerResult;

/// Everything that can reach the session. The driver delivers these one at a
/// time, in arrival order.
#[derive(Debug)]
pub enum ViewerEvent {
    EnvironmentLoaded(ViewerResult<EnvironmentMap>),
    ModelLoaded(ViewerResult<ModelData>),
    Xr(XrEvent),
    WatchdogFired {
        generation: u64,
    },
    PanelInput(TextInput),
    /// Submit the panel's text field, as the enter key would.
    PanelSubmit,
    PanelVisible(bool),
    TogglePanel,
    /// Screen button pressed. `input` is `None` when there is no text input
    /// element to read from.
    DisplayNameClicked {
        input: Option<String>,
    },
    LabelBuilt {
        request: u64,
        result: ViewerResult<TextGeometry>,
    },
    Shutdown,
}

/// Side effects the session asks the driver to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadEnvironment(PathBuf),
    LoadModel(PathBuf),
    ArmWatchdog { generation: u64, deadline: Duration },
    CancelWatchdog,
    BuildLabel(LabelRequest),
}
