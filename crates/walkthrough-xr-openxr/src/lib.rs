//! OpenXR implementation of [`walkthrough_xr::XrRuntime`].
//!
//! The host owns instance/session creation and the frame loop; this crate
//! binds controller actions on an existing session and turns their state into
//! viewer events.

pub mod actions;
pub mod runtime;

pub use actions::{ControllerActions, HandState};
pub use runtime::OpenXrRuntime;

use openxr as xr;
use walkthrough_xr::Pose;

pub fn to_pose(pose: xr::Posef) -> Pose {
    Pose {
        position: [pose.position.x, pose.position.y, pose.position.z],
        orientation: [
            pose.orientation.x,
            pose.orientation.y,
            pose.orientation.z,
            pose.orientation.w,
        ],
    }
}

pub(crate) fn identity_pose() -> xr::Posef {
    xr::Posef {
        orientation: xr::Quaternionf {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        },
        position: xr::Vector3f {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
    }
}

/// Presentation is live once the compositor shows our frames.
pub fn is_presenting_state(state: xr::SessionState) -> bool {
    matches!(
        state,
        xr::SessionState::VISIBLE | xr::SessionState::FOCUSED
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presenting_states() {
        assert!(is_presenting_state(xr::SessionState::FOCUSED));
        assert!(is_presenting_state(xr::SessionState::VISIBLE));
        assert!(!is_presenting_state(xr::SessionState::READY));
        assert!(!is_presenting_state(xr::SessionState::STOPPING));
    }

    #[test]
    fn test_to_pose_copies_components() {
        let mut pose = identity_pose();
        pose.position.y = 1.6;
        pose.orientation.w = 0.5;
        let converted = to_pose(pose);
        assert_eq!(converted.position, [0.0, 1.6, 0.0]);
        assert_eq!(converted.orientation[3], 0.5);
    }
}
