use serde::{Deserialize, Serialize};

/// Number of tracked input controllers a session exposes.
pub const CONTROLLER_COUNT: usize = 2;

/// One of the two fixed controller slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerIndex {
    Primary = 0,
    Secondary = 1,
}

impl ControllerIndex {
    pub const ALL: [ControllerIndex; CONTROLLER_COUNT] =
        [ControllerIndex::Primary, ControllerIndex::Secondary];

    pub fn as_usize(self) -> usize {
        self as usize
    }

    pub fn other(self) -> Self {
        match self {
            ControllerIndex::Primary => ControllerIndex::Secondary,
            ControllerIndex::Secondary => ControllerIndex::Primary,
        }
    }
}

impl TryFrom<usize> for ControllerIndex {
    type Error = ();

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ControllerIndex::Primary),
            1 => Ok(ControllerIndex::Secondary),
            _ => Err(()),
        }
    }
}

/// Runtime-side identity of a controller's aim space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControllerHandle {
    pub index: ControllerIndex,
    pub id: u64,
}

/// Runtime-side identity of a controller's grip space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GripHandle {
    pub index: ControllerIndex,
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: [0.0; 3],
        orientation: [0.0, 0.0, 0.0, 1.0],
    };

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: [x, y, z],
            ..Self::IDENTITY
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Events the XR runtime dispatches to the viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum XrEvent {
    Connected {
        index: ControllerIndex,
        /// Interaction profile reported by the runtime, when known.
        profile: Option<String>,
    },
    Disconnected {
        index: ControllerIndex,
    },
    SelectStart {
        index: ControllerIndex,
    },
    SelectEnd {
        index: ControllerIndex,
    },
    /// Aim pose of a controller, relative to the rig.
    ControllerPose {
        index: ControllerIndex,
        pose: Pose,
    },
    /// Grip pose of a controller, relative to the rig.
    GripPose {
        index: ControllerIndex,
        pose: Pose,
    },
    /// Viewer head pose, relative to the rig.
    HeadPose {
        pose: Pose,
    },
    PresentationChanged {
        presenting: bool,
    },
}

impl XrEvent {
    pub fn controller_index(&self) -> Option<ControllerIndex> {
        match self {
            XrEvent::Connected { index, .. }
            | XrEvent::Disconnected { index }
            | XrEvent::SelectStart { index }
            | XrEvent::SelectEnd { index }
            | XrEvent::ControllerPose { index, .. }
            | XrEvent::GripPose { index, .. } => Some(*index),
            XrEvent::HeadPose { .. } | XrEvent::PresentationChanged { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_index_roundtrip() {
        for index in ControllerIndex::ALL {
            assert_eq!(ControllerIndex::try_from(index.as_usize()), Ok(index));
        }
        assert!(ControllerIndex::try_from(2).is_err());
    }

    #[test]
    fn test_controller_index_other() {
        assert_eq!(ControllerIndex::Primary.other(), ControllerIndex::Secondary);
        assert_eq!(ControllerIndex::Secondary.other(), ControllerIndex::Primary);
    }

    #[test]
    fn test_event_controller_index() {
        let event = XrEvent::SelectStart {
            index: ControllerIndex::Secondary,
        };
        assert_eq!(event.controller_index(), Some(ControllerIndex::Secondary));
        assert_eq!(
            XrEvent::PresentationChanged { presenting: true }.controller_index(),
            None
        );
    }
}
