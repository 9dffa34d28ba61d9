use crate::{
    types::{ControllerHandle, ControllerIndex, GripHandle, XrEvent},
    XrResult,
};

/// The rendering/XR runtime as seen by the viewer.
///
/// Handles stay valid for the whole session whether or not a physical device
/// ever connects. Events are pulled once per frame by the viewer loop, which
/// is the only place session state is mutated.
pub trait XrRuntime {
    fn controller(&mut self, index: ControllerIndex) -> ControllerHandle;
    fn controller_grip(&mut self, index: ControllerIndex) -> GripHandle;

    /// True while an immersive session is presenting.
    fn is_presenting(&self) -> bool;

    /// Drain events produced since the previous call.
    fn poll_events(&mut self) -> XrResult<Vec<XrEvent>>;
}
