use openxr as xr;
use tracing::{info, warn};
use walkthrough_xr::{
    ControllerHandle, ControllerIndex, GripHandle, XrError, XrEvent, XrResult, XrRuntime,
};

use crate::actions::{locate, ControllerActions};
use crate::{identity_pose, is_presenting_state};

/// Runtime bound to a host-owned OpenXR session.
///
/// The host forwards session state changes and the predicted display time of
/// each frame; controller state is sampled when the viewer polls.
pub struct OpenXrRuntime<G: xr::Graphics> {
    session: xr::Session<G>,
    actions: ControllerActions,
    base_space: xr::Space,
    view_space: xr::Space,
    display_time: Option<xr::Time>,
    presenting: bool,
    pending: Vec<XrEvent>,
}

impl<G: xr::Graphics> OpenXrRuntime<G> {
    pub fn new(
        instance: &xr::Instance,
        session: xr::Session<G>,
        reference: xr::ReferenceSpaceType,
    ) -> XrResult<Self> {
        let actions = ControllerActions::new(instance, &session)?;
        let base_space = session
            .create_reference_space(reference, identity_pose())
            .map_err(|e| XrError::Runtime(format!("OpenXR reference space: {e:?}")))?;
        let view_space = session
            .create_reference_space(xr::ReferenceSpaceType::VIEW, identity_pose())
            .map_err(|e| XrError::Runtime(format!("OpenXR view space: {e:?}")))?;

        Ok(Self {
            session,
            actions,
            base_space,
            view_space,
            display_time: None,
            presenting: false,
            pending: Vec::new(),
        })
    }

    pub fn session(&self) -> &xr::Session<G> {
        &self.session
    }

    /// Feed a `SessionStateChanged` state from the host's event pump.
    pub fn on_session_state(&mut self, state: xr::SessionState) {
        let presenting = is_presenting_state(state);
        if presenting != self.presenting {
            info!("OpenXR session {:?}, presenting={}", state, presenting);
            self.presenting = presenting;
            self.pending.push(XrEvent::PresentationChanged { presenting });
        }
    }

    /// Predicted display time of the frame about to be rendered.
    pub fn set_display_time(&mut self, time: xr::Time) {
        self.display_time = Some(time);
    }
}

fn handle_id(index: ControllerIndex, grip: bool) -> u64 {
    ((index.as_usize() as u64) << 1) | u64::from(grip)
}

impl<G: xr::Graphics> XrRuntime for OpenXrRuntime<G> {
    fn controller(&mut self, index: ControllerIndex) -> ControllerHandle {
        ControllerHandle {
            index,
            id: handle_id(index, false),
        }
    }

    fn controller_grip(&mut self, index: ControllerIndex) -> GripHandle {
        GripHandle {
            index,
            id: handle_id(index, true),
        }
    }

    fn is_presenting(&self) -> bool {
        self.presenting
    }

    fn poll_events(&mut self) -> XrResult<Vec<XrEvent>> {
        let mut events = std::mem::take(&mut self.pending);
        let Some(time) = self.display_time else {
            return Ok(events);
        };
        if !self.presenting {
            return Ok(events);
        }

        if let Err(err) = self
            .actions
            .poll(&self.session, &self.base_space, time, &mut events)
        {
            warn!("controller poll failed: {}", err);
        }
        if let Some(pose) = locate(&self.view_space, &self.base_space, time) {
            events.push(XrEvent::HeadPose { pose });
        }
        Ok(events)
    }
}
