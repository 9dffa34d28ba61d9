use openxr as xr;
use tracing::{debug, warn};
use walkthrough_xr::{ControllerIndex, XrError, XrEvent, XrResult, CONTROLLER_COUNT};

use crate::{identity_pose, to_pose};

pub const SELECT_PRESS_THRESHOLD: f32 = 0.8;
pub const SELECT_RELEASE_THRESHOLD: f32 = 0.6;

/// Edge tracker for one hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandState {
    pub active: bool,
    pub pressed: bool,
}

impl HandState {
    /// Fold the latest sampled state into events.
    ///
    /// `profile` is only queried when the hand becomes active.
    pub fn advance(
        &mut self,
        index: ControllerIndex,
        active: bool,
        pressed: bool,
        profile: impl FnOnce() -> Option<String>,
        out: &mut Vec<XrEvent>,
    ) {
        if active && !self.active {
            out.push(XrEvent::Connected {
                index,
                profile: profile(),
            });
        }
        if !active {
            if self.active {
                if self.pressed {
                    out.push(XrEvent::SelectEnd { index });
                }
                out.push(XrEvent::Disconnected { index });
            }
            *self = HandState::default();
            return;
        }
        if pressed != self.pressed {
            out.push(if pressed {
                XrEvent::SelectStart { index }
            } else {
                XrEvent::SelectEnd { index }
            });
        }
        self.active = true;
        self.pressed = pressed;
    }
}

/// Trigger value with hysteresis so a resting finger does not chatter.
pub fn select_pressed(was_pressed: bool, click: bool, value: f32) -> bool {
    if click {
        return true;
    }
    if was_pressed {
        value >= SELECT_RELEASE_THRESHOLD
    } else {
        value >= SELECT_PRESS_THRESHOLD
    }
}

pub struct ControllerActions {
    instance: xr::Instance,
    action_set: xr::ActionSet,
    select: xr::Action<bool>,
    select_value: xr::Action<f32>,
    aim: xr::Action<xr::Posef>,
    grip: xr::Action<xr::Posef>,
    paths: [xr::Path; CONTROLLER_COUNT],
    aim_spaces: Vec<xr::Space>,
    grip_spaces: Vec<xr::Space>,
    hands: [HandState; CONTROLLER_COUNT],
}

impl ControllerActions {
    pub fn new<G: xr::Graphics>(
        instance: &xr::Instance,
        session: &xr::Session<G>,
    ) -> XrResult<Self> {
        let action_set = instance
            .create_action_set("walkthrough", "Walkthrough", 0)
            .map_err(|e| XrError::Runtime(format!("OpenXR action set: {e:?}")))?;

        let left = instance
            .string_to_path("/user/hand/left")
            .map_err(|e| XrError::Runtime(format!("OpenXR path left: {e:?}")))?;
        let right = instance
            .string_to_path("/user/hand/right")
            .map_err(|e| XrError::Runtime(format!("OpenXR path right: {e:?}")))?;
        let paths = [left, right];

        let select = action_set
            .create_action::<bool>("select", "Select", &paths)
            .map_err(|e| XrError::Runtime(format!("OpenXR action select: {e:?}")))?;
        let select_value = action_set
            .create_action::<f32>("select_value", "Select Value", &paths)
            .map_err(|e| XrError::Runtime(format!("OpenXR action select_value: {e:?}")))?;
        let aim = action_set
            .create_action::<xr::Posef>("aim", "Aim", &paths)
            .map_err(|e| XrError::Runtime(format!("OpenXR action aim: {e:?}")))?;
        let grip = action_set
            .create_action::<xr::Posef>("grip", "Grip", &paths)
            .map_err(|e| XrError::Runtime(format!("OpenXR action grip: {e:?}")))?;

        for profile in [
            "/interaction_profiles/khr/simple_controller",
            "/interaction_profiles/oculus/touch_controller",
            "/interaction_profiles/valve/index_controller",
            "/interaction_profiles/microsoft/motion_controller",
            "/interaction_profiles/htc/vive_controller",
        ] {
            let profile_path = instance
                .string_to_path(profile)
                .map_err(|e| XrError::Runtime(format!("OpenXR profile path: {e:?}")))?;
            let bindings =
                Self::bindings_for_profile(instance, profile, &select, &select_value, &aim, &grip);
            if let Err(err) = instance.suggest_interaction_profile_bindings(profile_path, &bindings)
            {
                warn!("OpenXR binding suggestion rejected for {}: {:?}", profile, err);
            }
        }

        session
            .attach_action_sets(&[&action_set])
            .map_err(|e| XrError::Runtime(format!("OpenXR attach actions: {e:?}")))?;

        let mut aim_spaces = Vec::with_capacity(CONTROLLER_COUNT);
        let mut grip_spaces = Vec::with_capacity(CONTROLLER_COUNT);
        for path in paths {
            aim_spaces.push(
                aim.create_space(session, path, identity_pose())
                    .map_err(|e| XrError::Runtime(format!("OpenXR aim space: {e:?}")))?,
            );
            grip_spaces.push(
                grip.create_space(session, path, identity_pose())
                    .map_err(|e| XrError::Runtime(format!("OpenXR grip space: {e:?}")))?,
            );
        }

        Ok(Self {
            instance: instance.clone(),
            action_set,
            select,
            select_value,
            aim,
            grip,
            paths,
            aim_spaces,
            grip_spaces,
            hands: [HandState::default(); CONTROLLER_COUNT],
        })
    }

    fn bindings_for_profile<'a>(
        instance: &'a xr::Instance,
        profile: &'a str,
        select: &'a xr::Action<bool>,
        select_value: &'a xr::Action<f32>,
        aim: &'a xr::Action<xr::Posef>,
        grip: &'a xr::Action<xr::Posef>,
    ) -> Vec<xr::Binding<'a>> {
        let mut bindings = Vec::with_capacity(8);
        macro_rules! bind {
            ($action:expr, $path:expr) => {
                if let Ok(path) = instance.string_to_path($path) {
                    bindings.push(xr::Binding::new($action, path));
                }
            };
        }

        for hand in ["left", "right"] {
            bind!(aim, &format!("/user/hand/{hand}/input/aim/pose"));
            bind!(grip, &format!("/user/hand/{hand}/input/grip/pose"));
            match profile {
                "/interaction_profiles/khr/simple_controller" => {
                    bind!(select, &format!("/user/hand/{hand}/input/select/click"));
                }
                "/interaction_profiles/valve/index_controller"
                | "/interaction_profiles/htc/vive_controller" => {
                    bind!(select, &format!("/user/hand/{hand}/input/trigger/click"));
                }
                "/interaction_profiles/oculus/touch_controller"
                | "/interaction_profiles/microsoft/motion_controller" => {
                    bind!(select_value, &format!("/user/hand/{hand}/input/trigger/value"));
                }
                _ => {}
            }
        }

        bindings
    }

    fn profile_name<G: xr::Graphics>(
        &self,
        session: &xr::Session<G>,
        path: xr::Path,
    ) -> Option<String> {
        let profile = session.current_interaction_profile(path).ok()?;
        if profile == xr::Path::NULL {
            return None;
        }
        self.instance.path_to_string(profile).ok()
    }

    /// Sync actions and translate the new state into events.
    pub fn poll<G: xr::Graphics>(
        &mut self,
        session: &xr::Session<G>,
        base: &xr::Space,
        time: xr::Time,
        out: &mut Vec<XrEvent>,
    ) -> XrResult<()> {
        session
            .sync_actions(&[xr::ActiveActionSet::new(&self.action_set)])
            .map_err(|e| XrError::Runtime(format!("OpenXR sync actions: {e:?}")))?;

        for index in ControllerIndex::ALL {
            let slot = index.as_usize();
            let path = self.paths[slot];

            let click = self.select.state(session, path).ok();
            let value = self.select_value.state(session, path).ok();
            let aim_active = self.aim.is_active(session, path).unwrap_or(false);

            let active = aim_active
                || click.as_ref().map(|s| s.is_active).unwrap_or(false)
                || value.as_ref().map(|s| s.is_active).unwrap_or(false);
            let pressed = select_pressed(
                self.hands[slot].pressed,
                click.map(|s| s.current_state).unwrap_or(false),
                value.map(|s| s.current_state).unwrap_or(0.0),
            );

            let mut hand = self.hands[slot];
            hand.advance(
                index,
                active,
                pressed,
                || self.profile_name(session, path),
                out,
            );
            self.hands[slot] = hand;

            if !active {
                continue;
            }
            if let Some(pose) = locate(&self.aim_spaces[slot], base, time) {
                out.push(XrEvent::ControllerPose { index, pose });
            }
            if let Some(pose) = locate(&self.grip_spaces[slot], base, time) {
                out.push(XrEvent::GripPose { index, pose });
            }
        }

        Ok(())
    }
}

pub(crate) fn locate(
    space: &xr::Space,
    base: &xr::Space,
    time: xr::Time,
) -> Option<walkthrough_xr::Pose> {
    let location = match space.locate(base, time) {
        Ok(location) => location,
        Err(err) => {
            debug!("OpenXR locate failed: {:?}", err);
            return None;
        }
    };
    let flags = location.location_flags;
    if flags.contains(xr::SpaceLocationFlags::POSITION_VALID)
        && flags.contains(xr::SpaceLocationFlags::ORIENTATION_VALID)
    {
        Some(to_pose(location.pose))
    } else {
        None
    }
}
