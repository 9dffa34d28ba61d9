//! Headless runtime: no device, events injected through a handle.
//!
//! Used by the CLI host and by tests to script controller connects, select
//! presses and presentation changes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::{
    runtime::XrRuntime,
    types::{ControllerHandle, ControllerIndex, GripHandle, XrEvent},
    XrResult,
};

type EventQueue = Arc<Mutex<VecDeque<XrEvent>>>;

pub struct HeadlessRuntime {
    queue: EventQueue,
    presenting: bool,
}

/// Cloneable injector for a [`HeadlessRuntime`].
#[derive(Clone)]
pub struct HeadlessHandle {
    queue: EventQueue,
}

impl HeadlessRuntime {
    pub fn new() -> (Self, HeadlessHandle) {
        let queue: EventQueue = Arc::new(Mutex::new(VecDeque::new()));
        (
            Self {
                queue: queue.clone(),
                presenting: false,
            },
            HeadlessHandle { queue },
        )
    }

    /// Start already presenting, as if the user had entered VR.
    pub fn presenting() -> (Self, HeadlessHandle) {
        let (runtime, handle) = Self::new();
        handle.push(XrEvent::PresentationChanged { presenting: true });
        (runtime, handle)
    }
}

impl HeadlessHandle {
    pub fn push(&self, event: XrEvent) {
        let mut guard = match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push_back(event);
    }

    pub fn connect(&self, index: ControllerIndex) {
        self.push(XrEvent::Connected {
            index,
            profile: Some("generic-trigger".to_string()),
        });
    }

    pub fn press(&self, index: ControllerIndex) {
        self.push(XrEvent::SelectStart { index });
    }

    pub fn release(&self, index: ControllerIndex) {
        self.push(XrEvent::SelectEnd { index });
    }
}

fn handle_id(index: ControllerIndex, grip: bool) -> u64 {
    ((index.as_usize() as u64) << 1) | u64::from(grip)
}

impl XrRuntime for HeadlessRuntime {
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
        let mut guard = match self.queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let events: Vec<XrEvent> = guard.drain(..).collect();
        for event in &events {
            if let XrEvent::PresentationChanged { presenting } = event {
                self.presenting = *presenting;
            }
        }
        if !events.is_empty() {
            debug!("headless runtime delivered {} events", events.len());
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_stable_and_distinct() {
        let (mut runtime, _handle) = HeadlessRuntime::new();
        let a = runtime.controller(ControllerIndex::Primary);
        let b = runtime.controller(ControllerIndex::Secondary);
        let grip = runtime.controller_grip(ControllerIndex::Primary);
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, grip.id);
        assert_eq!(a, runtime.controller(ControllerIndex::Primary));
    }

    #[test]
    fn test_events_drain_in_order() {
        let (mut runtime, handle) = HeadlessRuntime::new();
        handle.connect(ControllerIndex::Secondary);
        handle.press(ControllerIndex::Secondary);
        handle.release(ControllerIndex::Secondary);

        let events = runtime.poll_events().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], XrEvent::Connected { .. }));
        assert!(matches!(events[2], XrEvent::SelectEnd { .. }));
        assert!(runtime.poll_events().unwrap().is_empty());
    }

    #[test]
    fn test_presentation_follows_delivered_events() {
        let (mut runtime, handle) = HeadlessRuntime::presenting();
        // Not visible until the loop polls.
        assert!(!runtime.is_presenting());
        runtime.poll_events().unwrap();
        assert!(runtime.is_presenting());

        handle.push(XrEvent::PresentationChanged { presenting: false });
        runtime.poll_events().unwrap();
        assert!(!runtime.is_presenting());
    }
}
