#![forbid(unsafe_code)]

pub mod headless;
pub mod runtime;
pub mod types;

pub use headless::{HeadlessHandle, HeadlessRuntime};
pub use runtime::XrRuntime;
pub use types::{ControllerHandle, ControllerIndex, GripHandle, Pose, XrEvent, CONTROLLER_COUNT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XrError {
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type XrResult<T> = Result<T, XrError>;
