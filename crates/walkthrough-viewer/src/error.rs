use thiserror::Error;
use walkthrough_xr::XrError;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Common(#[from] walkthrough_common::Error),
    #[error(transparent)]
    Xr(#[from] XrError),
    #[error("asset load failed: {0}")]
    Asset(String),
    #[error("label build failed: {0}")]
    Label(String),
    #[error("background task failed: {0}")]
    Task(String),
}

pub type ViewerResult<T> = Result<T, ViewerError>;
