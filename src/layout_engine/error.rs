use thiserror::Error;

use crate::model::{DisplayId, WindowId, WindowType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WmError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
    #[error("Window {0} is not in a state that permits this operation")]
    StateAbnormal(WindowId),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),
    #[error("Window {0} has been destroyed")]
    DestroyedObject(WindowId),
    #[error("Nothing to do")]
    DoNothing,
    #[error("Window type {0} is not valid here")]
    InvalidType(WindowType),
}

impl WmError {
    pub(crate) fn unknown_window(id: WindowId) -> Self {
        WmError::InvalidParam(format!("window {id} does not exist"))
    }

    pub(crate) fn unknown_display(id: DisplayId) -> Self {
        WmError::InvalidParam(format!("display {id} does not exist"))
    }
}

pub type WmResult<T> = Result<T, WmError>;
