use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettingsError {
    #[error("Invalid addon setting: {0}")]
    InvalidSetting(String),
    #[error("Invalid financial adjustment: {0}")]
    InvalidAdjustment(f64),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}
