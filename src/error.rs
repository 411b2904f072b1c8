use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{label}: cannot start before a build has finished")]
    InvalidState { label: String },
    #[error("{label}: failed to launch `{command}`: {reason}")]
    Spawn {
        label: String,
        command: String,
        reason: String,
    },
}
