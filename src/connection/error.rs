//! Error types for process connections

use std::fmt;

/// Launch spec field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchSpecField {
    /// The working directory
    WorkingDirectory,
    /// The command sequence as a whole
    Command,
    /// A single command token, by position
    CommandToken(usize),
}

impl fmt::Display for LaunchSpecField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchSpecField::WorkingDirectory => write!(f, "working directory"),
            LaunchSpecField::Command => write!(f, "command"),
            LaunchSpecField::CommandToken(index) => write!(f, "command token #{index}"),
        }
    }
}

/// Errors raised while starting a process connection
///
/// Stopping a connection and reading its streams never fail; only `start`
/// reports errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The launch spec cannot be used to spawn a process
    #[error("Invalid launch spec: {field} {reason}")]
    InvalidLaunchSpec {
        field: LaunchSpecField,
        reason: &'static str,
    },

    /// The process could not be created or exited right after creation
    #[error("Unable to start process: {spec}")]
    ProcessSpawnFailed {
        spec: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider already went through its single lifecycle
    #[error("Connection provider already started")]
    AlreadyStarted,
}

impl ConnectionError {
    pub(crate) fn invalid(field: LaunchSpecField, reason: &'static str) -> Self {
        Self::InvalidLaunchSpec { field, reason }
    }

    /// Field that failed validation, if this is a validation error
    pub fn invalid_field(&self) -> Option<LaunchSpecField> {
        match self {
            Self::InvalidLaunchSpec { field, .. } => Some(*field),
            _ => None,
        }
    }
}
