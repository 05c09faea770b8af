// Service Admin - Errors
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Error types returned by the service registry and its backends.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// How a helper process failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperFailure {
    /// The helper exited with a nonzero status code.
    ExitCode(i32),
    /// The helper was terminated by a signal.
    Signal,
    /// The helper did not finish within the allotted time and was killed.
    Timeout(Duration),
}

impl fmt::Display for HelperFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelperFailure::ExitCode(code) => write!(f, "exited with status {}", code),
            HelperFailure::Signal => write!(f, "was terminated by a signal"),
            HelperFailure::Timeout(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}

/// Errors surfaced to callers of the registry.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A helper ran but did not succeed.
    #[error("`{command}` {failure}")]
    HelperExecutionFailed {
        command: String,
        failure: HelperFailure,
        stderr: String,
    },

    /// A helper could not be started at all.
    #[error("failed to launch `{command}`")]
    HelperSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A started helper could not be waited on.
    #[error("failed to wait for `{command}`")]
    HelperWait {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The polkit prompt behind pkexec was dismissed or refused.
    #[error("authentication cancelled for `{command}`")]
    AuthenticationCancelled { command: String },

    /// The init system collaborator failed.
    #[error(transparent)]
    InitSystem(#[from] anyhow::Error),
}

impl ServiceError {
    /// Whether this error came from a helper that exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ServiceError::HelperExecutionFailed {
                failure: HelperFailure::Timeout(_),
                ..
            }
        )
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
