use std::fmt;

use thiserror::Error;

/// Engine call a bootstrap run was performing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    Connect,
    SwitchAdmin,
    InsertMarker,
    CreateUser,
    Inspect,
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BootstrapStep::Connect => "connect",
            BootstrapStep::SwitchAdmin => "switch_admin",
            BootstrapStep::InsertMarker => "insert_marker",
            BootstrapStep::CreateUser => "create_user",
            BootstrapStep::Inspect => "inspect",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("Engine call failed at {step}: {message}")]
    Engine { step: BootstrapStep, message: String },
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        DbInfraError::Config {
            message: message.into(),
        }
    }

    pub fn engine(step: BootstrapStep, err: impl fmt::Display) -> Self {
        DbInfraError::Engine {
            step,
            message: err.to_string(),
        }
    }

    /// Step that failed, for engine errors.
    pub fn step(&self) -> Option<BootstrapStep> {
        match self {
            DbInfraError::Config { .. } => None,
            DbInfraError::Engine { step, .. } => Some(*step),
        }
    }
}
