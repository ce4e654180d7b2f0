//! Prerequisite gate policies.

use crate::error::{LaunchError, sites};
use std::io;
use std::path::PathBuf;
use utils::GateConfig;

/// Decides whether the passenger's dependency is present.
pub trait PrerequisiteGate {
    /// `Ok(false)` means the check ran and the prerequisite is missing.
    ///
    /// # Errors
    /// `PrerequisiteCheckFailed` if the check itself cannot be performed
    fn is_satisfied(&self) -> Result<bool, LaunchError>;
}

impl<G: PrerequisiteGate + ?Sized> PrerequisiteGate for Box<G> {
    fn is_satisfied(&self) -> Result<bool, LaunchError> {
        (**self).is_satisfied()
    }
}

/// Gate for launchers without a prerequisite.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSatisfied;

impl PrerequisiteGate for AlwaysSatisfied {
    fn is_satisfied(&self) -> Result<bool, LaunchError> {
        Ok(true)
    }
}

/// Satisfied when a marker path (an installed runtime, a library) exists.
#[derive(Debug, Clone)]
pub struct PathExists {
    path: PathBuf,
}

impl PathExists {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PrerequisiteGate for PathExists {
    fn is_satisfied(&self) -> Result<bool, LaunchError> {
        match std::fs::metadata(&self.path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("{} not found", self.path.display());
                Ok(false)
            }
            Err(err) => Err(LaunchError::os(sites::PREREQUISITE_CHECK, err)),
        }
    }
}

/// Builds the gate described by the manifest.
pub fn from_config(config: &GateConfig) -> Box<dyn PrerequisiteGate> {
    match config {
        GateConfig::None => Box::new(AlwaysSatisfied),
        GateConfig::PathExists { path } => Box::new(PathExists::new(path)),
    }
}
