//! Gate → prerequisite → parameters → passenger.

use crate::error::{Check, LaunchError, sites};
use crate::extract::{ExtractedFile, Extractor};
use crate::gate::PrerequisiteGate;
use crate::image::PayloadStore;
use crate::launch::{LaunchStrategy, Launched, WaitMode};
use crate::params::{Parameters, read_parameters};
use std::path::PathBuf;
use utils::{CleanupPolicy, PASSENGER, PREREQUISITE};

/// What a successful run did.
#[derive(Debug)]
pub struct RunReport {
    pub prerequisite_installed: bool,
    pub parameters: Parameters,
    pub passenger: ExtractedFile,
    pub launched: Launched,
}

/// One extract-and-launch cycle over an image.
pub struct Pipeline<'img, G, L> {
    store: PayloadStore<'img>,
    gate: G,
    launcher: L,
    extractor: Extractor,
    self_path: Option<PathBuf>,
    prerequisite_args: Parameters,
    cleanup: CleanupPolicy,
}

impl<'img, G: PrerequisiteGate, L: LaunchStrategy> Pipeline<'img, G, L> {
    /// `extractor` gets the launcher's executable suffix applied here.
    pub fn new(store: PayloadStore<'img>, gate: G, launcher: L, extractor: Extractor) -> Self {
        let extractor = extractor.with_suffix(launcher.executable_suffix());
        Self {
            store,
            gate,
            launcher,
            extractor,
            self_path: None,
            prerequisite_args: Parameters::empty(),
            cleanup: CleanupPolicy::default(),
        }
    }

    /// Read parameters from `path` instead of the running executable.
    #[must_use]
    pub fn with_self_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.self_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extractor = self.extractor.with_temp_dir(dir);
        self
    }

    #[must_use]
    pub fn with_prerequisite_args(mut self, args: &str) -> Self {
        self.prerequisite_args = Parameters::from_bytes(args.as_bytes());
        self
    }

    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupPolicy) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Installs the prerequisite if the gate asks for it.
    ///
    /// Returns whether the installer ran.
    ///
    /// # Errors
    /// `PrerequisiteUnsatisfied` if the gate still fails after installing,
    /// or any error from checking, extracting or launching the installer
    pub fn ensure_prerequisite(&self) -> Result<bool, LaunchError> {
        if self.gate.is_satisfied()? {
            log::debug!("prerequisite already present");
            return Ok(false);
        }

        log::info!("prerequisite missing, running its installer");
        let payload = self.store.acquire(PREREQUISITE)?;
        let installer = self.extractor.extract(&payload)?;
        let launched =
            self.launcher
                .launch(installer.path(), &self.prerequisite_args, WaitMode::Exit)?;
        if let Some(status) = launched.status.filter(|s| !s.success()) {
            log::warn!("prerequisite installer exited with {status}");
        }
        self.clean_up(&installer);

        if !self.gate.is_satisfied()? {
            return Err(LaunchError::prerequisite_unsatisfied());
        }
        Ok(true)
    }

    /// Runs the whole cycle once.
    ///
    /// # Errors
    /// Returns the first failure; nothing is retried
    pub fn run(&self) -> Result<RunReport, LaunchError> {
        let prerequisite_installed = self.ensure_prerequisite()?;

        let parameters = read_parameters(&self.self_path()?)?;
        let payload = self.store.acquire(PASSENGER)?;
        let passenger = self.extractor.extract(&payload)?;
        // A file can only be deleted once nothing runs from it.
        let wait = match self.cleanup {
            CleanupPolicy::LeaveOnDisk => WaitMode::Dispatch,
            CleanupPolicy::DeleteAfterLaunch => WaitMode::Exit,
        };
        let launched = self.launcher.launch(passenger.path(), &parameters, wait)?;
        self.clean_up(&passenger);

        Ok(RunReport {
            prerequisite_installed,
            parameters,
            passenger,
            launched,
        })
    }

    fn self_path(&self) -> Result<PathBuf, LaunchError> {
        match &self.self_path {
            Some(path) => Ok(path.clone()),
            None => std::env::current_exe().check(sites::SELF_PATH),
        }
    }

    fn clean_up(&self, file: &ExtractedFile) {
        match self.cleanup {
            CleanupPolicy::LeaveOnDisk => {
                log::debug!("leaving {} on disk", file.path().display());
            }
            CleanupPolicy::DeleteAfterLaunch => file.remove(),
        }
    }
}
