//! Failure taxonomy and the check-and-raise adapter.
//!
//! Every OS-facing step names a [`Site`]: the error class, the phrase shown to
//! the user ("while <context>"), and the process exit code for that step.

use std::fmt;
use std::io;

/// Prefix of every message shown to the user
pub const MESSAGE_PREFIX: &str = "Cannot install this application";

/// Exit code for failures that did not come through [`Check`]
pub const FALLBACK_EXIT_CODE: i32 = 101;

/// Message for failures that did not come through [`Check`]
pub const FALLBACK_MESSAGE: &str = "Cannot install this application: an unknown error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ResourceNotFound,
    ResourceSizeUnavailable,
    ResourceLockFailed,
    SelfFileOpenFailed,
    ParameterReadFailed,
    TempDirUnavailable,
    TempNameGenerationFailed,
    TempFileCreateFailed,
    ShortWrite,
    LaunchDispatchFailed,
    ProcessCreateFailed,
    PrerequisiteCheckFailed,
    PrerequisiteUnsatisfied,
}

/// A failure site: one OS-facing step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub kind: ErrorKind,
    pub context: &'static str,
    pub code: i32,
}

const fn site(kind: ErrorKind, context: &'static str, code: i32) -> Site {
    Site {
        kind,
        context,
        code,
    }
}

pub mod sites {
    use super::{ErrorKind as K, Site, site};

    pub const FIND_PAYLOAD: Site = site(K::ResourceNotFound, "finding embedded executable", 1);
    pub const LOAD_PAYLOAD: Site = site(K::ResourceLockFailed, "loading embedded executable", 2);
    pub const LOCK_PAYLOAD: Site = site(K::ResourceLockFailed, "locking embedded executable", 3);
    pub const PAYLOAD_SIZE: Site = site(
        K::ResourceSizeUnavailable,
        "getting size of embedded executable",
        4,
    );
    pub const TEMP_NAME: Site = site(
        K::TempNameGenerationFailed,
        "getting a temp executable filename",
        5,
    );
    pub const TEMP_CREATE: Site = site(
        K::TempFileCreateFailed,
        "creating a temp executable file",
        6,
    );
    pub const TEMP_WRITE: Site = site(
        K::ShortWrite,
        "writing embedded executable to temp executable file",
        7,
    );
    pub const TEMP_VERIFY: Site = site(
        K::ShortWrite,
        "verifying the size of the temp executable file",
        8,
    );
    pub const SHELL_OPEN: Site = site(
        K::LaunchDispatchFailed,
        "asking the shell to open the extracted executable",
        9,
    );
    pub const TEMP_DIR: Site = site(K::TempDirUnavailable, "locating the temp folder", 10);
    pub const SELF_PATH: Site = site(K::SelfFileOpenFailed, "getting the module filename", 11);
    pub const SELF_OPEN: Site = site(K::SelfFileOpenFailed, "opening file for parameters", 12);
    pub const SEEK_DIRECTORY: Site = site(K::ParameterReadFailed, "seeking parameter info", 13);
    pub const READ_SIGNATURE: Site =
        site(K::ParameterReadFailed, "reading parameter signature", 14);
    pub const READ_SIZE: Site = site(K::ParameterReadFailed, "reading parameter size", 15);
    pub const READ_OFFSET: Site = site(K::ParameterReadFailed, "reading parameter offset", 16);
    pub const SEEK_PARAMETERS: Site = site(K::ParameterReadFailed, "seeking parameters", 17);
    pub const READ_PARAMETERS: Site = site(K::ParameterReadFailed, "reading parameters", 18);
    pub const PROCESS_CREATE: Site = site(
        K::ProcessCreateFailed,
        "starting the extracted executable",
        19,
    );
    pub const PROCESS_WAIT: Site = site(
        K::ProcessCreateFailed,
        "waiting for the extracted executable",
        20,
    );
    pub const PREREQUISITE_CHECK: Site = site(
        K::PrerequisiteCheckFailed,
        "testing for the presence of the prerequisite",
        100,
    );
    pub const PREREQUISITE_MISSING: Site = site(
        K::PrerequisiteUnsatisfied,
        "installing the prerequisite",
        103,
    );
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct LaunchError {
    site: Site,
    message: String,
    #[source]
    os: Option<io::Error>,
}

impl LaunchError {
    /// Failure of an OS primitive, carrying its error code and description.
    pub fn os(site: Site, err: io::Error) -> Self {
        let code = err
            .raw_os_error()
            .map_or_else(|| "no code".to_string(), |c| c.to_string());
        let description = os_description(&err);
        Self {
            message: format!(
                "{MESSAGE_PREFIX}: while {}, encountered this error: {description} ({code})",
                site.context
            ),
            site,
            os: Some(err),
        }
    }

    /// Failure detected by a check of our own, with no OS error behind it.
    pub fn detail(site: Site, detail: impl fmt::Display) -> Self {
        Self {
            message: format!(
                "{MESSAGE_PREFIX}: while {}, encountered this error: {detail}",
                site.context
            ),
            site,
            os: None,
        }
    }

    /// The prerequisite installer ran but the gate still reports it missing.
    pub fn prerequisite_unsatisfied() -> Self {
        Self {
            site: sites::PREREQUISITE_MISSING,
            message: "Cannot start this application: attempted to install the prerequisite, \
                      but it did not succeed."
                .to_string(),
            os: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.site.kind
    }

    pub fn exit_code(&self) -> i32 {
        self.site.code
    }

    pub fn os_error(&self) -> Option<&io::Error> {
        self.os.as_ref()
    }
}

fn os_description(err: &io::Error) -> String {
    // io::Error renders raw OS errors as "<text> (os error N)"; the code is
    // appended separately.
    let text = err.to_string();
    match text.rfind(" (os error ") {
        Some(idx) if err.raw_os_error().is_some() => text[..idx].to_string(),
        _ if text.is_empty() => "(no message found)".to_string(),
        _ => text,
    }
}

/// Check-and-raise adapter over a primitive's result.
pub trait Check<T> {
    /// # Errors
    /// Returns a [`LaunchError`] for `site` when the primitive reported failure
    fn check(self, site: Site) -> Result<T, LaunchError>;
}

impl<T> Check<T> for io::Result<T> {
    fn check(self, site: Site) -> Result<T, LaunchError> {
        self.map_err(|err| LaunchError::os(site, err))
    }
}

impl<T> Check<T> for Option<T> {
    fn check(self, site: Site) -> Result<T, LaunchError> {
        self.ok_or_else(|| LaunchError::detail(site, "(no message found)"))
    }
}

/// User-facing message and exit code for any top-level failure.
pub fn report(err: &anyhow::Error) -> (String, i32) {
    match err.downcast_ref::<LaunchError>() {
        Some(launch) => (launch.to_string(), launch.exit_code()),
        None => (FALLBACK_MESSAGE.to_string(), FALLBACK_EXIT_CODE),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_os_error_message() {
        let err: io::Result<()> = Err(io::Error::from_raw_os_error(2));
        let err = err.check(sites::SELF_OPEN).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SelfFileOpenFailed);
        assert_eq!(err.exit_code(), 12);
        let message = err.to_string();
        assert!(message.starts_with(concat!(
            "Cannot install this application: while opening file for parameters, ",
            "encountered this error: "
        )));
        assert!(message.ends_with(" (2)"), "{message}");
        assert!(!message.contains("os error"), "{message}");
    }

    #[test]
    fn test_none_is_failure_sentinel() {
        let err = None::<u32>.check(sites::TEMP_NAME).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TempNameGenerationFailed);
        assert!(err.to_string().ends_with("(no message found)"));
        assert!(err.os_error().is_none());
    }

    #[test]
    fn test_site_codes_are_distinct() {
        let all = [
            sites::FIND_PAYLOAD,
            sites::LOAD_PAYLOAD,
            sites::LOCK_PAYLOAD,
            sites::PAYLOAD_SIZE,
            sites::TEMP_NAME,
            sites::TEMP_CREATE,
            sites::TEMP_WRITE,
            sites::TEMP_VERIFY,
            sites::SHELL_OPEN,
            sites::TEMP_DIR,
            sites::SELF_PATH,
            sites::SELF_OPEN,
            sites::SEEK_DIRECTORY,
            sites::READ_SIGNATURE,
            sites::READ_SIZE,
            sites::READ_OFFSET,
            sites::SEEK_PARAMETERS,
            sites::READ_PARAMETERS,
            sites::PROCESS_CREATE,
            sites::PROCESS_WAIT,
            sites::PREREQUISITE_CHECK,
            sites::PREREQUISITE_MISSING,
        ];
        let mut codes: Vec<i32> = all.iter().map(|s| s.code).collect();
        codes.push(FALLBACK_EXIT_CODE);
        let count = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), count);
    }

    #[test]
    fn test_report_maps_launch_errors_and_fallback() {
        let launch = anyhow::Error::new(LaunchError::prerequisite_unsatisfied());
        let (message, code) = report(&launch);
        assert_eq!(code, 103);
        assert!(message.contains("prerequisite"));

        let other = anyhow::anyhow!("manifest is corrupt");
        assert_eq!(
            report(&other),
            (FALLBACK_MESSAGE.to_string(), FALLBACK_EXIT_CODE)
        );
    }
}
