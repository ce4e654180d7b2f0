//! Runtime of a carryon launcher: finds the payloads embedded in its own
//! image, installs the prerequisite when the gate asks for it, and starts
//! the passenger with the parameters stamped into its own trailer.

pub mod error;
pub mod extract;
pub mod gate;
pub mod image;
pub mod launch;
pub mod notify;
pub mod params;
pub mod pipeline;

pub use error::{ErrorKind, LaunchError};
pub use extract::{ExtractedFile, Extractor};
pub use gate::PrerequisiteGate;
pub use image::{Image, Payload, PayloadStore};
pub use launch::{DefaultStrategy, LaunchMode, LaunchStrategy, WaitMode};
pub use notify::{Notifier, StderrNotifier};
pub use params::{Parameters, read_parameters};
pub use pipeline::{Pipeline, RunReport};

/// The pipeline described by the manifest embedded in `image`, built with
/// this build's launch strategy.
///
/// # Errors
/// Returns an error if the image carries no readable manifest
pub fn launcher_pipeline(
    image: &Image,
) -> Result<Pipeline<'_, Box<dyn PrerequisiteGate>, DefaultStrategy>, LaunchError> {
    let manifest = image.manifest()?;
    log::debug!("launcher manifest: {manifest:?}");

    Ok(Pipeline::new(
        PayloadStore::new(image),
        gate::from_config(&manifest.gate),
        DefaultStrategy::default(),
        Extractor::new(manifest.temp_prefix.as_str()),
    )
    .with_prerequisite_args(&manifest.prerequisite_args)
    .with_cleanup(manifest.cleanup))
}

/// Runs the launcher embedded in `image`, reading parameters from the
/// running executable.
///
/// # Errors
/// Returns the first [`LaunchError`] from the pipeline
pub fn run_launcher(image: &Image) -> anyhow::Result<RunReport> {
    Ok(launcher_pipeline(image)?.run()?)
}

/// Maps the outcome of a run to the process exit code, reporting failures.
pub fn finish<T>(result: anyhow::Result<T>, notifier: &dyn Notifier) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => report_failure(&err, notifier),
    }
}

/// Reports a top-level failure through `notifier` and returns the exit code.
pub fn report_failure(err: &anyhow::Error, notifier: &dyn Notifier) -> i32 {
    log::debug!("launcher failed: {err:?}");
    let (message, code) = error::report(err);
    notifier.notify(&message);
    code
}
