//! Materializes payloads as temp files.

use crate::error::{Check, LaunchError, sites};
use crate::image::Payload;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

// Hex lookup table
const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// A payload written out to disk.
///
/// Extracted files are not removed when this value is dropped: the launched
/// program owns its image until it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    path: PathBuf,
    written: u64,
}

impl ExtractedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Best-effort removal; failures are logged.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed {}", self.path.display()),
            Err(err) => log::warn!("could not remove {}: {err}", self.path.display()),
        }
    }
}

/// Writes payloads to uniquely named files in the temp directory.
#[derive(Debug, Clone)]
pub struct Extractor {
    temp_dir: Option<PathBuf>,
    prefix: String,
    suffix: Option<&'static str>,
}

impl Extractor {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            temp_dir: None,
            prefix: prefix.into(),
            suffix: None,
        }
    }

    /// Extract into `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Extension appended after the generated name, for launch strategies
    /// that rely on file association.
    #[must_use]
    pub fn with_suffix(mut self, suffix: Option<&'static str>) -> Self {
        self.suffix = suffix;
        self
    }

    fn resolve_temp_dir(&self) -> Result<PathBuf, LaunchError> {
        let dir = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        let meta = fs::metadata(&dir).check(sites::TEMP_DIR)?;
        if !meta.is_dir() {
            return Err(LaunchError::detail(
                sites::TEMP_DIR,
                format!("{} is not a directory", dir.display()),
            ));
        }
        Ok(dir)
    }

    fn temp_name(&self) -> Result<String, LaunchError> {
        let mut bytes = [0u8; 8];
        getrandom::fill(&mut bytes)
            .map_err(|e| LaunchError::detail(sites::TEMP_NAME, e))?;

        let mut name = String::with_capacity(self.prefix.len() + 16 + 4);
        name.push_str(&self.prefix);
        for byte in bytes {
            name.push(HEX_CHARS[(byte >> 4) as usize] as char);
            name.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        name.push_str(".tmp");
        if let Some(suffix) = self.suffix {
            name.push_str(suffix);
        }
        Ok(name)
    }

    /// Copies `payload` into a new temp file.
    ///
    /// A file left behind by a failed write is not removed.
    ///
    /// # Errors
    /// Returns the failing step's error: temp dir, name, create, or write
    pub fn extract(&self, payload: &Payload<'_>) -> Result<ExtractedFile, LaunchError> {
        let dir = self.resolve_temp_dir()?;
        let path = dir.join(self.temp_name()?);

        let mut file = create_truncated(&path).check(sites::TEMP_CREATE)?;
        write_payload(&mut file, payload.bytes()).check(sites::TEMP_WRITE)?;
        let written = file.metadata().check(sites::TEMP_VERIFY)?.len();
        drop(file);

        if written != payload.size() {
            return Err(LaunchError::detail(
                sites::TEMP_VERIFY,
                format!("wrote {written} of {} bytes", payload.size()),
            ));
        }

        log::info!(
            "extracted payload '{}' to {} ({written} bytes)",
            payload.name(),
            path.display()
        );
        Ok(ExtractedFile { path, written })
    }
}

fn create_truncated(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o755);
    }
    options.open(path)
}

fn write_payload<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(bytes)?;
    writer.flush()
}
