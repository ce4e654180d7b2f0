//! Reads the parameter trailer appended to the launcher's own file.

use crate::error::{Check, LaunchError, sites};
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use utils::trailer::{DIRECTORY_LEN, TRAILER_MAGIC, locate};

/// Parameter bytes recovered from a trailer, always zero-terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameters {
    buf: Vec<u8>,
}

impl Parameters {
    pub fn empty() -> Self {
        Self { buf: vec![0] }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.extend_from_slice(bytes);
        buf.push(0);
        Self { buf }
    }

    /// The parameter bytes, without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buf.len() - 1]
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::empty()
    }
}

fn read_u32(file: &mut File) -> std::io::Result<u32> {
    let mut field = [0u8; 4];
    file.read_exact(&mut field)?;
    Ok(u32::from_ne_bytes(field))
}

/// Reads the parameters stamped into the trailer of `self_path`.
///
/// A file without the trailer signature, or whose directory points outside
/// the file, has no parameters. I/O failures after the file is opened are
/// `ParameterReadFailed`.
///
/// # Errors
/// `SelfFileOpenFailed` if the file cannot be opened, `ParameterReadFailed`
/// if a seek or read comes up short
pub fn read_parameters(self_path: &Path) -> Result<Parameters, LaunchError> {
    let mut file = File::open(self_path).check(sites::SELF_OPEN)?;
    let file_len = file.metadata().check(sites::SELF_OPEN)?.len();
    if file_len < u64::from(DIRECTORY_LEN) {
        log::debug!("{} is too short to carry a trailer", self_path.display());
        return Ok(Parameters::empty());
    }

    file.seek(SeekFrom::End(-i64::from(DIRECTORY_LEN)))
        .check(sites::SEEK_DIRECTORY)?;
    let signature = read_u32(&mut file).check(sites::READ_SIGNATURE)?;
    if signature != TRAILER_MAGIC {
        log::debug!("no parameter trailer in {}", self_path.display());
        return Ok(Parameters::empty());
    }

    let size = read_u32(&mut file).check(sites::READ_SIZE)?;
    let offset = read_u32(&mut file).check(sites::READ_OFFSET)?;
    if locate(file_len, size, offset).is_none() {
        log::warn!(
            "ignoring parameter trailer with size {size} at offset {offset} \
             in a {file_len} byte file"
        );
        return Ok(Parameters::empty());
    }

    file.seek(SeekFrom::End(-i64::from(offset)))
        .check(sites::SEEK_PARAMETERS)?;
    let mut buf = vec![0u8; size as usize + 1];
    file.read_exact(&mut buf[..size as usize])
        .check(sites::READ_PARAMETERS)?;
    log::debug!("read {size} parameter bytes");
    Ok(Parameters { buf })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;
    use tempfile::TempDir;
    use utils::trailer::{Directory, reserve, stamp};

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_no_trailer_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "plain", b"just an executable, nothing appended");
        let params = read_parameters(&path).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.as_bytes_with_nul(), &[0]);
    }

    #[test]
    fn test_short_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "tiny", b"MZ");
        assert!(read_parameters(&path).unwrap().is_empty());
    }

    #[test]
    fn test_silent_trailer() {
        // size 8, offset 20: the parameters sit right before the directory
        let mut file = b"launcher-body".to_vec();
        file.extend_from_slice(b"--silent");
        file.extend_from_slice(&Directory { size: 8, offset: 20 }.to_bytes());

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "launcher", &file);
        let params = read_parameters(&path).unwrap();
        assert_eq!(params.as_bytes(), b"--silent");
        assert_eq!(params.to_string_lossy(), "--silent");
        assert_eq!(params.as_bytes_with_nul(), b"--silent\0");
    }

    #[test]
    fn test_reads_exact_window_inside_reserved_space() {
        let mut file = b"body".to_vec();
        reserve(&mut file, 64).unwrap();
        let file = stamp(&file, b"/passive /norestart").unwrap();

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "launcher", &file);
        let params = read_parameters(&path).unwrap();
        assert_eq!(params.as_bytes(), b"/passive /norestart");
        assert_eq!(params.as_bytes_with_nul().len(), params.len() + 1);
    }

    #[test]
    fn test_zero_size_trailer() {
        let mut file = b"body".to_vec();
        reserve(&mut file, 16).unwrap();

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "launcher", &file);
        let params = read_parameters(&path).unwrap();
        assert!(params.is_empty());
        assert_eq!(params.as_bytes_with_nul(), &[0]);
    }

    #[test]
    fn test_out_of_range_offset_is_no_trailer() {
        let mut file = b"body".to_vec();
        file.extend_from_slice(
            &Directory {
                size: 3,
                offset: 10_000,
            }
            .to_bytes(),
        );

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "launcher", &file);
        assert!(read_parameters(&path).unwrap().is_empty());
    }

    #[test]
    fn test_size_overlapping_directory_is_no_trailer() {
        let mut file = b"body-bytes".to_vec();
        file.extend_from_slice(&Directory { size: 9, offset: 20 }.to_bytes());

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "launcher", &file);
        assert!(read_parameters(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let err = read_parameters(&dir.path().join("gone")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelfFileOpenFailed);
        assert_eq!(err.exit_code(), 12);
    }
}
