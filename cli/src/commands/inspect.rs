use crate::flag::InspectArgs;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;
use utils::trailer::Directory;

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TrailerInfo {
    pub reserved: bool,
    pub available: u32,
    pub size: u32,
    pub parameters: String,
}

/// Reads the trailer of `launcher` the same way the runtime does.
///
/// # Errors
/// Returns an error if the file cannot be read
pub fn trailer_info(launcher: &Path) -> anyhow::Result<TrailerInfo> {
    let bytes =
        fs::read(launcher).with_context(|| format!("failed to read {}", launcher.display()))?;
    let parameters = carryon_runtime::read_parameters(launcher)?;
    Ok(match Directory::parse(&bytes) {
        Some(directory) => TrailerInfo {
            reserved: true,
            available: directory.available(),
            size: directory.size,
            parameters: parameters.to_string_lossy().into_owned(),
        },
        None => TrailerInfo {
            reserved: false,
            available: 0,
            size: 0,
            parameters: String::new(),
        },
    })
}

pub fn execute(args: &InspectArgs) -> anyhow::Result<()> {
    let info = trailer_info(&args.launcher)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else if info.reserved {
        println!("Parameter space: {} bytes", info.available);
        println!("Parameters ({} bytes): {}", info.size, info.parameters);
    } else {
        println!("{} has no parameter space reserved", args.launcher.display());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code: unwrap is acceptable
mod tests {
    use super::*;
    use tempfile::TempDir;
    use utils::trailer::{reserve, stamp};

    #[test]
    fn test_info_for_stamped_launcher() {
        let dir = TempDir::new().unwrap();
        let mut bytes = b"stub".to_vec();
        reserve(&mut bytes, 32).unwrap();
        let bytes = stamp(&bytes, b"--silent").unwrap();
        let path = dir.path().join("setup");
        fs::write(&path, bytes).unwrap();

        let info = trailer_info(&path).unwrap();
        assert_eq!(
            info,
            TrailerInfo {
                reserved: true,
                available: 32,
                size: 8,
                parameters: "--silent".to_string(),
            }
        );
        let json: serde_json::Value = serde_json::to_value(&info).unwrap();
        assert_eq!(json["parameters"], "--silent");
    }

    #[test]
    fn test_info_without_trailer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, b"plain executable").unwrap();
        assert!(!trailer_info(&path).unwrap().reserved);
    }
}
