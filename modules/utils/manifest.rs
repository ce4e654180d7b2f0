use serde::{Deserialize, Serialize};

/// Default prefix for extracted temp files
pub const DEFAULT_TEMP_PREFIX: &str = "PASS";

/// What happens to an extracted file once its launch request returns.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// The launched program (or the OS temp reaper) owns the file
    #[default]
    LeaveOnDisk,
    /// Best-effort removal right after the launch request returns
    DeleteAfterLaunch,
}

/// How the launcher decides whether the prerequisite must be installed.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GateConfig {
    #[default]
    None,
    PathExists {
        path: String,
    },
}

/// Build-time launcher configuration, embedded next to the payloads.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(default, rename_all = "kebab-case")]
pub struct Manifest {
    pub temp_prefix: String,
    /// Command line passed to the prerequisite installer
    pub prerequisite_args: String,
    pub gate: GateConfig,
    pub cleanup: CleanupPolicy,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            prerequisite_args: String::new(),
            gate: GateConfig::None,
            cleanup: CleanupPolicy::LeaveOnDisk,
        }
    }
}
