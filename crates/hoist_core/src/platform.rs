use serde::{Deserialize, Serialize};
use std::fmt;

const EXE_SUFFIX: &str = ".exe";
const DELIMITER: char = '-';
const MIN_SEGMENTS: usize = 4;

/// An `{os}-{arch}` identifier, e.g. `macos-amd64` or `windows-arm64`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformKey(String);

impl PlatformKey {
    pub fn new(os: &str, arch: &str) -> Self {
        Self(format!("{os}{DELIMITER}{arch}"))
    }

    /// Maps a Rust/Go style target (`darwin`, `x86_64`, `aarch64`, ...) onto the
    /// naming used in release filenames.
    pub fn for_target(os: &str, arch: &str) -> Self {
        let os = match os {
            "darwin" => "macos",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };
        Self::new(os, arch)
    }

    /// The key of the machine we are running on.
    pub fn current() -> Self {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlatformKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Derives the platform key from `<product>-<version>-<os>-<arch>[.exe]`.
///
/// Only the last two segments matter, so versions containing `-` still parse.
/// Returns `None` for names with fewer than four segments.
pub fn parse_platform_key(filename: &str) -> Option<PlatformKey> {
    let stem = filename.strip_suffix(EXE_SUFFIX).unwrap_or(filename);
    let segments: Vec<&str> = stem.split(DELIMITER).collect();

    if segments.len() < MIN_SEGMENTS {
        return None;
    }

    let arch = segments[segments.len() - 1];
    let os = segments[segments.len() - 2];
    Some(PlatformKey::new(os, arch))
}
