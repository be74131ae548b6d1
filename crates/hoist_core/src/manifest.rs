use crate::checksum::{CHECKSUM_PREFIX, UNCOMPUTED_PLACEHOLDER};
use crate::error::ManifestError;
use crate::platform::{PlatformKey, parse_platform_key};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The "Manifest" is what installed clients poll to find out about new releases.
/// It points at the latest version and keeps every published release around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// The version of the most recent publish, e.g. "v0.0.2".
    pub latest_version: String,

    /// - Key: Version e.g., "v0.0.2"
    /// - Value: Release metadata
    pub releases: BTreeMap<String, ReleaseRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub version: String,

    /// Standard UTC timestamp of when the manifest was built.
    pub release_date: DateTime<Utc>,

    /// - Key: Platform e.g., "linux-arm64"
    /// - Value: Download metadata
    pub platforms: BTreeMap<PlatformKey, PlatformEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub filename: String,
    pub url: String,
    /// "sha256:<hex>"; the digest part is empty or a placeholder when no sidecar existed.
    pub checksum: String,
}

impl PlatformEntry {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, digest: &str) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            checksum: format!("{CHECKSUM_PREFIX}{digest}"),
        }
    }

    /// The digest without its algorithm prefix.
    pub fn digest(&self) -> &str {
        self.checksum
            .strip_prefix(CHECKSUM_PREFIX)
            .unwrap_or(&self.checksum)
    }

    /// False for the empty digest and the "uncomputed" placeholder.
    pub fn has_digest(&self) -> bool {
        let digest = self.digest();
        !digest.is_empty() && digest != UNCOMPUTED_PLACEHOLDER
    }
}

/// Returned by [`ReleaseBuilder::insert`] when a filename carries no platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped(pub String);

/// Folds platform entries for one version into a [`ReleaseRecord`].
#[derive(Debug, Clone)]
pub struct ReleaseBuilder {
    version: String,
    platforms: BTreeMap<PlatformKey, PlatformEntry>,
}

impl ReleaseBuilder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            platforms: BTreeMap::new(),
        }
    }

    /// Stores `entry` under the platform parsed from its filename.
    /// Later entries for the same platform win; the replaced one is returned.
    pub fn insert(&mut self, entry: PlatformEntry) -> Result<Option<PlatformEntry>, Skipped> {
        let key = parse_platform_key(&entry.filename)
            .ok_or_else(|| Skipped(entry.filename.clone()))?;
        Ok(self.insert_for(key, entry))
    }

    /// Stores `entry` under an already parsed platform key.
    pub fn insert_for(&mut self, key: PlatformKey, entry: PlatformEntry) -> Option<PlatformEntry> {
        self.platforms.insert(key, entry)
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    pub fn build(self, release_date: DateTime<Utc>) -> ReleaseRecord {
        ReleaseRecord {
            version: self.version,
            release_date,
            platforms: self.platforms,
        }
    }
}

/// A manifest with a single release which is also the latest.
pub fn build_manifest(
    version: &str,
    platforms: BTreeMap<PlatformKey, PlatformEntry>,
    release_date: DateTime<Utc>,
) -> Manifest {
    Manifest::new(ReleaseRecord {
        version: version.to_string(),
        release_date,
        platforms,
    })
}

impl Manifest {
    pub fn new(release: ReleaseRecord) -> Self {
        let latest_version = release.version.clone();
        let mut releases = BTreeMap::new();
        releases.insert(latest_version.clone(), release);
        Self {
            latest_version,
            releases,
        }
    }

    /// Adds `release` and makes it the latest. Other versions are kept;
    /// a release with the same version replaces the previous record.
    pub fn merge(&mut self, release: ReleaseRecord) -> Option<ReleaseRecord> {
        self.latest_version = release.version.clone();
        self.releases.insert(release.version.clone(), release)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if !self.latest_version.is_empty() && !self.releases.contains_key(&self.latest_version) {
            return Err(ManifestError::MissingLatest(self.latest_version.clone()));
        }
        Ok(())
    }

    pub fn latest_release(&self) -> Result<&ReleaseRecord, ManifestError> {
        if self.latest_version.is_empty() {
            return Err(ManifestError::NoLatestRelease);
        }
        self.releases
            .get(&self.latest_version)
            .ok_or_else(|| ManifestError::MissingLatest(self.latest_version.clone()))
    }

    /// Looks up the download for `platform` in the latest release.
    pub fn binary_for_platform(
        &self,
        platform: &PlatformKey,
    ) -> Result<&PlatformEntry, ManifestError> {
        let release = self.latest_release()?;
        release
            .platforms
            .get(platform)
            .ok_or_else(|| ManifestError::PlatformNotFound {
                platform: platform.to_string(),
                version: release.version.clone(),
            })
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_slice(data)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let data = tokio::fs::read(path).await?;
        Self::from_slice(&data)
    }

    pub async fn save(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}
