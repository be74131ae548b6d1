use crate::assets::{Asset, discover_assets};
use crate::checksum::{UNCOMPUTED_PLACEHOLDER, read_checksum};
use crate::config::{GenerateConfig, MANIFEST_FILENAME, PublishConfig};
use crate::error::PublishError;
use crate::manifest::{Manifest, PlatformEntry, ReleaseBuilder};
use crate::platform::{PlatformKey, parse_platform_key};
use crate::reporter::{NullReporter, Reporter};
use crate::traits::{CredentialProvider, StorageBackend};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub platform: PlatformKey,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct PublishReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    pub manifest_url: String,
    pub uploaded: Vec<UploadedAsset>,
    /// Filenames that carried no platform and were left out.
    pub skipped: Vec<String>,
}

/// Uploads every asset of a release and then the manifest describing them.
///
/// Assets are processed one at a time in filename order. The first credential or
/// upload failure ends the run; objects uploaded before it stay in storage and
/// no manifest is written.
pub struct Publisher<C, S, R = NullReporter> {
    config: PublishConfig,
    credentials: C,
    storage: S,
    reporter: R,
}

impl<C: CredentialProvider, S: StorageBackend> Publisher<C, S> {
    pub fn new(config: PublishConfig, credentials: C, storage: S) -> Self {
        Self {
            config,
            credentials,
            storage,
            reporter: NullReporter,
        }
    }
}

impl<C: CredentialProvider, S: StorageBackend, R: Reporter> Publisher<C, S, R> {
    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> Publisher<C, S, R2> {
        Publisher {
            config: self.config,
            credentials: self.credentials,
            storage: self.storage,
            reporter,
        }
    }

    /// Runs the whole release. `prior` is the previously published manifest, if any;
    /// its other releases are carried over into the new one.
    #[instrument(skip(self, prior), fields(version = %self.config.version))]
    pub async fn publish(
        &self,
        prior: Option<Manifest>,
        release_date: DateTime<Utc>,
    ) -> Result<PublishReport, PublishError> {
        self.config.validate()?;

        let assets = discover_assets(&self.config.dist_dir, &self.config.product)?;
        if assets.is_empty() {
            return Err(PublishError::NoAssets(self.config.dist_dir.clone()));
        }
        info!(count = assets.len(), "Discovered assets");
        self.reporter
            .section(&format!("Found {} files to upload", assets.len()));

        let mut release = ReleaseBuilder::new(&self.config.version);
        let mut uploaded = Vec::new();
        let mut skipped = Vec::new();

        for asset in &assets {
            self.reporter.asset(&asset.filename);

            let Some(platform) = parse_platform_key(&asset.filename) else {
                warn!(file = %asset.filename, "Cannot parse platform from filename");
                self.reporter
                    .warning("Cannot parse platform from filename, skipping");
                skipped.push(asset.filename.clone());
                continue;
            };
            self.reporter.detail("platform", platform.as_str());

            let checksum = read_checksum(&asset.path).await?;
            if checksum.is_missing() {
                warn!(file = %asset.filename, "No checksum sidecar");
                self.reporter.warning("No SHA256 file found");
            }
            let digest = checksum.digest_or("");
            self.reporter.detail("sha256", digest);

            let url = self.upload_asset(asset).await?;
            self.reporter.success(&format!("Uploaded: {url}"));

            let entry = PlatformEntry::new(&asset.filename, &url, digest);
            if let Some(previous) = release.insert_for(platform.clone(), entry) {
                warn!(
                    platform = %platform,
                    replaced = %previous.filename,
                    "Platform provided by more than one asset, keeping the later one"
                );
            }

            uploaded.push(UploadedAsset {
                platform,
                filename: asset.filename.clone(),
                url,
            });
        }

        self.reporter.section("Generating manifest");
        let record = release.build(release_date);
        let manifest = match prior {
            Some(mut manifest) => {
                debug!(
                    releases = manifest.releases.len(),
                    "Merging into previous manifest"
                );
                manifest.merge(record);
                manifest
            }
            None => Manifest::new(record),
        };

        let manifest_path = self.config.manifest_path();
        manifest.save(&manifest_path).await?;
        self.reporter
            .detail("saved", &manifest_path.display().to_string());

        self.reporter.section("Uploading manifest");
        let json = manifest.to_json()?;
        let manifest_url = self
            .upload(MANIFEST_FILENAME, Bytes::from(json), JSON_CONTENT_TYPE)
            .await?;
        self.reporter
            .success(&format!("Manifest uploaded: {manifest_url}"));

        Ok(PublishReport {
            manifest,
            manifest_path,
            manifest_url,
            uploaded,
            skipped,
        })
    }

    async fn upload_asset(&self, asset: &Asset) -> Result<String, PublishError> {
        let data = tokio::fs::read(&asset.path).await?;
        let content_type = mime_guess::from_path(&asset.path)
            .first_or_octet_stream()
            .to_string();
        self.upload(&asset.filename, Bytes::from(data), &content_type)
            .await
    }

    /// Fetches credentials for `filename`, writes the bytes and returns the public URL.
    async fn upload(
        &self,
        filename: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, PublishError> {
        debug!(file = %filename, "Requesting upload credentials");
        let credentials = self
            .credentials
            .upload_credentials(filename)
            .await
            .map_err(|source| {
                self.reporter
                    .error(&format!("Failed to get upload token: {source}"));
                PublishError::Credentials {
                    file: filename.to_string(),
                    source,
                }
            })?;

        debug!(file = %filename, key = %credentials.object_key, bytes = data.len(), "Uploading");
        self.storage
            .put_object(&credentials, data, content_type)
            .await
            .map_err(|source| {
                self.reporter.error(&format!("Upload failed: {source}"));
                PublishError::Storage {
                    file: filename.to_string(),
                    source,
                }
            })?;

        Ok(self.config.public_url(&credentials.object_key))
    }
}

/// Builds a manifest from the build output without touching the network.
///
/// URLs point at where the binaries will be deployed and a missing checksum
/// sidecar becomes the "uncomputed" placeholder.
pub async fn generate_manifest(
    config: &GenerateConfig,
    reporter: &impl Reporter,
    release_date: DateTime<Utc>,
) -> Result<Manifest, PublishError> {
    let assets = discover_assets(&config.dist_dir, &config.product)?;
    let mut release = ReleaseBuilder::new(&config.version);

    for asset in &assets {
        let Some(platform) = parse_platform_key(&asset.filename) else {
            debug!(file = %asset.filename, "Skipping asset without platform");
            continue;
        };

        let checksum = read_checksum(&asset.path).await?;
        let url = config.download_url(&platform, &asset.filename);
        let entry = PlatformEntry::new(
            &asset.filename,
            url,
            checksum.digest_or(UNCOMPUTED_PLACEHOLDER),
        );
        reporter.detail(platform.as_str(), &asset.filename);
        release.insert_for(platform, entry);
    }

    Ok(Manifest::new(release.build(release_date)))
}
