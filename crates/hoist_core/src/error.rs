use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Asset directory does not exist: {}", .0.display())]
    MissingAssetDir(PathBuf),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Generic(String),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Token API request failed: {0}")]
    Http(String),

    #[error("Token API rejected the request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Malformed token API response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Manifest names latest version {0} but has no release for it")]
    MissingLatest(String),

    #[error("No latest version found in manifest")]
    NoLatestRelease,

    #[error("Platform {platform} not found in release {version}")]
    PlatformNotFound { platform: String, version: String },
}

#[derive(Error, Debug)]
pub enum ChecksumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checksum mismatch (expected {expected}, got {actual})")]
    Mismatch { expected: String, actual: String },

    #[error("Manifest entry carries no usable digest: {0:?}")]
    Unverifiable(String),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No assets found in {}", .0.display())]
    NoAssets(PathBuf),

    #[error("Failed to fetch upload credentials for {file}: {source}")]
    Credentials {
        file: String,
        #[source]
        source: CredentialError,
    },

    #[error("Failed to upload {file}: {source}")]
    Storage {
        file: String,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to walk asset directory: {0}")]
    Walk(#[from] walkdir::Error),
}
