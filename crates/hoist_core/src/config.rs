use crate::error::ConfigError;
use crate::platform::PlatformKey;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_BASE_DOMAIN: &str = "https://api.bizyair.cn";
pub const DEFAULT_PUBLIC_URL: &str = "https://storage.bizyair.cn";
pub const DEFAULT_PRODUCT: &str = "bizyair";
pub const DEFAULT_DIST_DIR: &str = "dist";
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Everything a publish run needs, resolved once at startup.
#[derive(Clone)]
pub struct PublishConfig {
    pub version: String,
    pub api_key: String,
    /// Base URL of the upload-token API.
    pub base_domain: String,
    pub dist_dir: PathBuf,
    /// Assets are files named `<product>-*`.
    pub product: String,
    /// Uploaded objects are served from `<public_base_url>/<object_key>`.
    pub public_base_url: String,
}

impl PublishConfig {
    pub fn new(version: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            api_key: api_key.into(),
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
            product: DEFAULT_PRODUCT.to_string(),
            public_base_url: DEFAULT_PUBLIC_URL.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(ConfigError::Missing("VERSION"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("API_KEY"));
        }
        if self.base_domain.trim().is_empty() {
            return Err(ConfigError::Missing("BASE_DOMAIN"));
        }
        if !self.dist_dir.is_dir() {
            return Err(ConfigError::MissingAssetDir(self.dist_dir.clone()));
        }
        Ok(())
    }

    pub fn public_url(&self, object_key: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            object_key.trim_start_matches('/')
        )
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dist_dir.join(MANIFEST_FILENAME)
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("version", &self.version)
            .field("api_key", &"<redacted>")
            .field("base_domain", &self.base_domain)
            .field("dist_dir", &self.dist_dir)
            .field("product", &self.product)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

/// Settings for building a manifest locally without uploading anything.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub version: String,
    pub dist_dir: PathBuf,
    pub product: String,
    pub public_base_url: String,
}

impl GenerateConfig {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            dist_dir: PathBuf::from(DEFAULT_DIST_DIR),
            product: DEFAULT_PRODUCT.to_string(),
            public_base_url: DEFAULT_PUBLIC_URL.to_string(),
        }
    }

    /// Where the binary is expected to end up once deployed.
    pub fn download_url(&self, platform: &PlatformKey, filename: &str) -> String {
        format!(
            "{}/releases/{}/{platform}/{filename}",
            self.public_base_url.trim_end_matches('/'),
            self.version
        )
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dist_dir.join(MANIFEST_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PublishConfig::new("", "key");
        config.dist_dir = dir.path().to_path_buf();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("VERSION"))));

        config.version = "v0.0.2".into();
        config.api_key = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("API_KEY"))));

        config.api_key = "key".into();
        config.validate().unwrap();

        config.dist_dir = dir.path().join("missing");
        assert!(matches!(config.validate(), Err(ConfigError::MissingAssetDir(_))));
    }

    #[test]
    fn public_url_joins_cleanly() {
        let mut config = PublishConfig::new("v0.0.2", "key");
        config.public_base_url = "https://cdn.example.com/".into();
        assert_eq!(
            config.public_url("/releases/bizyair-v0.0.2-linux-arm64"),
            "https://cdn.example.com/releases/bizyair-v0.0.2-linux-arm64"
        );
    }

    #[test]
    fn api_key_is_not_debug_printed() {
        let config = PublishConfig::new("v0.0.2", "super-secret");
        assert!(!format!("{config:?}").contains("super-secret"));
    }

    #[test]
    fn generated_urls_follow_release_layout() {
        let config = GenerateConfig::new("v0.0.2");
        assert_eq!(
            config.download_url(&PlatformKey::from("macos-amd64"), "bizyair-v0.0.2-macos-amd64"),
            "https://storage.bizyair.cn/releases/v0.0.2/macos-amd64/bizyair-v0.0.2-macos-amd64"
        );
    }
}
