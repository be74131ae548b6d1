use crate::checksum::is_sidecar;
use crate::error::{ConfigError, PublishError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A release binary found in the build output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: PathBuf,
    pub filename: String,
}

/// Lists `<product>-*` files directly inside `dir`, sorted by filename.
/// Checksum sidecars are not assets.
pub fn discover_assets(dir: &Path, product: &str) -> Result<Vec<Asset>, PublishError> {
    if !dir.is_dir() {
        return Err(ConfigError::MissingAssetDir(dir.to_path_buf()).into());
    }

    let prefix = format!("{product}-");
    let mut assets = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        // Symlinked binaries count; the target's bytes are uploaded.
        if !entry.path().is_file() {
            continue;
        }

        let Some(filename) = entry.file_name().to_str() else {
            tracing::debug!(path = ?entry.path(), "Skipping non UTF-8 filename");
            continue;
        };

        if !filename.starts_with(&prefix) || is_sidecar(filename) {
            continue;
        }

        assets.push(Asset {
            path: entry.path().to_path_buf(),
            filename: filename.to_string(),
        });
    }

    Ok(assets)
}
