//! # hoist FileSystem Storage
//!
//! A local filesystem backend for hoist.
//!
//! This crate implements the [`StorageBackend`] trait, storing every uploaded
//! object at `<root>/<bucket>/<object_key>`. It is what `hoist publish --dry-run`
//! writes to, and a convenient way to stage a release before pushing it.
//!
//! ## Features
//!
//! * **Atomic Writes**: Uses temporary files and rename operations so a half-written binary or manifest is never observed.
//!
//! ## Usage
//!
//! ```no_run
//! use hoist_fs::FileSystemStorage;
//!
//! let storage = FileSystemStorage::new("./release_mirror");
//! ```

use bytes::Bytes;
use hoist_core::prelude::*;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

async fn atomic_write(path: &Path, data: Bytes) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(StorageError::Io)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, data).await.map_err(StorageError::Io)?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(StorageError::Io)?;

    Ok(())
}

#[derive(Clone, Debug)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { root: path.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects keys that would escape the root.
    fn get_path(&self, bucket: &str, object_key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket).join(object_key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::Generic(format!(
                "Refusing to write outside storage root: {}",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }

    pub async fn read_object(&self, bucket: &str, object_key: &str) -> Result<Bytes, StorageError> {
        let path = self.get_path(bucket, object_key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string_lossy().to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

impl StorageBackend for FileSystemStorage {
    async fn put_object(
        &self,
        credentials: &UploadCredentials,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.get_path(&credentials.bucket, &credentials.object_key)?;
        debug!(path = %path.display(), bytes = data.len(), "Writing object");
        atomic_write(&path, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(key: &str) -> UploadCredentials {
        UploadCredentials {
            object_key: key.to_string(),
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            security_token: None,
            expiration: None,
            bucket: "releases".into(),
            region: "local".into(),
            endpoint: None,
        }
    }

    #[tokio::test]
    async fn writes_under_bucket_and_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        storage
            .put_object(
                &credentials("cli/v0.0.2/bizyair-v0.0.2-linux-arm64"),
                Bytes::from_static(b"binary"),
                "application/octet-stream",
            )
            .await
            .unwrap();

        let on_disk = dir
            .path()
            .join("releases/cli/v0.0.2/bizyair-v0.0.2-linux-arm64");
        assert_eq!(std::fs::read(on_disk).unwrap(), b"binary");
        assert_eq!(
            storage
                .read_object("releases", "cli/v0.0.2/bizyair-v0.0.2-linux-arm64")
                .await
                .unwrap(),
            Bytes::from_static(b"binary")
        );
    }

    #[tokio::test]
    async fn overwrites_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let creds = credentials("manifest.json");

        storage.put_object(&creds, Bytes::from_static(b"{}"), "application/json").await.unwrap();
        storage.put_object(&creds, Bytes::from_static(b"{\"a\":1}"), "application/json").await.unwrap();

        let data = storage.read_object("releases", "manifest.json").await.unwrap();
        assert_eq!(data, Bytes::from_static(b"{\"a\":1}"));
    }

    #[tokio::test]
    async fn refuses_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());

        let err = storage
            .put_object(&credentials("../escape"), Bytes::new(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Generic(_)));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSystemStorage::new(dir.path());
        let err = storage.read_object("releases", "nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
