//! Checksum sidecars.
//!
//! Every release binary may be accompanied by `<binary>.sha256` holding the hex
//! digest computed at build time. Publishing only reads these files; `hoist checksum`
//! writes them.

use crate::error::ChecksumError;
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

pub const CHECKSUM_SUFFIX: &str = ".sha256";
pub const CHECKSUM_PREFIX: &str = "sha256:";

/// Substituted by local manifest generation when no sidecar exists.
pub const UNCOMPUTED_PLACEHOLDER: &str = "uncomputed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    Digest(String),
    Missing,
}

impl Checksum {
    /// The digest text, or `fallback` when the sidecar was absent.
    pub fn digest_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            Checksum::Digest(digest) => digest,
            Checksum::Missing => fallback,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Checksum::Missing)
    }
}

pub fn sidecar_path(asset: &Path) -> PathBuf {
    let mut name = OsString::from(asset.as_os_str());
    name.push(CHECKSUM_SUFFIX);
    PathBuf::from(name)
}

pub fn is_sidecar(filename: &str) -> bool {
    filename.ends_with(CHECKSUM_SUFFIX)
}

pub async fn read_checksum(asset: &Path) -> std::io::Result<Checksum> {
    match fs::read_to_string(sidecar_path(asset)).await {
        Ok(contents) => Ok(Checksum::Digest(contents.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Checksum::Missing),
        Err(e) => Err(e),
    }
}

pub async fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hashes `asset` and writes the digest next to it. Returns the digest.
pub async fn write_sidecar(asset: &Path) -> std::io::Result<String> {
    let digest = sha256_file(asset).await?;
    fs::write(sidecar_path(asset), format!("{digest}\n")).await?;
    Ok(digest)
}

/// Checks `path` against a manifest checksum (`sha256:<hex>` or bare hex).
pub async fn verify_file(path: &Path, expected: &str) -> Result<(), ChecksumError> {
    let digest = expected.strip_prefix(CHECKSUM_PREFIX).unwrap_or(expected);
    if digest.is_empty() || digest == UNCOMPUTED_PLACEHOLDER {
        return Err(ChecksumError::Unverifiable(expected.to_string()));
    }

    let actual = sha256_file(path).await?;
    if !actual.eq_ignore_ascii_case(digest) {
        return Err(ChecksumError::Mismatch {
            expected: digest.to_string(),
            actual,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello")
    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn sidecar_is_appended_not_replaced() {
        let path = sidecar_path(Path::new("dist/bizyair-v0.0.2-windows-amd64.exe"));
        assert_eq!(
            path,
            Path::new("dist/bizyair-v0.0.2-windows-amd64.exe.sha256")
        );
    }

    #[tokio::test]
    async fn reads_trimmed_digest() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("bizyair-v0.0.2-macos-amd64");
        std::fs::write(&asset, b"bin").unwrap();
        std::fs::write(sidecar_path(&asset), "abcd1234\n").unwrap();

        let checksum = read_checksum(&asset).await.unwrap();
        assert_eq!(checksum, Checksum::Digest("abcd1234".to_string()));
    }

    #[tokio::test]
    async fn missing_sidecar_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("bizyair-v0.0.2-linux-arm64");
        std::fs::write(&asset, b"bin").unwrap();

        let checksum = read_checksum(&asset).await.unwrap();
        assert!(checksum.is_missing());
        assert_eq!(checksum.digest_or(""), "");
        assert_eq!(checksum.digest_or(UNCOMPUTED_PLACEHOLDER), "uncomputed");
    }

    #[tokio::test]
    async fn writes_and_verifies_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("bizyair-v0.0.2-linux-amd64");
        std::fs::write(&asset, b"hello").unwrap();

        let digest = write_sidecar(&asset).await.unwrap();
        assert_eq!(digest, HELLO);
        assert_eq!(
            read_checksum(&asset).await.unwrap(),
            Checksum::Digest(HELLO.to_string())
        );

        verify_file(&asset, &format!("sha256:{HELLO}")).await.unwrap();
        verify_file(&asset, HELLO).await.unwrap();
    }

    #[tokio::test]
    async fn verify_reports_mismatch_and_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("bin");
        std::fs::write(&asset, b"hello!").unwrap();

        let err = verify_file(&asset, &format!("sha256:{HELLO}")).await.unwrap_err();
        assert!(matches!(err, ChecksumError::Mismatch { .. }));

        let err = verify_file(&asset, "sha256:").await.unwrap_err();
        assert!(matches!(err, ChecksumError::Unverifiable(_)));

        let err = verify_file(&asset, "sha256:uncomputed").await.unwrap_err();
        assert!(matches!(err, ChecksumError::Unverifiable(_)));
    }
}
