use crate::error::*;

use bytes::Bytes;
use std::fmt;

/// Short-lived credentials issued for exactly one object upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredentials {
    /// Where the object must be written; also the path of its public URL.
    pub object_key: String,
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: Option<String>,
    pub expiration: Option<String>,
    pub bucket: String,
    pub region: String,
    /// Storage endpoint, when the issuer names one explicitly.
    pub endpoint: Option<String>,
}

impl fmt::Debug for UploadCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadCredentials")
            .field("object_key", &self.object_key)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
            .field("expiration", &self.expiration)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

pub trait CredentialProvider: Send + Sync + 'static + Clone {
    fn upload_credentials(
        &self,
        filename: &str,
    ) -> impl Future<Output = Result<UploadCredentials, CredentialError>> + Send;
}

pub trait StorageBackend: Send + Sync + 'static + Clone {
    /// Writes `data` to `credentials.bucket` / `credentials.object_key`.
    fn put_object(
        &self,
        credentials: &UploadCredentials,
        data: Bytes,
        content_type: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
