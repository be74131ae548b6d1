use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use hoist_core::prelude::*;
use tracing::{debug, error, instrument};

/// Alibaba OSS speaks the S3 protocol on its regional endpoints.
pub const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://oss-{region}.aliyuncs.com";

const CREDENTIALS_PROVIDER_NAME: &str = "hoist-upload-token";

/// Uploads objects to an S3-compatible store.
///
/// The token API hands out credentials scoped to a single object, so a client
/// is configured for every upload instead of once per process.
#[derive(Clone, Debug)]
pub struct S3Storage {
    endpoint_template: String,
    force_path_style: bool,
}

impl Default for S3Storage {
    fn default() -> Self {
        Self {
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            force_path_style: false,
        }
    }
}

impl S3Storage {
    /// `endpoint_template` may contain `{region}`; it is only used when the
    /// issued credentials do not name an endpoint themselves.
    pub fn new(endpoint_template: Option<String>, force_path_style: bool) -> Self {
        Self {
            endpoint_template: endpoint_template
                .unwrap_or_else(|| DEFAULT_ENDPOINT_TEMPLATE.to_string()),
            force_path_style,
        }
    }

    fn endpoint(&self, credentials: &UploadCredentials) -> String {
        let endpoint = credentials
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.endpoint_template
                    .replace("{region}", &credentials.region)
            });

        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("https://{endpoint}")
        }
    }

    fn client(&self, credentials: &UploadCredentials) -> Client {
        let static_credentials = Credentials::new(
            &credentials.access_key_id,
            &credentials.access_key_secret,
            credentials.security_token.clone(),
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let config = aws_sdk_s3::Config::builder()
            .behavior_version_latest()
            .endpoint_url(self.endpoint(credentials))
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(static_credentials)
            .force_path_style(self.force_path_style)
            .build();

        Client::from_conf(config)
    }
}

impl StorageBackend for S3Storage {
    #[instrument(
        skip(self, credentials, data),
        fields(bucket = %credentials.bucket, key = %credentials.object_key, bytes = data.len())
    )]
    async fn put_object(
        &self,
        credentials: &UploadCredentials,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let client = self.client(credentials);

        debug!("Uploading object...");
        client
            .put_object()
            .bucket(&credentials.bucket)
            .key(&credentials.object_key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to upload object: {e:?}");
                StorageError::Generic(format!("S3 Upload Error: {e:?}"))
            })?;

        debug!("Upload successful");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(region: &str, endpoint: Option<&str>) -> UploadCredentials {
        UploadCredentials {
            object_key: "releases/bizyair-v0.0.2-linux-arm64".into(),
            access_key_id: "id".into(),
            access_key_secret: "secret".into(),
            security_token: Some("sts".into()),
            expiration: None,
            bucket: "bizyair-prod".into(),
            region: region.into(),
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[test]
    fn endpoint_from_region_template() {
        let storage = S3Storage::default();
        assert_eq!(
            storage.endpoint(&credentials("cn-beijing", None)),
            "https://oss-cn-beijing.aliyuncs.com"
        );
    }

    #[test]
    fn issued_endpoint_takes_precedence_and_gets_scheme() {
        let storage = S3Storage::new(Some("http://localhost:9000".into()), true);
        assert_eq!(
            storage.endpoint(&credentials("cn-beijing", Some("oss-cn-shanghai.aliyuncs.com"))),
            "https://oss-cn-shanghai.aliyuncs.com"
        );
        assert_eq!(
            storage.endpoint(&credentials("us-east-1", Some(""))),
            "http://localhost:9000"
        );
    }

    #[tokio::test]
    async fn builds_client_without_network() {
        let storage = S3Storage::default();
        let client = storage.client(&credentials("cn-beijing", None));
        assert_eq!(
            client.config().region().map(|r| r.to_string()),
            Some("cn-beijing".to_string())
        );
    }
}
