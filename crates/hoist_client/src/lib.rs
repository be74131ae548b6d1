use hoist_core::prelude::*;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const UPLOAD_TOKEN_PATH: &str = "/x/v1/upload/token";
pub const UPLOAD_FILE_TYPE: &str = "cli";
const OK_CODE: i64 = 20000;

#[derive(Error, Debug)]
pub enum HoistClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

pub type Result<T> = std::result::Result<T, HoistClientError>;

/// Talks to the backend that issues per-file upload credentials.
#[derive(Clone)]
pub struct TokenApiClient {
    base_url: String,
    client: Client,
    api_key: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<TokenData>,
}

#[derive(Deserialize)]
struct TokenData {
    file: FileInfo,
    storage: StorageInfo,
}

#[derive(Deserialize)]
struct FileInfo {
    object_key: String,
    access_key_id: String,
    access_key_secret: String,
    #[serde(default)]
    security_token: Option<String>,
    #[serde(default)]
    expiration: Option<String>,
}

#[derive(Deserialize)]
struct StorageInfo {
    bucket: String,
    #[serde(default)]
    region: String,
    #[serde(default)]
    endpoint: Option<String>,
}

/// `oss-cn-hangzhou.aliyuncs.com` -> `cn-hangzhou`
fn region_from_endpoint(endpoint: &str) -> Option<&str> {
    let host = endpoint
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let rest = &host[host.find("oss-")? + 4..];
    let region = &rest[..rest.find('.')?];
    (!region.is_empty()).then_some(region)
}

impl TokenData {
    fn into_credentials(self) -> std::result::Result<UploadCredentials, CredentialError> {
        let endpoint = self.storage.endpoint.filter(|e| !e.is_empty());
        let region = if self.storage.region.is_empty() {
            endpoint
                .as_deref()
                .and_then(region_from_endpoint)
                .map(str::to_string)
                .ok_or_else(|| CredentialError::Malformed("storage region missing".into()))?
        } else {
            self.storage.region
        };

        Ok(UploadCredentials {
            object_key: self.file.object_key,
            access_key_id: self.file.access_key_id,
            access_key_secret: self.file.access_key_secret,
            security_token: self.file.security_token.filter(|t| !t.is_empty()),
            expiration: self.file.expiration,
            bucket: self.storage.bucket,
            region,
            endpoint,
        })
    }
}

impl TokenApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    pub fn from_config(config: &PublishConfig) -> Self {
        Self::new(&config.base_domain, &config.api_key)
    }

    fn auth_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.api_key))
    }

    pub async fn upload_token(
        &self,
        filename: &str,
    ) -> std::result::Result<UploadCredentials, CredentialError> {
        let url = format!("{}{UPLOAD_TOKEN_PATH}", self.base_url);
        debug!(%url, file = %filename, "Requesting upload token");

        let response = self
            .auth_request(self.client.get(&url))
            .query(&[
                ("file_name", filename),
                ("file_type", UPLOAD_FILE_TYPE),
                ("ignore_date", "true"),
                ("final_file_name", "true"),
            ])
            .send()
            .await
            .map_err(|e| CredentialError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CredentialError::Http(format!("{status}: {text}")));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;

        if body.code != OK_CODE {
            return Err(CredentialError::Rejected {
                code: body.code,
                message: body.message,
            });
        }

        body.data
            .ok_or_else(|| CredentialError::Malformed("response has no data".into()))?
            .into_credentials()
    }

    /// Downloads a published manifest. `Ok(None)` when nothing is published there yet.
    pub async fn fetch_manifest(&self, url: &str) -> Result<Option<Manifest>> {
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%url, "No manifest published yet");
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(HoistClientError::ServerError(status, text));
        }

        let body = response.bytes().await?;
        Ok(Some(Manifest::from_slice(&body)?))
    }

    /// `location` is either an http(s) URL or a local path.
    pub async fn load_manifest(&self, location: &str) -> Result<Option<Manifest>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            return self.fetch_manifest(location).await;
        }

        let path = Path::new(location);
        if !tokio::fs::try_exists(path).await? {
            return Ok(None);
        }
        Ok(Some(Manifest::load(path).await?))
    }
}

impl CredentialProvider for TokenApiClient {
    async fn upload_credentials(
        &self,
        filename: &str,
    ) -> std::result::Result<UploadCredentials, CredentialError> {
        self.upload_token(filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn token_body(code: i64) -> String {
        format!(
            r#"{{
                "code": {code},
                "message": "ok",
                "data": {{
                    "file": {{
                        "object_key": "cli/bizyair-v0.0.2-linux-arm64",
                        "access_key_id": "AK",
                        "access_key_secret": "SK",
                        "security_token": "STS"
                    }},
                    "storage": {{ "bucket": "bizyair-prod", "region": "cn-beijing" }}
                }}
            }}"#
        )
    }

    #[tokio::test]
    async fn requests_token_with_bearer_and_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", UPLOAD_TOKEN_PATH)
            .match_header("authorization", "Bearer test-key")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("file_name".into(), "bizyair-v0.0.2-linux-arm64".into()),
                Matcher::UrlEncoded("file_type".into(), "cli".into()),
                Matcher::UrlEncoded("ignore_date".into(), "true".into()),
                Matcher::UrlEncoded("final_file_name".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(token_body(20000))
            .create_async()
            .await;

        let client = TokenApiClient::new(server.url(), "test-key");
        let creds = client
            .upload_credentials("bizyair-v0.0.2-linux-arm64")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(creds.object_key, "cli/bizyair-v0.0.2-linux-arm64");
        assert_eq!(creds.bucket, "bizyair-prod");
        assert_eq!(creds.region, "cn-beijing");
        assert_eq!(creds.security_token.as_deref(), Some("STS"));
        assert_eq!(creds.endpoint, None);
    }

    #[tokio::test]
    async fn non_success_code_is_rejected() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", UPLOAD_TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{ "code": 40100, "message": "invalid api key" }"#)
            .create_async()
            .await;

        let client = TokenApiClient::new(server.url(), "bad");
        let err = client.upload_credentials("manifest.json").await.unwrap_err();
        assert!(matches!(
            err,
            CredentialError::Rejected { code: 40100, ref message } if message == "invalid api key"
        ));
    }

    #[tokio::test]
    async fn http_failure_is_reported() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", UPLOAD_TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = TokenApiClient::new(server.url(), "key");
        let err = client.upload_credentials("manifest.json").await.unwrap_err();
        assert!(matches!(err, CredentialError::Http(_)));
    }

    #[tokio::test]
    async fn region_falls_back_to_endpoint() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", UPLOAD_TOKEN_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{
                    "code": 20000,
                    "data": {
                        "file": { "object_key": "k", "access_key_id": "a", "access_key_secret": "s", "security_token": "" },
                        "storage": { "bucket": "b", "endpoint": "oss-cn-hangzhou.aliyuncs.com" }
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = TokenApiClient::new(server.url(), "key");
        let creds = client.upload_credentials("k").await.unwrap();
        assert_eq!(creds.region, "cn-hangzhou");
        assert_eq!(creds.security_token, None);
        assert_eq!(creds.endpoint.as_deref(), Some("oss-cn-hangzhou.aliyuncs.com"));
    }

    #[test]
    fn parses_region_from_endpoint() {
        assert_eq!(
            region_from_endpoint("https://oss-cn-shanghai.aliyuncs.com"),
            Some("cn-shanghai")
        );
        assert_eq!(region_from_endpoint("s3.amazonaws.com"), None);
    }

    #[tokio::test]
    async fn fetch_manifest_handles_missing_and_present() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing.json")
            .with_status(404)
            .create_async()
            .await;

        let manifest = Manifest::new(
            ReleaseBuilder::new("v0.0.1").build(chrono::Utc::now()),
        );
        let _present = server
            .mock("GET", "/manifest.json")
            .with_status(200)
            .with_body(manifest.to_json().unwrap())
            .create_async()
            .await;

        let client = TokenApiClient::new(server.url(), "key");
        assert!(
            client
                .fetch_manifest(&format!("{}/missing.json", server.url()))
                .await
                .unwrap()
                .is_none()
        );
        let fetched = client
            .load_manifest(&format!("{}/manifest.json", server.url()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched, manifest);
    }

    #[tokio::test]
    async fn load_manifest_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let client = TokenApiClient::new("http://unused", "key");

        assert!(client.load_manifest(path.to_str().unwrap()).await.unwrap().is_none());

        let manifest = Manifest::new(ReleaseBuilder::new("v0.0.1").build(chrono::Utc::now()));
        manifest.save(&path).await.unwrap();
        assert_eq!(
            client.load_manifest(path.to_str().unwrap()).await.unwrap(),
            Some(manifest)
        );
    }
}
