use bytes::Bytes;
use hoist_core::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

/// Issues fixed credentials without asking any server.
/// Object keys are `<prefix><filename>`.
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    bucket: String,
    region: String,
    prefix: String,
    fail_on: Arc<HashSet<String>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl StaticCredentials {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: "local".to_string(),
            prefix: prefix.into(),
            fail_on: Arc::default(),
            requested: Arc::default(),
        }
    }

    /// Reject requests for these filenames the way the token API would.
    pub fn failing_on<I, T>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.fail_on = Arc::new(filenames.into_iter().map(Into::into).collect());
        self
    }

    /// Filenames credentials were requested for, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl CredentialProvider for StaticCredentials {
    async fn upload_credentials(&self, filename: &str) -> Result<UploadCredentials, CredentialError> {
        self.requested.lock().unwrap().push(filename.to_string());

        if self.fail_on.contains(filename) {
            return Err(CredentialError::Rejected {
                code: 40300,
                message: format!("upload of {filename} not allowed"),
            });
        }

        Ok(UploadCredentials {
            object_key: format!("{}{filename}", self.prefix),
            access_key_id: "static-access-key".to_string(),
            access_key_secret: "static-secret".to_string(),
            security_token: None,
            expiration: None,
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Keeps objects in memory, keyed by `<bucket>/<object_key>`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    fail_on: Arc<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail writes to these object keys.
    pub fn failing_on<I, T>(mut self, object_keys: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.fail_on = Arc::new(object_keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn get(&self, bucket: &str, object_key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{object_key}"))
            .cloned()
    }

    /// Stored paths (`<bucket>/<object_key>`), sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    async fn put_object(
        &self,
        credentials: &UploadCredentials,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.fail_on.contains(&credentials.object_key) {
            return Err(StorageError::Generic(format!(
                "injected failure for {}",
                credentials.object_key
            )));
        }

        self.objects.lock().unwrap().insert(
            format!("{}/{}", credentials.bucket, credentials.object_key),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}
