//! Object storage for thumbnail images.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::http::{HttpRequest, HttpTransport};

/// `cache-control` max-age for uploaded thumbnails (one year).
pub const THUMBNAIL_CACHE_CONTROL: &str = "31536000";

#[derive(Debug, Error)]
pub enum BlobError {
    /// An object already exists at the path and overwriting was not allowed.
    #[error("object already exists: {path}")]
    Conflict { path: String },

    #[error("blob upload failed with HTTP {status}: {message}")]
    Upload { status: u16, message: String },

    #[error("blob transport error: {0}")]
    Transport(String),
}

/// Write-only view of a blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`.
    ///
    /// With `upsert == false` an existing object is a [`BlobError::Conflict`].
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cache_control: &str,
        upsert: bool,
    ) -> Result<(), BlobError>;
}

/// Storage REST API client (`POST {base}/object/{bucket}/{path}`).
pub struct HttpBlobStore {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    bucket: String,
    token: String,
}

impl HttpBlobStore {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            token: token.into(),
        }
    }

    pub fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.base_url,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        cache_control: &str,
        upsert: bool,
    ) -> Result<(), BlobError> {
        let request = HttpRequest::post(self.object_url(path), bytes)
            .with_bearer(&self.token)
            .with_header("content-type", content_type)
            .with_header("cache-control", format!("max-age={cache_control}"))
            .with_header("x-upsert", upsert.to_string());

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| BlobError::Transport(e.to_string()))?;

        match response.status {
            200..=299 => Ok(()),
            409 => Err(BlobError::Conflict {
                path: path.to_string(),
            }),
            status => Err(BlobError::Upload {
                status,
                message: response.summary_line(),
            }),
        }
    }
}

/// Stand-in for runs without storage credentials; every upload fails.
///
/// Dry runs never upload, so they can use this.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredBlobStore;

#[async_trait]
impl BlobStore for UnconfiguredBlobStore {
    async fn put(
        &self,
        path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
        _cache_control: &str,
        _upsert: bool,
    ) -> Result<(), BlobError> {
        Err(BlobError::Upload {
            status: 0,
            message: format!("blob storage is not configured, cannot store {path}"),
        })
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: std::sync::Mutex<std::collections::BTreeMap<String, (Vec<u8>, String)>>,
}

#[cfg(test)]
impl MemoryBlobStore {
    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .expect("blob store lock should not be poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .expect("blob store lock should not be poisoned")
            .get(path)
            .map(|(_, ct)| ct.clone())
    }
}

#[cfg(test)]
#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        _cache_control: &str,
        upsert: bool,
    ) -> Result<(), BlobError> {
        let mut objects = self
            .objects
            .lock()
            .expect("blob store lock should not be poisoned");
        if !upsert && objects.contains_key(path) {
            return Err(BlobError::Conflict {
                path: path.to_string(),
            });
        }
        objects.insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpMethod, MockTransport, response};

    const OBJECT: &str = "https://store.test/storage/v1/object/thumbnails/v1/abc.jpg";

    fn store(transport: &MockTransport) -> HttpBlobStore {
        HttpBlobStore::new(
            Arc::new(transport.clone()),
            "https://store.test/storage/v1/",
            "thumbnails",
            "secret",
        )
    }

    #[tokio::test]
    async fn put_posts_object_with_headers() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Post, OBJECT, response(200, &[], b"{}"));

        store(&transport)
            .put("v1/abc.jpg", vec![1, 2, 3], "image/jpeg", THUMBNAIL_CACHE_CONTROL, false)
            .await
            .expect("upload");

        let sent = &transport.requests()[0];
        assert_eq!(sent.body, vec![1, 2, 3]);
        assert_eq!(crate::http::header_get(&sent.headers, "x-upsert"), Some("false"));
        assert_eq!(
            crate::http::header_get(&sent.headers, "cache-control"),
            Some("max-age=31536000")
        );
        assert_eq!(
            crate::http::header_get(&sent.headers, "authorization"),
            Some("Bearer secret")
        );
    }

    #[tokio::test]
    async fn existing_object_is_conflict() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Post, OBJECT, response(409, &[], b"Duplicate"));

        let err = store(&transport)
            .put("v1/abc.jpg", Vec::new(), "image/jpeg", THUMBNAIL_CACHE_CONTROL, false)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Conflict { .. }));
    }

    #[tokio::test]
    async fn server_error_keeps_first_line() {
        let transport = MockTransport::new();
        transport.push_response(HttpMethod::Post, OBJECT, response(500, &[], b"boom\ntrace"));

        let err = store(&transport)
            .put("v1/abc.jpg", Vec::new(), "image/jpeg", THUMBNAIL_CACHE_CONTROL, false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "blob upload failed with HTTP 500: boom");
    }

    #[tokio::test]
    async fn memory_store_rejects_overwrite() {
        let store = MemoryBlobStore::default();
        store.put("a.jpg", vec![1], "image/jpeg", "1", false).await.unwrap();
        assert!(store.put("a.jpg", vec![2], "image/jpeg", "1", false).await.is_err());
        assert_eq!(store.paths(), vec!["a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn unconfigured_store_rejects_uploads() {
        let err = UnconfiguredBlobStore
            .put("v1/a.jpg", vec![1], "image/jpeg", THUMBNAIL_CACHE_CONTROL, true)
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Upload { status: 0, .. }));
    }
}
