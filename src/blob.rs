//! Blob storage backends.
//!
//! Two implementations of [`BlobStore`]:
//!
//! - [`LocalBlobStore`]: files under a root directory. Retrieval URLs are
//!   `file://` URLs with an `expires` query parameter.
//! - [`HttpBlobStore`]: a remote blob service. Every request URL carries an
//!   `expires` timestamp and an HMAC-SHA256 `signature` over
//!   `"<path>\n<expires>"`.
//!
//! [`build_blob_store`] picks one from `[blob]` config.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use docsift_core::store::BlobStore;

use crate::config::BlobConfig;

type HmacSha256 = Hmac<Sha256>;

/// Build the configured blob backend.
pub fn build_blob_store(config: &BlobConfig) -> Result<Arc<dyn BlobStore>> {
    match config.backend.as_str() {
        "local" => Ok(Arc::new(LocalBlobStore::new(
            &config.root,
            config.url_ttl_secs,
        )?)),
        "http" => {
            let base_url = config
                .base_url
                .as_deref()
                .context("blob.base_url is required for the http backend")?;
            let secret = config
                .signing_secret
                .as_deref()
                .context("blob.signing_secret is required for the http backend")?;
            Ok(Arc::new(HttpBlobStore::new(
                base_url,
                secret,
                config.url_ttl_secs,
                config.timeout_secs,
            )?))
        }
        other => bail!("Unknown blob backend: '{}'", other),
    }
}

/// Reject absolute paths and `..` so a blob path can never leave its root.
fn check_relative(path: &str) -> Result<&Path> {
    let p = Path::new(path);
    if path.is_empty() {
        bail!("Empty blob path");
    }
    for component in p.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => bail!("Invalid blob path: {}", path),
        }
    }
    Ok(p)
}

fn expiry(ttl_secs: u64) -> i64 {
    Utc::now().timestamp() + ttl_secs as i64
}

// ============ Local filesystem ============

pub struct LocalBlobStore {
    root: PathBuf,
    ttl_secs: u64,
}

impl LocalBlobStore {
    pub fn new(root: &Path, ttl_secs: u64) -> Result<Self> {
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(Self { root, ttl_secs })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        Ok(self.root.join(check_relative(path)?))
    }

    fn url_for(&self, path: &str, expires: i64) -> Result<String> {
        let file = self.resolve(path)?;
        let mut url = Url::from_file_path(&file)
            .map_err(|_| anyhow::anyhow!("Cannot build file URL for {}", file.display()))?;
        url.query_pairs_mut()
            .append_pair("expires", &expires.to_string());
        Ok(url.to_string())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn retrieval_url(&self, path: &str) -> Result<String> {
        self.url_for(path, expiry(self.ttl_secs))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = Url::parse(url).with_context(|| format!("Invalid blob URL: {}", url))?;
        if url.scheme() != "file" {
            bail!("Local blob store cannot fetch {} URLs", url.scheme());
        }

        let expires = url
            .query_pairs()
            .find(|(k, _)| k == "expires")
            .and_then(|(_, v)| v.parse::<i64>().ok())
            .context("Blob URL has no valid expires parameter")?;
        if Utc::now().timestamp() > expires {
            bail!("Blob URL expired");
        }

        let file = url
            .to_file_path()
            .map_err(|_| anyhow::anyhow!("Blob URL is not a file path"))?;
        if !file.starts_with(&self.root) {
            bail!("Blob URL points outside the blob root");
        }

        tokio::fs::read_to_string(&file)
            .await
            .with_context(|| format!("Failed to read blob {}", file.display()))
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, bytes)
            .await
            .with_context(|| format!("Failed to write blob {}", file.display()))?;
        debug!(path, "stored local blob");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let file = self.resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob {}", file.display())),
        }
    }
}

// ============ HTTP with signed URLs ============

pub struct HttpBlobStore {
    base_url: String,
    secret: Vec<u8>,
    ttl_secs: u64,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(base_url: &str, secret: &str, ttl_secs: u64, timeout_secs: u64) -> Result<Self> {
        Url::parse(base_url).with_context(|| format!("Invalid blob.base_url: {}", base_url))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.as_bytes().to_vec(),
            ttl_secs,
            client,
        })
    }

    /// Signed URL for `path`, valid until `expires` (Unix seconds).
    pub fn signed_url(&self, path: &str, expires: i64) -> Result<String> {
        check_relative(path)?;
        let signature = sign(&self.secret, path, expires)?;
        let encoded: Vec<String> = path.split('/').map(uri_encode).collect();
        Ok(format!(
            "{}/{}?expires={}&signature={}",
            self.base_url,
            encoded.join("/"),
            expires,
            signature
        ))
    }
}

/// Hex HMAC-SHA256 of `"<path>\n<expires>"`.
pub fn sign(secret: &[u8], path: &str, expires: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("Invalid signing key: {}", e))?;
    mac.update(format!("{}\n{}", path, expires).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a signature produced by [`sign`] and that it has not expired.
pub fn verify(secret: &[u8], path: &str, expires: i64, signature: &str, now: i64) -> bool {
    if now > expires {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}\n{}", path, expires).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn retrieval_url(&self, path: &str) -> Result<String> {
        self.signed_url(path, expiry(self.ttl_secs))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Blob GET failed")?;
        if !resp.status().is_success() {
            bail!("Blob GET returned {}", resp.status());
        }
        Ok(resp.text().await?)
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = self.signed_url(path, expiry(self.ttl_secs))?;
        let resp = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .with_context(|| format!("Blob PUT failed for {}", path))?;
        if !resp.status().is_success() {
            bail!("Blob PUT returned {} for {}", resp.status(), path);
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.signed_url(path, expiry(self.ttl_secs))?;
        let resp = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("Blob DELETE failed for {}", path))?;
        let status = resp.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            bail!("Blob DELETE returned {} for {}", status, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::{Path as AxumPath, Query, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_put_fetch_delete() {
        let tmp = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(tmp.path(), 60).unwrap();

        blobs
            .put("texts/a b.txt", b"hello blob".to_vec(), "text/plain")
            .await
            .unwrap();
        let url = blobs.retrieval_url("texts/a b.txt").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.contains("expires="));
        assert_eq!(blobs.fetch_text(&url).await.unwrap(), "hello blob");

        blobs.delete("texts/a b.txt").await.unwrap();
        assert!(blobs.fetch_text(&url).await.is_err());
        // deleting twice is fine
        blobs.delete("texts/a b.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_rejects_expired_and_escaping_urls() {
        let tmp = TempDir::new().unwrap();
        let blobs = LocalBlobStore::new(&tmp.path().join("root"), 60).unwrap();
        blobs.put("x.txt", b"x".to_vec(), "text/plain").await.unwrap();

        let expired = blobs.url_for("x.txt", Utc::now().timestamp() - 10).unwrap();
        let err = blobs.fetch_text(&expired).await.unwrap_err();
        assert!(err.to_string().contains("expired"));

        std::fs::write(tmp.path().join("secret.txt"), "no").unwrap();
        let mut outside = Url::from_file_path(tmp.path().join("secret.txt")).unwrap();
        outside
            .query_pairs_mut()
            .append_pair("expires", &(Utc::now().timestamp() + 60).to_string());
        assert!(blobs.fetch_text(outside.as_str()).await.is_err());

        assert!(blobs.put("../evil.txt", vec![], "text/plain").await.is_err());
        assert!(blobs.retrieval_url("/etc/passwd").await.is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let sig = sign(b"k", "uploads/1/a.pdf", 1_700_000_000).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify(b"k", "uploads/1/a.pdf", 1_700_000_000, &sig, 1_600_000_000));
        assert!(!verify(b"k", "uploads/1/a.pdf", 1_700_000_000, &sig, 1_800_000_000));
        assert!(!verify(b"other", "uploads/1/a.pdf", 1_700_000_000, &sig, 1_600_000_000));
        assert!(!verify(b"k", "uploads/1/b.pdf", 1_700_000_000, &sig, 1_600_000_000));
    }

    #[test]
    fn test_signed_url_shape() {
        let blobs = HttpBlobStore::new("https://blobs.example.com/", "k", 60, 5).unwrap();
        let url = blobs.signed_url("uploads/1/my file.pdf", 1_700_000_000).unwrap();
        let sig = sign(b"k", "uploads/1/my file.pdf", 1_700_000_000).unwrap();
        assert_eq!(
            url,
            format!(
                "https://blobs.example.com/uploads/1/my%20file.pdf?expires=1700000000&signature={}",
                sig
            )
        );
    }

    type Shared = Arc<Mutex<HashMap<String, Vec<u8>>>>;

    fn authorized(params: &HashMap<String, String>, path: &str) -> bool {
        let expires = params
            .get("expires")
            .and_then(|e| e.parse::<i64>().ok())
            .unwrap_or(0);
        let sig = params.get("signature").map(String::as_str).unwrap_or("");
        verify(b"secret", path, expires, sig, Utc::now().timestamp())
    }

    async fn get_blob(
        State(state): State<Shared>,
        AxumPath(path): AxumPath<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Vec<u8>, StatusCode> {
        if !authorized(&params, &path) {
            return Err(StatusCode::FORBIDDEN);
        }
        state
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or(StatusCode::NOT_FOUND)
    }

    async fn put_blob(
        State(state): State<Shared>,
        AxumPath(path): AxumPath<String>,
        Query(params): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> StatusCode {
        if !authorized(&params, &path) {
            return StatusCode::FORBIDDEN;
        }
        state.lock().unwrap().insert(path, body.to_vec());
        StatusCode::CREATED
    }

    async fn delete_blob(
        State(state): State<Shared>,
        AxumPath(path): AxumPath<String>,
        Query(params): Query<HashMap<String, String>>,
    ) -> StatusCode {
        if !authorized(&params, &path) {
            return StatusCode::FORBIDDEN;
        }
        match state.lock().unwrap().remove(&path) {
            Some(_) => StatusCode::NO_CONTENT,
            None => StatusCode::NOT_FOUND,
        }
    }

    #[tokio::test]
    async fn test_http_store_against_signed_server() {
        let state: Shared = Arc::new(Mutex::new(HashMap::new()));
        let app = Router::new()
            .route(
                "/{*path}",
                get(get_blob).put(put_blob).delete(delete_blob),
            )
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let blobs = HttpBlobStore::new(&format!("http://{}", addr), "secret", 60, 5).unwrap();
        blobs
            .put("texts/report.txt", b"remote text".to_vec(), "text/plain")
            .await
            .unwrap();
        assert!(state.lock().unwrap().contains_key("texts/report.txt"));

        let url = blobs.retrieval_url("texts/report.txt").await.unwrap();
        assert_eq!(blobs.fetch_text(&url).await.unwrap(), "remote text");

        blobs.delete("texts/report.txt").await.unwrap();
        blobs.delete("texts/report.txt").await.unwrap();
        assert!(blobs.fetch_text(&url).await.is_err());

        let forged = HttpBlobStore::new(&format!("http://{}", addr), "wrong", 60, 5).unwrap();
        assert!(forged.put("texts/x.txt", vec![1], "text/plain").await.is_err());
    }
}
