//! Destinations for JSON artifacts.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{error, info};

use crate::{Error, Result, REQUEST_TIMEOUT_SECS};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores `body` under `key` and returns where it ended up.
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String>;
}

/// Serializes `value` as indented UTF-8 JSON (non-ASCII left as is) and stores it.
/// Failures are logged and turned into `None`.
pub async fn put_json<T>(store: &dyn ArtifactStore, key: &str, value: &T) -> Option<String>
where
    T: Serialize + ?Sized,
{
    let stored = match serde_json::to_vec_pretty(value) {
        Ok(body) => store.put(key, body).await,
        Err(e) => Err(e.into()),
    };

    match stored {
        Ok(location) => {
            info!(%location, "saved artifact");
            Some(location)
        }
        Err(e) => {
            error!(key, "failed to save artifact: {e}");
            None
        }
    }
}

/// Writes artifacts below a local directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStore { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String> {
        let path = self.root.join(key.trim_start_matches('/'));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&path).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        Ok(path.display().to_string())
    }
}

/// `PUT`s artifacts to `<base_url>/<key>`, e.g. a bucket endpoint or a pre-authorized prefix.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Every `PUT` gives up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpStore {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl ArtifactStore for HttpStore {
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<String> {
        let location = format!("{}/{}", self.base_url, key.trim_start_matches('/'));
        let mut req = self
            .client
            .put(&location)
            .header(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))
            .body(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(Error::StoreRejected {
                location,
                status: status.as_u16(),
            });
        }
        Ok(location)
    }
}
