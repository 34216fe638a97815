use std::time::Duration;

use serde::Serialize;

use crate::{
    Error, Result, DEFAULT_BASE_URL, DEFAULT_WORKER_LIMIT, DETAILS_BASE_KEY, FALLBACK_BASE_URL,
    REQUEST_TIMEOUT_SECS, USER_AGENT,
};

/// Where and how to talk to the web service.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base of the `Deputados.asmx` service, without trailing slash.
    pub base_url: String,
    /// Tried for the list endpoints when the primary base fails or returns nothing.
    pub fallback_base_url: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            fallback_base_url: Some(FALLBACK_BASE_URL.to_string()),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl ApiConfig {
    /// Config for a single base URL and no fallback.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        ApiConfig {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fallback_base_url: None,
            ..Default::default()
        }
    }

    /// Adds a secondary base for the list endpoints.
    pub fn with_fallback_base_url(mut self, fallback: impl Into<String>) -> Self {
        self.fallback_base_url = Some(fallback.into().trim_end_matches('/').to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn deputies_url(base: &str) -> String {
        format!("{}/ObterDeputados", base.trim_end_matches('/'))
    }

    pub fn parties_url(base: &str) -> String {
        format!("{}/ObterPartidosCD", base.trim_end_matches('/'))
    }

    pub fn detail_url(&self) -> String {
        format!("{}/ObterDetalhesDeputado", self.base_url)
    }
}

/// Knobs of a single detail run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub worker_limit: usize,
    /// Only the first `limit` deputies are fetched. `None` or `Some(0)` fetches all.
    pub limit: Option<usize>,
    /// Key prefix every artifact is written under.
    pub base_key: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            worker_limit: DEFAULT_WORKER_LIMIT,
            limit: None,
            base_key: DETAILS_BASE_KEY.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_limit == 0 {
            return Err(Error::Config("worker limit must be at least 1".into()));
        }
        if self.base_key.trim_matches('/').is_empty() {
            return Err(Error::Config("base key must not be empty".into()));
        }
        Ok(())
    }

    /// The limit that actually truncates the list, if any.
    pub fn effective_limit(&self) -> Option<usize> {
        self.limit.filter(|&l| l > 0)
    }
}
