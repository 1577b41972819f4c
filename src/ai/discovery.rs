//! Local-service discovery
//!
//! Finds a reachable Ollama base URL. An explicit override wins outright, then
//! the configured URL and a fixed list of fallbacks are probed in order. The
//! answer is computed once per [`LocalDiscovery`] and cached; [`shared_for`]
//! keeps one process-wide instance per configured endpoint.

use crate::config::non_empty_var;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::OnceCell;

/// Override returned without probing.
pub const OVERRIDE_VAR: &str = "OLLAMA_HOST";

pub const FALLBACK_URLS: &[&str] = &[
    "http://localhost:11434/",
    "http://127.0.0.1:11434/",
    "http://host.docker.internal:11434/",
];

pub const PROBE_WAIT: Duration = Duration::from_millis(200);

/// Liveness check for a host and port. Never fails, only answers.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_open(&self, host: &str, port: u16) -> bool;
}

/// Probe by opening a TCP connection, bounded by a short wait.
#[derive(Clone, Debug)]
pub struct TcpProbe {
    wait: Duration,
}

impl TcpProbe {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(PROBE_WAIT)
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn is_open(&self, host: &str, port: u16) -> bool {
        match tokio::time::timeout(self.wait, TcpStream::connect((host, port))).await {
            // The stream is dropped right away, closing the connection.
            Ok(Ok(_stream)) => true,
            Ok(Err(err)) => {
                tracing::debug!(host, port, %err, "probe refused");
                false
            }
            Err(_) => {
                tracing::debug!(host, port, "probe timed out");
                false
            }
        }
    }
}

pub struct LocalDiscovery {
    override_url: Option<String>,
    configured: Option<String>,
    candidates: Vec<String>,
    probe: Arc<dyn Probe>,
    resolved: OnceCell<Option<String>>,
}

impl LocalDiscovery {
    /// No override, no configured URL, the default fallbacks.
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            override_url: None,
            configured: None,
            candidates: FALLBACK_URLS.iter().map(|url| url.to_string()).collect(),
            probe,
            resolved: OnceCell::new(),
        }
    }

    /// TCP probing, with the override taken from `OLLAMA_HOST`.
    pub fn from_env() -> Self {
        let mut discovery = Self::new(Arc::new(TcpProbe::default()));
        discovery.override_url = non_empty_var(OVERRIDE_VAR).map(|url| normalize(&url));
        discovery
    }

    pub fn with_override(mut self, url: impl Into<String>) -> Self {
        self.override_url = Some(normalize(&url.into()));
        self
    }

    pub fn with_configured(mut self, url: impl Into<String>) -> Self {
        self.configured = Some(url.into());
        self
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Base URL of a reachable service, computed on first call and cached.
    pub async fn resolve(&self) -> Option<String> {
        self.resolved.get_or_init(|| self.discover()).await.clone()
    }

    async fn discover(&self) -> Option<String> {
        if let Some(url) = &self.override_url {
            tracing::debug!(%url, "using endpoint override");
            return Some(url.clone());
        }

        for url in self.configured.iter().chain(self.candidates.iter()) {
            if self.is_live(url).await {
                tracing::debug!(%url, "discovered local endpoint");
                return Some(url.clone());
            }
        }

        tracing::warn!("no local LLM endpoint answered");
        None
    }

    /// Probe the host and port of `url`. Unparseable URLs are simply not live.
    pub async fn is_live(&self, url: &str) -> bool {
        match host_port(url) {
            Some((host, port)) => self.probe.is_open(&host, port).await,
            None => {
                tracing::warn!(%url, "cannot parse endpoint url");
                false
            }
        }
    }
}

/// Process-wide discovery, initialized lazily from the environment.
pub fn shared() -> Arc<LocalDiscovery> {
    shared_for(None)
}

/// Process-wide discovery for a configured endpoint.
///
/// One instance per distinct configured URL, so each is probed at most once
/// per process no matter how many clients are built.
pub fn shared_for(configured: Option<&str>) -> Arc<LocalDiscovery> {
    static SHARED: Lazy<Mutex<HashMap<Option<String>, Arc<LocalDiscovery>>>> =
        Lazy::new(|| Mutex::new(HashMap::new()));

    let mut entries = SHARED.lock().unwrap_or_else(PoisonError::into_inner);
    entries
        .entry(configured.map(str::to_string))
        .or_insert_with(|| {
            let discovery = LocalDiscovery::from_env();
            Arc::new(match configured {
                Some(url) => discovery.with_configured(url),
                None => discovery,
            })
        })
        .clone()
}

fn host_port(url: &str) -> Option<(String, u16)> {
    let parsed = Url::parse(url).ok()?;
    // IPv6 hosts come back bracketed, which does not resolve as an address.
    let host = parsed
        .host_str()?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = parsed.port_or_known_default()?;
    Some((host, port))
}

/// `OLLAMA_HOST` is often written as a bare `host:port`.
fn normalize(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}
