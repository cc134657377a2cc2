//! Cache generation lifecycle and fetch interception.
//!
//! # Invariants
//! - Install is all-or-nothing: nothing is written unless every manifest
//!   resource fetched with a 2xx status, and a failed write removes the
//!   partially written generation.
//! - After `activate` the only surviving generation is `version`.
//! - For one request the network attempt always precedes the cache lookup.
//! - Opportunistic cache writes run on a spawned task; the caller never
//!   waits for them.

use super::http::{Request, Response};
use super::network::{Network, NetworkError};
use super::storage::{CacheError, CacheStorage};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyPhase {
    /// Constructed, install not attempted yet.
    Parsed,
    Installing,
    /// Generation fully populated; activation may proceed immediately.
    Installed,
    Activating,
    Activated,
    /// Install failed; this proxy's generation is not authoritative.
    Redundant,
}

#[derive(Debug)]
pub enum ProxyError {
    InstallFailed { url: String, reason: String },
    InvalidPhase { operation: &'static str, phase: ProxyPhase },
    Cache(CacheError),
    /// Network failed and nothing was cached for the request.
    NoResponse { url: String, cause: NetworkError },
}

impl Display for ProxyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstallFailed { url, reason } => {
                write!(f, "install failed while caching {url}: {reason}")
            }
            Self::InvalidPhase { operation, phase } => {
                write!(f, "cannot {operation} while proxy is {phase:?}")
            }
            Self::Cache(err) => write!(f, "{err}"),
            Self::NoResponse { url, cause } => {
                write!(f, "no response for {url}: {cause}; nothing cached")
            }
        }
    }
}

impl Error for ProxyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Cache(err) => Some(err),
            Self::NoResponse { cause, .. } => Some(cause),
            Self::InstallFailed { .. } | Self::InvalidPhase { .. } => None,
        }
    }
}

impl From<CacheError> for ProxyError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

/// Response handed back to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

pub struct ResourceCacheProxy {
    version: String,
    manifest: Vec<String>,
    network: Arc<dyn Network>,
    caches: Arc<dyn CacheStorage>,
    phase: Mutex<ProxyPhase>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl ResourceCacheProxy {
    /// `manifest` holds absolute URLs of the resources cached at install.
    pub fn new(
        version: impl Into<String>,
        manifest: Vec<String>,
        network: Arc<dyn Network>,
        caches: Arc<dyn CacheStorage>,
    ) -> Self {
        Self {
            version: version.into(),
            manifest,
            network,
            caches,
            phase: Mutex::new(ProxyPhase::Parsed),
            pending_writes: Mutex::new(Vec::new()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn phase(&self) -> ProxyPhase {
        *self.phase_lock()
    }

    /// Populates the `version` generation with every manifest resource.
    pub async fn install(&self) -> Result<(), ProxyError> {
        self.transition(
            "install",
            &[ProxyPhase::Parsed, ProxyPhase::Redundant],
            ProxyPhase::Installing,
        )?;
        info!(
            "event=cache_install module=cache status=start version={} resources={}",
            self.version,
            self.manifest.len()
        );

        match self.populate_generation().await {
            Ok(()) => {
                self.set_phase(ProxyPhase::Installed);
                info!("event=cache_install module=cache status=ok version={}", self.version);
                Ok(())
            }
            Err(err) => {
                self.set_phase(ProxyPhase::Redundant);
                error!(
                    "event=cache_install module=cache status=error version={} error={}",
                    self.version, err
                );
                Err(err)
            }
        }
    }

    /// Deletes every generation except `version`; returns the removed labels.
    pub async fn activate(&self) -> Result<Vec<String>, ProxyError> {
        self.transition(
            "activate",
            &[ProxyPhase::Installed, ProxyPhase::Activated],
            ProxyPhase::Activating,
        )?;

        let result = self.retire_stale_generations().await;
        match &result {
            Ok(removed) => {
                self.set_phase(ProxyPhase::Activated);
                info!(
                    "event=cache_activate module=cache status=ok version={} removed={}",
                    self.version,
                    removed.len()
                );
            }
            Err(err) => {
                self.set_phase(ProxyPhase::Installed);
                error!(
                    "event=cache_activate module=cache status=error version={} error={}",
                    self.version, err
                );
            }
        }
        result
    }

    /// Network first, cache fallback. Responses are only written back once
    /// the `version` generation has been installed.
    pub async fn fetch(&self, request: &Request) -> Result<Served, ProxyError> {
        match self.network.fetch(request).await {
            Ok(response) => {
                let cacheable = request.is_read_only() && response.status == 200;
                if cacheable && self.accepts_writes() {
                    self.spawn_cache_write(request.clone(), response.clone());
                }
                debug!(
                    "event=proxy_fetch module=cache status=ok source=network method={} url={} http_status={}",
                    request.method, request.url, response.status
                );
                Ok(Served {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(cause) => self.fallback(request, cause).await,
        }
    }

    /// Waits for every cache write spawned by `fetch` so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(
            &mut *self
                .pending_writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(err) = handle.await {
                warn!("event=cache_put module=cache status=error error={err}");
            }
        }
    }

    async fn populate_generation(&self) -> Result<(), ProxyError> {
        let mut staged = Vec::with_capacity(self.manifest.len());
        for url in &self.manifest {
            let request = Request::get(url.as_str());
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|err| ProxyError::InstallFailed {
                    url: url.clone(),
                    reason: err.to_string(),
                })?;
            if !response.is_success() {
                return Err(ProxyError::InstallFailed {
                    url: url.clone(),
                    reason: format!("http status {}", response.status),
                });
            }
            staged.push((request, response));
        }

        let created = self.caches.open(&self.version).await?;
        for (request, response) in staged {
            if let Err(err) = self.caches.put(&self.version, &request, response).await {
                if !created {
                    return Err(err.into());
                }
                if let Err(cleanup) = self.caches.delete(&self.version).await {
                    warn!(
                        "event=cache_install_cleanup module=cache status=error version={} error={}",
                        self.version, cleanup
                    );
                }
                return Err(err.into());
            }
        }
        Ok(())
    }

    async fn retire_stale_generations(&self) -> Result<Vec<String>, ProxyError> {
        let mut removed = Vec::new();
        for label in self.caches.keys().await? {
            if label == self.version {
                continue;
            }
            if self.caches.delete(&label).await? {
                debug!("event=cache_retire module=cache status=ok generation={label}");
                removed.push(label);
            }
        }
        Ok(removed)
    }

    async fn fallback(&self, request: &Request, cause: NetworkError) -> Result<Served, ProxyError> {
        let cached = match self.caches.match_any(request).await {
            Ok(cached) => cached,
            Err(err) => {
                warn!(
                    "event=proxy_fetch module=cache status=error source=cache url={} error={}",
                    request.url, err
                );
                None
            }
        };

        match cached {
            Some(response) => {
                info!(
                    "event=proxy_fetch module=cache status=ok source=cache url={} network_error={}",
                    request.url, cause
                );
                Ok(Served {
                    response,
                    source: ResponseSource::Cache,
                })
            }
            None => {
                warn!(
                    "event=proxy_fetch module=cache status=miss url={} network_error={}",
                    request.url, cause
                );
                Err(ProxyError::NoResponse {
                    url: request.url.clone(),
                    cause,
                })
            }
        }
    }

    fn spawn_cache_write(&self, request: Request, response: Response) {
        let caches = Arc::clone(&self.caches);
        let version = self.version.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = caches.put(&version, &request, response).await {
                warn!(
                    "event=cache_put module=cache status=error version={} url={} error={}",
                    version, request.url, err
                );
            }
        });

        let mut pending = self
            .pending_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }

    fn transition(
        &self,
        operation: &'static str,
        allowed: &[ProxyPhase],
        next: ProxyPhase,
    ) -> Result<(), ProxyError> {
        let mut phase = self.phase_lock();
        if !allowed.contains(&*phase) {
            return Err(ProxyError::InvalidPhase {
                operation,
                phase: *phase,
            });
        }
        *phase = next;
        Ok(())
    }

    fn accepts_writes(&self) -> bool {
        matches!(
            self.phase(),
            ProxyPhase::Installed | ProxyPhase::Activating | ProxyPhase::Activated
        )
    }

    fn set_phase(&self, next: ProxyPhase) {
        *self.phase_lock() = next;
    }

    fn phase_lock(&self) -> MutexGuard<'_, ProxyPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
