//! Background worker context: the resource cache proxy and notification
//! delivery share one event loop.

use crate::cache::{
    CacheStorage, Network, ProxyError, Request, ResourceCacheProxy, Served,
};
use crate::config::AppConfig;
use crate::notify::{
    NotificationClick, NotificationDelivery, NotificationError, NotificationHost, PushMessage,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// External events delivered to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
    Push(PushMessage),
    NotificationClick(NotificationClick),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Installed,
    Activated { removed_generations: Vec<String> },
    Responded(Served),
    NotificationShown { notification_id: String },
    NotificationHandled { opened_window: bool },
}

#[derive(Debug)]
pub enum WorkerError {
    Proxy(ProxyError),
    Notification(NotificationError),
}

impl Display for WorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proxy(err) => write!(f, "{err}"),
            Self::Notification(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Proxy(err) => Some(err),
            Self::Notification(err) => Some(err),
        }
    }
}

impl From<ProxyError> for WorkerError {
    fn from(value: ProxyError) -> Self {
        Self::Proxy(value)
    }
}

impl From<NotificationError> for WorkerError {
    fn from(value: NotificationError) -> Self {
        Self::Notification(value)
    }
}

pub struct BackgroundWorker {
    proxy: ResourceCacheProxy,
    notifications: NotificationDelivery,
}

impl BackgroundWorker {
    pub fn new(
        config: &AppConfig,
        network: Arc<dyn Network>,
        caches: Arc<dyn CacheStorage>,
        host: Arc<dyn NotificationHost>,
    ) -> Self {
        let manifest = config
            .cache_manifest
            .iter()
            .map(|path| config.resolve(path))
            .collect();
        Self {
            proxy: ResourceCacheProxy::new(config.cache_version.clone(), manifest, network, caches),
            notifications: NotificationDelivery::new(config, host),
        }
    }

    pub fn proxy(&self) -> &ResourceCacheProxy {
        &self.proxy
    }

    pub fn notifications(&self) -> &NotificationDelivery {
        &self.notifications
    }

    pub async fn handle(&self, event: WorkerEvent) -> Result<WorkerOutcome, WorkerError> {
        let outcome = match event {
            WorkerEvent::Install => {
                self.proxy.install().await?;
                WorkerOutcome::Installed
            }
            WorkerEvent::Activate => WorkerOutcome::Activated {
                removed_generations: self.proxy.activate().await?,
            },
            WorkerEvent::Fetch(request) => {
                WorkerOutcome::Responded(self.proxy.fetch(&request).await?)
            }
            WorkerEvent::Push(message) => WorkerOutcome::NotificationShown {
                notification_id: self.notifications.on_push(&message).await?,
            },
            WorkerEvent::NotificationClick(click) => WorkerOutcome::NotificationHandled {
                opened_window: self.notifications.on_click(&click).await?,
            },
        };
        Ok(outcome)
    }
}
