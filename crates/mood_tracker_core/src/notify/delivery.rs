use crate::config::AppConfig;
use crate::model::now_epoch_ms;
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Action id that opens the dashboard.
pub const EXPLORE_ACTION: &str = "explore";
pub const CLOSE_ACTION: &str = "close";
const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    Host(String),
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host(message) => write!(f, "notification host error: {message}"),
        }
    }
}

impl Error for NotificationError {}

/// Raw push payload; the body is rendered verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PushMessage {
    pub data: Option<Vec<u8>>,
}

impl PushMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            data: Some(body.into().into_bytes()),
        }
    }

    /// Payload as text; empty when the push carried no data.
    pub fn body_text(&self) -> String {
        self.data
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// User interaction with a shown notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClick {
    pub notification_id: String,
    /// `None` when the notification body itself was clicked.
    pub action: Option<String>,
}

/// Platform surface that shows notifications and opens windows.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    /// Returns the host's id for the shown notification.
    async fn show(&self, notification: Notification) -> Result<String, NotificationError>;
    async fn close(&self, notification_id: &str) -> Result<(), NotificationError>;
    async fn open_window(&self, url: &str) -> Result<(), NotificationError>;
}

pub struct NotificationDelivery {
    host: Arc<dyn NotificationHost>,
    title: String,
    icon: String,
    dashboard_url: String,
}

impl NotificationDelivery {
    pub fn new(config: &AppConfig, host: Arc<dyn NotificationHost>) -> Self {
        Self {
            host,
            title: config.notification_title.clone(),
            icon: config.notification_icon.clone(),
            dashboard_url: config.dashboard_path.clone(),
        }
    }

    /// Notification shown for `message`.
    pub fn build(&self, message: &PushMessage) -> Notification {
        Notification {
            title: self.title.clone(),
            body: message.body_text(),
            icon: self.icon.clone(),
            badge: self.icon.clone(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: NotificationData {
                date_of_arrival: now_epoch_ms(),
                primary_key: 1,
            },
            actions: vec![
                NotificationAction {
                    action: EXPLORE_ACTION.to_string(),
                    title: "View Dashboard".to_string(),
                },
                NotificationAction {
                    action: CLOSE_ACTION.to_string(),
                    title: "Close".to_string(),
                },
            ],
        }
    }

    pub async fn on_push(&self, message: &PushMessage) -> Result<String, NotificationError> {
        let notification = self.build(message);
        let body_bytes = notification.body.len();
        let id = self.host.show(notification).await?;
        info!(
            "event=push_received module=notify status=ok notification_id={id} body_bytes={body_bytes}"
        );
        Ok(id)
    }

    /// Closes the notification; opens the dashboard for the explore action.
    ///
    /// Returns whether a window was opened.
    pub async fn on_click(&self, click: &NotificationClick) -> Result<bool, NotificationError> {
        if let Err(err) = self.host.close(&click.notification_id).await {
            warn!(
                "event=notification_close module=notify status=error notification_id={} error={}",
                click.notification_id, err
            );
        }

        if click.action.as_deref() != Some(EXPLORE_ACTION) {
            debug!(
                "event=notification_click module=notify status=ok notification_id={} opened=false",
                click.notification_id
            );
            return Ok(false);
        }

        self.host.open_window(&self.dashboard_url).await?;
        info!(
            "event=notification_click module=notify status=ok notification_id={} opened=true",
            click.notification_id
        );
        Ok(true)
    }
}
