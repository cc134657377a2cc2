//! Push subscription setup with the VAPID application server key.

use async_trait::async_trait;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushSubscriptionError {
    MissingKey,
    InvalidKey(String),
    Rejected(String),
}

impl Display for PushSubscriptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKey => write!(f, "no application server key configured"),
            Self::InvalidKey(message) => write!(f, "invalid application server key: {message}"),
            Self::Rejected(message) => write!(f, "push subscription rejected: {message}"),
        }
    }
}

impl Error for PushSubscriptionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscription {
    pub endpoint: String,
}

#[async_trait]
pub trait PushManager: Send + Sync {
    async fn subscribe(
        &self,
        options: SubscribeOptions,
    ) -> Result<PushSubscription, PushSubscriptionError>;
}

/// Decodes a base64url key, with or without padding; standard-alphabet
/// `+` and `/` are accepted too.
pub fn decode_application_server_key(key: &str) -> Result<Vec<u8>, PushSubscriptionError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(PushSubscriptionError::MissingKey);
    }
    let normalized = trimmed.replace('+', "-").replace('/', "_");
    URL_SAFE_LENIENT
        .decode(normalized)
        .map_err(|err| PushSubscriptionError::InvalidKey(err.to_string()))
}

/// Subscribes for user-visible pushes. Failures are logged, never raised.
pub async fn subscribe_to_push(
    manager: &dyn PushManager,
    application_server_key: Option<&str>,
) -> Option<PushSubscription> {
    let result = match application_server_key {
        Some(key) => match decode_application_server_key(key) {
            Ok(key_bytes) => {
                manager
                    .subscribe(SubscribeOptions {
                        user_visible_only: true,
                        application_server_key: key_bytes,
                    })
                    .await
            }
            Err(err) => Err(err),
        },
        None => Err(PushSubscriptionError::MissingKey),
    };

    match result {
        Ok(subscription) => {
            info!("event=push_subscribe module=notify status=ok");
            Some(subscription)
        }
        Err(err) => {
            error!("event=push_subscribe module=notify status=error error={err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_application_server_key, PushSubscriptionError};

    #[test]
    fn decodes_unpadded_url_safe_key() {
        // "hello?>" in base64url is "aGVsbG8_Pg" (no padding).
        assert_eq!(
            decode_application_server_key("aGVsbG8_Pg").unwrap(),
            b"hello?>".to_vec()
        );
        assert_eq!(
            decode_application_server_key("aGVsbG8/Pg==").unwrap(),
            b"hello?>".to_vec()
        );
    }

    #[test]
    fn rejects_blank_and_garbage_keys() {
        assert_eq!(
            decode_application_server_key("  "),
            Err(PushSubscriptionError::MissingKey)
        );
        assert!(matches!(
            decode_application_server_key("not base64!!"),
            Err(PushSubscriptionError::InvalidKey(_))
        ));
    }
}
