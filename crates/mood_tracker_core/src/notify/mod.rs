//! Push message display and notification interaction.
//!
//! Delivery is fire-and-forget: no acknowledgement, no retry.

pub mod delivery;
pub mod subscription;

pub use delivery::{
    Notification, NotificationAction, NotificationClick, NotificationData, NotificationDelivery,
    NotificationError, NotificationHost, PushMessage, EXPLORE_ACTION,
};
pub use subscription::{
    decode_application_server_key, subscribe_to_push, PushManager, PushSubscription,
    PushSubscriptionError, SubscribeOptions,
};
