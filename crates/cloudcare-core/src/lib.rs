pub mod error;
pub mod events;
pub mod time;

pub use error::{CoreError, Result};
pub use events::{
    AlertEventKind, BroadcasterOptions, ClientConnection, ConnectionLiveness, DeliveryMode,
    EmergencyBroadcaster, EmergencyEvent, StreamFrame, Subscription,
};
pub use time::{Timestamp, now_rfc3339, now_utc};
