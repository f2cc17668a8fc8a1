//! Emergency event broadcasting for real-time alert streams.
//!
//! Write-side handlers publish `EmergencyEvent`s; every open streaming
//! connection owns a `Subscription` that turns queued events into frames.
//!
//! # Architecture
//!
//! ```text
//!   alert handlers ──publish──▶ ┌──────────────────────────────┐
//!                               │     EmergencyBroadcaster     │
//!                               │ shared FIFO | per-sub queues │
//!                               └──────────────────────────────┘
//!                                  │            │            │
//!                                  ▼            ▼            ▼
//!                            Subscription Subscription Subscription
//!                            (one per SSE connection; ping after
//!                             the keepalive window, ends on disconnect)
//! ```
//!
//! # Delivery
//!
//! With [`DeliveryMode::Shared`] (the default) all subscribers pull from one
//! queue, so each event reaches exactly one of them. [`DeliveryMode::Fanout`]
//! gives every subscriber its own queue instead.
//!
//! # Module Structure
//!
//! - [`types`]: `EmergencyEvent`, `AlertEventKind`, `StreamFrame`
//! - [`broadcaster`]: the broadcaster and its options
//! - [`subscription`]: the per-connection subscriber loop
//! - [`connection`]: connection liveness capability

pub mod broadcaster;
pub mod connection;
pub mod subscription;
pub mod types;

pub use broadcaster::{BroadcasterOptions, DEFAULT_KEEPALIVE, DeliveryMode, EmergencyBroadcaster};
pub use connection::{ClientConnection, ConnectionLiveness};
pub use subscription::Subscription;
pub use types::{ALERT_FRAME, AlertEventKind, EmergencyEvent, PING_FRAME, StreamFrame};
