//! # Modality Events
//!
//! This project is a Rust client for the event streams published by the modality imaging
//! service. The service pushes device-change and acquisition-status notifications over a
//! long-lived text stream; this crate turns that stream into typed events, delivers them to
//! your code, keeps track of the server's heartbeats and lets you stop the subscription from
//! any task without races.
//!
//! ## About the event stream
//!
//! The stream is line oriented and SSE-like. Every frame is exactly two lines, a header and a
//! data line:
//!
//! ```text
//! event: message
//! data: {"action":"added","deviceInfo":{"deviceId":"dev-1"}}
//! event: heartbeat
//! data: {"heartbeatTimeout":20000}
//! ```
//!
//! - `event: message` frames carry the primary payload (a device event or an acquisition
//!   status, depending on the stream).
//! - `event: heartbeat` frames tell the client how long it may go without hearing from the
//!   server.
//! - Frames with any other header are skipped, and so are data lines without the `data: `
//!   marker.
//!
//! ## Features
//!
//! - **Subscription engine**:
//!   - One background tokio task per running subscription
//!   - Non-blocking `start()`, bounded `stop()` that always closes the stream
//!   - Restartable: a stopped subscription can be started again
//!   - `start()` on a running subscription is rejected instead of spawning a second reader
//!
//! - **Event delivery**:
//!   - Closure callbacks for events, heartbeats, errors and run start/stop
//!   - `SubscriptionListener` trait for listener objects
//!   - `ChannelSubscriptionListener` forwarding everything into a tokio mpsc channel
//!
//! - **Protocol handling**:
//!   - Cancellable line reading, tolerant of `\r\n` and stray blank lines
//!   - Pluggable payload decoders, JSON by default
//!   - Configurable header tags and data marker
//!
//! - **Error handling**:
//!   - Undecodable payloads are reported and the run continues
//!   - Stream failures are reported and end the run
//!   - Cancellation is never reported as an error
//!
//! ## Usage
//!
//! The crate does not open connections itself: pass it any `AsyncRead` you obtained from
//! your HTTP client of choice.
//!
//! ```ignore
//! use modality_events::subscription::Subscription;
//! use modality_events::types::{DeviceEventData, DeviceEventSubscription};
//! use modality_events::utils::setup_logger;
//! use tracing::info;
//!
//! async fn example(stream: impl tokio::io::AsyncRead + Send + Unpin + 'static)
//!     -> Result<(), Box<dyn std::error::Error>>
//! {
//!     setup_logger();
//!
//!     let mut subscription: DeviceEventSubscription = Subscription::open_json(stream, |data: &DeviceEventData| {
//!         info!("{:?}: {}", data.action, data.device_info.device_id);
//!     })
//!     .on_heartbeat(|heartbeat| info!("Heartbeat timeout: {}ms", heartbeat.timeout_millis))
//!     .on_started(|| info!("Device event subscription started"))
//!     .on_stopped(|| info!("Device event subscription stopped"))
//!     .on_error(|err| info!("Device event subscription error: {}", err));
//!
//!     subscription.start()?;
//!     tokio::time::sleep(std::time::Duration::from_secs(30)).await;
//!     subscription.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ### Consuming events from a channel
//!
//! ```ignore
//! use modality_events::subscription::{ChannelSubscriptionListener, Subscription, SubscriptionEvent};
//! use modality_events::types::AcquisitionStatus;
//!
//! let (listener, mut rx) = ChannelSubscriptionListener::<AcquisitionStatus>::create_channel();
//! let mut subscription = Subscription::open_json(stream, |_: &AcquisitionStatus| {});
//! subscription.add_listener(Box::new(listener));
//! subscription.start()?;
//!
//! while let Some(event) = rx.recv().await {
//!     match event {
//!         SubscriptionEvent::Event(status) => println!("{:?}", status.state),
//!         SubscriptionEvent::Stopped => break,
//!         _ => {}
//!     }
//! }
//! ```
//!

/// Module containing the event stream protocol.
///
/// This module provides the line reader, the frame parser and the payload decoders the
/// subscription engine is built from.
pub mod protocol;

/// Module containing subscription-related functionality.
///
/// This module provides the `Subscription` engine, its configuration, listeners and the
/// heartbeat monitor.
pub mod subscription;

/// Module containing the payload types published by the modality service.
pub mod types;

/// Module containing utility functions and error types.
///
/// This module provides the error type used throughout the library, logger setup and
/// signal handling helpers.
pub mod utils;
