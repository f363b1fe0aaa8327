/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Payloads carried by the modality service's event streams.
//!
//! The service publishes two streams: device changes (`devices/subscribe`) and
//! acquisition status for a session (`acquisition/{id}/status/subscribe`).
//! Both are consumed with the same [`Subscription`] engine.

mod acquisition;
mod device;

use crate::subscription::Subscription;

pub use acquisition::{AcquisitionState, AcquisitionStatus};
pub use device::{BatteryInfo, BatteryLevel, DeviceEventData, DeviceInfo, DeviceStatus, EventAction};

/// Heartbeat interval, in milliseconds, requested for device event streams.
pub const DEVICE_EVENTS_HEARTBEAT_MS: u64 = 20_000;

/// Heartbeat interval, in milliseconds, requested for acquisition status streams.
pub const ACQUISITION_STATUS_HEARTBEAT_MS: u64 = 1_000;

/// Subscription to device added/removed/changed notifications.
pub type DeviceEventSubscription = Subscription<DeviceEventData>;

/// Subscription to acquisition status updates of one session.
pub type AcquisitionStatusSubscription = Subscription<AcquisitionStatus>;
