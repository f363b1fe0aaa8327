use serde::{Deserialize, Serialize};

/// What happened to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    #[serde(alias = "Added")]
    Added,
    #[serde(alias = "Removed")]
    Removed,
    #[serde(alias = "Changed")]
    Changed,
}

/// Availability of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceStatus {
    #[default]
    #[serde(alias = "available")]
    Available,
    #[serde(alias = "inUse")]
    InUse,
    #[serde(alias = "unavailable")]
    Unavailable,
    #[serde(alias = "error")]
    Error,
}

/// Coarse battery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatteryLevel {
    /// Recently recharged
    #[default]
    #[serde(alias = "full")]
    Full,
    /// Sufficient
    #[serde(alias = "good")]
    Good,
    /// Should be recharged
    #[serde(alias = "low")]
    Low,
}

/// Battery state of a device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatteryInfo {
    /// Whether the device is battery powered
    pub has_battery: bool,
    /// Remaining charge, 0 to 100
    pub percent_remaining: f64,
    pub level: BatteryLevel,
}

/// Description of an imaging device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    /// Unique id of this device instance
    pub device_id: String,
    /// User friendly name
    pub name: Option<String>,
    pub icon_url: Option<String>,
    /// Whether a sensor is connected
    pub has_sensor: bool,
    pub status: DeviceStatus,
    /// Interface used to connect the device (usb, network...)
    pub interface_type: Option<String>,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub version: Option<String>,
    pub battery: Option<BatteryInfo>,
}

/// Payload of a device event frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEventData {
    pub action: EventAction,
    pub device_info: DeviceInfo,
}
