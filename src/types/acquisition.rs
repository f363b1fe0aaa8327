use serde::{Deserialize, Serialize};

/// State of the current exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionState {
    /// General or unknown error
    #[serde(alias = "error")]
    Error,
    /// Not enough battery power to acquire an image
    #[serde(alias = "lowBattery")]
    LowBattery,
    /// Not enough space to store image data
    #[serde(alias = "insufficientStorage")]
    InsufficientStorage,
    /// No device is connected
    #[serde(alias = "noHardware")]
    NoHardware,
    /// No sensor is connected
    #[serde(alias = "noSensor")]
    NoSensor,
    #[serde(alias = "initializing")]
    Initializing,
    /// No acquisition info has been supplied
    #[serde(alias = "noAcquisitionInfo")]
    NoAcquisitionInfo,
    /// Ready and waiting for an exposure
    #[serde(alias = "ready")]
    Ready,
    /// Reading the image from the device
    #[serde(alias = "reading")]
    Reading,
    #[serde(alias = "processing")]
    Processing,
    #[serde(alias = "storing")]
    Storing,
    /// A new image is available
    #[serde(alias = "newImage")]
    NewImage,
}

impl AcquisitionState {
    /// Returns `true` for states that prevent an exposure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AcquisitionState::Error
                | AcquisitionState::LowBattery
                | AcquisitionState::InsufficientStorage
                | AcquisitionState::NoHardware
                | AcquisitionState::NoSensor
                | AcquisitionState::NoAcquisitionInfo
        )
    }
}

/// Payload of an acquisition status frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionStatus {
    /// Exposure readiness of the sensor
    pub ready: bool,
    pub state: AcquisitionState,
    /// Id of the most recent image acquired
    #[serde(default)]
    pub last_image_id: Option<String>,
    /// Number of images acquired in the session
    #[serde(default)]
    pub total_images: u32,
}
