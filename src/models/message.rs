use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::error::PublisherError;

pub const TEMP_RH_DEVICE: &str = "TempRH";

/// A timestamped reading from a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub time: DateTime<Utc>,
    pub device: DeviceReading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    #[serde(rename = "device_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub device_type: String,
    #[serde(rename = "temp", default, skip_serializing_if = "is_zero")]
    pub temperature: f32,
    #[serde(rename = "rh", default, skip_serializing_if = "is_zero")]
    pub humidity: f32,
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

impl DeviceReading {
    pub fn temp_rh(id: impl Into<String>, name: impl Into<String>, temperature: f32, humidity: f32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type: TEMP_RH_DEVICE.to_string(),
            temperature,
            humidity,
        }
    }
}

impl Message {
    pub fn new(device: DeviceReading) -> Self {
        Self {
            time: Utc::now(),
            device,
        }
    }
}

/// What goes out on the wire for a single publish.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Reading(Message),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::Reading(_) => "json",
        }
    }

    /// Text goes out verbatim, readings as two-space indented JSON.
    pub fn encode(&self) -> Result<String, PublisherError> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Reading(message) => Ok(serde_json::to_string_pretty(message)?),
        }
    }
}
