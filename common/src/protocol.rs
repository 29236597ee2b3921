//! Newline-delimited records exchanged between the nodes.

use serde::{Deserialize, Serialize};

pub const KEY_MODE: &str = "MODE";
pub const KEY_SET_SPEED: &str = "SET_SPEED";
pub const KEY_SET_TEMP: &str = "SET_TEMP";
pub const KEY_SET_HUM: &str = "SET_HUM";

/// Inbound lines longer than this are discarded whole.
pub const MAX_LINE_BYTES: usize = 128;

/// `{"mode":"manual","sub":"temp","val":24.5}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StructuredCommand {
    pub mode: String,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub val: Option<f64>,
}

/// Telemetry with the `fan_speed`/`target_temp`/`target_hum` field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleTelemetry {
    pub temp: Option<f32>,
    pub hum: Option<f32>,
    pub fan_speed: u8,
    pub mode: &'static str,
    pub target_temp: f32,
    pub target_hum: f32,
}

/// Telemetry with the `pwm`/`sub`/`target` field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredTelemetry {
    pub temp: Option<f32>,
    pub hum: Option<f32>,
    pub pwm: u8,
    pub mode: &'static str,
    pub sub: Option<&'static str>,
    pub target: f32,
}

/// Emitted by the sensor-display node every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatePayload {
    pub temp: Option<f32>,
    pub hum: Option<f32>,
}

/// Consumed by the motor node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanSpeedCommand {
    pub fan_speed: f64,
}

/// Consumed by the sensor-display node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub status: &'static str,
    pub node: &'static str,
    pub version: &'static str,
}

impl Banner {
    pub fn ready(node: &'static str, version: &'static str) -> Self {
        Self {
            status: "ready",
            node,
            version,
        }
    }
}

/// Serialize one record and terminate it with a newline.
pub fn to_line<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    Ok(line)
}

/// Telemetry values are reported with one decimal place.
pub fn round_tenths(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
