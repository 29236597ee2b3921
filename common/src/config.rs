use std::{io::ErrorKind, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, types::Targets};

/// The DHT family cannot be polled faster than this.
pub const MIN_SENSOR_POLL_INTERVAL_MS: u64 = 2_000;

/// Proportional law used while in AUTO.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoPolicy {
    /// Ramp from `speed_min` to `speed_max` over `band_c` above the target
    /// temperature. The floor keeps the fan from stalling at low PWM.
    Floored {
        band_c: f32,
        speed_min: u8,
        speed_max: u8,
    },
    /// Fixed two-point ramp from 0 at `start_c` to full duty at `end_c`.
    Ramp { start_c: f32, end_c: f32 },
}

impl Default for AutoPolicy {
    fn default() -> Self {
        Self::Floored {
            band_c: 10.0,
            speed_min: 80,
            speed_max: 255,
        }
    }
}

impl AutoPolicy {
    pub fn sanitize(&mut self) {
        match self {
            Self::Floored {
                band_c,
                speed_min,
                speed_max,
            } => {
                if !band_c.is_finite() || *band_c <= 0.0 {
                    *band_c = 10.0;
                }
                if *speed_min > *speed_max {
                    *speed_min = *speed_max;
                }
            }
            Self::Ramp { start_c, end_c } => {
                if !start_c.is_finite() || !end_c.is_finite() || *end_c <= *start_c {
                    *start_c = 25.0;
                    *end_c = 30.0;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryFormat {
    /// `temp`, `hum`, `fan_speed`, `mode`, `target_temp`, `target_hum`.
    Simple,
    /// `temp`, `hum`, `pwm`, `mode`, `sub`, `target`.
    Structured,
}

impl TelemetryFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "structured" => Some(Self::Structured),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub sensor_poll_interval_ms: u64,
    pub telemetry_interval_ms: u64,
    pub loop_period_ms: u64,
    pub auto_policy: AutoPolicy,
    pub manual_temp_band_c: f32,
    pub manual_humidity_band_pct: f32,
    pub telemetry_format: TelemetryFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sensor_poll_interval_ms: MIN_SENSOR_POLL_INTERVAL_MS,
            telemetry_interval_ms: 1_000,
            loop_period_ms: 10,
            auto_policy: AutoPolicy::default(),
            manual_temp_band_c: 5.0,
            manual_humidity_band_pct: 20.0,
            telemetry_format: TelemetryFormat::Simple,
        }
    }
}

impl ControllerConfig {
    pub fn sanitize(&mut self) {
        self.sensor_poll_interval_ms = self
            .sensor_poll_interval_ms
            .max(MIN_SENSOR_POLL_INTERVAL_MS);
        self.telemetry_interval_ms = self.telemetry_interval_ms.max(100);
        self.loop_period_ms = self.loop_period_ms.clamp(1, 100);
        self.auto_policy.sanitize();
        if !self.manual_temp_band_c.is_finite() || self.manual_temp_band_c <= 0.0 {
            self.manual_temp_band_c = 5.0;
        }
        if !self.manual_humidity_band_pct.is_finite() || self.manual_humidity_band_pct <= 0.0 {
            self.manual_humidity_band_pct = 20.0;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub command_timeout_ms: u64,
    pub loop_period_ms: u64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 5_000,
            loop_period_ms: 10,
        }
    }
}

impl MotorConfig {
    pub fn sanitize(&mut self) {
        self.command_timeout_ms = self.command_timeout_ms.clamp(500, 60_000);
        self.loop_period_ms = self.loop_period_ms.clamp(1, 100);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorNodeConfig {
    pub poll_interval_ms: u64,
    pub loop_period_ms: u64,
}

impl Default for SensorNodeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: MIN_SENSOR_POLL_INTERVAL_MS,
            loop_period_ms: 10,
        }
    }
}

impl SensorNodeConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.max(MIN_SENSOR_POLL_INTERVAL_MS);
        self.loop_period_ms = self.loop_period_ms.clamp(1, 100);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub controller: ControllerConfig,
    pub targets: Targets,
    pub motor: MotorConfig,
    pub sensor: SensorNodeConfig,
}

impl RuntimeConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.sanitize();
        Ok(config)
    }

    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error the caller decides how to report.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn sanitize(&mut self) {
        self.controller.sanitize();
        self.targets.sanitize();
        self.motor.sanitize();
        self.sensor.sanitize();
    }
}
