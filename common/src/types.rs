use serde::{Deserialize, Serialize};

/// Which target drives the duty computation while in MANUAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualSource {
    Pwm,
    Temp,
    Hum,
}

impl ManualSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pwm => "pwm",
            Self::Temp => "temp",
            Self::Hum => "hum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pwm" => Some(Self::Pwm),
            "temp" => Some(Self::Temp),
            "hum" => Some(Self::Hum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    #[default]
    Auto,
    Manual(ManualSource),
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Manual(_) => "MANUAL",
        }
    }

    pub fn manual_source(self) -> Option<ManualSource> {
        match self {
            Self::Auto => None,
            Self::Manual(source) => Some(source),
        }
    }
}

/// Last transducer values. `valid == false` means the most recent poll
/// failed; the numeric fields then still hold the last good values.
/// `measured` is set by the first successful read and never cleared.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub valid: bool,
    pub measured: bool,
}

impl SensorReading {
    /// A good reading exists but the latest poll failed.
    pub fn is_stale(&self) -> bool {
        self.measured && !self.valid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub target_temp_c: f32,
    pub target_humidity_pct: f32,
    pub manual_duty: u8,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            target_temp_c: 25.0,
            target_humidity_pct: 50.0,
            manual_duty: 0,
        }
    }
}

impl Targets {
    pub const TEMP_RANGE_C: (f32, f32) = (-40.0, 80.0);
    pub const HUMIDITY_RANGE_PCT: (f32, f32) = (0.0, 100.0);

    pub fn set_target_temp(&mut self, temp_c: f32) -> bool {
        let clamped = temp_c.clamp(Self::TEMP_RANGE_C.0, Self::TEMP_RANGE_C.1);
        if (self.target_temp_c - clamped).abs() > f32::EPSILON {
            self.target_temp_c = clamped;
            true
        } else {
            false
        }
    }

    pub fn set_target_humidity(&mut self, humidity_pct: f32) -> bool {
        let clamped = humidity_pct.clamp(Self::HUMIDITY_RANGE_PCT.0, Self::HUMIDITY_RANGE_PCT.1);
        if (self.target_humidity_pct - clamped).abs() > f32::EPSILON {
            self.target_humidity_pct = clamped;
            true
        } else {
            false
        }
    }

    pub fn set_manual_duty(&mut self, duty: u8) -> bool {
        if self.manual_duty != duty {
            self.manual_duty = duty;
            true
        } else {
            false
        }
    }

    pub fn sanitize(&mut self) {
        self.target_temp_c = self
            .target_temp_c
            .clamp(Self::TEMP_RANGE_C.0, Self::TEMP_RANGE_C.1);
        self.target_humidity_pct = self
            .target_humidity_pct
            .clamp(Self::HUMIDITY_RANGE_PCT.0, Self::HUMIDITY_RANGE_PCT.1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub desired_duty: u8,
    pub applied_duty: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleTimers {
    pub last_sensor_poll_ms: u64,
    pub last_telemetry_ms: u64,
}

/// Everything the control loop owns. Each task receives it explicitly.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub mode: ControlMode,
    pub reading: SensorReading,
    pub targets: Targets,
    pub actuator: ActuatorState,
    pub timers: ScheduleTimers,
}

impl ControllerState {
    pub fn new(targets: Targets) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }
}

/// Clamp an arbitrary numeric request into the 8-bit duty range.
/// Fractions are truncated, infinities saturate and `NaN` maps to 0.
pub fn duty_from_f64(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 255.0) as u8
}

/// Same as [`duty_from_f64`] for control-law arithmetic.
pub fn duty_from_f32(value: f32) -> u8 {
    duty_from_f64(value as f64)
}
