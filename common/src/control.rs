use crate::{
    config::{AutoPolicy, ControllerConfig},
    types::{duty_from_f32, ControlMode, ControllerState, ManualSource, SensorReading, Targets},
};

pub const DUTY_MAX: u8 = 255;

/// Maps (mode, reading, targets) to a fan duty. Holds only configuration,
/// so evaluating it has no side effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLaw {
    pub auto_policy: AutoPolicy,
    pub manual_temp_band_c: f32,
    pub manual_humidity_band_pct: f32,
}

impl Default for ControlLaw {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl ControlLaw {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            auto_policy: config.auto_policy,
            manual_temp_band_c: config.manual_temp_band_c,
            manual_humidity_band_pct: config.manual_humidity_band_pct,
        }
    }

    pub fn desired_duty(&self, mode: ControlMode, reading: &SensorReading, targets: &Targets) -> u8 {
        match mode {
            ControlMode::Auto => self.auto_duty(reading, targets),
            ControlMode::Manual(ManualSource::Pwm) => targets.manual_duty,
            ControlMode::Manual(ManualSource::Temp) => {
                if !reading.valid {
                    return 0;
                }
                proportional(
                    reading.temperature_c - targets.target_temp_c,
                    self.manual_temp_band_c,
                )
            }
            ControlMode::Manual(ManualSource::Hum) => {
                if !reading.valid {
                    return 0;
                }
                proportional(
                    reading.humidity_pct - targets.target_humidity_pct,
                    self.manual_humidity_band_pct,
                )
            }
        }
    }

    /// Writes `desired_duty` from the current mode, reading and targets.
    pub fn update(&self, state: &mut ControllerState) {
        state.actuator.desired_duty = self.desired_duty(state.mode, &state.reading, &state.targets);
    }

    fn auto_duty(&self, reading: &SensorReading, targets: &Targets) -> u8 {
        if !reading.valid {
            return 0;
        }
        let temp = reading.temperature_c;

        match self.auto_policy {
            AutoPolicy::Floored {
                band_c,
                speed_min,
                speed_max,
            } => {
                if temp <= targets.target_temp_c {
                    return 0;
                }
                let fraction = ((temp - targets.target_temp_c) / band_c).clamp(0.0, 1.0);
                let span = speed_max.saturating_sub(speed_min) as f32;
                duty_from_f32(speed_min as f32 + fraction * span)
            }
            AutoPolicy::Ramp { start_c, end_c } => {
                if temp <= start_c {
                    return 0;
                }
                let fraction = ((temp - start_c) / (end_c - start_c)).clamp(0.0, 1.0);
                duty_from_f32(fraction * DUTY_MAX as f32)
            }
        }
    }
}

/// Full scale once `error` reaches `band`, nothing at or below zero.
fn proportional(error: f32, band: f32) -> u8 {
    if error <= 0.0 {
        return 0;
    }
    duty_from_f32(error / band * DUTY_MAX as f32)
}
