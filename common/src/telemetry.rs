use log::warn;

use crate::{
    config::TelemetryFormat,
    protocol::{round_tenths, to_line, SimpleTelemetry, StructuredTelemetry},
    types::{ControlMode, ControllerState, ManualSource},
};

pub fn simple(state: &ControllerState) -> SimpleTelemetry {
    let (temp, hum) = reported_climate(state);
    SimpleTelemetry {
        temp,
        hum,
        fan_speed: state.actuator.applied_duty,
        mode: state.mode.as_str(),
        target_temp: state.targets.target_temp_c,
        target_hum: state.targets.target_humidity_pct,
    }
}

pub fn structured(state: &ControllerState) -> StructuredTelemetry {
    let (temp, hum) = reported_climate(state);
    let target = match state.mode {
        ControlMode::Auto | ControlMode::Manual(ManualSource::Temp) => {
            state.targets.target_temp_c
        }
        ControlMode::Manual(ManualSource::Hum) => state.targets.target_humidity_pct,
        ControlMode::Manual(ManualSource::Pwm) => state.targets.manual_duty as f32,
    };

    StructuredTelemetry {
        temp,
        hum,
        pwm: state.actuator.applied_duty,
        mode: match state.mode {
            ControlMode::Auto => "auto",
            ControlMode::Manual(_) => "manual",
        },
        sub: state.mode.manual_source().map(ManualSource::as_str),
        target,
    }
}

/// Serialize the current state as one newline-terminated record.
pub fn record(state: &ControllerState, format: TelemetryFormat) -> Option<String> {
    let line = match format {
        TelemetryFormat::Simple => to_line(&simple(state)),
        TelemetryFormat::Structured => to_line(&structured(state)),
    };

    match line {
        Ok(line) => Some(line),
        Err(err) => {
            warn!("telemetry serialization failed: {err}");
            None
        }
    }
}

/// A failed last read is reported as `null`, never as the held value.
fn reported_climate(state: &ControllerState) -> (Option<f32>, Option<f32>) {
    if state.reading.valid {
        (
            Some(round_tenths(state.reading.temperature_c)),
            Some(round_tenths(state.reading.humidity_pct)),
        )
    } else {
        (None, None)
    }
}
