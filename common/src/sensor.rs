use log::warn;

use crate::{error::SensorError, types::SensorReading};

/// One temperature/humidity pair straight off the transducer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// A temperature/humidity transducer. `read` may block for the duration of
/// one bounded bus exchange.
pub trait ClimateSensor {
    fn read(&mut self) -> Result<Climate, SensorError>;
}

/// Read the transducer once and fold the outcome into `reading`.
///
/// Both channels are replaced together or not at all. A failed read only
/// clears `valid`; the previous values stay in place.
pub fn poll<S: ClimateSensor + ?Sized>(sensor: &mut S, reading: &mut SensorReading) -> bool {
    match sensor.read().and_then(check_finite) {
        Ok(climate) => {
            reading.temperature_c = climate.temperature_c;
            reading.humidity_pct = climate.humidity_pct;
            reading.valid = true;
            reading.measured = true;
            true
        }
        Err(err) => {
            if reading.measured {
                warn!("sensor read failed, holding last good values: {err}");
            } else {
                warn!("sensor read failed before first measurement: {err}");
            }
            reading.valid = false;
            false
        }
    }
}

fn check_finite(climate: Climate) -> Result<Climate, SensorError> {
    if climate.temperature_c.is_finite() && climate.humidity_pct.is_finite() {
        Ok(climate)
    } else {
        Err(SensorError::NotANumber)
    }
}
