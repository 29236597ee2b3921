//! A deterministic room model used by the host builds in place of the DHT
//! transducer.

use crate::{
    control::DUTY_MAX,
    error::SensorError,
    sensor::{Climate, ClimateSensor},
};

/// Fraction of the gap to ambient closed on every read.
const RELAX_RATE: f32 = 0.05;
/// Temperature drop per read at full duty.
const FULL_DUTY_COOLING_C: f32 = 0.6;
/// Humidity drop per read at full duty.
const FULL_DUTY_DRYING_PCT: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct SimulatedClimate {
    climate: Climate,
    ambient: Climate,
    fan_duty: u8,
    reads: u32,
    fault_every: u32,
}

impl SimulatedClimate {
    pub fn new(start: Climate, ambient: Climate) -> Self {
        Self {
            climate: start,
            ambient,
            fan_duty: 0,
            reads: 0,
            fault_every: 0,
        }
    }

    /// Every `n`th read fails with [`SensorError::NotANumber`]. Zero disables
    /// fault injection.
    pub fn with_fault_every(mut self, n: u32) -> Self {
        self.fault_every = n;
        self
    }

    /// Feed back the duty the fan is currently driven at.
    pub fn observe_fan(&mut self, duty: u8) {
        self.fan_duty = duty;
    }

    pub fn climate(&self) -> Climate {
        self.climate
    }

    fn step(&mut self) {
        let effort = f32::from(self.fan_duty) / f32::from(DUTY_MAX);

        let Climate {
            temperature_c,
            humidity_pct,
        } = &mut self.climate;
        *temperature_c += (self.ambient.temperature_c - *temperature_c) * RELAX_RATE;
        *temperature_c -= FULL_DUTY_COOLING_C * effort;
        *humidity_pct += (self.ambient.humidity_pct - *humidity_pct) * RELAX_RATE;
        *humidity_pct = (*humidity_pct - FULL_DUTY_DRYING_PCT * effort).clamp(0.0, 100.0);
    }
}

impl Default for SimulatedClimate {
    fn default() -> Self {
        Self::new(
            Climate {
                temperature_c: 24.0,
                humidity_pct: 45.0,
            },
            Climate {
                temperature_c: 32.0,
                humidity_pct: 60.0,
            },
        )
    }
}

impl ClimateSensor for SimulatedClimate {
    fn read(&mut self) -> Result<Climate, SensorError> {
        self.reads = self.reads.wrapping_add(1);
        self.step();
        if self.fault_every > 0 && self.reads % self.fault_every == 0 {
            return Err(SensorError::NotANumber);
        }
        Ok(self.climate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_room_drifts_toward_ambient() {
        let mut room = SimulatedClimate::default();
        let first = room.read().unwrap();
        let mut last = first;
        for _ in 0..50 {
            last = room.read().unwrap();
        }
        assert!(first.temperature_c > 24.0);
        assert!(last.temperature_c > first.temperature_c);
        assert!(last.temperature_c < 32.0);
        assert!(last.humidity_pct > first.humidity_pct);
    }

    #[test]
    fn running_fan_pulls_temperature_down() {
        let mut idle = SimulatedClimate::default();
        let mut cooled = SimulatedClimate::default();
        cooled.observe_fan(255);

        for _ in 0..20 {
            idle.read().unwrap();
            cooled.read().unwrap();
        }
        assert!(cooled.climate().temperature_c < idle.climate().temperature_c);
        assert!(cooled.climate().humidity_pct < idle.climate().humidity_pct);
    }

    #[test]
    fn injects_faults_on_schedule() {
        let mut room = SimulatedClimate::default().with_fault_every(3);
        let outcomes: Vec<bool> = (0..6).map(|_| room.read().is_ok()).collect();
        assert_eq!(outcomes, vec![true, true, false, true, true, false]);
    }
}
