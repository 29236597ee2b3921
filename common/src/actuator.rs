//! Fan actuator driver.
//!
//! Hardware sits behind [`FanOutput`]; the driver only decides when to write.
//! A zero duty releases the bridge entirely instead of holding PWM at 0.

use log::debug;

/// Physical fan stage (H-bridge enable/direction pins plus a PWM channel).
pub trait FanOutput {
    /// Disable the drive stage.
    fn release(&mut self);
    /// Enable the drive stage in the forward direction at `duty` (1..=255).
    fn drive(&mut self, duty: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanState {
    Idle,
    Driving(u8),
}

pub struct ActuatorDriver<O> {
    output: O,
    applied: u8,
    writes: u64,
}

impl<O: FanOutput> ActuatorDriver<O> {
    /// Takes ownership of the output and puts it in a known released state.
    pub fn new(mut output: O) -> Self {
        output.release();
        Self {
            output,
            applied: 0,
            writes: 0,
        }
    }

    /// Drive the fan at `duty`. Returns false without touching the hardware
    /// when `duty` is already applied.
    pub fn apply(&mut self, duty: u8) -> bool {
        if duty == self.applied {
            return false;
        }

        if duty == 0 {
            self.output.release();
        } else {
            self.output.drive(duty);
        }
        debug!("fan duty {} -> {}", self.applied, duty);

        self.applied = duty;
        self.writes = self.writes.saturating_add(1);
        true
    }

    pub fn applied(&self) -> u8 {
        self.applied
    }

    pub fn state(&self) -> FanState {
        match self.applied {
            0 => FanState::Idle,
            duty => FanState::Driving(duty),
        }
    }

    /// Hardware writes issued since construction.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Write {
        Release,
        Drive(u8),
    }

    #[derive(Debug, Default)]
    pub(crate) struct RecordingFan {
        pub(crate) writes: Vec<Write>,
    }

    impl FanOutput for RecordingFan {
        fn release(&mut self) {
            self.writes.push(Write::Release);
        }

        fn drive(&mut self, duty: u8) {
            self.writes.push(Write::Drive(duty));
        }
    }

    #[test]
    fn construction_releases_the_fan() {
        let driver = ActuatorDriver::new(RecordingFan::default());
        assert_eq!(driver.output().writes, vec![Write::Release]);
        assert_eq!(driver.state(), FanState::Idle);
        assert_eq!(driver.writes(), 0);
    }

    #[test]
    fn repeated_duty_is_written_once() {
        let mut driver = ActuatorDriver::new(RecordingFan::default());

        assert!(driver.apply(128));
        assert!(!driver.apply(128));

        assert_eq!(driver.writes(), 1);
        assert_eq!(
            driver.output().writes,
            vec![Write::Release, Write::Drive(128)]
        );
    }

    #[test]
    fn zero_releases_instead_of_driving() {
        let mut driver = ActuatorDriver::new(RecordingFan::default());
        driver.apply(200);
        driver.apply(0);

        assert_eq!(driver.state(), FanState::Idle);
        assert_eq!(driver.output().writes.last(), Some(&Write::Release));
        assert_eq!(driver.applied(), 0);
    }

    #[test]
    fn state_tracks_driving_duty() {
        let mut driver = ActuatorDriver::new(RecordingFan::default());
        driver.apply(90);
        assert_eq!(driver.state(), FanState::Driving(90));
    }
}
