//! Motor-only node: applies `{"fan_speed": n}` commands from the link and
//! stops the fan when the link goes quiet.

use log::{debug, warn};

use crate::{
    actuator::{ActuatorDriver, FanOutput, FanState},
    command::LineBuffer,
    config::MotorConfig,
    protocol::{to_line, Banner, FanSpeedCommand},
    types::duty_from_f64,
    watchdog::CommandWatchdog,
};

pub const NODE_NAME: &str = "motor";

pub struct MotorNode<F> {
    fan: ActuatorDriver<F>,
    lines: LineBuffer,
    watchdog: CommandWatchdog,
}

impl<F: FanOutput> MotorNode<F> {
    pub fn new(mut config: MotorConfig, fan: F, now_ms: u64) -> Self {
        config.sanitize();
        Self {
            fan: ActuatorDriver::new(fan),
            lines: LineBuffer::new(),
            watchdog: CommandWatchdog::new(config.command_timeout_ms, now_ms),
        }
    }

    pub fn banner(&self, version: &'static str) -> Option<String> {
        to_line(&Banner::ready(NODE_NAME, version)).ok()
    }

    /// Apply every complete command line, then enforce the watchdog.
    pub fn tick(&mut self, now_ms: u64, inbound: &[u8]) {
        for line in self.lines.feed(inbound) {
            match serde_json::from_str::<FanSpeedCommand>(line.trim()) {
                Ok(command) => {
                    self.watchdog.feed(now_ms);
                    self.fan.apply(duty_from_f64(command.fan_speed));
                }
                Err(err) => debug!("ignoring motor line {line:?}: {err}"),
            }
        }

        if self.watchdog.check(now_ms) {
            warn!(
                "no fan command for {}ms, stopping fan",
                self.watchdog.silence_ms(now_ms)
            );
            self.fan.apply(0);
        }
    }

    pub fn applied(&self) -> u8 {
        self.fan.applied()
    }

    pub fn fan_state(&self) -> FanState {
        self.fan.state()
    }

    pub fn is_tripped(&self) -> bool {
        self.watchdog.is_tripped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::tests::{RecordingFan, Write};

    fn node() -> MotorNode<RecordingFan> {
        MotorNode::new(MotorConfig::default(), RecordingFan::default(), 0)
    }

    #[test]
    fn applies_clamped_speed_commands() {
        let mut motor = node();

        motor.tick(10, b"{\"fan_speed\": 180}\n");
        assert_eq!(motor.applied(), 180);

        motor.tick(20, b"{\"fan_speed\": 400}\n");
        assert_eq!(motor.applied(), 255);

        motor.tick(30, b"{\"fan_speed\": -3}\n");
        assert_eq!(motor.fan_state(), FanState::Idle);
    }

    #[test]
    fn garbage_does_not_feed_the_watchdog() {
        let mut motor = node();
        motor.tick(1_000, b"{\"fan_speed\": 100}\n");

        motor.tick(5_000, b"hello\n{\"speed\": 3}\n");
        assert_eq!(motor.applied(), 100);

        motor.tick(6_001, b"");
        assert!(motor.is_tripped());
        assert_eq!(motor.applied(), 0);
    }

    #[test]
    fn watchdog_stops_fan_once_and_recovers_on_command() {
        let mut motor = node();
        motor.tick(100, b"{\"fan_speed\": 90}\n");

        motor.tick(5_101, b"");
        motor.tick(7_000, b"");
        assert_eq!(
            motor.fan.output().writes,
            vec![Write::Release, Write::Drive(90), Write::Release]
        );

        motor.tick(7_010, b"{\"fan_speed\": 90}\n");
        assert!(!motor.is_tripped());
        assert_eq!(motor.fan_state(), FanState::Driving(90));
    }

    #[test]
    fn silent_link_after_boot_keeps_fan_released() {
        let mut motor = node();
        motor.tick(5_001, b"");
        assert!(motor.is_tripped());
        assert_eq!(motor.fan.writes(), 0);
    }
}
