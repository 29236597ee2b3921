use log::info;

use crate::{
    actuator::{ActuatorDriver, FanOutput, FanState},
    command::CommandProcessor,
    config::{ControllerConfig, TelemetryFormat},
    control::ControlLaw,
    protocol::{to_line, Banner},
    scheduler::run_if_due,
    sensor::{self, ClimateSensor},
    telemetry,
    types::{ControllerState, Targets},
};

pub const NODE_NAME: &str = "controller";

/// The combined sensor + fan node. One call to [`FanController::tick`] is
/// one pass of the cooperative loop.
pub struct FanController<S, F> {
    config: ControllerConfig,
    law: ControlLaw,
    state: ControllerState,
    commands: CommandProcessor,
    sensor: S,
    fan: ActuatorDriver<F>,
}

impl<S: ClimateSensor, F: FanOutput> FanController<S, F> {
    pub fn new(mut config: ControllerConfig, mut targets: Targets, sensor: S, fan: F) -> Self {
        config.sanitize();
        targets.sanitize();
        Self {
            law: ControlLaw::from_config(&config),
            config,
            state: ControllerState::new(targets),
            commands: CommandProcessor::new(),
            sensor,
            fan: ActuatorDriver::new(fan),
        }
    }

    /// The one-off line written at boot.
    pub fn banner(&self, version: &'static str) -> Option<String> {
        to_line(&Banner::ready(NODE_NAME, version)).ok()
    }

    /// Run every task once, in order: commands, sensor poll (when due),
    /// control law, fan reconciliation, telemetry (when due).
    ///
    /// `inbound` holds the serial bytes that arrived since the last tick.
    /// Returns the telemetry record if one is due.
    pub fn tick(&mut self, now_ms: u64, inbound: &[u8]) -> Option<String> {
        self.commands.process(inbound, &mut self.state);

        if run_if_due(
            &mut self.state.timers.last_sensor_poll_ms,
            now_ms,
            self.config.sensor_poll_interval_ms,
        ) {
            sensor::poll(&mut self.sensor, &mut self.state.reading);
        }

        self.law.update(&mut self.state);
        self.reconcile_fan();

        if run_if_due(
            &mut self.state.timers.last_telemetry_ms,
            now_ms,
            self.config.telemetry_interval_ms,
        ) {
            return telemetry::record(&self.state, self.config.telemetry_format);
        }
        None
    }

    fn reconcile_fan(&mut self) {
        let desired = self.state.actuator.desired_duty;
        if desired == self.state.actuator.applied_duty {
            return;
        }

        let was = self.fan.state();
        self.fan.apply(desired);
        self.state.actuator.applied_duty = self.fan.applied();

        match (was, self.fan.state()) {
            (FanState::Idle, FanState::Driving(duty)) => info!("fan started at duty {duty}"),
            (FanState::Driving(_), FanState::Idle) => info!("fan stopped"),
            _ => {}
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn telemetry_format(&self) -> TelemetryFormat {
        self.config.telemetry_format
    }

    pub fn fan_state(&self) -> FanState {
        self.fan.state()
    }

    pub fn fan_writes(&self) -> u64 {
        self.fan.writes()
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn fan_output(&self) -> &F {
        self.fan.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        actuator::tests::{RecordingFan, Write},
        error::SensorError,
        scheduler::{Clock, ManualClock},
        sensor::Climate,
        types::{ControlMode, ManualSource},
    };
    use serde_json::Value;

    /// Returns `next` on every read until told otherwise.
    struct StubSensor {
        next: Result<Climate, SensorError>,
        reads: u32,
    }

    impl StubSensor {
        fn reporting(temperature_c: f32, humidity_pct: f32) -> Self {
            Self {
                next: Ok(Climate {
                    temperature_c,
                    humidity_pct,
                }),
                reads: 0,
            }
        }
    }

    impl ClimateSensor for StubSensor {
        fn read(&mut self) -> Result<Climate, SensorError> {
            self.reads += 1;
            self.next.clone()
        }
    }

    fn controller(sensor: StubSensor) -> FanController<StubSensor, RecordingFan> {
        FanController::new(
            ControllerConfig::default(),
            Targets::default(),
            sensor,
            RecordingFan::default(),
        )
    }

    fn json(line: &str) -> Value {
        serde_json::from_str(line.trim_end()).unwrap()
    }

    #[test]
    fn manual_speed_scenario_reaches_fan_and_telemetry() {
        let mut ctl = controller(StubSensor::reporting(22.0, 40.0));

        assert_eq!(ctl.tick(10, b"MODE:MANUAL\n"), None);
        assert_eq!(ctl.tick(20, b"SET_SPEED:128\n"), None);
        assert_eq!(ctl.state().actuator.applied_duty, 128);
        assert_eq!(ctl.fan_state(), FanState::Driving(128));

        let line = ctl.tick(1_000, b"").expect("telemetry due");
        let record = json(&line);
        assert_eq!(record["fan_speed"], 128);
        assert_eq!(record["mode"], "MANUAL");
    }

    #[test]
    fn auto_half_band_scenario() {
        let mut ctl = controller(StubSensor::reporting(30.0, 50.0));

        ctl.tick(2_000, b"");

        assert_eq!(ctl.state().actuator.desired_duty, 167);
        assert_eq!(ctl.state().actuator.applied_duty, 167);
    }

    #[test]
    fn sensor_is_polled_on_its_own_cadence() {
        let mut ctl = controller(StubSensor::reporting(30.0, 50.0));

        for now in (0..2_000).step_by(10) {
            ctl.tick(now, b"");
        }
        assert_eq!(ctl.sensor_mut().reads, 0);
        assert_eq!(ctl.state().actuator.applied_duty, 0);

        ctl.tick(2_000, b"");
        ctl.tick(2_010, b"");
        assert_eq!(ctl.sensor_mut().reads, 1);

        ctl.tick(4_000, b"");
        assert_eq!(ctl.sensor_mut().reads, 2);
    }

    #[test]
    fn mode_change_takes_effect_without_waiting_for_a_read() {
        let mut ctl = controller(StubSensor::reporting(30.0, 50.0));
        ctl.tick(2_000, b"");
        assert_eq!(ctl.state().actuator.applied_duty, 167);

        ctl.tick(2_010, b"SET_SPEED:40\nMODE:MANUAL\n");

        assert_eq!(ctl.sensor_mut().reads, 1);
        assert_eq!(ctl.state().actuator.applied_duty, 40);
    }

    #[test]
    fn unchanged_duty_is_not_rewritten_every_cycle() {
        let mut ctl = controller(StubSensor::reporting(30.0, 50.0));
        for now in (2_000..10_000).step_by(10) {
            ctl.tick(now, b"");
        }
        assert_eq!(ctl.fan_writes(), 1);
        assert_eq!(
            ctl.fan_output().writes,
            vec![Write::Release, Write::Drive(167)]
        );
    }

    #[test]
    fn sensor_fault_freezes_values_and_nulls_telemetry() {
        let mut ctl = controller(StubSensor::reporting(30.0, 50.0));
        ctl.tick(2_000, b"");
        assert_eq!(ctl.fan_state(), FanState::Driving(167));

        ctl.sensor_mut().next = Err(SensorError::NotANumber);
        let line = ctl.tick(4_000, b"").expect("telemetry due");

        let reading = ctl.state().reading;
        assert!(!reading.valid);
        assert!(reading.is_stale());
        assert_eq!(reading.temperature_c, 30.0);
        assert_eq!(reading.humidity_pct, 50.0);
        assert_eq!(ctl.fan_state(), FanState::Idle);

        let record = json(&line);
        assert_eq!(record["temp"], Value::Null);
        assert_eq!(record["hum"], Value::Null);
        assert_eq!(record["fan_speed"], 0);
    }

    #[test]
    fn malformed_command_changes_nothing_and_sends_nothing() {
        let mut ctl = controller(StubSensor::reporting(22.0, 40.0));
        let before = ctl.state().clone();

        assert_eq!(ctl.tick(10, b"FOO:BAR\n"), None);

        assert_eq!(ctl.state().mode, before.mode);
        assert_eq!(ctl.state().targets, before.targets);
        assert_eq!(ctl.state().actuator, before.actuator);

        let record = json(&ctl.tick(1_000, b"").expect("telemetry due"));
        assert_eq!(record["mode"], "AUTO");
        assert_eq!(record["fan_speed"], 0);
    }

    #[test]
    fn telemetry_reflects_post_control_state_of_same_cycle() {
        let mut ctl = controller(StubSensor::reporting(22.0, 40.0));

        let line = ctl
            .tick(1_000, b"SET_SPEED:77\nMODE:MANUAL\n")
            .expect("telemetry due");

        assert_eq!(json(&line)["fan_speed"], 77);
    }

    #[test]
    fn partial_command_waits_for_newline() {
        let mut ctl = controller(StubSensor::reporting(22.0, 40.0));

        ctl.tick(10, b"MODE:MAN");
        assert_eq!(ctl.state().mode, ControlMode::Auto);

        ctl.tick(20, b"UAL\n");
        assert_eq!(ctl.state().mode, ControlMode::Manual(ManualSource::Pwm));
    }

    #[test]
    fn structured_temp_command_drives_proportional_duty() {
        let mut ctl = FanController::new(
            ControllerConfig {
                telemetry_format: TelemetryFormat::Structured,
                ..ControllerConfig::default()
            },
            Targets::default(),
            StubSensor::reporting(26.5, 40.0),
            RecordingFan::default(),
        );

        let line = ctl
            .tick(2_000, b"{\"mode\":\"manual\",\"sub\":\"temp\",\"val\":24}\n")
            .expect("telemetry due");

        assert_eq!(ctl.state().actuator.applied_duty, 127);
        let record = json(&line);
        assert_eq!(record["pwm"], 127);
        assert_eq!(record["sub"], "temp");
        assert_eq!(record["target"], 24.0);
    }

    #[test]
    fn ten_millisecond_loop_emits_telemetry_once_per_second() {
        let mut ctl = controller(StubSensor::reporting(30.0, 50.0));
        let clock = ManualClock::new(0);
        let mut records = Vec::new();

        for _ in 0..500 {
            clock.advance(10);
            if let Some(line) = ctl.tick(clock.now_ms(), b"") {
                records.push((clock.now_ms(), json(&line)));
            }
        }

        let stamps: Vec<u64> = records.iter().map(|(at, _)| *at).collect();
        assert_eq!(stamps, vec![1_000, 2_000, 3_000, 4_000, 5_000]);
        assert_eq!(records[0].1["temp"], Value::Null);
        assert_eq!(records[1].1["temp"], 30.0);
        assert_eq!(records[1].1["fan_speed"], 167);
        assert_eq!(ctl.sensor_mut().reads, 2);
    }

    #[test]
    fn never_measured_is_not_stale() {
        let mut ctl = controller(StubSensor::reporting(22.0, 40.0));
        ctl.sensor_mut().next = Err(SensorError::Timeout);
        ctl.tick(2_000, b"");

        let reading = ctl.state().reading;
        assert!(!reading.measured);
        assert!(!reading.is_stale());
        assert_eq!(ctl.fan_state(), FanState::Idle);
    }

    #[test]
    fn banner_names_the_node() {
        let ctl = controller(StubSensor::reporting(22.0, 40.0));
        let banner = json(&ctl.banner("0.1.0").unwrap());
        assert_eq!(banner["status"], "ready");
        assert_eq!(banner["node"], NODE_NAME);
    }
}
