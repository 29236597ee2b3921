use std::time::Duration;

use tracing::{info, warn};

use fan_common::{
    ControllerConfig, FanController, MonotonicClock, RuntimeConfig, SimulatedClimate,
    TelemetryFormat,
};
use fan_host::LoggingFan;

const TELEMETRY_FORMAT_ENV: &str = "FAN_TELEMETRY_FORMAT";

pub async fn run() -> anyhow::Result<()> {
    fan_host::init_tracing();

    let runtime = fan_host::load_runtime_config();
    let config = controller_config(&runtime);
    let loop_period = Duration::from_millis(config.loop_period_ms);

    let sensor = SimulatedClimate::default().with_fault_every(fan_host::sim_fault_every());
    let mut controller = FanController::new(config, runtime.targets, sensor, LoggingFan);
    let banner = controller.banner(env!("CARGO_PKG_VERSION"));
    info!(
        format = ?controller.telemetry_format(),
        "fan controller ready"
    );

    let clock = MonotonicClock::new();
    fan_host::run_loop(&clock, loop_period, banner, |now_ms, inbound| {
        let record = controller.tick(now_ms, inbound);
        let applied = controller.state().actuator.applied_duty;
        controller.sensor_mut().observe_fan(applied);
        record
    })
    .await
}

fn controller_config(runtime: &RuntimeConfig) -> ControllerConfig {
    let mut config = runtime.controller.clone();
    if let Ok(raw) = std::env::var(TELEMETRY_FORMAT_ENV) {
        match TelemetryFormat::parse(&raw) {
            Some(format) => config.telemetry_format = format,
            None => warn!("ignoring unknown {TELEMETRY_FORMAT_ENV} value `{raw}`"),
        }
    }
    config
}
