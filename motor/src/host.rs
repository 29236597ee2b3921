use std::time::Duration;

use tracing::info;

use fan_common::{Clock, MonotonicClock, MotorNode};
use fan_host::LoggingFan;

pub async fn run() -> anyhow::Result<()> {
    fan_host::init_tracing();

    let runtime = fan_host::load_runtime_config();
    let loop_period = Duration::from_millis(runtime.motor.loop_period_ms);
    info!(
        timeout_ms = runtime.motor.command_timeout_ms,
        "motor node ready"
    );

    let clock = MonotonicClock::new();
    let mut motor = MotorNode::new(runtime.motor, LoggingFan, clock.now_ms());
    let banner = motor.banner(env!("CARGO_PKG_VERSION"));

    fan_host::run_loop(&clock, loop_period, banner, |now_ms, inbound| {
        motor.tick(now_ms, inbound);
        None
    })
    .await
}
