use std::time::Duration;

use tracing::info;

use fan_common::{Display, MonotonicClock, SensorDisplayNode, SimulatedClimate};

/// Renders the character display into the log.
struct LoggingDisplay;

impl Display for LoggingDisplay {
    fn show(&mut self, rows: &[String; 2]) {
        info!(row0 = %rows[0], row1 = %rows[1], "display");
    }
}

pub async fn run() -> anyhow::Result<()> {
    fan_host::init_tracing();

    let runtime = fan_host::load_runtime_config();
    let loop_period = Duration::from_millis(runtime.sensor.loop_period_ms);

    let sensor = SimulatedClimate::default().with_fault_every(fan_host::sim_fault_every());
    let mut node = SensorDisplayNode::new(runtime.sensor, sensor, LoggingDisplay);
    let banner = node.banner(env!("CARGO_PKG_VERSION"));
    info!("sensor display node ready");

    let clock = MonotonicClock::new();
    fan_host::run_loop(&clock, loop_period, banner, |now_ms, inbound| {
        node.tick(now_ms, inbound)
    })
    .await
}
