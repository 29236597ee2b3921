//! Sensor-display node: publishes climate readings on its own cadence and
//! shows operator messages on a two-row character display.

use log::{debug, info};

use crate::{
    command::LineBuffer,
    config::SensorNodeConfig,
    protocol::{round_tenths, to_line, Banner, ClimatePayload, DisplayMessage},
    scheduler::run_if_due,
    sensor::{self, ClimateSensor},
    types::SensorReading,
};

pub const NODE_NAME: &str = "sensor";
pub const DISPLAY_COLUMNS: usize = 16;

pub trait Display {
    fn show(&mut self, rows: &[String; 2]);
}

pub struct SensorDisplayNode<S, D> {
    config: SensorNodeConfig,
    sensor: S,
    display: D,
    lines: LineBuffer,
    reading: SensorReading,
    message: String,
    last_poll_ms: u64,
}

impl<S: ClimateSensor, D: Display> SensorDisplayNode<S, D> {
    pub fn new(mut config: SensorNodeConfig, sensor: S, display: D) -> Self {
        config.sanitize();
        let mut node = Self {
            config,
            sensor,
            display,
            lines: LineBuffer::new(),
            reading: SensorReading::default(),
            message: String::new(),
            last_poll_ms: 0,
        };
        node.refresh_display();
        node
    }

    pub fn banner(&self, version: &'static str) -> Option<String> {
        to_line(&Banner::ready(NODE_NAME, version)).ok()
    }

    /// Handle inbound messages, then poll and publish when due.
    pub fn tick(&mut self, now_ms: u64, inbound: &[u8]) -> Option<String> {
        let mut dirty = false;
        for line in self.lines.feed(inbound) {
            match serde_json::from_str::<DisplayMessage>(line.trim()) {
                Ok(DisplayMessage { msg }) => {
                    info!("display message: {msg}");
                    self.message = msg;
                    dirty = true;
                }
                Err(err) => debug!("ignoring display line {line:?}: {err}"),
            }
        }

        let mut record = None;
        if run_if_due(&mut self.last_poll_ms, now_ms, self.config.poll_interval_ms) {
            sensor::poll(&mut self.sensor, &mut self.reading);
            record = to_line(&self.payload()).ok();
            dirty = true;
        }

        if dirty {
            self.refresh_display();
        }
        record
    }

    pub fn payload(&self) -> ClimatePayload {
        if self.reading.valid {
            ClimatePayload {
                temp: Some(round_tenths(self.reading.temperature_c)),
                hum: Some(round_tenths(self.reading.humidity_pct)),
            }
        } else {
            ClimatePayload {
                temp: None,
                hum: None,
            }
        }
    }

    pub fn rows(&self) -> [String; 2] {
        let climate = if self.reading.valid {
            format!(
                "T:{:.1}C H:{:.0}%",
                self.reading.temperature_c, self.reading.humidity_pct
            )
        } else if self.reading.is_stale() {
            "Sensor error".to_string()
        } else {
            "No reading".to_string()
        };
        [fit(&climate), fit(&self.message)]
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    fn refresh_display(&mut self) {
        let rows = self.rows();
        self.display.show(&rows);
    }
}

fn fit(text: &str) -> String {
    text.chars().take(DISPLAY_COLUMNS).collect()
}
