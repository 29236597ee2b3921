//! Desktop runtime shared by the node binaries. Stdin and stdout stand in
//! for the serial link; logs go to stderr.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, Stdout},
    sync::mpsc,
    time::MissedTickBehavior,
};
use tracing::{info, warn};

use fan_common::{Clock, FanOutput, RuntimeConfig};

pub const CONFIG_PATH_ENV: &str = "FAN_CONFIG_PATH";
pub const SIM_FAULT_EVERY_ENV: &str = "FAN_SIM_FAULT_EVERY";
pub const DEFAULT_CONFIG_PATH: &str = "fan-config.json";

const STDIN_CHUNK_BYTES: usize = 256;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Config from the file named by `FAN_CONFIG_PATH`, or `fan-config.json`.
pub fn load_runtime_config() -> RuntimeConfig {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    load_runtime_config_from(&path)
}

/// A missing file gives the defaults silently; a broken one warns first.
pub fn load_runtime_config_from(path: &Path) -> RuntimeConfig {
    RuntimeConfig::load(path).unwrap_or_else(|err| {
        warn!("failed to load runtime config from {}: {err:#}", path.display());
        RuntimeConfig::default()
    })
}

/// Fault-injection period for the simulated transducer, 0 when unset.
pub fn sim_fault_every() -> u32 {
    std::env::var(SIM_FAULT_EVERY_ENV)
        .ok()
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Stands in for the H-bridge.
pub struct LoggingFan;

impl FanOutput for LoggingFan {
    fn release(&mut self) {
        info!("fan bridge released");
    }

    fn drive(&mut self, duty: u8) {
        info!(duty, "fan bridge driving forward");
    }
}

pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; STDIN_CHUNK_BYTES];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) => {
                    info!("stdin closed, no further commands");
                    break;
                }
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
    });
    rx
}

/// Move every chunk received so far into `bytes`, replacing its contents.
pub fn drain(inbound: &mut mpsc::UnboundedReceiver<Vec<u8>>, bytes: &mut Vec<u8>) {
    bytes.clear();
    while let Ok(chunk) = inbound.try_recv() {
        bytes.extend_from_slice(&chunk);
    }
}

pub async fn write_line(stdout: &mut Stdout, line: &str) -> anyhow::Result<()> {
    stdout
        .write_all(line.as_bytes())
        .await
        .context("failed to write record to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(())
}

/// Write `banner`, then call `step(now_ms, inbound)` every `period` until
/// ctrl-c. Whatever `step` returns is written to stdout.
pub async fn run_loop<C, F>(
    clock: &C,
    period: Duration,
    banner: Option<String>,
    mut step: F,
) -> anyhow::Result<()>
where
    C: Clock,
    F: FnMut(u64, &[u8]) -> Option<String>,
{
    let mut stdout = tokio::io::stdout();
    if let Some(banner) = banner {
        write_line(&mut stdout, &banner).await?;
    }

    let mut inbound = spawn_stdin_reader();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut bytes = Vec::with_capacity(STDIN_CHUNK_BYTES);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
        }

        drain(&mut inbound, &mut bytes);
        if let Some(line) = step(clock.now_ms(), &bytes) {
            write_line(&mut stdout, &line).await?;
        }
    }

    Ok(())
}
