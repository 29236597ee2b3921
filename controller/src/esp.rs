use std::{thread, time::Duration};

use anyhow::{anyhow, Context};
use dht_sensor::dht22;
use esp_idf_hal::{
    delay::{Ets, NON_BLOCK},
    gpio::{AnyIOPin, AnyOutputPin, IOPin, InputOutput, Output, OutputPin, PinDriver, Pull},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution},
    prelude::*,
    uart::{config::Config as UartConfig, UartDriver},
};
use esp_idf_svc::log::EspLogger;
use log::{info, warn};

use fan_common::{
    Climate, ClimateSensor, Clock, FanController, FanOutput, MonotonicClock, RuntimeConfig,
    SensorError,
};

const PWM_FREQUENCY_HZ: u32 = 25_000;
const UART_BAUD: u32 = 115_200;
const UART_READ_CHUNK: usize = 128;
const WATCHDOG_TIMEOUT_SEC: u32 = 10;

/// DHT22 on a single open-drain data line.
struct Dht22Sensor {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
    delay: Ets,
}

impl Dht22Sensor {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self { pin, delay: Ets })
    }
}

impl ClimateSensor for Dht22Sensor {
    fn read(&mut self) -> Result<Climate, SensorError> {
        self.pin
            .set_high()
            .map_err(|err| SensorError::Bus(format!("{err:?}")))?;

        let reading = dht22::blocking::read(&mut self.delay, &mut self.pin)
            .map_err(|err| SensorError::Bus(format!("{err:?}")))?;
        Ok(Climate {
            temperature_c: reading.temperature,
            humidity_pct: reading.relative_humidity,
        })
    }
}

/// L298-style bridge: two direction pins plus an 8-bit LEDC channel on enable.
struct BridgeFan {
    pwm: LedcDriver<'static>,
    in1: PinDriver<'static, AnyOutputPin, Output>,
    in2: PinDriver<'static, AnyOutputPin, Output>,
}

impl BridgeFan {
    fn log_failure(result: Result<(), esp_idf_svc::sys::EspError>, what: &str) {
        if let Err(err) = result {
            warn!("fan bridge {what} failed: {err:?}");
        }
    }
}

impl FanOutput for BridgeFan {
    fn release(&mut self) {
        Self::log_failure(self.pwm.set_duty(0), "pwm write");
        Self::log_failure(self.in1.set_low(), "in1 write");
        Self::log_failure(self.in2.set_low(), "in2 write");
    }

    fn drive(&mut self, duty: u8) {
        Self::log_failure(self.in1.set_high(), "in1 write");
        Self::log_failure(self.in2.set_low(), "in2 write");
        Self::log_failure(self.pwm.set_duty(u32::from(duty)), "pwm write");
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let runtime = RuntimeConfig::default();
    let loop_period = Duration::from_millis(runtime.controller.loop_period_ms);

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    let sensor =
        Dht22Sensor::new(pins.gpio4.downgrade()).context("failed to initialize DHT22")?;

    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig {
            frequency: Hertz(PWM_FREQUENCY_HZ),
            resolution: Resolution::Bits8,
            ..Default::default()
        },
    )
    .context("failed to initialize LEDC timer")?;
    let fan = BridgeFan {
        pwm: LedcDriver::new(peripherals.ledc.channel0, timer, pins.gpio5)?,
        in1: PinDriver::output(pins.gpio18.downgrade_output())?,
        in2: PinDriver::output(pins.gpio19.downgrade_output())?,
    };

    let uart = UartDriver::new(
        peripherals.uart0,
        pins.gpio1,
        pins.gpio3,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::new().baudrate(Hertz(UART_BAUD)),
    )
    .context("failed to initialize UART0")?;

    init_watchdog(WATCHDOG_TIMEOUT_SEC)?;
    add_current_task_to_watchdog()?;

    let mut controller = FanController::new(runtime.controller, runtime.targets, sensor, fan);
    if let Some(banner) = controller.banner(env!("CARGO_PKG_VERSION")) {
        write_line(&uart, &banner);
    }
    info!("fan controller ready");

    let clock = MonotonicClock::new();
    let mut buf = [0u8; UART_READ_CHUNK];
    loop {
        let received = match uart.read(&mut buf, NON_BLOCK) {
            Ok(n) => n,
            Err(err) => {
                warn!("uart read failed: {err:?}");
                0
            }
        };

        if let Some(line) = controller.tick(clock.now_ms(), &buf[..received]) {
            write_line(&uart, &line);
        }

        feed_watchdog();
        thread::sleep(loop_period);
    }
}

fn write_line(uart: &UartDriver<'_>, line: &str) {
    if let Err(err) = uart.write(line.as_bytes()) {
        warn!("uart write failed: {err:?}");
    }
}

fn init_watchdog(timeout_sec: u32) -> anyhow::Result<()> {
    let config = esp_idf_svc::sys::esp_task_wdt_config_t {
        timeout_ms: timeout_sec.saturating_mul(1000),
        idle_core_mask: 0,
        trigger_panic: true,
    };
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_init(&config) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_init failed with code {}", rc))
}

fn add_current_task_to_watchdog() -> anyhow::Result<()> {
    let rc = unsafe { esp_idf_svc::sys::esp_task_wdt_add(core::ptr::null_mut()) };
    if rc == esp_idf_svc::sys::ESP_OK || rc == esp_idf_svc::sys::ESP_ERR_INVALID_STATE {
        return Ok(());
    }
    Err(anyhow!("esp_task_wdt_add failed with code {}", rc))
}

fn feed_watchdog() {
    let _ = unsafe { esp_idf_svc::sys::esp_task_wdt_reset() };
}
