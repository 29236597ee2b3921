pub mod actuator;
pub mod command;
pub mod config;
pub mod control;
pub mod controller;
pub mod display;
pub mod error;
pub mod motor;
pub mod protocol;
pub mod scheduler;
pub mod sensor;
pub mod sim;
pub mod telemetry;
pub mod types;
pub mod watchdog;

pub use actuator::{ActuatorDriver, FanOutput, FanState};
pub use command::{Command, CommandProcessor, LineBuffer};
pub use config::{
    AutoPolicy, ControllerConfig, MotorConfig, RuntimeConfig, SensorNodeConfig, TelemetryFormat,
};
pub use control::ControlLaw;
pub use controller::FanController;
pub use display::{Display, SensorDisplayNode};
pub use error::{ConfigError, ProtocolError, SensorError};
pub use motor::MotorNode;
pub use scheduler::{Clock, ManualClock, MonotonicClock};
pub use sensor::{Climate, ClimateSensor};
pub use sim::SimulatedClimate;
pub use types::{ControlMode, ControllerState, ManualSource, SensorReading, Targets};
pub use watchdog::CommandWatchdog;
