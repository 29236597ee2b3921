//! Inbound command handling: line assembly, parsing, and state mutation.
//!
//! Two record shapes share the link: `KEY:VALUE` lines and flat JSON
//! objects. Anything that does not parse is dropped without a reply.

use log::{debug, info, warn};

use crate::{
    error::ProtocolError,
    protocol::{
        StructuredCommand, KEY_MODE, KEY_SET_HUM, KEY_SET_SPEED, KEY_SET_TEMP, MAX_LINE_BYTES,
    },
    types::{duty_from_f64, ControlMode, ControllerState, ManualSource},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    SetMode(ControlMode),
    /// Switch to MANUAL, keeping the current source. Coming from AUTO the
    /// source is PWM.
    EnterManual,
    SetManualDuty(u8),
    SetTargetTemp(f32),
    SetTargetHumidity(f32),
    /// Select a MANUAL source and its value in one step.
    Manual { source: ManualSource, value: f64 },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if line.starts_with('{') {
            return Self::parse_structured(line);
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ProtocolError::MissingSeparator)?;
        let value = value.trim();

        match key.trim().to_ascii_uppercase().as_str() {
            KEY_MODE => match value.to_ascii_uppercase().as_str() {
                "AUTO" => Ok(Self::SetMode(ControlMode::Auto)),
                "MANUAL" => Ok(Self::EnterManual),
                _ => Err(ProtocolError::UnknownMode(value.to_string())),
            },
            KEY_SET_SPEED => {
                let speed = parse_number(KEY_SET_SPEED, value)?;
                Ok(Self::SetManualDuty(duty_from_f64(speed)))
            }
            KEY_SET_TEMP => {
                let temp = parse_number(KEY_SET_TEMP, value)?;
                Ok(Self::SetTargetTemp(temp as f32))
            }
            KEY_SET_HUM => {
                let hum = parse_number(KEY_SET_HUM, value)?;
                Ok(Self::SetTargetHumidity(hum as f32))
            }
            other => Err(ProtocolError::UnknownKey(other.to_string())),
        }
    }

    fn parse_structured(line: &str) -> Result<Self, ProtocolError> {
        let record: StructuredCommand = serde_json::from_str(line)
            .map_err(|err| ProtocolError::InvalidJson(err.to_string()))?;

        match record.mode.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::SetMode(ControlMode::Auto)),
            "manual" => {
                let sub = record.sub.ok_or(ProtocolError::MissingField("sub"))?;
                let source = ManualSource::parse(&sub)
                    .ok_or_else(|| ProtocolError::UnknownSource(sub.clone()))?;
                let value = record.val.ok_or(ProtocolError::MissingField("val"))?;
                Ok(Self::Manual { source, value })
            }
            _ => Err(ProtocolError::UnknownMode(record.mode)),
        }
    }

    /// Mutate mode and targets. Returns whether anything changed.
    ///
    /// Setting a value never switches mode on its own: a duty sent while in
    /// AUTO is stored and takes effect after an explicit switch to MANUAL.
    pub fn apply(self, state: &mut ControllerState) -> bool {
        match self {
            Self::SetMode(mode) => set_mode(state, mode),
            Self::EnterManual => {
                let source = state.mode.manual_source().unwrap_or(ManualSource::Pwm);
                set_mode(state, ControlMode::Manual(source))
            }
            Self::SetManualDuty(duty) => state.targets.set_manual_duty(duty),
            Self::SetTargetTemp(temp) => state.targets.set_target_temp(temp),
            Self::SetTargetHumidity(hum) => state.targets.set_target_humidity(hum),
            Self::Manual { source, value } => {
                let value_changed = match source {
                    ManualSource::Pwm => state.targets.set_manual_duty(duty_from_f64(value)),
                    ManualSource::Temp => state.targets.set_target_temp(value as f32),
                    ManualSource::Hum => state.targets.set_target_humidity(value as f32),
                };
                let mode_changed = set_mode(state, ControlMode::Manual(source));
                value_changed || mode_changed
            }
        }
    }
}

fn set_mode(state: &mut ControllerState, mode: ControlMode) -> bool {
    if state.mode == mode {
        return false;
    }
    info!(
        "mode {} -> {}{}",
        state.mode.as_str(),
        mode.as_str(),
        mode.manual_source()
            .map(|source| format!("/{}", source.as_str()))
            .unwrap_or_default()
    );
    state.mode = mode;
    true
}

/// Numeric literals too large for f64 come back as infinities and are left
/// for the caller to clamp. `NaN` and spelled-out `inf` are rejected.
fn parse_number(key: &'static str, value: &str) -> Result<f64, ProtocolError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|number| !number.is_nan())
        .filter(|_| value.bytes().any(|byte| byte.is_ascii_digit()))
        .ok_or_else(|| ProtocolError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

/// Accumulates raw serial bytes and hands out complete lines.
///
/// Partial lines survive across calls. A line that grows past
/// [`MAX_LINE_BYTES`] is dropped up to and including its newline.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    overflowed: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in bytes {
            if byte == b'\n' {
                if self.overflowed {
                    warn!("dropping inbound line longer than {MAX_LINE_BYTES} bytes");
                } else if let Some(line) = self.take_line() {
                    lines.push(line);
                }
                self.pending.clear();
                self.overflowed = false;
                continue;
            }

            if self.overflowed {
                continue;
            }
            if self.pending.len() >= MAX_LINE_BYTES {
                self.overflowed = true;
                self.pending.clear();
                continue;
            }
            self.pending.push(byte);
        }

        lines
    }

    /// Bytes of the line still waiting for its newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_line(&mut self) -> Option<String> {
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        match std::str::from_utf8(&self.pending) {
            Ok(line) => Some(line.to_string()),
            Err(_) => {
                debug!("dropping non utf8 inbound line");
                None
            }
        }
    }
}

/// Line reader plus parser, run once per control cycle.
#[derive(Debug, Default)]
pub struct CommandProcessor {
    buffer: LineBuffer,
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume newly arrived bytes and apply every complete line in order.
    /// Returns how many lines parsed into a command.
    pub fn process(&mut self, inbound: &[u8], state: &mut ControllerState) -> usize {
        let mut accepted = 0;
        for line in self.buffer.feed(inbound) {
            match Command::parse(&line) {
                Ok(command) => {
                    command.apply(state);
                    accepted += 1;
                }
                Err(err) => debug!("ignoring inbound line {line:?}: {err}"),
            }
        }
        accepted
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }
}
