//! # Telemetry module
//!
//! The simulator speaks socket.io over a websocket. Each text frame starts with
//! a two digit header: `4` marks a websocket message and `2` marks an event.
//! Event frames carry a JSON array of `[event_name, payload]`, for example:
//!
//! ```text
//! 42["telemetry",{"cte":"0.7598","speed":"21.37","steering_angle":"-1.2"}]
//! ```
//!
//! The simulator encodes the telemetry values as strings. Plain JSON numbers
//! are also accepted.
//!
//! Replies are either a steering command:
//!
//! ```text
//! 42["steer",{"steering_angle":-0.07,"throttle":0.3}]
//! ```
//!
//! or, when the simulator sent an event without data, a request to hand
//! control back to the user (`42["manual",{}]`).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use serde_json::{self, Value};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Header of a socket.io event frame.
pub const EVENT_HEADER: &str = "42";

/// Name of the inbound telemetry event.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Name of the outbound steering command event.
pub const STEER_EVENT: &str = "steer";

/// Frame sent back to the simulator to hand control back to the user.
pub const MANUAL_FRAME: &str = "42[\"manual\",{}]";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single telemetry observation from the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Cross track error, the lateral distance from the reference path.
    pub cte: f64,

    /// Current speed of the vehicle, in the simulator's speed units.
    pub speed: f64,

    /// Current steering angle reported by the simulator, if any.
    ///
    /// Not used for control.
    pub steering_angle: Option<f64>
}

/// Steering and throttle command sent to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteerCmd {
    /// Normalised steering demand in the range [-1, 1].
    pub steering_angle: f64,

    /// Throttle demand, not limited.
    pub throttle: f64
}

/// Payload of the telemetry event as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawTelemetry {
    cte: WireNum,
    speed: WireNum,
    #[serde(default)]
    steering_angle: Option<WireNum>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// The frame is not a socket.io event and must be ignored.
    NotEvent,

    /// The frame is an event without any data, the simulator is waiting for
    /// the user to drive.
    NoData,

    /// A telemetry observation.
    Telemetry(Telemetry),

    /// Some other event which the controller does not handle.
    Other(String)
}

/// A number which may be sent either as a JSON number or a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireNum {
    Num(f64),
    Str(String)
}

/// Possible frame parsing errors.
#[derive(Debug, Error)]
pub enum TlmParseError {
    #[error("Frame contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Expected the event to be a JSON array starting with the event name")]
    InvalidEvent,

    #[error("The {0} event has no payload")]
    MissingPayload(String),

    #[error("Telemetry payload is invalid: {0}")]
    InvalidPayload(serde_json::Error),

    #[error("Telemetry field `{0}` is not a number (found {1:?})")]
    InvalidNumber(&'static str, String),

    #[error("Telemetry field `{0}` is not finite (found {1})")]
    NonFinite(&'static str, f64)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Decode a single text frame received from the simulator.
///
/// Non-finite telemetry values are rejected here so that they can never reach
/// a controller.
pub fn decode(frame: &str) -> Result<Frame, TlmParseError> {
    if frame.len() <= EVENT_HEADER.len() || !frame.starts_with(EVENT_HEADER) {
        return Ok(Frame::NotEvent)
    }

    let event_str = match event_data(frame) {
        Some(s) => s,
        None => return Ok(Frame::NoData)
    };

    let val: Value = serde_json::from_str(event_str)
        .map_err(TlmParseError::InvalidJson)?;

    let name = match val.get(0).and_then(Value::as_str) {
        Some(n) => n,
        None => return Err(TlmParseError::InvalidEvent)
    };

    if name != TELEMETRY_EVENT {
        return Ok(Frame::Other(name.to_string()))
    }

    let payload = match val.get(1) {
        Some(p) => p.clone(),
        None => return Err(TlmParseError::MissingPayload(name.to_string()))
    };

    let raw: RawTelemetry = serde_json::from_value(payload)
        .map_err(TlmParseError::InvalidPayload)?;

    Ok(Frame::Telemetry(Telemetry {
        cte: raw.cte.to_finite("cte")?,
        speed: raw.speed.to_finite("speed")?,
        steering_angle: match raw.steering_angle {
            Some(a) => Some(a.to_finite("steering_angle")?),
            None => None
        }
    }))
}

/// Encode a steering command frame.
pub fn encode_steer(cmd: &SteerCmd) -> Result<String, serde_json::Error> {
    let event = serde_json::to_string(&(STEER_EVENT, cmd))?;

    Ok(format!("{}{}", EVENT_HEADER, event))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the JSON array carried by an event frame.
///
/// Frames containing `null` anywhere, or without a pair of square brackets,
/// carry no data.
fn event_data(frame: &str) -> Option<&str> {
    if frame.contains("null") {
        return None
    }

    let start = frame.find('[')?;
    let end = frame.rfind(']')?;

    if end < start {
        return None
    }

    Some(&frame[start..=end])
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WireNum {
    fn to_finite(&self, field: &'static str) -> Result<f64, TlmParseError> {
        let value = match self {
            WireNum::Num(n) => *n,
            WireNum::Str(s) => s.trim().parse::<f64>()
                .map_err(|_| TlmParseError::InvalidNumber(field, s.clone()))?
        };

        if value.is_finite() {
            Ok(value)
        }
        else {
            Err(TlmParseError::NonFinite(field, value))
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
