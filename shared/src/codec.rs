//! JSON codec for controller commands
//!
//! Inbound payloads are UTF-8 JSON objects:
//! ```text
//! { "command": "forward" | "backward" | "servo", "params": { "angle": <integer> } }
//! ```
//!
//! `params` is only read for `servo`. Unknown fields are ignored and unknown
//! command names decode to [`Command::Unrecognized`] rather than an error, so a
//! newer controller never knocks the device off the link.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::link;

/// Errors that can occur while decoding an inbound payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Payload has no string `command` field")]
    MissingCommand,
}

/// A decoded controller command
///
/// Owns all of its data; nothing borrows from the payload it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Drive forward
    Forward,
    /// Drive backward
    Backward,
    /// Move the servo to an absolute angle in degrees
    SetServoAngle { angle: i32 },
    /// A named command this device does not know
    Unrecognized { raw_name: String },
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &str {
        match self {
            Command::Forward => "forward",
            Command::Backward => "backward",
            Command::SetServoAngle { .. } => "servo",
            Command::Unrecognized { raw_name } => raw_name,
        }
    }
}

/// Decode a text payload into a [`Command`]
pub fn parse(raw: &str) -> Result<Command, ParseError> {
    parse_bytes(raw.as_bytes())
}

/// Decode a raw byte payload into a [`Command`]
///
/// Invalid UTF-8 is reported as [`ParseError::Malformed`].
pub fn parse_bytes(raw: &[u8]) -> Result<Command, ParseError> {
    let doc: Value =
        serde_json::from_slice(raw).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let name = doc
        .get("command")
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingCommand)?;

    let command = match name {
        "forward" => Command::Forward,
        "backward" => Command::Backward,
        "servo" => Command::SetServoAngle {
            angle: coerce_angle(doc.pointer("/params/angle")),
        },
        other => Command::Unrecognized {
            raw_name: other.to_owned(),
        },
    };

    Ok(command)
}

/// Read an angle out of a JSON value
///
/// Integers outside the `i32` range saturate and fractional numbers truncate
/// toward zero. Numeric strings (`"90"`) are read as their number and booleans
/// as 0 or 1. Anything else, including a missing field, reads as 0.
fn coerce_angle(value: Option<&Value>) -> i32 {
    match value {
        Some(Value::Number(n)) => number_to_angle(n),
        Some(Value::Bool(b)) => i32::from(*b),
        Some(Value::String(s)) => s
            .trim()
            .parse::<serde_json::Number>()
            .map_or(0, |n| number_to_angle(&n)),
        _ => 0,
    }
}

fn number_to_angle(n: &serde_json::Number) -> i32 {
    if let Some(i) = n.as_i64() {
        i32::try_from(i).unwrap_or(if i < 0 { i32::MIN } else { i32::MAX })
    } else if n.as_u64().is_some() {
        // Only reachable above i64::MAX
        i32::MAX
    } else {
        // `as` saturates and maps NaN to 0
        n.as_f64().map_or(0, |f| f as i32)
    }
}

/// Messages the device sends to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceMessage {
    /// Announce what kind of client this connection is
    ClientType {
        #[serde(rename = "clientType")]
        client_type: String,
    },
    /// Identify the device to the controller
    Identify {
        #[serde(rename = "deviceId")]
        device_id: String,
    },
}

impl DeviceMessage {
    /// The identification sequence sent after every successful open
    pub fn identification(device_id: impl Into<String>) -> [DeviceMessage; 2] {
        [
            DeviceMessage::ClientType {
                client_type: link::CLIENT_TYPE.into(),
            },
            DeviceMessage::Identify {
                device_id: device_id.into(),
            },
        ]
    }
}

/// Encode an outbound device message as JSON text
pub fn encode(message: &DeviceMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servo(angle: &str) -> Result<Command, ParseError> {
        parse(&format!(
            r#"{{"command":"servo","params":{{"angle":{angle}}}}}"#
        ))
    }

    #[test]
    fn test_motion_commands() {
        assert_eq!(parse(r#"{"command":"forward"}"#), Ok(Command::Forward));
        assert_eq!(parse(r#"{"command":"backward"}"#), Ok(Command::Backward));
    }

    #[test]
    fn test_servo_angle_passes_through() {
        for angle in [0, 90, 180, -1, -90, 255, 256, 1000] {
            assert_eq!(
                servo(&angle.to_string()),
                Ok(Command::SetServoAngle { angle }),
                "angle {angle}"
            );
        }
    }

    #[test]
    fn test_servo_angle_saturates_out_of_range() {
        assert_eq!(
            servo("9999999999"),
            Ok(Command::SetServoAngle { angle: i32::MAX })
        );
        assert_eq!(
            servo("-9999999999"),
            Ok(Command::SetServoAngle { angle: i32::MIN })
        );
        assert_eq!(
            servo("18446744073709551615"),
            Ok(Command::SetServoAngle { angle: i32::MAX })
        );
        assert_eq!(
            servo("1e300"),
            Ok(Command::SetServoAngle { angle: i32::MAX })
        );
    }

    #[test]
    fn test_servo_fractional_angle_truncates() {
        assert_eq!(servo("90.7"), Ok(Command::SetServoAngle { angle: 90 }));
        assert_eq!(servo("-0.5"), Ok(Command::SetServoAngle { angle: 0 }));
    }

    #[test]
    fn test_servo_without_angle_reads_zero() {
        assert_eq!(
            parse(r#"{"command":"servo"}"#),
            Ok(Command::SetServoAngle { angle: 0 })
        );
        assert_eq!(
            parse(r#"{"command":"servo","params":{"angle":"ninety"}}"#),
            Ok(Command::SetServoAngle { angle: 0 })
        );
    }

    #[test]
    fn test_servo_numeric_strings_and_booleans() {
        assert_eq!(servo(r#""90""#), Ok(Command::SetServoAngle { angle: 90 }));
        assert_eq!(servo(r#"" -15 ""#), Ok(Command::SetServoAngle { angle: -15 }));
        assert_eq!(servo(r#""45.9""#), Ok(Command::SetServoAngle { angle: 45 }));
        assert_eq!(servo("true"), Ok(Command::SetServoAngle { angle: 1 }));
        assert_eq!(servo("false"), Ok(Command::SetServoAngle { angle: 0 }));
        assert_eq!(servo("null"), Ok(Command::SetServoAngle { angle: 0 }));
        assert_eq!(servo("[90]"), Ok(Command::SetServoAngle { angle: 0 }));
    }

    #[test]
    fn test_malformed_payloads() {
        for raw in ["", "{", r#"{"command":"forw"#, "forward", "{command: forward}"] {
            assert!(
                matches!(parse(raw), Err(ParseError::Malformed(_))),
                "payload {raw:?}"
            );
        }
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let result = parse_bytes(&[b'{', 0xff, 0xfe, b'}']);
        assert!(matches!(result, Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_missing_command() {
        for raw in [
            "{}",
            r#"{"params":{"angle":10}}"#,
            r#"{"command":42}"#,
            r#"{"command":null}"#,
            r#"["forward"]"#,
            "17",
            r#"{"type":"system","message":"Connection established"}"#,
        ] {
            assert_eq!(parse(raw), Err(ParseError::MissingCommand), "payload {raw:?}");
        }
    }

    #[test]
    fn test_unrecognized_command_is_not_an_error() {
        let command = parse(r#"{"command":"dance","params":{"style":"salsa"}}"#);
        assert_eq!(
            command,
            Ok(Command::Unrecognized {
                raw_name: "dance".into()
            })
        );
        assert_eq!(command.map(|c| c.name().to_owned()), Ok("dance".into()));
    }

    #[test]
    fn test_extra_fields_are_tolerated() {
        assert_eq!(
            parse(r#"{"command":"forward","params":{"angle":5},"speed":3,"id":"x"}"#),
            Ok(Command::Forward)
        );
    }

    #[test]
    fn test_identification_messages() {
        let [client_type, identify] = DeviceMessage::identification("rover-7");
        assert_eq!(
            encode(&client_type).unwrap(),
            r#"{"type":"client_type","clientType":"esp"}"#
        );
        assert_eq!(
            encode(&identify).unwrap(),
            r#"{"type":"identify","deviceId":"rover-7"}"#
        );
    }
}
