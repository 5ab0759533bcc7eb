//! Command executor - decodes payloads and dispatches them to the actuator

use crate::actuator::Actuator;
use rover_shared::codec::{self, Command, ParseError};
use tracing::{debug, warn};

/// Result of handling one inbound payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Command reached the actuator
    Executed,
    /// Command decoded but has no actuator mapping
    Ignored { reason: String },
    /// Payload could not be decoded
    Rejected(ParseError),
}

/// Running totals of handled payloads
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorStats {
    pub executed: u64,
    pub ignored: u64,
    pub rejected: u64,
}

/// Executes controller commands against an actuator
pub struct CommandExecutor<A> {
    actuator: A,
    stats: ExecutorStats,
}

impl<A: Actuator> CommandExecutor<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            actuator,
            stats: ExecutorStats::default(),
        }
    }

    #[cfg(test)]
    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    /// Decode a raw payload and execute it
    ///
    /// Decode failures are logged and counted, never propagated.
    pub fn handle_payload(&mut self, payload: &[u8]) -> CommandResult {
        match codec::parse_bytes(payload) {
            Ok(command) => self.execute(&command),
            Err(error) => {
                match &error {
                    ParseError::MissingCommand => {
                        debug!(payload = %String::from_utf8_lossy(payload), "Payload carries no command");
                    }
                    ParseError::Malformed(detail) => {
                        warn!(%detail, "Failed to parse payload");
                    }
                }
                self.stats.rejected += 1;
                CommandResult::Rejected(error)
            }
        }
    }

    /// Dispatch a decoded command to the actuator
    pub fn execute(&mut self, command: &Command) -> CommandResult {
        debug!(command = command.name(), "Executing command");

        match command {
            Command::Forward => self.actuator.move_forward(),
            Command::Backward => self.actuator.move_backward(),
            Command::SetServoAngle { angle } => self.actuator.set_servo_angle(*angle),
            Command::Unrecognized { raw_name } => {
                warn!(command = %raw_name, "Ignoring unrecognized command");
                self.stats.ignored += 1;
                return CommandResult::Ignored {
                    reason: format!("Unknown command `{raw_name}`"),
                };
            }
        }

        self.stats.executed += 1;
        CommandResult::Executed
    }
}
