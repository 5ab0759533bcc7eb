//! Command execution for the agent
//!
//! This module handles:
//! - Decoding inbound payloads into commands
//! - Dispatching commands to the actuator
//! - Recovering locally from malformed or unknown commands

mod executor;

pub use executor::CommandExecutor;
