//! Actuator gateway
//!
//! Capability interface through which decoded commands drive the hardware.
//! Calls run inline on the agent loop and must return promptly.

#[cfg(test)]
mod recording;

#[cfg(test)]
pub use recording::{ActuatorCall, RecordingActuator};

use rover_shared::servo;
use tracing::{info, warn};

/// Motion capabilities of the machine
pub trait Actuator {
    fn move_forward(&mut self);

    fn move_backward(&mut self);

    /// Move the servo to `angle` degrees
    ///
    /// Values arrive exactly as the controller sent them; range handling is up
    /// to the driver.
    fn set_servo_angle(&mut self, angle: i32);
}

/// Stub driver that only logs what it would do
#[derive(Debug, Default)]
pub struct LoggingActuator;

impl Actuator for LoggingActuator {
    fn move_forward(&mut self) {
        info!("Moving forward");
    }

    fn move_backward(&mut self) {
        info!("Moving backward");
    }

    fn set_servo_angle(&mut self, angle: i32) {
        if !servo::in_range(angle) {
            warn!(
                angle,
                "Servo angle outside nominal range {}..={}",
                servo::MIN_ANGLE,
                servo::MAX_ANGLE
            );
        }
        info!(angle, "Setting servo angle");
    }
}
