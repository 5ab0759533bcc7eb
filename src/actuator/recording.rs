//! Actuator that records calls for assertions

use super::Actuator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Forward,
    Backward,
    ServoAngle(i32),
}

#[derive(Debug, Default)]
pub struct RecordingActuator {
    pub calls: Vec<ActuatorCall>,
}

impl Actuator for RecordingActuator {
    fn move_forward(&mut self) {
        self.calls.push(ActuatorCall::Forward);
    }

    fn move_backward(&mut self) {
        self.calls.push(ActuatorCall::Backward);
    }

    fn set_servo_angle(&mut self, angle: i32) {
        self.calls.push(ActuatorCall::ServoAngle(angle));
    }
}
