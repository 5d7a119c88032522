//! Human control: keys to smoothed input axes to drive actions

use serde::{Deserialize, Serialize};

use crate::kinematics::{DriveAction, MotionConfig};

/// Directional keys held during a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    /// W / up arrow
    pub forward: bool,
    /// S / down arrow
    pub back: bool,
    /// A / left arrow
    pub left: bool,
    /// D / right arrow
    pub right: bool,
}

impl KeyState {
    /// Parse a compact key string such as `"WD"`; unknown characters are ignored.
    #[must_use]
    pub fn parse(keys: &str) -> Self {
        keys.chars().fold(Self::default(), |mut state, key| {
            match key.to_ascii_uppercase() {
                'W' | '^' => state.forward = true,
                'S' | 'V' => state.back = true,
                'A' | '<' => state.left = true,
                'D' | '>' => state.right = true,
                _ => {}
            }
            state
        })
    }

    /// Raw vertical axis in `{-1, 0, 1}`
    #[must_use]
    pub fn vertical(&self) -> f64 {
        f64::from(i8::from(self.forward) - i8::from(self.back))
    }

    /// Raw horizontal axis in `{-1, 0, 1}`
    #[must_use]
    pub fn horizontal(&self) -> f64 {
        f64::from(i8::from(self.right) - i8::from(self.left))
    }
}

/// Virtual input axis that ramps toward the held direction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputAxis {
    /// Units per second toward the target while a key is held
    pub sensitivity: f64,
    /// Units per second back to zero once released
    pub gravity: f64,
    /// Jump to zero first when reversing direction
    pub snap: bool,
    value: f64,
}

impl Default for InputAxis {
    fn default() -> Self {
        Self {
            sensitivity: 3.0,
            gravity: 3.0,
            snap: true,
            value: 0.0,
        }
    }
}

impl InputAxis {
    /// Current value in `[-1, 1]`
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Advance by `dt` seconds toward `raw` and return the new value
    pub fn update(&mut self, raw: f64, dt: f64) -> f64 {
        let raw = raw.clamp(-1.0, 1.0);
        if raw == 0.0 {
            self.value = approach(self.value, 0.0, self.gravity * dt);
        } else {
            if self.snap && self.value != 0.0 && raw.signum() != self.value.signum() {
                self.value = 0.0;
            }
            self.value = approach(self.value, raw, self.sensitivity * dt);
        }
        self.value
    }

    /// Return to rest
    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Turns key presses into drive actions, frame by frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualControl {
    /// Forward / back axis
    pub vertical: InputAxis,
    /// Left / right axis
    pub horizontal: InputAxis,
}

impl ManualControl {
    /// Feed one frame of keys lasting `dt` seconds
    pub fn update(&mut self, keys: KeyState, dt: f64) -> DriveAction {
        let throttle = self.vertical.update(keys.vertical(), dt);
        let turn = self.horizontal.update(keys.horizontal(), dt);
        DriveAction::new(throttle, turn)
    }

    /// Release both axes
    pub fn reset(&mut self) {
        self.vertical.reset();
        self.horizontal.reset();
    }
}

impl MotionConfig {
    /// Speeds of the keyboard-driven player car
    #[must_use]
    pub fn player() -> Self {
        Self {
            move_speed: 20.0,
            turn_speed: 45.0,
        }
    }
}
