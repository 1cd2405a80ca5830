use glam::Vec2;

/// Direction magnitudes at or below this count as "no input".
const INPUT_DEADZONE: f32 = 1e-6;

/// How a controller reacts to input changes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementMode {
    /// Velocity snaps to the target.
    #[default]
    Instant,
    /// Ramp toward the target at `accel_rate` / `decel_rate`.
    Linear,
    /// Ramp up, stop dead on release.
    LinearAccelInstantStop,
    /// Snap up, ramp down to rest on release.
    InstantAccelSmoothStop,
}

/// Turns a desired direction into a velocity for a physical object.
///
/// Rates are in units per second per second.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MovementController {
    pub mode: MovementMode,
    pub accel_rate: f32,
    pub decel_rate: f32,
    pub max_speed: f32,
}

impl Default for MovementController {
    fn default() -> Self {
        Self { mode: MovementMode::Instant, accel_rate: 50.0, decel_rate: 40.0, max_speed: 200.0 }
    }
}

impl MovementController {
    pub fn with_mode(mut self, mode: MovementMode) -> Self {
        self.mode = mode;
        self
    }

    /// Next velocity given the current one, an input `direction` (scaled by
    /// `max_speed`, not normalized) and the elapsed `dt` in seconds.
    pub fn update_velocity(&self, current: Vec2, direction: Vec2, dt: f32) -> Vec2 {
        let target = direction * self.max_speed;
        let idle = direction.length() <= INPUT_DEADZONE;
        match self.mode {
            MovementMode::Instant => target,
            MovementMode::Linear => self.move_towards(current, target, dt),
            MovementMode::LinearAccelInstantStop if idle => Vec2::ZERO,
            MovementMode::LinearAccelInstantStop => self.move_towards(current, target, dt),
            MovementMode::InstantAccelSmoothStop if idle => self.move_towards(current, Vec2::ZERO, dt),
            MovementMode::InstantAccelSmoothStop => target,
        }
    }

    fn move_towards(&self, current: Vec2, target: Vec2, dt: f32) -> Vec2 {
        let diff = target - current;
        let dist = diff.length();
        if dist <= INPUT_DEADZONE {
            return current;
        }
        let rate = if target.length() > current.length() { self.accel_rate } else { self.decel_rate };
        let step = rate * dt;
        if dist <= step {
            return target;
        }
        current + diff / dist * step
    }
}
