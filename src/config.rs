use crate::types::Rect;

/// How [`crate::PhysicsManager::on_update`] orders contacts across bodies.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepMode {
    /// Each body runs its own sub-stepped advance against the others as they
    /// stand. Cheap; simultaneous contacts between bodies may be misordered.
    Independent,
    /// Repeatedly find the globally earliest time of impact, advance every
    /// body to it and resolve that one contact. O(n²) per sub-step.
    #[default]
    GlobalEarliest,
}

/// Tuning constants for the simulation. Time is in seconds throughout.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Root boundary of the spatial index. Boxes outside it are not queryable.
    pub world_bounds: Rect,
    /// Restitution applied when a body bounces off an obstacle.
    pub obstacle_restitution: f32,
    /// Restitution for body-vs-body contacts (1.0 = elastic).
    pub body_restitution: f32,
    /// Scalar applied to the combined reflection after a penetration pass.
    pub penetration_damping: f32,
    /// Cap on per-body penetration passes at the start of each sub-step.
    pub penetration_iterations: usize,
    /// Cap on whole-population penetration sweeps after integration.
    pub resolve_all_iterations: usize,
    /// Cap on per-body sub-steps within one tick.
    pub max_sub_steps: usize,
    /// Cap on global earliest-event sub-steps within one tick.
    pub max_global_steps: usize,
    /// Remaining time below this is treated as spent.
    pub time_epsilon: f32,
    /// Overlap depth below this is not treated as penetration.
    pub penetration_slop: f32,
    pub step_mode: StepMode,
    /// Record wall-clock timings for each tick (see `PhysicsManager::timing`).
    pub enable_timing: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            world_bounds: Rect::new(-4096.0, -4096.0, 8192.0, 8192.0),
            obstacle_restitution: 0.8,
            body_restitution: 1.0,
            penetration_damping: 0.75,
            penetration_iterations: 5,
            resolve_all_iterations: 10,
            max_sub_steps: 10,
            max_global_steps: 25,
            time_epsilon: 1e-6,
            penetration_slop: 1e-4,
            step_mode: StepMode::GlobalEarliest,
            enable_timing: false,
        }
    }
}

impl PhysicsConfig {
    /// Default tuning over custom world bounds.
    pub fn with_bounds(world_bounds: Rect) -> Self {
        Self { world_bounds, ..Self::default() }
    }

    pub fn with_step_mode(mut self, step_mode: StepMode) -> Self {
        self.step_mode = step_mode;
        self
    }
}
