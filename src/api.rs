use glam::Vec2;

use crate::types::*;

/// Broad-phase contract shared by spatial indexes.
pub trait SpatialIndex<T: Copy + PartialEq> {
    /// Store `value` under `rect`. Returns `false` when `rect` is not fully
    /// inside the index bounds; nothing is stored in that case.
    fn insert(&mut self, rect: Rect, value: T) -> bool;

    /// Every stored value whose rect intersects `rect` (inclusive), each once.
    fn query(&self, rect: &Rect) -> Vec<T>;

    /// Remove `value` by identity, wherever it was placed.
    fn remove(&mut self, value: T) -> bool;

    /// Remove then reinsert with `rect`. A failed removal still inserts.
    /// Returns the result of the insertion.
    fn update(&mut self, rect: Rect, value: T) -> bool {
        self.remove(value);
        self.insert(rect, value)
    }

    /// Drop every stored value.
    fn clear(&mut self);
}

/// Primitive geometric tests used by the engine.
pub trait NarrowphaseApi {
    // Sweeps ----------------------------------------------------------------

    /// Swept rect vs. stationary rect (slab per axis, intervals intersected).
    fn sweep_rect(mover: &Rect, velocity: Vec2, target: &Rect) -> Option<SweepHit>;

    // Overlaps --------------------------------------------------------------

    /// Strict penetration between two rects along the minimum axis.
    fn penetration(a: &Rect, b: &Rect) -> Option<Overlap>;

    /// Minimum-overlap axis normal (from `b` into `a`) without requiring penetration.
    fn contact_normal(a: &Rect, b: &Rect) -> Vec2;

    // Rays / segments -------------------------------------------------------

    fn ray_aabb(origin: Vec2, dir: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<SweepHit>;
    fn line_segment_aabb(a: Vec2, b: Vec2, aabb_min: Vec2, aabb_max: Vec2) -> Option<SweepHit>;
    fn segments_intersect(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> bool;
}
