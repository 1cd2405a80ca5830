use core::ops::{Add, AddAssign, Sub, SubAssign};

use glam::Vec2;
use slotmap::new_key_type;

use crate::api::NarrowphaseApi;
use crate::narrowphase::Narrowphase;

new_key_type! {
    /// Handle to a registered collision box.
    pub struct BoxKey;
    /// Handle to a managed physical object.
    pub struct BodyKey;
    /// Handle to a managed obstacle.
    pub struct ObstacleKey;
}

/// Axis-aligned rectangle: min corner plus size.
///
/// `bottom = y`, `top = y + height`; y grows toward `top`.
/// Width and height are assumed non-negative by every predicate.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build from min corner and size vectors.
    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    /// Build from min/max corners (in any order).
    pub fn from_min_max(a: Vec2, b: Vec2) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::from_pos_size(min, max - min)
    }

    pub fn left(&self) -> f32 { self.x }
    pub fn right(&self) -> f32 { self.x + self.width }
    pub fn bottom(&self) -> f32 { self.y }
    pub fn top(&self) -> f32 { self.y + self.height }

    pub fn position(&self) -> Vec2 { Vec2::new(self.x, self.y) }
    pub fn size(&self) -> Vec2 { Vec2::new(self.width, self.height) }
    pub fn half_size(&self) -> Vec2 { self.size() * 0.5 }
    pub fn min(&self) -> Vec2 { self.position() }
    pub fn max(&self) -> Vec2 { Vec2::new(self.right(), self.top()) }

    pub fn top_left(&self) -> Vec2 { Vec2::new(self.left(), self.top()) }
    pub fn top_right(&self) -> Vec2 { Vec2::new(self.right(), self.top()) }
    pub fn bottom_left(&self) -> Vec2 { Vec2::new(self.left(), self.bottom()) }
    pub fn bottom_right(&self) -> Vec2 { Vec2::new(self.right(), self.bottom()) }
    pub fn center(&self) -> Vec2 { (self.min() + self.max()) * 0.5 }

    pub fn set_position(&mut self, pos: Vec2) {
        self.x = pos.x;
        self.y = pos.y;
    }

    pub fn translate(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }

    /// Uniform resize around the min corner.
    pub fn scale(&self, ratio: f32) -> Self {
        self.scale_xy(Vec2::splat(ratio))
    }

    /// Per-axis resize around the min corner.
    pub fn scale_xy(&self, ratio: Vec2) -> Self {
        Self::new(self.x, self.y, self.width * ratio.x, self.height * ratio.y)
    }

    /// Grow by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(self.x - margin, self.y - margin, self.width + 2.0 * margin, self.height + 2.0 * margin)
    }

    /// Smallest rect covering both.
    pub fn union(&self, other: &Rect) -> Self {
        Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Smallest rect covering every input; `None` for an empty slice.
    pub fn bounding_box(rects: &[Rect]) -> Option<Self> {
        let (first, rest) = rects.split_first()?;
        Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
    }

    /// Inclusive point test.
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.bottom() && p.y <= self.top()
    }

    /// `other` lies inside `self`; shared edges allowed.
    pub fn contains(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.bottom() >= self.bottom()
            && other.top() <= self.top()
    }

    /// `other` lies inside `self` with no shared edge.
    pub fn strictly_contains(&self, other: &Rect) -> bool {
        other.left() > self.left()
            && other.right() < self.right()
            && other.bottom() > self.bottom()
            && other.top() < self.top()
    }

    /// Any edge of `self` lies on an edge line of `other`.
    pub fn is_on_edge(&self, other: &Rect) -> bool {
        self.left() == other.left()
            || self.left() == other.right()
            || self.right() == other.right()
            || self.right() == other.left()
            || self.top() == other.top()
            || self.top() == other.bottom()
            || self.bottom() == other.bottom()
            || self.bottom() == other.top()
    }

    /// Inclusive intersection: touching edges count.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() < other.left()
            || self.left() > other.right()
            || self.bottom() > other.top()
            || self.top() < other.bottom())
    }

    /// Strict overlap: positive penetration on both axes.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.right() > other.left()
            && self.left() < other.right()
            && self.top() > other.bottom()
            && self.bottom() < other.top()
    }

    /// Earliest non-negative time at which `self`, moving with `velocity`,
    /// touches `other`; `-1.0` when the sweep never reaches it.
    pub fn time_to_collide(&self, velocity: Vec2, other: &Rect) -> f32 {
        Narrowphase::sweep_rect(self, velocity, other).map_or(-1.0, |hit| hit.toi)
    }

    /// Like [`Rect::time_to_collide`], also reporting the entry normal.
    pub fn sweep(&self, velocity: Vec2, other: &Rect) -> Option<SweepHit> {
        Narrowphase::sweep_rect(self, velocity, other)
    }
}

impl Add<Vec2> for Rect {
    type Output = Rect;
    fn add(self, rhs: Vec2) -> Rect { self.translate(rhs) }
}

impl Sub<Vec2> for Rect {
    type Output = Rect;
    fn sub(self, rhs: Vec2) -> Rect { self.translate(-rhs) }
}

impl AddAssign<Vec2> for Rect {
    fn add_assign(&mut self, rhs: Vec2) { *self = self.translate(rhs); }
}

impl SubAssign<Vec2> for Rect {
    fn sub_assign(&mut self, rhs: Vec2) { *self = self.translate(-rhs); }
}

/// Coarse category tag. A box *is* one layer and *reacts to* a set of layers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollisionLayer {
    #[default]
    None,
    Player,
    Enemy,
    Obstacle,
    Physics,
}

impl CollisionLayer {
    pub const ALL: [CollisionLayer; 5] = [
        CollisionLayer::None,
        CollisionLayer::Player,
        CollisionLayer::Enemy,
        CollisionLayer::Obstacle,
        CollisionLayer::Physics,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// Set of layers a box reports collisions against.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerSet(u32);

impl LayerSet {
    pub const EMPTY: LayerSet = LayerSet(0);

    pub fn of(layers: &[CollisionLayer]) -> Self {
        layers.iter().fold(Self::EMPTY, |set, &l| set.with(l))
    }

    pub fn with(mut self, layer: CollisionLayer) -> Self {
        self.insert(layer);
        self
    }

    pub fn insert(&mut self, layer: CollisionLayer) { self.0 |= layer.bit(); }
    pub fn remove(&mut self, layer: CollisionLayer) { self.0 &= !layer.bit(); }
    pub fn contains(&self, layer: CollisionLayer) -> bool { self.0 & layer.bit() != 0 }
    pub fn is_empty(&self) -> bool { self.0 == 0 }
    pub fn clear(&mut self) { self.0 = 0; }

    pub fn iter(&self) -> impl Iterator<Item = CollisionLayer> + '_ {
        CollisionLayer::ALL.into_iter().filter(|l| self.contains(*l))
    }
}

/// What a collision box is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Owner {
    Physical(BodyKey),
    Obstacle(ObstacleKey),
}

/// Swept (time-of-impact) result.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepHit {
    /// Time of first contact (same unit as the velocity's time base), ≥ 0.
    pub toi: f32,
    /// Entry normal, pointing from the struck shape toward the mover.
    pub normal: Vec2,
}

/// Stationary overlap result.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Overlap {
    /// Minimum-penetration axis normal, pointing from B into A.
    pub normal: Vec2,
    /// Penetration depth along `normal` (> 0).
    pub depth: f32,
}

/// Snapshot of one side of a contact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyState {
    pub owner: Option<Owner>,
    pub rect: Rect,
    pub velocity: Vec2,
    /// `f32::INFINITY` for obstacles and unowned boxes.
    pub mass: f32,
}

impl BodyState {
    pub fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 && self.mass.is_finite() { 1.0 / self.mass } else { 0.0 }
    }
}

/// Input to a contact hook.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    /// The box whose hook fires.
    pub this_box: BoxKey,
    pub other_box: BoxKey,
    pub this: BodyState,
    pub other: BodyState,
    /// Contact normal, pointing from `other` into `this`.
    pub normal: Vec2,
}

/// Output of a contact hook: new velocities and position offsets for both sides.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactResponse {
    pub this_velocity: Vec2,
    pub other_velocity: Vec2,
    pub this_offset: Vec2,
    pub other_offset: Vec2,
}

impl ContactResponse {
    /// Response that leaves both sides untouched.
    pub fn unchanged(contact: &Contact) -> Self {
        Self {
            this_velocity: contact.this.velocity,
            other_velocity: contact.other.velocity,
            this_offset: Vec2::ZERO,
            other_offset: Vec2::ZERO,
        }
    }
}

/// Outcome of a whole-population penetration sweep.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PenetrationReport {
    /// Sweeps run, including the final clean one.
    pub passes: usize,
    /// Pairs pushed apart across all sweeps.
    pub corrections: usize,
}

/// Population and index sizes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub bodies: usize,
    pub obstacles: usize,
    pub boxes: usize,
    /// Boxes currently queryable (inside the world bounds).
    pub indexed: usize,
    pub nodes: usize,
}

/// Timing breakdown for the last completed tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct StepTiming {
    pub total_ms: f64,
    pub advance_ms: f64,
    pub resolve_ms: f64,

    pub contacts: usize,
    pub corrections: usize,
}
