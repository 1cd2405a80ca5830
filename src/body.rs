use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::config::PhysicsConfig;
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Dynamic AABB body: rect, velocity, constant force and mass.
///
/// `force` is applied as an acceleration (`v += force * dt`) after each
/// position step. Mass only matters for body-vs-body exchange and
/// penetration splitting; a non-positive or infinite mass makes the body
/// immovable in those.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalObject {
    pub(crate) rect: Rect,
    pub(crate) velocity: Vec2,
    pub(crate) force: Vec2,
    pub(crate) mass: f32,
    pub(crate) collision_box: BoxKey,
}

impl PhysicalObject {
    pub(crate) fn new(collision_box: BoxKey) -> Self {
        Self { rect: Rect::default(), velocity: Vec2::ZERO, force: Vec2::ZERO, mass: 1.0, collision_box }
    }

    pub fn rect(&self) -> Rect { self.rect }
    pub fn velocity(&self) -> Vec2 { self.velocity }
    pub fn force(&self) -> Vec2 { self.force }
    pub fn mass(&self) -> f32 { self.mass }
    pub fn collision_box(&self) -> BoxKey { self.collision_box }

    /// Rect after moving for `dt` at the current velocity.
    pub fn projected(&self, dt: f32) -> Rect {
        self.rect + self.velocity * dt
    }

    /// Region swept over `dt`: current rect unioned with the projected one.
    pub fn motion_aabb(&self, dt: f32) -> Rect {
        self.rect.union(&self.projected(dt))
    }

    /// Explicit Euler step: position first, then velocity.
    pub fn integrate(&mut self, dt: f32) {
        self.rect += self.velocity * dt;
        self.velocity += self.force * dt;
    }

    pub(crate) fn state(&self, key: BodyKey) -> BodyState {
        BodyState { owner: Some(Owner::Physical(key)), rect: self.rect, velocity: self.velocity, mass: self.mass }
    }
}

/// Static rectangle other bodies bounce off.
#[derive(Clone, Debug, PartialEq)]
pub struct ObstacleObject {
    pub(crate) rect: Rect,
    pub(crate) collision_box: BoxKey,
}

impl ObstacleObject {
    pub(crate) fn new(rect: Rect, collision_box: BoxKey) -> Self {
        Self { rect, collision_box }
    }

    pub fn rect(&self) -> Rect { self.rect }
    pub fn collision_box(&self) -> BoxKey { self.collision_box }

    pub(crate) fn state(&self, key: ObstacleKey) -> BodyState {
        BodyState { owner: Some(Owner::Obstacle(key)), rect: self.rect, velocity: Vec2::ZERO, mass: f32::INFINITY }
    }
}

/// Positional split that pushes two overlapping rects apart.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Separation {
    /// Axis normal, pointing from the second rect into the first.
    pub normal: Vec2,
    pub this_offset: Vec2,
    pub other_offset: Vec2,
}

/// Reflect `velocity` off a surface with `normal`, scaling the normal
/// component by `restitution`. Velocities already leaving the surface are
/// returned unchanged.
pub fn reflect(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    velocity - (1.0 + restitution) * vn * normal
}

/// One-dimensional collision along `normal` (pointing from `other` into
/// `this`). Tangential components are kept. Returns the new
/// `(this, other)` velocities; a separating pair is returned unchanged.
pub fn elastic_exchange(this: &BodyState, other: &BodyState, normal: Vec2, restitution: f32) -> (Vec2, Vec2) {
    let closing = (this.velocity - other.velocity).dot(normal);
    let inv_sum = this.inv_mass() + other.inv_mass();
    if closing >= 0.0 || inv_sum == 0.0 {
        return (this.velocity, other.velocity);
    }
    let impulse = -(1.0 + restitution) * closing / inv_sum;
    (
        this.velocity + normal * (impulse * this.inv_mass()),
        other.velocity - normal * (impulse * other.inv_mass()),
    )
}

/// Offsets that remove the strict overlap between `this` and `other`,
/// split inversely to mass. `None` when the overlap is within `slop` or
/// neither side can move.
pub fn separate(this: &BodyState, other: &BodyState, slop: f32) -> Option<Separation> {
    let overlap = Narrowphase::penetration(&this.rect, &other.rect)?;
    if overlap.depth <= slop {
        return None;
    }
    let (inv_a, inv_b) = (this.inv_mass(), other.inv_mass());
    let inv_sum = inv_a + inv_b;
    if inv_sum == 0.0 {
        return None;
    }
    let push = overlap.normal * overlap.depth;
    Some(Separation {
        normal: overlap.normal,
        this_offset: push * (inv_a / inv_sum),
        other_offset: -push * (inv_b / inv_sum),
    })
}

/// Hook installed on every managed body's box.
///
/// Against an obstacle or an unowned box the body reflects with
/// `obstacle_restitution`. Against another body the pair exchanges momentum
/// along the contact normal with `body_restitution`. Either way any residual
/// overlap is pushed apart.
pub fn default_contact_response(contact: &Contact, cfg: &PhysicsConfig) -> ContactResponse {
    let (this_velocity, other_velocity) = match contact.other.owner {
        Some(Owner::Physical(_)) => {
            elastic_exchange(&contact.this, &contact.other, contact.normal, cfg.body_restitution)
        }
        _ => (
            reflect(contact.this.velocity - contact.other.velocity, contact.normal, cfg.obstacle_restitution)
                + contact.other.velocity,
            contact.other.velocity,
        ),
    };
    let (this_offset, other_offset) = separate(&contact.this, &contact.other, cfg.penetration_slop)
        .map_or((Vec2::ZERO, Vec2::ZERO), |s| (s.this_offset, s.other_offset));
    ContactResponse { this_velocity, other_velocity, this_offset, other_offset }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys() -> (BoxKey, BoxKey, BodyKey, BodyKey, ObstacleKey) {
        let mut boxes: SlotMap<BoxKey, ()> = SlotMap::with_key();
        let mut bodies: SlotMap<BodyKey, ()> = SlotMap::with_key();
        let mut obstacles: SlotMap<ObstacleKey, ()> = SlotMap::with_key();
        (boxes.insert(()), boxes.insert(()), bodies.insert(()), bodies.insert(()), obstacles.insert(()))
    }

    fn body(owner: Owner, rect: Rect, velocity: Vec2, mass: f32) -> BodyState {
        BodyState { owner: Some(owner), rect, velocity, mass }
    }

    #[test]
    fn test_integrate_moves_then_accelerates() {
        let (bk, ..) = keys();
        let mut b = PhysicalObject::new(bk);
        b.velocity = Vec2::new(2.0, 0.0);
        b.force = Vec2::new(0.0, -10.0);
        b.integrate(0.5);
        assert_eq!(b.rect.position(), Vec2::new(1.0, 0.0));
        assert_eq!(b.velocity, Vec2::new(2.0, -5.0));
        assert_eq!(b.motion_aabb(1.0), Rect::new(1.0, -5.0, 2.0, 5.0));
    }

    #[test]
    fn test_reflect_only_when_approaching() {
        let n = Vec2::new(-1.0, 0.0);
        assert_eq!(reflect(Vec2::new(10.0, 3.0), n, 0.8), Vec2::new(-8.0, 3.0));
        assert_eq!(reflect(Vec2::new(-10.0, 3.0), n, 0.8), Vec2::new(-10.0, 3.0));
        assert_eq!(reflect(Vec2::new(0.0, 3.0), n, 0.8), Vec2::new(0.0, 3.0));
    }

    #[test]
    fn test_equal_mass_elastic_swaps_velocities() {
        let (_, _, a, b, _) = keys();
        let this = body(Owner::Physical(a), Rect::new(0.0, 0.0, 10.0, 10.0), Vec2::new(10.0, 0.0), 1.0);
        let other = body(Owner::Physical(b), Rect::new(10.0, 0.0, 10.0, 10.0), Vec2::new(-10.0, 0.0), 1.0);
        let (va, vb) = elastic_exchange(&this, &other, Vec2::new(-1.0, 0.0), 1.0);
        assert_eq!(va, Vec2::new(-10.0, 0.0));
        assert_eq!(vb, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_heavy_body_barely_slows() {
        let (_, _, a, b, _) = keys();
        let this = body(Owner::Physical(a), Rect::default(), Vec2::new(10.0, 0.0), 99.0);
        let other = body(Owner::Physical(b), Rect::default(), Vec2::ZERO, 1.0);
        let (va, vb) = elastic_exchange(&this, &other, Vec2::new(-1.0, 0.0), 1.0);
        assert!((va.x - 9.8).abs() < 1e-4);
        assert!((vb.x - 19.8).abs() < 1e-4);
        let p_before = 99.0 * 10.0;
        let p_after = 99.0 * va.x + vb.x;
        assert!((p_before - p_after).abs() < 1e-3);
    }

    #[test]
    fn test_separating_pair_unchanged() {
        let (_, _, a, b, _) = keys();
        let this = body(Owner::Physical(a), Rect::default(), Vec2::new(-1.0, 0.0), 1.0);
        let other = body(Owner::Physical(b), Rect::default(), Vec2::new(1.0, 0.0), 1.0);
        let (va, vb) = elastic_exchange(&this, &other, Vec2::new(-1.0, 0.0), 1.0);
        assert_eq!((va, vb), (this.velocity, other.velocity));
    }

    #[test]
    fn test_separate_splits_by_inverse_mass() {
        let (_, _, a, b, o) = keys();
        let this = body(Owner::Physical(a), Rect::new(0.0, 0.0, 10.0, 10.0), Vec2::ZERO, 1.0);
        let other = body(Owner::Physical(b), Rect::new(8.0, 0.0, 10.0, 10.0), Vec2::ZERO, 1.0);
        let s = separate(&this, &other, 1e-4).unwrap();
        assert_eq!(s.normal, Vec2::new(-1.0, 0.0));
        assert_eq!(s.this_offset, Vec2::new(-1.0, 0.0));
        assert_eq!(s.other_offset, Vec2::new(1.0, 0.0));

        let wall = body(Owner::Obstacle(o), Rect::new(8.0, 0.0, 10.0, 10.0), Vec2::ZERO, f32::INFINITY);
        let s = separate(&this, &wall, 1e-4).unwrap();
        assert_eq!(s.this_offset, Vec2::new(-2.0, 0.0));
        assert_eq!(s.other_offset, Vec2::ZERO);

        let touching = body(Owner::Obstacle(o), Rect::new(10.0, 0.0, 10.0, 10.0), Vec2::ZERO, f32::INFINITY);
        assert!(separate(&this, &touching, 1e-4).is_none());
    }

    #[test]
    fn test_default_response_against_obstacle() {
        let (ba, bb, a, _, o) = keys();
        let contact = Contact {
            this_box: ba,
            other_box: bb,
            this: body(Owner::Physical(a), Rect::new(0.0, 0.0, 10.0, 10.0), Vec2::new(10.0, 5.0), 1.0),
            other: body(Owner::Obstacle(o), Rect::new(10.0, -20.0, 5.0, 50.0), Vec2::ZERO, f32::INFINITY),
            normal: Vec2::new(-1.0, 0.0),
        };
        let r = default_contact_response(&contact, &PhysicsConfig::default());
        assert_eq!(r.this_velocity, Vec2::new(-8.0, 5.0));
        assert_eq!(r.other_velocity, Vec2::ZERO);
        assert_eq!(r.this_offset, Vec2::ZERO);
    }

    #[test]
    fn test_default_response_against_body() {
        let (ba, bb, a, b, _) = keys();
        let contact = Contact {
            this_box: ba,
            other_box: bb,
            this: body(Owner::Physical(a), Rect::new(0.0, 0.0, 10.0, 10.0), Vec2::new(10.0, 0.0), 1.0),
            other: body(Owner::Physical(b), Rect::new(10.0, 0.0, 10.0, 10.0), Vec2::new(-10.0, 0.0), 1.0),
            normal: Vec2::new(-1.0, 0.0),
        };
        let r = default_contact_response(&contact, &PhysicsConfig::default());
        assert_eq!(r.this_velocity, Vec2::new(-10.0, 0.0));
        assert_eq!(r.other_velocity, Vec2::new(10.0, 0.0));
    }
}
