use glam::Vec2;
use slotmap::SlotMap;
use tracing::{debug, instrument, trace, warn};

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::body::{default_contact_response, separate, ObstacleObject, PhysicalObject};
use crate::collision::{CollisionWorld, ContactHook};
use crate::config::{PhysicsConfig, StepMode};
use crate::error::CollideError;
use crate::types::*;

/// Earliest upcoming contact for one body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Impact {
    /// Time until contact, `0 <= toi <= max_time`.
    pub toi: f32,
    /// Box that will be struck.
    pub other: BoxKey,
    /// Entry normal, pointing from the struck box toward the body.
    pub normal: Vec2,
}

/// Body/box pairs already fired at `toi == 0` within the current advance.
type TouchSet = HashSet<(BodyKey, BoxKey)>;

/// Owns every physical object and obstacle plus the collision registry they
/// live in, and advances them with continuous collision detection.
///
/// `cfg.world_bounds` is read once, at construction.
pub struct PhysicsManager {
    pub cfg: PhysicsConfig,
    collision: CollisionWorld,
    bodies: SlotMap<BodyKey, PhysicalObject>,
    obstacles: SlotMap<ObstacleKey, ObstacleObject>,

    tick_contacts: usize,
    last_timing: Option<StepTiming>,
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl PhysicsManager {
    pub fn new(cfg: PhysicsConfig) -> Self {
        Self {
            collision: CollisionWorld::new(cfg.world_bounds),
            cfg,
            bodies: SlotMap::with_key(),
            obstacles: SlotMap::with_key(),
            tick_contacts: 0,
            last_timing: None,
        }
    }

    // Lifecycle -------------------------------------------------------------

    /// New body: unit mass, at rest on the default rect. Its box is on the
    /// `Physics` layer, reacts to `Physics` and `Obstacle`, and carries
    /// [`default_contact_response`].
    pub fn create_physical_object(&mut self) -> BodyKey {
        let collision = &mut self.collision;
        let key = self.bodies.insert_with_key(|key| {
            let collision_box = collision.create_box_with(
                CollisionLayer::Physics,
                LayerSet::of(&[CollisionLayer::Physics, CollisionLayer::Obstacle]),
                Some(Owner::Physical(key)),
                Some(Box::new(default_contact_response)),
            );
            PhysicalObject::new(collision_box)
        });
        debug!(?key, "physical object created");
        key
    }

    pub fn destroy_physical_object(&mut self, key: BodyKey) -> Result<(), CollideError> {
        let body = self.bodies.remove(key).ok_or(CollideError::StaleBody)?;
        self.release_box(body.collision_box);
        debug!(?key, "physical object destroyed");
        Ok(())
    }

    /// New static obstacle on the `Obstacle` layer. Its box reacts to nothing.
    pub fn create_obstacle(&mut self, rect: Rect) -> ObstacleKey {
        let collision = &mut self.collision;
        let key = self.obstacles.insert_with_key(|key| {
            let collision_box =
                collision.create_box_with(CollisionLayer::Obstacle, LayerSet::EMPTY, Some(Owner::Obstacle(key)), None);
            ObstacleObject::new(rect, collision_box)
        });
        if let Some(o) = self.obstacles.get(key) {
            if let Err(err) = self.collision.set_rect(o.collision_box, rect) {
                warn!(?key, ?rect, %err, "obstacle not indexed");
            }
        }
        debug!(?key, ?rect, "obstacle created");
        key
    }

    pub fn destroy_obstacle(&mut self, key: ObstacleKey) -> Result<(), CollideError> {
        let obstacle = self.obstacles.remove(key).ok_or(CollideError::StaleObstacle)?;
        self.release_box(obstacle.collision_box);
        debug!(?key, "obstacle destroyed");
        Ok(())
    }

    /// Destroy every managed body and obstacle. Boxes registered directly
    /// through [`PhysicsManager::collision_mut`] are kept.
    pub fn clear(&mut self) {
        let boxes: Vec<BoxKey> = self
            .bodies
            .values()
            .map(|b| b.collision_box)
            .chain(self.obstacles.values().map(|o| o.collision_box))
            .collect();
        for key in boxes {
            self.release_box(key);
        }
        self.bodies.clear();
        self.obstacles.clear();
    }

    fn release_box(&mut self, key: BoxKey) {
        if self.collision.destroy_box(key).is_err() {
            warn!(?key, "managed box was already destroyed");
        }
    }

    // Accessors -------------------------------------------------------------

    pub fn body(&self, key: BodyKey) -> Option<&PhysicalObject> {
        self.bodies.get(key)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &PhysicalObject)> {
        self.bodies.iter()
    }

    pub fn obstacle(&self, key: ObstacleKey) -> Option<&ObstacleObject> {
        self.obstacles.get(key)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (ObstacleKey, &ObstacleObject)> {
        self.obstacles.iter()
    }

    pub fn collision(&self) -> &CollisionWorld {
        &self.collision
    }

    /// Direct registry access, e.g. for boxes the manager does not own.
    pub fn collision_mut(&mut self) -> &mut CollisionWorld {
        &mut self.collision
    }

    pub fn debug_stats(&self) -> WorldStats {
        let (indexed, nodes) = self.collision.index_stats();
        WorldStats {
            bodies: self.bodies.len(),
            obstacles: self.obstacles.len(),
            boxes: self.collision.len(),
            indexed,
            nodes,
        }
    }

    /// Timing breakdown of the last [`PhysicsManager::on_update`], when
    /// `cfg.enable_timing` is set.
    pub fn timing(&self) -> Option<StepTiming> {
        self.last_timing
    }

    /// Call `draw` once per body with its current rect.
    pub fn render<F: FnMut(BodyKey, &Rect)>(&self, mut draw: F) {
        for (key, body) in &self.bodies {
            draw(key, &body.rect);
        }
    }

    // Mutators --------------------------------------------------------------

    fn body_mut(&mut self, key: BodyKey) -> Result<&mut PhysicalObject, CollideError> {
        self.bodies.get_mut(key).ok_or(CollideError::StaleBody)
    }

    fn body_box(&self, key: BodyKey) -> Result<BoxKey, CollideError> {
        self.bodies.get(key).map(|b| b.collision_box).ok_or(CollideError::StaleBody)
    }

    /// Move a body. An out-of-bounds rect is still applied but the body is not
    /// collidable until it returns inside the world.
    pub fn set_rect(&mut self, key: BodyKey, rect: Rect) -> Result<(), CollideError> {
        let body = self.body_mut(key)?;
        body.rect = rect;
        let collision_box = body.collision_box;
        self.collision.set_rect(collision_box, rect).inspect_err(|err| {
            warn!(?key, ?rect, %err, "body not indexed");
        })
    }

    pub fn set_velocity(&mut self, key: BodyKey, velocity: Vec2) -> Result<(), CollideError> {
        self.body_mut(key)?.velocity = velocity;
        Ok(())
    }

    pub fn add_velocity(&mut self, key: BodyKey, delta: Vec2) -> Result<(), CollideError> {
        self.body_mut(key)?.velocity += delta;
        Ok(())
    }

    pub fn set_force(&mut self, key: BodyKey, force: Vec2) -> Result<(), CollideError> {
        self.body_mut(key)?.force = force;
        Ok(())
    }

    pub fn add_force(&mut self, key: BodyKey, delta: Vec2) -> Result<(), CollideError> {
        self.body_mut(key)?.force += delta;
        Ok(())
    }

    pub fn set_mass(&mut self, key: BodyKey, mass: f32) -> Result<(), CollideError> {
        self.body_mut(key)?.mass = mass;
        Ok(())
    }

    /// Layer the body's box belongs to.
    pub fn set_src(&mut self, key: BodyKey, layer: CollisionLayer) -> Result<(), CollideError> {
        let collision_box = self.body_box(key)?;
        self.collision.set_src(collision_box, layer)
    }

    /// Layers the body's box reacts to.
    pub fn set_dst(&mut self, key: BodyKey, layers: LayerSet) -> Result<(), CollideError> {
        let collision_box = self.body_box(key)?;
        self.collision.set_dst(collision_box, layers)
    }

    /// Replace the body's contact hook.
    pub fn on_collide(&mut self, key: BodyKey, hook: ContactHook) -> Result<(), CollideError> {
        let collision_box = self.body_box(key)?;
        self.collision.on_collide(collision_box, hook)
    }

    pub fn set_obstacle_rect(&mut self, key: ObstacleKey, rect: Rect) -> Result<(), CollideError> {
        let obstacle = self.obstacles.get_mut(key).ok_or(CollideError::StaleObstacle)?;
        obstacle.rect = rect;
        let collision_box = obstacle.collision_box;
        self.collision.set_rect(collision_box, rect).inspect_err(|err| {
            warn!(?key, ?rect, %err, "obstacle not indexed");
        })
    }

    // Internal state plumbing ----------------------------------------------

    /// Push the body's rect into its collision box.
    fn sync_box(&mut self, key: BodyKey) {
        let Some(body) = self.bodies.get(key) else { return };
        if let Err(err) = self.collision.set_rect(body.collision_box, body.rect) {
            debug!(?key, rect = ?body.rect, %err, "body box out of sync");
        }
    }

    /// Snapshot of whatever owns `box_key`. Unowned boxes read as immovable.
    fn state_of_box(&self, box_key: BoxKey) -> Option<BodyState> {
        let b = self.collision.get(box_key)?;
        match b.owner() {
            Some(Owner::Physical(k)) => self.bodies.get(k).map(|body| body.state(k)),
            Some(Owner::Obstacle(k)) => self.obstacles.get(k).map(|o| o.state(k)),
            None => Some(BodyState { owner: None, rect: b.rect(), velocity: Vec2::ZERO, mass: f32::INFINITY }),
        }
    }

    fn set_body_velocity(&mut self, owner: Option<Owner>, velocity: Vec2) {
        if let Some(Owner::Physical(key)) = owner {
            if let Some(body) = self.bodies.get_mut(key) {
                body.velocity = velocity;
            }
        }
    }

    fn shift_body(&mut self, owner: Option<Owner>, offset: Vec2) {
        if offset == Vec2::ZERO {
            return;
        }
        if let Some(Owner::Physical(key)) = owner {
            if let Some(body) = self.bodies.get_mut(key) {
                body.rect += offset;
                self.sync_box(key);
            }
        }
    }

    fn integrate_body(&mut self, key: BodyKey, dt: f32) {
        if let Some(body) = self.bodies.get_mut(key) {
            body.integrate(dt);
            self.sync_box(key);
        }
    }

    // Contact search --------------------------------------------------------

    /// Earliest contact for `key` within `max_time`, treating everything else
    /// as stationary.
    ///
    /// A contact at `toi == 0` (already touching) only counts while the pair
    /// is closing; touching-and-separating is ignored.
    pub fn find_first_collision(&self, key: BodyKey, max_time: f32) -> Option<Impact> {
        self.earliest_impact(key, max_time, None, &TouchSet::new())
    }

    /// With `relative_margin`, sweeps use the relative velocity and the broad
    /// phase is widened by `margin` to catch bodies moving into the path.
    /// Touching pairs in `touched` were already resolved at `toi == 0` and are
    /// not reported again.
    fn earliest_impact(
        &self,
        key: BodyKey,
        max_time: f32,
        relative_margin: Option<f32>,
        touched: &TouchSet,
    ) -> Option<Impact> {
        let body = self.bodies.get(key)?;
        let mut region = body.motion_aabb(max_time);
        if let Some(margin) = relative_margin {
            region = region.expand(margin);
        }
        let mut best: Option<Impact> = None;
        for other in self.collision.process_collide_in(body.collision_box, region) {
            let Some(state) = self.state_of_box(other) else { continue };
            let velocity = match relative_margin {
                Some(_) => body.velocity - state.velocity,
                None => body.velocity,
            };
            let Some(hit) = body.rect.sweep(velocity, &state.rect) else { continue };
            // Already touching: only a closing pair counts.
            let closing = if hit.toi > 0.0 { velocity } else { body.velocity - state.velocity };
            if hit.toi > max_time || closing.dot(hit.normal) >= 0.0 {
                continue;
            }
            if hit.toi <= 0.0 && touched.contains(&(key, other)) {
                continue;
            }
            if best.is_none_or(|b| hit.toi < b.toi) {
                best = Some(Impact { toi: hit.toi, other, normal: hit.normal });
            }
        }
        best
    }

    /// Build the contact for `key` hitting `impact.other`, run the body's hook
    /// and write the response back to both sides.
    fn fire_contact(&mut self, key: BodyKey, impact: &Impact) {
        let Some(body) = self.bodies.get(key) else { return };
        let Some(other) = self.state_of_box(impact.other) else { return };
        let contact = Contact {
            this_box: body.collision_box,
            other_box: impact.other,
            this: body.state(key),
            other,
            normal: impact.normal,
        };
        let Some(hook) = self.collision.get(contact.this_box).and_then(|b| b.callback()) else {
            return;
        };
        let response = hook(&contact, &self.cfg);
        trace!(?key, other = ?impact.other, toi = impact.toi, "contact");
        self.tick_contacts += 1;

        self.set_body_velocity(contact.this.owner, response.this_velocity);
        self.set_body_velocity(contact.other.owner, response.other_velocity);
        self.shift_body(contact.this.owner, response.this_offset);
        self.shift_body(contact.other.owner, response.other_offset);
    }

    // Penetration -----------------------------------------------------------

    /// Push `key` out of everything it overlaps, up to
    /// `cfg.penetration_iterations` passes. Returns the normals applied.
    fn resolve_body_penetrations(&mut self, key: BodyKey) -> Vec<Vec2> {
        let mut normals = Vec::new();
        self.sync_box(key);
        for _ in 0..self.cfg.penetration_iterations {
            let Some(collision_box) = self.bodies.get(key).map(|b| b.collision_box) else { break };
            let mut moved = false;
            for other in self.collision.process_collide(collision_box) {
                let (Some(this), Some(that)) = (self.bodies.get(key).map(|b| b.state(key)), self.state_of_box(other))
                else {
                    continue;
                };
                let Some(sep) = separate(&this, &that, self.cfg.penetration_slop) else { continue };
                self.shift_body(this.owner, sep.this_offset);
                self.shift_body(that.owner, sep.other_offset);
                normals.push(sep.normal);
                moved = true;
            }
            if !moved {
                break;
            }
        }
        normals
    }

    /// Reflect the body's velocity about the averaged penetration normal,
    /// damped, when it is still moving into the surfaces.
    fn respond_to_penetration(&mut self, key: BodyKey, normals: &[Vec2]) {
        let n = normals.iter().copied().sum::<Vec2>().normalize_or_zero();
        let damping = self.cfg.penetration_damping;
        let Some(body) = self.bodies.get_mut(key) else { return };
        let vn = body.velocity.dot(n);
        if vn < 0.0 {
            body.velocity = (body.velocity - 2.0 * vn * n) * damping;
        }
    }

    /// Separate every overlapping pair, sweeping the whole population until a
    /// sweep finds nothing or `cfg.resolve_all_iterations` is reached. Each
    /// body-body pair is corrected once per sweep, from whichever side's
    /// layer filter reports it first.
    pub fn resolve_all_penetrations(&mut self) -> PenetrationReport {
        let keys: Vec<BodyKey> = self.bodies.keys().collect();
        let mut report = PenetrationReport::default();
        let mut found = 0;
        for _ in 0..self.cfg.resolve_all_iterations {
            report.passes += 1;
            found = 0;
            let mut seen: HashSet<(BodyKey, BodyKey)> = HashSet::new();
            for &key in &keys {
                let Some(collision_box) = self.bodies.get(key).map(|b| b.collision_box) else { continue };
                for other in self.collision.process_collide(collision_box) {
                    let Some(that) = self.state_of_box(other) else { continue };
                    if let Some(Owner::Physical(k)) = that.owner {
                        if !seen.insert((key.min(k), key.max(k))) {
                            continue;
                        }
                    }
                    let Some(this) = self.bodies.get(key).map(|b| b.state(key)) else { continue };
                    let Some(sep) = separate(&this, &that, self.cfg.penetration_slop) else { continue };
                    self.shift_body(this.owner, sep.this_offset);
                    self.shift_body(that.owner, sep.other_offset);
                    found += 1;
                }
            }
            report.corrections += found;
            if found == 0 {
                break;
            }
        }
        if found > 0 {
            debug!(passes = report.passes, "penetration sweep cap reached with overlaps left");
        }
        report
    }

    // Stepping --------------------------------------------------------------

    /// Advance one body by `dt` against a world that stands still: resolve
    /// overlaps, jump to the earliest contact, fire it, repeat with the
    /// remaining time. Bounded by `cfg.max_sub_steps`; time left over after
    /// the cap is dropped.
    pub fn advance_state(&mut self, key: BodyKey, dt: f32) {
        let mut remaining = dt;
        let mut steps = 0;
        let mut touched = TouchSet::new();
        while remaining > self.cfg.time_epsilon {
            if steps == self.cfg.max_sub_steps {
                debug!(?key, remaining, "sub-step cap reached, dropping remaining time");
                break;
            }
            steps += 1;
            if !self.bodies.contains_key(key) {
                return;
            }

            let normals = self.resolve_body_penetrations(key);
            self.respond_to_penetration(key, &normals);

            match self.earliest_impact(key, remaining, None, &touched) {
                Some(impact) => {
                    self.integrate_body(key, impact.toi);
                    self.fire_contact(key, &impact);
                    if impact.toi <= 0.0 {
                        touched.insert((key, impact.other));
                    }
                    remaining -= impact.toi;
                }
                None => {
                    self.integrate_body(key, remaining);
                    remaining = 0.0;
                }
            }
        }
    }

    /// Global earliest-event loop: every sub-step finds the soonest contact
    /// across all bodies (relative velocities), moves everyone to that time
    /// and resolves that single contact.
    fn step_global(&mut self, dt: f32, keys: &[BodyKey]) {
        for &key in keys {
            let normals = self.resolve_body_penetrations(key);
            self.respond_to_penetration(key, &normals);
        }
        let mut remaining = dt;
        let mut touched = TouchSet::new();
        for _ in 0..self.cfg.max_global_steps {
            if remaining <= self.cfg.time_epsilon {
                return;
            }
            let max_speed = keys
                .iter()
                .filter_map(|k| self.bodies.get(*k))
                .map(|b| b.velocity.length())
                .fold(0.0f32, f32::max);
            let margin = max_speed * remaining;

            let mut earliest: Option<(BodyKey, Impact)> = None;
            for &key in keys {
                let Some(impact) = self.earliest_impact(key, remaining, Some(margin), &touched) else { continue };
                if earliest.is_none_or(|(_, e)| impact.toi < e.toi) {
                    earliest = Some((key, impact));
                }
            }

            match earliest {
                Some((key, impact)) => {
                    if impact.toi > 0.0 {
                        for &k in keys {
                            self.integrate_body(k, impact.toi);
                        }
                    }
                    self.fire_contact(key, &impact);
                    if impact.toi <= 0.0 {
                        touched.insert((key, impact.other));
                    }
                    remaining -= impact.toi;
                }
                None => {
                    for &k in keys {
                        self.integrate_body(k, remaining);
                    }
                    return;
                }
            }
        }
        if remaining > self.cfg.time_epsilon {
            debug!(remaining, "global step cap reached, dropping remaining time");
        }
    }

    /// Advance the whole simulation by `dt` seconds, then sweep for residual
    /// penetration. Non-positive or non-finite `dt` is a no-op.
    #[instrument(skip(self))]
    pub fn on_update(&mut self, dt: f32) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        let start = self.cfg.enable_timing.then(Instant::now);
        self.tick_contacts = 0;

        let keys: Vec<BodyKey> = self.bodies.keys().collect();
        match self.cfg.step_mode {
            StepMode::Independent => {
                for &key in &keys {
                    self.advance_state(key, dt);
                }
            }
            StepMode::GlobalEarliest => self.step_global(dt, &keys),
        }
        let advanced = start.map(|t| t.elapsed());

        let report = self.resolve_all_penetrations();
        trace!(contacts = self.tick_contacts, corrections = report.corrections, "tick done");

        if let (Some(start), Some(advanced)) = (start, advanced) {
            let total = start.elapsed();
            self.last_timing = Some(StepTiming {
                total_ms: millis(total),
                advance_ms: millis(advanced),
                resolve_ms: millis(total.saturating_sub(advanced)),
                contacts: self.tick_contacts,
                corrections: report.corrections,
            });
        }
    }
}
