use core::fmt;

use glam::Vec2;
use slotmap::SlotMap;
use tracing::trace;

use crate::api::{NarrowphaseApi, SpatialIndex};
use crate::config::PhysicsConfig;
use crate::error::CollideError;
use crate::narrowphase::Narrowphase;
use crate::quadtree::QuadTree;
use crate::types::*;

/// Contact hook: maps a contact snapshot to new velocities/offsets.
/// Hooks read only their arguments; the caller applies the response.
pub type ContactHook = Box<dyn Fn(&Contact, &PhysicsConfig) -> ContactResponse>;

/// Collidable shape owned by a [`CollisionWorld`].
pub struct CollisionBox {
    rect: Rect,
    src: CollisionLayer,
    dst: LayerSet,
    enable: bool,
    owner: Option<Owner>,
    callback: Option<ContactHook>,
}

impl Default for CollisionBox {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            src: CollisionLayer::None,
            dst: LayerSet::EMPTY,
            enable: true,
            owner: None,
            callback: None,
        }
    }
}

impl fmt::Debug for CollisionBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionBox")
            .field("rect", &self.rect)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("enable", &self.enable)
            .field("owner", &self.owner)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl CollisionBox {
    pub fn rect(&self) -> Rect { self.rect }
    pub fn src(&self) -> CollisionLayer { self.src }
    pub fn dst(&self) -> LayerSet { self.dst }
    pub fn enabled(&self) -> bool { self.enable }
    pub fn owner(&self) -> Option<Owner> { self.owner }
    pub fn callback(&self) -> Option<&ContactHook> { self.callback.as_ref() }
    pub fn has_dst(&self, layer: CollisionLayer) -> bool { self.dst.contains(layer) }

    /// Passive or disabled boxes never initiate collision checks.
    fn initiates(&self) -> bool {
        self.enable && self.src != CollisionLayer::None && !self.dst.is_empty()
    }

    /// Whether `other` passes this box's layer filter.
    pub fn accepts(&self, other: &CollisionBox) -> bool {
        other.enable && other.src != CollisionLayer::None && self.dst.contains(other.src)
    }
}

/// Registry of collision boxes plus the spatial index over them.
pub struct CollisionWorld {
    boxes: SlotMap<BoxKey, CollisionBox>,
    index: QuadTree<BoxKey>,
}

impl CollisionWorld {
    pub fn new(bounds: Rect) -> Self {
        Self { boxes: SlotMap::with_key(), index: QuadTree::new(bounds) }
    }

    /// Root boundary of the spatial index.
    pub fn bounds(&self) -> Rect {
        self.index.bounds()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoxKey, &CollisionBox)> {
        self.boxes.iter()
    }

    pub fn get(&self, key: BoxKey) -> Option<&CollisionBox> {
        self.boxes.get(key)
    }

    pub fn contains(&self, key: BoxKey) -> bool {
        self.boxes.contains_key(key)
    }

    /// Whether the box is currently reachable through the spatial index.
    pub fn is_indexed(&self, key: BoxKey) -> bool {
        self.index.contains(key)
    }

    /// `(indexed boxes, quadtree nodes)`.
    pub fn index_stats(&self) -> (usize, usize) {
        (self.index.len(), self.index.node_count())
    }

    /// Register a new box with the default rect and index it.
    pub fn create_box(&mut self) -> BoxKey {
        self.create_box_with(CollisionLayer::None, LayerSet::EMPTY, None, None)
    }

    /// Register a fully described box (default rect) and index it.
    pub fn create_box_with(
        &mut self,
        src: CollisionLayer,
        dst: LayerSet,
        owner: Option<Owner>,
        callback: Option<ContactHook>,
    ) -> BoxKey {
        let key = self.boxes.insert(CollisionBox { src, dst, owner, callback, ..CollisionBox::default() });
        let indexed = self.index.insert(Rect::default(), key);
        trace!(?key, ?src, indexed, "collision box created");
        key
    }

    /// Unindex and drop a box. Destroying a stale key is reported, not fatal.
    pub fn destroy_box(&mut self, key: BoxKey) -> Result<(), CollideError> {
        self.boxes.remove(key).ok_or(CollideError::StaleBox)?;
        self.index.remove(key);
        trace!(?key, "collision box destroyed");
        Ok(())
    }

    /// Drop every box.
    pub fn clear(&mut self) {
        self.boxes.clear();
        self.index.clear();
    }

    fn box_mut(&mut self, key: BoxKey) -> Result<&mut CollisionBox, CollideError> {
        self.boxes.get_mut(key).ok_or(CollideError::StaleBox)
    }

    /// Store the rect and move the index entry. Out-of-bounds rects are kept
    /// on the box but leave it unindexed.
    pub fn set_rect(&mut self, key: BoxKey, rect: Rect) -> Result<(), CollideError> {
        self.box_mut(key)?.rect = rect;
        if self.index.update(rect, key) { Ok(()) } else { Err(CollideError::OutOfBounds) }
    }

    pub fn set_src(&mut self, key: BoxKey, layer: CollisionLayer) -> Result<(), CollideError> {
        self.box_mut(key)?.src = layer;
        Ok(())
    }

    pub fn set_dst(&mut self, key: BoxKey, layers: LayerSet) -> Result<(), CollideError> {
        self.box_mut(key)?.dst = layers;
        Ok(())
    }

    pub fn add_dst(&mut self, key: BoxKey, layer: CollisionLayer) -> Result<(), CollideError> {
        self.box_mut(key)?.dst.insert(layer);
        Ok(())
    }

    pub fn remove_dst(&mut self, key: BoxKey, layer: CollisionLayer) -> Result<(), CollideError> {
        self.box_mut(key)?.dst.remove(layer);
        Ok(())
    }

    pub fn set_enable(&mut self, key: BoxKey, enable: bool) -> Result<(), CollideError> {
        self.box_mut(key)?.enable = enable;
        Ok(())
    }

    pub fn set_owner(&mut self, key: BoxKey, owner: Option<Owner>) -> Result<(), CollideError> {
        self.box_mut(key)?.owner = owner;
        Ok(())
    }

    /// Install (or replace) the box's single contact hook. The registry never
    /// fires it; callers do, after confirming a contact.
    pub fn on_collide(&mut self, key: BoxKey, hook: ContactHook) -> Result<(), CollideError> {
        self.box_mut(key)?.callback = Some(hook);
        Ok(())
    }

    pub fn clear_callback(&mut self, key: BoxKey) -> Result<(), CollideError> {
        self.box_mut(key)?.callback = None;
        Ok(())
    }

    /// Raw broad-phase query: every indexed box whose rect intersects `rect`.
    pub fn query(&self, rect: &Rect) -> Vec<BoxKey> {
        self.index.query(rect)
    }

    /// Boxes matched by `key`'s layer filter around its current rect.
    pub fn process_collide(&self, key: BoxKey) -> Vec<BoxKey> {
        match self.boxes.get(key) {
            Some(b) => self.process_collide_in(key, b.rect),
            None => Vec::new(),
        }
    }

    /// Same filtering as [`CollisionWorld::process_collide`] over an arbitrary
    /// query rect (e.g. a motion AABB). Results are sorted by key.
    pub fn process_collide_in(&self, key: BoxKey, rect: Rect) -> Vec<BoxKey> {
        let Some(this) = self.boxes.get(key) else {
            return Vec::new();
        };
        if !this.initiates() {
            return Vec::new();
        }
        let mut out: Vec<BoxKey> = self
            .index
            .query(&rect)
            .into_iter()
            .filter(|&other| other != key)
            .filter(|&other| self.boxes.get(other).is_some_and(|b| this.accepts(b)))
            .collect();
        out.sort_unstable();
        out
    }

    /// Closest enabled box with `src` in `layers` hit by `origin + t * dir`,
    /// `0 <= t <= max_t`.
    pub fn raycast(&self, origin: Vec2, dir: Vec2, max_t: f32, layers: LayerSet) -> Option<(BoxKey, SweepHit)> {
        if dir.length_squared() == 0.0 || max_t < 0.0 {
            return None;
        }
        let reach = Rect::from_min_max(origin, origin + dir * max_t);
        let mut best: Option<(BoxKey, SweepHit)> = None;
        for key in self.index.query(&reach) {
            let Some(b) = self.boxes.get(key) else { continue };
            if !b.enable || !layers.contains(b.src) {
                continue;
            }
            let Some(hit) = Narrowphase::ray_aabb(origin, dir, b.rect.min(), b.rect.max()) else { continue };
            if hit.toi > max_t {
                continue;
            }
            match best {
                Some((_, bh)) if hit.toi >= bh.toi => {}
                _ => best = Some((key, hit)),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> CollisionWorld {
        CollisionWorld::new(Rect::new(0.0, 0.0, 1000.0, 1000.0))
    }

    fn make(w: &mut CollisionWorld, rect: Rect, src: CollisionLayer, dst: &[CollisionLayer]) -> BoxKey {
        let k = w.create_box();
        w.set_rect(k, rect).unwrap();
        w.set_src(k, src).unwrap();
        w.set_dst(k, LayerSet::of(dst)).unwrap();
        k
    }

    #[test]
    fn test_create_and_destroy() {
        let mut w = world();
        let k = w.create_box();
        assert_eq!(w.len(), 1);
        assert!(w.is_indexed(k));
        assert!(w.get(k).unwrap().enabled());
        assert!(w.destroy_box(k).is_ok());
        assert!(!w.is_indexed(k));
        assert_eq!(w.destroy_box(k), Err(CollideError::StaleBox));
        assert_eq!(w.set_rect(k, Rect::new(1.0, 1.0, 1.0, 1.0)), Err(CollideError::StaleBox));
        assert!(w.process_collide(k).is_empty());
        assert!(w.is_empty());
    }

    #[test]
    fn test_set_rect_moves_index_entry() {
        let mut w = world();
        let k = w.create_box();
        w.set_rect(k, Rect::new(100.0, 100.0, 10.0, 10.0)).unwrap();
        assert_eq!(w.query(&Rect::new(100.0, 100.0, 1.0, 1.0)), vec![k]);
        w.set_rect(k, Rect::new(500.0, 500.0, 10.0, 10.0)).unwrap();
        assert!(w.query(&Rect::new(100.0, 100.0, 1.0, 1.0)).is_empty());
        assert_eq!(w.get(k).unwrap().rect(), Rect::new(500.0, 500.0, 10.0, 10.0));
    }

    #[test]
    fn test_out_of_bounds_rect_unindexes() {
        let mut w = world();
        let k = w.create_box();
        let far = Rect::new(2000.0, 0.0, 10.0, 10.0);
        assert_eq!(w.set_rect(k, far), Err(CollideError::OutOfBounds));
        assert_eq!(w.get(k).unwrap().rect(), far);
        assert!(!w.is_indexed(k));
        assert!(w.query(&far).is_empty());
    }

    #[test]
    fn test_layer_filtering() {
        let mut w = world();
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        let a = make(&mut w, r, CollisionLayer::Physics, &[CollisionLayer::Physics]);
        let wall = make(&mut w, r, CollisionLayer::Obstacle, &[]);
        assert!(w.process_collide(a).is_empty());
        w.add_dst(a, CollisionLayer::Obstacle).unwrap();
        assert_eq!(w.process_collide(a), vec![wall]);
        w.remove_dst(a, CollisionLayer::Obstacle).unwrap();
        assert!(w.process_collide(a).is_empty());
    }

    #[test]
    fn test_passive_boxes_do_not_initiate() {
        let mut w = world();
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        let a = make(&mut w, r, CollisionLayer::Physics, &[CollisionLayer::Physics]);
        let wall = make(&mut w, r, CollisionLayer::Obstacle, &[]);
        let untagged = make(&mut w, r, CollisionLayer::None, &[CollisionLayer::Physics]);
        // Empty dst or None src: no self-initiated checks.
        assert!(w.process_collide(wall).is_empty());
        assert!(w.process_collide(untagged).is_empty());
        // None-src boxes are never matched.
        w.add_dst(a, CollisionLayer::None).unwrap();
        assert!(w.process_collide(a).is_empty());
    }

    #[test]
    fn test_disabled_boxes_excluded_both_ways() {
        let mut w = world();
        let r = Rect::new(10.0, 10.0, 20.0, 20.0);
        let a = make(&mut w, r, CollisionLayer::Physics, &[CollisionLayer::Physics]);
        let b = make(&mut w, r, CollisionLayer::Physics, &[CollisionLayer::Physics]);
        assert_eq!(w.process_collide(a), vec![b]);
        w.set_enable(b, false).unwrap();
        assert!(w.process_collide(a).is_empty());
        assert!(w.process_collide(b).is_empty());
        w.set_enable(b, true).unwrap();
        w.set_enable(a, false).unwrap();
        assert!(w.process_collide(a).is_empty());
        assert!(w.process_collide(b).is_empty());
    }

    #[test]
    fn test_process_collide_in_uses_query_rect() {
        let mut w = world();
        let a = make(&mut w, Rect::new(0.0, 0.0, 10.0, 10.0), CollisionLayer::Physics, &[CollisionLayer::Obstacle]);
        let wall = make(&mut w, Rect::new(100.0, 0.0, 10.0, 10.0), CollisionLayer::Obstacle, &[]);
        assert!(w.process_collide(a).is_empty());
        assert_eq!(w.process_collide_in(a, Rect::new(0.0, 0.0, 120.0, 10.0)), vec![wall]);
    }

    #[test]
    fn test_on_collide_replaces_hook() {
        let mut w = world();
        let k = w.create_box();
        assert!(w.get(k).unwrap().callback().is_none());
        w.on_collide(k, Box::new(|c: &Contact, _: &PhysicsConfig| ContactResponse::unchanged(c))).unwrap();
        w.on_collide(
            k,
            Box::new(|c: &Contact, _: &PhysicsConfig| ContactResponse { this_velocity: Vec2::ONE, ..ContactResponse::unchanged(c) }),
        )
        .unwrap();
        let contact = Contact {
            this_box: k,
            other_box: k,
            this: BodyState { owner: None, rect: Rect::default(), velocity: Vec2::ZERO, mass: 1.0 },
            other: BodyState { owner: None, rect: Rect::default(), velocity: Vec2::ZERO, mass: 1.0 },
            normal: Vec2::X,
        };
        let hook = w.get(k).unwrap().callback().unwrap();
        assert_eq!(hook(&contact, &PhysicsConfig::default()).this_velocity, Vec2::ONE);
        w.clear_callback(k).unwrap();
        assert!(w.get(k).unwrap().callback().is_none());
    }

    #[test]
    fn test_raycast_hits_closest() {
        let mut w = world();
        let layers = LayerSet::of(&[CollisionLayer::Obstacle]);
        let near = make(&mut w, Rect::new(20.0, 0.0, 5.0, 10.0), CollisionLayer::Obstacle, &[]);
        let _far = make(&mut w, Rect::new(40.0, 0.0, 5.0, 10.0), CollisionLayer::Obstacle, &[]);
        let origin = Vec2::new(1.0, 5.0);
        let (k, hit) = w.raycast(origin, Vec2::X, 100.0, layers).unwrap();
        assert_eq!(k, near);
        assert!((hit.toi - 19.0).abs() < 1e-5);
        assert!(w.raycast(origin, -Vec2::X, 100.0, layers).is_none());
        assert!(w.raycast(origin, Vec2::X, 10.0, layers).is_none());
        assert!(w.raycast(origin, Vec2::X, 100.0, LayerSet::of(&[CollisionLayer::Enemy])).is_none());
    }
}
