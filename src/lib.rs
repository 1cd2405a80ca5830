//! sweepbonk: 2D AABB physics with a quadtree broad phase, layer-filtered
//! collision boxes and continuous (swept) collision response.

pub mod types;
pub mod api;
pub mod error;
pub mod config;
pub mod narrowphase;
pub mod quadtree;
pub mod collision;
pub mod body;
pub mod world;
pub mod movement;

pub use glam::Vec2;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::error::CollideError;
pub use crate::config::{PhysicsConfig, StepMode};
pub use crate::narrowphase::Narrowphase;
pub use crate::quadtree::QuadTree;
pub use crate::collision::{CollisionBox, CollisionWorld, ContactHook};
pub use crate::body::{default_contact_response, ObstacleObject, PhysicalObject};
pub use crate::world::{Impact, PhysicsManager};
pub use crate::movement::{MovementController, MovementMode};
