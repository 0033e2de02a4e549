//! Climbing character simulation on top of rapier.
//!
//! `climbing` holds the engine-agnostic climb state; everything else is the
//! engine side that hosts it: the physics world, the humanoid dispatcher
//! and the fixed-step tick pipeline.

pub mod animation;
pub mod climbing;
pub mod constants;
pub mod humanoid;
pub mod humanoid_movement;
pub mod physics;
pub mod simulation;

pub use humanoid::{Humanoid, HumanoidStateType, StateChange};
pub use physics::{PartShape, PhysicsWorld};
pub use simulation::{Simulation, TickReport};
