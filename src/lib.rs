//! Clawclimb climbing locomotion library
//!
//! This module exposes the climbing state machine and the rapier-backed
//! world that hosts it, for the `climbsim` binary and for testing.

pub mod config;
pub mod game;
