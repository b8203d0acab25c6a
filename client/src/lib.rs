//! # Combat Client Library
//!
//! Client-side implementation for the multiplayer shooter's combat core:
//! an observer/requester that never mutates combat state itself.
//!
//! ## Architecture Overview
//!
//! ### Requests, Not Commands
//! Everything the client wants — firing, reloading, respawning, abilities —
//! goes to the authority as a request. The authority re-validates each one
//! against its own state, so a stale or modified client cannot push the
//! simulation anywhere it should not go.
//!
//! ### Cosmetic Prediction
//! For zero-latency feedback the client predicts its own ammo counter,
//! fire cooldown and tracer before the authoritative confirmation arrives.
//! Predictions carry no damage authority and are overwritten by every
//! server snapshot.
//!
//! ### Ordered Event Consumption
//! Combat events (damage, deaths, projectile spawns, respawn countdowns)
//! arrive in batches tagged with a monotonically increasing sequence;
//! duplicates and stale batches are dropped so a death is never observed
//! after the respawn it preceded.
//!
//! ## Module Organization
//!
//! - [`game`]: confirmed snapshot state plus the local predictions
//! - [`input`]: the scripted demo pilot that produces intents
//! - [`network`]: UDP connection and the request/receive loop

pub mod game;
pub mod input;
pub mod network;
