//! # Engine Module
//!
//! The stateful side of a design trial: everything that talks to a simulation engine.
//!
//! ## Overview
//!
//! A simulation engine holds exactly one active geometry at a time. This module models
//! that engine as an explicit resource: the [`session::SimulationEngine`] trait describes
//! the engine boundary, and an [`session::EngineSession`] is the scoped handle that
//! initializes the engine for one geometry, runs batches against it, and resets it when
//! dropped. Because a session mutably borrows its engine, two geometries can never be
//! active in the same engine instance.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Run configuration, particle categories and the energy range
//! - **Engine Boundary** ([`session`]) - The engine trait and the scoped session handle
//! - **Batch Runner** ([`batch`]) - Labeled per-category batches aggregated into one result table
//! - **Shower Engine** ([`shower`]) - Built-in parametric longitudinal shower simulation
//! - **Scratch Files** ([`scratch`]) - Engine scratch directories and their purge between trials
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Engine failures are fatal to the current trial and are never retried here.

pub mod batch;
pub mod config;
pub mod error;
pub mod progress;
pub mod scratch;
pub mod session;
pub mod shower;
