//! # Workflows Module
//!
//! High-level entry points that run a complete design trial.
//!
//! ## Overview
//!
//! A trial takes one proposed parameter set from the optimizer and turns it into a
//! persisted result table plus a budget penalty. Trials are single-threaded and
//! synchronous: each phase finishes before the next starts, and any failure ends the
//! trial without retries.
//!
//! - **Trial Workflow** ([`trial`]) - Parameter validation, geometry construction,
//!   simulation, atomic persistence, scratch cleanup and penalty evaluation.

pub mod trial;
