//! agentwatch daemon library.
//!
//! Exposes the daemon's modules for integration testing. In production the
//! `agentwatch` binary (main.rs) drives them.

pub mod cli;
pub mod logging;
pub mod orchestrator;
