//! # Communications interface crate.
//!
//! Provides the communications interfaces between the PID drive executable and
//! the simulator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telemetry and command frames exchanged with the simulator
pub mod tlm;

/// Network module
pub mod net;
