//! # PID drive library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the PID drive executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command line interface - gain overrides and startup options
pub mod cli;

/// Frame dispatch - routes simulator frames to drive control
pub mod dispatch;

/// Drive control module - steering and throttle from cross track and speed errors
pub mod drive_ctrl;

/// Executable parameters
pub mod params;

/// PID controller
pub mod pid;

/// Telemetry server - recieves frames from the simulator bridge and sends replies
pub mod tlm_server;
