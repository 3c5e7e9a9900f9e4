//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the software root directory.
pub const SW_ROOT_ENV_VAR: &str = "PID_SW_ROOT";

/// Get the software root directory.
///
/// This is the value of `PID_SW_ROOT` if it is set, otherwise the current
/// working directory.
pub fn get_pid_sw_root() -> std::io::Result<PathBuf> {
    match std::env::var_os(SW_ROOT_ENV_VAR) {
        Some(r) => Ok(PathBuf::from(r)),
        None => std::env::current_dir()
    }
}
