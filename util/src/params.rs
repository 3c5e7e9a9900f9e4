//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::PathBuf;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find the software root directory: {0}")]
    SwRootUnavailable(std::io::Error),

    #[error("Cannot load the parmeter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `$PID_SW_ROOT/params` directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError> 
where
    P: DeserializeOwned
{
    // Get the params dir
    let mut path = crate::host::get_pid_sw_root()
        .map_err(LoadError::SwRootUnavailable)?;
    path.push("params");
    path.push(param_file_path);

    // Load the file into a string
    let params_str = match read_to_string(&path) {
        Ok(s) => s,
        Err(e) => return Err(LoadError::FileLoadError(path, e))
    };

    from_str(params_str.as_str())
}

/// Parse a parameter struct from the contents of a parameter file.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestParams {
        endpoint: String,
        gain: f64
    }

    #[test]
    fn test_from_str() {
        let p: TestParams = from_str("endpoint = \"tcp://*:4567\"\ngain = 0.5\n").unwrap();
        assert_eq!(p, TestParams { endpoint: "tcp://*:4567".into(), gain: 0.5 });

        let e = from_str::<TestParams>("endpoint = 4");
        assert!(matches!(e, Err(LoadError::DeserialiseError(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let e = load::<TestParams>("this_file_does_not_exist.toml");
        assert!(matches!(e, Err(LoadError::FileLoadError(_, _))));
    }
}
