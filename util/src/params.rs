//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read the parameter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Could not deserialise the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file.
///
/// Parameter files are TOML files which map onto a `Deserialize` parameter
/// structure owned by the module being configured.
pub fn load<P, F>(param_file_path: F) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    F: AsRef<Path>,
{
    // Load the file into a string
    let params_str = read_to_string(param_file_path).map_err(LoadError::FileLoadError)?;

    // Parse the string into the parameter struct
    toml::from_str(params_str.as_str()).map_err(LoadError::DeserialiseError)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct TestParams {
        rate_hz: f64,
        name: String,
    }

    #[test]
    fn test_load() {
        let dir = std::env::temp_dir();
        let path = dir.join("util_params_test.toml");
        std::fs::write(&path, "rate_hz = 100.0\nname = \"loop\"\n").unwrap();

        let params: TestParams = load(&path).unwrap();
        assert_eq!(params.rate_hz, 100.0);
        assert_eq!(params.name, "loop");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let result: Result<TestParams, LoadError> = load("definitely_not_a_file.toml");
        assert!(matches!(result, Err(LoadError::FileLoadError(_))));
    }
}
