pub mod config_cmd;
pub mod run;
pub mod send;
pub mod watch;

use std::path::Path;

use embody_config::{BodyConfig, ConfigError};

/// Load from an explicit path if one was given, the default location otherwise.
pub fn load_config(path: Option<&Path>) -> Result<BodyConfig, ConfigError> {
    match path {
        Some(path) => BodyConfig::load_with_env(path),
        None => BodyConfig::load(),
    }
}
