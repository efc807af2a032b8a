//! Framework configuration.
//!
//! Configuration is read from TOML or JSON. `${VAR}` placeholders are
//! expanded from the environment before the document is parsed.
//!
//! ```toml
//! query_paths = ["app/operations"]
//! fixture_path = "test/fixtures/graphql"
//!
//! [endpoints.github]
//! url = "https://api.github.com/graphql"
//! adapter = "persistent_http"
//! timeout = 10
//! pool_size = 25
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointConfig;
use crate::error::{Error, Result};

/// Top-level configuration for a [`Switchyard`](crate::Switchyard) hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchyardConfig {
    /// Roots searched for `<service>/<operation>.graphql` files.
    pub query_paths: Vec<PathBuf>,
    /// Root of the test fixture tree.
    pub fixture_path: Option<PathBuf>,
    /// Accept `_name.graphql` for operation names ending in `_fragment`.
    pub fragment_files: bool,
    /// Log schema-load warnings at debug level instead.
    pub suppress_warnings_on_schema_load: bool,
    /// Endpoints keyed by service name.
    pub endpoints: BTreeMap<String, EndpointConfig>,
}

impl SwitchyardConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let expanded = expand_env_vars(source)?;
        toml::from_str(&expanded).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let expanded = expand_env_vars(source)?;
        serde_json::from_str(&expanded).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            Some("json") => Self::from_json_str(&source),
            _ => {
                return Err(Error::Configuration(format!(
                    "unsupported configuration format: {}",
                    path.display()
                )));
            }
        }?;

        tracing::debug!(
            target: "switchyard::config",
            path = %path.display(),
            endpoints = config.endpoints.len(),
            "loaded configuration"
        );
        Ok(config)
    }
}

fn env_var_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$(\$)?\{([A-Za-z_][A-Za-z0-9_]*)\}"))
        .as_ref()
        .map_err(|e| Error::Configuration(e.to_string()))
}

/// Replace `${VAR}` with the value of the environment variable `VAR`.
///
/// An unset variable is a configuration error. `$${VAR}` is kept as the
/// literal text `${VAR}`.
pub(crate) fn expand_env_vars(input: &str) -> Result<String> {
    let mut result = String::with_capacity(input.len());
    let mut last = 0;

    for caps in env_var_pattern()?.captures_iter(input) {
        let Some(full_match) = caps.get(0) else {
            continue;
        };
        let var_name = &caps[2];
        result.push_str(&input[last..full_match.start()]);
        last = full_match.end();

        if caps.get(1).is_some() {
            result.push_str(&full_match.as_str()[1..]);
            continue;
        }
        let value = std::env::var(var_name).map_err(|_| {
            Error::Configuration(format!("environment variable `{var_name}` is not set"))
        })?;
        result.push_str(&value);
    }

    result.push_str(&input[last..]);
    Ok(result)
}
