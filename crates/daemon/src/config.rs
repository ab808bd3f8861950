//! TOML service configuration.
//!
//! ```toml
//! listen = "127.0.0.1:3000"
//! max_age = 3600
//!
//! [store]
//! type = "filesystem"
//! options = { path = "$HOME/.keyval/data", hash_keys = "sha256" }
//! ```

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use store::DriverOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// When set, GET responses carry `Cache-Control: max-age=<n>`.
    #[serde(default)]
    pub max_age: Option<u32>,

    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Driver name resolved through the registry.
    #[serde(rename = "type")]
    pub driver: String,

    #[serde(default)]
    pub options: Option<toml::Value>,
}

fn default_listen() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_age: None,
            store: StoreConfig {
                driver: "memory".to_string(),
                options: None,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid store options: {0}")]
    Options(#[from] serde_json::Error),
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Store options normalized for the registry, with `$VAR`
    /// expansion applied to the `path` option. Drivers consume the
    /// path as an already-expanded string.
    pub fn driver_options(&self) -> Result<DriverOptions, ConfigError> {
        let value = match &self.store.options {
            None => return Ok(DriverOptions::None),
            Some(value) => value,
        };

        let mut json = serde_json::to_value(value)?;
        if let Some(path) = json.get_mut("path") {
            if let Some(text) = path.as_str() {
                *path = serde_json::Value::String(expand_env(text));
            }
        }
        Ok(DriverOptions::Value(json))
    }
}

/// Replace `$NAME` tokens with the named environment variable, or the
/// empty string when unset.
pub fn expand_env(input: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\$([a-zA-Z_][a-zA-Z0-9_]*)").unwrap());

    pattern
        .replace_all(input, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            listen = "0.0.0.0:8080"
            max_age = 600

            [store]
            type = "filesystem"
            options = { path = "/var/lib/keyval", hash_keys = "sha512" }
            "#,
        )
        .unwrap();

        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.max_age, Some(600));
        assert_eq!(config.store.driver, "filesystem");

        let options = config.driver_options().unwrap();
        let decoded: store::FilesystemOptions = options.decode().unwrap();
        assert_eq!(decoded.path, "/var/lib/keyval");
        assert_eq!(decoded.hash_keys, store::HashMode::Sha512);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("[store]\ntype = \"memory\"\n").unwrap();
        assert_eq!(config.listen, "127.0.0.1:3000");
        assert_eq!(config.max_age, None);
        assert!(matches!(
            config.driver_options().unwrap(),
            DriverOptions::None
        ));
    }

    #[test]
    fn test_expand_env() {
        std::env::set_var("KEYVAL_TEST_ROOT", "/srv/blobs");
        assert_eq!(expand_env("$KEYVAL_TEST_ROOT/data"), "/srv/blobs/data");
        assert_eq!(expand_env("$KEYVAL_UNSET_VAR/data"), "/data");
        assert_eq!(expand_env("/plain/path"), "/plain/path");
    }

    #[test]
    fn test_path_expansion_in_options() {
        std::env::set_var("KEYVAL_TEST_HOME", "/home/kv");
        let config: Config = toml::from_str(
            r#"
            [store]
            type = "filesystem"
            options = { path = "$KEYVAL_TEST_HOME/store" }
            "#,
        )
        .unwrap();

        let decoded: store::FilesystemOptions =
            config.driver_options().unwrap().decode().unwrap();
        assert_eq!(decoded.path, "/home/kv/store");
    }
}
