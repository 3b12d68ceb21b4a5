//! Configuration for the Orrery engine.
//!
//! [`ConfigVars`] is the raw, ordered key/value bundle an application hands
//! to the engine at startup. [`Config`] is the handful of engine-level knobs
//! derived from it.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;

/// Errors produced while reading configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config document is not valid TOML.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value exists but could not be parsed into the requested type.
    #[error("Invalid value for '{key}': '{value}' is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// The config file could not be read.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered string key/value pairs.
///
/// Later insertions of the same key overwrite the value but keep the
/// position of the first insertion.
///
/// # Example
///
/// ```
/// use orrery_core::ConfigVars;
///
/// let vars = ConfigVars::from_pairs([("engine.max_frames", "120")]);
/// assert_eq!(vars.get_parsed::<u64>("engine.max_frames").unwrap(), Some(120));
/// assert_eq!(vars.get_or("time.max_delta_ms", 100u64).unwrap(), 100);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigVars {
    vars: IndexMap<String, String>,
}

impl ConfigVars {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bundle from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut vars = Self::new();
        for (key, value) in pairs {
            vars.set(key, value);
        }
        vars
    }

    /// Parse `key=value` command-line arguments.
    ///
    /// Arguments without an `=` are ignored so the process arguments can be
    /// passed through unfiltered.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vars = Self::new();
        for arg in args {
            if let Some((key, value)) = arg.as_ref().split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    vars.set(key, value.trim());
                }
            }
        }
        vars
    }

    /// Parse a TOML document. Tables flatten into dotted keys, so
    /// `[engine]` followed by `max_frames = 30` yields `engine.max_frames`.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(source)?;
        let mut vars = Self::new();
        vars.insert_table("", table);
        Ok(vars)
    }

    fn insert_table(&mut self, prefix: &str, table: toml::Table) {
        for (key, value) in table {
            let key = if prefix.is_empty() {
                key
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                toml::Value::Table(inner) => self.insert_table(&key, inner),
                toml::Value::String(text) => self.set(key, text),
                other => self.set(key, other.to_string()),
            }
        }
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let vars = Self::parse(&source)?;
        tracing::debug!(
            "Loaded {} config vars from {}",
            vars.len(),
            path.as_ref().display()
        );
        Ok(vars)
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Merge `other` into `self`; values from `other` win.
    pub fn merge(&mut self, other: ConfigVars) {
        self.vars.extend(other.vars);
    }

    /// Get the raw string value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Get a value parsed into `T`; `Ok(None)` if the key is absent.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.vars.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone(),
                    expected: std::any::type_name::<T>(),
                }),
        }
    }

    /// Get a value parsed into `T`, falling back to `default` if absent.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        Ok(self.get_parsed(key)?.unwrap_or(default))
    }

    /// Check if a key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Iterate over pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Engine-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub profiling: ProfilingMode,
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            profiling: ProfilingMode::Off,
            log_filter: crate::logging::DEFAULT_FILTER.to_string(),
        }
    }
}

impl Config {
    pub const PROFILING_KEY: &'static str = "engine.profiling";
    pub const LOG_FILTER_KEY: &'static str = "engine.log_filter";

    /// Read the engine knobs out of a var bundle, defaulting what is missing.
    pub fn from_vars(vars: &ConfigVars) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(mode) = vars.get_parsed::<ProfilingMode>(Self::PROFILING_KEY)? {
            config.profiling = mode;
        }
        if let Some(filter) = vars.get(Self::LOG_FILTER_KEY) {
            config.log_filter = filter.to_string();
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingMode {
    /// Profiling is disabled
    #[default]
    Off,
    /// Scopes are recorded in-process
    On,
    /// Scopes are recorded and served to external tools such as 'puffin_viewer'
    WithWebServer,
}

impl FromStr for ProfilingMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "false" | "0" => Ok(ProfilingMode::Off),
            "on" | "true" | "1" => Ok(ProfilingMode::On),
            "server" | "web" | "webserver" => Ok(ProfilingMode::WithWebServer),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ProfilingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfilingMode::Off => write!(f, "off"),
            ProfilingMode::On => write!(f, "on"),
            ProfilingMode::WithWebServer => write!(f, "server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args_skips_plain_arguments() {
        let vars = ConfigVars::from_args(["game", "engine.max_frames=10", "--verbose", "=x"]);
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("engine.max_frames"), Some("10"));
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut vars = ConfigVars::from_pairs([("a", "1"), ("b", "2")]);
        vars.set("a", "3");

        let pairs: Vec<_> = vars.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_parse_document() {
        let vars = ConfigVars::parse(
            "# comment\n\nengine.max_frames = 5\n\n[window]\ntitle = \"Demo\"\nvsync = true\n",
        )
        .unwrap();
        assert_eq!(vars.get("window.title"), Some("Demo"));
        assert_eq!(vars.get_parsed::<u32>("engine.max_frames").unwrap(), Some(5));
        assert_eq!(vars.get_parsed::<bool>("window.vsync").unwrap(), Some(true));
    }

    #[test]
    fn test_parse_flattens_nested_tables() {
        let vars = ConfigVars::parse("[time]\nscale = 0.5\n\n[render.shadows]\nsize = 2048\n").unwrap();

        let keys: Vec<_> = vars.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["time.scale", "render.shadows.size"]);
        assert_eq!(vars.get_parsed::<f32>("time.scale").unwrap(), Some(0.5));
        assert_eq!(vars.get("render.shadows.size"), Some("2048"));
    }

    #[test]
    fn test_parse_rejects_invalid_toml() {
        let err = ConfigVars::parse("ok = 1\nnot a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_get_parsed_invalid_value() {
        let vars = ConfigVars::from_pairs([("engine.max_frames", "lots")]);
        let err = vars.get_parsed::<u64>("engine.max_frames").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_get_or_default() {
        let vars = ConfigVars::new();
        assert_eq!(vars.get_or("missing", 7i32).unwrap(), 7);
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut base = ConfigVars::from_pairs([("a", "1"), ("b", "2")]);
        base.merge(ConfigVars::from_pairs([("b", "20"), ("c", "30")]));
        assert_eq!(base.get("b"), Some("20"));
        assert_eq!(base.get("c"), Some("30"));
        assert_eq!(base.len(), 3);
    }

    #[test]
    fn test_config_from_vars() {
        let vars = ConfigVars::from_pairs([
            (Config::PROFILING_KEY, "on"),
            (Config::LOG_FILTER_KEY, "warn"),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.profiling, ProfilingMode::On);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_vars(&ConfigVars::new()).unwrap();
        assert_eq!(config.profiling, ProfilingMode::Off);
        assert_eq!(config.log_filter, crate::logging::DEFAULT_FILTER);
    }
}
