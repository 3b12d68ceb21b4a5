//! Config file loading tests.

use std::io::Write;

use orrery_core::config::{Config, ConfigError, ConfigVars, ProfilingMode};

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# startup").unwrap();
    writeln!(file, "engine.profiling = \"on\"").unwrap();
    writeln!(file, "engine.max_frames = 30").unwrap();

    let vars = ConfigVars::load(file.path()).unwrap();
    assert_eq!(vars.get_parsed::<u64>("engine.max_frames").unwrap(), Some(30));

    let config = Config::from_vars(&vars).unwrap();
    assert_eq!(config.profiling, ProfilingMode::On);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigVars::load(dir.path().join("missing.cfg")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_command_line_overrides_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "engine.max_frames = 30").unwrap();

    let mut vars = ConfigVars::load(file.path()).unwrap();
    vars.merge(ConfigVars::from_args(["engine.max_frames=5"]));

    assert_eq!(vars.get_or("engine.max_frames", 0u64).unwrap(), 5);
}

#[test]
fn test_load_sectioned_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[engine]").unwrap();
    writeln!(file, "max_frames = 30").unwrap();
    writeln!(file, "log_filter = \"info\"").unwrap();
    writeln!(file, "[time]").unwrap();
    writeln!(file, "fixed_timestep_ms = 16").unwrap();

    let vars = ConfigVars::load(file.path()).unwrap();
    assert_eq!(vars.get_parsed::<u64>("engine.max_frames").unwrap(), Some(30));
    assert_eq!(vars.get("time.fixed_timestep_ms"), Some("16"));

    let config = Config::from_vars(&vars).unwrap();
    assert_eq!(config.log_filter, "info");
}

#[test]
fn test_load_invalid_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[engine").unwrap();

    let err = ConfigVars::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
