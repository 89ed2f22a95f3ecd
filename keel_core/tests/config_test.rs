// Orchestrator configuration loading
use keel_core::scheduling::OrchestratorConfig;
use keel_core::KeelError;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_standard_config() {
    let config = OrchestratorConfig::standard();

    assert_eq!(config.max_loop_time(), Duration::from_millis(4));
    assert_eq!(config.min_rewrite_interval(), Duration::from_secs(180));
    assert_eq!(config.watchdog_max_period(), Duration::from_millis(16_384));
    assert!(config.watchdog_enabled);
    assert!(!config.dual_context);
    assert_eq!(config.max_modules, 9);
    assert_eq!(config, OrchestratorConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = OrchestratorConfig::from_toml_str(
        r#"
        startup_delay_ms = 2500
        dual_context = true
        secondary_core = 1
        "#,
    )
    .unwrap();

    assert_eq!(config.startup_delay(), Duration::from_millis(2_500));
    assert!(config.dual_context);
    assert_eq!(config.secondary_core, Some(1));
    assert_eq!(config.min_rewrite_interval_ms, 180_000);
    assert_eq!(config.flash_config().min_rewrite_interval, Duration::from_secs(180));
}

#[test]
fn test_yaml_config() {
    let config = OrchestratorConfig::from_yaml_str(
        "watchdog_enabled: false\nwatchdog_max_period_ms: 0\nmax_modules: 4\n",
    )
    .unwrap();

    assert!(!config.watchdog_enabled);
    assert_eq!(config.max_modules, 4);
}

#[test]
fn test_invalid_values_rejected() {
    let result = OrchestratorConfig::from_toml_str("max_modules = 0");
    assert!(matches!(result, Err(KeelError::Config(_))));

    let result = OrchestratorConfig::from_toml_str("max_modules = 300");
    assert!(matches!(result, Err(KeelError::Config(_))));

    let result = OrchestratorConfig::from_toml_str("watchdog_max_period_ms = 0");
    assert!(matches!(result, Err(KeelError::Config(_))));
}

#[test]
fn test_malformed_input() {
    let result = OrchestratorConfig::from_toml_str("max_loop_time_us = \"fast\"");
    assert!(matches!(result, Err(KeelError::Toml(_))));

    let result = OrchestratorConfig::from_yaml_str("max_modules: [1, 2]");
    assert!(matches!(result, Err(KeelError::Yaml(_))));
}

#[test]
fn test_from_file_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let toml_path = dir.path().join("device.toml");
    let mut file = std::fs::File::create(&toml_path).unwrap();
    writeln!(file, "min_rewrite_interval_ms = 1000").unwrap();
    let config = OrchestratorConfig::from_file(&toml_path).unwrap();
    assert_eq!(config.min_rewrite_interval_ms, 1_000);

    let yaml_path = dir.path().join("device.yaml");
    std::fs::write(&yaml_path, "min_rewrite_interval_ms: 2000\n").unwrap();
    let config = OrchestratorConfig::from_file(&yaml_path).unwrap();
    assert_eq!(config.min_rewrite_interval_ms, 2_000);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = OrchestratorConfig::from_file(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(ref e) if e.is_fatal()));
}
