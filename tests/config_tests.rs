use std::fs::{self, File};
use std::io::Write;

use mender::config::{AgentMode, ConfigProvider, MenderConfig, TomlConfigProvider};
use mender::errors::{ConfigError, MenderError};
use tempfile::TempDir;

/// Creates a temporary directory holding a `mender.toml` with the
/// given content
fn create_temp_config(content: &str) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("mender.toml");

    let mut file = File::create(&config_path).expect("Failed to create config file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config content");

    temp_dir
}

#[test]
fn test_default_config() {
    let default_config = MenderConfig::default();

    // Agent policy defaults
    assert_eq!(default_config.agent.agent_mode, AgentMode::Monitor);
    assert!(!default_config.agent.auto_commit);
    assert_eq!(default_config.agent.max_files, 10);
    assert!(default_config.agent.excluded_files.contains("node_modules"));
    assert!(default_config.agent.excluded_extensions.contains(".png"));

    // Boundary defaults
    assert_eq!(default_config.host.api_url, "https://api.github.com");
    assert_eq!(default_config.host.timeout_secs, 15);
    assert_eq!(default_config.ai.timeout_secs, 15);
    assert!(default_config.ai.api_key.is_none());
}

#[test]
fn test_load_toml_config() {
    let config_content = r#"
    [agent]
    agent_mode = "autofix"
    auto_commit = true
    max_files = 5
    excluded_files = ["vendor", "dist"]
    excluded_extensions = [".lock"]

    [host]
    api_url = "https://git.example.com/api/v3"
    timeout_secs = 30

    [ai]
    model = "gpt-4o"
    temperature = 0.1
    "#;

    let temp_dir = create_temp_config(config_content);

    let provider = TomlConfigProvider::new();
    let config = provider
        .load_config(temp_dir.path())
        .expect("Failed to load config");

    assert_eq!(config.agent.agent_mode, AgentMode::Autofix);
    assert!(config.agent.auto_commit);
    assert_eq!(config.agent.max_files, 5);
    assert!(config.agent.excluded_files.contains("vendor"));
    assert!(config.agent.excluded_extensions.contains(".lock"));

    assert_eq!(config.host.api_url, "https://git.example.com/api/v3");
    assert_eq!(config.host.timeout_secs, 30);

    // Unset AI fields keep their defaults
    assert_eq!(config.ai.model, "gpt-4o");
    assert_eq!(config.ai.api_url, "https://api.openai.com/v1/chat/completions");
}

#[test]
fn test_config_is_found_in_a_parent_directory() {
    let config_content = r#"
    [agent]
    agent_mode = "suggest"
    "#;

    let temp_dir = create_temp_config(config_content);
    let nested = temp_dir.path().join("src").join("deep");
    fs::create_dir_all(&nested).expect("Failed to create nested dirs");

    let provider = TomlConfigProvider::new();
    let config = provider.load_config(&nested).expect("Failed to load config");

    assert_eq!(config.agent.agent_mode, AgentMode::Suggest);
}

#[test]
fn test_partial_config_fills_in_defaults() {
    let temp_dir = create_temp_config("[agent]\nmax_files = 3\n");

    let provider = TomlConfigProvider::new();
    let config = provider
        .load_config(temp_dir.path())
        .expect("Failed to load config");

    assert_eq!(config.agent.max_files, 3);
    assert_eq!(config.agent.agent_mode, AgentMode::Monitor);
    assert!(config.agent.excluded_files.contains(".git"));
}

#[test]
fn test_invalid_max_files_is_rejected_at_load() {
    let temp_dir = create_temp_config("[agent]\nmax_files = 0\n");

    let provider = TomlConfigProvider::new();
    let result = provider.load_config(temp_dir.path());

    match result {
        Err(MenderError::Config(ConfigError::Invalid(message))) => {
            assert!(message.contains("max_files"));
        }
        other => panic!("expected invalid config error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_unparseable_config_is_a_parse_error() {
    let temp_dir = create_temp_config("[agent\nmax_files = ???\n");

    let provider = TomlConfigProvider::new();
    let result = provider.load_config(temp_dir.path());

    assert!(matches!(
        result,
        Err(MenderError::Config(ConfigError::ParseError(_)))
    ));
}

#[test]
fn test_explicit_config_path_bypasses_the_search() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("custom-name.toml");
    fs::write(&path, "[agent]\nagent_mode = \"autofix\"\n").expect("Failed to write config");

    let provider = TomlConfigProvider::with_path(path);
    let config = provider
        .load_config(temp_dir.path())
        .expect("Failed to load config");

    assert_eq!(config.agent.agent_mode, AgentMode::Autofix);
}

#[test]
fn test_missing_explicit_path_is_a_load_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("nope.toml");

    let provider = TomlConfigProvider::with_path(path.clone());
    let result = provider.load_config(temp_dir.path());

    match result {
        Err(MenderError::Config(ConfigError::LoadError { path: reported, .. })) => {
            assert_eq!(reported, path);
        }
        other => panic!("expected load error, got {:?}", other.map(|_| ())),
    }
}
