//! Tests for layered configuration loading.

use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Project layout with a `.git` marker and a nested working directory.
fn project(temp: &TempDir) -> (PathBuf, PathBuf) {
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");
    (project_root, cwd)
}

fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = None;
    options.user_config_path = None;
    options.requirements_path = None;
    options
}

#[test]
fn parse_minimal_config() {
    let config = ScholarConfig::load_from_str("{}").expect("config");
    assert_eq!(config.memory.matching.prefix_chars, 30);
    assert_eq!(config.memory.recall.limit, 5);
    assert_eq!(config.memory.summary.message_window, 30);
    assert_eq!(
        config.memory.recall.default_query,
        "learning progress and important concepts"
    );
    assert_eq!(config.llm.provider, "google");
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = ScholarConfig::load_from_str("{ unexpected: true }").unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_wrong_field_type_with_path() {
    let err =
        ScholarConfig::load_from_str(r#"{ memory: { recall: { limit: "five" } } }"#).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("memory.recall.limit"), "{msg}");
}

#[test]
fn rejects_overlap_ratio_out_of_range() {
    let err = ScholarConfig::load_from_str("{ memory: { matching: { overlap_ratio: 1.5 } } }")
        .unwrap_err();
    assert!(matches!(err, ConfigError::OutOfRange { .. }));
}

#[test]
fn rejects_unsupported_llm_provider() {
    let err = ScholarConfig::load_from_str(r#"{ llm: { provider: "openai" } }"#).unwrap_err();
    assert!(format!("{err}").contains("llm.provider"));
}

#[test]
fn layered_config_prefers_repo_over_cwd() {
    let temp = TempDir::new().expect("tmp");
    let (project_root, cwd) = project(&temp);

    let user_config = temp.path().join("user.json5");
    write_json5(&user_config, "{ memory: { recall: { limit: 1 } } }");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ memory: { recall: { limit: 2 } } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ memory: { recall: { limit: 3 } } }",
    );
    write_json5(
        &project_root
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE),
        "{ memory: { recall: { limit: 4 } } }",
    );

    let mut options = isolated_options(&cwd);
    options.user_config_path = Some(user_config);

    let layered = ScholarConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.memory.recall.limit, 4);
    assert_eq!(layered.layers.len(), 4);
}

#[test]
fn requirements_lock_overrides() {
    let temp = TempDir::new().expect("tmp");
    let (_, cwd) = project(&temp);

    let requirements = temp.path().join("requirements.json5");
    write_json5(&requirements, "{ memory: { path: \"/srv/locked.db\" } }");
    let runtime = temp.path().join("runtime.json5");
    write_json5(
        &runtime,
        "{ memory: { path: \"/tmp/override.db\", recall: { limit: 2 } } }",
    );

    let mut options = isolated_options(&cwd).with_runtime_path(&runtime);
    options.requirements_path = Some(requirements);

    let layered = ScholarConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(
        layered.config.memory.path.as_deref(),
        Some("/srv/locked.db")
    );
    assert_eq!(layered.config.memory.recall.limit, 2);
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let (_, cwd) = project(&temp);
    let options = isolated_options(&cwd).with_runtime_path(temp.path().join("absent.json5"));
    let err = ScholarConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}
