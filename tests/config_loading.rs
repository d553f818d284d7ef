use std::error::Error;
use std::path::PathBuf;

use assetdag::config::{PipelineConfig, load_and_validate, load_from_path, load_or_default};
use assetdag::errors::AssetdagError;
use assetdag::lint::LintRule;
use assetdag::types::{AssetClass, BuildMode};
use assetdag_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("Assetdag.toml");
    std::fs::write(&path, contents).expect("write config");
    path
}

fn expect_config_error(contents: &str, needle: &str) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(&dir, contents);

    match load_and_validate(&path) {
        Err(AssetdagError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "unexpected message: {msg}");
        }
        other => panic!("expected ConfigError containing '{needle}', got {other:?}"),
    }
}

#[test]
fn demo_config_loads_and_resolves_defaults() -> TestResult {
    init_tracing();

    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let cfg = load_and_validate(manifest.join("demos/site/Assetdag.toml"))?;

    assert_eq!(cfg.config.output_dir, "dist");
    assert_eq!(cfg.config.port, 3000);
    assert!(!cfg.config.desktop_notifications);

    assert_eq!(cfg.styles.out_dir, "dist/css");
    assert_eq!(cfg.scripts.out_dir, "dist/js");
    assert_eq!(cfg.markup.out_dir, "dist");
    assert_eq!(cfg.scripts.src, vec!["src/js/*.js".to_string()]);
    assert_eq!(cfg.scripts.watch, vec!["src/js/**/*.js".to_string()]);
    assert_eq!(cfg.styles.include_paths, vec!["src/styles".to_string()]);

    assert_eq!(cfg.lint_scripts.max_line_length, 120);
    assert!(cfg.lint_styles.rules.contains(&LintRule::NoImportant));

    Ok(())
}

#[test]
fn empty_file_yields_class_defaults() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, "");
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.config.output_dir, "dist");
    assert_eq!(cfg.config.debounce_ms, 200);
    assert_eq!(cfg.markup.src, vec!["src/templates/*.html".to_string()]);
    assert_eq!(cfg.markup.watch, vec!["src/templates/**/*.html".to_string()]);
    assert_eq!(cfg.assets.out_dir, "dist/assets");
    assert!(cfg.scripts.hard_fail);
    assert!(!cfg.styles.use_hash);

    Ok(())
}

#[test]
fn explicit_src_without_watch_watches_the_entries() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = write_config(
        &dir,
        r#"
[styles]
src = ["web/css/site.css"]
"#,
    );
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.styles.watch, vec!["web/css/site.css".to_string()]);
    assert_eq!(cfg.styles.include_paths, vec!["src/styles".to_string()]);

    Ok(())
}

#[test]
fn missing_default_file_falls_back_to_defaults() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let cfg = load_or_default(dir.path().join("Assetdag.toml"), false)?;

    assert_eq!(cfg.config.output_dir, "dist");
    assert_eq!(cfg.lint_scripts.rules.len(), 3);

    Ok(())
}

#[test]
fn missing_explicit_file_is_an_error() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let result = load_or_default(dir.path().join("nope.toml"), true);

    assert!(matches!(result, Err(AssetdagError::IoError(_))));
}

#[test]
fn unknown_keys_are_rejected_by_the_parser() {
    init_tracing();

    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
[config]
outptu_dir = "dist"
"#,
    );

    assert!(matches!(load_from_path(&path), Err(AssetdagError::TomlError(_))));
}

#[test]
fn unknown_lint_rule_is_rejected() {
    expect_config_error(
        r#"
[lint.scripts]
rules = ["no-debugger", "no-semicolons"]
"#,
        "[lint.scripts].rules",
    );
}

#[test]
fn output_dir_must_stay_inside_the_project() {
    expect_config_error("[config]\noutput_dir = \"../public\"\n", "relative path");
    expect_config_error("[config]\noutput_dir = \"/tmp/out\"\n", "relative path");
    expect_config_error("[config]\noutput_dir = \".\"\n", "sub-directory");
}

#[test]
fn dotted_output_dir_is_normalized() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = write_config(
        &dir,
        "[config]\noutput_dir = \"./dist/\"\n\n[scripts]\nout_dir = \"./dist/./scripts\"\n",
    );
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.config.output_dir, "dist");
    assert_eq!(cfg.styles.out_dir, "dist/css");
    assert_eq!(cfg.scripts.out_dir, "dist/scripts");
    assert_eq!(cfg.markup.out_dir, "dist");

    let pipeline = PipelineConfig::new(cfg, BuildMode::Development, dir.path(), None)?;
    assert_eq!(pipeline.output_dir(), std::path::Path::new("dist"));

    Ok(())
}

#[test]
fn debounce_out_of_range_is_rejected() {
    expect_config_error("[config]\ndebounce_ms = 0\n", "debounce_ms");
    expect_config_error("[config]\ndebounce_ms = 60000\n", "debounce_ms");
}

#[test]
fn invalid_host_is_rejected() {
    expect_config_error("[config]\nhost = \"localhost:80\"\n", "host");
}

#[test]
fn out_dir_outside_output_dir_is_rejected() {
    expect_config_error(
        r#"
[scripts]
out_dir = "public/js"
"#,
        "must be inside",
    );
}

#[test]
fn shared_out_dir_is_rejected() {
    expect_config_error(
        r#"
[styles]
out_dir = "dist/static"

[scripts]
out_dir = "dist/static"
"#,
        "shared with another asset class",
    );
}

#[test]
fn invalid_glob_is_rejected() {
    expect_config_error(
        r#"
[assets]
src = ["src/assets/[*"]
"#,
        "invalid glob pattern",
    );
}

#[test]
fn postprocess_cmd_is_styles_only() {
    expect_config_error(
        r#"
[scripts]
postprocess_cmd = "cat"
"#,
        "postprocess_cmd",
    );
}

#[test]
fn zero_max_line_length_is_rejected() {
    expect_config_error(
        r#"
[lint.scripts]
max_line_length = 0
"#,
        "max_line_length",
    );
}

#[test]
fn port_override_replaces_configured_port() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = write_config(&dir, "[config]\nport = 8080\n");
    let cfg = load_and_validate(&path)?;

    let pipeline = PipelineConfig::new(cfg.clone(), BuildMode::Production, dir.path(), Some(4000))?;
    assert_eq!(pipeline.server_addr().port(), 4000);
    assert_eq!(pipeline.mode(), BuildMode::Production);
    assert_eq!(pipeline.output_path(), dir.path().join("dist"));

    let pipeline = PipelineConfig::new(cfg, BuildMode::Development, dir.path(), None)?;
    assert_eq!(pipeline.server_addr().port(), 8080);
    assert!(pipeline.lint(AssetClass::Markup).is_none());
    assert!(pipeline.describe().contains("[styles]"));

    Ok(())
}
