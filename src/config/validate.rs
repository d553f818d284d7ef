// src/config/validate.rs

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Component, Path};

use globset::Glob;

use crate::config::model::{
    AssetSettings, ConfigFile, ConfigSection, LintSection, LintSettings, RawConfigFile,
};
use crate::errors::{AssetdagError, Result};
use crate::lint::LintRule;
use crate::types::AssetClass;
use crate::watch::path_utils::normalize_relative;

const DEBOUNCE_RANGE_MS: std::ops::RangeInclusive<u64> = 10..=5000;
const DEFAULT_MAX_LINE_LENGTH: usize = 120;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw.config)?;
        raw.config.output_dir = normalize_relative(&raw.config.output_dir);

        let output_dir = raw.config.output_dir.as_str();
        let mut markup = raw.markup.resolve(AssetClass::Markup, output_dir);
        let mut styles = raw.styles.resolve(AssetClass::Styles, output_dir);
        let mut scripts = raw.scripts.resolve(AssetClass::Scripts, output_dir);
        let mut assets = raw.assets.resolve(AssetClass::Assets, output_dir);
        for settings in [&mut markup, &mut styles, &mut scripts, &mut assets] {
            settings.out_dir = normalize_relative(&settings.out_dir);
        }

        for settings in [&markup, &styles, &scripts, &assets] {
            validate_asset_settings(settings, output_dir)?;
        }
        validate_disjoint_out_dirs(&[&styles, &scripts, &assets], output_dir)?;

        let lint_scripts = resolve_lint(&raw.lint.scripts, AssetClass::Scripts)?;
        let lint_styles = resolve_lint(&raw.lint.styles, AssetClass::Styles)?;

        Ok(ConfigFile {
            config: raw.config,
            markup,
            styles,
            scripts,
            assets,
            lint_scripts,
            lint_styles,
        })
    }
}

fn validate_global_config(cfg: &ConfigSection) -> Result<()> {
    ensure_safe_output_dir(&cfg.output_dir)?;

    if !DEBOUNCE_RANGE_MS.contains(&cfg.debounce_ms) {
        return Err(AssetdagError::ConfigError(format!(
            "[config].debounce_ms must be within {}..={} (got {})",
            DEBOUNCE_RANGE_MS.start(),
            DEBOUNCE_RANGE_MS.end(),
            cfg.debounce_ms
        )));
    }

    let addr = format!("{}:{}", cfg.host, cfg.port);
    if addr.parse::<SocketAddr>().is_err() {
        return Err(AssetdagError::ConfigError(format!(
            "[config].host '{}' is not a valid IP address",
            cfg.host
        )));
    }

    Ok(())
}

/// `clean` deletes the output directory recursively, so it has to stay a
/// plain relative path inside the project.
fn ensure_safe_output_dir(dir: &str) -> Result<()> {
    let path = Path::new(dir);
    let mut normal_parts = 0;

    for component in path.components() {
        match component {
            Component::Normal(_) => normal_parts += 1,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AssetdagError::ConfigError(format!(
                    "[config].output_dir '{dir}' must be a relative path inside the project"
                )));
            }
        }
    }

    if normal_parts == 0 {
        return Err(AssetdagError::ConfigError(format!(
            "[config].output_dir '{dir}' must name a sub-directory of the project"
        )));
    }

    Ok(())
}

fn validate_asset_settings(settings: &AssetSettings, output_dir: &str) -> Result<()> {
    let section = settings.class.name();

    if settings.src.is_empty() {
        return Err(AssetdagError::ConfigError(format!(
            "[{section}].src must contain at least one pattern"
        )));
    }

    for pattern in settings
        .src
        .iter()
        .chain(settings.watch.iter())
        .chain(settings.exclude.iter())
    {
        if let Err(err) = Glob::new(pattern) {
            return Err(AssetdagError::ConfigError(format!(
                "[{section}] has invalid glob pattern '{pattern}': {err}"
            )));
        }
    }

    if settings.postprocess_cmd.is_some() && settings.class != AssetClass::Styles {
        return Err(AssetdagError::ConfigError(format!(
            "[{section}].postprocess_cmd is only supported for [styles]"
        )));
    }

    if !Path::new(&settings.out_dir).starts_with(output_dir) {
        return Err(AssetdagError::ConfigError(format!(
            "[{section}].out_dir '{}' must be inside [config].output_dir '{output_dir}'",
            settings.out_dir
        )));
    }

    Ok(())
}

/// Classes that run in parallel must not share an output directory.
fn validate_disjoint_out_dirs(settings: &[&AssetSettings], output_dir: &str) -> Result<()> {
    let mut seen = HashSet::new();

    for s in settings {
        let dir = Path::new(&s.out_dir);
        if dir == Path::new(output_dir) {
            return Err(AssetdagError::ConfigError(format!(
                "[{}].out_dir must be a sub-directory of '{output_dir}'",
                s.class
            )));
        }
        if !seen.insert(dir.to_path_buf()) {
            return Err(AssetdagError::ConfigError(format!(
                "[{}].out_dir '{}' is shared with another asset class",
                s.class, s.out_dir
            )));
        }
    }

    Ok(())
}

fn resolve_lint(section: &LintSection, class: AssetClass) -> Result<LintSettings> {
    let names = section
        .rules
        .clone()
        .unwrap_or_else(|| LintSection::default_rules(class));

    let mut rules = Vec::with_capacity(names.len());
    for name in names {
        let rule: LintRule = name.parse().map_err(|e: String| {
            AssetdagError::ConfigError(format!("[lint.{}].rules: {e}", class.name()))
        })?;
        rules.push(rule);
    }

    let max_line_length = section.max_line_length.unwrap_or(DEFAULT_MAX_LINE_LENGTH);
    if max_line_length == 0 {
        return Err(AssetdagError::ConfigError(format!(
            "[lint.{}].max_line_length must be >= 1 (got 0)",
            class.name()
        )));
    }

    Ok(LintSettings {
        rules,
        max_line_length,
        cmd: section.cmd.clone(),
    })
}
