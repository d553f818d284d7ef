// src/config/model.rs

use serde::Deserialize;

use crate::lint::LintRule;
use crate::types::AssetClass;

/// Top-level configuration as read from `Assetdag.toml`.
///
/// ```toml
/// [config]
/// output_dir = "dist"
/// port = 3000
///
/// [styles]
/// src = ["src/styles/**/*.css"]
/// include_paths = ["src/styles"]
///
/// [lint.scripts]
/// rules = ["no-debugger", "max-line-length"]
/// ```
///
/// Every section is optional. Fields left out of an asset section fall back
/// to the defaults of that asset class, see [`AssetSection::resolve`].
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub markup: AssetSection,

    #[serde(default)]
    pub styles: AssetSection,

    #[serde(default)]
    pub scripts: AssetSection,

    #[serde(default)]
    pub assets: AssetSection,

    #[serde(default)]
    pub lint: LintConfig,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Root of all generated output; deleted by `clean`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default = "default_host")]
    pub host: String,

    /// Dev server port. `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Trailing debounce window applied to file-change bursts.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_desktop_notifications")]
    pub desktop_notifications: bool,
}

fn default_output_dir() -> String {
    "dist".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_desktop_notifications() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            host: default_host(),
            port: default_port(),
            debounce_ms: default_debounce_ms(),
            desktop_notifications: default_desktop_notifications(),
        }
    }
}

/// `[markup]`, `[styles]`, `[scripts]` and `[assets]` sections.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AssetSection {
    /// Entry globs; every match is compiled into one output file.
    pub src: Option<Vec<String>>,

    /// Globs that trigger a rebuild in watch mode. Defaults to `src`.
    ///
    /// For markup this is also the set of templates that entries may
    /// include or extend.
    pub watch: Option<Vec<String>>,

    pub exclude: Option<Vec<String>>,

    pub out_dir: Option<String>,

    /// Extra directories searched by `@import` / `//= require`.
    pub include_paths: Option<Vec<String>>,

    /// External filter command (source on stdin, output on stdout).
    pub cmd: Option<String>,

    /// Whether a missing include is an error (scripts only).
    pub hard_fail: Option<bool>,

    /// External minifier used in production (scripts only).
    pub minify_cmd: Option<String>,

    /// Filter run on each stylesheet after `@import` inlining, e.g. a
    /// vendor prefixer (styles only).
    pub postprocess_cmd: Option<String>,

    /// Skip watch rebuilds when the watched content did not change.
    pub use_hash: Option<bool>,
}

/// Effective settings of one asset class after defaults were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSettings {
    pub class: AssetClass,
    pub src: Vec<String>,
    pub watch: Vec<String>,
    pub exclude: Vec<String>,
    pub out_dir: String,
    pub include_paths: Vec<String>,
    pub cmd: Option<String>,
    pub hard_fail: bool,
    pub minify_cmd: Option<String>,
    pub postprocess_cmd: Option<String>,
    pub use_hash: bool,
}

impl AssetSection {
    /// Apply the defaults of `class`, placing output below `output_dir`.
    pub fn resolve(&self, class: AssetClass, output_dir: &str) -> AssetSettings {
        let (src, watch, sub_dir, include_paths): (&[&str], &[&str], Option<&str>, &[&str]) =
            match class {
                AssetClass::Markup => (
                    &["src/templates/*.html"],
                    &["src/templates/**/*.html"],
                    None,
                    &[],
                ),
                AssetClass::Styles => (
                    &["src/styles/**/*.css"],
                    &["src/styles/**/*.css"],
                    Some("css"),
                    &["src/styles"],
                ),
                AssetClass::Scripts => (
                    &["src/js/**/*.js"],
                    &["src/js/**/*.js"],
                    Some("js"),
                    &[".", "node_modules", "src/js"],
                ),
                AssetClass::Assets => (&["src/assets/**/*"], &["src/assets/**/*"], Some("assets"), &[]),
            };

        let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let src = self.src.clone().unwrap_or_else(|| to_vec(src));
        let watch = match (&self.watch, &self.src) {
            (Some(w), _) => w.clone(),
            // An explicit `src` without `watch` watches exactly the entries.
            (None, Some(explicit)) => explicit.clone(),
            (None, None) => to_vec(watch),
        };

        let out_dir = self.out_dir.clone().unwrap_or_else(|| match sub_dir {
            Some(sub) => format!("{}/{}", output_dir.trim_end_matches('/'), sub),
            None => output_dir.to_string(),
        });

        AssetSettings {
            class,
            src,
            watch,
            exclude: self.exclude.clone().unwrap_or_default(),
            out_dir,
            include_paths: self
                .include_paths
                .clone()
                .unwrap_or_else(|| to_vec(include_paths)),
            cmd: self.cmd.clone(),
            hard_fail: self.hard_fail.unwrap_or(true),
            minify_cmd: self.minify_cmd.clone(),
            postprocess_cmd: self.postprocess_cmd.clone(),
            use_hash: self.use_hash.unwrap_or(false),
        }
    }
}

/// `[lint.scripts]` and `[lint.styles]`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LintConfig {
    #[serde(default)]
    pub scripts: LintSection,

    #[serde(default)]
    pub styles: LintSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LintSection {
    pub rules: Option<Vec<String>>,
    pub max_line_length: Option<usize>,
    /// External linter; receives the source paths as trailing arguments.
    pub cmd: Option<String>,
}

/// Effective lint settings for one asset class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSettings {
    pub rules: Vec<LintRule>,
    pub max_line_length: usize,
    pub cmd: Option<String>,
}

impl LintSection {
    pub fn default_rules(class: AssetClass) -> Vec<String> {
        let rules: &[&str] = match class {
            AssetClass::Scripts => &["no-debugger", "no-trailing-whitespace", "max-line-length"],
            AssetClass::Styles => &["no-important", "no-empty-rule", "no-trailing-whitespace"],
            AssetClass::Markup | AssetClass::Assets => &[],
        };
        rules.iter().map(|s| s.to_string()).collect()
    }
}

/// Validated configuration with all defaults applied.
///
/// Construct through `ConfigFile::try_from(raw)` (see `config::validate`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub markup: AssetSettings,
    pub styles: AssetSettings,
    pub scripts: AssetSettings,
    pub assets: AssetSettings,
    pub lint_scripts: LintSettings,
    pub lint_styles: LintSettings,
}
