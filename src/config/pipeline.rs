// src/config/pipeline.rs

//! The immutable configuration value handed to every component.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::model::{AssetSettings, ConfigFile, LintSettings};
use crate::errors::{AssetdagError, Result};
use crate::types::{AssetClass, BuildMode};
use crate::watch::path_utils::normalize_relative;

/// Everything the pipeline needs to know, fixed for the process lifetime.
///
/// Built once at startup from the validated [`ConfigFile`], the build mode
/// read from the environment and the project root. Shared behind an `Arc`;
/// nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    root: PathBuf,
    mode: BuildMode,
    output_dir: PathBuf,
    server_addr: SocketAddr,
    debounce: Duration,
    desktop_notifications: bool,
    markup: AssetSettings,
    styles: AssetSettings,
    scripts: AssetSettings,
    assets: AssetSettings,
    lint_scripts: LintSettings,
    lint_styles: LintSettings,
}

impl PipelineConfig {
    /// `port_override` comes from `--port` and replaces `[config].port`.
    pub fn new(
        cfg: ConfigFile,
        mode: BuildMode,
        root: impl Into<PathBuf>,
        port_override: Option<u16>,
    ) -> Result<Self> {
        let port = port_override.unwrap_or(cfg.config.port);
        let server_addr: SocketAddr = format!("{}:{}", cfg.config.host, port)
            .parse()
            .map_err(|e| AssetdagError::ConfigError(format!("invalid server address: {e}")))?;

        Ok(Self {
            root: root.into(),
            mode,
            output_dir: PathBuf::from(normalize_relative(&cfg.config.output_dir)),
            server_addr,
            debounce: Duration::from_millis(cfg.config.debounce_ms),
            desktop_notifications: cfg.config.desktop_notifications,
            markup: cfg.markup,
            styles: cfg.styles,
            scripts: cfg.scripts,
            assets: cfg.assets,
            lint_scripts: cfg.lint_scripts,
            lint_styles: cfg.lint_styles,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Output directory relative to the project root.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output directory joined onto the project root.
    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output_dir)
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn desktop_notifications(&self) -> bool {
        self.desktop_notifications
    }

    pub fn asset(&self, class: AssetClass) -> &AssetSettings {
        match class {
            AssetClass::Markup => &self.markup,
            AssetClass::Styles => &self.styles,
            AssetClass::Scripts => &self.scripts,
            AssetClass::Assets => &self.assets,
        }
    }

    /// Lint settings for the classes that have a validator.
    pub fn lint(&self, class: AssetClass) -> Option<&LintSettings> {
        match class {
            AssetClass::Scripts => Some(&self.lint_scripts),
            AssetClass::Styles => Some(&self.lint_styles),
            AssetClass::Markup | AssetClass::Assets => None,
        }
    }

    /// Human-readable dump used by the `default` task.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("  mode            = {}\n", self.mode));
        out.push_str(&format!("  minify          = {}\n", self.mode.minify()));
        out.push_str(&format!("  root            = {}\n", self.root.display()));
        out.push_str(&format!("  output_dir      = {}\n", self.output_dir.display()));
        out.push_str(&format!("  server          = http://{}\n", self.server_addr));
        out.push_str(&format!("  debounce        = {:?}\n", self.debounce));
        out.push_str(&format!("  notifications   = {}\n", self.desktop_notifications));
        for class in [
            AssetClass::Markup,
            AssetClass::Styles,
            AssetClass::Scripts,
            AssetClass::Assets,
        ] {
            let s = self.asset(class);
            out.push_str(&format!("  [{class}]\n"));
            out.push_str(&format!("      src     = {:?}\n", s.src));
            out.push_str(&format!("      watch   = {:?}\n", s.watch));
            out.push_str(&format!("      out_dir = {}\n", s.out_dir));
            if !s.include_paths.is_empty() {
                out.push_str(&format!("      include = {:?}\n", s.include_paths));
            }
            if let Some(cmd) = &s.cmd {
                out.push_str(&format!("      cmd     = {cmd}\n"));
            }
            if let Some(cmd) = &s.postprocess_cmd {
                out.push_str(&format!("      post    = {cmd}\n"));
            }
            if let Some(lint) = self.lint(class) {
                let rules: Vec<&str> = lint.rules.iter().map(|r| r.name()).collect();
                out.push_str(&format!("      lint    = {rules:?}\n"));
            }
        }
        out
    }
}
