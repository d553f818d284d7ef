#![allow(dead_code)]

use std::path::Path;

use assetdag::config::{
    AssetSection, ConfigFile, LintSection, PipelineConfig, RawConfigFile,
};
use assetdag::types::{AssetClass, BuildMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.config.desktop_notifications = false;
        Self { config }
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.config.config.output_dir = dir.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.config.port = port;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn asset(mut self, class: AssetClass, section: AssetSection) -> Self {
        match class {
            AssetClass::Markup => self.config.markup = section,
            AssetClass::Styles => self.config.styles = section,
            AssetClass::Scripts => self.config.scripts = section,
            AssetClass::Assets => self.config.assets = section,
        }
        self
    }

    pub fn lint(mut self, class: AssetClass, section: LintSection) -> Self {
        match class {
            AssetClass::Scripts => self.config.lint.scripts = section,
            AssetClass::Styles => self.config.lint.styles = section,
            AssetClass::Markup | AssetClass::Assets => {}
        }
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// Freeze into a `PipelineConfig` rooted at `root`, on an ephemeral port.
    pub fn pipeline(self, mode: BuildMode, root: &Path) -> PipelineConfig {
        PipelineConfig::new(self.build(), mode, root, Some(0))
            .expect("Failed to build pipeline config")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `AssetSection`.
#[derive(Default)]
pub struct AssetSectionBuilder {
    section: AssetSection,
}

impl AssetSectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.section.src.get_or_insert_with(Vec::new).push(pattern.to_string());
        self
    }

    pub fn watch(mut self, pattern: &str) -> Self {
        self.section.watch.get_or_insert_with(Vec::new).push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.section.exclude.get_or_insert_with(Vec::new).push(pattern.to_string());
        self
    }

    pub fn out_dir(mut self, dir: &str) -> Self {
        self.section.out_dir = Some(dir.to_string());
        self
    }

    pub fn include_path(mut self, dir: &str) -> Self {
        self.section
            .include_paths
            .get_or_insert_with(Vec::new)
            .push(dir.to_string());
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.section.cmd = Some(cmd.to_string());
        self
    }

    pub fn postprocess_cmd(mut self, cmd: &str) -> Self {
        self.section.postprocess_cmd = Some(cmd.to_string());
        self
    }

    pub fn hard_fail(mut self, val: bool) -> Self {
        self.section.hard_fail = Some(val);
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.section.use_hash = Some(val);
        self
    }

    pub fn build(self) -> AssetSection {
        self.section
    }
}

/// Builder for `LintSection`.
#[derive(Default)]
pub struct LintSectionBuilder {
    section: LintSection,
}

impl LintSectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: &str) -> Self {
        self.section.rules.get_or_insert_with(Vec::new).push(rule.to_string());
        self
    }

    pub fn no_rules(mut self) -> Self {
        self.section.rules = Some(Vec::new());
        self
    }

    pub fn max_line_length(mut self, max: usize) -> Self {
        self.section.max_line_length = Some(max);
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.section.cmd = Some(cmd.to_string());
        self
    }

    pub fn build(self) -> LintSection {
        self.section
    }
}
