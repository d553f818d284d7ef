use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Environment variable selecting the build mode.
pub const MODE_ENV_VAR: &str = "ASSETDAG_ENV";

/// Minified/production vs pretty/development output.
///
/// Exactly one mode is active per process; it is read once at startup
/// (process environment, then `.env`) and carried inside the pipeline
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    /// Anything other than `production` (or `prod`) means development.
    pub fn from_env_value(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or(BuildMode::Development)
    }

    pub fn minify(self) -> bool {
        matches!(self, BuildMode::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(BuildMode::Production),
            "development" | "dev" => Ok(BuildMode::Development),
            other => Err(format!(
                "invalid build mode: {other} (expected \"production\" or \"development\")"
            )),
        }
    }
}

/// The asset classes handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Markup,
    Styles,
    Scripts,
    Assets,
}

impl AssetClass {
    pub fn name(self) -> &'static str {
        match self {
            AssetClass::Markup => "markup",
            AssetClass::Styles => "styles",
            AssetClass::Scripts => "scripts",
            AssetClass::Assets => "assets",
        }
    }

    /// Extension given to emitted files; `None` keeps the source extension.
    pub fn output_extension(self) -> Option<&'static str> {
        match self {
            AssetClass::Markup => Some("html"),
            AssetClass::Styles => Some("css"),
            AssetClass::Scripts => Some("js"),
            AssetClass::Assets => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
