// src/config/dotenv.rs

//! `.env` support.
//!
//! A `.env` file in the project root supplies variables such as
//! `ASSETDAG_ENV`. The process environment always wins; the file only fills
//! in what is unset. The file is read once and never written back into the
//! process environment.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::errors::{AssetdagError, Result};

pub const DOTENV_FILE: &str = ".env";

#[derive(Debug, Clone, Default)]
pub struct DotEnv {
    vars: HashMap<String, String>,
}

impl DotEnv {
    /// Read `<root>/.env`. A missing file yields an empty set.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(DOTENV_FILE);
        let iter = match dotenvy::from_path_iter(&path) {
            Ok(iter) => iter,
            Err(err) if err.not_found() => {
                debug!(path = %path.display(), "no .env file");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(AssetdagError::ConfigError(format!(
                    "{}: {err}",
                    path.display()
                )));
            }
        };

        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|err| {
                AssetdagError::ConfigError(format!("{}: {err}", path.display()))
            })?;
            vars.insert(key, value);
        }

        debug!(path = %path.display(), count = vars.len(), "loaded .env");
        Ok(Self { vars })
    }

    /// Value from the `.env` file alone.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Process environment first, then the `.env` file.
    pub fn var(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .or_else(|| self.get(key).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuildMode, MODE_ENV_VAR};

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let env = DotEnv::load(dir.path()).unwrap();
        assert_eq!(env.get(MODE_ENV_VAR), None);
    }

    #[test]
    fn reads_quoted_and_commented_values() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DOTENV_FILE),
            "# build settings\nASSETDAG_ENV=\"production\"\nASSETDAG_TEST_DOTENV_ONLY=yes\n",
        )
        .unwrap();

        let env = DotEnv::load(dir.path()).unwrap();
        assert_eq!(
            BuildMode::from_env_value(env.get(MODE_ENV_VAR)),
            BuildMode::Production
        );
        assert_eq!(env.var("ASSETDAG_TEST_DOTENV_ONLY").as_deref(), Some("yes"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DOTENV_FILE), "NOT A VALID LINE\n").unwrap();

        assert!(matches!(
            DotEnv::load(dir.path()),
            Err(AssetdagError::ConfigError(_))
        ));
    }
}
