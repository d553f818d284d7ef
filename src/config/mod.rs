// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`) and the optional `.env`
//!   next to it (`dotenv.rs`).
//! - Apply defaults and validate invariants (`validate.rs`).
//! - Freeze everything into the immutable [`PipelineConfig`] (`pipeline.rs`).

pub mod dotenv;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod validate;

pub use dotenv::DotEnv;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{
    AssetSection, AssetSettings, ConfigFile, ConfigSection, LintConfig, LintSection,
    LintSettings, RawConfigFile,
};
pub use pipeline::PipelineConfig;
