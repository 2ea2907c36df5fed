//! Engine configuration
//!
//! Layered loading in the same shape as the rest of our tooling: embedded
//! defaults, then the user config, then the repository config (any of
//! toml/json/yaml), then `GATEHOUSE_`-prefixed environment variables on top.

use crate::engine::materialize::MaterializePolicy;
use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// Embedded at compile time so a bare checkout works with zero setup
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Fully merged, typed engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatehouseConfig {
    pub engine: EngineSettings,
    pub selection: SelectionSettings,
    pub report: ReportSettings,
    /// Per-hook overrides keyed by hook id
    #[serde(default)]
    pub hooks: HashMap<String, HookOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Wall-clock budget per tool invocation (seconds)
    pub timeout_secs: u64,
    /// Parallel hook limit; 0 derives a bound from the CPU count
    pub max_parallel: usize,
    /// Cap on captured stdout/stderr per invocation (bytes)
    pub capture_limit_bytes: usize,
    pub materialize: MaterializePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Path prefixes excluded from every hook
    pub exclude_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    pub color: bool,
}

/// Per-hook tuning from config or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookOverride {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub timeout_secs: Option<u64>,
    /// Extra arguments appended to every tier's invocation
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Minimum severity passed through to tools that understand one
    pub min_severity: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl GatehouseConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            let ext = std::path::Path::new(custom_path)
                .extension()
                .and_then(|e| e.to_str());
            figment = match ext {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            figment = figment
                .merge(Toml::file(Self::user_config_path()))
                .merge(Toml::file("gatehouse.toml"))
                .merge(Json::file("gatehouse.json"))
                .merge(Yaml::file("gatehouse.yaml"))
                .merge(Yaml::file("gatehouse.yml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed("GATEHOUSE_").split("__"));

        Ok(figment.extract()?)
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/gatehouse/config.toml"),
            Err(_) => "~/.config/gatehouse/config.toml".to_string(),
        }
    }

    /// Effective timeout for one hook, honoring its override
    pub fn timeout_for(&self, hook_id: &str) -> Duration {
        let secs = self
            .hooks
            .get(hook_id)
            .and_then(|o| o.timeout_secs)
            .unwrap_or(self.engine.timeout_secs);
        Duration::from_secs(secs)
    }

    pub fn is_enabled(&self, hook_id: &str) -> bool {
        self.hooks.get(hook_id).map(|o| o.enabled).unwrap_or(true)
    }

    /// Extra tool arguments for one hook (severity threshold included)
    pub fn extra_args_for(&self, hook_id: &str) -> Vec<String> {
        let Some(overrides) = self.hooks.get(hook_id) else {
            return Vec::new();
        };
        let mut args = overrides.extra_args.clone();
        if let Some(severity) = &overrides.min_severity {
            args.push("--severity".to_string());
            args.push(severity.clone());
        }
        args
    }

    /// Bounded worker-pool size for the batch runner
    pub fn max_parallel(&self) -> usize {
        if self.engine.max_parallel == 0 {
            num_cpus::get().clamp(1, 8)
        } else {
            self.engine.max_parallel
        }
    }
}
