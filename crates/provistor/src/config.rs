use std::env;
use std::path::PathBuf;

use provistor_core::{Error, ProvisionRequest, Result};

/// Used when `PROVISTOR_INIT_SCRIPT` is unset.
pub const DEFAULT_INIT_SCRIPT: &str = include_str!("cloud-config.yaml");

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_token: String,
    pub size: Option<String>,
    pub region: Option<String>,
    pub init_script: String,
    pub output_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_token = env::var("PROVISTOR_API_TOKEN")
            .map_err(|_| Error::Config("PROVISTOR_API_TOKEN must be set".into()))?;

        let init_script = match var("PROVISTOR_INIT_SCRIPT") {
            Some(path) => std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("reading init script {path}: {e}")))?,
            None => DEFAULT_INIT_SCRIPT.to_string(),
        };

        Ok(Self {
            api_token: api_token.trim().to_string(),
            size: var("PROVISTOR_SIZE"),
            region: var("PROVISTOR_REGION"),
            init_script,
            output_dir: var("PROVISTOR_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    pub fn request(&self) -> ProvisionRequest {
        ProvisionRequest {
            token: self.api_token.clone(),
            init_script: self.init_script.clone(),
            size: self.size.clone(),
            region: self.region.clone(),
        }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
