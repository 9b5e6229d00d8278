use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::boundary::{CommandBoundary, HttpCommandBoundary, MissingBackend};

pub const DEFAULT_CONFIG_FILE: &str = "thread_reader.toml";
pub const ENV_PREFIX: &str = "APP";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SurfaceConfig {
    /// Empty means no backend is configured.
    pub backend_url: String,
    pub request_timeout_ms: u64,
    pub log_filter: String,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:1421".into(),
            request_timeout_ms: 5_000,
            log_filter: "info".into(),
        }
    }
}

impl SurfaceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn backend_url(&self) -> Result<Option<Url>> {
        let raw = self.backend_url.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let url = Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!(
                "backend url '{raw}' must use http or https, not '{}'",
                url.scheme()
            );
        }
        Ok(Some(url))
    }

    pub fn validate(&self) -> Result<()> {
        self.backend_url()?;
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    /// Boundary matching this configuration; `MissingBackend` when no url is set.
    pub fn build_boundary(&self) -> Result<Arc<dyn CommandBoundary>> {
        match self.backend_url()? {
            Some(url) => {
                let boundary = HttpCommandBoundary::new(url, self.request_timeout())
                    .context("failed to build backend http client")?;
                Ok(Arc::new(boundary))
            }
            None => Ok(Arc::new(MissingBackend)),
        }
    }
}

/// Defaults, then the config file, then `APP__*` environment variables.
///
/// An explicitly passed file must exist; the default file is optional.
pub fn load_config(path: Option<&Path>) -> Result<SurfaceConfig> {
    load_config_with_env(path, ENV_PREFIX)
}

fn load_config_with_env(path: Option<&Path>, env_prefix: &str) -> Result<SurfaceConfig> {
    let defaults = SurfaceConfig::default();
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let settings = Config::builder()
        .set_default("backend_url", defaults.backend_url)?
        .set_default("request_timeout_ms", defaults.request_timeout_ms as i64)?
        .set_default("log_filter", defaults.log_filter)?
        .add_source(File::from(file.as_path()).required(path.is_some()))
        .add_source(
            Environment::with_prefix(env_prefix)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to read configuration from '{}'", file.display()))?;

    let config: SurfaceConfig = settings
        .try_deserialize()
        .context("invalid surface configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
