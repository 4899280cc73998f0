use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub model: Option<ModelConfig>,
    pub http: Option<HttpConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_base: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub download_dir: Option<String>,
}

/// Platform config directory path: `<config_dir>/byline/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("byline").join("config.toml"))
}

/// Load config by cascading CWD `.byline.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".byline.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed; a parse failure is logged.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_model = base.model.unwrap_or_default();
    let base_http = base.http.unwrap_or_default();
    let base_output = base.output.unwrap_or_default();
    let model = overlay.model.unwrap_or_default();
    let http = overlay.http.unwrap_or_default();
    let output = overlay.output.unwrap_or_default();

    ConfigFile {
        model: Some(ModelConfig {
            api_base: model.api_base.or(base_model.api_base),
            model: model.model.or(base_model.model),
            max_tokens: model.max_tokens.or(base_model.max_tokens),
        }),
        http: Some(HttpConfig {
            timeout_secs: http.timeout_secs.or(base_http.timeout_secs),
            user_agent: http.user_agent.or(base_http.user_agent),
        }),
        output: Some(OutputConfig {
            download_dir: output.download_dir.or(base_output.download_dir),
        }),
    }
}

impl ConfigFile {
    /// Apply every value present in this file on top of `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            if let Some(api_base) = &model.api_base {
                config.api_base = api_base.clone();
            }
            if let Some(name) = &model.model {
                config.model = name.clone();
            }
            if let Some(max_tokens) = model.max_tokens {
                config.max_tokens = max_tokens;
            }
        }
        if let Some(http) = &self.http {
            if http.timeout_secs.is_some() {
                config.timeout_secs = http.timeout_secs;
            }
            if let Some(user_agent) = &http.user_agent {
                config.user_agent = user_agent.clone();
            }
        }
        if let Some(dir) = self.output.as_ref().and_then(|o| o.download_dir.as_ref()) {
            config.download_dir = Some(PathBuf::from(dir));
        }
    }
}

/// Apply `BYLINE_MODEL` and `BYLINE_API_BASE` on top of `config`. Empty
/// values are ignored.
pub fn apply_env(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(model) = env("BYLINE_MODEL").filter(|v| !v.is_empty()) {
        config.model = model;
    }
    if let Some(base) = env("BYLINE_API_BASE").filter(|v| !v.is_empty()) {
        config.api_base = base;
    }
}

/// Defaults, then the config files, then the process environment.
pub fn resolve() -> Config {
    let mut config = Config::default();
    load_config().apply_to(&mut config);
    apply_env(&mut config, |name| std::env::var(name).ok());
    config
}
