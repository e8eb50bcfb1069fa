use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::api::FallbackPolicy;

/// Analogue de `REACT_APP_API_URL` : seule variable qui choisit le backend
pub const API_URL_ENV: &str = "VIGIE_API_URL";
pub const CONFIG_PATH_ENV: &str = "VIGIE_CONFIG";
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_yaml::Error),
    #[error("could not find config directory")]
    NoConfigDir,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub readings_limit: usize,
    pub session_file: Option<PathBuf>,
    pub fallback: FallbackConf,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FallbackConf {
    /// true => every endpoint propagates its errors, no synthetic data
    pub disabled: bool,
    /// Accepte les comptes de démonstration quand /auth/login est injoignable
    pub mock_login: bool,
    /// Politique par endpoint, clé = nom de l'endpoint (`predict`, `list_equipment`...)
    pub overrides: BTreeMap<String, FallbackPolicy>,
}

impl Default for FallbackConf {
    fn default() -> Self {
        Self { disabled: false, mock_login: true, overrides: BTreeMap::new() }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            request_timeout_secs: 10,
            poll_interval_secs: 30,
            readings_limit: 100,
            session_file: None,
            fallback: FallbackConf::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_str(txt: &str) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(txt)?)
    }

    /// Overrides from the environment; `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Emplacement du fichier de session (équivalent du localStorage navigateur)
    pub fn session_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("vigie");
        path.push("session.json");
        Ok(path)
    }
}

/// defaults -> fichier YAML (VIGIE_CONFIG, sinon vigie.yaml) -> environnement
pub async fn load_config() -> ClientConfig {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "vigie.yaml".into());
    let mut cfg = load_config_file(&path).await;
    cfg.apply_env(|key| std::env::var(key).ok());
    cfg
}

pub async fn load_config_file<P: AsRef<Path>>(path: P) -> ClientConfig {
    let path = path.as_ref();
    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("[config] no {} found, using defaults", path.display());
            return ClientConfig::default();
        }
        Err(e) => {
            warn!("[config] cannot read {}: {e}, using defaults", path.display());
            return ClientConfig::default();
        }
    };
    ClientConfig::from_yaml_str(&txt).unwrap_or_else(|e| {
        warn!("[config] {}: {e}", path.display());
        ClientConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = ClientConfig::from_yaml_str("api_url: http://plant-7:9000/api\nfallback:\n  disabled: true\n").unwrap();
        assert_eq!(cfg.api_url, "http://plant-7:9000/api");
        assert!(cfg.fallback.disabled);
        assert!(cfg.fallback.mock_login);
        assert_eq!(cfg.poll_interval_secs, 30);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut cfg = ClientConfig::default();
        cfg.apply_env(|key| (key == API_URL_ENV).then(|| "http://edge:8000/api".to_string()));
        assert_eq!(cfg.api_url, "http://edge:8000/api");

        cfg.apply_env(|_| Some("   ".to_string()));
        assert_eq!(cfg.api_url, "http://edge:8000/api");
    }

    #[tokio::test]
    async fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigie.yaml");
        tokio::fs::write(&path, "poll_interval_secs: [not, a, number]").await.unwrap();
        assert_eq!(load_config_file(&path).await, ClientConfig::default());
        assert_eq!(load_config_file(dir.path().join("missing.yaml")).await, ClientConfig::default());
    }

    #[tokio::test]
    async fn test_unreadable_path_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        // un répertoire existe mais ne se lit pas comme un fichier
        assert_eq!(load_config_file(dir.path()).await, ClientConfig::default());
    }

    #[test]
    fn test_fallback_overrides_parse() {
        let cfg = ClientConfig::from_yaml_str("fallback:\n  overrides:\n    predict: propagate\n    list_equipment: synthesize\n")
            .unwrap();
        assert_eq!(cfg.fallback.overrides.get("predict"), Some(&FallbackPolicy::Propagate));
        assert_eq!(cfg.fallback.overrides.get("list_equipment"), Some(&FallbackPolicy::Synthesize));
        assert!(ClientConfig::from_yaml_str("fallback:\n  overrides:\n    predict: maybe\n").is_err());
    }

    #[test]
    fn test_session_path() {
        let mut cfg = ClientConfig::default();
        cfg.session_file = Some(PathBuf::from("/tmp/vigie-session.json"));
        assert_eq!(cfg.session_path().unwrap(), PathBuf::from("/tmp/vigie-session.json"));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(30));
    }
}
