use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Keys read from the environment as comma separated lists.
pub const LIST_KEYS: &[&str] = &["http.cors_origins"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub http: HttpConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_upload_bytes: usize,
    pub inference_timeout_ms: u64,
    /// Forward passes allowed to run at once, including ones whose request already timed out.
    pub max_concurrent_inference: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:3001".into(),
                "http://127.0.0.1:3000".into(),
                "http://127.0.0.1:3001".into(),
            ],
            max_upload_bytes: 10 * 1024 * 1024,
            inference_timeout_ms: 10_000,
            max_concurrent_inference: std::thread::available_parallelism().map_or(4, |n| n.get()),
        }
    }
}

impl HttpConfig {
    pub fn inference_timeout(&self) -> Duration { Duration::from_millis(self.inference_timeout_ms) }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("models.top_k must be at least 1")]
    ZeroTopK,
    #[error("http.inference_timeout_ms must be greater than 0")]
    ZeroTimeout,
    #[error("http.max_concurrent_inference must be at least 1")]
    ZeroConcurrency,
}

impl ServiceConfig {
    /// Rejects values that would make every detect request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.top_k == 0 { return Err(ConfigError::ZeroTopK); }
        if self.http.inference_timeout_ms == 0 { return Err(ConfigError::ZeroTimeout); }
        if self.http.max_concurrent_inference == 0 { return Err(ConfigError::ZeroConcurrency); }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub dir: PathBuf,
    /// Fail startup when no model artifact could be loaded.
    pub require_any: bool,
    /// Wrap every model so at most one forward pass runs at a time per model.
    pub serialize_inference: bool,
    pub top_k: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("app/models"), require_any: true, serialize_inference: false, top_k: crate::predict::DEFAULT_TOP_K }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_frontend_deployment() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.http.port, 8000);
        assert_eq!(cfg.http.cors_origins.len(), 4);
        assert_eq!(cfg.models.dir, PathBuf::from("app/models"));
        assert_eq!(cfg.models.top_k, 3);
        assert!(cfg.models.require_any);
        assert!(cfg.http.max_concurrent_inference >= 1);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn unusable_values_fail_validation() {
        let cfg: ServiceConfig = serde_json::from_str(r#"{"models": {"top_k": 0}}"#).unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTopK));
        let cfg: ServiceConfig = serde_json::from_str(r#"{"http": {"inference_timeout_ms": 0}}"#).unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTimeout));
        let cfg: ServiceConfig = serde_json::from_str(r#"{"http": {"max_concurrent_inference": 0}}"#).unwrap();
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroConcurrency));
    }

    #[test]
    fn partial_sections_fall_back_to_defaults() {
        let cfg: ServiceConfig = serde_json::from_str(r#"{"http": {"port": 9000}, "models": {"require_any": false}}"#).unwrap();
        assert_eq!(cfg.http.port, 9000);
        assert_eq!(cfg.http.host, "0.0.0.0");
        assert!(!cfg.models.require_any);
        assert_eq!(cfg.models.top_k, 3);
    }
}
