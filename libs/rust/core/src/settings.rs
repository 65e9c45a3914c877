use anyhow::Result;
use serde::de::DeserializeOwned;

pub const CONFIG_FILE_ENV: &str = "ISYARAT_CONFIG_FILE";
pub const ENV_PREFIX: &str = "ISYARAT";

/// Layered config: serde defaults of `T`, then the optional file named by
/// `ISYARAT_CONFIG_FILE` (format from extension), then `ISYARAT__SECTION__KEY`
/// environment variables. `list_keys` are split on commas when read from env.
pub fn load_config<T: DeserializeOwned>(service: &str, list_keys: &[&str]) -> Result<T> {
    let mut builder = config::Config::builder().set_default("service_name", service)?;
    if let Ok(file) = std::env::var(CONFIG_FILE_ENV) {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    let mut env = config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true);
    if !list_keys.is_empty() {
        env = env.list_separator(",");
        for key in list_keys { env = env.with_list_parse_key(key); }
    }
    let cfg = builder.add_source(env).build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Sample { service_name: String, sample: SampleSection }

    #[derive(Debug, Deserialize)]
    #[serde(default)]
    struct SampleSection { port: u16, origins: Vec<String> }

    impl Default for SampleSection { fn default() -> Self { Self { port: 8000, origins: vec!["a".into()] } } }

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("ISYARAT__SAMPLE__PORT", "9100");
        std::env::set_var("ISYARAT__SAMPLE__ORIGINS", "http://x,http://y");
        let cfg: Sample = load_config("sample-svc", &["sample.origins"]).unwrap();
        assert_eq!(cfg.service_name, "sample-svc");
        assert_eq!(cfg.sample.port, 9100);
        assert_eq!(cfg.sample.origins, vec!["http://x".to_string(), "http://y".to_string()]);
        std::env::remove_var("ISYARAT__SAMPLE__PORT");
        std::env::remove_var("ISYARAT__SAMPLE__ORIGINS");
    }
}
