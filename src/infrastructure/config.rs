use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub api: ApiSettings,
    pub polling: PollingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Brotli-compress responses for clients that accept it
    pub compress: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub endpoints: EndpointTemplates,
}

/// Path templates on the analysis API. `${name}` placeholders are filled per request.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointTemplates {
    pub deviations: String,
    pub aggregates: String,
    pub trajectory_info: String,
    pub signal: String,
    pub task_status: String,
    pub calculate_metadata: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    pub interval_ms: u64,
    /// Unset means poll until the backend resolves the task
    #[serde(default)]
    pub max_duration_secs: Option<u64>,
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn builder_with_defaults() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind_addr", "0.0.0.0:8080")?
        .set_default("server.compress", true)?
        .set_default("api.base_url", "http://localhost:8000")?
        .set_default("api.timeout_secs", 30)?
        .set_default("api.endpoints.deviations", "/auswertung/${metric}/${bahn_id}")?
        .set_default("api.endpoints.aggregates", "/auswertung/${metric}_info/${bahn_id}")?
        .set_default("api.endpoints.trajectory_info", "/bahn/bahn_info/${bahn_id}")?
        .set_default("api.endpoints.signal", "/bahn/${stream}/${bahn_id}")?
        .set_default("api.endpoints.task_status", "/task-status/${task_id}")?
        .set_default("api.endpoints.calculate_metadata", "/calculate-metadata")?
        .set_default("polling.interval_ms", 500)?
        .set_default("cache.ttl_secs", 300)?)
}

/// Defaults, then `config/dashboard.{toml,yaml,json}` if present, then
/// `BAHN__SECTION__KEY` environment variables.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = builder_with_defaults()?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("BAHN").separator("__"))
        .build()
        .context("Failed to build configuration")?;

    settings
        .try_deserialize()
        .context("Invalid dashboard configuration")
}

/// Replace `${name}` placeholders in a template
pub fn expand_template(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("${{{}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template() {
        let mut vars = HashMap::new();
        vars.insert("metric", "sidtw".to_string());
        vars.insert("bahn_id", "1718000000".to_string());

        let result = expand_template("/auswertung/${metric}_info/${bahn_id}", &vars);
        assert_eq!(result, "/auswertung/sidtw_info/1718000000");
    }

    #[test]
    fn test_defaults_without_file() {
        let config: AppConfig = builder_with_defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.polling.interval(), Duration::from_millis(500));
        assert_eq!(config.polling.max_duration(), None);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.api.endpoints.task_status, "/task-status/${task_id}");
        assert!(config.server.compress);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let toml = r#"
            [api]
            base_url = "http://analysis:8000"

            [polling]
            interval_ms = 250
            max_duration_secs = 600
        "#;
        let config: AppConfig = builder_with_defaults()
            .unwrap()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.api.base_url, "http://analysis:8000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.polling.interval_ms, 250);
        assert_eq!(config.polling.max_duration(), Some(Duration::from_secs(600)));
    }
}
