use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_EXPLAIN_URL: &str = "http://localhost:8081";
pub const DEFAULT_COMPLETION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_STORAGE_PATH: &str = ".hoistspace/storage.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
    #[error("missing required setting `{key}` (set {env_var} or APP_{env_path})")]
    Missing {
        key: &'static str,
        env_var: &'static str,
        env_path: &'static str,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store_uri: Option<String>,
    pub store_database: String,
    pub api_key: Option<String>,
    pub explain_url: String,
    pub completion_url: String,
    pub completion_api_key: Option<String>,
    pub completion_model: String,
    pub bind_addr: String,
    pub storage_path: PathBuf,
    pub metrics_auth: String,
}

/// Settings the quiz client cannot start without.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub store_uri: String,
    pub store_database: String,
    pub api_key: String,
    pub explain_url: String,
    pub storage_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub api_key: String,
    pub bind_addr: String,
    pub metrics_auth: String,
    pub completion: CompletionSettings,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        // Local .env is optional; real deployments pass plain environment variables
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let lookup = |key: &str, env_var: &str| -> Option<String> {
            settings
                .get_string(key)
                .ok()
                .or_else(|| env::var(env_var).ok())
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Config {
            store_uri: lookup("store.uri", "MONGO_URI"),
            store_database: lookup("store.database", "MONGO_DATABASE")
                .unwrap_or_else(|| "hoistspace".to_string()),
            api_key: lookup("api_key", "HOISTSPACE_API_KEY"),
            explain_url: lookup("explain.url", "HOISTSPACE_EXPLAIN_URL")
                .unwrap_or_else(|| DEFAULT_EXPLAIN_URL.to_string()),
            completion_url: lookup("completion.url", "COMPLETION_API_URL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_URL.to_string()),
            completion_api_key: lookup("completion.api_key", "GROQ_API_KEY"),
            completion_model: lookup("completion.model", "COMPLETION_MODEL")
                .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string()),
            bind_addr: lookup("server.bind_addr", "BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            storage_path: lookup("storage.path", "HOISTSPACE_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH)),
            metrics_auth: lookup("metrics.auth", "METRICS_AUTH")
                .unwrap_or_else(|| "admin:changeme".to_string()),
        })
    }

    pub fn client_settings(&self) -> Result<ClientSettings, ConfigError> {
        let store_uri = self.store_uri.clone().ok_or(ConfigError::Missing {
            key: "store.uri",
            env_var: "MONGO_URI",
            env_path: "STORE__URI",
        })?;
        let api_key = self.require_api_key()?;

        Ok(ClientSettings {
            store_uri,
            store_database: self.store_database.clone(),
            api_key,
            explain_url: self.explain_url.trim_end_matches('/').to_string(),
            storage_path: self.storage_path.clone(),
        })
    }

    pub fn proxy_settings(&self) -> Result<ProxySettings, ConfigError> {
        Ok(ProxySettings {
            api_key: self.require_api_key()?,
            bind_addr: self.bind_addr.clone(),
            metrics_auth: self.metrics_auth.clone(),
            completion: CompletionSettings {
                url: self.completion_url.clone(),
                api_key: self.completion_api_key.clone(),
                model: self.completion_model.clone(),
            },
        })
    }

    fn require_api_key(&self) -> Result<String, ConfigError> {
        self.api_key.clone().ok_or(ConfigError::Missing {
            key: "api_key",
            env_var: "HOISTSPACE_API_KEY",
            env_path: "API_KEY",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "MONGO_URI",
        "MONGO_DATABASE",
        "HOISTSPACE_API_KEY",
        "HOISTSPACE_EXPLAIN_URL",
        "GROQ_API_KEY",
        "APP_STORE__URI",
        "APP_API_KEY",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn missing_store_uri_is_fatal_for_client() {
        clear_env();
        env::set_var("HOISTSPACE_API_KEY", "anon-key");

        let config = Config::load().unwrap();
        let err = config.client_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "store.uri", .. }));

        clear_env();
    }

    #[test]
    #[serial]
    fn missing_api_key_is_fatal_for_client_and_proxy() {
        clear_env();
        env::set_var("MONGO_URI", "mongodb://localhost:27017");

        let config = Config::load().unwrap();
        assert!(matches!(
            config.client_settings(),
            Err(ConfigError::Missing { key: "api_key", .. })
        ));
        assert!(config.proxy_settings().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn blank_values_count_as_missing() {
        clear_env();
        env::set_var("MONGO_URI", "   ");
        env::set_var("HOISTSPACE_API_KEY", "anon-key");

        let config = Config::load().unwrap();
        assert!(config.store_uri.is_none());
        assert!(config.client_settings().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn client_settings_apply_defaults() {
        clear_env();
        env::set_var("MONGO_URI", "mongodb://localhost:27017");
        env::set_var("HOISTSPACE_API_KEY", "anon-key");
        env::set_var("HOISTSPACE_EXPLAIN_URL", "http://proxy.local/");

        let settings = Config::load().unwrap().client_settings().unwrap();
        assert_eq!(settings.store_database, "hoistspace");
        assert_eq!(settings.api_key, "anon-key");
        assert_eq!(settings.explain_url, "http://proxy.local");
        assert_eq!(settings.storage_path, PathBuf::from(DEFAULT_STORAGE_PATH));

        clear_env();
    }

    #[test]
    #[serial]
    fn prefixed_environment_overrides_plain_variables() {
        clear_env();
        env::set_var("MONGO_URI", "mongodb://plain:27017");
        env::set_var("APP_STORE__URI", "mongodb://prefixed:27017");
        env::set_var("APP_API_KEY", "prefixed-key");

        let config = Config::load().unwrap();
        assert_eq!(config.store_uri.as_deref(), Some("mongodb://prefixed:27017"));
        assert_eq!(config.api_key.as_deref(), Some("prefixed-key"));

        let proxy = config.proxy_settings().unwrap();
        assert_eq!(proxy.completion.model, DEFAULT_COMPLETION_MODEL);
        assert!(proxy.completion.api_key.is_none());

        clear_env();
    }
}
