//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix for per-chain RPC URL overrides, e.g. `TIPJAR_RPC_URLS_137`.
pub const RPC_URLS_ENV_PREFIX: &str = "TIPJAR_RPC_URLS_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, apply environment overrides and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Same as [`load_config`] for an in-memory document.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Replace a chain's URL list with a comma-separated env override when present.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for chain in &mut config.chains {
        let key = format!("{}{}", RPC_URLS_ENV_PREFIX, chain.chain_id);
        if let Some(value) = lookup(&key) {
            chain.rpc_urls = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            tracing::info!(
                chain_id = chain.chain_id,
                urls = chain.rpc_urls.len(),
                "RPC URLs overridden from environment"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[listener]
bind_address = "127.0.0.1:8088"

[rpc]
request_timeout_ms = 2500

[[chains]]
chain_id = 137
name = "polygon"
rpc_urls = ["https://polygon-rpc.com", "https://rpc.ankr.com/polygon"]

[[chains]]
chain_id = 80002
name = "amoy"

[faucet]
address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
default_chain_id = 80002
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8088");
        assert_eq!(config.rpc.request_timeout_ms, 2500);
        assert_eq!(config.chains.len(), 2);
        assert_eq!(config.chains[0].rpc_urls.len(), 2);
        assert!(config.chains[1].rpc_urls.is_empty());
        assert_eq!(config.faucet.default_chain_id, Some(80002));
        assert!(config.faucet.address.is_some());
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[[chains]]\nchain_id = \"abc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config("[rpc]\nquorum = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("quorum"));
    }

    #[test]
    fn test_env_override() {
        let mut config: GatewayConfig = toml::from_str(SAMPLE).unwrap();
        apply_env_overrides(&mut config, |key| {
            (key == "TIPJAR_RPC_URLS_80002")
                .then(|| " https://a.example , ,https://b.example".to_string())
        });
        assert_eq!(
            config.chains[1].rpc_urls,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.chains[0].rpc_urls.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/tipjar.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("tipjar-{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, SAMPLE).unwrap();
        let config = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(config.chains[0].chain_id, 137);
    }
}
