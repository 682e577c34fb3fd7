//! Launch configuration: which adapter backend to run, its credentials,
//! and which scenario document to load. Resolution follows the same
//! priority cascade as the teacher's provider configuration (environment
//! variable overrides an explicit value overrides a default), extended
//! with a `clap`-derived CLI for the runnable binary.
//!
//! An unknown adapter name, or a placeholder/missing credential, is a
//! fatal startup error: the process should refuse to come up half-wired
//! rather than silently run without a working transport.

use std::env;
use std::path::PathBuf;

use clap::Parser;

use crate::adapter::AdapterKind;

/// Placeholder credential value treated as "not actually configured",
/// matching the convention of shipping an example config with an obvious
/// stand-in token.
const PLACEHOLDER_CREDENTIAL: &str = "TOKEN";

#[derive(Debug, Parser)]
#[command(name = "scenario-run", about = "Run a validated scenario document against a transport adapter")]
pub struct Cli {
    /// Path to the scenario JSON document.
    #[arg(long, env = "SCENARIO_PATH")]
    pub scenario: PathBuf,

    /// Adapter backend to run: "memory" or "webhook".
    #[arg(long, env = "SCENARIO_ADAPTER", default_value = "webhook")]
    pub adapter: String,

    /// Credential for the selected adapter (e.g. a platform bot token).
    #[arg(long, env = "SCENARIO_CREDENTIAL", default_value = PLACEHOLDER_CREDENTIAL)]
    pub credential: String,

    /// Address the webhook adapter binds to.
    #[arg(long, env = "SCENARIO_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub scenario_path: PathBuf,
    pub adapter: AdapterKind,
    pub credential: String,
    pub bind: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported adapter: {0}")]
    UnsupportedAdapter(String),

    #[error("missing or placeholder credential for adapter {0}")]
    MissingCredential(String),
}

impl EngineConfig {
    /// Resolve from CLI args, falling back to environment variables via
    /// the `env` attributes above (`SCENARIO_PATH`, `SCENARIO_ADAPTER`,
    /// `SCENARIO_CREDENTIAL`, `SCENARIO_BIND`).
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let adapter: AdapterKind = cli
            .adapter
            .parse()
            .map_err(|_| ConfigError::UnsupportedAdapter(cli.adapter.clone()))?;

        if cli.credential.trim().is_empty() || cli.credential == PLACEHOLDER_CREDENTIAL {
            return Err(ConfigError::MissingCredential(cli.adapter.clone()));
        }

        Ok(EngineConfig {
            scenario_path: cli.scenario,
            adapter,
            credential: cli.credential,
            bind: cli.bind,
        })
    }

    /// Override of `OPEN_AGENT_BASE_URL`-style env-first resolution,
    /// generalized: any explicit value loses to an environment override
    /// when one is present.
    pub fn resolve_env_override(name: &str, explicit: Option<&str>, default: &str) -> String {
        if let Ok(val) = env::var(name) {
            return val;
        }
        explicit.unwrap_or(default).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(adapter: &str, credential: &str) -> Cli {
        Cli {
            scenario: PathBuf::from("scenario.json"),
            adapter: adapter.to_string(),
            credential: credential.to_string(),
            bind: "127.0.0.1:8080".to_string(),
        }
    }

    #[test]
    fn unsupported_adapter_is_a_fatal_config_error() {
        let err = EngineConfig::from_cli(cli("carrier-pigeon", "real-token")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedAdapter(_)));
    }

    #[test]
    fn placeholder_credential_is_a_fatal_config_error() {
        let err = EngineConfig::from_cli(cli("webhook", "TOKEN")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential(_)));
    }

    #[test]
    fn valid_config_resolves() {
        let config = EngineConfig::from_cli(cli("memory", "real-token")).unwrap();
        assert_eq!(config.credential, "real-token");
    }

    #[test]
    fn env_override_wins_over_explicit_value() {
        // SAFETY: test-local environment variable, isolated to this process.
        unsafe {
            env::set_var("SCENARIO_ENGINE_TEST_OVERRIDE", "from-env");
        }
        let resolved = EngineConfig::resolve_env_override(
            "SCENARIO_ENGINE_TEST_OVERRIDE",
            Some("from-explicit"),
            "from-default",
        );
        assert_eq!(resolved, "from-env");
        // SAFETY: cleaning up the same test-local variable set above.
        unsafe {
            env::remove_var("SCENARIO_ENGINE_TEST_OVERRIDE");
        }
    }
}
