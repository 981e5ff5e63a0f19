//! Application configuration loaded from environment variables.

use crate::errors::{ApiError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Chain-bridge JSON-RPC endpoint; anchoring is disabled when unset
    pub chain_rpc_url: Option<String>,
    /// Address of the supply-chain contract the bridge wraps
    pub contract_address: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let chain_rpc_url = env_var("CHAIN_RPC_URL").ok();
        let contract_address = env_var("CONTRACT_ADDRESS").ok();

        // The bridge needs both or neither; half a configuration is a
        // deployment mistake, not a disabled bridge.
        if chain_rpc_url.is_some() != contract_address.is_some() {
            return Err(ApiError::Config(
                "CHAIN_RPC_URL and CONTRACT_ADDRESS must be set together".to_string(),
            ));
        }

        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./pharmatrace.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ApiError::Config("Invalid API_PORT".to_string()))?,
            chain_rpc_url,
            contract_address,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ApiError::Config(format!("Missing env var: {key}")))
}
