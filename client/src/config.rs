use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::fs;
use std::path::Path;

/// Environment variable naming the cluster RPC endpoint, as set by `anchor test`.
pub const PROVIDER_URL_ENV: &str = "ANCHOR_PROVIDER_URL";
/// Environment variable naming the wallet keypair file, as set by `anchor test`.
pub const WALLET_ENV: &str = "ANCHOR_WALLET";

#[derive(Deserialize, Debug, Clone)]
pub struct Global {
    pub http_url: String,
    pub ws_url: String,
    pub payer_path: String,
    pub admin_path: String,
    pub raydium_v3_program: String,
    #[serde(default)]
    pub shogun_task_program: Option<String>,
    pub slippage: f64,
}

impl Global {
    pub fn raydium_program_id(&self) -> Result<Pubkey> {
        self.raydium_v3_program
            .parse()
            .map_err(|e| anyhow!("invalid raydium_v3_program {}: {}", self.raydium_v3_program, e))
    }

    /// Falls back to the id the program declares when the config leaves it unset.
    pub fn shogun_task_program_id(&self) -> Result<Pubkey> {
        match &self.shogun_task_program {
            Some(key) => key
                .parse()
                .map_err(|e| anyhow!("invalid shogun_task_program {}: {}", key, e)),
            None => Ok(shogun_task::ID),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub global: Global,
}

impl Config {
    /// Loads and parses the configuration from a TOML file at the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Loads the file, then lets the Anchor provider variables override it.
    pub fn from_env_or_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `ANCHOR_PROVIDER_URL` and `ANCHOR_WALLET` when `lookup` yields them.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(PROVIDER_URL_ENV).filter(|v| !v.is_empty()) {
            self.global.ws_url = websocket_url_for(&url);
            self.global.http_url = url;
        }
        if let Some(wallet) = lookup(WALLET_ENV).filter(|v| !v.is_empty()) {
            self.global.payer_path = wallet;
        }
    }
}

/// Derives the pubsub endpoint from an RPC endpoint: `http` becomes `ws` and an
/// explicit port is bumped by one, matching how the validator binds them.
pub fn websocket_url_for(http_url: &str) -> String {
    let ws = if let Some(rest) = http_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = http_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        http_url.to_string()
    };

    let (scheme, rest) = match ws.find("://") {
        Some(i) => ws.split_at(i + 3),
        None => ("", ws.as_str()),
    };
    let (authority, path) = match rest.find(|c: char| matches!(c, '/' | '?' | '#')) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => format!("{}{}:{}{}", scheme, host, port.saturating_add(1), path),
            Err(_) => ws.clone(),
        },
        None => ws.clone(),
    }
}
