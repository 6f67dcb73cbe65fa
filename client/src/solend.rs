use anyhow::{Context, Result};
use solana_sdk::{program_pack::Pack, pubkey::Pubkey};
use solend_sdk::state::LendingMarket;
use tracing::debug;

use crate::{config::Config, rpc::rpc_client};

/// Reads and unpacks a Solend lending market account.
pub fn fetch_lending_market(config: &Config, lending_market: &Pubkey) -> Result<LendingMarket> {
    let rpc = rpc_client(config);

    let data = rpc
        .get_account_data(lending_market)
        .with_context(|| format!("failed to fetch lending market {}", lending_market))?;
    debug!(%lending_market, len = data.len(), "lending market account loaded");

    LendingMarket::unpack(&data)
        .with_context(|| format!("account {} is not a lending market", lending_market))
}
