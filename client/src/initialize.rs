use anchor_client::{Client, Cluster};
use anyhow::Result;
use solana_sdk::{instruction::Instruction, signature::Keypair, signature::Signature};
use tracing::info;

use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::read_keypair_file,
};

/// Calls `shogun_task::initialize` and returns the transaction signature.
pub fn initialize(config: &Config) -> Result<Signature> {
    let payer = read_keypair_file(&config.global.payer_path)?;
    let rpc_client = rpc_client(config);

    let initialize_instr = initialize_instr(config, &payer)?;

    let txn = signed_txn(&rpc_client, &initialize_instr, &payer, vec![&payer])?;
    let signature = send_txn(&rpc_client, &txn, true)?;
    info!(%signature, "shogun_task initialized");

    Ok(signature)
}

pub fn initialize_instr(config: &Config, payer: &Keypair) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(config.global.shogun_task_program_id()?)?;
    let instructions = program
        .request()
        .accounts(shogun_task::accounts::Initialize {})
        .args(shogun_task::instruction::Initialize)
        .instructions()?;
    Ok(instructions)
}
