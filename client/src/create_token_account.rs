use anchor_client::{Client, Cluster};
use anyhow::Result;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use tracing::info;

use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::read_keypair_file,
};

/// Creates the payer's associated Token-2022 account for `mint`.
pub fn create_token_account(config: &Config, mint: &Pubkey) -> Result<Pubkey> {
    let payer = read_keypair_file(&config.global.payer_path)?;
    let rpc_client = rpc_client(config);

    let create_ata_instr = create_ata_token_account_instr(config, &payer, mint, &payer.pubkey())?;

    let txn = signed_txn(&rpc_client, &create_ata_instr, &payer, vec![&payer])?;
    let signature = send_txn(&rpc_client, &txn, true)?;

    let token_account =
        get_associated_token_address_with_program_id(&payer.pubkey(), mint, &spl_token_2022::id());
    info!(%mint, %token_account, %signature, "token account created");

    Ok(token_account)
}

pub fn create_ata_token_account_instr(
    config: &Config,
    payer: &Keypair,
    mint: &Pubkey,
    owner: &Pubkey,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(spl_token_2022::id())?;
    let instructions = program
        .request()
        .instruction(
            spl_associated_token_account::instruction::create_associated_token_account(
                &program.payer(),
                owner,
                mint,
                &spl_token_2022::id(),
            ),
        )
        .instructions()?;
    Ok(instructions)
}
