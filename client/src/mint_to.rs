use anchor_client::{Client, Cluster};
use anyhow::Result;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer};
use tracing::info;

use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::read_keypair_file,
};

pub fn mint_to_token_account(
    config: &Config,
    mint: &Pubkey,
    token_account: &Pubkey,
    amount: u64,
) -> Result<()> {
    let payer = read_keypair_file(&config.global.payer_path)?;
    let rpc_client = rpc_client(config);

    let mint_to_instr =
        spl_token_mint_to_instr(config, &payer, mint, token_account, amount, &payer)?;

    let txn = signed_txn(&rpc_client, &mint_to_instr, &payer, vec![&payer])?;
    let signature = send_txn(&rpc_client, &txn, true)?;
    info!(%mint, %token_account, amount, %signature, "minted");

    Ok(())
}

pub fn spl_token_mint_to_instr(
    config: &Config,
    payer: &Keypair,
    mint: &Pubkey,
    token_account: &Pubkey,
    amount: u64,
    mint_authority: &Keypair,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(spl_token_2022::id())?;

    let instructions = program
        .request()
        .instruction(spl_token_2022::instruction::mint_to(
            &program.id(),
            mint,
            token_account,
            &mint_authority.pubkey(),
            &[],
            amount,
        )?)
        .signer(mint_authority)
        .instructions()?;
    Ok(instructions)
}
