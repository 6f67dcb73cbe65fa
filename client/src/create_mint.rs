use anchor_client::{Client, Cluster};
use anyhow::Result;
use rand::rngs::OsRng;
use solana_sdk::{
    instruction::Instruction, program_pack::Pack, pubkey::Pubkey, signature::Keypair,
    signer::Signer, system_instruction,
};
use spl_token_2022::state::Mint;
use tracing::info;

use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::read_keypair_file,
};

pub fn create_mint(config: &Config) -> Result<Pubkey> {
    let payer = read_keypair_file(&config.global.payer_path)?;
    let rpc_client = rpc_client(config);

    let authority = payer.pubkey();
    let mint = Keypair::generate(&mut OsRng);
    let create_and_init_instr =
        create_and_init_mint_instr(config, &payer, &mint.pubkey(), &authority, 0)?;

    let txn = signed_txn(&rpc_client, &create_and_init_instr, &payer, vec![&payer, &mint])?;
    let signature = send_txn(&rpc_client, &txn, true)?;
    info!(mint = %mint.pubkey(), %signature, "mint created");

    Ok(mint.pubkey())
}

pub fn create_and_init_mint_instr(
    config: &Config,
    payer: &Keypair,
    mint_key: &Pubkey,
    mint_authority: &Pubkey,
    decimals: u8,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(spl_token_2022::id())?;

    let space = Mint::LEN;

    let mut instructions = vec![system_instruction::create_account(
        &program.payer(),
        mint_key,
        program
            .rpc()
            .get_minimum_balance_for_rent_exemption(space)?,
        space as u64,
        &program.id(),
    )];

    instructions.push(spl_token_2022::instruction::initialize_mint(
        &program.id(),
        mint_key,
        mint_authority,
        None,
        decimals,
    )?);

    Ok(instructions)
}
