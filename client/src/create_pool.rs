use anchor_client::{Client, Cluster};
use anyhow::{Context, Result};
use raydium_amm_v3::accounts as raydium_accounts;
use raydium_amm_v3::instruction as raydium_instruction;
use raydium_amm_v3::{
    libraries::tick_math,
    states::{AMM_CONFIG_SEED, OBSERVATION_SEED, POOL_SEED, POOL_VAULT_SEED},
};
use solana_sdk::{
    instruction::Instruction, program_pack::Pack, pubkey::Pubkey, signature::Keypair,
};
use solana_sdk::{system_program, sysvar};
use tracing::info;

use crate::utils::get_tick_array_bitmap;
use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::{price_to_sqrt_price_x64, read_keypair_file},
};

/// Mints must be passed to the pool in ascending order; swapping them inverts the price.
pub fn order_mints(mint0: Pubkey, mint1: Pubkey, price: f64) -> (Pubkey, Pubkey, f64) {
    if mint0 > mint1 {
        (mint1, mint0, 1.0 / price)
    } else {
        (mint0, mint1, price)
    }
}

pub fn amm_config_address(config_index: u16, raydium_v3_program: &Pubkey) -> Pubkey {
    let (amm_config_key, _bump) = Pubkey::find_program_address(
        &[AMM_CONFIG_SEED.as_bytes(), &config_index.to_be_bytes()],
        raydium_v3_program,
    );
    amm_config_key
}

pub fn pool_address(
    amm_config: &Pubkey,
    mint0: &Pubkey,
    mint1: &Pubkey,
    raydium_v3_program: &Pubkey,
) -> Pubkey {
    let (pool, _bump) = Pubkey::find_program_address(
        &[
            POOL_SEED.as_bytes(),
            amm_config.to_bytes().as_ref(),
            mint0.to_bytes().as_ref(),
            mint1.to_bytes().as_ref(),
        ],
        raydium_v3_program,
    );
    pool
}

pub fn create_pool(
    config: &Config,
    config_index: u16,
    price: f64,
    mint0: Pubkey,
    mint1: Pubkey,
    open_time: u64,
) -> Result<Pubkey> {
    let payer = read_keypair_file(&config.global.payer_path)?;
    let rpc_client = rpc_client(config);
    let raydium_v3_program = config.global.raydium_program_id()?;

    let (mint0, mint1, price) = order_mints(mint0, mint1, price);

    let rsps = rpc_client.get_multiple_accounts(&[mint0, mint1])?;
    let mut rsps = rsps.into_iter();
    let mint0_info = rsps
        .next()
        .flatten()
        .with_context(|| format!("mint {} not found", mint0))?;
    let mint1_info = rsps
        .next()
        .flatten()
        .with_context(|| format!("mint {} not found", mint1))?;
    let mint0_account = spl_token_2022::state::Mint::unpack(&mint0_info.data)?;
    let mint1_account = spl_token_2022::state::Mint::unpack(&mint1_info.data)?;

    let sqrt_price_x64 =
        price_to_sqrt_price_x64(price, mint0_account.decimals, mint1_account.decimals);

    let amm_config_key = amm_config_address(config_index, &raydium_v3_program);
    let tick = tick_math::get_tick_at_sqrt_price(sqrt_price_x64)?;
    info!(tick, price, sqrt_price_x64, %amm_config_key, "creating pool");

    let create_pool_instr = create_pool_instr(
        config,
        &payer,
        amm_config_key,
        mint0,
        mint1,
        mint0_info.owner,
        mint1_info.owner,
        sqrt_price_x64,
        open_time,
    )?;

    let txn = signed_txn(&rpc_client, &create_pool_instr, &payer, vec![&payer])?;
    let signature = send_txn(&rpc_client, &txn, true)?;

    let pool = pool_address(&amm_config_key, &mint0, &mint1, &raydium_v3_program);
    info!(%pool, %signature, "pool created");

    Ok(pool)
}

#[allow(clippy::too_many_arguments)]
pub fn create_pool_instr(
    config: &Config,
    payer: &Keypair,
    amm_config: Pubkey,
    token_mint_0: Pubkey,
    token_mint_1: Pubkey,
    token_program_0: Pubkey,
    token_program_1: Pubkey,
    sqrt_price_x64: u128,
    open_time: u64,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(config.global.raydium_program_id()?)?;

    let pool_account_key = pool_address(&amm_config, &token_mint_0, &token_mint_1, &program.id());
    let (token_vault_0, __bump) = Pubkey::find_program_address(
        &[
            POOL_VAULT_SEED.as_bytes(),
            pool_account_key.to_bytes().as_ref(),
            token_mint_0.to_bytes().as_ref(),
        ],
        &program.id(),
    );
    let (token_vault_1, __bump) = Pubkey::find_program_address(
        &[
            POOL_VAULT_SEED.as_bytes(),
            pool_account_key.to_bytes().as_ref(),
            token_mint_1.to_bytes().as_ref(),
        ],
        &program.id(),
    );
    let (observation_key, __bump) = Pubkey::find_program_address(
        &[
            OBSERVATION_SEED.as_bytes(),
            pool_account_key.to_bytes().as_ref(),
        ],
        &program.id(),
    );

    let tick_array_bitmap =
        get_tick_array_bitmap(&amm_config, &token_mint_0, &token_mint_1, &program.id());

    let instructions = program
        .request()
        .accounts(raydium_accounts::CreatePool {
            pool_creator: program.payer(),
            amm_config,
            pool_state: pool_account_key,
            token_mint_0,
            token_mint_1,
            token_vault_0,
            token_vault_1,
            observation_state: observation_key,
            tick_array_bitmap,
            token_program_0,
            token_program_1,
            system_program: system_program::id(),
            rent: sysvar::rent::id(),
        })
        .args(raydium_instruction::CreatePool {
            sqrt_price_x64,
            open_time,
        })
        .instructions()?;
    Ok(instructions)
}
