use anchor_client::{Client, Cluster};
use anchor_lang::prelude::AccountMeta;
use anyhow::{Context, Result};
use rand::rngs::OsRng;
use raydium_amm_v3::accounts as raydium_accounts;
use raydium_amm_v3::instruction as raydium_instruction;
use raydium_amm_v3::libraries::{liquidity_math, tick_math};
use raydium_amm_v3::states::PoolState;
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction, instruction::Instruction, pubkey::Pubkey,
    signature::Keypair, signer::Signer, system_program, sysvar,
};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use tracing::info;

use crate::position::{
    find_personal_position, personal_position_address, protocol_position_address,
    tick_array_address, TickRange,
};
use crate::utils::{amount_with_slippage, get_pool_mints_inverse_fee, get_tick_array_bitmap};
use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::read_keypair_file,
};

/// Token metadata program, required by `OpenPositionV2` even without metadata.
pub const METADATA_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bWg8ETxkS");

const OPEN_POSITION_COMPUTE_UNITS: u32 = 1_400_000;

/// Accounts shared by the open and increase instructions.
pub struct PoolAccounts {
    pub pool: Pubkey,
    pub token_vault_0: Pubkey,
    pub token_vault_1: Pubkey,
    pub token_mint_0: Pubkey,
    pub token_mint_1: Pubkey,
    pub user_token_account_0: Pubkey,
    pub user_token_account_1: Pubkey,
}

/// Adds `input_amount` of one side to the payer's position in `pool_pubkey`.
///
/// When the payer holds no position for the price range a new one is opened
/// under a fresh NFT mint, otherwise the existing position is topped up.
pub fn increase_liquidity(
    config: &Config,
    tick_lower_price: f64,
    tick_upper_price: f64,
    is_base_0: bool,
    input_amount: u64,
    pool_pubkey: Pubkey,
    slippage: f64,
) -> Result<()> {
    let payer = read_keypair_file(&config.global.payer_path)?;

    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, &payer);
    let rpc_client = rpc_client(config);

    let program = client.program(config.global.raydium_program_id()?)?;
    let program_pubkey = program.id();

    let pool: PoolState = program.account(pool_pubkey)?;
    let range = TickRange::from_prices(&pool, tick_lower_price, tick_upper_price)?;

    let tick_lower_price_x64 = tick_math::get_sqrt_price_at_tick(range.tick_lower_index)?;
    let tick_upper_price_x64 = tick_math::get_sqrt_price_at_tick(range.tick_upper_index)?;
    let liquidity = if is_base_0 {
        liquidity_math::get_liquidity_from_single_amount_0(
            pool.sqrt_price_x64,
            tick_lower_price_x64,
            tick_upper_price_x64,
            input_amount,
        )
    } else {
        liquidity_math::get_liquidity_from_single_amount_1(
            pool.sqrt_price_x64,
            tick_lower_price_x64,
            tick_upper_price_x64,
            input_amount,
        )
    };
    let (amount_0, amount_1) = liquidity_math::get_delta_amounts_signed(
        pool.tick_current,
        pool.sqrt_price_x64,
        range.tick_lower_index,
        range.tick_upper_index,
        i128::try_from(liquidity).context("liquidity exceeds i128")?,
    )?;
    let amount_0_with_slippage = amount_with_slippage(amount_0, slippage, true);
    let amount_1_with_slippage = amount_with_slippage(amount_1, slippage, true);
    let transfer_fee = get_pool_mints_inverse_fee(
        &rpc_client,
        pool.token_mint_0,
        pool.token_mint_1,
        amount_0_with_slippage,
        amount_1_with_slippage,
    )?;
    let amount_0_max = amount_0_with_slippage
        .checked_add(transfer_fee.0.transfer_fee)
        .context("amount_0_max overflows u64")?;
    let amount_1_max = amount_1_with_slippage
        .checked_add(transfer_fee.1.transfer_fee)
        .context("amount_1_max overflows u64")?;
    info!(
        liquidity,
        amount_0_max,
        amount_1_max,
        tick_lower = range.tick_lower_index,
        tick_upper = range.tick_upper_index,
        "increasing liquidity"
    );

    let accounts = PoolAccounts {
        pool: pool_pubkey,
        token_vault_0: pool.token_vault_0,
        token_vault_1: pool.token_vault_1,
        token_mint_0: pool.token_mint_0,
        token_mint_1: pool.token_mint_1,
        user_token_account_0: get_associated_token_address_with_program_id(
            &payer.pubkey(),
            &pool.token_mint_0,
            &transfer_fee.0.owner,
        ),
        user_token_account_1: get_associated_token_address_with_program_id(
            &payer.pubkey(),
            &pool.token_mint_1,
            &transfer_fee.1.owner,
        ),
    };
    let tickarray_bitmap_extension = get_tick_array_bitmap(
        &pool.amm_config,
        &pool.token_mint_0,
        &pool.token_mint_1,
        &program_pubkey,
    );
    let remaining_accounts = vec![AccountMeta::new(tickarray_bitmap_extension, false)];

    let existing = find_personal_position(
        &rpc_client,
        &payer.pubkey(),
        &pool_pubkey,
        &range,
        &program_pubkey,
    )?;

    let nft_mint = Keypair::generate(&mut OsRng);
    let mut instructions = Vec::new();
    let mut signers = vec![&payer];
    match existing {
        Some((position, nft_info)) => {
            info!(position = %nft_info.position, "adding to existing position");
            instructions.extend(increase_liquidity_instr(
                config,
                &payer,
                &accounts,
                position.nft_mint,
                nft_info.key,
                remaining_accounts,
                liquidity,
                amount_0_max,
                amount_1_max,
                &range,
            )?);
        }
        None => {
            info!(nft_mint = %nft_mint.pubkey(), "opening new position");
            instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
                OPEN_POSITION_COMPUTE_UNITS,
            ));
            instructions.extend(open_position_instr(
                config,
                &payer,
                &accounts,
                nft_mint.pubkey(),
                payer.pubkey(),
                remaining_accounts,
                liquidity,
                amount_0_max,
                amount_1_max,
                &range,
                false,
            )?);
            signers.push(&nft_mint);
        }
    }

    let txn = signed_txn(&rpc_client, &instructions, &payer, signers)?;
    let signature = send_txn(&rpc_client, &txn, true)?;
    info!(%signature, pool = %pool_pubkey, "liquidity increased");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn open_position_instr(
    config: &Config,
    payer: &Keypair,
    accounts: &PoolAccounts,
    nft_mint_key: Pubkey,
    nft_to_owner: Pubkey,
    remaining_accounts: Vec<AccountMeta>,
    liquidity: u128,
    amount_0_max: u64,
    amount_1_max: u64,
    range: &TickRange,
    with_metadata: bool,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(config.global.raydium_program_id()?)?;
    let nft_ata_token_account = get_associated_token_address_with_program_id(
        &program.payer(),
        &nft_mint_key,
        &spl_token::id(),
    );
    let (metadata_account_key, _bump) = Pubkey::find_program_address(
        &[
            b"metadata",
            METADATA_PROGRAM_ID.to_bytes().as_ref(),
            nft_mint_key.to_bytes().as_ref(),
        ],
        &METADATA_PROGRAM_ID,
    );

    let instructions = program
        .request()
        .accounts(raydium_accounts::OpenPositionV2 {
            payer: program.payer(),
            position_nft_owner: nft_to_owner,
            position_nft_mint: nft_mint_key,
            position_nft_account: nft_ata_token_account,
            metadata_account: metadata_account_key,
            pool_state: accounts.pool,
            protocol_position: protocol_position_address(
                &accounts.pool,
                range.tick_lower_index,
                range.tick_upper_index,
                &program.id(),
            ),
            tick_array_lower: tick_array_address(
                &accounts.pool,
                range.tick_array_lower_start_index,
                &program.id(),
            ),
            tick_array_upper: tick_array_address(
                &accounts.pool,
                range.tick_array_upper_start_index,
                &program.id(),
            ),
            personal_position: personal_position_address(&nft_mint_key, &program.id()),
            token_account_0: accounts.user_token_account_0,
            token_account_1: accounts.user_token_account_1,
            token_vault_0: accounts.token_vault_0,
            token_vault_1: accounts.token_vault_1,
            rent: sysvar::rent::id(),
            system_program: system_program::id(),
            token_program: spl_token::id(),
            associated_token_program: spl_associated_token_account::id(),
            metadata_program: METADATA_PROGRAM_ID,
            token_program_2022: spl_token_2022::id(),
            vault_0_mint: accounts.token_mint_0,
            vault_1_mint: accounts.token_mint_1,
        })
        .accounts(remaining_accounts)
        .args(raydium_instruction::OpenPositionV2 {
            liquidity,
            amount_0_max,
            amount_1_max,
            tick_lower_index: range.tick_lower_index,
            tick_upper_index: range.tick_upper_index,
            tick_array_lower_start_index: range.tick_array_lower_start_index,
            tick_array_upper_start_index: range.tick_array_upper_start_index,
            with_metadata,
            base_flag: None,
        })
        .instructions()?;
    Ok(instructions)
}

#[allow(clippy::too_many_arguments)]
pub fn increase_liquidity_instr(
    config: &Config,
    payer: &Keypair,
    accounts: &PoolAccounts,
    nft_mint_key: Pubkey,
    nft_token_key: Pubkey,
    remaining_accounts: Vec<AccountMeta>,
    liquidity: u128,
    amount_0_max: u64,
    amount_1_max: u64,
    range: &TickRange,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(config.global.raydium_program_id()?)?;
    let instructions = program
        .request()
        .accounts(raydium_accounts::IncreaseLiquidityV2 {
            nft_owner: program.payer(),
            nft_account: nft_token_key,
            pool_state: accounts.pool,
            protocol_position: protocol_position_address(
                &accounts.pool,
                range.tick_lower_index,
                range.tick_upper_index,
                &program.id(),
            ),
            personal_position: personal_position_address(&nft_mint_key, &program.id()),
            tick_array_lower: tick_array_address(
                &accounts.pool,
                range.tick_array_lower_start_index,
                &program.id(),
            ),
            tick_array_upper: tick_array_address(
                &accounts.pool,
                range.tick_array_upper_start_index,
                &program.id(),
            ),
            token_account_0: accounts.user_token_account_0,
            token_account_1: accounts.user_token_account_1,
            token_vault_0: accounts.token_vault_0,
            token_vault_1: accounts.token_vault_1,
            token_program: spl_token::id(),
            token_program_2022: spl_token_2022::id(),
            vault_0_mint: accounts.token_mint_0,
            vault_1_mint: accounts.token_mint_1,
        })
        .accounts(remaining_accounts)
        .args(raydium_instruction::IncreaseLiquidityV2 {
            liquidity,
            amount_0_max,
            amount_1_max,
            base_flag: None,
        })
        .instructions()?;
    Ok(instructions)
}
