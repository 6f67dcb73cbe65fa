use anchor_client::{Client, Cluster};
use anchor_lang::prelude::AccountMeta;
use anyhow::{bail, Context, Result};
use raydium_amm_v3::accounts as raydium_accounts;
use raydium_amm_v3::instruction as raydium_instruction;
use raydium_amm_v3::libraries::liquidity_math;
use raydium_amm_v3::states::PoolState;
use solana_sdk::system_program;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer};
use spl_associated_token_account::{
    get_associated_token_address, get_associated_token_address_with_program_id,
};
use tracing::{info, warn};

use crate::position::{
    find_personal_position, personal_position_address, protocol_position_address,
    tick_array_address, TickRange,
};
use crate::utils::{amount_with_slippage, get_pool_mints_transfer_fee, get_tick_array_bitmap};
use crate::{
    config::Config,
    rpc::{rpc_client, send_txn, signed_txn},
    utils::read_keypair_file,
};

/// What `decrease_liquidity` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecreaseOutcome {
    /// Part of the position was withdrawn.
    Decreased { liquidity: u128 },
    /// Everything was withdrawn and the position NFT burned.
    Closed { liquidity: u128 },
    /// The payer holds no position for the requested range.
    PositionNotFound,
}

/// Liquidity to withdraw: the requested amount, or everything when unset.
pub fn liquidity_to_remove(requested: Option<u128>, position_liquidity: u128) -> Result<u128> {
    let liquidity = requested.unwrap_or(position_liquidity);
    if liquidity > position_liquidity {
        bail!(
            "cannot remove {} liquidity, position only holds {}",
            liquidity,
            position_liquidity
        );
    }
    Ok(liquidity)
}

/// Signed liquidity delta for withdrawing `liquidity`.
pub fn withdrawal_delta(liquidity: u128) -> Result<i128> {
    i128::try_from(liquidity)
        .context("liquidity exceeds i128")?
        .checked_neg()
        .context("liquidity delta overflows i128")
}

/// Minimum acceptable output for a withdrawal of `amount`.
pub fn min_amount_out(amount: u64, slippage: f64, transfer_fee: u64) -> Result<u64> {
    amount_with_slippage(amount, slippage, false)
        .checked_sub(transfer_fee)
        .context("transfer fee exceeds withdrawal amount")
}

pub fn decrease_liquidity(
    config: &Config,
    tick_lower_price: f64,
    tick_upper_price: f64,
    liquidity: Option<u128>,
    pool_pubkey: Pubkey,
    slippage: f64,
) -> Result<DecreaseOutcome> {
    let payer = read_keypair_file(&config.global.payer_path)?;

    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, &payer);
    let rpc_client = rpc_client(config);

    let program = client.program(config.global.raydium_program_id()?)?;
    let program_pubkey = program.id();

    let pool: PoolState = program.account(pool_pubkey)?;
    let range = TickRange::from_prices(&pool, tick_lower_price, tick_upper_price)?;

    let Some((position, nft_info)) = find_personal_position(
        &rpc_client,
        &payer.pubkey(),
        &pool_pubkey,
        &range,
        &program_pubkey,
    )?
    else {
        warn!(pool = %pool_pubkey, "position doesn't exist");
        return Ok(DecreaseOutcome::PositionNotFound);
    };
    info!(position = %nft_info.position, liquidity = position.liquidity, "found position");

    let mut reward_vault_with_user_vault: Vec<Pubkey> = Vec::new();
    for item in pool.reward_infos.into_iter() {
        if item.token_mint != Pubkey::default() {
            reward_vault_with_user_vault.push(item.token_vault);
            reward_vault_with_user_vault.push(get_associated_token_address(
                &payer.pubkey(),
                &item.token_mint,
            ));
            reward_vault_with_user_vault.push(item.token_mint);
        }
    }

    let liquidity = liquidity_to_remove(liquidity, position.liquidity)?;
    let (amount_0, amount_1) = liquidity_math::get_delta_amounts_signed(
        pool.tick_current,
        pool.sqrt_price_x64,
        range.tick_lower_index,
        range.tick_upper_index,
        withdrawal_delta(liquidity)?,
    )?;
    let transfer_fee = get_pool_mints_transfer_fee(
        &rpc_client,
        pool.token_mint_0,
        pool.token_mint_1,
        amount_with_slippage(amount_0, slippage, false),
        amount_with_slippage(amount_1, slippage, false),
    )?;
    let amount_0_min = min_amount_out(amount_0, slippage, transfer_fee.0.transfer_fee)?;
    let amount_1_min = min_amount_out(amount_1, slippage, transfer_fee.1.transfer_fee)?;

    let tickarray_bitmap_extension = get_tick_array_bitmap(
        &pool.amm_config,
        &pool.token_mint_0,
        &pool.token_mint_1,
        &program_pubkey,
    );
    let mut remaining_accounts = vec![AccountMeta::new(tickarray_bitmap_extension, false)];
    remaining_accounts.extend(
        reward_vault_with_user_vault
            .into_iter()
            .map(|item| AccountMeta::new(item, false)),
    );

    let mut decrease_instr = decrease_liquidity_instr(
        config,
        &payer,
        pool_pubkey,
        pool.token_vault_0,
        pool.token_vault_1,
        pool.token_mint_0,
        pool.token_mint_1,
        position.nft_mint,
        nft_info.key,
        get_associated_token_address_with_program_id(
            &payer.pubkey(),
            &pool.token_mint_0,
            &transfer_fee.0.owner,
        ),
        get_associated_token_address_with_program_id(
            &payer.pubkey(),
            &pool.token_mint_1,
            &transfer_fee.1.owner,
        ),
        remaining_accounts,
        liquidity,
        amount_0_min,
        amount_1_min,
        &range,
    )?;
    let closes = liquidity == position.liquidity;
    if closes {
        decrease_instr.extend(close_personal_position_instr(
            config,
            &payer,
            position.nft_mint,
            nft_info.key,
            nft_info.program,
        )?);
    }

    let txn = signed_txn(&rpc_client, &decrease_instr, &payer, vec![&payer])?;
    let signature = send_txn(&rpc_client, &txn, true)?;
    info!(%signature, liquidity, closes, "liquidity decreased");

    Ok(if closes {
        DecreaseOutcome::Closed { liquidity }
    } else {
        DecreaseOutcome::Decreased { liquidity }
    })
}

#[allow(clippy::too_many_arguments)]
pub fn decrease_liquidity_instr(
    config: &Config,
    payer: &Keypair,
    pool_account_key: Pubkey,
    token_vault_0: Pubkey,
    token_vault_1: Pubkey,
    token_mint_0: Pubkey,
    token_mint_1: Pubkey,
    nft_mint_key: Pubkey,
    nft_token_key: Pubkey,
    user_token_account_0: Pubkey,
    user_token_account_1: Pubkey,
    remaining_accounts: Vec<AccountMeta>,
    liquidity: u128,
    amount_0_min: u64,
    amount_1_min: u64,
    range: &TickRange,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(config.global.raydium_program_id()?)?;
    let instructions = program
        .request()
        .accounts(raydium_accounts::DecreaseLiquidityV2 {
            nft_owner: program.payer(),
            nft_account: nft_token_key,
            personal_position: personal_position_address(&nft_mint_key, &program.id()),
            pool_state: pool_account_key,
            protocol_position: protocol_position_address(
                &pool_account_key,
                range.tick_lower_index,
                range.tick_upper_index,
                &program.id(),
            ),
            token_vault_0,
            token_vault_1,
            tick_array_lower: tick_array_address(
                &pool_account_key,
                range.tick_array_lower_start_index,
                &program.id(),
            ),
            tick_array_upper: tick_array_address(
                &pool_account_key,
                range.tick_array_upper_start_index,
                &program.id(),
            ),
            recipient_token_account_0: user_token_account_0,
            recipient_token_account_1: user_token_account_1,
            token_program: spl_token::id(),
            token_program_2022: spl_token_2022::id(),
            memo_program: spl_memo::id(),
            vault_0_mint: token_mint_0,
            vault_1_mint: token_mint_1,
        })
        .accounts(remaining_accounts)
        .args(raydium_instruction::DecreaseLiquidityV2 {
            liquidity,
            amount_0_min,
            amount_1_min,
        })
        .instructions()?;
    Ok(instructions)
}

pub fn close_personal_position_instr(
    config: &Config,
    payer: &Keypair,
    nft_mint_key: Pubkey,
    nft_token_key: Pubkey,
    nft_token_program: Pubkey,
) -> Result<Vec<Instruction>> {
    let url = Cluster::Custom(config.global.http_url.clone(), config.global.ws_url.clone());
    let client = Client::new(url, payer);

    let program = client.program(config.global.raydium_program_id()?)?;
    let instructions = program
        .request()
        .accounts(raydium_accounts::ClosePosition {
            nft_owner: program.payer(),
            position_nft_mint: nft_mint_key,
            position_nft_account: nft_token_key,
            personal_position: personal_position_address(&nft_mint_key, &program.id()),
            system_program: system_program::id(),
            token_program: nft_token_program,
        })
        .args(raydium_instruction::ClosePosition)
        .instructions()?;
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_liquidity_removes_everything() {
        assert_eq!(liquidity_to_remove(None, 500).unwrap(), 500);
        assert_eq!(liquidity_to_remove(Some(10), 500).unwrap(), 10);
        assert_eq!(liquidity_to_remove(Some(500), 500).unwrap(), 500);
    }

    #[test]
    fn removing_more_than_the_position_holds_is_rejected() {
        assert!(liquidity_to_remove(Some(501), 500).is_err());
        assert!(liquidity_to_remove(Some(u128::MAX), 500).is_err());
    }

    #[test]
    fn withdrawal_delta_is_negative() {
        assert_eq!(withdrawal_delta(0).unwrap(), 0);
        assert_eq!(withdrawal_delta(10).unwrap(), -10);
        assert_eq!(withdrawal_delta(i128::MAX as u128).unwrap(), -i128::MAX);
    }

    #[test]
    fn withdrawal_delta_rejects_liquidity_beyond_i128() {
        // 2^127 would overflow the negation; anything larger would wrap to a deposit.
        assert!(withdrawal_delta(1u128 << 127).is_err());
        assert!(withdrawal_delta((1u128 << 127) + 2).is_err());
        assert!(withdrawal_delta(u128::MAX).is_err());
    }

    #[test]
    fn min_amount_subtracts_slippage_and_fee() {
        assert_eq!(min_amount_out(1000, 0.01, 0).unwrap(), 990);
        assert_eq!(min_amount_out(1000, 0.01, 90).unwrap(), 900);
    }

    #[test]
    fn fee_larger_than_amount_is_rejected() {
        assert!(min_amount_out(10, 0.0, 11).is_err());
    }
}
