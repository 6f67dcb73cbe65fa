use anyhow::Result;
use raydium_amm_v3::libraries::tick_math;
use raydium_amm_v3::states::{
    PersonalPositionState, PoolState, TickArrayState, POSITION_SEED, TICK_ARRAY_SEED,
};
use solana_client::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;

use crate::utils::{
    deserialize_anchor_account, get_all_nft_and_position_by_owner, price_to_sqrt_price_x64,
    tick_with_spacing, PositionNftTokenInfo,
};

/// `getMultipleAccounts` rejects more keys than this per request.
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRange {
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub tick_array_lower_start_index: i32,
    pub tick_array_upper_start_index: i32,
}

impl TickRange {
    pub fn from_ticks(tick_lower: i32, tick_upper: i32, tick_spacing: u16) -> Self {
        let tick_lower_index = tick_with_spacing(tick_lower, tick_spacing.into());
        let tick_upper_index = tick_with_spacing(tick_upper, tick_spacing.into());
        Self {
            tick_lower_index,
            tick_upper_index,
            tick_array_lower_start_index: TickArrayState::get_array_start_index(
                tick_lower_index,
                tick_spacing,
            ),
            tick_array_upper_start_index: TickArrayState::get_array_start_index(
                tick_upper_index,
                tick_spacing,
            ),
        }
    }

    /// Converts human prices into the pool's spaced tick range.
    pub fn from_prices(pool: &PoolState, tick_lower_price: f64, tick_upper_price: f64) -> Result<Self> {
        let tick_lower_price_x64 =
            price_to_sqrt_price_x64(tick_lower_price, pool.mint_decimals_0, pool.mint_decimals_1);
        let tick_upper_price_x64 =
            price_to_sqrt_price_x64(tick_upper_price, pool.mint_decimals_0, pool.mint_decimals_1);
        Ok(Self::from_ticks(
            tick_math::get_tick_at_sqrt_price(tick_lower_price_x64)?,
            tick_math::get_tick_at_sqrt_price(tick_upper_price_x64)?,
            pool.tick_spacing,
        ))
    }
}

pub fn personal_position_address(nft_mint: &Pubkey, raydium_v3_program: &Pubkey) -> Pubkey {
    let (key, _bump) = Pubkey::find_program_address(
        &[POSITION_SEED.as_bytes(), nft_mint.to_bytes().as_ref()],
        raydium_v3_program,
    );
    key
}

pub fn protocol_position_address(
    pool: &Pubkey,
    tick_lower_index: i32,
    tick_upper_index: i32,
    raydium_v3_program: &Pubkey,
) -> Pubkey {
    let (key, _bump) = Pubkey::find_program_address(
        &[
            POSITION_SEED.as_bytes(),
            pool.to_bytes().as_ref(),
            &tick_lower_index.to_be_bytes(),
            &tick_upper_index.to_be_bytes(),
        ],
        raydium_v3_program,
    );
    key
}

pub fn tick_array_address(pool: &Pubkey, start_index: i32, raydium_v3_program: &Pubkey) -> Pubkey {
    let (key, _bump) = Pubkey::find_program_address(
        &[
            TICK_ARRAY_SEED.as_bytes(),
            pool.to_bytes().as_ref(),
            &start_index.to_be_bytes(),
        ],
        raydium_v3_program,
    );
    key
}

/// Finds the owner's position in `pool` covering exactly `range`, with the NFT backing it.
pub fn find_personal_position(
    rpc_client: &RpcClient,
    owner: &Pubkey,
    pool: &Pubkey,
    range: &TickRange,
    raydium_v3_program: &Pubkey,
) -> Result<Option<(PersonalPositionState, PositionNftTokenInfo)>> {
    let position_nft_infos =
        get_all_nft_and_position_by_owner(rpc_client, owner, raydium_v3_program)?;

    for nft_infos in position_nft_infos.chunks(MAX_MULTIPLE_ACCOUNTS) {
        let keys: Vec<Pubkey> = nft_infos.iter().map(|item| item.position).collect();
        let rsps = rpc_client.get_multiple_accounts(&keys)?;
        for (rsp, nft_info) in rsps.into_iter().zip(nft_infos) {
            let Some(rsp) = rsp else {
                continue;
            };
            let position = deserialize_anchor_account::<PersonalPositionState>(&rsp)?;
            if position.pool_id == *pool
                && position.tick_lower_index == range.tick_lower_index
                && position.tick_upper_index == range.tick_upper_index
            {
                return Ok(Some((position, nft_info.clone())));
            }
        }
    }
    Ok(None)
}
