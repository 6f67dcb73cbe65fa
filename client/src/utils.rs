use std::env;

use anchor_lang::AccountDeserialize;
use anyhow::{anyhow, Context, Result};
use raydium_amm_v3::states::{POOL_SEED, POOL_TICK_ARRAY_BITMAP_SEED, POSITION_SEED};
use solana_account_decoder::{parse_token::TokenAccountType, UiAccountData};
use solana_client::{rpc_client::RpcClient, rpc_request::TokenAccountsFilter};
use solana_sdk::{account::Account, pubkey::Pubkey, signature::Keypair};
use spl_token_2022::{
    extension::{
        transfer_fee::{TransferFeeConfig, MAX_FEE_BASIS_POINTS},
        BaseState, BaseStateWithExtensions, StateWithExtensions,
    },
    state::Mint,
};

const Q64: u128 = (u64::MAX as u128) + 1; // 2^64

pub fn multipler(decimals: u8) -> f64 {
    10_f64.powi(decimals as i32)
}

pub fn price_to_x64(price: f64) -> u128 {
    (price * Q64 as f64) as u128
}

pub fn price_to_sqrt_price_x64(price: f64, decimals_0: u8, decimals_1: u8) -> u128 {
    let price_with_decimals = price * multipler(decimals_1) / multipler(decimals_0);
    price_to_x64(price_with_decimals.sqrt())
}

/// Snaps `tick` onto the pool's spacing grid, rounding towards negative infinity.
pub fn tick_with_spacing(tick: i32, tick_spacing: i32) -> i32 {
    let mut compressed = tick / tick_spacing;
    if tick < 0 && tick % tick_spacing != 0 {
        compressed -= 1;
    }
    compressed * tick_spacing
}

/// `round_up` widens a maximum (deposits), otherwise narrows a minimum (withdrawals).
pub fn amount_with_slippage(amount: u64, slippage: f64, round_up: bool) -> u64 {
    if round_up {
        (amount as f64 * (1_f64 + slippage)).ceil() as u64
    } else {
        (amount as f64 * (1_f64 - slippage)).floor() as u64
    }
}

pub fn read_keypair_file(s: &str) -> Result<Keypair> {
    let expanded = if s.starts_with("~") {
        let home = env::var("HOME").map_err(|_| anyhow!("HOME environment variable is not set"))?;
        s.replacen("~", &home, 1)
    } else {
        s.to_string()
    };
    solana_sdk::signature::read_keypair_file(&expanded)
        .map_err(|e| anyhow!("failed to read keypair from {}: {}", expanded, e))
}

pub fn deserialize_anchor_account<T: AccountDeserialize>(account: &Account) -> Result<T> {
    let mut data: &[u8] = &account.data;
    T::try_deserialize(&mut data).map_err(Into::into)
}

pub fn get_tick_array_bitmap(
    amm_config: &Pubkey,
    mint0: &Pubkey,
    mint1: &Pubkey,
    raydium_v3_program: &Pubkey,
) -> Pubkey {
    let (pool, _) = Pubkey::find_program_address(
        &[
            POOL_SEED.as_bytes(),
            amm_config.to_bytes().as_ref(),
            mint0.to_bytes().as_ref(),
            mint1.to_bytes().as_ref(),
        ],
        raydium_v3_program,
    );
    let (bitmap, _) = Pubkey::find_program_address(
        &[POOL_TICK_ARRAY_BITMAP_SEED.as_bytes(), pool.to_bytes().as_ref()],
        raydium_v3_program,
    );
    bitmap
}

#[derive(Debug, Clone)]
pub struct TransferFeeInfo {
    pub mint: Pubkey,
    /// Token program owning the mint.
    pub owner: Pubkey,
    pub transfer_fee: u64,
}

pub fn get_transfer_fee<S: BaseState>(
    account_state: &StateWithExtensions<'_, S>,
    epoch: u64,
    pre_fee_amount: u64,
) -> u64 {
    match account_state.get_extension::<TransferFeeConfig>() {
        Ok(transfer_fee_config) => transfer_fee_config
            .calculate_epoch_fee(epoch, pre_fee_amount)
            .unwrap_or(0),
        Err(_) => 0,
    }
}

/// Fee to add on top of `post_fee_amount` so that amount arrives after the transfer.
pub fn get_transfer_inverse_fee<S: BaseState>(
    account_state: &StateWithExtensions<'_, S>,
    epoch: u64,
    post_fee_amount: u64,
) -> u64 {
    match account_state.get_extension::<TransferFeeConfig>() {
        Ok(transfer_fee_config) => {
            let transfer_fee = transfer_fee_config.get_epoch_fee(epoch);
            if u16::from(transfer_fee.transfer_fee_basis_points) == MAX_FEE_BASIS_POINTS {
                u64::from(transfer_fee.maximum_fee)
            } else {
                transfer_fee_config
                    .calculate_inverse_epoch_fee(epoch, post_fee_amount)
                    .unwrap_or(0)
            }
        }
        Err(_) => 0,
    }
}

fn load_pool_mints(
    rpc_client: &RpcClient,
    mint0: Pubkey,
    mint1: Pubkey,
) -> Result<(Account, Account, u64)> {
    let rsps = rpc_client.get_multiple_accounts(&[mint0, mint1])?;
    let epoch = rpc_client.get_epoch_info()?.epoch;
    let mut rsps = rsps.into_iter();
    let mint0_account = rsps
        .next()
        .flatten()
        .with_context(|| format!("mint {} not found", mint0))?;
    let mint1_account = rsps
        .next()
        .flatten()
        .with_context(|| format!("mint {} not found", mint1))?;
    Ok((mint0_account, mint1_account, epoch))
}

pub fn get_pool_mints_transfer_fee(
    rpc_client: &RpcClient,
    mint0: Pubkey,
    mint1: Pubkey,
    pre_fee_amount_0: u64,
    pre_fee_amount_1: u64,
) -> Result<(TransferFeeInfo, TransferFeeInfo)> {
    let (mint0_account, mint1_account, epoch) = load_pool_mints(rpc_client, mint0, mint1)?;
    let mint0_state = StateWithExtensions::<Mint>::unpack(&mint0_account.data)?;
    let mint1_state = StateWithExtensions::<Mint>::unpack(&mint1_account.data)?;
    Ok((
        TransferFeeInfo {
            mint: mint0,
            owner: mint0_account.owner,
            transfer_fee: get_transfer_fee(&mint0_state, epoch, pre_fee_amount_0),
        },
        TransferFeeInfo {
            mint: mint1,
            owner: mint1_account.owner,
            transfer_fee: get_transfer_fee(&mint1_state, epoch, pre_fee_amount_1),
        },
    ))
}

pub fn get_pool_mints_inverse_fee(
    rpc_client: &RpcClient,
    mint0: Pubkey,
    mint1: Pubkey,
    post_fee_amount_0: u64,
    post_fee_amount_1: u64,
) -> Result<(TransferFeeInfo, TransferFeeInfo)> {
    let (mint0_account, mint1_account, epoch) = load_pool_mints(rpc_client, mint0, mint1)?;
    let mint0_state = StateWithExtensions::<Mint>::unpack(&mint0_account.data)?;
    let mint1_state = StateWithExtensions::<Mint>::unpack(&mint1_account.data)?;
    Ok((
        TransferFeeInfo {
            mint: mint0,
            owner: mint0_account.owner,
            transfer_fee: get_transfer_inverse_fee(&mint0_state, epoch, post_fee_amount_0),
        },
        TransferFeeInfo {
            mint: mint1,
            owner: mint1_account.owner,
            transfer_fee: get_transfer_inverse_fee(&mint1_state, epoch, post_fee_amount_1),
        },
    ))
}

#[derive(Debug, Clone)]
pub struct PositionNftTokenInfo {
    /// Token account holding the NFT.
    pub key: Pubkey,
    /// Token program owning that account.
    pub program: Pubkey,
    pub position: Pubkey,
    pub mint: Pubkey,
    pub amount: u64,
    pub decimals: u8,
}

pub fn get_all_nft_and_position_by_owner(
    client: &RpcClient,
    owner: &Pubkey,
    raydium_amm_v3_program: &Pubkey,
) -> Result<Vec<PositionNftTokenInfo>> {
    let mut spl_nfts =
        get_nft_account_and_position_by_owner(client, owner, spl_token::id(), raydium_amm_v3_program)?;
    let spl_2022_nfts = get_nft_account_and_position_by_owner(
        client,
        owner,
        spl_token_2022::id(),
        raydium_amm_v3_program,
    )?;
    spl_nfts.extend(spl_2022_nfts);
    Ok(spl_nfts)
}

pub fn get_nft_account_and_position_by_owner(
    client: &RpcClient,
    owner: &Pubkey,
    token_program: Pubkey,
    raydium_amm_v3_program: &Pubkey,
) -> Result<Vec<PositionNftTokenInfo>> {
    let all_tokens =
        client.get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(token_program))?;
    let mut position_nft_accounts = Vec::new();
    for keyed_account in all_tokens {
        let UiAccountData::Json(parsed_account) = keyed_account.account.data else {
            continue;
        };
        if parsed_account.program != "spl-token" && parsed_account.program != "spl-token-2022" {
            continue;
        }
        let Ok(TokenAccountType::Account(ui_token_account)) =
            serde_json::from_value(parsed_account.parsed)
        else {
            continue;
        };
        let token_amount: u64 = ui_token_account.token_amount.amount.parse()?;
        if ui_token_account.token_amount.decimals != 0 || token_amount != 1 {
            continue;
        }
        let mint: Pubkey = ui_token_account
            .mint
            .parse()
            .map_err(|e| anyhow!("invalid mint {}: {}", ui_token_account.mint, e))?;
        let key: Pubkey = keyed_account
            .pubkey
            .parse()
            .map_err(|e| anyhow!("invalid token account {}: {}", keyed_account.pubkey, e))?;
        let (position, _) = Pubkey::find_program_address(
            &[POSITION_SEED.as_bytes(), mint.to_bytes().as_ref()],
            raydium_amm_v3_program,
        );
        position_nft_accounts.push(PositionNftTokenInfo {
            key,
            program: token_program,
            position,
            mint,
            amount: token_amount,
            decimals: ui_token_account.token_amount.decimals,
        });
    }
    Ok(position_nft_accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipler_scales_by_decimals() {
        assert_eq!(multipler(0), 1.0);
        assert_eq!(multipler(6), 1_000_000.0);
        assert_eq!(multipler(12), 1_000_000_000_000.0);
    }

    #[test]
    fn unit_price_is_q64_one() {
        assert_eq!(price_to_x64(1.0), Q64);
        assert_eq!(price_to_sqrt_price_x64(1.0, 0, 0), Q64);
        assert_eq!(price_to_sqrt_price_x64(4.0, 0, 0), 2 * Q64);
    }

    #[test]
    fn sqrt_price_accounts_for_decimals() {
        // 1 token0 (2 decimals) per token1 (0 decimals) is 0.01 in raw units.
        let ratio = price_to_sqrt_price_x64(1.0, 2, 0) as f64 / Q64 as f64;
        assert!((ratio - 0.1).abs() < 1e-12);
    }

    #[test]
    fn tick_spacing_rounds_down() {
        assert_eq!(tick_with_spacing(25, 10), 20);
        assert_eq!(tick_with_spacing(20, 10), 20);
        assert_eq!(tick_with_spacing(0, 60), 0);
        assert_eq!(tick_with_spacing(-25, 10), -30);
        assert_eq!(tick_with_spacing(-30, 10), -30);
    }

    #[test]
    fn slippage_widens_or_narrows() {
        assert_eq!(amount_with_slippage(1000, 0.01, true), 1010);
        assert_eq!(amount_with_slippage(1000, 0.01, false), 990);
        assert_eq!(amount_with_slippage(999, 0.005, true), 1004);
        assert_eq!(amount_with_slippage(999, 0.005, false), 994);
        assert_eq!(amount_with_slippage(0, 0.5, true), 0);
    }

    #[test]
    fn missing_keypair_is_an_error() {
        let err = read_keypair_file("/nonexistent/id.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/id.json"));
    }

    mod transfer_fee {
        use super::super::*;
        use solana_sdk::program_pack::Pack;
        use spl_token_2022::extension::transfer_fee::TransferFee;
        use spl_token_2022::extension::*;

        fn mint_with_fee(basis_points: u16, maximum_fee: u64) -> Vec<u8> {
            let len =
                ExtensionType::try_calculate_account_len::<Mint>(&[ExtensionType::TransferFeeConfig])
                    .unwrap();
            let mut data = vec![0u8; len];
            let mut state = StateWithExtensionsMut::<Mint>::unpack_uninitialized(&mut data).unwrap();
            let fee = TransferFee {
                epoch: 0.into(),
                maximum_fee: maximum_fee.into(),
                transfer_fee_basis_points: basis_points.into(),
            };
            let config = state.init_extension::<TransferFeeConfig>(true).unwrap();
            config.older_transfer_fee = fee;
            config.newer_transfer_fee = fee;
            state.base = Mint {
                is_initialized: true,
                ..Mint::default()
            };
            state.pack_base();
            state.init_account_type().unwrap();
            data
        }

        fn plain_mint() -> Vec<u8> {
            let mut data = vec![0u8; Mint::LEN];
            Mint::pack(
                Mint {
                    is_initialized: true,
                    ..Mint::default()
                },
                &mut data,
            )
            .unwrap();
            data
        }

        #[test]
        fn forward_fee_follows_basis_points() {
            let data = mint_with_fee(100, 1_000_000);
            let state = StateWithExtensions::<Mint>::unpack(&data).unwrap();
            assert_eq!(get_transfer_fee(&state, 0, 10_000), 100);
            assert_eq!(get_transfer_fee(&state, 0, 0), 0);
        }

        #[test]
        fn forward_fee_is_capped_by_maximum() {
            let data = mint_with_fee(100, 5);
            let state = StateWithExtensions::<Mint>::unpack(&data).unwrap();
            assert_eq!(get_transfer_fee(&state, 0, 10_000), 5);
        }

        #[test]
        fn inverse_fee_restores_post_fee_amount() {
            let data = mint_with_fee(100, 1_000_000);
            let state = StateWithExtensions::<Mint>::unpack(&data).unwrap();
            let fee = get_transfer_inverse_fee(&state, 0, 9_900);
            assert_eq!(fee, 100);
            assert_eq!(get_transfer_fee(&state, 0, 9_900 + fee), fee);
        }

        #[test]
        fn full_basis_points_charge_the_maximum_fee() {
            let data = mint_with_fee(MAX_FEE_BASIS_POINTS, 50);
            let state = StateWithExtensions::<Mint>::unpack(&data).unwrap();
            assert_eq!(get_transfer_inverse_fee(&state, 0, 1_000), 50);
        }

        #[test]
        fn mint_without_extension_charges_nothing() {
            let data = plain_mint();
            let state = StateWithExtensions::<Mint>::unpack(&data).unwrap();
            assert_eq!(get_transfer_fee(&state, 0, 10_000), 0);
            assert_eq!(get_transfer_inverse_fee(&state, 0, 10_000), 0);
        }
    }

    #[test]
    fn bitmap_address_is_deterministic() {
        let program = Pubkey::new_unique();
        let amm_config = Pubkey::new_unique();
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        assert_eq!(
            get_tick_array_bitmap(&amm_config, &a, &b, &program),
            get_tick_array_bitmap(&amm_config, &a, &b, &program)
        );
        assert_ne!(
            get_tick_array_bitmap(&amm_config, &a, &b, &program),
            get_tick_array_bitmap(&amm_config, &b, &a, &program)
        );
    }
}
