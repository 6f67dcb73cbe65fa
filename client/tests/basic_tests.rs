//! Runs against a local validator with shogun-task and Raydium CLMM deployed:
//! `cargo test -p client -- --ignored --test-threads=1`.

use client::{
    config::Config, create_mint, create_pool, create_token_account, decrease_liquidity,
    increase_liquidity, initialize, mint_to_token_account, DecreaseOutcome,
};
use std::path::PathBuf;

/// Helper function to load the test configuration file.
/// Assumes that "tests/config_test.toml" exists relative to the crate root.
fn load_config() -> Config {
    let mut config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    config_path.push("tests/config_test.toml");
    Config::from_env_or_file(config_path)
        .expect("Failed to load config file. Please ensure the file exists and is valid.")
}

#[test]
fn test_config_file_is_valid() {
    let mut config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    config_path.push("tests/config_test.toml");
    let config = Config::from_file(config_path).expect("Failed to load config file");
    assert_eq!(
        config.global.shogun_task_program_id().unwrap(),
        shogun_task::ID
    );
    assert!(config.global.raydium_program_id().is_ok());
    assert!(config.global.slippage > 0.0 && config.global.slippage < 1.0);
}

#[test]
#[ignore = "requires a local validator"]
fn test_initialize() {
    let config = load_config();
    let signature = initialize(&config).expect("Failed to initialize");
    println!("Your transaction signature {}", signature);

    assert!(!signature.to_string().is_empty(), "Signature should not be empty");
}

/// Test mint creation for Raydium.
#[test]
#[ignore = "requires a local validator"]
fn test_mint_token() {
    let config = load_config();
    let mint = create_mint(&config).expect("Failed to create mint");
    println!("Created mint: {}", mint);

    let mint_str = mint.to_string();
    assert!(!mint_str.is_empty(), "Mint should not be an empty string");
}

/// Test creating a token account for a given mint.
#[test]
#[ignore = "requires a local validator"]
fn test_create_token_account() {
    let config = load_config();
    let mint = create_mint(&config).expect("Failed to create mint");
    let token_account =
        create_token_account(&config, &mint).expect("Failed to create token account");
    println!("Created token account: {}", token_account);

    assert_ne!(token_account, mint);
}

/// Test minting tokens to a token account.
#[test]
#[ignore = "requires a local validator"]
fn test_mint_to_token_account() {
    let config = load_config();
    let mint = create_mint(&config).expect("Failed to create mint");
    let token_account =
        create_token_account(&config, &mint).expect("Failed to create token account");

    mint_to_token_account(&config, &mint, &token_account, 1000)
        .expect("Failed to mint to token account");

    println!("Minted tokens to token account: {}", token_account);
}

fn funded_pool(config: &Config, amount: u64) -> solana_sdk::pubkey::Pubkey {
    let mint1 = create_mint(config).expect("Failed to create mint");
    let token_account1 =
        create_token_account(config, &mint1).expect("Failed to create token account");

    let mint2 = create_mint(config).expect("Failed to create mint");
    let token_account2 =
        create_token_account(config, &mint2).expect("Failed to create token account");

    mint_to_token_account(config, &mint1, &token_account1, amount)
        .expect("Failed to mint to token account");
    mint_to_token_account(config, &mint2, &token_account2, amount)
        .expect("Failed to mint to token account");

    create_pool(config, 0, 10.0, mint1, mint2, 0).expect("Failed to create pool")
}

/// Test creating a new pool.
#[test]
#[ignore = "requires a local validator"]
fn test_create_pool() {
    let config = load_config();
    let pool = funded_pool(&config, 1000);

    println!("Created pool: {}", pool);
    assert_ne!(pool, solana_sdk::pubkey::Pubkey::default());
}

/// Test increasing and decreasing liquidity in a pool.
#[test]
#[ignore = "requires a local validator"]
fn test_liquidity_operations() {
    let config = load_config();
    let pool = funded_pool(&config, 100_000);

    let tick_lower_price = 1.0;
    let tick_upper_price = 100.0;
    let input_amount = 100;

    // First call opens the position, the second tops it up.
    for _ in 0..2 {
        increase_liquidity(
            &config,
            tick_lower_price,
            tick_upper_price,
            true,
            input_amount,
            pool,
            config.global.slippage,
        )
        .expect("Failed to increase liquidity");
    }

    let outcome = decrease_liquidity(
        &config,
        tick_lower_price,
        tick_upper_price,
        Some(10),
        pool,
        config.global.slippage,
    )
    .expect("Failed to decrease liquidity");
    assert_eq!(outcome, DecreaseOutcome::Decreased { liquidity: 10 });

    // Removing the rest closes the position.
    let outcome = decrease_liquidity(
        &config,
        tick_lower_price,
        tick_upper_price,
        None,
        pool,
        config.global.slippage,
    )
    .expect("Failed to decrease liquidity");
    assert!(matches!(outcome, DecreaseOutcome::Closed { .. }));

    let outcome = decrease_liquidity(
        &config,
        tick_lower_price,
        tick_upper_price,
        None,
        pool,
        config.global.slippage,
    )
    .expect("Failed to query closed position");
    assert_eq!(outcome, DecreaseOutcome::PositionNotFound);
}
