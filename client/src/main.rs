use anyhow::Result;
use client::{self, config::Config, DecreaseOutcome};

use clap::{Parser, Subcommand};

use solana_sdk::pubkey::Pubkey;
use tracing::info;

/// Top-level struct for parsing command-line arguments.
///
/// The `Args` struct holds global options (like the configuration file)
/// and a subcommand which groups specific commands (e.g., Shogun, Raydium or Solend).
#[derive(Debug, Parser)]
#[command(author, version, about = "CLI for the shogun-task program and its Raydium and Solend tooling", long_about = None)]
pub struct Args {
    /// Global configuration file path. This option allows you to specify
    /// a TOML file that contains configuration details. `ANCHOR_PROVIDER_URL`
    /// and `ANCHOR_WALLET` override the endpoint and payer it names.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Choose a subcommand to execute.
    #[command(subcommand)]
    pub subcommand: Subcommands,
}

/// Subcommands grouping for the CLI.
///
/// You can extend this enum with additional groups as needed.
#[derive(Debug, Subcommand)]
pub enum Subcommands {
    /// Operations on the shogun-task program.
    #[command(subcommand, name = "shogun")]
    ShogunSubcommands(ShogunSubcommands),

    /// Raydium-related operations.
    #[command(subcommand, name = "raydium")]
    RaydiumSubcommands(RaydiumSubcommands),

    /// Solend-related operations.
    #[command(subcommand, name = "solend")]
    SolendSubcommands(SolendSubcommands),
}

/// Subcommands under the Shogun category.
///
/// These call instructions of the shogun-task program itself.
#[derive(Debug, Subcommand)]
pub enum ShogunSubcommands {
    /// Call the program's `initialize` instruction and print the signature.
    Initialize,
}

/// Subcommands under the Raydium category.
///
/// Each variant represents a specific operation. The `--help` flag will
/// show descriptions for each command and its parameters.
#[derive(Debug, Subcommand)]
pub enum RaydiumSubcommands {
    /// Mint a new token.
    MintToken,

    /// Create a token account for the specified mint.
    CreateTokenAccount {
        /// The public key of the mint for which to create an account.
        mint: Pubkey,
    },

    /// Mint tokens to an existing token account.
    MintToTokenAccount {
        /// The public key of the mint.
        mint: Pubkey,
        /// The target token account's public key.
        token_account: Pubkey,
        /// The amount of tokens to mint.
        amount: u64,
    },

    /// Increase liquidity in a pool by specifying the price range and input amount.
    IncreaseLiquidity {
        /// Lower bound of the tick price.
        tick_lower_price: f64,
        /// Upper bound of the tick price.
        tick_upper_price: f64,
        /// Input amount used for liquidity.
        input_amount: u64,
        /// The public key of the liquidity pool.
        pool_pubkey: Pubkey,
        /// Allowed slippage when adding liquidity.
        slippage: f64,
        /// Treat the input amount as token1 instead of token0.
        #[arg(long)]
        base_1: bool,
    },

    /// Decrease liquidity from a pool by specifying the price range and liquidity.
    DecreaseLiquidity {
        /// Lower bound of the tick price.
        tick_lower_price: f64,
        /// Upper bound of the tick price.
        tick_upper_price: f64,
        /// The public key of the liquidity pool.
        pool_pubkey: Pubkey,
        /// Allowed slippage when removing liquidity.
        slippage: f64,
        /// Optional liquidity parameter to remove. If not provided, all liquidity is removed.
        liquidity: Option<u128>,
    },

    /// Create a new pool using the provided parameters.
    CreatePool {
        /// Configuration index for the pool.
        config_index: u16,
        /// Initial price for the pool.
        price: f64,
        /// The public key of the first token's mint.
        mint0: Pubkey,
        /// The public key of the second token's mint.
        mint1: Pubkey,
        /// Open time for the pool (optional, defaults to 0).
        #[arg(short, long, default_value_t = 0)]
        open_time: u64,
    },

    /// Create two mints with funded token accounts, ready for `create-pool`.
    Bootstrap {
        /// Amount minted into each token account.
        #[arg(short, long, default_value_t = 100_000)]
        amount: u64,
    },
}

/// Subcommands under the Solend category.
///
/// This enum can be extended as additional Solend operations become available.
#[derive(Debug, Subcommand)]
pub enum SolendSubcommands {
    /// Print a lending market account.
    LendingMarket {
        /// The lending market's public key.
        market: Pubkey,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// The main entry point of the CLI application.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    // The file provides defaults; the Anchor provider variables win when set.
    let config = Config::from_env_or_file(&args.config)?;
    info!(rpc = %config.global.http_url, "loaded {}", args.config);

    match args.subcommand {
        Subcommands::ShogunSubcommands(subcommand) => {
            process_shogun_subcommands(subcommand, &config)
        }
        Subcommands::RaydiumSubcommands(subcommand) => {
            process_raydium_subcommands(subcommand, &config)
        }
        Subcommands::SolendSubcommands(subcommand) => {
            process_solend_subcommands(subcommand, &config)
        }
    }
}

fn process_shogun_subcommands(subcommand: ShogunSubcommands, config: &Config) -> Result<()> {
    match subcommand {
        ShogunSubcommands::Initialize => {
            let signature = client::initialize(config)?;
            println!("Your transaction signature {}", signature);
        }
    }
    Ok(())
}

fn process_solend_subcommands(subcommand: SolendSubcommands, config: &Config) -> Result<()> {
    match subcommand {
        SolendSubcommands::LendingMarket { market } => {
            let lending_market = client::fetch_lending_market(config, &market)?;
            println!("Lending Market: {:#?}", lending_market);
        }
    }
    Ok(())
}

fn process_raydium_subcommands(subcommand: RaydiumSubcommands, config: &Config) -> Result<()> {
    match subcommand {
        RaydiumSubcommands::MintToken => {
            let mint = client::create_mint(config)?;
            println!("Mint: {}", mint);
        }
        RaydiumSubcommands::CreateTokenAccount { mint } => {
            let token_account = client::create_token_account(config, &mint)?;
            println!("Token Account: {}", token_account);
        }
        RaydiumSubcommands::MintToTokenAccount {
            mint,
            token_account,
            amount,
        } => {
            client::mint_to_token_account(config, &mint, &token_account, amount)?;
            println!("Minted {} tokens to account: {}", amount, token_account);
        }
        RaydiumSubcommands::IncreaseLiquidity {
            tick_lower_price,
            tick_upper_price,
            input_amount,
            pool_pubkey,
            slippage,
            base_1,
        } => {
            client::increase_liquidity(
                config,
                tick_lower_price,
                tick_upper_price,
                !base_1,
                input_amount,
                pool_pubkey,
                slippage,
            )?;
            println!("Increased liquidity in pool: {}", pool_pubkey);
        }
        RaydiumSubcommands::DecreaseLiquidity {
            tick_lower_price,
            tick_upper_price,
            liquidity,
            pool_pubkey,
            slippage,
        } => {
            match client::decrease_liquidity(
                config,
                tick_lower_price,
                tick_upper_price,
                liquidity,
                pool_pubkey,
                slippage,
            )? {
                DecreaseOutcome::Decreased { liquidity } => {
                    println!("Decreased liquidity by {} in pool: {}", liquidity, pool_pubkey)
                }
                DecreaseOutcome::Closed { liquidity } => println!(
                    "Removed all {} liquidity and closed position in pool: {}",
                    liquidity, pool_pubkey
                ),
                DecreaseOutcome::PositionNotFound => {
                    println!("Position doesn't exist in pool: {}", pool_pubkey)
                }
            }
        }
        RaydiumSubcommands::CreatePool {
            config_index,
            price,
            mint0,
            mint1,
            open_time,
        } => {
            let pool = client::create_pool(config, config_index, price, mint0, mint1, open_time)?;
            println!("Pool created: {}", pool);
        }
        RaydiumSubcommands::Bootstrap { amount } => {
            let mint1 = client::create_mint(config)?;
            let token_account1 = client::create_token_account(config, &mint1)?;

            let mint2 = client::create_mint(config)?;
            let token_account2 = client::create_token_account(config, &mint2)?;

            client::mint_to_token_account(config, &mint1, &token_account1, amount)?;
            client::mint_to_token_account(config, &mint2, &token_account2, amount)?;

            println!("Mint1: {}", mint1);
            println!("Token Account1: {}", token_account1);
            println!("Mint2: {}", mint2);
            println!("Token Account2: {}", token_account2);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_shogun_initialize_with_default_config() {
        let args = Args::try_parse_from(["client", "shogun", "initialize"]).unwrap();
        assert_eq!(args.config, "config.toml");
        assert!(matches!(
            args.subcommand,
            Subcommands::ShogunSubcommands(ShogunSubcommands::Initialize)
        ));
    }

    #[test]
    fn parses_decrease_without_liquidity() {
        let pool = Pubkey::new_unique();
        let pool_arg = pool.to_string();
        let args = Args::try_parse_from([
            "client",
            "-c",
            "local.toml",
            "raydium",
            "decrease-liquidity",
            "1.0",
            "100.0",
            pool_arg.as_str(),
            "0.01",
        ])
        .unwrap();
        assert_eq!(args.config, "local.toml");
        match args.subcommand {
            Subcommands::RaydiumSubcommands(RaydiumSubcommands::DecreaseLiquidity {
                pool_pubkey,
                liquidity,
                ..
            }) => {
                assert_eq!(pool_pubkey, pool);
                assert_eq!(liquidity, None);
            }
            other => panic!("unexpected subcommand {:?}", other),
        }
    }

    #[test]
    fn bootstrap_amount_defaults() {
        let args = Args::try_parse_from(["client", "raydium", "bootstrap"]).unwrap();
        assert!(matches!(
            args.subcommand,
            Subcommands::RaydiumSubcommands(RaydiumSubcommands::Bootstrap { amount: 100_000 })
        ));
    }

    #[test]
    fn rejects_malformed_pubkey() {
        assert!(Args::try_parse_from(["client", "solend", "lending-market", "nope"]).is_err());
    }
}
