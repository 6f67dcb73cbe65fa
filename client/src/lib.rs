pub mod config;
pub mod create_mint;
pub mod create_pool;
pub mod create_token_account;
pub mod decrease_liquidity;
pub mod increase_liquidity;
pub mod initialize;
pub mod mint_to;
pub mod position;
pub mod rpc;
pub mod solend;
pub mod utils;

pub use create_mint::*;
pub use create_pool::*;
pub use create_token_account::*;
pub use decrease_liquidity::*;
pub use increase_liquidity::*;
pub use initialize::*;
pub use mint_to::*;
pub use solend::*;
