use anyhow::Result;
use solana_client::{rpc_client::RpcClient, rpc_config::RpcSendTransactionConfig};
use solana_sdk::{
    commitment_config::CommitmentConfig, instruction::Instruction, signature::Keypair,
    signature::Signature, signer::Signer, transaction::Transaction,
};
use tracing::debug;

use crate::config::Config;

pub fn send_txn(client: &RpcClient, txn: &Transaction, wait_confirm: bool) -> Result<Signature> {
    let commitment = if wait_confirm {
        CommitmentConfig::confirmed()
    } else {
        CommitmentConfig::processed()
    };
    let signature = client.send_and_confirm_transaction_with_spinner_and_config(
        txn,
        commitment,
        RpcSendTransactionConfig {
            skip_preflight: true,
            ..RpcSendTransactionConfig::default()
        },
    )?;
    debug!(%signature, "transaction landed");
    Ok(signature)
}

/// Signs `instructions` with `payer` as fee payer against the latest blockhash.
pub fn signed_txn(
    client: &RpcClient,
    instructions: &[Instruction],
    payer: &Keypair,
    signers: Vec<&Keypair>,
) -> Result<Transaction> {
    let recent_hash = client.get_latest_blockhash()?;
    Ok(Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &signers,
        recent_hash,
    ))
}

/// RPC client reading at `confirmed`, so accounts written by `send_txn` are visible at once.
pub fn rpc_client(config: &Config) -> RpcClient {
    RpcClient::new_with_commitment(
        config.global.http_url.to_string(),
        CommitmentConfig::confirmed(),
    )
}
