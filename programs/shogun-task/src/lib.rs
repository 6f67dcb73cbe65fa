use anchor_lang::prelude::*;
pub mod instructions;

pub use instructions::*;

declare_id!("ELsxP11QYREU4RDadUZS5DXEPPjaqwa4csursWD6aeL6");

#[program]
pub mod shogun_task {
    use super::*;

    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        instructions::initialize::handler(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::solana_program::hash::hash;
    use anchor_lang::{InstructionData, ToAccountMetas};

    fn sighash(name: &str) -> [u8; 8] {
        let mut out = [0u8; 8];
        out.copy_from_slice(&hash(format!("global:{}", name).as_bytes()).to_bytes()[..8]);
        out
    }

    #[test]
    fn declared_id_matches_deployment_key() {
        let expected: Pubkey = "ELsxP11QYREU4RDadUZS5DXEPPjaqwa4csursWD6aeL6"
            .parse()
            .unwrap();
        assert_eq!(ID, expected);
        assert_eq!(id(), expected);
    }

    #[test]
    fn initialize_data_is_bare_discriminator() {
        let data = crate::instruction::Initialize.data();
        assert_eq!(data, sighash("initialize").to_vec());
    }

    #[test]
    fn initialize_takes_no_accounts() {
        let metas = crate::accounts::Initialize {}.to_account_metas(None);
        assert!(metas.is_empty());
    }

    #[test]
    fn dispatch_runs_initialize() {
        let data = crate::instruction::Initialize.data();
        assert!(entry(&ID, &[], &data).is_ok());
    }

    #[test]
    fn dispatch_rejects_foreign_program_id() {
        let data = crate::instruction::Initialize.data();
        assert!(entry(&Pubkey::new_unique(), &[], &data).is_err());
    }

    #[test]
    fn dispatch_rejects_short_or_unknown_data() {
        assert!(entry(&ID, &[], &[1, 2, 3]).is_err());
        assert!(entry(&ID, &[], &sighash("finalize")).is_err());
    }
}
