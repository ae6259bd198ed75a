//! Token owner records of the governance program.

use borsh::BorshSerialize ;
use solana_instruction::{ AccountMeta, Instruction };
use solana_pubkey::Pubkey ;



pub const GOVERNANCE_SEED: &[u8] = b"governance";

pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([ 0 ; 32 ]);

// Position of `CreateTokenOwnerRecord` in the governance instruction enum.
const CREATE_TOKEN_OWNER_RECORD: u8 = 23 ;

#[derive( BorshSerialize )]
struct CreateTokenOwnerRecordArgs {
    variant: u8,
}

/// Token owner record PDA of `owner` for `(realm, mint)`.
pub fn token_owner_record_address( realm: &Pubkey, mint: &Pubkey, owner: &Pubkey, governance_program_id: &Pubkey ) -> Pubkey {
    Pubkey::find_program_address(
        &[ GOVERNANCE_SEED, realm.as_ref(), mint.as_ref(), owner.as_ref() ],
        governance_program_id,
    ).0
}

/// Creates an empty token owner record for `owner`, paid for by `payer`.
pub fn create_token_owner_record(
    governance_program_id: &Pubkey,
    realm: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    payer: &Pubkey,
) -> Instruction {
    Instruction::new_with_borsh(
        *governance_program_id,
        &CreateTokenOwnerRecordArgs { variant: CREATE_TOKEN_OWNER_RECORD },
        vec![
            AccountMeta::new_readonly( *realm, false ),
            AccountMeta::new_readonly( *owner, false ),
            AccountMeta::new( token_owner_record_address( realm, mint, owner, governance_program_id ), false ),
            AccountMeta::new_readonly( *mint, false ),
            AccountMeta::new( *payer, true ),
            AccountMeta::new_readonly( SYSTEM_PROGRAM_ID, false ),
        ],
    )
}
