//! The collection-based NFT voter plugin.
//!
//! Weight comes from [`crate::nft_power`] over the voter's current assets; the
//! record instructions target the plugin's Anchor program.

use std::sync::Arc ;
use async_trait::async_trait ;
use borsh::BorshSerialize ;
use sha2::{ Digest, Sha256 };
use solana_instruction::{ AccountMeta, Instruction };
use solana_pubkey::Pubkey ;
use tracing::debug ;

use crate::asset::AssetResolver ;
use crate::cache::Freshness ;
use crate::chain_reader::ChainReader ;
use crate::governance::SYSTEM_PROGRAM_ID ;
use crate::nft_power::{ compute_vote_power, resolve_eligible_assets };
use crate::plugin::{ Capabilities, PluginError, VoterContext, VoterWeightAction, VoterWeightPlugin };
use crate::registrar::{ Registrar, registrar_address };
use crate::settings::Settings ;
use crate::weight::VoteWeight ;



pub const VOTER_WEIGHT_RECORD_SEED: &[u8] = b"voter-weight-record";

/// Anchor instruction discriminator: `sha256("global:<name>")[..8]`.
pub fn instruction_discriminator( name: &str ) -> [u8; 8] {
    let hash = Sha256::digest( format!( "global:{}", name ).as_bytes() );
    let mut discriminator = [ 0u8 ; 8 ];
    discriminator.copy_from_slice( &hash[..8] );
    discriminator
}

/// Voter weight record PDA of `owner` for `(realm, mint)` under `program_id`.
pub fn voter_weight_record_address( realm: &Pubkey, mint: &Pubkey, owner: &Pubkey, program_id: &Pubkey ) -> Pubkey {
    Pubkey::find_program_address(
        &[ VOTER_WEIGHT_RECORD_SEED, realm.as_ref(), mint.as_ref(), owner.as_ref() ],
        program_id,
    ).0
}

fn anchor_data( name: &str, args: &impl BorshSerialize ) -> Result<Vec<u8>, PluginError> {
    let mut data = instruction_discriminator( name ).to_vec();
    args.serialize( &mut data ).map_err(| err | PluginError::Other( err.to_string() ))?;
    Ok( data )
}

/// NFT voter plugin bound to one realm's registrar.
pub struct NftVoterPlugin {
    program_id: Pubkey,
    registrar: Arc<Registrar>,
    reader: Arc<dyn ChainReader>,
    assets: AssetResolver,
    settings: Arc<Settings>,
    asset_freshness: Freshness,
}

impl NftVoterPlugin {

    pub fn new(
        program_id: Pubkey,
        registrar: Arc<Registrar>,
        reader: Arc<dyn ChainReader>,
        assets: AssetResolver,
        settings: Arc<Settings>,
    ) -> Self {
        Self { program_id, registrar, reader, assets, settings, asset_freshness: Freshness::UntilInvalidated }
    }

    /// Lets weight reads use a TTL asset snapshot. Only for display-only figures.
    pub fn with_asset_freshness( mut self, freshness: Freshness ) -> Self {
        self.asset_freshness = freshness ;
        self
    }

    #[inline] pub fn program_id( &self ) -> &Pubkey { &self.program_id }
    #[inline] pub fn registrar( &self ) -> &Registrar { &self.registrar }

    /// Ids of the voter's assets that currently carry voting power.
    ///
    /// # Errors
    /// Propagates asset source failures.
    pub async fn eligible_asset_ids( &self, owner: &Pubkey ) -> Result<Vec<Pubkey>, PluginError> {
        let assets = self.assets.assets_by_owner( owner, Freshness::UntilInvalidated ).await?;
        Ok( resolve_eligible_assets( &assets, &self.registrar, owner, &self.settings )
            .into_iter()
            .map(| asset | asset.id )
            .collect())
    }

    fn registrar_address( &self, ctx: &VoterContext ) -> Pubkey {
        registrar_address( &ctx.realm, &ctx.mint, &self.program_id )
    }

    fn record_address( &self, ctx: &VoterContext ) -> Pubkey {
        voter_weight_record_address( &ctx.realm, &ctx.mint, &ctx.wallet, &self.program_id )
    }

}

#[async_trait]
impl VoterWeightPlugin for NftVoterPlugin {

    fn requires_input_voter_weight( &self ) -> bool { false }

    fn capabilities( &self ) -> Capabilities { Capabilities::ALL }

    async fn create_record_instructions( &self, ctx: &VoterContext ) -> Result<Vec<Instruction>, PluginError> {
        let record = self.record_address( ctx );
        if self.reader.fetch_account( &record ).await?.is_some() {
            debug!( wallet = %ctx.wallet, %record, "voter weight record already exists" );
            return Ok( Vec::new() );
        }

        Ok( vec![ Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new_readonly( self.registrar_address( ctx ), false ),
                AccountMeta::new( record, false ),
                AccountMeta::new( ctx.wallet, true ),
                AccountMeta::new_readonly( SYSTEM_PROGRAM_ID, false ),
            ],
            data: anchor_data( "create_voter_weight_record", &ctx.wallet )?,
        }])
    }

    async fn update_record_instructions( &self, ctx: &VoterContext, action: VoterWeightAction ) -> Result<Vec<Instruction>, PluginError> {
        let eligible = self.eligible_asset_ids( &ctx.wallet ).await?;
        let accounts = [
            AccountMeta::new_readonly( self.registrar_address( ctx ), false ),
            AccountMeta::new( self.record_address( ctx ), false ),
        ].into_iter()
            .chain( eligible.into_iter().map(| id | AccountMeta::new_readonly( id, false )))
            .collect();

        Ok( vec![ Instruction {
            program_id: self.program_id,
            accounts,
            data: anchor_data( "update_voter_weight_record", &action )?,
        }])
    }

    async fn voter_weight( &self, ctx: &VoterContext, _input: Option<VoteWeight> ) -> Result<VoteWeight, PluginError> {
        let assets = self.assets.assets_by_owner( &ctx.wallet, self.asset_freshness ).await?;
        let eligible = resolve_eligible_assets( &assets, &self.registrar, &ctx.wallet, &self.settings );
        debug!( wallet = %ctx.wallet, held = assets.len(), eligible = eligible.len(), "resolved nft voting power" );
        Ok( compute_vote_power( &eligible, &self.registrar )? )
    }

}

impl std::fmt::Debug for NftVoterPlugin {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "NftVoterPlugin" )
            .field( "program_id", &self.program_id )
            .field( "collections", &self.registrar.collection_configs.len() )
            .finish_non_exhaustive()
    }
}
