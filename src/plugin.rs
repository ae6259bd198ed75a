//! Voter weight plugins and their descriptors.
//!
//! A realm configures an ordered list of plugin program ids per governing mint.
//! Each id resolves to a [`PluginDescriptor`] whose [`PluginKind`] is a closed set:
//!
//! - [`PluginKind::NftCollection`]: the collection-based NFT voter, resolved locally.
//! - [`PluginKind::External`]: a caller-registered [`VoterWeightPlugin`].
//! - [`PluginKind::PassThrough`]: an unknown program id. It contributes no weight
//! 	and builds no instructions; the running total flows past it unchanged.

use std::sync::Arc ;
use async_trait::async_trait ;
use borsh::{ BorshDeserialize, BorshSerialize };
use solana_instruction::Instruction ;
use solana_pubkey::Pubkey ;
use thiserror::Error ;

use crate::chain_reader::FetchError ;
use crate::nft_voter::NftVoterPlugin ;
use crate::weight::{ VoteWeight, WeightOverflow };



/// Failure inside a single plugin.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum PluginError {
    #[error( "Fetch error: {0}" )] Fetch( #[from] FetchError ),
    #[error( "{0}" )] WeightOverflow( #[from] WeightOverflow ),
    /// The plugin needs the weight of the plugins before it but none was supplied.
    #[error( "Plugin requires an input voter weight" )] MissingInput,
    #[error( "{0}" )] Other( String ),
}

/// The voter a plugin operation is performed for.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub struct VoterContext {
    pub realm: Pubkey,
    pub mint: Pubkey,
    pub wallet: Pubkey,
    /// Governance program owning the realm.
    pub governance_program_id: Pubkey,
}

impl VoterContext {
    pub fn new( realm: Pubkey, mint: Pubkey, wallet: Pubkey, governance_program_id: Pubkey ) -> Self {
        Self { realm, mint, wallet, governance_program_id }
    }
}

/// What a plugin is able to do.
#[derive( Debug, Default, Clone, Copy, PartialEq, Eq )]
pub struct Capabilities {
    pub create_record: bool,
    pub update_record: bool,
    pub contribute_weight: bool,
}

impl Capabilities {

    pub const NONE: Self = Self { create_record: false, update_record: false, contribute_weight: false };
    pub const ALL: Self = Self { create_record: true, update_record: true, contribute_weight: true };

}

/// The governance action a voter weight record is refreshed for.
#[derive( BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum VoterWeightAction {
    CastVote,
    CommentProposal,
    CreateGovernance,
    CreateProposal,
    SignOffProposal,
}

/// A voter weight plugin as seen from the client.
///
/// Implementations only read chain state and build instructions; they never
/// sign or submit anything.
#[async_trait]
pub trait VoterWeightPlugin: Send + Sync {

    /// Whether this plugin consumes the running total of the plugins before it.
    fn requires_input_voter_weight( &self ) -> bool ;

    fn capabilities( &self ) -> Capabilities ;

    /// Instructions creating the voter's record. Empty if it already exists.
    async fn create_record_instructions( &self, ctx: &VoterContext ) -> Result<Vec<Instruction>, PluginError>;

    /// Instructions refreshing the voter's record for `action`.
    async fn update_record_instructions( &self, ctx: &VoterContext, action: VoterWeightAction ) -> Result<Vec<Instruction>, PluginError>;

    /// The voter's weight. `input` is the running total when
    /// [`requires_input_voter_weight`]( Self::requires_input_voter_weight ) holds.
    async fn voter_weight( &self, ctx: &VoterContext, input: Option<VoteWeight> ) -> Result<VoteWeight, PluginError>;

}

/// How a configured program id is handled.
#[derive( Clone )]
pub enum PluginKind {
    NftCollection( Arc<NftVoterPlugin> ),
    External( Arc<dyn VoterWeightPlugin> ),
    PassThrough,
}

impl std::fmt::Debug for PluginKind {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        match self {
            Self::NftCollection( plugin ) => f.debug_tuple( "NftCollection" ).field( plugin ).finish(),
            Self::External( _ ) => f.write_str( "External" ),
            Self::PassThrough => f.write_str( "PassThrough" ),
        }
    }
}

/// One resolved entry of a plugin chain.
///
/// Built fresh for every `(realm, mint, wallet)` resolution and never persisted.
#[derive( Debug, Clone )]
pub struct PluginDescriptor {
    program_id: Pubkey,
    position: usize,
    kind: PluginKind,
}

impl PluginDescriptor {

    pub fn new( program_id: Pubkey, position: usize, kind: PluginKind ) -> Self {
        Self { program_id, position, kind }
    }

    #[inline] pub fn program_id( &self ) -> &Pubkey { &self.program_id }
    /// Index in the realm's configured order.
    #[inline] pub fn position( &self ) -> usize { self.position }
    #[inline] pub fn kind( &self ) -> &PluginKind { &self.kind }

    /// The plugin implementation, `None` for pass-through entries.
    pub fn plugin( &self ) -> Option<&dyn VoterWeightPlugin> {
        match &self.kind {
            PluginKind::NftCollection( plugin ) => Some( plugin.as_ref() ),
            PluginKind::External( plugin ) => Some( plugin.as_ref() ),
            PluginKind::PassThrough => None,
        }
    }

    pub fn requires_input_voter_weight( &self ) -> bool {
        self.plugin().is_some_and(| plugin | plugin.requires_input_voter_weight() )
    }

    pub fn capabilities( &self ) -> Capabilities {
        self.plugin().map_or( Capabilities::NONE, | plugin | plugin.capabilities() )
    }

}
