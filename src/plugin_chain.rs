//! Validated plugin chains.
//!
//! A [`PluginChain`] is the ordered list of plugins configured for one
//! `(realm, mint)`. Its order is the realm's configured order and is never
//! changed after construction. Weight is a left fold over the chain:
//!
//! - plugins that require an input weight consume the running total of every
//! 	plugin before them (or the base weight when they are first);
//! - independent contributors replace the running total with their own output;
//! - everything else passes the running total through.
//!
//! Any plugin failure aborts the whole operation. No partial weight or partial
//! instruction list is ever returned.

use std::collections::HashMap ;
use futures::future::try_join_all ;
use itertools::Itertools ;
use solana_instruction::Instruction ;
use solana_pubkey::Pubkey ;
use thiserror::Error ;
use tracing::debug ;

use crate::chain_reader::FetchError ;
use crate::plugin::{ PluginDescriptor, PluginError, VoterContext, VoterWeightAction };
use crate::weight::{ VoteWeight, WeightOverflow };



/// The configured chain cannot be evaluated as ordered.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum InconsistentChainState {
    /// The same program is configured more than once, so a plugin would feed itself.
    #[error( "Loop detected: plugin {0} appears more than once in the chain" )]
    LoopDetected( Pubkey ),
    /// Descriptor positions are not strictly increasing.
    #[error( "Plugin {program_id} at position {position} is out of order" )]
    OutOfOrder { program_id: Pubkey, position: usize },
    /// A plugin requiring an input weight has neither a predecessor nor a base weight.
    #[error( "Plugin {program_id} at position {position} requires an input voter weight but none is available" )]
    MissingInputWeight { program_id: Pubkey, position: usize },
}

/// Failure to resolve a plugin chain.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum ChainError {
    #[error( "Fetch error: {0}" )] Fetch( #[from] FetchError ),
    #[error( "Inconsistent chain state: {0}" )] Inconsistent( #[from] InconsistentChainState ),
    #[error( "{0}" )] WeightOverflow( #[from] WeightOverflow ),
    #[error( "Plugin {program_id} failed: {source}" )]
    PluginFailed { program_id: Pubkey, source: PluginError },
    #[error( "Realm {0} not found" )] RealmNotFound( Pubkey ),
    #[error( "Mint {mint} does not govern realm {realm}" )]
    MintNotGoverned { realm: Pubkey, mint: Pubkey },
}

/// The ordered plugins of one `(realm, mint)`.
#[derive( Debug, Clone )]
pub struct PluginChain {
    realm: Pubkey,
    mint: Pubkey,
    plugins: Vec<PluginDescriptor>,
}

impl PluginChain {

    /// Validates and wraps `plugins`, which must be in configured order.
    ///
    /// # Errors
    /// [`InconsistentChainState::LoopDetected`] if a program id repeats and
    /// [`InconsistentChainState::OutOfOrder`] if positions do not increase.
    pub fn new( realm: Pubkey, mint: Pubkey, plugins: Vec<PluginDescriptor> ) -> Result<Self, InconsistentChainState> {

        if let Some( program_id ) = plugins.iter().map( PluginDescriptor::program_id ).duplicates().next() {
            return Err( InconsistentChainState::LoopDetected( *program_id ));
        }

        if let Some(( _, next )) = plugins.iter().tuple_windows().find(|( prev, next )| prev.position() >= next.position() ) {
            return Err( InconsistentChainState::OutOfOrder { program_id: *next.program_id(), position: next.position() });
        }

        Ok( Self { realm, mint, plugins })

    }

    /// A chain with no plugins: the mint uses vanilla deposit weight.
    pub fn empty( realm: Pubkey, mint: Pubkey ) -> Self {
        Self { realm, mint, plugins: Vec::new() }
    }

    #[inline] pub fn realm( &self ) -> &Pubkey { &self.realm }
    #[inline] pub fn mint( &self ) -> &Pubkey { &self.mint }
    #[inline] pub fn plugins( &self ) -> &[PluginDescriptor] { &self.plugins }
    #[inline] pub fn is_empty( &self ) -> bool { self.plugins.is_empty() }
    #[inline] pub fn head( &self ) -> Option<&PluginDescriptor> { self.plugins.first() }

    pub fn head_requires_input( &self ) -> bool {
        self.head().is_some_and( PluginDescriptor::requires_input_voter_weight )
    }

    /// Folds the chain into the voter's weight.
    ///
    /// `base` is the vanilla deposit weight, `None` when the voter has no token
    /// owner record. An empty chain yields `base`, or zero without one.
    ///
    /// # Errors
    /// Any plugin failure, or [`InconsistentChainState::MissingInputWeight`].
    pub async fn compute_weight( &self, ctx: &VoterContext, base: Option<VoteWeight> ) -> Result<VoteWeight, ChainError> {

        let independent = try_join_all( self.plugins.iter()
            .filter(| descriptor | descriptor.capabilities().contribute_weight && !descriptor.requires_input_voter_weight() )
            .filter_map(| descriptor | descriptor.plugin().map(| plugin | ( descriptor, plugin )))
            .map(|( descriptor, plugin )| async move {
                plugin.voter_weight( ctx, None ).await
                    .map(| weight | ( descriptor.position(), weight ))
                    .map_err(| source | plugin_failed( descriptor, source ))
            })
        ).await?
            .into_iter()
            .collect::<HashMap<_, _>>();

        let mut running = base ;
        for descriptor in &self.plugins {
            let Some( plugin ) = descriptor.plugin() else { continue };
            if !descriptor.capabilities().contribute_weight { continue }

            let weight = match descriptor.requires_input_voter_weight() {
                true => {
                    let input = running.ok_or( InconsistentChainState::MissingInputWeight {
                        program_id: *descriptor.program_id(),
                        position: descriptor.position(),
                    })?;
                    plugin.voter_weight( ctx, Some( input )).await.map_err(| source | plugin_failed( descriptor, source ))?
                },
                false => independent.get( &descriptor.position() ).copied().unwrap_or( VoteWeight::ZERO ),
            };
            debug!( plugin = %descriptor.program_id(), position = descriptor.position(), %weight, "folded plugin weight" );
            running = Some( weight );
        }

        Ok( running.unwrap_or( VoteWeight::ZERO ))

    }

    /// Record creation instructions of every capable plugin, in chain order.
    ///
    /// # Errors
    /// The first plugin failure.
    pub async fn build_create_instructions( &self, ctx: &VoterContext ) -> Result<Vec<Instruction>, ChainError> {
        try_join_all( self.plugins.iter()
            .filter(| descriptor | descriptor.capabilities().create_record )
            .filter_map(| descriptor | descriptor.plugin().map(| plugin | ( descriptor, plugin )))
            .map(|( descriptor, plugin )| async move {
                plugin.create_record_instructions( ctx ).await.map_err(| source | plugin_failed( descriptor, source ))
            })
        ).await
            .map(| instructions | instructions.into_iter().flatten().collect())
    }

    /// Record refresh instructions of every capable plugin, in chain order.
    ///
    /// # Errors
    /// The first plugin failure.
    pub async fn build_update_instructions( &self, ctx: &VoterContext, action: VoterWeightAction ) -> Result<Vec<Instruction>, ChainError> {
        try_join_all( self.plugins.iter()
            .filter(| descriptor | descriptor.capabilities().update_record )
            .filter_map(| descriptor | descriptor.plugin().map(| plugin | ( descriptor, plugin )))
            .map(|( descriptor, plugin )| async move {
                plugin.update_record_instructions( ctx, action ).await.map_err(| source | plugin_failed( descriptor, source ))
            })
        ).await
            .map(| instructions | instructions.into_iter().flatten().collect())
    }

}

fn plugin_failed( descriptor: &PluginDescriptor, source: PluginError ) -> ChainError {
    ChainError::PluginFailed { program_id: *descriptor.program_id(), source }
}
