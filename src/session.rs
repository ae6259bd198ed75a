//! A voter's view of one realm that follows changing inputs.
//!
//! Every input change bumps a generation counter. A refresh remembers the
//! generation it started under and only stores its result if no change
//! happened meanwhile, so a slow answer for a previous wallet or realm never
//! overwrites the current one.

use solana_pubkey::Pubkey ;
use tokio::sync::RwLock ;
use tracing::{ debug, warn };

use crate::orchestrator::VoterWeightOrchestrator ;
use crate::plugin_chain::ChainError ;
use crate::weight::VoteWeight ;



/// What a session resolves voting power for.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub struct SessionInputs {
    pub realm: Pubkey,
    pub mint: Pubkey,
    pub wallet: Pubkey,
}

/// Outcome of [`VoterSession::refresh`].
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Refresh {
    /// The result was stored as the session's current voting power.
    Applied( Result<VoteWeight, ChainError> ),
    /// Inputs changed while resolving; the result was dropped.
    Discarded,
    /// No inputs are set.
    Idle,
}

#[derive( Debug, Default )]
struct SessionState {
    generation: u64,
    inputs: Option<SessionInputs>,
    voting_power: Option<Result<VoteWeight, ChainError>>,
}

/// Voting power of the currently selected wallet in the currently selected realm.
#[derive( Debug )]
pub struct VoterSession {
    orchestrator: VoterWeightOrchestrator,
    state: RwLock<SessionState>,
}

impl VoterSession {

    pub fn new( orchestrator: VoterWeightOrchestrator ) -> Self {
        Self { orchestrator, state: RwLock::new( SessionState::default() )}
    }

    /// Switches inputs. Clears the stored voting power and returns the new generation.
    pub async fn set_inputs( &self, inputs: SessionInputs ) -> u64 {
        let mut state = self.state.write().await ;
        state.generation += 1 ;
        state.inputs = Some( inputs );
        state.voting_power = None ;
        debug!( generation = state.generation, realm = %inputs.realm, wallet = %inputs.wallet, "session inputs changed" );
        state.generation
    }

    pub async fn inputs( &self ) -> Option<SessionInputs> {
        self.state.read().await.inputs
    }

    pub async fn generation( &self ) -> u64 {
        self.state.read().await.generation
    }

    /// The last applied result, `None` until a refresh for the current inputs lands.
    pub async fn voting_power( &self ) -> Option<Result<VoteWeight, ChainError>> {
        self.state.read().await.voting_power.clone()
    }

    /// Resolves voting power for the current inputs.
    pub async fn refresh( &self ) -> Refresh {
        let ( generation, inputs ) = {
            let state = self.state.read().await ;
            ( state.generation, state.inputs )
        };
        let Some( inputs ) = inputs else { return Refresh::Idle };

        let result = self.orchestrator.get_voting_power_for_mint( &inputs.realm, &inputs.mint, &inputs.wallet ).await ;

        let mut state = self.state.write().await ;
        if state.generation != generation {
            warn!( started = generation, current = state.generation, wallet = %inputs.wallet, "discarding stale voting power refresh" );
            return Refresh::Discarded ;
        }
        state.voting_power = Some( result.clone() );
        Refresh::Applied( result )
    }

}
