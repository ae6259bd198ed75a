//! Onboarding a wallet into a realm.
//!
//! The plan is derived from chain state on every call and never persisted. A
//! wallet is `Registered` once its token owner record exists. Until then the
//! base record is created after any plugin records, because a head plugin that
//! requires an input weight needs its own record in place first.

use solana_instruction::Instruction ;

use crate::chain_reader::TokenOwnerRecord ;
use crate::plugin_chain::PluginChain ;



/// Where a wallet stands in a realm.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub enum OnboardingState {
    /// No token owner record and no plugin blocks creating one.
    ///
    /// With an independent head plugin (NFT voting, for instance) the plan
    /// only creates the plugin records: `needs_token_owner_record` stays false
    /// and no base-record instruction is added, since the plugin supplies the
    /// weight. The base record is only planned for an empty chain.
    NeedsBaseRecord,
    /// No token owner record, and the head plugin requires an input weight,
    /// so plugin records have to be created alongside it.
    BlockedOnPlugin,
    /// The token owner record exists.
    Registered,
}

/// What has to happen for a wallet to join a realm.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct OnboardingPlan {
    pub state: OnboardingState,
    pub needs_token_owner_record: bool,
    pub needs_voter_weight_records: bool,
    /// Plugin record creation first, then the base record when needed.
    pub instructions: Vec<Instruction>,
}

impl OnboardingPlan {

    /// Whether anything has to be submitted at all.
    #[inline] pub fn is_complete( &self ) -> bool { self.instructions.is_empty() }

}

/// Plans onboarding from the wallet's existing record and resolved chain.
///
/// `plugin_create_instructions` are the chain's create instructions, already
/// empty for plugins whose records exist. `base_record` is only invoked when the
/// token owner record has to be created.
pub fn plan_onboarding(
    existing_record: Option<&TokenOwnerRecord>,
    chain: &PluginChain,
    plugin_create_instructions: Vec<Instruction>,
    base_record: impl FnOnce() -> Instruction,
) -> OnboardingPlan {

    let has_record = existing_record.is_some();
    let state = match ( has_record, !chain.is_empty() && chain.head_requires_input() ) {
        ( true, _ ) => OnboardingState::Registered,
        ( false, true ) => OnboardingState::BlockedOnPlugin,
        ( false, false ) => OnboardingState::NeedsBaseRecord,
    };

    let needs_token_owner_record = !has_record && ( chain.is_empty() || chain.head_requires_input() );
    let needs_voter_weight_records = !plugin_create_instructions.is_empty();

    let mut instructions = plugin_create_instructions ;
    if needs_token_owner_record { instructions.push( base_record() ) }

    OnboardingPlan { state, needs_token_owner_record, needs_voter_weight_records, instructions }

}
