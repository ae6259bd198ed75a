//! Voter weight resolution for realm governance.
//!
//! A realm decides how much a wallet's vote counts through an ordered chain of
//! voter weight plugins configured per governing token mint. Each plugin either
//! computes a weight on its own or transforms the weight of the plugins before
//! it. `realm_voter_weight` loads such chains from chain state, folds them into
//! a single [`VoteWeight`] and builds the instructions that create and refresh
//! the voter's on-chain records.
//!
//! # Core Concepts
//!
//! - [`ChainReader`]: The read boundary towards the chain. Everything the crate
//! 	knows about realms, registrars and records comes through it.
//!
//! - [`AssetSource`]: Where a wallet's NFTs come from. [`DasClient`] implements it
//! 	over a DAS `getAssetsByOwner` endpoint.
//!
//! - [`PluginChain`]: The validated, ordered plugins of one `(realm, mint)`. Every
//! 	entry is a [`PluginDescriptor`] of a closed [`PluginKind`]:
//! 	- [`PluginKind::NftCollection`] - collection-based NFT voting power
//! 	- [`PluginKind::External`] - a caller-registered [`VoterWeightPlugin`]
//! 	- [`PluginKind::PassThrough`] - an unknown program; contributes nothing
//!
//! - [`VoterWeightOrchestrator`]: Public entry points. Loads chains, shares
//! 	concurrent identical requests and owns the snapshot caches.
//!
//! - [`OnboardingPlan`]: What a wallet has to submit to join a realm.
//!
//! # Errors
//!
//! Failing to resolve voting power is always an `Err`, never a zero weight.
//! "Not configured" (a realm without a plugin, a plugin without a registrar) is
//! not an error: the plugin is simply absent from the chain.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap ;
//! use std::sync::Arc ;
//! use async_trait::async_trait ;
//! use solana_pubkey::Pubkey ;
//! use realm_voter_weight::{
//! 	AssetSource, ChainReader, DigitalAsset, FetchError, OnboardingState, RealmConfig,
//! 	Settings, TokenOwnerRecord, VoteWeight, VoterWeightOrchestrator,
//! };
//!
//! // An in-memory chain: realm configs and deposits keyed by wallet.
//! struct Chain { realms: HashMap<Pubkey, RealmConfig>, deposits: HashMap<Pubkey, u64> }
//!
//! #[async_trait]
//! impl ChainReader for Chain {
//! 	fn endpoint( &self ) -> &str { "memory" }
//! 	async fn fetch_account( &self, _: &Pubkey ) -> Result<Option<Vec<u8>>, FetchError> { Ok( None ) }
//! 	async fn fetch_program_config( &self, realm: &Pubkey ) -> Result<Option<RealmConfig>, FetchError> {
//! 		Ok( self.realms.get( realm ).cloned())
//! 	}
//! 	async fn token_owner_record( &self, wallet: &Pubkey, _: &Pubkey, _: &Pubkey ) -> Result<Option<TokenOwnerRecord>, FetchError> {
//! 		Ok( self.deposits.get( wallet ).map(| &amount | TokenOwnerRecord { governing_token_deposit_amount: amount }))
//! 	}
//! }
//!
//! struct NoAssets ;
//!
//! #[async_trait]
//! impl AssetSource for NoAssets {
//! 	async fn assets_by_owner( &self, _: &Pubkey ) -> Result<Vec<DigitalAsset>, FetchError> { Ok( Vec::new()) }
//! }
//!
//! # #[tokio::main( flavor = "current_thread" )]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let governance = Pubkey::new_from_array([ 9 ; 32 ]);
//! let realm = Pubkey::new_from_array([ 1 ; 32 ]);
//! let mint = Pubkey::new_from_array([ 2 ; 32 ]);
//! let member = Pubkey::new_from_array([ 3 ; 32 ]);
//! let newcomer = Pubkey::new_from_array([ 4 ; 32 ]);
//!
//! let chain = Chain {
//! 	realms: HashMap::from([( realm, RealmConfig::new( governance, mint ))]),
//! 	deposits: HashMap::from([( member, 100 )]),
//! };
//! let orchestrator = VoterWeightOrchestrator::new( Arc::new( chain ), Arc::new( NoAssets ), Settings::default() );
//!
//! // No plugins configured: the deposit is the voting power.
//! assert_eq!( orchestrator.get_voting_power( &realm, &member ).await?, VoteWeight::new( 100 ));
//!
//! // A wallet without a token owner record only needs the base record.
//! let plan = orchestrator.get_onboarding_plan( &realm, &newcomer ).await?;
//! assert_eq!( plan.state, OnboardingState::NeedsBaseRecord );
//! assert_eq!( plan.instructions.len(), 1 );
//! # Ok(())
//! # }
//! ```

mod asset ;
mod cache ;
mod chain_reader ;
mod das ;
mod governance ;
mod join_realm ;
mod nft_power ;
mod nft_voter ;
mod orchestrator ;
mod plugin ;
mod plugin_chain ;
mod registrar ;
mod session ;
mod settings ;
mod utils ;
mod weight ;

#[doc( no_inline )]
pub use solana_instruction::{ AccountMeta, Instruction };
#[doc( no_inline )]
pub use solana_pubkey::Pubkey ;

pub use asset::{ AssetResolver, AssetSource, DigitalAsset, Ownership, Grouping, Compression, Creator, COLLECTION_GROUP_KEY };
pub use cache::{ CacheKey, Namespace, Freshness, InFlight, SnapshotCache };
pub use chain_reader::{ ChainReader, FetchError, Findable, RealmConfig, TokenOwnerRecord };
pub use das::{ DasClient, AssetPage, collect_pages, DEFAULT_PAGE_LIMIT };
pub use governance::{ token_owner_record_address, create_token_owner_record, SYSTEM_PROGRAM_ID };
pub use join_realm::{ OnboardingPlan, OnboardingState, plan_onboarding };
pub use nft_power::{ is_eligible, allowed_collections, resolve_eligible_assets, compute_vote_power };
pub use nft_voter::{ NftVoterPlugin, voter_weight_record_address, instruction_discriminator };
pub use orchestrator::VoterWeightOrchestrator ;
pub use plugin::{ VoterWeightPlugin, PluginDescriptor, PluginKind, PluginError, VoterContext, Capabilities, VoterWeightAction };
pub use plugin_chain::{ PluginChain, ChainError, InconsistentChainState };
pub use registrar::{ Registrar, CollectionConfig, RegistrarResolver, registrar_address, account_discriminator };
pub use session::{ VoterSession, SessionInputs, Refresh };
pub use settings::{ Settings, KNOWN_NFT_PLUGIN_PROGRAMS };
pub use weight::{ VoteWeight, WeightOverflow };
