#[allow( dead_code )]
mod fixture_chain {

	use std::collections::HashMap ;
	use std::str::FromStr ;
	use std::sync::{ Arc, Mutex };
	use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
	use async_trait::async_trait ;
	use borsh::BorshSerialize ;
	use once_cell::sync::Lazy ;
	use tokio::sync::Notify ;
	use realm_voter_weight::{
		AssetSource, ChainReader, DigitalAsset, FetchError, RealmConfig, TokenOwnerRecord,
		Ownership, Grouping, Compression, Creator, Capabilities, PluginError, VoterContext,
		VoterWeightAction, VoterWeightPlugin, VoteWeight, VoterWeightOrchestrator, Settings,
		Instruction, Pubkey, KNOWN_NFT_PLUGIN_PROGRAMS, account_discriminator, registrar_address,
	};

	pub const ENDPOINT: &str = "memory://localnet";

	pub fn key( n: u8 ) -> Pubkey { Pubkey::new_from_array([ n ; 32 ]) }

	pub static GOVERNANCE: Lazy<Pubkey> = Lazy::new(|| key( 200 ));
	pub static REALM: Lazy<Pubkey> = Lazy::new(|| key( 201 ));
	pub static COMMUNITY_MINT: Lazy<Pubkey> = Lazy::new(|| key( 202 ));
	pub static COUNCIL_MINT: Lazy<Pubkey> = Lazy::new(|| key( 203 ));
	pub static COLLECTION: Lazy<Pubkey> = Lazy::new(|| key( 204 ));
	pub static OTHER_COLLECTION: Lazy<Pubkey> = Lazy::new(|| key( 205 ));
	pub static NFT_PLUGIN: Lazy<Pubkey> = Lazy::new(|| Pubkey::from_str( KNOWN_NFT_PLUGIN_PROGRAMS[0] ).unwrap() );
	pub static WALLET: Lazy<Pubkey> = Lazy::new(|| key( 1 ));



	/// In-memory chain state with per-kind fetch counters.
	///
	/// Every fetch yields once so concurrent callers actually overlap.
	#[derive( Default )]
	pub struct MemoryChain {
		accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
		realms: Mutex<HashMap<Pubkey, RealmConfig>>,
		records: Mutex<HashMap<( Pubkey, Pubkey, Pubkey ), TokenOwnerRecord>>,
		failing: AtomicBool,
		record_gate: Mutex<Option<Arc<Notify>>>,
		pub account_fetches: AtomicUsize,
		pub config_fetches: AtomicUsize,
		pub record_fetches: AtomicUsize,
	}

	impl MemoryChain {

		pub fn new() -> Arc<Self> { Arc::new( Self::default() ) }

		pub fn set_realm( &self, realm: Pubkey, config: RealmConfig ) {
			self.realms.lock().unwrap().insert( realm, config );
		}

		pub fn set_account( &self, address: Pubkey, data: Vec<u8> ) {
			self.accounts.lock().unwrap().insert( address, data );
		}

		pub fn set_deposit( &self, wallet: Pubkey, realm: Pubkey, mint: Pubkey, amount: u64 ) {
			self.records.lock().unwrap().insert(( wallet, realm, mint ), TokenOwnerRecord { governing_token_deposit_amount: amount });
		}

		pub fn set_failing( &self, failing: bool ) {
			self.failing.store( failing, Ordering::SeqCst );
		}

		/// Holds the next token owner record fetch until the returned handle is notified.
		pub fn pause_next_record_fetch( &self ) -> Arc<Notify> {
			let gate = Arc::new( Notify::new() );
			*self.record_gate.lock().unwrap() = Some( Arc::clone( &gate ));
			gate
		}

		pub fn fetches( &self ) -> ( usize, usize, usize ) {(
			self.config_fetches.load( Ordering::SeqCst ),
			self.account_fetches.load( Ordering::SeqCst ),
			self.record_fetches.load( Ordering::SeqCst ),
		)}

		fn check( &self ) -> Result<(), FetchError> {
			match self.failing.load( Ordering::SeqCst ) {
				true => Err( FetchError::Transport( "connection refused".to_string() )),
				false => Ok(()),
			}
		}

	}

	#[async_trait]
	impl ChainReader for MemoryChain {

		fn endpoint( &self ) -> &str { ENDPOINT }

		async fn fetch_account( &self, address: &Pubkey ) -> Result<Option<Vec<u8>>, FetchError> {
			self.account_fetches.fetch_add( 1, Ordering::SeqCst );
			tokio::task::yield_now().await ;
			self.check()?;
			Ok( self.accounts.lock().unwrap().get( address ).cloned() )
		}

		async fn fetch_program_config( &self, realm: &Pubkey ) -> Result<Option<RealmConfig>, FetchError> {
			self.config_fetches.fetch_add( 1, Ordering::SeqCst );
			tokio::task::yield_now().await ;
			self.check()?;
			Ok( self.realms.lock().unwrap().get( realm ).cloned() )
		}

		async fn token_owner_record( &self, wallet: &Pubkey, realm: &Pubkey, mint: &Pubkey ) -> Result<Option<TokenOwnerRecord>, FetchError> {
			self.record_fetches.fetch_add( 1, Ordering::SeqCst );
			let gate = self.record_gate.lock().unwrap().take();
			match gate {
				Some( gate ) => gate.notified().await,
				None => tokio::task::yield_now().await,
			}
			self.check()?;
			Ok( self.records.lock().unwrap().get( &( *wallet, *realm, *mint )).copied() )
		}

	}



	/// In-memory asset source keyed by owner.
	#[derive( Default )]
	pub struct MemoryAssets {
		assets: Mutex<HashMap<Pubkey, Vec<DigitalAsset>>>,
		failing: AtomicBool,
		gate: Mutex<Option<Arc<Notify>>>,
		pub fetches: AtomicUsize,
	}

	impl MemoryAssets {

		pub fn new() -> Arc<Self> { Arc::new( Self::default() ) }

		pub fn set_assets( &self, owner: Pubkey, assets: Vec<DigitalAsset> ) {
			self.assets.lock().unwrap().insert( owner, assets );
		}

		pub fn set_failing( &self, failing: bool ) {
			self.failing.store( failing, Ordering::SeqCst );
		}

		/// Holds the next fetch, after it read the owner's assets, until the returned handle is notified.
		pub fn pause_next_fetch( &self ) -> Arc<Notify> {
			let gate = Arc::new( Notify::new() );
			*self.gate.lock().unwrap() = Some( Arc::clone( &gate ));
			gate
		}

		pub fn fetch_count( &self ) -> usize { self.fetches.load( Ordering::SeqCst ) }

	}

	#[async_trait]
	impl AssetSource for MemoryAssets {
		async fn assets_by_owner( &self, owner: &Pubkey ) -> Result<Vec<DigitalAsset>, FetchError> {
			self.fetches.fetch_add( 1, Ordering::SeqCst );
			let held = self.assets.lock().unwrap().get( owner ).cloned().unwrap_or_default();
			let gate = self.gate.lock().unwrap().take();
			match gate {
				Some( gate ) => gate.notified().await,
				None => tokio::task::yield_now().await,
			}
			if self.failing.load( Ordering::SeqCst ) {
				return Err( FetchError::Transport( "das unavailable".to_string() ));
			}
			Ok( held )
		}
	}



	/// An NFT owned by `owner` with a verified creator.
	pub fn nft( id: u8, owner: Pubkey, collection: Option<Pubkey>, compressed: bool ) -> DigitalAsset {
		DigitalAsset {
			id: key( id ),
			ownership: Ownership { owner },
			grouping: collection.into_iter()
				.map(| collection | Grouping { group_key: "collection".to_string(), group_value: collection.to_string() })
				.collect(),
			compression: Compression { compressed },
			creators: vec![ Creator { address: key( 250 ), verified: true }],
		}
	}

	#[derive( BorshSerialize )]
	struct RegistrarAccount {
		governance_program_id: Pubkey,
		realm: Pubkey,
		governing_token_mint: Pubkey,
		collection_configs: Vec<CollectionAccount>,
		reserved: [u8; 128],
	}

	#[derive( BorshSerialize )]
	struct CollectionAccount {
		collection: Pubkey,
		size: u32,
		weight: u64,
		reserved: [u8; 8],
	}

	/// Anchor-encoded registrar account data.
	pub fn registrar_account( realm: Pubkey, mint: Pubkey, collections: &[( Pubkey, u64 )]) -> Vec<u8> {
		let mut data = account_discriminator( "Registrar" ).to_vec();
		RegistrarAccount {
			governance_program_id: *GOVERNANCE,
			realm,
			governing_token_mint: mint,
			collection_configs: collections.iter()
				.map(|( collection, weight )| CollectionAccount { collection: *collection, size: 100, weight: *weight, reserved: [ 0 ; 8 ]})
				.collect(),
			reserved: [ 0 ; 128 ],
		}.serialize( &mut data ).unwrap();
		data
	}

	/// Configures `REALM` with `plugins` on the community mint.
	pub fn realm_with_plugins( chain: &MemoryChain, plugins: &[Pubkey] ) {
		chain.set_realm( *REALM, RealmConfig::new( *GOVERNANCE, *COMMUNITY_MINT )
			.with_council_mint( *COUNCIL_MINT )
			.with_plugins( *COMMUNITY_MINT, plugins.iter().copied() ));
	}

	/// Configures `REALM` with the NFT plugin and a registrar listing `collections`.
	pub fn nft_realm( chain: &MemoryChain, collections: &[( Pubkey, u64 )]) {
		realm_with_plugins( chain, &[ *NFT_PLUGIN ]);
		chain.set_account(
			registrar_address( &REALM, &COMMUNITY_MINT, &NFT_PLUGIN ),
			registrar_account( *REALM, *COMMUNITY_MINT, collections ),
		);
	}

	pub fn orchestrator( chain: &Arc<MemoryChain>, assets: &Arc<MemoryAssets>, settings: Settings ) -> VoterWeightOrchestrator {
		VoterWeightOrchestrator::new( chain.clone(), assets.clone(), settings )
	}

	pub fn context( wallet: Pubkey ) -> VoterContext {
		VoterContext::new( *REALM, *COMMUNITY_MINT, wallet, *GOVERNANCE )
	}



	/// Contributes a fixed weight regardless of input.
	pub struct FixedPlugin { pub program_id: Pubkey, pub weight: u64 }

	#[async_trait]
	impl VoterWeightPlugin for FixedPlugin {
		fn requires_input_voter_weight( &self ) -> bool { false }
		fn capabilities( &self ) -> Capabilities { Capabilities::ALL }
		async fn create_record_instructions( &self, _: &VoterContext ) -> Result<Vec<Instruction>, PluginError> {
			Ok( vec![ Instruction::new_with_bytes( self.program_id, b"create", Vec::new() )])
		}
		async fn update_record_instructions( &self, _: &VoterContext, _: VoterWeightAction ) -> Result<Vec<Instruction>, PluginError> {
			Ok( vec![ Instruction::new_with_bytes( self.program_id, b"update", Vec::new() )])
		}
		async fn voter_weight( &self, _: &VoterContext, _: Option<VoteWeight> ) -> Result<VoteWeight, PluginError> {
			Ok( self.weight.into() )
		}
	}

	/// Multiplies the running total.
	pub struct ScalePlugin { pub program_id: Pubkey, pub factor: u128 }

	#[async_trait]
	impl VoterWeightPlugin for ScalePlugin {
		fn requires_input_voter_weight( &self ) -> bool { true }
		fn capabilities( &self ) -> Capabilities { Capabilities { create_record: true, update_record: false, contribute_weight: true }}
		async fn create_record_instructions( &self, _: &VoterContext ) -> Result<Vec<Instruction>, PluginError> {
			Ok( vec![ Instruction::new_with_bytes( self.program_id, b"create", Vec::new() )])
		}
		async fn update_record_instructions( &self, _: &VoterContext, _: VoterWeightAction ) -> Result<Vec<Instruction>, PluginError> {
			Ok( Vec::new() )
		}
		async fn voter_weight( &self, _: &VoterContext, input: Option<VoteWeight> ) -> Result<VoteWeight, PluginError> {
			Ok( input.ok_or( PluginError::MissingInput )?.checked_mul( self.factor )? )
		}
	}

	/// Always fails to resolve a weight.
	pub struct FailingPlugin ;

	#[async_trait]
	impl VoterWeightPlugin for FailingPlugin {
		fn requires_input_voter_weight( &self ) -> bool { false }
		fn capabilities( &self ) -> Capabilities { Capabilities::ALL }
		async fn create_record_instructions( &self, _: &VoterContext ) -> Result<Vec<Instruction>, PluginError> {
			Err( PluginError::Other( "create failed".to_string() ))
		}
		async fn update_record_instructions( &self, _: &VoterContext, _: VoterWeightAction ) -> Result<Vec<Instruction>, PluginError> {
			Err( PluginError::Other( "update failed".to_string() ))
		}
		async fn voter_weight( &self, _: &VoterContext, _: Option<VoteWeight> ) -> Result<VoteWeight, PluginError> {
			Err( PluginError::Other( "weight failed".to_string() ))
		}
	}

}
