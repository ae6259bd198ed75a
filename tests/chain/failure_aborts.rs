use std::sync::Arc ;
use realm_voter_weight::{ ChainError, FetchError, PluginError, Settings };
use crate::fixture_chain::*;

#[tokio::test]
async fn failing_plugin_aborts_whole_chain() {
	let chain = MemoryChain::new();
	let assets = MemoryAssets::new();
	realm_with_plugins( &chain, &[ key( 10 ), key( 11 )]);
	chain.set_deposit( *WALLET, *REALM, *COMMUNITY_MINT, 100 );

	let orchestrator = orchestrator( &chain, &assets, Settings::default() )
		.with_plugin( key( 10 ), Arc::new( FixedPlugin { program_id: key( 10 ), weight: 5 }))
		.with_plugin( key( 11 ), Arc::new( FailingPlugin ));

	match orchestrator.get_voting_power( &REALM, &WALLET ).await {
		Err( ChainError::PluginFailed { program_id, source: PluginError::Other( _ )}) => assert_eq!( program_id, key( 11 )),
		value => panic!( "Expected PluginFailed, found: {:?}", value ),
	}
	assert!( orchestrator.build_create_instructions( &REALM, &COMMUNITY_MINT, &WALLET ).await.is_err() );
}

#[tokio::test]
async fn asset_source_failure_is_not_zero_power() {
	let chain = MemoryChain::new();
	let assets = MemoryAssets::new();
	nft_realm( &chain, &[( *COLLECTION, 1 )]);
	assets.set_failing( true );

	let orchestrator = orchestrator( &chain, &assets, Settings::default() );
	match orchestrator.get_voting_power( &REALM, &WALLET ).await {
		Err( ChainError::PluginFailed { source: PluginError::Fetch( FetchError::Transport( _ )), .. }) => {},
		value => panic!( "Expected a transport failure, found: {:?}", value ),
	}

	// Failures are not cached: the next call succeeds once the source recovers.
	assets.set_failing( false );
	assets.set_assets( *WALLET, vec![ nft( 1, *WALLET, Some( *COLLECTION ), false )]);
	assert_eq!( orchestrator.get_voting_power( &REALM, &WALLET ).await.map(| weight | weight.get() ), Ok( 1 ));
}

#[tokio::test]
async fn transport_failure_propagates() {
	let chain = MemoryChain::new();
	let assets = MemoryAssets::new();
	realm_with_plugins( &chain, &[]);
	chain.set_failing( true );

	let orchestrator = orchestrator( &chain, &assets, Settings::default() );
	assert!( matches!(
		orchestrator.get_voting_power( &REALM, &WALLET ).await,
		Err( ChainError::Fetch( FetchError::Transport( _ ))),
	));
}

#[tokio::test]
async fn unknown_realm_and_foreign_mint_are_errors() {
	let chain = MemoryChain::new();
	let assets = MemoryAssets::new();
	realm_with_plugins( &chain, &[]);

	let orchestrator = orchestrator( &chain, &assets, Settings::default() );
	assert_eq!( orchestrator.get_voting_power( &key( 77 ), &WALLET ).await, Err( ChainError::RealmNotFound( key( 77 ))));
	assert_eq!(
		orchestrator.get_voting_power_for_mint( &REALM, &key( 78 ), &WALLET ).await,
		Err( ChainError::MintNotGoverned { realm: *REALM, mint: key( 78 )}),
	);
}
