use std::time::Duration ;
use realm_voter_weight::{ ChainError, Settings, VoteWeight };
use crate::fixture_chain::*;

#[tokio::test]
async fn delegator_powers_use_display_snapshots() {
	let chain = MemoryChain::new();
	let assets = MemoryAssets::new();
	nft_realm( &chain, &[( *COLLECTION, 1 )]);
	assets.set_assets( *WALLET, vec![ nft( 31, *WALLET, Some( *COLLECTION ), false )]);
	assets.set_assets( key( 2 ), vec![
		nft( 32, key( 2 ), Some( *COLLECTION ), false ),
		nft( 33, key( 2 ), Some( *COLLECTION ), false ),
	]);
	let settings = Settings::default().with_display_ttl( Duration::from_secs( 600 ));
	let orchestrator = orchestrator( &chain, &assets, settings );

	let delegators = [ *WALLET, key( 2 )];
	let powers = orchestrator.voting_power_for_delegators( &REALM, &delegators ).await.unwrap();
	assert_eq!( powers, vec![
		( *WALLET, Ok( VoteWeight::new( 1 ))),
		( key( 2 ), Ok( VoteWeight::new( 2 ))),
	]);
	assert_eq!( assets.fetch_count(), 2 );

	orchestrator.voting_power_for_delegators( &REALM, &delegators ).await.unwrap();
	assert_eq!( assets.fetch_count(), 2 );

	// Weight-sensitive reads never use display snapshots.
	assert_eq!( orchestrator.get_voting_power( &REALM, &WALLET ).await, Ok( VoteWeight::new( 1 )));
	assert_eq!( assets.fetch_count(), 3 );
}

#[tokio::test]
async fn unknown_realm_fails_the_batch() {
	let chain = MemoryChain::new();
	let assets = MemoryAssets::new();
	let orchestrator = orchestrator( &chain, &assets, Settings::default() );
	assert_eq!(
		orchestrator.voting_power_for_delegators( &REALM, &[ *WALLET ]).await,
		Err( ChainError::RealmNotFound( *REALM )),
	);
}
