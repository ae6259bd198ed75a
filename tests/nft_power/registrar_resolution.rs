use std::sync::atomic::Ordering ;
use realm_voter_weight::{ FetchError, Findable, RegistrarResolver, registrar_address };
use crate::fixture_chain::*;

#[tokio::test]
async fn resolves_configured_registrar() {
	let chain = MemoryChain::new();
	nft_realm( &chain, &[( *COLLECTION, 4 )]);

	let resolver = RegistrarResolver::new( chain.clone() );
	let registrar = resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap();
	let Findable::Found( registrar ) = registrar.as_ref() else { panic!( "Expected a registrar, found: {:?}", registrar ) };

	assert_eq!( registrar.realm, *REALM );
	assert_eq!( registrar.governing_token_mint, *COMMUNITY_MINT );
	assert_eq!( registrar.collection_configs.len(), 1 );
	assert_eq!( registrar.collection_configs[0].collection, *COLLECTION );
	assert_eq!( registrar.collection_configs[0].weight, Some( 4 ));
}

#[tokio::test]
async fn missing_realm_plugin_or_account_is_not_found() {
	let chain = MemoryChain::new();
	let resolver = RegistrarResolver::new( chain.clone() );

	assert_eq!( *resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap(), Findable::NotFound );

	realm_with_plugins( &chain, &[]);
	assert_eq!( *resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap(), Findable::NotFound );
	assert_eq!( chain.account_fetches.load( Ordering::SeqCst ), 0 );

	realm_with_plugins( &chain, &[ *NFT_PLUGIN ]);
	assert_eq!( *resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap(), Findable::NotFound );
	assert_eq!( chain.account_fetches.load( Ordering::SeqCst ), 1 );
}

#[tokio::test]
async fn malformed_registrar_is_a_hard_failure() {
	let chain = MemoryChain::new();
	realm_with_plugins( &chain, &[ *NFT_PLUGIN ]);
	let address = registrar_address( &REALM, &COMMUNITY_MINT, &NFT_PLUGIN );
	chain.set_account( address, vec![ 1, 2, 3, 4, 5, 6, 7, 8, 9 ]);

	let resolver = RegistrarResolver::new( chain.clone() );
	match resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await {
		Err( FetchError::MalformedAccount { address: reported, .. }) => assert_eq!( reported, address ),
		value => panic!( "Expected MalformedAccount, found: {:?}", value ),
	}
}

#[tokio::test]
async fn registrar_is_cached_until_invalidated() {
	let chain = MemoryChain::new();
	nft_realm( &chain, &[( *COLLECTION, 1 )]);
	let resolver = RegistrarResolver::new( chain.clone() );

	resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap();
	resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap();
	assert_eq!( chain.account_fetches.load( Ordering::SeqCst ), 1 );

	nft_realm( &chain, &[( *COLLECTION, 1 ), ( *OTHER_COLLECTION, 2 )]);
	resolver.invalidate( &REALM, &NFT_PLUGIN );
	let refreshed = resolver.resolve_registrar( &REALM, &NFT_PLUGIN ).await.unwrap();
	assert_eq!( chain.account_fetches.load( Ordering::SeqCst ), 2 );
	assert_eq!( refreshed.found().map(| registrar | registrar.collection_configs.len() ), Some( 2 ));
}
