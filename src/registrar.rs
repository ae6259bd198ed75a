//! NFT voter registrar: per-realm plugin configuration.
//!
//! The registrar account lists the NFT collections that carry voting power in a
//! realm. It is owned by the plugin program; this module only reads a snapshot.

use std::sync::Arc ;
use borsh::BorshDeserialize ;
use sha2::{ Digest, Sha256 };
use solana_pubkey::Pubkey ;
use tracing::debug ;

use crate::cache::{ CacheKey, Freshness, Namespace, SnapshotCache };
use crate::chain_reader::{ ChainReader, FetchError, Findable, RealmConfig };



pub const REGISTRAR_SEED: &[u8] = b"registrar";

/// One eligible collection.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct CollectionConfig {
    pub collection: Pubkey,
    /// Number of NFTs in the collection, as recorded by the registrar.
    pub size: u32,
    /// Voting power per NFT. `None` means every NFT counts as one.
    pub weight: Option<u64>,
}

impl CollectionConfig {

    /// A collection whose NFTs each count as one.
    pub fn new( collection: Pubkey ) -> Self {
        Self { collection, size: 0, weight: None }
    }

    pub fn with_weight( mut self, weight: u64 ) -> Self {
        self.weight = Some( weight );
        self
    }

}

/// Snapshot of a realm's NFT voter registrar.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct Registrar {
    pub governance_program_id: Pubkey,
    pub realm: Pubkey,
    pub governing_token_mint: Pubkey,
    /// Allow-list of collections, in registrar order.
    pub collection_configs: Vec<CollectionConfig>,
}

impl Registrar {

    /// The config for `collection`, matched by its base58 form as reported by DAS.
    pub fn collection_config( &self, collection: &str ) -> Option<&CollectionConfig> {
        self.collection_configs.iter().find(| config | config.collection.to_string() == collection )
    }

    /// Decodes an Anchor `Registrar` account.
    ///
    /// # Errors
    /// Returns [`FetchError::MalformedAccount`] on a discriminator mismatch or
    /// a truncated body. Trailing bytes are ignored.
    pub fn decode( address: &Pubkey, data: &[u8] ) -> Result<Self, FetchError> {
        let malformed = | reason: String | FetchError::MalformedAccount { address: *address, reason };

        let ( discriminator, mut body ) = data.split_at_checked( 8 )
            .ok_or_else(|| malformed( format!( "account is {} bytes, too short for a discriminator", data.len() )))?;
        if discriminator != account_discriminator( "Registrar" ) {
            return Err( malformed( "not a Registrar account".to_string() ));
        }

        let raw = RawRegistrar::deserialize( &mut body ).map_err(| err | malformed( err.to_string() ))?;
        Ok( raw.into() )
    }

}

#[derive( BorshDeserialize )]
#[cfg_attr( test, derive( borsh::BorshSerialize ))]
struct RawRegistrar {
    governance_program_id: Pubkey,
    realm: Pubkey,
    governing_token_mint: Pubkey,
    collection_configs: Vec<RawCollectionConfig>,
    _reserved: [u8; 128],
}

#[derive( BorshDeserialize )]
#[cfg_attr( test, derive( borsh::BorshSerialize ))]
struct RawCollectionConfig {
    collection: Pubkey,
    size: u32,
    weight: u64,
    _reserved: [u8; 8],
}

impl From<RawRegistrar> for Registrar {
    fn from( raw: RawRegistrar ) -> Self {
        Self {
            governance_program_id: raw.governance_program_id,
            realm: raw.realm,
            governing_token_mint: raw.governing_token_mint,
            collection_configs: raw.collection_configs.into_iter()
                .map(| config | CollectionConfig { collection: config.collection, size: config.size, weight: Some( config.weight )})
                .collect(),
        }
    }
}

/// Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator( name: &str ) -> [u8; 8] {
    let hash = Sha256::digest( format!( "account:{}", name ).as_bytes() );
    let mut discriminator = [ 0u8 ; 8 ];
    discriminator.copy_from_slice( &hash[..8] );
    discriminator
}

/// Registrar PDA for `(realm, mint)` under `plugin_program_id`.
pub fn registrar_address( realm: &Pubkey, mint: &Pubkey, plugin_program_id: &Pubkey ) -> Pubkey {
    Pubkey::find_program_address(
        &[ REGISTRAR_SEED, realm.as_ref(), mint.as_ref() ],
        plugin_program_id,
    ).0
}

/// Resolves registrars through a [`ChainReader`], caching snapshots per
/// `(endpoint, realm, plugin, mint)`.
#[derive( Clone )]
pub struct RegistrarResolver {
    reader: Arc<dyn ChainReader>,
    cache: Arc<SnapshotCache<Findable<Registrar>>>,
}

impl RegistrarResolver {

    pub fn new( reader: Arc<dyn ChainReader> ) -> Self {
        Self { reader, cache: Arc::new( SnapshotCache::new() )}
    }

    /// The registrar of `plugin_program_id` for `realm`'s community mint.
    ///
    /// `NotFound` when the realm cannot be located, the plugin is not configured
    /// for the realm, or no registrar account exists.
    ///
    /// # Errors
    /// Transport failures and undecodable account data.
    pub async fn resolve_registrar(
        &self,
        realm: &Pubkey,
        plugin_program_id: &Pubkey,
    ) -> Result<Arc<Findable<Registrar>>, FetchError> {
        match self.reader.fetch_program_config( realm ).await? {
            Some( config ) => {
                let mint = config.community_mint ;
                self.resolve_for_mint( &config, realm, &mint, plugin_program_id ).await
            },
            None => {
                debug!( %realm, "realm not found, no registrar" );
                Ok( Arc::new( Findable::NotFound ))
            },
        }
    }

    /// Like [`resolve_registrar`]( Self::resolve_registrar ) for an already
    /// loaded realm config and an explicit governing mint.
    ///
    /// # Errors
    /// Transport failures and undecodable account data.
    pub async fn resolve_for_mint(
        &self,
        config: &RealmConfig,
        realm: &Pubkey,
        mint: &Pubkey,
        plugin_program_id: &Pubkey,
    ) -> Result<Arc<Findable<Registrar>>, FetchError> {

        if !config.plugins_for( mint ).contains( plugin_program_id ) {
            debug!( %realm, %mint, plugin = %plugin_program_id, "plugin not configured for mint" );
            return Ok( Arc::new( Findable::NotFound ));
        }

        let key = CacheKey::registrar( self.reader.endpoint(), *realm, *plugin_program_id, *mint );
        let reader = Arc::clone( &self.reader );
        let address = registrar_address( realm, mint, plugin_program_id );
        self.cache.get_or_fetch( key, Freshness::UntilInvalidated, move || async move {
            match reader.fetch_account( &address ).await? {
                Some( data ) => Registrar::decode( &address, &data ).map( Findable::Found ),
                None => Ok( Findable::NotFound ),
            }
        }).await

    }

    /// Drops cached registrars of `plugin_program_id` in `realm`, for every mint.
    pub fn invalidate( &self, realm: &Pubkey, plugin_program_id: &Pubkey ) {
        let endpoint = self.reader.endpoint();
        self.cache.invalidate_where(| key | key.namespace == Namespace::Registrar
            && key.endpoint == endpoint
            && key.realm.as_ref() == Some( realm )
            && key.plugin.as_ref() == Some( plugin_program_id ));
    }

}

impl std::fmt::Debug for RegistrarResolver {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "RegistrarResolver" )
            .field( "endpoint", &self.reader.endpoint() )
            .finish_non_exhaustive()
    }
}
