//! Digital asset snapshots and the source they are fetched from.
//!
//! The model mirrors the subset of the DAS (Digital Asset Standard) asset shape
//! that voting power depends on. Unknown fields are ignored on deserialization.

use std::sync::Arc ;
use async_trait::async_trait ;
use serde::Deserialize ;
use solana_pubkey::Pubkey ;

use crate::cache::{ CacheKey, Freshness, SnapshotCache };
use crate::chain_reader::FetchError ;
use crate::utils::serde::pubkey_from_str ;



/// Group key marking collection membership.
pub const COLLECTION_GROUP_KEY: &str = "collection";

/// An NFT held by some owner, as reported by the asset source.
#[derive( Deserialize, Debug, Clone, PartialEq, Eq )]
pub struct DigitalAsset {
    #[serde( deserialize_with = "pubkey_from_str" )]
    pub id: Pubkey,
    pub ownership: Ownership,
    #[serde( default )]
    pub grouping: Vec<Grouping>,
    #[serde( default )]
    pub compression: Compression,
    #[serde( default )]
    pub creators: Vec<Creator>,
}

#[derive( Deserialize, Debug, Clone, PartialEq, Eq )]
pub struct Ownership {
    #[serde( deserialize_with = "pubkey_from_str" )]
    pub owner: Pubkey,
}

/// A `{ group_key, group_value }` pair; collection membership is one kind.
#[derive( Deserialize, Debug, Clone, PartialEq, Eq )]
pub struct Grouping {
    pub group_key: String,
    pub group_value: String,
}

#[derive( Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq )]
pub struct Compression {
    #[serde( default )]
    pub compressed: bool,
}

#[derive( Deserialize, Debug, Clone, PartialEq, Eq )]
pub struct Creator {
    #[serde( deserialize_with = "pubkey_from_str" )]
    pub address: Pubkey,
    #[serde( default )]
    pub verified: bool,
}

impl DigitalAsset {

    #[inline] pub fn owner( &self ) -> &Pubkey { &self.ownership.owner }

    /// The value of the asset's collection grouping, if it has one.
    pub fn collection( &self ) -> Option<&str> {
        self.grouping.iter()
            .find(| group | group.group_key == COLLECTION_GROUP_KEY )
            .map(| group | group.group_value.as_str() )
    }

    #[inline] pub fn is_compressed( &self ) -> bool { self.compression.compressed }

    pub fn has_verified_creator( &self ) -> bool {
        self.creators.iter().any(| creator | creator.verified )
    }

}

/// Source of the assets an owner currently holds.
///
/// Implementations may paginate internally; callers always receive the complete set.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn assets_by_owner( &self, owner: &Pubkey ) -> Result<Vec<DigitalAsset>, FetchError>;
}

/// Caching front for an [`AssetSource`], keyed by owner.
#[derive( Clone )]
pub struct AssetResolver {
    source: Arc<dyn AssetSource>,
    endpoint: String,
    cache: Arc<SnapshotCache<Vec<DigitalAsset>>>,
}

impl AssetResolver {

    pub fn new( source: Arc<dyn AssetSource>, endpoint: impl Into<String> ) -> Self {
        Self { source, endpoint: endpoint.into(), cache: Arc::new( SnapshotCache::new() )}
    }

    /// The complete set of assets held by `owner`.
    ///
    /// # Errors
    /// Propagates the source's [`FetchError`].
    pub async fn assets_by_owner( &self, owner: &Pubkey, freshness: Freshness ) -> Result<Arc<Vec<DigitalAsset>>, FetchError> {
        let source = Arc::clone( &self.source );
        let owner = *owner ;
        self.cache.get_or_fetch( CacheKey::owner_assets( &self.endpoint, owner ), freshness, move || async move {
            source.assets_by_owner( &owner ).await
        }).await
    }

    /// Drops the cached snapshot for `owner`.
    pub fn invalidate( &self, owner: &Pubkey ) {
        self.cache.invalidate( &CacheKey::owner_assets( &self.endpoint, *owner ));
    }

}

impl std::fmt::Debug for AssetResolver {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "AssetResolver" )
            .field( "source", &"<AssetSource>" )
            .field( "endpoint", &self.endpoint )
            .finish_non_exhaustive()
    }
}
