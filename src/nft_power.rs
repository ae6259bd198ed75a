//! Collection-based NFT voting power.
//!
//! Pure functions over already-fetched snapshots. An asset counts when it is
//! uncompressed (unless [`Settings::compressed_assets_eligible`] is set), belongs
//! to an allow-listed collection and carries at least one verified creator.
//! Everything else is silently excluded.

use std::collections::HashSet ;
use solana_pubkey::Pubkey ;

use crate::asset::DigitalAsset ;
use crate::registrar::Registrar ;
use crate::settings::Settings ;
use crate::weight::{ VoteWeight, WeightOverflow };



/// Whether a single asset is eligible for voting power.
///
/// `allowed_collections` holds base58 collection addresses.
pub fn is_eligible( asset: &DigitalAsset, allowed_collections: &HashSet<String>, compressed_assets_eligible: bool ) -> bool {
    ( compressed_assets_eligible || !asset.is_compressed() )
        && asset.collection().is_some_and(| collection | allowed_collections.contains( collection ))
        && asset.has_verified_creator()
}

/// The base58 addresses of the registrar's collections.
pub fn allowed_collections( registrar: &Registrar ) -> HashSet<String> {
    registrar.collection_configs.iter()
        .map(| config | config.collection.to_string() )
        .collect()
}

/// Filters `assets` down to those that count towards `owner`'s power.
pub fn resolve_eligible_assets<'a>(
    assets: &'a [DigitalAsset],
    registrar: &Registrar,
    owner: &Pubkey,
    settings: &Settings,
) -> Vec<&'a DigitalAsset> {
    let allowed = allowed_collections( registrar );
    assets.iter()
        .filter(| asset | asset.owner() == owner )
        .filter(| asset | is_eligible( asset, &allowed, settings.compressed_assets_eligible ))
        .collect()
}

/// Sums the weight of already-eligible assets.
///
/// Each asset contributes its collection's weight, or 1 when the registrar
/// specifies none.
///
/// # Errors
/// Returns [`WeightOverflow`] if the total does not fit.
pub fn compute_vote_power( eligible: &[&DigitalAsset], registrar: &Registrar ) -> Result<VoteWeight, WeightOverflow> {
    VoteWeight::try_sum( eligible.iter().map(| asset | {
        asset.collection()
            .and_then(| collection | registrar.collection_config( collection ))
            .and_then(| config | config.weight )
            .map_or( VoteWeight::from( 1 ), VoteWeight::from )
    }))
}
