//! Resolution settings.
//!
//! Everything that changes how voting power is computed is an explicit input
//! here rather than a constant baked into a resolver.

use std::str::FromStr ;
use std::time::Duration ;
use serde::Deserialize ;
use solana_pubkey::Pubkey ;

use crate::das::DEFAULT_PAGE_LIMIT ;
use crate::utils::serde::pubkeys_from_str ;



/// Publicly deployed NFT voter plugin programs.
pub const KNOWN_NFT_PLUGIN_PROGRAMS: [&str; 2] = [
    "GnftV5kLjd67tvHpNGyodwWveEKivz3ZWvvE3Z4xi2iw",
    "GnftVc21v2BRchsRa9dGdrVmJPLZiRHe9j2offnFTZFg",
];

const DEFAULT_DISPLAY_TTL: Duration = Duration::from_secs( 60 );

/// Inputs to voting power resolution.
///
/// Deserializes from JSON with every field optional:
///
/// ```json
/// { "compressed_assets_eligible": false, "nft_plugin_programs": ["GnftV5kL..."], "display_ttl_secs": 30 }
/// ```
#[derive( Deserialize, Debug, Clone, PartialEq, Eq )]
#[serde( default )]
pub struct Settings {
    /// Counts compressed NFTs as eligible. Off by default; enable only to
    /// reproduce totals from deployments that counted them.
    pub compressed_assets_eligible: bool,
    /// Plugin programs treated as collection-based NFT voters.
    #[serde( deserialize_with = "pubkeys_from_str" )]
    pub nft_plugin_programs: Vec<Pubkey>,
    pub das_page_limit: usize,
    /// How long display-only asset snapshots may be served.
    #[serde( rename = "display_ttl_secs", deserialize_with = "duration_from_secs" )]
    pub display_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compressed_assets_eligible: false,
            nft_plugin_programs: KNOWN_NFT_PLUGIN_PROGRAMS.iter()
                .filter_map(| id | Pubkey::from_str( id ).ok())
                .collect(),
            das_page_limit: DEFAULT_PAGE_LIMIT,
            display_ttl: DEFAULT_DISPLAY_TTL,
        }
    }
}

impl Settings {

    pub fn with_compressed_assets_eligible( mut self, eligible: bool ) -> Self {
        self.compressed_assets_eligible = eligible ;
        self
    }

    /// Replaces the NFT plugin allow-list.
    pub fn with_nft_plugin_programs( mut self, programs: impl IntoIterator<Item = Pubkey> ) -> Self {
        self.nft_plugin_programs = programs.into_iter().collect();
        self
    }

    pub fn with_das_page_limit( mut self, page_limit: usize ) -> Self {
        self.das_page_limit = page_limit ;
        self
    }

    pub fn with_display_ttl( mut self, ttl: Duration ) -> Self {
        self.display_ttl = ttl ;
        self
    }

    #[inline] pub fn is_nft_plugin( &self, program_id: &Pubkey ) -> bool {
        self.nft_plugin_programs.contains( program_id )
    }

}

fn duration_from_secs<'de, D>( deserializer: D ) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize( deserializer ).map( Duration::from_secs )
}
