//! Read boundary towards the chain.
//!
//! Everything this crate knows about on-chain state comes through a [`ChainReader`].
//! Implementations own transport, retries and timeouts; the core only decides what
//! to ask for and how to combine the answers.

use std::collections::HashMap ;
use async_trait::async_trait ;
use solana_pubkey::Pubkey ;
use thiserror::Error ;



/// Failure to read chain state.
///
/// Transport failures are propagated as-is; this crate never retries.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum FetchError {
    /// Network or RPC failure reported by the transport layer.
    #[error( "Transport error: {0}" )] Transport( String ),
    /// An account exists but its data cannot be decoded.
    #[error( "Malformed account {address}: {reason}" )]
    MalformedAccount { address: Pubkey, reason: String },
}

/// A lookup that may legitimately come back empty.
///
/// `NotFound` is a valid state (e.g. a plugin not configured for a realm),
/// never an error.
#[derive( Debug, Clone, PartialEq, Eq )]
pub enum Findable<T> {
    Found( T ),
    NotFound,
}

impl<T> Findable<T> {

    #[inline] pub fn found( &self ) -> Option<&T> {
        match self {
            Self::Found( value ) => Some( value ),
            Self::NotFound => None,
        }
    }

    #[inline] pub fn is_found( &self ) -> bool { matches!( self, Self::Found( _ ))}

    pub fn into_option( self ) -> Option<T> {
        match self {
            Self::Found( value ) => Some( value ),
            Self::NotFound => None,
        }
    }

}

impl<T> From<Option<T>> for Findable<T> {
    fn from( value: Option<T> ) -> Self {
        match value {
            Some( value ) => Self::Found( value ),
            None => Self::NotFound,
        }
    }
}

/// A realm's governance configuration as far as voter weight is concerned.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct RealmConfig {
    /// The governance program that owns the realm.
    pub governance_program_id: Pubkey,
    pub community_mint: Pubkey,
    pub council_mint: Option<Pubkey>,
    /// Voter weight plugin programs per governing token mint, in
    /// governance-effective order.
    pub voter_weight_plugins: HashMap<Pubkey, Vec<Pubkey>>,
}

impl RealmConfig {

    /// Creates a config with no plugins configured for either mint.
    pub fn new( governance_program_id: Pubkey, community_mint: Pubkey ) -> Self {
        Self {
            governance_program_id,
            community_mint,
            council_mint: None,
            voter_weight_plugins: HashMap::with_capacity( 0 ),
        }
    }

    pub fn with_council_mint( mut self, council_mint: Pubkey ) -> Self {
        self.council_mint = Some( council_mint );
        self
    }

    /// Sets the ordered plugin chain for `mint`.
    pub fn with_plugins( mut self, mint: Pubkey, plugins: impl IntoIterator<Item = Pubkey> ) -> Self {
        self.voter_weight_plugins.insert( mint, plugins.into_iter().collect());
        self
    }

    /// Plugin programs configured for `mint`, in order. Empty for a vanilla mint.
    pub fn plugins_for( &self, mint: &Pubkey ) -> &[Pubkey] {
        self.voter_weight_plugins.get( mint ).map_or( &[], Vec::as_slice )
    }

    /// Whether `mint` is one of the realm's governing token mints.
    pub fn governs( &self, mint: &Pubkey ) -> bool {
        &self.community_mint == mint || self.council_mint.as_ref() == Some( mint )
    }

}

/// The base membership record of a wallet in a realm.
#[derive( Debug, Clone, Copy, PartialEq, Eq )]
pub struct TokenOwnerRecord {
    /// Tokens deposited directly with the governance program. This is the
    /// vanilla weight fed into the head of a plugin chain.
    pub governing_token_deposit_amount: u64,
}

/// Source of chain state consumed by the resolvers.
#[async_trait]
pub trait ChainReader: Send + Sync {

    /// Identifies the RPC endpoint. Used to namespace cached snapshots.
    fn endpoint( &self ) -> &str ;

    /// Raw account data at `address`, or `None` if the account does not exist.
    async fn fetch_account( &self, address: &Pubkey ) -> Result<Option<Vec<u8>>, FetchError>;

    /// The realm's configuration, or `None` if the realm cannot be located.
    async fn fetch_program_config( &self, realm: &Pubkey ) -> Result<Option<RealmConfig>, FetchError>;

    /// The wallet's base record for `(realm, mint)`, if one exists.
    async fn token_owner_record(
        &self,
        wallet: &Pubkey,
        realm: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<TokenOwnerRecord>, FetchError>;

}
