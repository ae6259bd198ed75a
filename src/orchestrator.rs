//! Public entry points: voting power, record instructions and onboarding.
//!
//! [`VoterWeightOrchestrator`] loads a realm's plugin chain through the
//! resolvers and evaluates it. It is a cheap handle: clones share caches and
//! in-flight requests. Identical concurrent requests (same operation, realm,
//! mint and wallet) await one shared future; nothing about a completed request
//! is retained beyond the resolvers' snapshot caches.

use std::collections::HashMap ;
use std::sync::Arc ;
use futures::future::{ join_all, try_join_all };
use pipe_trait::Pipe ;
use solana_instruction::Instruction ;
use solana_pubkey::Pubkey ;
use tracing::{ debug, warn };

use crate::asset::{ AssetResolver, AssetSource };
use crate::cache::{ CacheKey, Freshness, InFlight, SnapshotCache };
use crate::chain_reader::{ ChainReader, FetchError, Findable, RealmConfig };
use crate::das::DasClient ;
use crate::governance::create_token_owner_record ;
use crate::join_realm::{ OnboardingPlan, plan_onboarding };
use crate::nft_voter::NftVoterPlugin ;
use crate::plugin::{ PluginDescriptor, PluginKind, VoterContext, VoterWeightAction, VoterWeightPlugin };
use crate::plugin_chain::{ ChainError, PluginChain };
use crate::registrar::RegistrarResolver ;
use crate::settings::Settings ;
use crate::weight::VoteWeight ;



#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
struct RequestKey {
    realm: Pubkey,
    mint: Pubkey,
    wallet: Pubkey,
}

#[derive( Default )]
struct Requests {
    weights: InFlight<RequestKey, Result<VoteWeight, ChainError>>,
    creates: InFlight<RequestKey, Result<Vec<Instruction>, ChainError>>,
    updates: InFlight<( RequestKey, VoterWeightAction ), Result<Vec<Instruction>, ChainError>>,
    onboarding: InFlight<RequestKey, Result<OnboardingPlan, ChainError>>,
}

impl Requests {

    // Requests already underway keep their result; later callers start afresh.
    fn forget_where( &self, predicate: impl Fn( &RequestKey ) -> bool ) {
        self.weights.forget_where( &predicate );
        self.creates.forget_where( &predicate );
        self.updates.forget_where(|( key, _ )| predicate( key ));
        self.onboarding.forget_where( &predicate );
    }

}

/// Resolves voter weight plugin chains for realms.
#[derive( Clone )]
pub struct VoterWeightOrchestrator {
    reader: Arc<dyn ChainReader>,
    assets: AssetResolver,
    registrars: RegistrarResolver,
    realm_configs: Arc<SnapshotCache<Findable<RealmConfig>>>,
    settings: Arc<Settings>,
    external: Arc<HashMap<Pubkey, Arc<dyn VoterWeightPlugin>>>,
    requests: Arc<Requests>,
}

impl VoterWeightOrchestrator {

    pub fn new( reader: Arc<dyn ChainReader>, asset_source: Arc<dyn AssetSource>, settings: Settings ) -> Self {
        let assets = AssetResolver::new( asset_source, reader.endpoint() );
        Self {
            registrars: RegistrarResolver::new( Arc::clone( &reader )),
            reader,
            assets,
            realm_configs: Arc::new( SnapshotCache::new() ),
            settings: Arc::new( settings ),
            external: Arc::new( HashMap::new() ),
            requests: Arc::new( Requests::default() ),
        }
    }

    /// Uses a [`DasClient`] at `das_url` as the asset source.
    pub fn with_das( reader: Arc<dyn ChainReader>, das_url: impl Into<String>, settings: Settings ) -> Self {
        let das = DasClient::new( das_url ).with_page_limit( settings.das_page_limit );
        Self::new( reader, Arc::new( das ), settings )
    }

    /// Registers the client-side implementation of a plugin program. Program ids
    /// with neither a registration nor an NFT voter entry pass through.
    pub fn with_plugin( mut self, program_id: Pubkey, plugin: Arc<dyn VoterWeightPlugin> ) -> Self {
        Arc::make_mut( &mut self.external ).insert( program_id, plugin );
        self
    }

    #[inline] pub fn settings( &self ) -> &Settings { &self.settings }
    #[inline] pub fn registrars( &self ) -> &RegistrarResolver { &self.registrars }
    #[inline] pub fn assets( &self ) -> &AssetResolver { &self.assets }

    /// The realm's configuration snapshot.
    ///
    /// # Errors
    /// Propagates transport failures.
    pub async fn realm_config( &self, realm: &Pubkey ) -> Result<Arc<Findable<RealmConfig>>, FetchError> {
        let reader = Arc::clone( &self.reader );
        let realm = *realm ;
        self.realm_configs.get_or_fetch( CacheKey::realm_config( self.reader.endpoint(), realm ), Freshness::UntilInvalidated, move || async move {
            reader.fetch_program_config( &realm ).await.map( Findable::from )
        }).await
    }

    /// Loads the plugin chain configured for `(realm, mint)`, as seen by `wallet`.
    ///
    /// # Errors
    /// Fetch failures, an unknown realm or mint, and inconsistent configuration.
    pub async fn load_chain( &self, realm: &Pubkey, mint: &Pubkey, wallet: &Pubkey ) -> Result<PluginChain, ChainError> {
        let config = self.governing_config( realm, mint ).await?;
        debug!( %realm, %mint, %wallet, "loading plugin chain" );
        self.chain_for( &config, realm, mint, Freshness::UntilInvalidated ).await
    }

    /// Voting power of `wallet` with the realm's community token.
    ///
    /// # Errors
    /// Any failure resolving the chain; never a silent zero.
    pub async fn get_voting_power( &self, realm: &Pubkey, wallet: &Pubkey ) -> Result<VoteWeight, ChainError> {
        let mint = self.community_mint( realm ).await?;
        self.get_voting_power_for_mint( realm, &mint, wallet ).await
    }

    /// Voting power of `wallet` with `mint`, which must govern the realm.
    ///
    /// # Errors
    /// Any failure resolving the chain.
    pub async fn get_voting_power_for_mint( &self, realm: &Pubkey, mint: &Pubkey, wallet: &Pubkey ) -> Result<VoteWeight, ChainError> {
        let key = RequestKey { realm: *realm, mint: *mint, wallet: *wallet };
        let this = self.clone();
        self.requests.weights.run( key, move || async move {
            this.resolve_weight( key, Freshness::UntilInvalidated ).await
        }).await
    }

    /// Power of each delegator with the community token, for display.
    ///
    /// Asset snapshots may be up to [`Settings::display_ttl`] old. Each entry
    /// fails or succeeds on its own.
    ///
    /// # Errors
    /// Only when the realm itself cannot be resolved.
    pub async fn voting_power_for_delegators(
        &self,
        realm: &Pubkey,
        delegators: &[Pubkey],
    ) -> Result<Vec<( Pubkey, Result<VoteWeight, ChainError> )>, ChainError> {
        let mint = self.community_mint( realm ).await?;
        let freshness = Freshness::Ttl( self.settings.display_ttl );
        delegators.iter()
            .map(| delegator | async move {
                let key = RequestKey { realm: *realm, mint, wallet: *delegator };
                ( *delegator, self.resolve_weight( key, freshness ).await )
            })
            .pipe( join_all )
            .await
            .pipe( Ok )
    }

    /// Instructions creating every missing plugin record of `wallet`, in chain order.
    ///
    /// # Errors
    /// Any failure resolving the chain or building a plugin's instructions.
    pub async fn build_create_instructions( &self, realm: &Pubkey, mint: &Pubkey, wallet: &Pubkey ) -> Result<Vec<Instruction>, ChainError> {
        let key = RequestKey { realm: *realm, mint: *mint, wallet: *wallet };
        let this = self.clone();
        self.requests.creates.run( key, move || async move {
            let ( chain, ctx ) = this.chain_and_context( key ).await?;
            chain.build_create_instructions( &ctx ).await
                .inspect_err(| err | warn!( realm = %key.realm, wallet = %key.wallet, %err, "failed to build create instructions" ))
        }).await
    }

    /// Instructions refreshing every plugin record of `wallet` for `action`.
    ///
    /// # Errors
    /// Any failure resolving the chain or building a plugin's instructions.
    pub async fn build_update_instructions(
        &self,
        realm: &Pubkey,
        mint: &Pubkey,
        wallet: &Pubkey,
        action: VoterWeightAction,
    ) -> Result<Vec<Instruction>, ChainError> {
        let key = RequestKey { realm: *realm, mint: *mint, wallet: *wallet };
        let this = self.clone();
        self.requests.updates.run(( key, action ), move || async move {
            let ( chain, ctx ) = this.chain_and_context( key ).await?;
            chain.build_update_instructions( &ctx, action ).await
                .inspect_err(| err | warn!( realm = %key.realm, wallet = %key.wallet, %err, "failed to build update instructions" ))
        }).await
    }

    /// What `wallet` has to submit to join `realm` with its community token.
    ///
    /// # Errors
    /// Any failure resolving the chain or building instructions.
    pub async fn get_onboarding_plan( &self, realm: &Pubkey, wallet: &Pubkey ) -> Result<OnboardingPlan, ChainError> {
        let mint = self.community_mint( realm ).await?;
        let key = RequestKey { realm: *realm, mint, wallet: *wallet };
        let this = self.clone();
        self.requests.onboarding.run( key, move || async move {
            let ( chain, ctx ) = this.chain_and_context( key ).await?;
            let ( record, plugin_instructions ) = futures::try_join!(
                async { this.reader.token_owner_record( &ctx.wallet, &ctx.realm, &ctx.mint ).await.map_err( ChainError::from ) },
                chain.build_create_instructions( &ctx ),
            )?;
            Ok( plan_onboarding( record.as_ref(), &chain, plugin_instructions, || create_token_owner_record(
                &ctx.governance_program_id, &ctx.realm, &ctx.wallet, &ctx.mint, &ctx.wallet,
            )))
        }).await
    }

    /// Drops the cached registrar of `plugin_program_id` in `realm`.
    ///
    /// Requests for `realm` issued afterwards do not join ones started before.
    pub fn invalidate_registrar( &self, realm: &Pubkey, plugin_program_id: &Pubkey ) {
        self.registrars.invalidate( realm, plugin_program_id );
        self.requests.forget_where(| key | key.realm == *realm );
    }

    /// Drops the cached asset snapshot of `owner`, e.g. after an NFT transfer.
    ///
    /// Requests for `owner` issued afterwards do not join ones started before.
    pub fn invalidate_owner_assets( &self, owner: &Pubkey ) {
        self.assets.invalidate( owner );
        self.requests.forget_where(| key | key.wallet == *owner );
    }

    /// Drops the cached configuration of `realm`.
    pub fn invalidate_realm_config( &self, realm: &Pubkey ) {
        self.realm_configs.invalidate( &CacheKey::realm_config( self.reader.endpoint(), *realm ));
        self.requests.forget_where(| key | key.realm == *realm );
    }

    async fn community_mint( &self, realm: &Pubkey ) -> Result<Pubkey, ChainError> {
        self.realm_config( realm ).await?
            .found()
            .map(| config | config.community_mint )
            .ok_or( ChainError::RealmNotFound( *realm ))
    }

    async fn governing_config( &self, realm: &Pubkey, mint: &Pubkey ) -> Result<RealmConfig, ChainError> {
        match self.realm_config( realm ).await?.found() {
            None => Err( ChainError::RealmNotFound( *realm )),
            Some( config ) if !config.governs( mint ) => Err( ChainError::MintNotGoverned { realm: *realm, mint: *mint }),
            Some( config ) => Ok( config.clone() ),
        }
    }

    async fn chain_for(
        &self,
        config: &RealmConfig,
        realm: &Pubkey,
        mint: &Pubkey,
        asset_freshness: Freshness,
    ) -> Result<PluginChain, ChainError> {
        let descriptors = try_join_all( config.plugins_for( mint ).iter().enumerate()
            .map(|( position, program_id )| self.describe( config, realm, mint, position, program_id, asset_freshness ))
        ).await?;

        Ok( PluginChain::new( *realm, *mint, descriptors.into_iter().flatten().collect())? )
    }

    async fn describe(
        &self,
        config: &RealmConfig,
        realm: &Pubkey,
        mint: &Pubkey,
        position: usize,
        program_id: &Pubkey,
        asset_freshness: Freshness,
    ) -> Result<Option<PluginDescriptor>, ChainError> {

        if self.settings.is_nft_plugin( program_id ) {
            let registrar = self.registrars.resolve_for_mint( config, realm, mint, program_id ).await?;
            let Some( registrar ) = registrar.found() else {
                debug!( %realm, plugin = %program_id, "nft plugin has no registrar, omitted from chain" );
                return Ok( None );
            };
            let plugin = NftVoterPlugin::new(
                *program_id,
                Arc::new( registrar.clone() ),
                Arc::clone( &self.reader ),
                self.assets.clone(),
                Arc::clone( &self.settings ),
            ).with_asset_freshness( asset_freshness );
            return Ok( Some( PluginDescriptor::new( *program_id, position, PluginKind::NftCollection( Arc::new( plugin )))));
        }

        let kind = match self.external.get( program_id ) {
            Some( plugin ) => PluginKind::External( Arc::clone( plugin )),
            None => {
                debug!( %realm, plugin = %program_id, "unknown plugin program, passing through" );
                PluginKind::PassThrough
            },
        };
        Ok( Some( PluginDescriptor::new( *program_id, position, kind )))

    }

    async fn chain_and_context( &self, key: RequestKey ) -> Result<( PluginChain, VoterContext ), ChainError> {
        let config = self.governing_config( &key.realm, &key.mint ).await?;
        let chain = self.chain_for( &config, &key.realm, &key.mint, Freshness::UntilInvalidated ).await?;
        Ok(( chain, context( &config, key )))
    }

    async fn resolve_weight( &self, key: RequestKey, asset_freshness: Freshness ) -> Result<VoteWeight, ChainError> {
        let result = async {
            let config = self.governing_config( &key.realm, &key.mint ).await?;
            let ( chain, record ) = futures::try_join!(
                self.chain_for( &config, &key.realm, &key.mint, asset_freshness ),
                async { self.reader.token_owner_record( &key.wallet, &key.realm, &key.mint ).await.map_err( ChainError::from ) },
            )?;
            let base = record.map(| record | VoteWeight::from( record.governing_token_deposit_amount ));
            chain.compute_weight( &context( &config, key ), base ).await
        }.await ;

        if let Err( err ) = &result {
            warn!( realm = %key.realm, mint = %key.mint, wallet = %key.wallet, %err, "voting power unavailable" );
        }
        result
    }

}

fn context( config: &RealmConfig, key: RequestKey ) -> VoterContext {
    VoterContext::new( key.realm, key.mint, key.wallet, config.governance_program_id )
}

impl std::fmt::Debug for VoterWeightOrchestrator {
    fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
        f.debug_struct( "VoterWeightOrchestrator" )
            .field( "endpoint", &self.reader.endpoint() )
            .field( "settings", &self.settings )
            .field( "external_plugins", &self.external.keys().collect::<Vec<_>>() )
            .finish_non_exhaustive()
    }
}
