//! Snapshot caching and in-flight request sharing.
//!
//! Two layers:
//!
//! - [`InFlight`] keeps at most one pending future per key. Concurrent callers for
//! 	the same key await the same shared future instead of issuing redundant
//! 	fetches. Nothing is retained once the future completes.
//!
//! - [`SnapshotCache`] retains completed fetches as immutable [`Arc`] snapshots
//! 	keyed by a structured [`CacheKey`]. Entries are dropped by key through
//! 	[`SnapshotCache::invalidate`]; there is no blanket flush. Weight-sensitive
//! 	reads use [`Freshness::UntilInvalidated`], display-only reads may use a TTL.

use std::collections::HashMap ;
use std::future::Future ;
use std::hash::Hash ;
use std::sync::{ Arc, Mutex, MutexGuard, PoisonError };
use std::sync::atomic::{ AtomicU64, Ordering };
use std::time::{ Duration, Instant };
use futures::future::{ BoxFuture, FutureExt, Shared, TryFutureExt };
use itertools::Itertools ;
use solana_pubkey::Pubkey ;
use tracing::debug ;

use crate::chain_reader::FetchError ;



/// Which kind of snapshot a [`CacheKey`] refers to.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Hash )]
pub enum Namespace {
    RealmConfig,
    Registrar,
    OwnerAssets,
}

/// Structured cache key: `(namespace, endpoint, realm, plugin, identity)`.
///
/// Fields that do not apply to a namespace are `None`.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub struct CacheKey {
    pub namespace: Namespace,
    pub endpoint: String,
    pub realm: Option<Pubkey>,
    pub plugin: Option<Pubkey>,
    pub identity: Option<Pubkey>,
}

impl CacheKey {

    pub fn realm_config( endpoint: impl Into<String>, realm: Pubkey ) -> Self {
        Self { namespace: Namespace::RealmConfig, endpoint: endpoint.into(), realm: Some( realm ), plugin: None, identity: None }
    }

    /// Registrars are keyed by governing mint as well; `identity` holds the mint.
    pub fn registrar( endpoint: impl Into<String>, realm: Pubkey, plugin: Pubkey, mint: Pubkey ) -> Self {
        Self { namespace: Namespace::Registrar, endpoint: endpoint.into(), realm: Some( realm ), plugin: Some( plugin ), identity: Some( mint )}
    }

    pub fn owner_assets( endpoint: impl Into<String>, owner: Pubkey ) -> Self {
        Self { namespace: Namespace::OwnerAssets, endpoint: endpoint.into(), realm: None, plugin: None, identity: Some( owner )}
    }

}

/// How long a snapshot may be served without refetching.
#[derive( Debug, Clone, Copy, PartialEq, Eq, Default )]
pub enum Freshness {
    /// Valid until explicitly invalidated. Used for reads that feed weights.
    #[default] UntilInvalidated,
    /// Valid for a fixed duration. Only for display-only reads.
    Ttl( Duration ),
}

fn lock<T>( mutex: &Mutex<T> ) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else( PoisonError::into_inner )
}



struct Pending<V> {
    id: u64,
    waiters: usize,
    future: Shared<BoxFuture<'static, V>>,
}

/// At most one pending future per key, shared between concurrent callers.
pub struct InFlight<K, V> {
    pending: Mutex<HashMap<K, Pending<V>>>,
    next_id: AtomicU64,
}

impl<K, V> Default for InFlight<K, V> {
    fn default() -> Self { Self { pending: Mutex::new( HashMap::new() ), next_id: AtomicU64::new( 0 )}}
}

/// One caller awaiting a pending entry. Releases the entry on drop once the
/// future completed or the last waiter went away.
struct Waiter<'a, K: Eq + Hash, V> {
    pending: &'a Mutex<HashMap<K, Pending<V>>>,
    key: K,
    id: u64,
    completed: bool,
}

impl<K: Eq + Hash, V> Drop for Waiter<'_, K, V> {
    fn drop( &mut self ) {
        let mut pending = lock( self.pending );
        let Some( entry ) = pending.get_mut( &self.key ) else { return };
        if entry.id != self.id { return }
        entry.waiters -= 1 ;
        if self.completed || entry.waiters == 0 {
            pending.remove( &self.key );
        }
    }
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
{

    pub fn new() -> Self { Self::default() }

    /// Awaits the pending future for `key`, starting one with `start` if none exists.
    ///
    /// `start` is only invoked when no future for `key` is pending.
    pub async fn run<F, Fut>( &self, key: K, start: F ) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let ( id, future ) = {
            let mut pending = lock( &self.pending );
            let entry = pending.entry( key.clone() ).or_insert_with(|| Pending {
                id: self.next_id.fetch_add( 1, Ordering::Relaxed ),
                waiters: 0,
                future: start().boxed().shared(),
            });
            entry.waiters += 1 ;
            ( entry.id, entry.future.clone() )
        };

        let mut waiter = Waiter { pending: &self.pending, key, id, completed: false };
        let output = future.await ;
        waiter.completed = true ;
        output
    }

    /// Detaches the pending future for `key` so the next caller starts afresh.
    /// Callers already awaiting it still receive its result.
    pub fn forget( &self, key: &K ) {
        lock( &self.pending ).remove( key );
    }

    /// [`InFlight::forget`] for every pending key matching `predicate`.
    pub fn forget_where( &self, predicate: impl Fn( &K ) -> bool ) {
        lock( &self.pending ).retain(| key, _ | !predicate( key ));
    }

    pub(crate) fn pending_keys( &self ) -> Vec<K> {
        lock( &self.pending ).keys().cloned().collect()
    }

    /// Number of keys with a pending future.
    pub fn pending( &self ) -> usize { lock( &self.pending ).len() }

}



struct Snapshot<V> {
    value: Arc<V>,
    fetched_at: Instant,
    freshness: Freshness,
}

impl<V> Snapshot<V> {

    fn is_fresh( &self, now: Instant ) -> bool {
        match self.freshness {
            Freshness::UntilInvalidated => true,
            Freshness::Ttl( ttl ) => now.duration_since( self.fetched_at ) < ttl,
        }
    }

    // A TTL snapshot never satisfies a read that asks for `UntilInvalidated`.
    fn satisfies( &self, requested: Freshness, now: Instant ) -> bool {
        self.is_fresh( now ) && match requested {
            Freshness::UntilInvalidated => self.freshness == Freshness::UntilInvalidated,
            Freshness::Ttl( _ ) => true,
        }
    }

}

struct Entries<V> {
    snapshots: HashMap<CacheKey, Snapshot<V>>,
    // Bumped on invalidation so a fetch that started earlier cannot store its result.
    epochs: HashMap<CacheKey, u64>,
}

/// Immutable snapshots keyed by [`CacheKey`], with in-flight fetch sharing.
pub struct SnapshotCache<V> {
    entries: Mutex<Entries<V>>,
    in_flight: InFlight<CacheKey, Result<Arc<V>, FetchError>>,
}

impl<V> Default for SnapshotCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new( Entries { snapshots: HashMap::new(), epochs: HashMap::new() }),
            in_flight: InFlight::default(),
        }
    }
}

impl<V: Send + Sync + 'static> SnapshotCache<V> {

    pub fn new() -> Self { Self::default() }

    /// Returns the cached snapshot for `key` or fetches, stores and returns it.
    ///
    /// Concurrent misses on the same key share a single fetch. Failed fetches are
    /// not cached.
    ///
    /// # Errors
    /// Propagates the fetch error unchanged.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: CacheKey,
        freshness: Freshness,
        fetch: F,
    ) -> Result<Arc<V>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
    {
        if let Some( value ) = self.lookup( &key, freshness ) {
            debug!( namespace = ?key.namespace, endpoint = %key.endpoint, "snapshot cache hit" );
            return Ok( value );
        }

        let epoch = self.epoch( &key );
        debug!( namespace = ?key.namespace, endpoint = %key.endpoint, "snapshot cache miss" );
        let result = self.in_flight.run( key.clone(), move || fetch().map_ok( Arc::new )).await ;

        if let Ok( value ) = &result {
            let mut entries = lock( &self.entries );
            if entries.epochs.get( &key ).copied().unwrap_or( 0 ) == epoch {
                entries.snapshots.insert( key, Snapshot { value: Arc::clone( value ), fetched_at: Instant::now(), freshness });
            }
        }
        result
    }

    /// The fresh snapshot for `key`, if any.
    pub fn get( &self, key: &CacheKey ) -> Option<Arc<V>> {
        self.lookup( key, Freshness::Ttl( Duration::MAX ))
    }

    fn lookup( &self, key: &CacheKey, requested: Freshness ) -> Option<Arc<V>> {
        let now = Instant::now();
        lock( &self.entries ).snapshots.get( key )
            .filter(| snapshot | snapshot.satisfies( requested, now ))
            .map(| snapshot | Arc::clone( &snapshot.value ))
    }

    /// Drops the snapshot for `key` and detaches any fetch in progress for it.
    pub fn invalidate( &self, key: &CacheKey ) {
        let mut entries = lock( &self.entries );
        entries.snapshots.remove( key );
        *entries.epochs.entry( key.clone() ).or_insert( 0 ) += 1 ;
        drop( entries );
        self.in_flight.forget( key );
    }

    /// [`SnapshotCache::invalidate`] for every stored or pending key matching `predicate`.
    pub fn invalidate_where( &self, predicate: impl Fn( &CacheKey ) -> bool ) {
        let stored = lock( &self.entries ).snapshots.keys().cloned().collect_vec();
        stored.into_iter()
            .chain( self.in_flight.pending_keys() )
            .filter(| key | predicate( key ))
            .unique()
            .for_each(| key | self.invalidate( &key ));
    }

    fn epoch( &self, key: &CacheKey ) -> u64 {
        lock( &self.entries ).epochs.get( key ).copied().unwrap_or( 0 )
    }

}
