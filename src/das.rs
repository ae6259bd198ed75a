//! DAS (Digital Asset Standard) JSON-RPC asset source.
//!
//! `getAssetsByOwner` is paginated; [`DasClient`] walks pages until a short page
//! comes back and hands the complete set to the caller.

use std::future::Future ;
use async_trait::async_trait ;
use serde::Deserialize ;
use serde_json::json ;
use solana_pubkey::Pubkey ;
use tracing::debug ;

use crate::asset::{ AssetSource, DigitalAsset };
use crate::chain_reader::FetchError ;



/// Largest page size DAS providers accept.
pub const DEFAULT_PAGE_LIMIT: usize = 1000 ;

/// One page of a `getAssetsByOwner` response.
#[derive( Deserialize, Debug, Clone )]
pub struct AssetPage {
    #[serde( default )]
    pub items: Vec<DigitalAsset>,
}

#[derive( Deserialize )]
struct RpcResponse {
    result: Option<AssetPage>,
    error: Option<RpcError>,
}

#[derive( Deserialize )]
struct RpcError {
    code: i64,
    message: String,
}

/// Asset source backed by a DAS-capable RPC endpoint.
#[derive( Debug, Clone )]
pub struct DasClient {
    http: reqwest::Client,
    url: String,
    page_limit: usize,
}

impl DasClient {

    pub fn new( url: impl Into<String> ) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), page_limit: DEFAULT_PAGE_LIMIT }
    }

    /// Overrides the page size. Values below 1 are treated as 1.
    pub fn with_page_limit( mut self, page_limit: usize ) -> Self {
        self.page_limit = page_limit.max( 1 );
        self
    }

    #[inline] pub fn url( &self ) -> &str { &self.url }

    async fn fetch_page( &self, owner: Pubkey, page: usize ) -> Result<AssetPage, FetchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "realm-voter-weight",
            "method": "getAssetsByOwner",
            "params": {
                "ownerAddress": owner.to_string(),
                "page": page,
                "limit": self.page_limit,
            },
        });

        let response = self.http.post( &self.url )
            .json( &body )
            .send().await
            .and_then( reqwest::Response::error_for_status )
            .map_err(| err | FetchError::Transport( err.to_string() ))?
            .json::<RpcResponse>().await
            .map_err(| err | FetchError::Transport( format!( "invalid getAssetsByOwner response: {}", err )))?;

        match response {
            RpcResponse { error: Some( RpcError { code, message }), .. } =>
                Err( FetchError::Transport( format!( "getAssetsByOwner failed ({}): {}", code, message ))),
            RpcResponse { result: Some( page ), .. } => Ok( page ),
            RpcResponse { result: None, error: None } =>
                Err( FetchError::Transport( "getAssetsByOwner returned neither result nor error".to_string() )),
        }
    }

}

#[async_trait]
impl AssetSource for DasClient {
    async fn assets_by_owner( &self, owner: &Pubkey ) -> Result<Vec<DigitalAsset>, FetchError> {
        let owner = *owner ;
        collect_pages( self.page_limit, | page | self.fetch_page( owner, page )).await
    }
}

/// Fetches 1-indexed pages until one holds fewer than `page_limit` items.
/// A `page_limit` of zero is treated as one.
///
/// # Errors
/// Fails on the first page that fails; earlier pages are discarded.
pub async fn collect_pages<F, Fut>( page_limit: usize, mut fetch_page: F ) -> Result<Vec<DigitalAsset>, FetchError>
where
    F: FnMut( usize ) -> Fut,
    Fut: Future<Output = Result<AssetPage, FetchError>>,
{
    let page_limit = page_limit.max( 1 );
    let mut assets = Vec::new();
    let mut page = 1 ;
    loop {
        let AssetPage { items } = fetch_page( page ).await?;
        let complete = items.len() < page_limit ;
        assets.extend( items );
        if complete { break }
        page += 1 ;
    }
    debug!( pages = page, assets = assets.len(), "collected asset pages" );
    Ok( assets )
}
